//! Building geometry: homes, floors and fixtures
//!
//! Mirrors the JSON shape the 3D front end reads and writes. Every element id
//! is optional on input and generated when missing.

use serde::{Deserialize, Serialize};

use crate::ids::{ElementId, HomeId, LightId};
use crate::light::Light;

/// Default scene background.
pub const DEFAULT_BACKGROUND_COLOR: &str = "#222222";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    #[serde(default)]
    pub id: ElementId,
    pub p1: Vector3,
    pub p2: Vector3,
    #[serde(default = "default_window_height")]
    pub height: f64,
    /// Height of the sill above the floor.
    #[serde(default = "default_window_bottom")]
    pub bottom_height: f64,
}

fn default_window_height() -> f64 {
    1.5
}

fn default_window_bottom() -> f64 {
    0.8
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    #[serde(default)]
    pub id: ElementId,
    pub p1: Vector3,
    pub p2: Vector3,
    #[serde(default = "default_wall_height")]
    pub height: f64,
    #[serde(default = "default_wall_thickness")]
    pub thickness: f64,
    #[serde(default)]
    pub windows: Vec<Window>,
}

fn default_wall_height() -> f64 {
    2.5
}

fn default_wall_thickness() -> f64 {
    0.2
}

impl Wall {
    pub fn new(p1: Vector3, p2: Vector3) -> Self {
        Self {
            id: ElementId::generate(),
            p1,
            p2,
            height: default_wall_height(),
            thickness: default_wall_thickness(),
            windows: Vec::new(),
        }
    }
}

/// Free-standing box used for furniture placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cube {
    #[serde(default)]
    pub id: ElementId,
    #[serde(default = "default_cube_name")]
    pub name: String,
    pub position: Vector3,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_cube_size")]
    pub size: Vector3,
    #[serde(default = "default_cube_color")]
    pub color: String,
}

fn default_cube_name() -> String {
    "Cube".to_string()
}

fn default_cube_size() -> Vector3 {
    Vector3::new(1.0, 1.0, 1.0)
}

fn default_cube_color() -> String {
    "#ababab".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Floor {
    #[serde(default)]
    pub id: ElementId,
    pub level: i32,
    pub name: String,
    #[serde(default)]
    pub walls: Vec<Wall>,
    #[serde(default)]
    pub lights: Vec<Light>,
    #[serde(default)]
    pub cubes: Vec<Cube>,
    /// Base64 image or URL.
    #[serde(default)]
    pub floor_plan_image: Option<String>,
    /// Ordered outline of the floor polygon.
    #[serde(default)]
    pub shape: Vec<Vector3>,
}

impl Floor {
    pub fn new(level: i32, name: impl Into<String>) -> Self {
        Self {
            id: ElementId::generate(),
            level,
            name: name.into(),
            walls: Vec::new(),
            lights: Vec::new(),
            cubes: Vec::new(),
            floor_plan_image: None,
            shape: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Home {
    #[serde(default)]
    pub id: HomeId,
    pub name: String,
    #[serde(default)]
    pub floors: Vec<Floor>,
    #[serde(default = "default_background")]
    pub background_color: String,
}

fn default_background() -> String {
    DEFAULT_BACKGROUND_COLOR.to_string()
}

impl Home {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: HomeId::generate(),
            name: name.into(),
            floors: Vec::new(),
            background_color: default_background(),
        }
    }

    /// An empty home with a single ground floor.
    pub fn blank() -> Self {
        let mut home = Self::new("New Home");
        home.floors.push(Floor::new(0, "Ground Floor"));
        home
    }

    /// A ten-by-ten room with one ceiling light.
    pub fn demo() -> Self {
        let corners = [
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(10.0, 0.0, 0.0),
            Vector3::new(10.0, 0.0, 10.0),
            Vector3::new(0.0, 0.0, 10.0),
        ];

        let mut floor = Floor::new(0, "Ground Floor");
        floor.walls = (0..corners.len())
            .map(|i| Wall::new(corners[i], corners[(i + 1) % corners.len()]))
            .collect();
        floor.lights = vec![Light::new("Living Room Main", Vector3::new(5.0, 2.4, 5.0))];
        floor.shape = corners.to_vec();

        let mut home = Self::new("Demo Home");
        home.floors.push(floor);
        home
    }

    pub fn lights(&self) -> impl Iterator<Item = &Light> {
        self.floors.iter().flat_map(|f| f.lights.iter())
    }

    pub fn lights_mut(&mut self) -> impl Iterator<Item = &mut Light> {
        self.floors.iter_mut().flat_map(|f| f.lights.iter_mut())
    }

    pub fn find_light_mut(&mut self, light_id: &LightId) -> Option<&mut Light> {
        self.lights_mut().find(|l| &l.id == light_id)
    }
}
