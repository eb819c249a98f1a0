//! In-memory home registry
//!
//! The model-mutation side of the service. Every mutating method takes a
//! `commit` hook that runs while the write lock is still held; handlers
//! publish to the feed from there, so the feed sees changes in exactly the
//! order the store applied them. The feed never reads the model itself.
//!
//! Homes keep insertion order: the first one is the active home for
//! scene-wide settings such as the background color.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use tracing::info;
use types::errors::ModelError;
use types::home::{Home, DEFAULT_BACKGROUND_COLOR};
use types::ids::{HomeId, LightId};
use types::light::{validate_hex_color, Light, LightControlCommand, LightState, LightSummary};

/// Outcome of a batch light-control request.
#[derive(Debug, Default)]
pub struct LightControlOutcome {
    /// Light updates applied, counted per matching command and light.
    pub updated: usize,
    /// Changed lights per home, each light listed once with its final state.
    pub changed: BTreeMap<HomeId, Vec<LightSummary>>,
}

#[derive(Debug, Default)]
pub struct HomeStore {
    homes: RwLock<Vec<Home>>,
}

impl HomeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding only the demo home.
    pub fn with_demo_home() -> Self {
        let store = Self::new();
        let home = store.create(Home::demo());
        info!(home_id = %home.id, name = %home.name, "Seeded demo home");
        store
    }

    pub fn list(&self) -> Vec<Home> {
        self.homes.read().clone()
    }

    pub fn get(&self, home_id: &HomeId) -> Result<Home, ModelError> {
        self.homes
            .read()
            .iter()
            .find(|h| &h.id == home_id)
            .cloned()
            .ok_or_else(|| not_found(home_id))
    }

    pub fn contains(&self, home_id: &HomeId) -> bool {
        self.homes.read().iter().any(|h| &h.id == home_id)
    }

    /// Fail with `HomeNotFound` unless the home exists.
    pub fn require(&self, home_id: &HomeId) -> Result<(), ModelError> {
        if self.contains(home_id) {
            Ok(())
        } else {
            Err(not_found(home_id))
        }
    }

    /// Insert a home, replacing any home with the same id in place.
    pub fn create(&self, home: Home) -> Home {
        upsert(&mut self.homes.write(), home).clone()
    }

    /// Drop every home and start over with a blank one.
    pub fn reset(&self) -> Home {
        let home = Home::blank();
        *self.homes.write() = vec![home.clone()];
        home
    }

    /// Replace the home stored under `home_id`; the body's id is overridden.
    pub fn replace<T>(&self, home_id: &HomeId, mut home: Home, commit: impl FnOnce(&Home) -> T) -> T {
        home.id = home_id.clone();
        let mut homes = self.homes.write();
        commit(upsert(&mut homes, home))
    }

    pub fn update_light<T, E>(
        &self,
        home_id: &HomeId,
        light_id: &LightId,
        state: LightState,
        commit: impl FnOnce(&Light) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<ModelError>,
    {
        let mut homes = self.homes.write();
        let home = homes
            .iter_mut()
            .find(|h| &h.id == home_id)
            .ok_or_else(|| not_found(home_id))?;

        let light = home
            .find_light_mut(light_id)
            .ok_or_else(|| ModelError::LightNotFound {
                light_id: light_id.to_string(),
            })?;
        light.state = state;
        commit(light)
    }

    /// Apply name-addressed commands to every matching light in every home.
    ///
    /// `commit` is called once per home that changed.
    pub fn apply_light_commands<E>(
        &self,
        commands: &[LightControlCommand],
        mut commit: impl FnMut(&HomeId, &[LightSummary]) -> Result<(), E>,
    ) -> Result<LightControlOutcome, E> {
        let mut homes = self.homes.write();
        let mut outcome = LightControlOutcome::default();

        for home in homes.iter_mut() {
            let mut changed: BTreeMap<LightId, LightSummary> = BTreeMap::new();

            for command in commands {
                for light in home.lights_mut().filter(|l| command.matches(l)) {
                    command.apply(&mut light.state);
                    outcome.updated += 1;
                    changed.insert(light.id.clone(), light.summary());
                }
            }

            if !changed.is_empty() {
                let lights: Vec<LightSummary> = changed.into_values().collect();
                commit(&home.id, &lights)?;
                outcome.changed.insert(home.id.clone(), lights);
            }
        }

        Ok(outcome)
    }

    /// Set the background of the active home.
    pub fn set_background<T, E>(
        &self,
        color: &str,
        commit: impl FnOnce(&HomeId) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<ModelError>,
    {
        validate_hex_color(color)?;

        let mut homes = self.homes.write();
        let home = homes.first_mut().ok_or(ModelError::NoHome)?;
        home.background_color = color.to_string();
        commit(&home.id)
    }

    /// Background of the active home, or the default when none is loaded.
    pub fn background(&self) -> String {
        self.homes
            .read()
            .first()
            .map(|h| h.background_color.clone())
            .unwrap_or_else(|| DEFAULT_BACKGROUND_COLOR.to_string())
    }
}

fn upsert(homes: &mut Vec<Home>, home: Home) -> &Home {
    match homes.iter().position(|h| h.id == home.id) {
        Some(index) => {
            homes[index] = home;
            &homes[index]
        }
        None => {
            homes.push(home);
            &homes[homes.len() - 1]
        }
    }
}

fn not_found(home_id: &HomeId) -> ModelError {
    ModelError::HomeNotFound {
        home_id: home_id.to_string(),
    }
}
