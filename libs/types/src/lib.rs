//! Types library for the home twin
//!
//! This library provides the building model shared by every service: homes,
//! floors, walls, lights and their state. The change feed treats this model
//! as opaque payload; only the mutation handlers look inside it.
//!
//! # Modules
//! - `ids`: Identifiers for homes, lights and other building elements
//! - `home`: Home, floor and fixture geometry
//! - `light`: Light state and batch light-control commands
//! - `errors`: Error taxonomy

// Public modules
pub mod ids;
pub mod home;
pub mod light;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::home::*;
    pub use crate::light::*;
    pub use crate::errors::*;
}
