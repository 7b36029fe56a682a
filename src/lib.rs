pub mod error;
pub mod geo;
pub mod io;
pub mod terrain;
pub mod physics;
pub mod tosser;
pub mod solver;
