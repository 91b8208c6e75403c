pub mod actuator;
pub mod clock;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod history;
pub mod ingest;
pub mod io;
pub mod model;
pub mod paths;
pub mod species;
pub mod stepper;
pub mod store;
pub mod types;

pub use engine::{Engine, ParameterRequest};
pub use error::{IncubatorError, Result};
