pub mod error;
pub mod models;
pub mod pending;
pub mod registry;
pub mod settings;
