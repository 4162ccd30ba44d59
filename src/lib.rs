pub mod agent;
pub mod api;
pub mod clock;
pub mod config;
pub mod door;
pub mod error;
pub mod identity;
pub mod link;
pub mod sensor;
pub mod state;
pub mod telemetry;
