pub mod configuration;
pub mod errors;
pub mod health;
pub mod notify;
pub mod publish;
pub mod telemetry;
