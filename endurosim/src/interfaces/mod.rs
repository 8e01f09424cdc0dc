pub mod advisory;
pub mod dashboard;
pub mod telemetry;
