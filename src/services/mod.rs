/// Change-detecting snapshot broadcasting and idle reaping.
pub mod broadcast_service;
/// Telemetry intake, routing, and effect execution.
pub mod ingest_service;
