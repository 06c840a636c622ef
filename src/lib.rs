//! Library crate for vantage-back: the live-match telemetry state engine,
//! exposed as modules for the binary, the transport layer, and integration
//! tests.

pub mod config;
pub mod dto;
pub mod error;
pub mod persistence;
pub mod services;
pub mod state;
pub mod translate;
