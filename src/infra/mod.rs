//! Infrastructure adapters and runtime bootstrap.

pub mod cdn;
pub mod error;
pub mod http;
pub mod telemetry;
pub mod webhook;
