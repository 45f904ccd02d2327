//! Warden Telemetry - logging setup for the outbound gate.
//!
//! This crate provides:
//! - Configurable subscriber setup with multiple formats and targets
//! - A per-delivery context that correlates gate, limiter and audit events
//!
//! # Example
//!
//! ```rust,no_run
//! use warden_telemetry::{DeliveryContext, LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), warden_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("warden_approval=trace");
//! setup_logging(&config)?;
//!
//! let ctx = DeliveryContext::new("telegram", "alice");
//! let span = ctx.span();
//! let _guard = span.enter();
//! tracing::info!("sending");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod context;
mod error;
mod logging;

pub use context::DeliveryContext;
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
