//! Warden Runtime - the outbound gate as one context object.
//!
//! This crate provides:
//! - [`Warden`]: owns the approval window, prompt listeners, rate limiter,
//!   audit trail and vaults, and runs the delivery pipeline
//! - [`MessageSender`]: the seam channel adapters implement
//! - [`config_bridge`]: config sections to domain types
//!
//! # Delivery pipeline
//!
//! ```text
//! watch_mode ─► deny_commands ─► trust gate ─► rate limit ─► send ─► record + audit
//!     │              │               │             │
//!     └──────────────┴───────────────┴─────────────┴──► audited as blocked
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use warden_runtime::{MessageSender, OutboundMessage, Warden};
//!
//! struct Stdout;
//!
//! #[async_trait]
//! impl MessageSender for Stdout {
//!     async fn send(&self, message: &OutboundMessage) -> Result<(), String> {
//!         println!("{}: {}", message.recipient, message.content);
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let warden = Warden::load(None)?;
//! warden.install_shutdown_hooks();
//! let outcome = warden
//!     .deliver(&OutboundMessage::new("telegram", "alice", "hello"), &Stdout)
//!     .await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config_bridge;
pub mod prelude;

mod delivery;
mod error;
mod warden;

pub use delivery::{DeliveryOutcome, MessageSender, OutboundMessage};
pub use error::{RuntimeError, RuntimeResult};
pub use warden::{Warden, init_logging};
