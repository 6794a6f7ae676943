//! Core of the review digest bot: recipient registry, outbound messaging
//! ports, and the broadcast fan-out that notifies every subscriber.
//!
//! This crate is intentionally framework-agnostic. Telegram lives behind the
//! `MessagingPort` trait, implemented in the adapter crate.

pub mod broadcast;
pub mod config;
pub mod directory;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod security;
pub mod store;
pub mod utils;

pub use errors::{Error, Result};
