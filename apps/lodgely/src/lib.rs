//! # Lodgely Server
//!
//! HTTP API, CLI and outbound integrations (mail, OAuth) for the Lodgely
//! rental marketplace. Domain rules and storage live in `lodgely-core`.
//!
//! The binary in `main.rs` only parses the command line and calls
//! [`cli::run`].

pub mod api;
pub mod cli;
pub mod config;
pub mod mailer;
pub mod oauth;

// Re-export lodgely_core for convenience
pub use lodgely_core;
