//! Mindbody provider implementation.
//!
//! Talks to the Mindbody marketplace gateway to list free court times for
//! one site.
//!
//! # Authentication
//!
//! Two credential forms are supported:
//!
//! - an access token copied from a signed-in browser session, used as is
//!   until the gateway rejects it
//! - a username and password, exchanged for a token at the identity server
//!   (requires `client_id`)
//!
//! # Example
//!
//! ```ignore
//! use courtwatch_providers::mindbody::{MindbodyConfig, MindbodyProvider};
//!
//! let provider = MindbodyProvider::new(MindbodyConfig::default())?;
//! let session = provider.authenticate(&Credentials::access_token(token)).await?;
//! let slots = provider.list_schedule(&session, window).await?;
//! ```

mod auth;
mod client;
mod config;
mod provider;

pub use auth::TokenResponse;
pub use client::{MindbodyClient, availability_body, error_for_status, parse_availability};
pub use config::MindbodyConfig;
pub use provider::MindbodyProvider;
