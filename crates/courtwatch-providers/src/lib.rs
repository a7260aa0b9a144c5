//! AvailabilityProvider trait, session handling and implementations.
//!
//! This crate provides the upstream side of the monitor:
//!
//! - [`AvailabilityProvider`] - The trait scheduling backends implement
//! - [`SessionProvider`] - Caches and renews the authenticated session
//! - [`AvailabilityFetcher`] - Fetches and normalizes slots for a window
//! - [`RawSlot`] - Provider-native slot records
//! - [`ProviderError`] - Error types for provider operations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  Mindbody gateway   │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐    ┌──────────────────┐
//! │  MindbodyProvider   │◄───│ SessionProvider  │
//! └──────────┬──────────┘    └──────────────────┘
//!            │ AvailabilityProvider
//!            ▼
//!     ┌─────────────┐
//!     │   RawSlot   │
//!     └──────┬──────┘
//!            │ normalize_slots()
//!            ▼
//!     ┌─────────────┐
//!     │   SlotSet   │
//!     └─────────────┘
//! ```

pub mod error;
pub mod fetcher;
pub mod mindbody;
pub mod normalize;
pub mod provider;
pub mod raw_slot;
pub mod session;

pub use error::{ErrorCategory, ProviderError, ProviderErrorCode, ProviderResult};
pub use fetcher::{AvailabilityFetcher, DEFAULT_WINDOW_DAYS};
pub use normalize::{NormalizeOptions, normalize_slot, normalize_slots};
pub use provider::{AvailabilityProvider, BoxFuture};
pub use raw_slot::RawSlot;
pub use session::{Credentials, Session, SessionProvider};
