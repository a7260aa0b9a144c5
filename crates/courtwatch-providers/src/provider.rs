//! AvailabilityProvider trait definition.
//!
//! A provider is the upstream scheduling service seen as two calls:
//! authenticate with credentials, then list bookable start times for a
//! window. Everything else (session caching, retries, diffing) is built on
//! top of this trait, so tests can swap in an in-memory provider.

use std::future::Future;
use std::pin::Pin;

use courtwatch_core::TimeWindow;

use crate::error::ProviderResult;
use crate::raw_slot::RawSlot;
use crate::session::{Credentials, Session};

/// A boxed future for async trait methods.
///
/// Boxed futures keep the trait object-safe so the monitor can hold an
/// `Arc<dyn AvailabilityProvider>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The upstream scheduling service.
///
/// # Implementation Notes
///
/// - `authenticate` must fail with `AuthenticationFailed` when the service
///   rejects the credentials, and with a transport code on network trouble
/// - `list_schedule` must fail with `SessionExpired` when the token is no
///   longer accepted, so the caller can re-authenticate once
/// - malformed responses map to `InvalidResponse`
pub trait AvailabilityProvider: Send + Sync {
    /// Returns the name of this provider (e.g., "mindbody").
    fn name(&self) -> &str;

    /// Exchanges credentials for a session.
    fn authenticate<'a>(
        &'a self,
        credentials: &'a Credentials,
    ) -> BoxFuture<'a, ProviderResult<Session>>;

    /// Lists bookable slots starting inside `window`.
    fn list_schedule<'a>(
        &'a self,
        session: &'a Session,
        window: TimeWindow,
    ) -> BoxFuture<'a, ProviderResult<Vec<RawSlot>>>;
}
