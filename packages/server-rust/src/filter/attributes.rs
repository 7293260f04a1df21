//! Per-request attribute bag.
//!
//! Uses a `parking_lot::Mutex` per request rather than shared state on the
//! gate, so concurrent requests never contend with each other.

use std::collections::HashSet;
use std::sync::Arc;

use http::Request;
use parking_lot::Mutex;

/// Mutable set of marker attributes scoped to one request lifecycle.
///
/// Stored in the request extensions. Clones share the same set, so every
/// re-entry of the request (forward, include, async, error dispatch) sees
/// markers set by earlier entries.
#[derive(Debug, Clone, Default)]
pub struct RequestAttributes {
    markers: Arc<Mutex<HashSet<String>>>,
}

impl RequestAttributes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name`. Returns `false` if it was already present.
    pub fn set(&self, name: &str) -> bool {
        self.markers.lock().insert(name.to_string())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.markers.lock().contains(name)
    }

    /// Removes `name`. Returns `false` if it was not present.
    pub fn remove(&self, name: &str) -> bool {
        self.markers.lock().remove(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.markers.lock().is_empty()
    }

    /// Returns the bag attached to `request`, attaching a new one if absent.
    pub fn of<B>(request: &mut Request<B>) -> Self {
        if let Some(existing) = request.extensions().get::<RequestAttributes>() {
            return existing.clone();
        }
        let attributes = RequestAttributes::new();
        request.extensions_mut().insert(attributes.clone());
        attributes
    }
}

// ---------------------------------------------------------------------------
// AppliedMarker
// ---------------------------------------------------------------------------

/// RAII guard for the "already applied" marker.
///
/// Sets the marker on creation and removes it on drop, so the marker is
/// cleared on success, on error, and when the response future is dropped
/// mid-flight.
#[derive(Debug)]
pub(crate) struct AppliedMarker {
    attributes: RequestAttributes,
    name: Arc<str>,
}

impl AppliedMarker {
    pub(crate) fn acquire(attributes: RequestAttributes, name: Arc<str>) -> Self {
        attributes.set(&name);
        Self { attributes, name }
    }
}

impl Drop for AppliedMarker {
    fn drop(&mut self) {
        self.attributes.remove(&self.name);
    }
}
