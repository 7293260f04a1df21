use std::fmt;

use serde::{Deserialize, Serialize};

/// Why a request is being processed right now.
///
/// A request enters the pipeline once as `Request`; the hosting
/// infrastructure may then re-enter it as a forward, include, async
/// continuation, or error dispatch within the same lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchKind {
    /// Initial entry of the request.
    #[default]
    Request,
    Forward,
    Include,
    /// Resumption of a request whose processing was suspended.
    Async,
    /// Re-entry to render an error for the request.
    Error,
}

impl DispatchKind {
    /// All dispatch kinds, in declaration order.
    pub const ALL: [DispatchKind; 5] = [
        DispatchKind::Request,
        DispatchKind::Forward,
        DispatchKind::Include,
        DispatchKind::Async,
        DispatchKind::Error,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DispatchKind::Request => "request",
            DispatchKind::Forward => "forward",
            DispatchKind::Include => "include",
            DispatchKind::Async => "async",
            DispatchKind::Error => "error",
        }
    }
}

impl fmt::Display for DispatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_initial_request() {
        assert_eq!(DispatchKind::default(), DispatchKind::Request);
    }

    #[test]
    fn display_matches_as_str() {
        for kind in DispatchKind::ALL {
            assert_eq!(kind.to_string(), kind.as_str());
        }
    }
}
