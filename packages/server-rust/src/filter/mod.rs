//! The request authorization gate and the per-request state it relies on.
//!
//! - [`authorization`]: `AuthorizationFilterLayer` / `AuthorizationFilter` Tower middleware
//! - [`config`]: once-per-request and dispatch-kind toggles
//! - [`attributes`]: per-request attribute bag and the scoped "already applied" marker
//! - [`error`]: `FilterError` and its HTTP translation

pub mod attributes;
pub mod authorization;
pub mod config;
pub mod error;

pub use attributes::RequestAttributes;
pub use authorization::{AuthorizationFilter, AuthorizationFilterLayer};
pub use config::FilterConfig;
pub use error::{authorization_error_response, handle_filter_error, FilterError};
