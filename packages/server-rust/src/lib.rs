//! Gatehouse Server — request authorization gate for Tower and axum.
//!
//! The gate itself lives in [`filter`]. [`authn`] prepares each request for
//! it, [`matcher`] and [`policy`] supply decision-makers, and [`network`]
//! wires everything into an axum server.

pub mod authn;
pub mod filter;
pub mod matcher;
pub mod network;
pub mod policy;

pub use authn::{AuthConfig, AuthenticationLayer, BearerAuthenticator};
pub use filter::{AuthorizationFilter, AuthorizationFilterLayer, FilterConfig, FilterError};
pub use matcher::{RequestMatcher, RequestMatcherDelegatingAuthorizationManager};
