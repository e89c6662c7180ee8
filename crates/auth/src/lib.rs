//! Identity verification for tool invocations.
//!
//! Core principle: **no computation runs for an unverified caller.**
//!
//! Session issuance (OAuth, API-key provisioning) happens elsewhere; this
//! crate only checks the opaque [`IdentityToken`] a caller presents and turns
//! it into an [`Identity`].

mod authenticator;
mod error;
mod identity;

pub use authenticator::{Authenticator, KeyList};
pub use error::{Error, Result};
pub use identity::{Identity, IdentityToken};
