//! # lumigram-auth
//!
//! Client-side authentication session controller for the Lumigram app.
//!
//! ARCHITECTURE
//! ============
//! The identity provider is an external collaborator behind the
//! [`provider::IdentityProvider`] trait. [`controller::AuthSessionController`]
//! composes three parts on top of it:
//!
//! - [`mirror`]: mirrors provider notifications into [`state::AuthState`].
//! - [`gateway`]: login/register/logout with in-flight and error bookkeeping.
//! - [`guard`]: redirects whenever session state and route class disagree.
//!
//! The router is the other collaborator, behind [`router::Router`].

pub mod config;
pub mod controller;
pub mod errors;
pub mod gateway;
pub mod guard;
pub mod mirror;
pub mod notice;
pub mod provider;
pub mod router;
pub mod state;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use controller::AuthSessionController;
pub use errors::{AuthError, ControllerError, ProviderError};
pub use state::{ActionState, AuthState, Session, SessionResolution};
