//! Concealed-value boundary for secret role assignment.
//!
//! The game server only ever holds [`ConcealedHandle`]s. Plaintexts are committed,
//! attested and opened through a [`ConfidentialValueAdapter`]; [`RoleVault`] is the
//! reference backend, a trusted dealer that keeps an audit trail of every opening.

pub mod adapter;
pub mod crypto;
pub mod error;
pub mod models;
pub mod vault;

pub use adapter::*;
pub use crypto::*;
pub use error::*;
pub use models::*;
pub use vault::*;
