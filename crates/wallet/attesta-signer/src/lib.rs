//! The party-side signing agent. After commit phase 1 the server hands
//! the issuer an issuance package; this crate turns it into a signed
//! anchor transaction, submits it, and waits for settlement. Signing keys
//! live here and only here; the server never sees them.

pub mod anchor;

pub use anchor::{AnchorClient, SignerError};
