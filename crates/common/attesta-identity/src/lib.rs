//! Party identity for the attesta workspace: the Ed25519 keypair a
//! party's signing agent holds, the external account-profile store, and
//! the resolver that maps internal identities to settlement addresses.

pub mod party_key;
pub mod profile;
pub mod resolver;

pub use party_key::PartyKey;
pub use profile::{MemoryProfileStore, PartyProfile, ProfileError, ProfileStore};
pub use resolver::{IdentityResolver, ResolveError, ResolvedParty};
