//! Reading keys back from a key database and editing them through the automaton.

mod listing;
mod manager;

pub use listing::{parse_colon_listing, KeyHandle, OwnerTrust, Subkey};
pub use manager::KeyManager;
