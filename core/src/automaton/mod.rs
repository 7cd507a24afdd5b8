//! Scripted `gpg --edit-key` dialogues driven by `[GNUPG:]` status prompts.

mod driver;
mod scripts;
mod state;
mod status;

pub use driver::{
    AbortReason, Automaton, AutomatonOptions, EditScript, InteractionFlags, InteractionReport,
};
pub use scripts::{DeleteSubkeyScript, OwnerTrustScript, RevokeSubkeyScript};
pub use state::AutomatonState;
pub use status::{StatusEvent, StatusKeyword, GET_BOOL, GET_HIDDEN, GET_LINE, STATUS_PREFIX};
