//! Dialogue positions of a scripted key-edit session.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AutomatonState {
    /// Session spawned, nothing answered yet.
    Start,
    /// Selecting a subkey (`key N`).
    Select,
    /// Issuing the edit command (`trust`, `delkey`, `revkey`).
    Command,
    /// Answering a value prompt (owner trust level).
    Value,
    /// Answering the revocation reason code.
    ReasonCode,
    /// Answering one line of the revocation reason text.
    ReasonText,
    /// Acknowledging a yes/no confirmation.
    Confirm,
    /// Leaving the edit prompt.
    Quit,
    /// Acknowledging the save prompt.
    Save,
    /// An unexpected prompt was seen.
    Error,
}

impl AutomatonState {
    pub fn is_error(self) -> bool {
        matches!(self, AutomatonState::Error)
    }

    pub fn description(self) -> &'static str {
        match self {
            AutomatonState::Start => "start",
            AutomatonState::Select => "select subkey",
            AutomatonState::Command => "issue command",
            AutomatonState::Value => "answer value",
            AutomatonState::ReasonCode => "answer reason code",
            AutomatonState::ReasonText => "answer reason text",
            AutomatonState::Confirm => "confirm",
            AutomatonState::Quit => "quit",
            AutomatonState::Save => "save",
            AutomatonState::Error => "error",
        }
    }
}

impl std::fmt::Display for AutomatonState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}
