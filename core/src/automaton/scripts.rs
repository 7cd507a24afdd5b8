//! `gpg --edit-key` dialogues for the edits gpgme does not expose directly.
//!
//! Every table maps unhandled `(state, keyword, args)` combinations to
//! `Error` explicitly; `Error` recovers to `Quit` on the next edit prompt.

use std::collections::VecDeque;

use super::driver::{EditScript, InteractionFlags};
use super::state::AutomatonState::{self, *};
use super::status::{GET_BOOL, GET_LINE};

const KEYEDIT_PROMPT: &str = "keyedit.prompt";
const KEYEDIT_SAVE_OKAY: &str = "keyedit.save.okay";

fn is(status: &str, args: &str, want_status: &str, want_args: &str) -> bool {
    status == want_status && args == want_args
}

fn quit_or_save(state: AutomatonState, status: &str, args: &str) -> Option<AutomatonState> {
    match state {
        Quit if is(status, args, GET_BOOL, KEYEDIT_SAVE_OKAY) => Some(Save),
        Error if is(status, args, GET_LINE, KEYEDIT_PROMPT) => Some(Quit),
        _ => None,
    }
}

/// Sets the owner trust of a key (`trust`).
#[derive(Debug, Clone)]
pub struct OwnerTrustScript {
    trust_level: i32,
}

impl OwnerTrustScript {
    pub fn new(trust_level: i32) -> Self {
        Self { trust_level }
    }
}

impl EditScript for OwnerTrustScript {
    fn next_state(state: AutomatonState, status: &str, args: &str) -> AutomatonState {
        if let Some(next) = quit_or_save(state, status, args) {
            return next;
        }
        match state {
            Start if is(status, args, GET_LINE, KEYEDIT_PROMPT) => Command,
            Command if is(status, args, GET_LINE, "edit_ownertrust.value") => Value,
            Value if is(status, args, GET_LINE, KEYEDIT_PROMPT) => Quit,
            Value if is(status, args, GET_BOOL, "edit_ownertrust.set_ultimate.okay") => Confirm,
            Confirm if is(status, args, GET_LINE, KEYEDIT_PROMPT) => Quit,
            _ => Error,
        }
    }

    fn action(&mut self, flags: &mut InteractionFlags, state: AutomatonState) -> String {
        match state {
            Command => "trust".to_string(),
            Value => {
                flags.set_success(true);
                self.trust_level.to_string()
            }
            Confirm | Save => {
                flags.set_success(true);
                "Y".to_string()
            }
            Quit => "quit".to_string(),
            Start | Select | ReasonCode | ReasonText | Error => String::new(),
        }
    }
}

/// Deletes one subkey (`key N`, `delkey`).
#[derive(Debug, Clone)]
pub struct DeleteSubkeyScript {
    subkey_index: usize,
}

impl DeleteSubkeyScript {
    pub fn new(subkey_index: usize) -> Self {
        Self { subkey_index }
    }
}

impl EditScript for DeleteSubkeyScript {
    fn next_state(state: AutomatonState, status: &str, args: &str) -> AutomatonState {
        if let Some(next) = quit_or_save(state, status, args) {
            return next;
        }
        match state {
            Start if is(status, args, GET_LINE, KEYEDIT_PROMPT) => Select,
            Select if is(status, args, GET_LINE, KEYEDIT_PROMPT) => Command,
            Command if is(status, args, GET_LINE, KEYEDIT_PROMPT) => Quit,
            Command if is(status, args, GET_BOOL, "keyedit.remove.subkey.okay") => Confirm,
            Confirm if is(status, args, GET_LINE, KEYEDIT_PROMPT) => Quit,
            _ => Error,
        }
    }

    fn action(&mut self, flags: &mut InteractionFlags, state: AutomatonState) -> String {
        match state {
            Select => format!("key {}", self.subkey_index),
            Command => "delkey".to_string(),
            Confirm | Save => {
                flags.set_success(true);
                "Y".to_string()
            }
            Quit => "quit".to_string(),
            Start | Value | ReasonCode | ReasonText | Error => String::new(),
        }
    }
}

/// Revokes one subkey (`key N`, `revkey`) with a reason code and free text.
#[derive(Debug, Clone)]
pub struct RevokeSubkeyScript {
    subkey_index: usize,
    reason_code: u8,
    reason_lines: VecDeque<String>,
}

impl RevokeSubkeyScript {
    pub fn new(subkey_index: usize, reason_code: u8, reason_text: &str) -> Self {
        Self {
            subkey_index,
            reason_code,
            reason_lines: reason_text
                .split('\n')
                .map(|l| l.trim_end_matches('\r'))
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn pending_reason_lines(&self) -> usize {
        self.reason_lines.len()
    }
}

impl EditScript for RevokeSubkeyScript {
    fn next_state(state: AutomatonState, status: &str, args: &str) -> AutomatonState {
        if let Some(next) = quit_or_save(state, status, args) {
            return next;
        }
        match state {
            Start if is(status, args, GET_LINE, KEYEDIT_PROMPT) => Select,
            Select if is(status, args, GET_LINE, KEYEDIT_PROMPT) => Command,
            Command if is(status, args, GET_LINE, KEYEDIT_PROMPT) => Quit,
            Command if is(status, args, GET_BOOL, "keyedit.revoke.subkey.okay") => Confirm,
            Confirm if is(status, args, GET_LINE, KEYEDIT_PROMPT) => Quit,
            Confirm if is(status, args, GET_LINE, "ask_revocation_reason.code") => ReasonCode,
            ReasonCode if is(status, args, GET_LINE, KEYEDIT_PROMPT) => Quit,
            ReasonCode if is(status, args, GET_LINE, "ask_revocation_reason.text") => ReasonText,
            ReasonText if is(status, args, GET_LINE, KEYEDIT_PROMPT) => Quit,
            ReasonText if is(status, args, GET_LINE, "ask_revocation_reason.text") => ReasonText,
            ReasonText if is(status, args, GET_BOOL, "ask_revocation_reason.okay") => Confirm,
            _ => Error,
        }
    }

    fn action(&mut self, flags: &mut InteractionFlags, state: AutomatonState) -> String {
        match state {
            Select => format!("key {}", self.subkey_index),
            Command => "revkey".to_string(),
            ReasonCode => self.reason_code.to_string(),
            // One queued line per prompt; an empty line ends the text.
            ReasonText => self.reason_lines.pop_front().unwrap_or_default(),
            Confirm => "Y".to_string(),
            Quit => "quit".to_string(),
            Save => {
                flags.set_success(true);
                "Y".to_string()
            }
            Start | Value | Error => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [AutomatonState; 10] = [
        Start, Select, Command, Value, ReasonCode, ReasonText, Confirm, Quit, Save, Error,
    ];

    #[test]
    fn unknown_prompts_always_resolve_to_error() {
        for state in ALL_STATES {
            for (status, args) in [
                ("GET_LINE", "something.unexpected"),
                ("GET_BOOL", ""),
                ("GET_HIDDEN", "passphrase.enter"),
                ("", ""),
            ] {
                assert_eq!(OwnerTrustScript::next_state(state, status, args), Error);
                assert_eq!(DeleteSubkeyScript::next_state(state, status, args), Error);
                assert_eq!(RevokeSubkeyScript::next_state(state, status, args), Error);
            }
        }
    }

    #[test]
    fn error_recovers_to_quit_on_prompt() {
        assert_eq!(
            OwnerTrustScript::next_state(Error, GET_LINE, KEYEDIT_PROMPT),
            Quit
        );
        assert_eq!(
            DeleteSubkeyScript::next_state(Error, GET_LINE, KEYEDIT_PROMPT),
            Quit
        );
        assert_eq!(
            RevokeSubkeyScript::next_state(Error, GET_LINE, KEYEDIT_PROMPT),
            Quit
        );
    }

    #[test]
    fn owner_trust_happy_path() {
        let mut script = OwnerTrustScript::new(5);
        let mut flags = InteractionFlags::default();

        let s = OwnerTrustScript::next_state(Start, GET_LINE, KEYEDIT_PROMPT);
        assert_eq!(s, Command);
        assert_eq!(script.action(&mut flags, s), "trust");
        assert!(!flags.success());

        let s = OwnerTrustScript::next_state(s, GET_LINE, "edit_ownertrust.value");
        assert_eq!(script.action(&mut flags, s), "5");
        assert!(flags.success());

        let s = OwnerTrustScript::next_state(s, GET_BOOL, "edit_ownertrust.set_ultimate.okay");
        assert_eq!(s, Confirm);
        assert_eq!(script.action(&mut flags, s), "Y");

        let s = OwnerTrustScript::next_state(s, GET_LINE, KEYEDIT_PROMPT);
        assert_eq!(script.action(&mut flags, s), "quit");
        let s = OwnerTrustScript::next_state(s, GET_BOOL, KEYEDIT_SAVE_OKAY);
        assert_eq!(s, Save);
    }

    #[test]
    fn delete_selects_then_deletes() {
        let mut script = DeleteSubkeyScript::new(2);
        let mut flags = InteractionFlags::default();
        let s = DeleteSubkeyScript::next_state(Start, GET_LINE, KEYEDIT_PROMPT);
        assert_eq!(script.action(&mut flags, s), "key 2");
        let s = DeleteSubkeyScript::next_state(s, GET_LINE, KEYEDIT_PROMPT);
        assert_eq!(script.action(&mut flags, s), "delkey");
        let s = DeleteSubkeyScript::next_state(s, GET_BOOL, "keyedit.remove.subkey.okay");
        assert_eq!(script.action(&mut flags, s), "Y");
        assert!(flags.success());
    }

    #[test]
    fn reason_text_is_drained_one_line_per_prompt() {
        let mut script = RevokeSubkeyScript::new(1, 2, "line1\n\nline2\n");
        let mut flags = InteractionFlags::default();
        assert_eq!(script.pending_reason_lines(), 2);

        assert_eq!(script.action(&mut flags, ReasonText), "line1");
        assert_eq!(script.action(&mut flags, ReasonText), "line2");
        assert_eq!(script.action(&mut flags, ReasonText), "");
        assert_eq!(script.action(&mut flags, ReasonText), "");
        assert!(!flags.success());
    }

    #[test]
    fn revoke_only_flags_success_at_save() {
        let mut script = RevokeSubkeyScript::new(1, 0, "");
        let mut flags = InteractionFlags::default();
        for state in [Select, Command, Confirm, ReasonCode, ReasonText, Quit, Error] {
            script.action(&mut flags, state);
            assert!(!flags.success(), "{state:?} must not flag success");
        }
        assert_eq!(script.action(&mut flags, Save), "Y");
        assert!(flags.success());
    }
}
