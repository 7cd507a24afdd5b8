use std::sync::Arc;

use crate::automaton::{
    Automaton, AutomatonOptions, DeleteSubkeyScript, OwnerTrustScript, RevokeSubkeyScript,
};
use crate::channel::ChannelContext;
use crate::error::KeyEditError;
use crate::runner::{CommandExecutor, CommandSpec, SessionLauncher};
use crate::util::normalize_fingerprint;

use super::listing::{parse_colon_listing, KeyHandle};

/// Key reads and scripted key edits against one channel's key database.
pub struct KeyManager {
    ctx: Arc<ChannelContext>,
    gpg_path: String,
    executor: Arc<dyn CommandExecutor>,
    automaton: Automaton,
}

impl KeyManager {
    pub fn new(
        ctx: Arc<ChannelContext>,
        executor: Arc<dyn CommandExecutor>,
        launcher: Arc<dyn SessionLauncher>,
        opts: AutomatonOptions,
    ) -> Result<Self, KeyEditError> {
        let gpg_path = ctx
            .gpg_path
            .clone()
            .ok_or(KeyEditError::MissingTool("gpg"))?;
        let automaton = Automaton::new(launcher, gpg_path.clone(), ctx.info.home_dir(), opts);
        Ok(Self {
            ctx,
            gpg_path,
            executor,
            automaton,
        })
    }

    pub fn channel(&self) -> i32 {
        self.ctx.channel()
    }

    /// Reads `fingerprint` back from the key database.
    pub async fn get_key(&self, fingerprint: &str) -> Result<KeyHandle, KeyEditError> {
        let fpr = normalize_fingerprint(fingerprint)
            .ok_or_else(|| KeyEditError::InvalidFingerprint(fingerprint.to_string()))?;

        let spec = CommandSpec::new(&self.gpg_path)
            .arg("--homedir")
            .arg(self.ctx.info.home_dir().to_string_lossy())
            .args(["--batch", "--with-colons", "--fixed-list-mode", "--list-keys"])
            .arg(&fpr)
            .env("LC_ALL", "C");

        let out = self.executor.execute(&spec).await?;
        if !out.success() {
            tracing::debug!(
                channel = self.channel(),
                exit_code = out.exit_code,
                stderr = %out.stderr.trim(),
                "key listing returned non-zero"
            );
            return Err(KeyEditError::KeyNotFound(fpr));
        }

        parse_colon_listing(&out.stdout)
            .into_iter()
            .find(|k| {
                k.fingerprint.ends_with(&fpr)
                    || k.subkeys.iter().any(|s| s.key_id == fpr || s.fingerprint == fpr)
            })
            .ok_or(KeyEditError::KeyNotFound(fpr))
    }

    /// Sets the owner trust of `key`. Levels outside 1..=5 are passed through
    /// to gpg, which re-prompts and drives the dialogue into the error path.
    pub async fn set_owner_trust(&self, key: &KeyHandle, level: i32) -> Result<bool, KeyEditError> {
        if !(1..=5).contains(&level) {
            tracing::warn!(channel = self.channel(), level, "illegal owner trust level");
        }
        let ok = self
            .automaton
            .run_script(&key.fingerprint, OwnerTrustScript::new(level))
            .await;
        self.log_outcome("set_owner_trust", key, ok);
        Ok(ok)
    }

    pub async fn delete_subkey(&self, key: &KeyHandle, index: usize) -> Result<bool, KeyEditError> {
        check_subkey_index(key, index)?;
        let ok = self
            .automaton
            .run_script(&key.fingerprint, DeleteSubkeyScript::new(index))
            .await;
        self.log_outcome("delete_subkey", key, ok);
        Ok(ok)
    }

    pub async fn revoke_subkey(
        &self,
        key: &KeyHandle,
        index: usize,
        reason_code: u8,
        reason_text: &str,
    ) -> Result<bool, KeyEditError> {
        check_subkey_index(key, index)?;
        if reason_code > 3 {
            return Err(KeyEditError::InvalidReasonCode(reason_code));
        }
        let ok = self
            .automaton
            .run_script(
                &key.fingerprint,
                RevokeSubkeyScript::new(index, reason_code, reason_text),
            )
            .await;
        self.log_outcome("revoke_subkey", key, ok);
        Ok(ok)
    }

    fn log_outcome(&self, op: &'static str, key: &KeyHandle, ok: bool) {
        tracing::info!(
            channel = self.channel(),
            op,
            key = %key.fingerprint,
            success = ok,
            "key edit finished"
        );
    }
}

fn check_subkey_index(key: &KeyHandle, index: usize) -> Result<(), KeyEditError> {
    if index >= key.subkeys.len() {
        return Err(KeyEditError::InvalidSubkeyIndex {
            index,
            count: key.subkeys.len(),
        });
    }
    Ok(())
}

