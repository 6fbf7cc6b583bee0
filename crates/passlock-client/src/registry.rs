//! Credential registry over the ledger's note log.
//!
//! The setup call publishes `prefix || encode(bundle)` in its note,
//! where the prefix is the setup's top-of-chain digest. Anyone who can
//! re-derive the seed from the password recomputes the prefix and finds
//! the bundle by note search; no side channel or index is needed.

use tracing::debug;

use passlock_auth::CredentialBundle;
use passlock_core::{AppId, Digest};
use passlock_ledger::LogSearch;

use crate::error::{ClientError, Result};

/// Build the note payload a setup call carries.
pub fn setup_note(prefix: &Digest, bundle: &CredentialBundle) -> Vec<u8> {
    let mut note = Vec::with_capacity(32 + 256);
    note.extend_from_slice(prefix.as_bytes());
    note.extend_from_slice(&bundle.encode());
    note
}

/// Find the credential bundle published under `prefix`.
///
/// Scans newest first, so a re-setup under the same prefix shadows the
/// older bundle. Entries that fail to decode or verify, or that name a
/// different instance, are skipped rather than fatal; the log is a
/// public channel and anyone can write near-misses into it.
pub async fn retrieve<S: LogSearch + ?Sized>(
    search: &S,
    app_id: AppId,
    prefix: &Digest,
) -> Result<CredentialBundle> {
    let entries = search
        .search_by_note_prefix(app_id, prefix.as_bytes())
        .await?;

    for entry in entries {
        if entry.note.len() <= 32 {
            continue;
        }
        let bundle = match CredentialBundle::decode(&entry.note[32..]) {
            Ok(bundle) => bundle,
            Err(_) => continue,
        };
        if bundle.app_id() != app_id || bundle.verify().is_err() {
            continue;
        }
        debug!(app_id, op_id = %entry.op_id, "found credential bundle");
        return Ok(bundle);
    }

    Err(ClientError::NotFound)
}
