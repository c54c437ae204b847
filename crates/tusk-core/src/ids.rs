//! Unique id generation
//!
//! Entity ids are UUID-v4-shaped strings built from 128 bits of OS
//! randomness. Random (not counter-based) ids keep the prefix and shortcut
//! resolution tiers collision-resistant. If the randomness source fails we
//! fall back to a timestamp-derived id and log the degradation.

use rand::rngs::OsRng;
use rand::RngCore;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;
use uuid::Builder;

/// Number of id characters used for a project's default shortcut
pub const SHORTCUT_LEN: usize = 8;

/// Minimum token length before prefix resolution is attempted
pub const MIN_PREFIX_LEN: usize = 6;

/// Generate a new opaque entity id
pub fn generate_id() -> String {
    let mut bytes = [0u8; 16];
    match OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => Builder::from_random_bytes(bytes).into_uuid().to_string(),
        Err(err) => {
            warn!(error = %err, "OS randomness unavailable, using timestamp-derived id");
            fallback_id()
        }
    }
}

/// Deterministic degraded-mode id. Still UUID-shaped so prefix and shortcut
/// handling stay uniform.
fn fallback_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&nanos.to_be_bytes());
    Builder::from_random_bytes(bytes).into_uuid().to_string()
}

/// Default shortcut for a freshly created project
pub fn default_shortcut(id: &str) -> String {
    id.chars().take(SHORTCUT_LEN).collect()
}
