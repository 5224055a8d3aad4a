//! Per-process session identifiers.
//!
//! Every analysis call carries a `session_id` so the service can correlate
//! traffic coming from one running instance. The identifier is generated on
//! first use and then reused for the rest of the process lifetime.

use chrono::Utc;
use std::sync::OnceLock;
use uuid::Uuid;

const RANDOM_SUFFIX_LEN: usize = 9;

static PROCESS_SESSION_ID: OnceLock<String> = OnceLock::new();

/// Session identifier of the current process.
pub fn process_session_id() -> &'static str {
    PROCESS_SESSION_ID.get_or_init(generate)
}

/// Generate a fresh identifier of the form `session_<unix-seconds>_<suffix>`.
pub fn generate() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "session_{}_{}",
        Utc::now().timestamp(),
        &suffix[..RANDOM_SUFFIX_LEN]
    )
}
