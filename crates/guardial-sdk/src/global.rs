//! Process-wide shared client.
//!
//! Adapters registered without an explicit client share one lazily created
//! [`GuardialClient`]. It is built at most once and lives until the process
//! exits.

use crate::client::GuardialClient;
use crate::config::GuardialConfig;
use crate::error::Result;
use std::sync::{Mutex, OnceLock};

static CLIENT: OnceLock<GuardialClient> = OnceLock::new();
static INIT: Mutex<()> = Mutex::new(());

/// Shared client, created from the environment on first use.
pub fn client() -> Result<&'static GuardialClient> {
    client_with(None)
}

/// Shared client, created from `config` on first use.
///
/// Once the client exists, later configurations are ignored.
pub fn client_with(config: Option<GuardialConfig>) -> Result<&'static GuardialClient> {
    if let Some(client) = CLIENT.get() {
        if config.is_some() {
            tracing::warn!("Guardial client already initialized; ignoring configuration override");
        }
        return Ok(client);
    }

    // Serialize fallible construction so only one client is ever built.
    let _guard = INIT.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(client) = CLIENT.get() {
        return Ok(client);
    }

    let config = match config {
        Some(config) => config,
        None => GuardialConfig::from_env()?,
    };
    let client = GuardialClient::new(config)?;
    Ok(CLIENT.get_or_init(|| client))
}

/// Shared client if one has been created.
pub fn try_get() -> Option<&'static GuardialClient> {
    CLIENT.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    // The singleton is process-global, so everything about it lives in one test.
    #[test]
    fn test_client_is_created_once() {
        let first_config = GuardialConfig::builder()
            .api_key("first")
            .build_with_env(Default::default())
            .unwrap();
        let second_config = GuardialConfig::builder()
            .api_key("second")
            .build_with_env(Default::default())
            .unwrap();

        let first = client_with(Some(first_config)).unwrap();
        let second = client_with(Some(second_config)).unwrap();

        assert!(std::ptr::eq(first, second));
        assert_eq!(second.config().api_key, "first");
        assert!(std::ptr::eq(try_get().unwrap(), first));
        assert_eq!(
            first.config().session_id,
            crate::session::process_session_id()
        );
    }
}
