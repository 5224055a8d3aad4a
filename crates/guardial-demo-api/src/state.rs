//! Shared application state

use guardial_sdk::GuardialClient;

#[derive(Clone)]
pub struct AppState {
    pub guardial: GuardialClient,
}

impl AppState {
    pub fn new(guardial: GuardialClient) -> Self {
        Self { guardial }
    }
}
