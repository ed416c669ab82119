use crate::config::Config;
use crate::store::ItemStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: ItemStore,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            store: ItemStore::from_config(config),
        }
    }
}
