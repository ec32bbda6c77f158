use crate::config::Config;
use crate::ledger::Ledger;
use crate::objects::ObjectStore;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    pub objects: Arc<dyn ObjectStore>,
    pub config: Arc<Config>,
}
