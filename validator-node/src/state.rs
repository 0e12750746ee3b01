//! Shared application state.

use std::sync::Arc;

use popv_chain::ChainReader;

/// State handed to request handlers.
///
/// Handlers only ever read the chain through its published snapshots; the
/// pipeline worker is the sole writer.
pub struct AppState {
    pub chain: ChainReader,
}

/// Thread-safe alias for `AppState`.
pub type SharedState = Arc<AppState>;
