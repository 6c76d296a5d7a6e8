use std::sync::Arc;

use crate::assets::AssetCache;
use crate::companion::Companion;
use crate::quota::QuotaLedger;
use crate::sync::SyncLayer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<QuotaLedger>,
    pub cache: Arc<AssetCache>,
    pub sync: SyncLayer,
    pub companion: Arc<Companion>,
}
