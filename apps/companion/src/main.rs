mod assets;
mod clock;
mod companion;
mod config;
mod db;
mod errors;
mod gamification;
mod genai;
mod models;
mod quota;
mod routes;
mod state;
mod storage;
mod sync;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::assets::{AssetCache, BlobStore, DisabledBlobStore, FsBlobStore, S3BlobStore};
use crate::clock::{Clock, SystemClock};
use crate::companion::Companion;
use crate::config::{Config, S3Config};
use crate::db::{create_pool, ensure_schema};
use crate::genai::GeminiClient;
use crate::quota::QuotaLedger;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{KeyValueStore, LocalRepository, MemoryStore, RedisStore};
use crate::sync::{PgAuthProvider, PgDocumentStore, Remote, SyncLayer, SyncOptions};

const REDIS_KEY_PREFIX: &str = "companion:";
const S3_AUDIO_PREFIX: &str = "audio/";

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting companion v{}", env!("CARGO_PKG_VERSION"));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Local key-value store
    let store = build_local_store(&config).await;
    let local = Arc::new(LocalRepository::new(store));

    // Remote document store (optional)
    let remote = build_remote(&config).await;
    let sync = SyncLayer::new(
        local.clone(),
        remote,
        clock.clone(),
        SyncOptions {
            outbox: config.sync_outbox,
            ..SyncOptions::default()
        },
    );
    if let Some(identity) = sync.resume_session().await {
        info!("Signed in as {}", identity.uid);
    }

    // Energy ledger
    let ledger = Arc::new(QuotaLedger::new(local, clock.clone()));
    let mut energy_events = ledger.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = energy_events.recv().await {
            info!("Energy now {} for {}", event.current, event.date);
        }
    });

    // Audio cache
    let blobs = build_blob_store(&config).await;
    let cache = Arc::new(AssetCache::open(blobs, clock.clone(), config.audio_cache_max_bytes).await);

    // Generative AI client
    let ai = GeminiClient::new(config.gemini_api_key.clone(), config.gemini_base_url.clone())?;
    info!("Gemini client initialized (model: {})", genai::TEXT_MODEL);

    let companion = Arc::new(Companion::new(
        ledger.clone(),
        cache.clone(),
        Arc::new(ai),
        config.narration_timeout,
    ));

    // Build app state
    let state = AppState {
        ledger,
        cache,
        sync,
        companion,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Redis when configured and reachable, otherwise an in-process map.
async fn build_local_store(config: &Config) -> Arc<dyn KeyValueStore> {
    let Some(url) = &config.redis_url else {
        info!("REDIS_URL not set, local state kept in memory");
        return Arc::new(MemoryStore::new());
    };
    match RedisStore::connect(url, REDIS_KEY_PREFIX).await {
        Ok(store) => {
            info!("Local state stored in Redis");
            Arc::new(store)
        }
        Err(e) => {
            warn!("Redis unavailable ({e}), local state kept in memory");
            Arc::new(MemoryStore::new())
        }
    }
}

/// PostgreSQL-backed remote when configured and reachable. `None` means the
/// service runs local-only.
async fn build_remote(config: &Config) -> Option<Remote> {
    let Some(url) = &config.database_url else {
        info!("DATABASE_URL not set, running local-only");
        return None;
    };
    let pool = match create_pool(url).await {
        Ok(pool) => pool,
        Err(e) => {
            warn!("PostgreSQL unavailable ({e}), running local-only");
            return None;
        }
    };
    if let Err(e) = ensure_schema(&pool).await {
        warn!("Failed to prepare remote schema ({e}), running local-only");
        return None;
    }
    Some(Remote {
        docs: Arc::new(PgDocumentStore::new(pool.clone())),
        auth: Arc::new(PgAuthProvider::new(pool)),
    })
}

/// S3 when configured, otherwise the cache directory. A directory that
/// cannot be created leaves narration uncached rather than stopping startup.
async fn build_blob_store(config: &Config) -> Arc<dyn BlobStore> {
    if let Some(s3) = &config.s3 {
        let client = build_s3_client(s3).await;
        info!("Audio cache backed by s3://{}/{}", s3.bucket, S3_AUDIO_PREFIX);
        return Arc::new(S3BlobStore::new(client, &s3.bucket, S3_AUDIO_PREFIX));
    }
    match FsBlobStore::open(&config.audio_cache_dir).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(
                "Audio cache directory {} unusable ({e}), narration will not be cached",
                config.audio_cache_dir.display()
            );
            Arc::new(DisabledBlobStore)
        }
    }
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(s3: &S3Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &s3.access_key_id,
        &s3.secret_access_key,
        None,
        None,
        "companion-static",
    );

    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(s3.region.clone()))
        .credentials_provider(credentials);
    if let Some(endpoint) = &s3.endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    let sdk_config = loader.load().await;

    // MinIO serves buckets by path rather than virtual host.
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(s3.endpoint.is_some())
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}
