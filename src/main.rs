use anyhow::{Context, Result};
use catalog_sync::{
    access::{AccessGate, ensure_admin},
    api::{self, AppState},
    config::{self, Config},
    content::{ContentStore, MemoryContentStore},
    import::ImportService,
    logging,
    metrics::CatalogMetrics,
    qdrant::QdrantSearchIndex,
    search::{MemorySearchIndex, SearchIndex, SearchSettings, SearchSync},
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::init_config().context("failed to load configuration")?;
    logging::init_tracing();

    let store = Arc::new(MemoryContentStore::new());
    let metrics = Arc::new(CatalogMetrics::new());
    let index = build_index(config).await?;
    let sync = Arc::new(SearchSync::new(
        index.clone(),
        SearchSettings::new(config.searchable_collections.iter().copied()),
        metrics.clone(),
    ));
    store.subscribe(sync.clone());

    if let (Some(email), Some(api_key)) = (&config.admin_email, &config.admin_api_key) {
        ensure_admin(store.as_ref(), email, api_key)
            .await
            .context("failed to seed admin user")?;
    }

    let state = AppState {
        importer: Arc::new(ImportService::new(store.clone(), metrics)),
        store,
        index,
        sync,
        gate: AccessGate::new(config.payload_api_key.clone()),
        has_payload_secret: config.payload_secret.is_some(),
        import_max_bytes: config.import_max_bytes,
    };
    let app = api::create_router(state);

    let (listener, port) = bind_listener()
        .await
        .context("failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

async fn build_index(config: &Config) -> Result<Arc<dyn SearchIndex>> {
    let Some(url) = config.qdrant_url.as_deref() else {
        tracing::info!("QDRANT_URL not set; using in-memory search index");
        return Ok(Arc::new(MemorySearchIndex::new()));
    };
    let index = QdrantSearchIndex::connect(
        url,
        config.qdrant_api_key.clone(),
        &config.qdrant_collection_name,
        config.search_vector_dimension,
    )
    .await
    .with_context(|| format!("failed to prepare Qdrant collection at {url}"))?;
    Ok(Arc::new(index))
}

async fn bind_listener() -> Result<(TcpListener, u16), std::io::Error> {
    use std::net::Ipv4Addr;

    let config = config::get_config();
    if let Some(port) = config.server_port {
        return TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .map(|listener| (listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 3000..=3099;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No available port found in range 3000-3099",
    ))
}
