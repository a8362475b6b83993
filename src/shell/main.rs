use anyhow::Context;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{Extension, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, fmt};

use work_logs::modules::work_logs::adapters::outbound::local_storage::LocalLogStorage;
use work_logs::modules::work_logs::core::store::EntryStore;
use work_logs::shared::core::primitives::SystemClock;
use work_logs::shared::infrastructure::connectivity::ConnectivityMonitor;
use work_logs::shared::infrastructure::connectivity::probe::ConnectivityProbe;
use work_logs::shared::infrastructure::key_value::file::FileKeyValueStorage;
use work_logs::shell::config::AppConfig;
use work_logs::shell::graphql::{AppSchema, build_schema};
use work_logs::shell::http::router;
use work_logs::shell::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = AppConfig::from_env()?;
    tracing::debug!(?config, "configuration loaded");

    let local = Arc::new(LocalLogStorage::new(FileKeyValueStorage::open(
        config.data_dir.clone(),
    )?));
    // The shared directory plays the remote collection other devices sync through.
    let remote = Arc::new(LocalLogStorage::new(FileKeyValueStorage::open(
        config.shared_dir.clone(),
    )?));

    let entries = local.load().context("loading local work logs")?;
    tracing::info!(count = entries.len(), dir = %config.data_dir.display(), "local work logs loaded");
    let mut store = EntryStore::from_entries(entries).context("rebuilding the entry store")?;
    store.register(local);

    let connectivity = ConnectivityMonitor::new(config.start_online);
    if let Some(target) = &config.probe_addr {
        let probe = ConnectivityProbe::new(target.clone(), config.probe_interval);
        tokio::spawn(probe.run(connectivity.clone()));
    }

    let state = AppState::spawn(
        store,
        remote,
        Arc::new(SystemClock),
        connectivity,
        config.sync_options(),
    )
    .with_export_dir(config.export_dir.clone());
    let schema = build_schema(state.clone());

    let app = router(state)
        .route("/gql", get(graphiql).post(graphql))
        .layer(Extension(schema))
        .layer(TraceLayer::new_for_http());

    tracing::info!("HTTP endpoint: http://{}", config.addr);
    tracing::info!("GraphQL endpoint: http://{}/gql", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn graphql(Extension(schema): Extension<AppSchema>, req: GraphQLRequest) -> GraphQLResponse {
    schema.execute(req.into_inner()).await.into()
}

async fn graphiql() -> axum::response::Html<String> {
    use async_graphql::http::GraphiQLSource;
    axum::response::Html(GraphiQLSource::build().endpoint("/gql").finish())
}
