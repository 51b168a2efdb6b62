//! Entry point for the data-node process: loads configuration, wires every
//! component (C2-C10) together, and serves the HTTP surface until asked to
//! shut down.

mod config;
mod logging;
mod shutdown;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tsdb_auth::AuthService;
use tsdb_broker::{spawn_apply_loop, Broker, LocalBroker, RemoteBroker};
use tsdb_cluster::{DataNodeRegistry, ShardRouter};
use tsdb_cq::ContinuousQueryRunner;
use tsdb_meta::Metastore;
use tsdb_query::{InMemoryShardExecutor, QueryPipeline};
use tsdb_write::replica::HttpReplicaTransport;
use tsdb_write::{InMemoryShardStore, WriteCoordinator};

/// The distributed time-series data node.
#[derive(Parser, Debug)]
struct Args {
    /// Directory holding `base.toml` and `${APP_ENV}.toml`.
    #[arg(long = "config-dir", default_value = "config")]
    config_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = config::load_settings(&args.config_dir)?;
    logging::init(&settings.logging)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(settings))
}

async fn run(settings: config::Settings) -> anyhow::Result<()> {
    let broker: Arc<dyn Broker> = if let Some(leader) = settings.initialization.join_urls.first() {
        tracing::info!(leader = %leader, "joining existing cluster");
        Arc::new(RemoteBroker::new(leader.clone()))
    } else {
        tracing::info!("no join-urls configured, bootstrapping a fresh single-node broker");
        Arc::new(LocalBroker::new())
    };

    let meta = Metastore::new();
    spawn_apply_loop(broker.clone(), meta.clone());

    let auth = AuthService::new(broker.clone(), meta.clone());
    let router = ShardRouter::new(broker.clone(), meta.clone())
        .with_future_write_skew(settings.cluster.future_write_skew.as_nanos() as i64);
    let registry = DataNodeRegistry::new(broker.clone(), meta.clone());

    let advertised_url = format!("http://0.0.0.0:{}", settings.data.port);
    let local_node = registry.register(advertised_url).await?;
    tracing::info!(node_id = local_node.id.0, "registered data node");

    let store = Arc::new(InMemoryShardStore::new());
    let transport = Arc::new(HttpReplicaTransport::new());
    let writer = Arc::new(WriteCoordinator::new(
        broker.clone(),
        meta.clone(),
        auth.clone(),
        router,
        registry.clone(),
        store.clone(),
        transport,
        local_node.id,
        settings.cluster.write_ack_w,
    ));

    let executor = Arc::new(InMemoryShardExecutor::new(store));
    let query = Arc::new(QueryPipeline::new(meta.clone(), auth.clone(), executor));

    let cq_runner = Arc::new(ContinuousQueryRunner::new(
        meta.clone(),
        broker.clone(),
        query.clone(),
        writer.clone(),
        local_node.id,
    ));
    tokio::spawn(cq_runner.clone().run(shutdown::signal()));

    let state = tsdb_http::AppState::new(
        meta,
        broker,
        auth,
        registry,
        writer,
        query,
        cq_runner,
        local_node.id,
        settings.authentication.enabled,
    );
    let app = tsdb_http::router(state);

    let addr = format!("0.0.0.0:{}", settings.data.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::signal())
        .await?;

    Ok(())
}
