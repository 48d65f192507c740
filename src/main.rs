use clap::Parser;
use schema_replicator::config::LogFormat;
use schema_replicator::{Config, Replicator, Result, ShutdownController};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "schema-replicator")]
#[command(about = "Kafka replicator with schema registry id translation", long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let loaded = Config::from_file(&args.config);
    init_logging(
        loaded
            .as_ref()
            .map(|cfg| cfg.logging.format)
            .unwrap_or_default(),
    );

    info!("Starting schema-replicator");
    info!("Loading configuration from {:?}", args.config);

    let config = match loaded {
        Ok(cfg) => {
            info!("Configuration loaded successfully");
            cfg
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    info!(
        src_bootstrap_servers = ?config.src_kafka.get("bootstrap.servers"),
        src_topics = ?config.src_topics,
        src_schema_registry = %config.src_schema_registry.url,
        dst_bootstrap_servers = ?config.dst_kafka.get("bootstrap.servers"),
        dst_topic = %config.dst_topic,
        dst_schema_registry = %config.dst_schema_registry.url,
        subject = %config.subject_name,
        "Configuration summary"
    );

    let shutdown = ShutdownController::new();
    shutdown.listen_for_signals();

    let replicator = match Replicator::from_config(&config).await {
        Ok(replicator) => replicator,
        Err(e) => {
            error!("Failed to start replicator: {}", e);
            return Err(e);
        }
    };

    let stats = match replicator.run(shutdown.signal()).await {
        Ok(stats) => stats,
        Err(e) => {
            error!("Replication failed: {}", e);
            return Err(e);
        }
    };
    info!(
        replicated = stats.replicated,
        skipped = stats.skipped,
        "schema-replicator stopped"
    );

    Ok(())
}

fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("schema_replicator=info,warn"));

    let fmt_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
