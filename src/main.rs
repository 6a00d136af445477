use ecostream::config::ServiceConfig;
use ecostream::domain::{FanoutDispatcher, IngestService, SubscriptionRegistry, TelemetryQueries};
use ecostream::http::{self, AppState};
use ecostream::mqtt::{run_mqtt_subscriber, MqttSubscriberConfig};
use ecostream::realtime::ObserverHub;
use ecostream::runner::Runner;
use ecostream::store::{ClickHouseClient, ClickHousePointWriter, ClickHouseQueryRepository};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        broker = %config.mqtt_broker_url,
        topic = %config.mqtt_topic,
        store = %config.clickhouse_url,
        listen = %config.http_listen_addr,
        "starting ecostream"
    );

    let listen_addr: SocketAddr = match config.http_listen_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!(addr = %config.http_listen_addr, error = %e, "invalid HTTP listen address");
            std::process::exit(1);
        }
    };

    let store_client = ClickHouseClient::new(
        &config.clickhouse_url,
        &config.clickhouse_database,
        &config.clickhouse_username,
        &config.clickhouse_password,
    );

    // The service still starts if the store is down; writes and queries
    // surface their own errors once it matters.
    if let Err(e) = store_client.ping().await {
        warn!(error = %e, "ClickHouse is not reachable at startup");
    }

    let queries = match ClickHouseQueryRepository::new(
        store_client.clone(),
        config.clickhouse_table.clone(),
    ) {
        Ok(repo) => repo,
        Err(e) => {
            error!(table = %config.clickhouse_table, error = %e, "invalid store configuration");
            std::process::exit(1);
        }
    };
    let queries: Arc<dyn TelemetryQueries> = Arc::new(queries);

    let writer = Arc::new(ClickHousePointWriter::new(
        store_client,
        config.clickhouse_table.clone(),
    ));

    let registry = Arc::new(SubscriptionRegistry::new());
    let hub = Arc::new(ObserverHub::new());
    let dispatcher = Arc::new(FanoutDispatcher::new(
        Arc::clone(&registry),
        Arc::clone(&hub) as _,
    ));
    let ingest = Arc::new(IngestService::new(writer, dispatcher));

    let state = AppState {
        queries,
        registry,
        hub: Arc::clone(&hub),
    };
    let router = http::router(state);

    let mqtt_config = MqttSubscriberConfig {
        broker_url: config.mqtt_broker_url,
        username: config.mqtt_username,
        password: config.mqtt_password,
        topic: config.mqtt_topic,
        max_retry_attempts: config.mqtt_max_retry_attempts,
        retry_delay: Duration::from_secs(config.mqtt_retry_delay_secs),
    };

    Runner::new()
        .with_app_process(move |token| http::serve(listen_addr, router, token))
        .with_app_process(move |token| run_mqtt_subscriber(mqtt_config, token, ingest))
        .with_closer(move || async move {
            info!(connected = hub.connected(), "closing real-time channel");
            Ok(())
        })
        .with_closer_timeout(Duration::from_secs(10))
        .run()
        .await;
}
