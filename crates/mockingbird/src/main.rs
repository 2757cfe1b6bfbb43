use anyhow::Context;
use clap::{Parser, ValueEnum};
use mockingbird::admin_api::AdminApiServer;
use mockingbird::config::Settings;
use mockingbird::mock::MockServer;
use mockingbird::store::{ConfigurationStore, InMemoryStore, JsonFileStore};
use mockingbird::variables::{DynamicSubstitution, VariableStore, VariableSubstitutor};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "mockingbird", version, about = "Embedded mock HTTP server")]
struct Args {
    /// YAML settings file
    #[arg(short, long, env = "MOCKINGBIRD_CONFIG")]
    config: Option<PathBuf>,

    /// JSON file holding mock configurations (overrides dataFile)
    #[arg(short, long, env = "MOCKINGBIRD_DATA")]
    data: Option<PathBuf>,

    /// Admin API port (overrides admin.port)
    #[arg(long, env = "MOCKINGBIRD_ADMIN_PORT")]
    admin_port: Option<u16>,

    /// Do not start the admin API
    #[arg(long, env = "MOCKINGBIRD_NO_ADMIN")]
    no_admin: bool,

    /// Configuration to activate at start
    #[arg(long, env = "MOCKINGBIRD_CONFIGURATION")]
    configuration: Option<Uuid>,

    #[arg(long, value_enum, default_value = "text", env = "MOCKINGBIRD_LOG_FORMAT")]
    log_format: LogFormat,
}

fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    let _ = match format {
        LogFormat::Text => subscriber.try_init(),
        LogFormat::Json => subscriber.json().try_init(),
    };
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_format);

    let mut settings = match &args.config {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::default(),
    };
    if let Some(data) = args.data {
        settings.data_file = Some(data);
    }
    if let Some(port) = args.admin_port {
        settings.admin.port = port;
    }
    if args.no_admin {
        settings.admin.enabled = false;
    }

    let store: Arc<dyn ConfigurationStore> = match &settings.data_file {
        Some(path) => {
            info!("Using configuration file {}", path.display());
            Arc::new(JsonFileStore::new(path))
        }
        None => Arc::new(InMemoryStore::new()),
    };

    let variables = Arc::new(VariableStore::with_variables(
        settings.variables.entries.clone(),
        settings.variables.environment.clone(),
    ));
    let substitutor: Arc<dyn VariableSubstitutor> = if settings.resolve_dynamic_variables {
        Arc::new(DynamicSubstitution(Arc::clone(&variables)))
    } else {
        Arc::clone(&variables) as Arc<dyn VariableSubstitutor>
    };

    let server = Arc::new(MockServer::new(
        settings.mock_server_settings(),
        store,
        substitutor,
    ));

    match server.start(args.configuration).await {
        Ok(port) => info!("Serving mocks at http://localhost:{}", port),
        Err(e) => error!("Mock server did not start: {}", e),
    }

    if settings.admin.enabled {
        let addr: SocketAddr = format!("{}:{}", settings.bind_host, settings.admin.port)
            .parse()
            .with_context(|| format!("Invalid admin address {}:{}", settings.bind_host, settings.admin.port))?;
        let admin = AdminApiServer::new(addr, Arc::clone(&server), Arc::clone(&variables));
        tokio::spawn(async move {
            if let Err(e) = admin.run().await {
                error!("Admin API stopped: {}", e);
            }
        });
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutting down");

    if let Err(e) = server.stop().await {
        warn!("Error during shutdown: {}", e);
    }
    Ok(())
}
