//! Identity-verification daemon — entry point for running the HTTP service.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use idv_providers::{build_registry, PlaidEnvironment};
use idv_rpc::{AppState, RpcServer, ServiceConfig, ShutdownController};
use idv_store_lmdb::environment::DEFAULT_MAP_SIZE;
use idv_store_lmdb::LmdbEnvironment;
use idv_types::SystemClock;
use idv_utils::{init_logging, LogFormat};
use idv_verification::VerificationSessionController;

#[derive(Parser)]
#[command(name = "idv-daemon", about = "Identity-verification routing service")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "IDV_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP port.
    #[arg(long, env = "IDV_PORT")]
    port: Option<u16>,

    /// Directory for the LMDB environment.
    #[arg(long, env = "IDV_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log format: "human" or "json".
    #[arg(long, env = "IDV_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "IDV_LOG_LEVEL")]
    log_level: Option<String>,

    /// Seconds an unfinished session blocks a new start for the same user.
    #[arg(long, env = "IDV_SESSION_TTL_SECS")]
    session_ttl_secs: Option<u64>,

    /// Upper bound on a single provider API call, in seconds.
    #[arg(long, env = "IDV_PROVIDER_TIMEOUT_SECS")]
    provider_timeout_secs: Option<u64>,

    /// Allowed CORS origins (comma-separated, "*" for any).
    #[arg(long, env = "IDV_CORS_ALLOWED_ORIGINS", value_delimiter = ',')]
    cors_allowed_origins: Vec<String>,

    #[arg(long, env = "IDV_PLAID_CLIENT_ID")]
    plaid_client_id: Option<String>,

    #[arg(long, env = "IDV_PLAID_SECRET", hide_env_values = true)]
    plaid_secret: Option<String>,

    /// Plaid environment: "sandbox", "development", or "production".
    #[arg(long, env = "IDV_PLAID_ENVIRONMENT")]
    plaid_environment: Option<PlaidEnvironment>,

    #[arg(long, env = "IDV_PLAID_TEMPLATE_ID")]
    plaid_template_id: Option<String>,

    #[arg(long, env = "IDV_PERSONA_API_KEY", hide_env_values = true)]
    persona_api_key: Option<String>,

    #[arg(long, env = "IDV_PERSONA_TEMPLATE_ID")]
    persona_template_id: Option<String>,

    #[arg(long, env = "IDV_PERSONA_BASE_URL")]
    persona_base_url: Option<String>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the service.
    Run,
    /// Print the effective configuration as TOML, with secrets redacted.
    PrintConfig,
}

impl Cli {
    /// File (or default) config with every flag and env var applied on top.
    fn merged_config(&self) -> anyhow::Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::from_toml_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => ServiceConfig::default(),
        };

        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(format) = &self.log_format {
            config.log_format = format.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(ttl) = self.session_ttl_secs {
            config.session_ttl_secs = ttl;
        }
        if let Some(timeout) = self.provider_timeout_secs {
            config.provider_timeout_secs = timeout;
        }
        if !self.cors_allowed_origins.is_empty() {
            config.cors_allowed_origins = self.cors_allowed_origins.clone();
        }

        override_string(&mut config.plaid.client_id, &self.plaid_client_id);
        override_string(&mut config.plaid.secret, &self.plaid_secret);
        override_string(&mut config.plaid.template_id, &self.plaid_template_id);
        if let Some(env) = self.plaid_environment {
            config.plaid.environment = env;
        }
        override_string(&mut config.persona.api_key, &self.persona_api_key);
        override_string(&mut config.persona.template_id, &self.persona_template_id);
        override_string(&mut config.persona.base_url, &self.persona_base_url);

        Ok(config)
    }
}

fn override_string(target: &mut String, value: &Option<String>) {
    if let Some(value) = value {
        target.clone_from(value);
    }
}

fn redacted(config: &ServiceConfig) -> ServiceConfig {
    let mut config = config.clone();
    for secret in [&mut config.plaid.secret, &mut config.persona.api_key] {
        if !secret.is_empty() {
            *secret = "<redacted>".to_string();
        }
    }
    config
}

async fn run(config: ServiceConfig) -> anyhow::Result<()> {
    let params = config.params()?;

    let env = LmdbEnvironment::open(&config.data_dir, DEFAULT_MAP_SIZE)
        .with_context(|| format!("opening LMDB at {}", config.data_dir.display()))?;
    tracing::info!(data_dir = %config.data_dir.display(), "storage opened");

    let registry = build_registry(&config.plaid, &config.persona, params.provider_timeout())?;
    let providers = registry.configured();
    if providers.is_empty() {
        tracing::warn!("no verification provider is configured; every start will fail");
    }

    let controller = VerificationSessionController::new(
        Arc::new(env.record_store()),
        Arc::new(env.session_store()),
        Arc::new(registry),
        Arc::new(SystemClock),
        params,
    );
    let state = Arc::new(AppState::new(Arc::new(controller), providers));
    let server = RpcServer::new(config.port, state, config.cors_allowed_origins.clone());

    let shutdown = Arc::new(ShutdownController::new());
    let signals = shutdown.clone();
    tokio::spawn(async move { signals.wait_for_signal().await });

    tracing::info!(
        port = config.port,
        session_ttl_secs = config.session_ttl_secs,
        provider_timeout_secs = config.provider_timeout_secs,
        "starting identity-verification service"
    );
    server.start(shutdown.signalled()).await?;

    tracing::info!("idv daemon exited cleanly");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.merged_config()?;

    match cli.command {
        Command::PrintConfig => {
            print!("{}", redacted(&config).to_toml_string()?);
            Ok(())
        }
        Command::Run => {
            let format: LogFormat = config.log_format.parse()?;
            init_logging(format, &config.log_level);
            run(config).await
        }
    }
}
