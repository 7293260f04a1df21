//! `gatehouse` -- serves the demo API behind the request authorization gate.
//!
//! Every flag can also be set through its `GATEHOUSE_*` environment variable.
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::time::Duration;

use clap::{Parser, ValueEnum};
use gatehouse_core::TracingEventPublisher;
use gatehouse_server::network::{NetworkConfig, NetworkModule};
use gatehouse_server::policy::default_policy;
use gatehouse_server::{
    AuthConfig, AuthenticationLayer, AuthorizationFilterLayer, BearerAuthenticator, FilterConfig,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "gatehouse", version, about = "HTTP server guarded by a request authorization gate")]
struct Args {
    /// Address to bind.
    #[arg(long, env = "GATEHOUSE_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on; 0 picks a free port.
    #[arg(long, env = "GATEHOUSE_PORT", default_value_t = 8080)]
    port: u16,

    /// HMAC secret for HS256 bearer tokens. Without it no caller can authenticate.
    #[arg(long, env = "GATEHOUSE_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Required `iss` claim of bearer tokens.
    #[arg(long, env = "GATEHOUSE_JWT_ISSUER")]
    jwt_issuer: Option<String>,

    /// Check every dispatch, including error and async re-entries, once per dispatch.
    #[arg(long, env = "GATEHOUSE_FILTER_ALL_DISPATCH")]
    filter_all_dispatch: bool,

    /// Allowed CORS origins, comma separated.
    #[arg(long, env = "GATEHOUSE_CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    cors_origins: Vec<String>,

    /// Per-request timeout in seconds.
    #[arg(long, env = "GATEHOUSE_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    request_timeout_secs: u64,

    #[arg(long, env = "GATEHOUSE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let authentication = match &args.jwt_secret {
        Some(secret) => {
            let config = AuthConfig {
                issuer: args.jwt_issuer.clone(),
                ..AuthConfig::new(secret.clone())
            };
            AuthenticationLayer::with_bearer(BearerAuthenticator::new(&config))
        }
        None => {
            warn!("no JWT secret configured; all callers are unauthenticated");
            AuthenticationLayer::new()
        }
    };

    let mut filter_config = FilterConfig::default();
    filter_config.set_should_filter_all_dispatcher_types(args.filter_all_dispatch);
    let authorization = AuthorizationFilterLayer::new(default_policy())
        .with_config(filter_config)
        .with_event_publisher(TracingEventPublisher);

    let network = NetworkConfig {
        host: args.host,
        port: args.port,
        cors_origins: args.cors_origins,
        request_timeout: Duration::from_secs(args.request_timeout_secs),
    };

    let mut module = NetworkModule::new(network, authentication, authorization);
    let port = module.start().await?;
    info!(port, "gatehouse listening");
    module.serve(shutdown_signal()).await
}
