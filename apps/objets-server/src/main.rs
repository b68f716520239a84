//! Objets server - storage lifecycle for a small S3-compatible object server.
//!
//! Loads the YAML configuration, initializes logging, opens the filesystem
//! object store and its ACL database, then holds them until a shutdown
//! signal arrives and closes the ACL database exactly once.
//!
//! # Usage
//!
//! ```text
//! objets-server /etc/objets/config.yaml
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OBJETS_DATA_DIR` | *(config)* | Overrides `data_dir` |
//! | `OBJETS_LISTEN` | *(config)* | Overrides `listen` |
//! | `OBJETS_TLS_AUTO` | *(config)* | Overrides `tls_auto` |
//! | `OBJETS_ACCESS_KEY_ID` | *(config)* | Overrides `access_key_id` |
//! | `OBJETS_SECRET_ACCESS_KEY` | *(config)* | Overrides `secret_access_key` |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use objets_auth::StaticCredentialProvider;
use objets_core::ObjetsConfig;
use objets_store::{FsObjectStore, ObjectBackend};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `log_level` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Load the config file and apply environment overrides.
fn load_config(path: &Path) -> Result<ObjetsConfig> {
    let config = ObjetsConfig::from_yaml_file(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?
        .with_env_overrides();
    config
        .validate()
        .context("invalid configuration after environment overrides")?;
    Ok(config)
}

/// Storage and credentials handed to the protocol front end.
struct Services {
    store: Arc<dyn ObjectBackend>,
    credentials: Arc<StaticCredentialProvider>,
}

async fn open_services(config: &ObjetsConfig) -> Result<Services> {
    let store = FsObjectStore::open(config)
        .await
        .with_context(|| format!("failed to open object store under {}", config.data_dir))?;

    Ok(Services {
        store: Arc::new(store),
        credentials: Arc::new(StaticCredentialProvider::from_config(config)),
    })
}

/// Open storage, wait for `shutdown`, then close storage.
async fn run(config: ObjetsConfig, shutdown: impl Future<Output = ()>) -> Result<()> {
    let services = open_services(&config).await?;

    info!(
        listen = config.listen(),
        tls_auto = config.tls_auto,
        tls_domains = ?config.tls_domains,
        credentials = services.credentials.len(),
        "storage ready",
    );

    shutdown.await;
    info!("shutting down");

    services
        .store
        .close()
        .await
        .context("failed to close object store")?;
    info!("object store closed, exiting");

    Ok(())
}

/// Signals that stop the server: SIGINT, SIGTERM, SIGHUP and SIGQUIT on
/// unix, Ctrl-C elsewhere.
struct ShutdownSignals {
    #[cfg(unix)]
    streams: Vec<(tokio::signal::unix::Signal, &'static str)>,
}

impl ShutdownSignals {
    /// Register the signal handlers. Must be called inside the runtime.
    fn install() -> Self {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let kinds = [
                (SignalKind::interrupt(), "SIGINT"),
                (SignalKind::terminate(), "SIGTERM"),
                (SignalKind::hangup(), "SIGHUP"),
                (SignalKind::quit(), "SIGQUIT"),
            ];
            let streams = kinds
                .into_iter()
                .filter_map(|(kind, name)| match signal(kind) {
                    Ok(stream) => Some((stream, name)),
                    Err(e) => {
                        warn!(signal = name, error = %e, "cannot listen for signal");
                        None
                    }
                })
                .collect();
            Self { streams }
        }

        #[cfg(not(unix))]
        Self {}
    }

    /// Wait for the first signal and return its name.
    #[cfg(unix)]
    async fn recv(mut self) -> &'static str {
        std::future::poll_fn(|cx| {
            for (stream, name) in &mut self.streams {
                if stream.poll_recv(cx).is_ready() {
                    return std::task::Poll::Ready(*name);
                }
            }
            std::task::Poll::Pending
        })
        .await
    }

    /// Wait for the first signal and return its name.
    #[cfg(not(unix))]
    async fn recv(self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        "Ctrl-C"
    }
}

/// Resolve on the first shutdown signal.
async fn shutdown_signal() {
    let signal = ShutdownSignals::install().recv().await;
    info!(signal, "received shutdown signal");
}

#[tokio::main]
async fn main() -> Result<()> {
    let Some(config_path) = std::env::args_os().nth(1) else {
        eprintln!("usage: objets-server <config.yaml>");
        std::process::exit(2);
    };

    let config = load_config(Path::new(&config_path))?;

    init_tracing(&config.log_level)?;

    info!(
        version = VERSION,
        config = %Path::new(&config_path).display(),
        data_dir = %config.data_dir,
        "starting Objets server",
    );

    run(config, shutdown_signal()).await
}
