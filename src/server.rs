//! Daemon assembly.
//!
//! [`Pipeline::build`] wires the routing pipeline from a [`Config`];
//! [`Daemon::start`] binds the configured transports around it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{Config, LicenseSource};
use crate::correlator::Correlator;
use crate::dispatcher::Dispatcher;
use crate::handlers::{Registry, builtin};
use crate::http::{self, HttpState};
use crate::license::{FileLicenseExtractor, LicenseExtractor, LicenseGate, StaticLicenseExtractor};
use crate::network::Gateway;
use crate::parser::CommandParser;
use crate::queue::RequestQueue;
use crate::router::Router;

/// The routing pipeline shared by every transport.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub gate: Arc<LicenseGate>,
    pub router: Arc<Router>,
    pub dispatcher: Arc<Dispatcher>,
}

impl Pipeline {
    /// Build the registry, parser, gate and router, and start the workers.
    pub fn build(config: &Config, shutdown: &CancellationToken) -> anyhow::Result<Self> {
        let registry = Arc::new(builtin::register(Registry::builder(), &config.server.name).build()?);
        let parser = CommandParser::new(Arc::clone(registry.store()), config.parser.to_options())?;

        let extractor: Arc<dyn LicenseExtractor> = match config.license.source() {
            Some(LicenseSource::File(path)) => Arc::new(FileLicenseExtractor::new(path)),
            Some(LicenseSource::Key(key)) => Arc::new(StaticLicenseExtractor::new(key)),
            None => anyhow::bail!("exactly one of license.path or license.key must be set"),
        };
        let gate = Arc::new(LicenseGate::new(extractor, config.server.application_id.clone()));

        let router = Arc::new(
            Router::new(Arc::clone(&gate), Arc::new(parser), registry)
                .with_timeout(config.router.timeout()),
        );
        let dispatcher = Dispatcher::spawn(
            RequestQueue::new(config.router.queue_capacity),
            Arc::clone(&router),
            Arc::new(Correlator::new()),
            config.router.workers,
            shutdown.clone(),
        );

        Ok(Self {
            gate,
            router,
            dispatcher,
        })
    }
}

/// A running daemon.
pub struct Daemon {
    pipeline: Pipeline,
    remote_addr: SocketAddr,
    tls_addr: Option<SocketAddr>,
    http_addr: Option<SocketAddr>,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Daemon {
    /// Bind every configured transport and start serving.
    pub async fn start(config: &Config, shutdown: CancellationToken) -> anyhow::Result<Self> {
        let pipeline = Pipeline::build(config, &shutdown)?;
        let mut tasks = Vec::new();

        // Load eagerly so a bad license is reported at startup
        if pipeline.gate.current_license().await.is_none() {
            warn!("No valid license; requests will fail with invalid_license until it is fixed");
        }
        if config.license.revalidate_secs > 0 {
            let period = Duration::from_secs(config.license.revalidate_secs);
            tasks.push(pipeline.gate.spawn_revalidation(period, shutdown.clone()));
        }

        let gateway = Gateway::bind(
            &config.listen,
            config.tls.as_ref(),
            config.framing.to_framing(),
            Arc::clone(&pipeline.dispatcher),
        )
        .await?;
        let remote_addr = gateway.local_addr()?;
        let tls_addr = gateway.tls_local_addr().transpose()?;
        let gateway_shutdown = shutdown.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = gateway.run(gateway_shutdown).await {
                error!(error = %e, "Gateway failed");
            }
        }));

        let http_addr = match &config.http {
            Some(http_config) => {
                let listener = TcpListener::bind(http_config.address).await?;
                let addr = listener.local_addr()?;
                let state = HttpState {
                    server_name: config.server.name.clone(),
                    dispatcher: Arc::clone(&pipeline.dispatcher),
                    gate: Arc::clone(&pipeline.gate),
                    max_message_length: config.framing.max_message_length,
                    shutdown: shutdown.clone(),
                };
                tasks.push(tokio::spawn(http::run_http_server(listener, state)));
                Some(addr)
            }
            None => None,
        };

        if config.console.enabled {
            let dispatcher = Arc::clone(&pipeline.dispatcher);
            let max_message_length = config.framing.max_message_length;
            let console_shutdown = shutdown.clone();
            tasks.push(tokio::spawn(async move {
                if let Err(e) =
                    crate::console::run_stdio(dispatcher, max_message_length, console_shutdown).await
                {
                    error!(error = %e, "Console failed");
                }
            }));
        }

        info!(
            server = %config.server.name,
            remote = %remote_addr,
            http = ?http_addr,
            workers = config.router.workers,
            "termrd started"
        );

        Ok(Self {
            pipeline,
            remote_addr,
            tls_addr,
            http_addr,
            shutdown,
            tasks,
        })
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Address of the plaintext remote terminal listener.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn tls_addr(&self) -> Option<SocketAddr> {
        self.tls_addr
    }

    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.http_addr
    }

    /// Cancel the terminal token and wait for every task to stop.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        self.pipeline.dispatcher.shutdown().await;
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Task ended abnormally");
            }
        }
        info!("termrd stopped");
    }
}
