//! Gateway - TCP/TLS listener that accepts remote terminal clients.
//!
//! The Gateway binds to sockets and spawns a Connection task for each
//! incoming client. Plaintext and TLS listeners share one connection limit.

use std::io::{BufReader, Cursor};
use std::net::SocketAddr;
use std::sync::Arc;

use rustls_pemfile::{certs, pkcs8_private_keys};
use termrd_proto::FramingConfig;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::ServerConfig;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::config::{ListenConfig, TlsConfig};
use crate::dispatcher::Dispatcher;
use crate::network::connection::{self, Connection};
use crate::network::SenderIdGenerator;

/// The Gateway accepts incoming TCP/TLS connections and spawns handlers.
pub struct Gateway {
    plaintext_listener: TcpListener,
    tls_listener: Option<(TcpListener, TlsAcceptor)>,
    shared: Arc<Shared>,
}

/// State every accept loop needs.
struct Shared {
    dispatcher: Arc<Dispatcher>,
    framing: FramingConfig,
    slots: Arc<Semaphore>,
    ids: SenderIdGenerator,
}

impl Gateway {
    /// Bind the plaintext listener and, if configured, the TLS listener.
    pub async fn bind(
        listen: &ListenConfig,
        tls_config: Option<&TlsConfig>,
        framing: FramingConfig,
        dispatcher: Arc<Dispatcher>,
    ) -> anyhow::Result<Self> {
        let plaintext_listener = TcpListener::bind(listen.address).await?;
        info!(address = %plaintext_listener.local_addr()?, "Plaintext listener bound");

        let tls_listener = if let Some(tls_cfg) = tls_config {
            let tls_acceptor = Self::load_tls(tls_cfg)?;
            let listener = TcpListener::bind(tls_cfg.address).await?;
            info!(address = %listener.local_addr()?, "TLS listener bound");
            Some((listener, tls_acceptor))
        } else {
            None
        };

        Ok(Self {
            plaintext_listener,
            tls_listener,
            shared: Arc::new(Shared {
                dispatcher,
                framing,
                slots: Arc::new(Semaphore::new(listen.max_remote_clients)),
                ids: SenderIdGenerator::default(),
            }),
        })
    }

    /// Address of the plaintext listener.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.plaintext_listener.local_addr()
    }

    /// Address of the TLS listener, if any.
    pub fn tls_local_addr(&self) -> Option<std::io::Result<SocketAddr>> {
        self.tls_listener.as_ref().map(|(l, _)| l.local_addr())
    }

    /// Load TLS certificates and create TlsAcceptor.
    fn load_tls(config: &TlsConfig) -> anyhow::Result<TlsAcceptor> {
        let cert_file = std::fs::read(&config.cert_path)?;
        let cert_reader = &mut BufReader::new(Cursor::new(cert_file));
        let certs: Vec<CertificateDer> = certs(cert_reader).collect::<Result<Vec<_>, _>>()?;

        if certs.is_empty() {
            anyhow::bail!("No certificates found in {}", config.cert_path);
        }

        let key_file = std::fs::read(&config.key_path)?;
        let key_reader = &mut BufReader::new(Cursor::new(key_file));
        let mut keys: Vec<PrivateKeyDer> = pkcs8_private_keys(key_reader)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(PrivateKeyDer::from)
            .collect();

        if keys.is_empty() {
            anyhow::bail!("No private keys found in {}", config.key_path);
        }

        let key = keys.remove(0);

        let tls_config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)?;

        Ok(TlsAcceptor::from(Arc::new(tls_config)))
    }

    /// Accept connections until `shutdown` fires.
    #[instrument(skip_all, name = "gateway")]
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        if let Some((tls_listener, tls_acceptor)) = self.tls_listener {
            let shared = Arc::clone(&self.shared);
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                loop {
                    let accepted = tokio::select! {
                        _ = shutdown.cancelled() => break,
                        accepted = tls_listener.accept() => accepted,
                    };
                    match accepted {
                        Ok((stream, addr)) => {
                            let shared = Arc::clone(&shared);
                            let acceptor = tls_acceptor.clone();
                            let shutdown = shutdown.clone();
                            tokio::spawn(async move {
                                match acceptor.accept(stream).await {
                                    Ok(tls_stream) => shared.serve(tls_stream, addr, shutdown).await,
                                    Err(e) => warn!(%addr, error = %e, "TLS handshake failed"),
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept TLS connection");
                        }
                    }
                }
                info!("TLS listener stopped");
            });
        }

        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = self.plaintext_listener.accept() => accepted,
            };
            match accepted {
                Ok((stream, addr)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!(%addr, error = %e, "Failed to set TCP_NODELAY");
                    }
                    let shared = Arc::clone(&self.shared);
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move { shared.serve::<TcpStream>(stream, addr, shutdown).await });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept plaintext connection");
                }
            }
        }
        info!("Plaintext listener stopped");
        Ok(())
    }
}

impl Shared {
    /// Run one connection if a client slot is free, refuse it otherwise.
    async fn serve<S>(&self, stream: S, addr: SocketAddr, shutdown: CancellationToken)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let sender_id = self.ids.next();
        let Ok(_slot) = Arc::clone(&self.slots).try_acquire_owned() else {
            warn!(%sender_id, %addr, "Remote client limit reached, refusing connection");
            if let Err(e) = connection::refuse(stream, &sender_id, addr, self.framing).await {
                warn!(%sender_id, %addr, error = %e, "Failed to refuse connection cleanly");
            }
            return;
        };

        let connection = Connection::new(
            sender_id.clone(),
            addr,
            stream,
            Arc::clone(&self.dispatcher),
            self.framing,
            shutdown,
        );
        if let Err(e) = connection.run().await {
            error!(%sender_id, %addr, error = %e, "Connection error");
        }
    }
}
