//! Test server management.
//!
//! Runs a termrd daemon inside the test process on ephemeral ports.

use std::net::SocketAddr;

use termrd::config::Config;
use termrd::license::License;
use termrd::Daemon;
use termrd_proto::DEMO_APPLICATION_ID;
use tokio_util::sync::CancellationToken;

/// A test server instance.
pub struct TestServer {
    daemon: Option<Daemon>,
    shutdown: CancellationToken,
}

impl TestServer {
    /// Base configuration: demo license, ephemeral TCP and HTTP ports.
    pub fn config() -> Config {
        let mut config: Config = toml::from_str(
            r#"
[server]
name = "termrd-test"

[listen]
address = "127.0.0.1:0"
max_remote_clients = 4

[http]
address = "127.0.0.1:0"

[router]
timeout_ms = 5000
workers = 2
queue_capacity = 64

[license]
revalidate_secs = 0
"#,
        )
        .expect("test config parses");
        let license = License::new(DEMO_APPLICATION_ID, "integration").with_claim("admin");
        config.license.key = Some(license.encode().expect("license encodes"));
        config
    }

    /// Spawn a server with the default test configuration.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with(Self::config()).await
    }

    /// Spawn a server with a custom configuration.
    pub async fn spawn_with(config: Config) -> anyhow::Result<Self> {
        let shutdown = CancellationToken::new();
        let daemon = Daemon::start(&config, shutdown.clone()).await?;
        Ok(Self {
            daemon: Some(daemon),
            shutdown,
        })
    }

    fn daemon(&self) -> &Daemon {
        self.daemon.as_ref().expect("daemon running")
    }

    /// Address of the framed TCP listener.
    pub fn address(&self) -> SocketAddr {
        self.daemon().remote_addr()
    }

    /// Address of the HTTP boundary.
    pub fn http_address(&self) -> SocketAddr {
        self.daemon().http_addr().expect("http configured")
    }

    /// Create a new test client connected to this server.
    pub async fn connect(&self) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(self.address()).await
    }

    /// Create an HTTP client for this server.
    pub fn http(&self) -> super::client::HttpClient {
        super::client::HttpClient::new(self.http_address())
    }

    /// Stop the server and wait for its tasks.
    pub async fn stop(mut self) {
        if let Some(daemon) = self.daemon.take() {
            daemon.shutdown().await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
