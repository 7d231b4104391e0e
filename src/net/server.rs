//! Listener loop of the proxy.
//!
//! This module is responsible only for networking concerns:
//! - accepting TCP connections,
//! - wrapping the client socket for buffered reads and raw writes,
//! - closing the client socket once its request has been handled.
//!
//! Everything HTTP is delegated to [`handler::handle_request`](crate::handler::handle_request),
//! and the upstream side to [`TlsUpstream`].
//!
//! Connections are served strictly one after another: a connection is
//! handled to the end before the next one is accepted. There is no timeout,
//! so a stalled upstream stalls the whole proxy.

use std::net::Shutdown;

use async_std::io::BufReader;
use async_std::net::{TcpListener, TcpStream};

use crate::config::ProxyConfig;
use crate::handler;
use crate::net::upstream::TlsUpstream;

pub struct Server {
    config: ProxyConfig,
    upstream: TlsUpstream,
}

impl Server {
    pub fn new(config: ProxyConfig) -> Self {
        let upstream = TlsUpstream::new(&config);
        Self { config, upstream }
    }

    /// Binds the configured local address and serves connections until the
    /// listener fails.
    pub async fn run(&self) -> std::io::Result<()> {
        let listener =
            TcpListener::bind((self.config.local_host.as_str(), self.config.local_port)).await?;

        tracing::info!(
            local = %self.config.local_link(),
            target = %self.config.target_link(),
            "starting proxy server, quit with CONTROL-C"
        );

        while let Ok((stream, _addr)) = listener.accept().await {
            self.handle_client(stream).await;
        }

        Ok(())
    }

    /// Handles a single client connection and closes it.
    async fn handle_client(&self, stream: TcpStream) {
        let mut reader = BufReader::with_capacity(self.config.buffer_size, &stream);
        let mut writer = &stream;

        if let Err(err) =
            handler::handle_request(&mut reader, &mut writer, &self.upstream, &self.config).await
        {
            tracing::warn!(%err, "closing client connection without a response");
        }

        if let Err(err) = stream.shutdown(Shutdown::Both) {
            tracing::debug!(%err, "client shutdown failed");
        }
    }
}
