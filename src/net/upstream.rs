//! Connection to the upstream host.
//!
//! Every forwarded request gets its own TLS connection, which is closed
//! again before the response is handed back, whether the exchange
//! succeeded or not.

use std::future::poll_fn;
use std::pin::Pin;
use std::sync::Arc;

use async_std::io::{BufReader, Read, Write};
use async_std::net::TcpStream;
use futures_rustls::TlsConnector;
use futures_rustls::rustls::pki_types::ServerName;
use futures_rustls::rustls::{ClientConfig, RootCertStore};

use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::http::request::HttpRequest;
use crate::http::response::HttpResponse;

/// Something that answers a request with a response.
#[allow(async_fn_in_trait)]
pub trait Upstream {
    async fn exchange(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

pub struct TlsUpstream {
    host: String,
    port: u16,
    buffer_size: usize,
    connector: TlsConnector,
}

impl TlsUpstream {
    pub fn new(config: &ProxyConfig) -> Self {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let tls_config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();

        Self {
            host: config.target_host.clone(),
            port: config.target_port,
            buffer_size: config.buffer_size,
            connector: TlsConnector::from(Arc::new(tls_config)),
        }
    }
}

impl Upstream for TlsUpstream {
    async fn exchange(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let domain = ServerName::try_from(self.host.clone())
            .map_err(|err| ProxyError::Tls(format!("{}: {}", self.host, err)))?;

        let tcp = TcpStream::connect((self.host.as_str(), self.port)).await?;
        let tls = self.connector.connect(domain, tcp).await?;

        exchange_on(tls, request, self.buffer_size).await
    }
}

/// Runs one request/response exchange on `stream` and closes it, whatever
/// the outcome of the exchange.
async fn exchange_on<S>(mut stream: S, request: &HttpRequest, buffer_size: usize) -> Result<HttpResponse>
where
    S: Read + Write + Unpin,
{
    let result = round_trip(&mut stream, request, buffer_size).await;
    // WriteExt in async-std has no close()
    if let Err(err) = poll_fn(|cx| Pin::new(&mut stream).poll_close(cx)).await {
        tracing::debug!(%err, "upstream close failed");
    }
    result
}

/// Writes `request` to `stream` and reads the response from it.
async fn round_trip<S>(stream: &mut S, request: &HttpRequest, buffer_size: usize) -> Result<HttpResponse>
where
    S: Read + Write + Unpin,
{
    request.write_to(stream).await?;
    let mut reader = BufReader::with_capacity(buffer_size, stream);
    HttpResponse::read_from(&mut reader).await
}
