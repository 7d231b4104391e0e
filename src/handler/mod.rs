//! Request handling: forward one client request upstream and relay the
//! answer, rewriting gzip-compressed HTML on the way.

mod redirects;

use async_std::io::prelude::*;
use async_std::io::{BufRead, Write};

use crate::config::ProxyConfig;
use crate::error::Result;
use crate::html::modifier::Modifier;
use crate::http::request::HttpRequest;
use crate::http::response::HttpResponse;
use crate::net::upstream::Upstream;
use redirects::RedirectRule;

/// Serves a single request read from `reader`, answering on `writer`.
///
/// Any error leaves the client without a response; the caller closes the
/// connection.
pub async fn handle_request<R, W, U>(
    reader: &mut R,
    writer: &mut W,
    upstream: &U,
    config: &ProxyConfig,
) -> Result<()>
where
    R: BufRead + Unpin,
    W: Write + Unpin,
    U: Upstream,
{
    let Some(request) = HttpRequest::read_from(reader).await? else {
        return Ok(());
    };

    let path = request.path().unwrap_or_default();
    if let Some(rule) = redirects::route(config, path) {
        return handle_disabled_path(writer, path, rule).await;
    }

    let request = request.for_upstream(&config.target_host);
    tracing::debug!("{}", request.headers.general());
    let mut response = upstream.exchange(&request).await?;
    tracing::debug!("{}", response.headers.general());

    response.handle_redirect(&config.target_link(), &config.local_link());
    if response.is_gzipped_html() {
        transcode(&mut response, config)?;
    }

    response.write_to(writer).await?;
    Ok(())
}

/// Rewrites the document of a gzip-compressed HTML response in place.
pub fn transcode(response: &mut HttpResponse, config: &ProxyConfig) -> Result<()> {
    let Some(text) = response.text() else {
        return Ok(());
    };

    let target_link = config.target_link();
    let local_link = config.local_link();
    let modified = Modifier::new(&target_link, &local_link).modify_data(text);
    response.set_text(modified)
}

async fn handle_disabled_path<W>(writer: &mut W, path: &str, rule: RedirectRule<'_>) -> Result<()>
where
    W: Write + Unpin,
{
    tracing::info!(path, "cancelled");
    if let RedirectRule::Redirect(location) = rule {
        tracing::info!(location, "redirect");
        writer.write_all(&redirects::found(location).to_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}
