use crate::config::ProxyConfig;
use crate::http::headers::HttpHeaders;
use crate::http::status::HttpStatus;

/// What to do with a request path that must not reach the upstream.
#[derive(Debug, PartialEq)]
pub enum RedirectRule<'a> {
    /// Answer with `302 Found` to this location.
    Redirect(&'a str),
    /// Answer nothing.
    Drop,
}

pub fn route<'a>(config: &'a ProxyConfig, path: &str) -> Option<RedirectRule<'a>> {
    if let Some(location) = config.redirects.get(path) {
        return Some(RedirectRule::Redirect(location));
    }
    if config.dropped_paths.iter().any(|dropped| dropped == path) {
        return Some(RedirectRule::Drop);
    }
    None
}

pub fn found(location: &str) -> HttpHeaders {
    let mut headers = HttpHeaders::new(&HttpStatus::Found.status_line());
    headers.set("Location", location);
    headers.set("Date", &httpdate::fmt_http_date(std::time::SystemTime::now()));
    headers.set("Content-Length", "0");
    headers
}
