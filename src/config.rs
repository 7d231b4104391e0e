use indexmap::IndexMap;
use serde::Deserialize;

/// Path answered with a redirect instead of being forwarded, to break the
/// auto-redirect loop the upstream runs for logged-in users.
const LOGIN_CHECK_PATH: &str = "/auth/login/?checklogin=true";

const HTTPS_PORT: u16 = 443;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub local_host: String,
    pub local_port: u16,

    pub target_host: String,
    pub target_port: u16,

    /// Capacity of the buffered readers wrapped around both sockets.
    pub buffer_size: usize,

    /// Request paths answered locally with a `302 Found` to the given path.
    pub redirects: IndexMap<String, String>,

    /// Request paths dropped without any answer.
    pub dropped_paths: Vec<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        let mut redirects = IndexMap::new();
        redirects.insert(LOGIN_CHECK_PATH.to_string(), "/".to_string());

        Self {
            local_host: "localhost".to_string(),
            local_port: 9090,

            target_host: "habrahabr.ru".to_string(),
            target_port: HTTPS_PORT,

            buffer_size: 8192,

            redirects,
            dropped_paths: Vec::new(),
        }
    }
}

impl ProxyConfig {
    pub fn from_file(path: &str) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(path, %err, "failed to read config, falling back to defaults");
                return ProxyConfig::default();
            }
        };

        match toml::from_str::<ProxyConfig>(content.as_str()) {
            Ok(proxy_config) => proxy_config,
            Err(err) => {
                tracing::warn!(path, %err, "failed to deserialize config, falling back to defaults");
                ProxyConfig::default()
            }
        }
    }

    /// Scheme and authority under which clients reach the proxy.
    pub fn local_link(&self) -> String {
        format!("http://{}:{}", self.local_host, self.local_port)
    }

    /// Scheme and authority of the upstream as it appears in its own links.
    pub fn target_link(&self) -> String {
        if self.target_port == HTTPS_PORT {
            format!("https://{}", self.target_host)
        } else {
            format!("https://{}:{}", self.target_host, self.target_port)
        }
    }
}
