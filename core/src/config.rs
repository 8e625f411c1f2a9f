use serde::Deserialize;

/// Settings of a `Networking` client.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkingConfig {
    /// Prefix of every request URL, e.g. `https://api.example.com`.
    pub base_url: String,
    /// Headers sent with every request.
    pub headers: Vec<(String, String)>,
    pub user_agent: Option<String>,
    /// Timeout applied by the reqwest transport. The dispatcher itself never
    /// times a request out.
    pub timeout_secs: Option<u64>,
}

impl NetworkingConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

impl Default for NetworkingConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            headers: Vec::new(),
            user_agent: Some(format!("networking-core/{}", env!("CARGO_PKG_VERSION"))),
            timeout_secs: None,
        }
    }
}
