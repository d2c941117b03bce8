use std::time::Duration;

/// Path of the poll service relative to the page origin.
pub const API_PATH: &str = "/api";

/// Browser-side settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Absolute base URL of the poll service, e.g. `https://polls.example/api`.
    pub api_base: String,
    pub search_debounce: Duration,
    pub redirect_delay: Duration,
    pub toast_lifetime: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: format!("http://127.0.0.1:3000{API_PATH}"),
            search_debounce: Duration::from_millis(300),
            redirect_delay: Duration::from_millis(2000),
            toast_lifetime: Duration::from_millis(3000),
        }
    }
}

impl ClientConfig {
    /// Points the API at the origin that served the page.
    pub fn from_location() -> Self {
        let mut config = Self::default();
        if let Some(origin) = page_origin() {
            config.api_base = format!("{}{API_PATH}", origin.trim_end_matches('/'));
        }
        config
    }
}

#[cfg(target_arch = "wasm32")]
fn page_origin() -> Option<String> {
    web_sys::window()?.location().origin().ok()
}

#[cfg(not(target_arch = "wasm32"))]
fn page_origin() -> Option<String> {
    None
}

/// Server-side settings, read from the environment after `.env` is loaded.
#[cfg(feature = "ssr")]
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub request_timeout: Duration,
}

#[cfg(feature = "ssr")]
impl ServerConfig {
    pub const REQUEST_TIMEOUT_VAR: &'static str = "POLL_CLIENT_REQUEST_TIMEOUT_SECS";

    pub fn from_env() -> anyhow::Result<Self> {
        use anyhow::Context;

        let request_timeout = match std::env::var(Self::REQUEST_TIMEOUT_VAR) {
            Ok(secs) if !secs.trim().is_empty() => secs
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of seconds", Self::REQUEST_TIMEOUT_VAR))?,
            _ => 10,
        };

        Ok(Self {
            request_timeout: Duration::from_secs(request_timeout),
        })
    }
}
