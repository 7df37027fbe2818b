//! Endpoint configuration.
//!
//! Both endpoints are read once at startup. Native builds look at the process
//! environment (a `.env` file is honoured outside tests); WASM builds fall back
//! to values baked in at compile time. Unset values default to localhost.

pub const DEFAULT_SERVER_URL: &str = "http://localhost:4000/";
pub const DEFAULT_WS_SERVER_URL: &str = "ws://localhost:4000/";

const GRAPHQL_PATH: &str = "graphql";
const UPLOAD_PATH: &str = "file-upload";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL for request/response calls and uploads.
    pub server_url: String,
    /// Base URL for the streaming (upgraded-scheme) endpoint.
    pub ws_server_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            ws_server_url: DEFAULT_WS_SERVER_URL.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>, ws_server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ws_server_url: ws_server_url.into(),
        }
    }

    pub fn from_env() -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        {
            if !cfg!(test) {
                dotenvy::dotenv().ok();
            }
        }

        let server_url = read_var("SERVER_URL", option_env!("SERVER_URL"))
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let ws_server_url = read_var("WS_SERVER_URL", option_env!("WS_SERVER_URL"))
            .unwrap_or_else(|| DEFAULT_WS_SERVER_URL.to_string());

        Self {
            server_url,
            ws_server_url,
        }
    }

    pub fn graphql_url(&self) -> String {
        join_url(&self.server_url, GRAPHQL_PATH)
    }

    pub fn upload_url(&self) -> String {
        join_url(&self.server_url, UPLOAD_PATH)
    }

    pub fn subscription_url(&self) -> String {
        join_url(&self.ws_server_url, GRAPHQL_PATH)
    }
}

fn read_var(name: &str, baked: Option<&'static str>) -> Option<String> {
    std::env::var(name)
        .ok()
        .or_else(|| baked.map(str::to_string))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Join a base URL and a path. Absolute paths pass through untouched; an empty
/// base yields a root-relative path.
pub fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://")
        || path.starts_with("https://")
        || path.starts_with("ws://")
        || path.starts_with("wss://")
    {
        return path.to_string();
    }
    if base.is_empty() {
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        }
    } else {
        let base = base.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}
