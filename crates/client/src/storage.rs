//! Cross-platform persistence for the session token.
//!
//! - Web: a first-party cookie (`document.cookie`) with a fixed expiry and
//!   `SameSite=Strict`
//! - Desktop: JSON files in the platform config directory, carrying their own
//!   expiry timestamp:
//!   - Linux: `~/.config/bizdesk/`
//!   - macOS: `~/Library/Application Support/bizdesk/`
//!   - Windows: `%APPDATA%\bizdesk\`
//! - Anywhere: an in-memory medium, used by tests and as the fallback.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::lock;

/// Key under which the bearer token is persisted.
pub const TOKEN_KEY: &str = "user-token";
/// Persisted tokens expire after this many days.
pub const TOKEN_TTL_DAYS: i64 = 7;

const COOKIE_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
}

impl SameSite {
    fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
        }
    }
}

/// Write attributes for a persisted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub expires_in: Duration,
    pub same_site: SameSite,
    pub path: &'static str,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            expires_in: Duration::days(TOKEN_TTL_DAYS),
            same_site: SameSite::Strict,
            path: "/",
        }
    }
}

/// A client-side key/value slot that survives reloads.
///
/// Implementations never fail loudly: an unavailable medium reads as empty and
/// reports `false` from [`TokenMedium::store`].
pub trait TokenMedium: Send + Sync {
    fn load(&self, key: &str) -> Option<String>;
    fn store(&self, key: &str, value: &str, options: &CookieOptions) -> bool;
    fn remove(&self, key: &str);

    /// When the stored value expires, if the medium can tell. Cookies cannot.
    fn expires_at(&self, _key: &str) -> Option<DateTime<Utc>> {
        None
    }
}

/// Build the `document.cookie` assignment for a value.
pub fn format_set_cookie(key: &str, value: &str, options: &CookieOptions, now: DateTime<Utc>) -> String {
    let expires = (now + options.expires_in).format(COOKIE_DATE_FORMAT);
    format!(
        "{}={}; expires={}; path={}; SameSite={}",
        key,
        urlencoding::encode(value),
        expires,
        options.path,
        options.same_site.as_str()
    )
}

/// Build the assignment that expires a cookie immediately.
pub fn format_clear_cookie(key: &str, options: &CookieOptions) -> String {
    format!(
        "{}=; expires=Thu, 01 Jan 1970 00:00:00 GMT; path={}; SameSite={}",
        key,
        options.path,
        options.same_site.as_str()
    )
}

/// Find a value in a `document.cookie` string.
pub fn parse_cookie(header: &str, key: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name.trim() != key || value.is_empty() {
            return None;
        }
        urlencoding::decode(value).ok().map(|v| v.into_owned())
    })
}

/// In-process medium honouring expiry.
#[derive(Debug, Default)]
pub struct MemoryMedium {
    slots: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value with an explicit expiry (simulates a value written by an
    /// earlier page load).
    pub fn with_entry(self, key: &str, value: &str, expires_at: DateTime<Utc>) -> Self {
        lock(&self.slots).insert(key.to_string(), (value.to_string(), expires_at));
        self
    }
}

impl TokenMedium for MemoryMedium {
    fn load(&self, key: &str) -> Option<String> {
        let mut slots = lock(&self.slots);
        match slots.get(key) {
            Some((_, expires_at)) if *expires_at <= Utc::now() => {
                slots.remove(key);
                None
            }
            Some((value, _)) => Some(value.clone()),
            None => None,
        }
    }

    fn store(&self, key: &str, value: &str, options: &CookieOptions) -> bool {
        let expires_at = Utc::now() + options.expires_in;
        lock(&self.slots).insert(key.to_string(), (value.to_string(), expires_at));
        true
    }

    fn remove(&self, key: &str) {
        lock(&self.slots).remove(key);
    }

    fn expires_at(&self, key: &str) -> Option<DateTime<Utc>> {
        lock(&self.slots).get(key).map(|(_, expires_at)| *expires_at)
    }
}

/// Pick the medium for the current platform.
pub fn default_medium() -> Box<dyn TokenMedium> {
    #[cfg(target_arch = "wasm32")]
    {
        Box::new(CookieMedium)
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        match FileMedium::platform() {
            Some(medium) => Box::new(medium),
            None => {
                crate::log_warn!("No config directory available, session will not persist");
                Box::new(MemoryMedium::new())
            }
        }
    }
}

// =========================================
// Web (WASM) implementation
// =========================================

/// Cookie-backed medium for the browser.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default, Clone, Copy)]
pub struct CookieMedium;

#[cfg(target_arch = "wasm32")]
fn html_document() -> Option<web_sys::HtmlDocument> {
    use wasm_bindgen::JsCast;

    web_sys::window()?
        .document()?
        .dyn_into::<web_sys::HtmlDocument>()
        .ok()
}

#[cfg(target_arch = "wasm32")]
impl TokenMedium for CookieMedium {
    fn load(&self, key: &str) -> Option<String> {
        let cookies = html_document()?.cookie().ok()?;
        parse_cookie(&cookies, key)
    }

    fn store(&self, key: &str, value: &str, options: &CookieOptions) -> bool {
        let Some(doc) = html_document() else {
            return false;
        };
        doc.set_cookie(&format_set_cookie(key, value, options, Utc::now()))
            .is_ok()
    }

    fn remove(&self, key: &str) {
        if let Some(doc) = html_document() {
            let _ = doc.set_cookie(&format_clear_cookie(key, &CookieOptions::default()));
        }
    }
}

// =========================================
// Desktop (native) implementation
// =========================================

#[cfg(not(target_arch = "wasm32"))]
#[derive(serde::Serialize, serde::Deserialize)]
struct StoredValue {
    value: String,
    expires_at: DateTime<Utc>,
}

/// File-backed medium for native builds.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FileMedium {
    dir: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileMedium {
    pub fn new(dir: impl Into<std::path::PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<config dir>/bizdesk`, if the platform has a config directory.
    pub fn platform() -> Option<Self> {
        Some(Self::new(dirs::config_dir()?.join("bizdesk")))
    }

    fn read_stored(&self, key: &str) -> Option<(std::path::PathBuf, StoredValue)> {
        let path = self.file_path(key)?;
        let raw = std::fs::read_to_string(&path).ok()?;
        let stored = serde_json::from_str(&raw).ok()?;
        Some((path, stored))
    }

    fn file_path(&self, key: &str) -> Option<std::path::PathBuf> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir).ok()?;
        }
        let safe_key = key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_");
        Some(self.dir.join(format!("{}.json", safe_key)))
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl TokenMedium for FileMedium {
    fn load(&self, key: &str) -> Option<String> {
        let (path, stored) = self.read_stored(key)?;
        if stored.expires_at <= Utc::now() {
            let _ = std::fs::remove_file(path);
            return None;
        }
        Some(stored.value)
    }

    fn store(&self, key: &str, value: &str, options: &CookieOptions) -> bool {
        let Some(path) = self.file_path(key) else {
            return false;
        };
        let stored = StoredValue {
            value: value.to_string(),
            expires_at: Utc::now() + options.expires_in,
        };
        match serde_json::to_string(&stored) {
            Ok(json) => std::fs::write(path, json).is_ok(),
            Err(_) => false,
        }
    }

    fn remove(&self, key: &str) {
        if let Some(path) = self.file_path(key) {
            let _ = std::fs::remove_file(path);
        }
    }

    fn expires_at(&self, key: &str) -> Option<DateTime<Utc>> {
        self.read_stored(key).map(|(_, stored)| stored.expires_at)
    }
}
