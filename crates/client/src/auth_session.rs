//! Authentication session management with cookie persistence.
//!
//! [`SessionStore`] is the single authority for the bearer token. The process
//! owns one global instance ([`SessionStore::init`] / [`SessionStore::global`]);
//! every write goes through the persistence medium first and then updates the
//! in-memory mirror that [`SessionStore::read`] serves.

use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use once_cell::sync::OnceCell;

use crate::lock;
use crate::storage::{default_medium, CookieOptions, TokenMedium, TOKEN_KEY};

static GLOBAL: OnceCell<SessionStore> = OnceCell::new();

/// Opaque bearer credential.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// Empty strings are not tokens.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value.
    pub fn bearer(&self) -> String {
        bizdesk_shared::bearer(&self.0)
    }
}

// Keep tokens out of logs and panic messages.
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

/// The mirrored token and the moment the medium stops honouring it.
#[derive(Clone)]
struct Mirrored {
    token: SessionToken,
    expires_at: DateTime<Utc>,
}

struct Inner {
    medium: Box<dyn TokenMedium>,
    options: CookieOptions,
    mirror: RwLock<Option<Mirrored>>,
    subscribers: Mutex<Vec<UnboundedSender<Option<SessionToken>>>>,
}

/// Handle to a session store. Clones share state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

impl SessionStore {
    /// Build a standalone store over `medium`, loading any persisted token.
    pub fn with_medium(medium: Box<dyn TokenMedium>) -> Self {
        let options = CookieOptions::default();
        // Media that cannot report an expiry get the full horizon from now.
        let initial = medium.load(TOKEN_KEY).and_then(SessionToken::new).map(|token| Mirrored {
            token,
            expires_at: medium
                .expires_at(TOKEN_KEY)
                .unwrap_or_else(|| Utc::now() + options.expires_in),
        });
        crate::log_debug!(
            "Session store initialized ({})",
            if initial.is_some() { "token restored" } else { "no token" }
        );
        Self {
            inner: Arc::new(Inner {
                medium,
                options,
                mirror: RwLock::new(initial),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Install the process-wide store. Returns the already-installed store if
    /// `init` (or `global`) ran before.
    pub fn init(medium: Box<dyn TokenMedium>) -> SessionStore {
        GLOBAL.get_or_init(|| Self::with_medium(medium)).clone()
    }

    /// The process-wide store, initialized from the platform medium on first use.
    pub fn global() -> SessionStore {
        GLOBAL
            .get_or_init(|| Self::with_medium(default_medium()))
            .clone()
    }

    /// Current token, if any. Never blocks on I/O and never fails.
    ///
    /// A token past its expiry is dropped here, so a long-lived process stops
    /// sending it at the same moment the medium would have forgotten it.
    pub fn read(&self) -> Option<SessionToken> {
        let mirrored = self
            .inner
            .mirror
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()?;
        if mirrored.expires_at <= Utc::now() {
            crate::log_info!("Session token expired");
            self.clear();
            return None;
        }
        Some(mirrored.token)
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    /// Persist `token` with the fixed expiry, then update the mirror and
    /// notify subscribers. An empty token clears the session.
    pub fn set(&self, token: impl Into<String>) {
        let Some(token) = SessionToken::new(token) else {
            self.clear();
            return;
        };
        if !self
            .inner
            .medium
            .store(TOKEN_KEY, token.as_str(), &self.inner.options)
        {
            crate::log_warn!("Session token could not be persisted; keeping it in memory only");
        }
        *self
            .inner
            .mirror
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(Mirrored {
            token: token.clone(),
            expires_at: Utc::now() + self.inner.options.expires_in,
        });
        crate::log_info!("Session token updated");
        self.notify(Some(token));
    }

    /// Remove the persisted token and the mirror.
    pub fn clear(&self) {
        self.inner.medium.remove(TOKEN_KEY);
        *self
            .inner
            .mirror
            .write()
            .unwrap_or_else(|e| e.into_inner()) = None;
        crate::log_info!("Session cleared");
        self.notify(None);
    }

    /// Stream of token changes, starting after the current value.
    pub fn subscribe(&self) -> UnboundedReceiver<Option<SessionToken>> {
        let (tx, rx) = unbounded();
        lock(&self.inner.subscribers).push(tx);
        rx
    }

    fn notify(&self, token: Option<SessionToken>) {
        lock(&self.inner.subscribers).retain(|tx| tx.unbounded_send(token.clone()).is_ok());
    }
}
