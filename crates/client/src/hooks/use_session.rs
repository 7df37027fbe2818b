use dioxus::prelude::*;
use futures_util::StreamExt;

use crate::auth_session::{SessionStore, SessionToken};

/// The current session token, updated on sign-in and sign-out.
pub fn use_session_token() -> Signal<Option<SessionToken>> {
    let session = use_hook(SessionStore::global);
    let initial = session.clone();
    let mut token = use_signal(move || initial.read());

    use_future(move || {
        let session = session.clone();
        async move {
            let mut changes = session.subscribe();
            token.set(session.read());
            while let Some(next) = changes.next().await {
                token.set(next);
            }
        }
    });

    token
}
