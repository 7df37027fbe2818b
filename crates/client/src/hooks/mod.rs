//! Dioxus hooks that mirror client state into signals.
//!
//! These are the view layer's entry points into the client. Nothing in this
//! crate renders components, so they are called from the dashboard's views
//! and exercised here through a headless `VirtualDom`.

mod use_query;
mod use_session;

pub use use_query::{use_protocol_client, use_query_cell, use_refresh_query};
pub use use_session::use_session_token;
