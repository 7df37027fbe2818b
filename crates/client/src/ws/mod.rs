//! Push updates over `graphql-transport-ws`.
//!
//! ```text
//!  ProtocolClient::subscribe
//!            │
//!            ▼
//!   ┌──────────────────┐   frames   ┌──────────────┐
//!   │  Subscription<T> │ ─────────▶ │ WsConnection │ ──▶ server
//!   │ (drives protocol)│ ◀───────── │ (per platform)│
//!   └──────────────────┘   events   └──────────────┘
//!            │
//!            ▼
//!   normalized cache → watching query cells
//! ```

mod connection;
mod session;
mod subscription;

pub use connection::{WsConnection, WsEvent};
pub use session::{ProtocolStep, SubscriptionProtocol};
pub use subscription::Subscription;
