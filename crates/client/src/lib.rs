//! bizdesk client
//!
//! Client-side core of the business dashboard: the session store, the
//! GraphQL protocol client with its normalized cache and subscriptions, the
//! entity form and listing controllers, the auth flows, and the Dioxus hooks
//! that bridge them into signals.

use std::sync::{Mutex, MutexGuard, PoisonError};

#[macro_use]
pub mod logging;

pub mod api_client;
pub mod auth;
pub mod auth_session;
pub mod client;
pub mod config;
pub mod forms;
pub mod hooks;
pub mod listing;
pub mod query;
pub mod routes;
pub mod storage;
pub mod stores;
pub mod ws;

pub use api_client::{ApiClient, Transport, UploadFile};
pub use auth::{AuthError, AuthFlows};
pub use auth_session::{SessionStore, SessionToken};
pub use client::ProtocolClient;
pub use config::ClientConfig;
pub use forms::{EmployeeForm, EntityForm, Feedback, LogFeedback, ServiceForm};
pub use listing::{EmployeeListing, ListingController, ServiceListing};
pub use query::{FetchPolicy, MutationOptions, QueryCell, QueryOptions, QueryState, RefetchTarget};
pub use routes::Route;
pub use stores::CacheHandle;

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
