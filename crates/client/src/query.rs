//! Query cells, fetch policies and mutation options.

use std::any::Any;
use std::sync::{Arc, Mutex, Weak};

use bizdesk_shared::{ClientError, ErrorDescriptor, Operation};
use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::lock;
use crate::stores::cache::{CacheEvent, Watcher};

/// Observable state of one query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<ErrorDescriptor>,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

struct CellInner<T> {
    state: QueryState<T>,
    listeners: Vec<UnboundedSender<()>>,
}

/// A live view of one query. Updated on refetch and whenever a cached entity
/// it references changes. Dropping every clone stops the updates.
pub struct QueryCell<T> {
    operation: &'static Operation,
    inner: Arc<Mutex<CellInner<T>>>,
}

impl<T> Clone for QueryCell<T> {
    fn clone(&self) -> Self {
        Self {
            operation: self.operation,
            inner: self.inner.clone(),
        }
    }
}

impl<T> QueryCell<T>
where
    T: DeserializeOwned + Clone + Send + 'static,
{
    pub(crate) fn new(operation: &'static Operation) -> Self {
        Self {
            operation,
            inner: Arc::new(Mutex::new(CellInner {
                state: QueryState::default(),
                listeners: Vec::new(),
            })),
        }
    }

    pub fn operation(&self) -> &'static Operation {
        self.operation
    }

    pub fn snapshot(&self) -> QueryState<T> {
        lock(&self.inner).state.clone()
    }

    pub fn data(&self) -> Option<T> {
        lock(&self.inner).state.data.clone()
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.inner).state.loading
    }

    pub fn error(&self) -> Option<ErrorDescriptor> {
        lock(&self.inner).state.error.clone()
    }

    /// One `()` per state change.
    pub fn changes(&self) -> UnboundedReceiver<()> {
        let (tx, rx) = unbounded();
        lock(&self.inner).listeners.push(tx);
        rx
    }

    /// Cache watcher holding only a weak reference to this cell.
    pub(crate) fn watcher(&self) -> Watcher {
        let weak = Arc::downgrade(&self.inner);
        let operation = self.operation;
        Arc::new(move |event: &CacheEvent| match weak.upgrade() {
            Some(inner) => {
                apply(operation, &inner, event);
                true
            }
            None => false,
        })
    }

    /// Liveness handle for the active-query registry.
    pub(crate) fn liveness(&self) -> Weak<dyn Any + Send + Sync> {
        let weak: Weak<Mutex<CellInner<T>>> = Arc::downgrade(&self.inner);
        weak
    }

    pub(crate) fn apply(&self, event: &CacheEvent) {
        apply(self.operation, &self.inner, event);
    }
}

fn apply<T: DeserializeOwned>(operation: &Operation, inner: &Mutex<CellInner<T>>, event: &CacheEvent) {
    let listeners = {
        let mut cell = lock(inner);
        match event {
            CacheEvent::Loading => cell.state.loading = true,
            CacheEvent::Data(data) => match decode::<T>(operation, data) {
                Ok(payload) => {
                    cell.state.data = Some(payload);
                    cell.state.error = None;
                    cell.state.loading = false;
                }
                Err(err) => {
                    cell.state.error = Some(err.descriptor());
                    cell.state.loading = false;
                }
            },
            CacheEvent::Error(err) => {
                cell.state.error = Some(err.clone());
                cell.state.loading = false;
            }
        }
        cell.listeners.retain(|tx| !tx.is_closed());
        cell.listeners.clone()
    };
    for tx in listeners {
        let _ = tx.unbounded_send(());
    }
}

/// Decode the payload under the operation's root field.
pub(crate) fn decode<T: DeserializeOwned>(operation: &Operation, data: &Value) -> Result<T, ClientError> {
    serde_json::from_value(operation.payload(data).clone()).map_err(|e| {
        ClientError::Protocol(format!(
            "unexpected {} payload under `{}`: {e}",
            operation.name, operation.root_field
        ))
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchPolicy {
    /// Answer from a complete cached result when there is one.
    #[default]
    CacheFirst,
    /// Always go to the network.
    NetworkOnly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub fetch_policy: FetchPolicy,
}

impl QueryOptions {
    pub fn network_only() -> Self {
        Self {
            fetch_policy: FetchPolicy::NetworkOnly,
        }
    }
}

/// A query to re-issue after a successful mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum RefetchTarget {
    /// Every active query of this operation, with its own variables.
    Active(&'static str),
    /// One query with exactly these variables.
    Exact {
        operation: &'static Operation,
        variables: Value,
    },
}

pub type CompletedCallback<T> = Box<dyn FnOnce(&T)>;
pub type ErrorCallback = Box<dyn FnOnce(&ErrorDescriptor)>;

pub struct MutationOptions<T> {
    pub on_completed: Option<CompletedCallback<T>>,
    pub on_error: Option<ErrorCallback>,
    pub refetch_queries: Vec<RefetchTarget>,
}

impl<T> Default for MutationOptions<T> {
    fn default() -> Self {
        Self {
            on_completed: None,
            on_error: None,
            refetch_queries: Vec::new(),
        }
    }
}

impl<T> MutationOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_completed(mut self, f: impl FnOnce(&T) + 'static) -> Self {
        self.on_completed = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(&ErrorDescriptor) + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn refetch(mut self, target: RefetchTarget) -> Self {
        self.refetch_queries.push(target);
        self
    }
}
