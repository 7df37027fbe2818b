use std::{future::Future, marker::PhantomData};

use dioxus::prelude::*;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;

use crate::client::ProtocolClient;
use crate::query::{QueryCell, QueryState};

/// The client provided higher in the tree with `use_context_provider`.
pub fn use_protocol_client() -> ProtocolClient {
    use_context::<ProtocolClient>()
}

/// Run `start` and mirror the cell it resolves to into a signal. The signal
/// keeps following the cell: refetches and entity merges show up without a
/// new request.
///
/// A child can re-run `start` through `use_refresh_query::<T>()`.
///
/// ### Example
///
/// ```rust,ignore
/// let client = use_protocol_client();
/// let services = use_query_cell(move || {
///     let client = client.clone();
///     async move { client.query(&GET_ALL_SERVICES, params.to_variables(), QueryOptions::default()).await }
/// });
///
/// // elsewhere below:
/// let mut refresh = use_refresh_query::<ServicePage>();
/// rsx! { button { onclick: move |_| refresh.set(()), "Reload" } }
/// ```
pub fn use_query_cell<T, F>(mut start: impl FnMut() -> F + 'static) -> Signal<QueryState<T>>
where
    T: DeserializeOwned + Clone + Send + 'static,
    F: Future<Output = QueryCell<T>> + 'static,
{
    let mut state = use_signal(|| QueryState {
        loading: true,
        ..QueryState::default()
    });
    let refresh = use_context_provider::<(Signal<()>, PhantomData<T>)>(|| (Signal::new(()), PhantomData));

    use_resource(move || {
        refresh.0.read();
        let pending = start();
        async move {
            let cell = pending.await;
            let mut changes = cell.changes();
            state.set(cell.snapshot());
            while changes.next().await.is_some() {
                state.set(cell.snapshot());
            }
        }
    });

    state
}

/// See `use_query_cell`.
pub fn use_refresh_query<T>() -> Signal<()>
where
    T: 'static,
{
    use_context::<(Signal<()>, PhantomData<T>)>().0
}
