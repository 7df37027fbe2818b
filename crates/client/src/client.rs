//! Typed operations over the transport, backed by the normalized cache.
//!
//! Every call reads the session token at call time. Responses are decoded at
//! the boundary: the payload under the operation's root field must match the
//! caller's type, otherwise the call fails with a protocol error.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Weak;

use bizdesk_shared::{ClientError, ErrorDescriptor, Operation};
use futures_util::future::join_all;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api_client::{ApiClient, Transport, UploadFile};
use crate::auth_session::SessionStore;
use crate::config::ClientConfig;
use crate::query::{decode, FetchPolicy, MutationOptions, QueryCell, QueryOptions, RefetchTarget};
use crate::stores::cache::{CacheEvent, CacheHandle, QueryKey};
use crate::ws::{Subscription, SubscriptionProtocol, WsConnection};

struct ActiveQuery {
    operation: &'static Operation,
    variables: Value,
    cells: Vec<Weak<dyn Any + Send + Sync>>,
}

impl ActiveQuery {
    fn is_live(&self) -> bool {
        self.cells.iter().any(|cell| cell.strong_count() > 0)
    }
}

struct Inner {
    transport: Rc<dyn Transport>,
    session: SessionStore,
    cache: CacheHandle,
    subscription_url: String,
    active: RefCell<HashMap<QueryKey, ActiveQuery>>,
}

/// Handle to the protocol client. Clones share transport, cache and registry.
#[derive(Clone)]
pub struct ProtocolClient {
    inner: Rc<Inner>,
}

impl ProtocolClient {
    pub fn new(
        transport: impl Transport + 'static,
        session: SessionStore,
        cache: CacheHandle,
        subscription_url: impl Into<String>,
    ) -> Self {
        Self {
            inner: Rc::new(Inner {
                transport: Rc::new(transport),
                session,
                cache,
                subscription_url: subscription_url.into(),
                active: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// Client over HTTP using the process-wide session store and cache.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            ApiClient::from_config(config),
            SessionStore::global(),
            CacheHandle::global(),
            config.subscription_url(),
        )
    }

    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    pub fn cache(&self) -> &CacheHandle {
        &self.inner.cache
    }

    /// Issue a read and return a cell that keeps tracking the result.
    pub async fn query<T>(&self, operation: &'static Operation, variables: Value, options: QueryOptions) -> QueryCell<T>
    where
        T: DeserializeOwned + Clone + Send + 'static,
    {
        let key = QueryKey::new(operation.name, &variables);
        let cell = QueryCell::new(operation);
        self.inner.cache.watch_while(&key, cell.watcher(), cell.liveness());
        self.track(&key, operation, &variables, cell.liveness());

        if options.fetch_policy == FetchPolicy::CacheFirst {
            if let Some(data) = self.inner.cache.read_query(&key) {
                crate::log_debug!("Cache hit for {}", key.as_str());
                cell.apply(&CacheEvent::Data(data));
                return cell;
            }
        }

        let _ = self.fetch(operation, &key, variables).await;
        cell
    }

    /// Run a mutation. On success the payload's entities are merged into the
    /// cache, `on_completed` runs, then every refetch target is issued and
    /// awaited. On failure only `on_error` runs.
    pub async fn mutate<T>(
        &self,
        operation: &'static Operation,
        variables: Value,
        options: MutationOptions<T>,
    ) -> Result<T, ErrorDescriptor>
    where
        T: DeserializeOwned,
    {
        let MutationOptions {
            on_completed,
            on_error,
            refetch_queries,
        } = options;

        let outcome = match self.execute(operation, variables).await {
            Ok(data) => decode::<T>(operation, &data).map(|payload| (data, payload)),
            Err(err) => Err(err),
        };

        match outcome {
            Ok((data, payload)) => {
                self.inner.cache.write_entities(&data);
                if let Some(callback) = on_completed {
                    callback(&payload);
                }
                self.refetch(&refetch_queries).await;
                Ok(payload)
            }
            Err(err) => {
                let descriptor = err.descriptor();
                crate::log_warn!("{} failed: {}", operation.name, descriptor.message);
                if let Some(callback) = on_error {
                    callback(&descriptor);
                }
                Err(descriptor)
            }
        }
    }

    /// Open a push subscription on the streaming endpoint.
    pub fn subscribe<T>(&self, operation: &'static Operation, variables: Value) -> Subscription<T>
    where
        T: DeserializeOwned,
    {
        let id = uuid::Uuid::new_v4().to_string();
        crate::log_info!("Subscribing to {} ({})", operation.name, id);
        let protocol = SubscriptionProtocol::new(id, operation.request(variables), self.inner.session.read());
        let connection = WsConnection::open(&self.inner.subscription_url);
        Subscription::new(operation, connection, protocol, self.inner.cache.clone())
    }

    /// Upload one file and return its public URL.
    pub async fn upload(&self, file: UploadFile) -> Result<String, ClientError> {
        let token = self.inner.session.read();
        crate::log_info!("Uploading {} ({} bytes)", file.name, file.bytes.len());
        let response = self
            .inner
            .transport
            .upload(file, token.as_ref())
            .await
            .map_err(|e| ClientError::Upload(e.to_string()))?;
        response
            .first_url()
            .map(str::to_string)
            .ok_or_else(|| ClientError::Upload("upload returned no file URL".to_string()))
    }

    /// Forget every cached entity and result.
    pub fn reset_store(&self) {
        self.inner.cache.reset();
    }

    /// Re-issue queries after a mutation, in declared order, and wait for all.
    pub async fn refetch(&self, targets: &[RefetchTarget]) {
        let mut requests: Vec<(&'static Operation, QueryKey, Value)> = Vec::new();
        {
            let mut active = self.inner.active.borrow_mut();
            active.retain(|_, query| query.is_live());
            for target in targets {
                match target {
                    RefetchTarget::Active(name) => {
                        let mut matching: Vec<_> = active
                            .iter()
                            .filter(|(_, query)| query.operation.name == *name)
                            .map(|(key, query)| (query.operation, key.clone(), query.variables.clone()))
                            .collect();
                        if matching.is_empty() {
                            crate::log_debug!("No active {} query to refetch", name);
                        }
                        matching.sort_by(|a, b| a.1.cmp(&b.1));
                        requests.extend(matching);
                    }
                    RefetchTarget::Exact {
                        operation,
                        variables,
                    } => requests.push((
                        *operation,
                        QueryKey::new(operation.name, variables),
                        variables.clone(),
                    )),
                }
            }
        }

        if requests.is_empty() {
            return;
        }
        crate::log_debug!("Refetching {} queries", requests.len());
        let fetches = requests
            .iter()
            .map(|(operation, key, variables)| self.fetch(operation, key, variables.clone()));
        join_all(fetches).await;
    }

    fn track(&self, key: &QueryKey, operation: &'static Operation, variables: &Value, cell: Weak<dyn Any + Send + Sync>) {
        let mut active = self.inner.active.borrow_mut();
        for query in active.values_mut() {
            query.cells.retain(|cell| cell.strong_count() > 0);
        }
        active.retain(|_, query| !query.cells.is_empty());
        active
            .entry(key.clone())
            .or_insert_with(|| ActiveQuery {
                operation,
                variables: variables.clone(),
                cells: Vec::new(),
            })
            .cells
            .push(cell);
    }

    /// Network round-trip for a query, published to the cache and watchers.
    async fn fetch(&self, operation: &Operation, key: &QueryKey, variables: Value) -> Result<(), ErrorDescriptor> {
        let cache = &self.inner.cache;
        cache.broadcast(key, CacheEvent::Loading);
        match self.execute(operation, variables).await {
            Ok(data) => {
                cache.write_query(key, &data);
                let current = cache.read_query(key).unwrap_or(data);
                cache.broadcast(key, CacheEvent::Data(current));
                Ok(())
            }
            Err(err) => {
                let descriptor = err.descriptor();
                crate::log_warn!("{} failed: {}", operation.name, descriptor.message);
                cache.broadcast(key, CacheEvent::Error(descriptor.clone()));
                Err(descriptor)
            }
        }
    }

    /// One call through the transport. Returns the `data` object.
    async fn execute(&self, operation: &Operation, variables: Value) -> Result<Value, ClientError> {
        let token = self.inner.session.read();
        crate::log_debug!("{:?} {}", operation.kind, operation.name);
        let response = self
            .inner
            .transport
            .execute(&operation.request(variables), token.as_ref())
            .await?;

        if let Some(first) = response.errors.first() {
            return Err(ClientError::Application {
                message: first.message.clone(),
                code: first.code(),
            });
        }
        response
            .data
            .filter(|data| !data.is_null())
            .ok_or_else(|| ClientError::Protocol(format!("{} returned no data", operation.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{client_with, MockTransport};
    use bizdesk_shared::operations::{EDIT_SERVICE, GET_ALL_EMPLOYEES, GET_ALL_SERVICES, GET_SERVICE_BY_ID};
    use bizdesk_shared::{EmployeePage, ErrorKind, GraphqlResponse, MutationMessage, Service, ServicePage};
    use serde_json::json;
    use std::cell::Cell;

    fn service(id: &str, name: &str) -> Value {
        json!({"__typename": "Service", "id": id, "name": name, "price": "20", "duration": "00:30"})
    }

    fn service_page(services: Vec<Value>, total: u64) -> GraphqlResponse {
        GraphqlResponse::data(json!({"getAllServices": {"services": services, "total_services": total}}))
    }

    #[tokio::test]
    async fn bearer_token_is_read_at_call_time() {
        let transport = MockTransport::new();
        transport.respond("getServiceById", GraphqlResponse::data(json!({"getServiceById": service("s1", "Cut")})));
        let client = client_with(&transport);

        let _: QueryCell<Service> = client
            .query(&GET_SERVICE_BY_ID, json!({"id": "s1"}), QueryOptions::network_only())
            .await;
        client.session().set("tok");
        let _: QueryCell<Service> = client
            .query(&GET_SERVICE_BY_ID, json!({"id": "s1"}), QueryOptions::network_only())
            .await;

        let tokens: Vec<Option<String>> = transport.calls().into_iter().map(|c| c.token).collect();
        assert_eq!(tokens, vec![None, Some("tok".to_string())]);
    }

    #[tokio::test]
    async fn cache_first_skips_network_on_hit() {
        let transport = MockTransport::new();
        transport.respond("getServiceById", GraphqlResponse::data(json!({"getServiceById": service("s1", "Cut")})));
        let client = client_with(&transport);

        let first: QueryCell<Service> = client
            .query(&GET_SERVICE_BY_ID, json!({"id": "s1"}), QueryOptions::default())
            .await;
        let second: QueryCell<Service> = client
            .query(&GET_SERVICE_BY_ID, json!({"id": "s1"}), QueryOptions::default())
            .await;

        assert_eq!(transport.calls().len(), 1);
        assert_eq!(first.data(), second.data());
        assert!(!second.is_loading());
    }

    #[tokio::test]
    async fn graphql_errors_surface_as_application_errors() {
        let transport = MockTransport::new();
        let mut response = GraphqlResponse::error("Email already exists");
        response.errors[0].extensions = Some(json!({"code": "BAD_USER_INPUT"}));
        transport.respond("getServiceById", response);
        let client = client_with(&transport);

        let cell: QueryCell<Service> = client
            .query(&GET_SERVICE_BY_ID, json!({"id": "s1"}), QueryOptions::default())
            .await;
        let error = cell.error().unwrap();
        assert_eq!(error.kind, ErrorKind::Application);
        assert_eq!(error.message, "Email already exists");
        assert_eq!(error.code.as_deref(), Some("BAD_USER_INPUT"));
    }

    #[tokio::test]
    async fn failed_mutation_leaves_cache_untouched() {
        let transport = MockTransport::new();
        transport.respond("getAllServices", service_page(vec![service("s1", "Cut")], 1));
        transport.respond("EditService", GraphqlResponse::error("Service not found"));
        let client = client_with(&transport);

        let _cell: QueryCell<ServicePage> = client
            .query(&GET_ALL_SERVICES, json!({"page": 1, "limit": 10, "search": ""}), QueryOptions::default())
            .await;
        let before = client.cache().entities_snapshot();

        let errored = Rc::new(Cell::new(false));
        let flag = errored.clone();
        let result = client
            .mutate::<MutationMessage>(
                &EDIT_SERVICE,
                json!({"id": "s1", "name": "Trim"}),
                MutationOptions::new()
                    .on_completed(|_| panic!("must not complete"))
                    .on_error(move |_| flag.set(true))
                    .refetch(RefetchTarget::Active("getAllServices")),
            )
            .await;

        assert!(result.is_err());
        assert!(errored.get());
        assert_eq!(client.cache().entities_snapshot(), before);
        // query + failed mutation, no refetch
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn mutation_refetches_active_queries_and_updates_cells() {
        let transport = MockTransport::new();
        transport.respond("getAllServices", service_page(vec![service("s1", "Cut")], 1));
        transport.respond("EditService", GraphqlResponse::data(json!({"EditService": {"message": "Service updated"}})));
        transport.respond("getAllServices", service_page(vec![service("s1", "Trim")], 1));
        let client = client_with(&transport);

        let cell: QueryCell<ServicePage> = client
            .query(&GET_ALL_SERVICES, json!({"page": 1, "limit": 10, "search": ""}), QueryOptions::default())
            .await;
        assert_eq!(cell.data().unwrap().services[0].name, "Cut");

        let completed = Rc::new(Cell::new(false));
        let flag = completed.clone();
        let message = client
            .mutate::<MutationMessage>(
                &EDIT_SERVICE,
                json!({"id": "s1", "name": "Trim"}),
                MutationOptions::new()
                    .on_completed(move |m: &MutationMessage| {
                        assert_eq!(m.message.as_deref(), Some("Service updated"));
                        flag.set(true);
                    })
                    .refetch(RefetchTarget::Active("getAllServices")),
            )
            .await
            .unwrap();

        assert_eq!(message.message.as_deref(), Some("Service updated"));
        assert!(completed.get());
        let names: Vec<String> = transport.calls().into_iter().map(|c| c.operation).collect();
        assert_eq!(names, vec!["getAllServices", "EditService", "getAllServices"]);
        assert_eq!(cell.data().unwrap().services[0].name, "Trim");
    }

    #[tokio::test]
    async fn dropped_cells_are_not_refetched() {
        let transport = MockTransport::new();
        transport.respond("getAllServices", service_page(vec![], 0));
        transport.respond("EditService", GraphqlResponse::data(json!({"EditService": {"message": "ok"}})));
        let client = client_with(&transport);

        let cell: QueryCell<ServicePage> = client
            .query(&GET_ALL_SERVICES, json!({"page": 1, "limit": 10, "search": ""}), QueryOptions::default())
            .await;
        drop(cell);

        client
            .mutate::<MutationMessage>(
                &EDIT_SERVICE,
                json!({"id": "s1"}),
                MutationOptions::new().refetch(RefetchTarget::Active("getAllServices")),
            )
            .await
            .unwrap();
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn refetch_targets_are_issued_in_declared_order() {
        let transport = MockTransport::new();
        let employees = json!({"getAllEmployees": {"employees": [], "total_employees": 0}});
        transport.respond("getAllEmployees", GraphqlResponse::data(employees.clone()));
        transport.respond("getAllServices", service_page(vec![], 0));
        transport.respond("EditService", GraphqlResponse::data(json!({"EditService": {"message": "ok"}})));
        let client = client_with(&transport);

        let _employees: QueryCell<EmployeePage> = client
            .query(&GET_ALL_EMPLOYEES, json!({"page": 1, "limit": 10, "search": ""}), QueryOptions::default())
            .await;
        let _second: QueryCell<EmployeePage> = client
            .query(&GET_ALL_EMPLOYEES, json!({"page": 3, "limit": 10, "search": ""}), QueryOptions::default())
            .await;
        let before = transport.calls().len();

        client
            .mutate::<MutationMessage>(
                &EDIT_SERVICE,
                json!({"id": "s1"}),
                MutationOptions::new()
                    .refetch(RefetchTarget::Exact {
                        operation: &GET_ALL_SERVICES,
                        variables: json!({"page": 2, "limit": 10, "search": ""}),
                    })
                    .refetch(RefetchTarget::Active("getAllEmployees")),
            )
            .await
            .unwrap();

        let issued: Vec<(String, Value)> = transport
            .calls()
            .into_iter()
            .skip(before + 1)
            .map(|c| (c.operation, c.variables))
            .collect();
        assert_eq!(
            issued,
            vec![
                ("getAllServices".to_string(), json!({"page": 2, "limit": 10, "search": ""})),
                ("getAllEmployees".to_string(), json!({"page": 1, "limit": 10, "search": ""})),
                ("getAllEmployees".to_string(), json!({"page": 3, "limit": 10, "search": ""})),
            ]
        );
    }

    #[tokio::test]
    async fn registering_a_query_forgets_dropped_ones() {
        let transport = MockTransport::new();
        transport.respond("getAllServices", service_page(vec![], 0));
        transport.respond("getServiceById", GraphqlResponse::data(json!({"getServiceById": service("s1", "Cut")})));
        let client = client_with(&transport);

        for page in 1..=3 {
            let _: QueryCell<ServicePage> = client
                .query(&GET_ALL_SERVICES, json!({"page": page, "limit": 10, "search": ""}), QueryOptions::default())
                .await;
        }
        let kept: QueryCell<Service> = client
            .query(&GET_SERVICE_BY_ID, json!({"id": "s1"}), QueryOptions::default())
            .await;

        assert_eq!(client.inner.active.borrow().len(), 1);
        assert_eq!(client.cache().watched_keys(), 1);
        assert!(kept.data().is_some());
    }

    #[tokio::test]
    async fn payload_shape_mismatch_is_protocol_error() {
        let transport = MockTransport::new();
        transport.respond("EditService", GraphqlResponse::data(json!({"EditService": "not an object"})));
        let client = client_with(&transport);

        let err = client
            .mutate::<MutationMessage>(&EDIT_SERVICE, json!({"id": "s1"}), MutationOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Protocol);
    }

    #[tokio::test]
    async fn upload_without_url_is_upload_error() {
        let transport = MockTransport::new();
        transport.upload_response(Ok(bizdesk_shared::UploadResponse::default()));
        let client = client_with(&transport);

        let err = client
            .upload(UploadFile::new("a.png", "image/png", vec![1]))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Upload(_)));
    }

    #[tokio::test]
    async fn reset_store_drops_cached_results() {
        let transport = MockTransport::new();
        transport.respond("getServiceById", GraphqlResponse::data(json!({"getServiceById": service("s1", "Cut")})));
        transport.respond("getServiceById", GraphqlResponse::data(json!({"getServiceById": service("s1", "Cut")})));
        let client = client_with(&transport);

        let _a: QueryCell<Service> = client
            .query(&GET_SERVICE_BY_ID, json!({"id": "s1"}), QueryOptions::default())
            .await;
        client.reset_store();
        let _b: QueryCell<Service> = client
            .query(&GET_SERVICE_BY_ID, json!({"id": "s1"}), QueryOptions::default())
            .await;
        assert_eq!(transport.calls().len(), 2);
    }
}
