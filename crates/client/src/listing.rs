//! Paginated listings with delete-and-refresh.

use std::cell::RefCell;
use std::rc::Rc;

use bizdesk_shared::operations::{DELETE_EMPLOYEE, DELETE_SERVICE, GET_ALL_EMPLOYEES, GET_ALL_SERVICES};
use bizdesk_shared::{
    Employee, EmployeePage, ErrorDescriptor, MutationMessage, Operation, PageParams, ResultPage, Service, ServicePage,
};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::client::ProtocolClient;
use crate::forms::Feedback;
use crate::query::{MutationOptions, QueryCell, QueryOptions, RefetchTarget};

const DELETED_MESSAGE: &str = "Deleted successfully";

/// A record type shown in a paginated listing.
pub trait ListedEntity {
    type Page: ResultPage + DeserializeOwned + Clone + Send + 'static;

    fn list_operation() -> &'static Operation;
    fn delete_operation() -> &'static Operation;
}

impl ListedEntity for Employee {
    type Page = EmployeePage;

    fn list_operation() -> &'static Operation {
        &GET_ALL_EMPLOYEES
    }

    fn delete_operation() -> &'static Operation {
        &DELETE_EMPLOYEE
    }
}

impl ListedEntity for Service {
    type Page = ServicePage;

    fn list_operation() -> &'static Operation {
        &GET_ALL_SERVICES
    }

    fn delete_operation() -> &'static Operation {
        &DELETE_SERVICE
    }
}

pub struct ListingController<E: ListedEntity> {
    client: ProtocolClient,
    feedback: Rc<dyn Feedback>,
    params: RefCell<PageParams>,
    cell: RefCell<Option<QueryCell<E::Page>>>,
}

pub type EmployeeListing = ListingController<Employee>;
pub type ServiceListing = ListingController<Service>;

impl<E: ListedEntity> ListingController<E> {
    pub fn new(client: ProtocolClient, feedback: Rc<dyn Feedback>) -> Self {
        Self {
            client,
            feedback,
            params: RefCell::new(PageParams::default()),
            cell: RefCell::new(None),
        }
    }

    /// Parameters of the active listing query.
    pub fn params(&self) -> PageParams {
        self.params.borrow().clone()
    }

    /// Show the page described by `params`.
    pub async fn list(&self, params: PageParams) -> QueryCell<E::Page> {
        crate::log_debug!(
            "Listing {} page {} (limit {}, search {:?})",
            E::list_operation().name,
            params.page,
            params.limit,
            params.search
        );
        let variables = params.to_variables();
        *self.params.borrow_mut() = params;
        let cell = self
            .client
            .query(E::list_operation(), variables, QueryOptions::default())
            .await;
        *self.cell.borrow_mut() = Some(cell.clone());
        cell
    }

    /// The active listing's cell, once [`ListingController::list`] ran.
    pub fn cell(&self) -> Option<QueryCell<E::Page>> {
        self.cell.borrow().clone()
    }

    pub fn page(&self) -> Option<E::Page> {
        self.cell().and_then(|cell| cell.data())
    }

    pub fn total_count(&self) -> u64 {
        self.page().map(|page| page.total_count()).unwrap_or(0)
    }

    /// Delete one record, then refresh the listing with its current
    /// parameters. On failure the listing is left alone.
    pub async fn remove(&self, id: &str) -> Result<MutationMessage, ErrorDescriptor> {
        let params = self.params();
        let success = self.feedback.clone();
        let failure = self.feedback.clone();
        let options = MutationOptions::new()
            .on_completed(move |payload: &MutationMessage| {
                success.success(payload.message.as_deref().unwrap_or(DELETED_MESSAGE));
            })
            .on_error(move |error| failure.error(error.display_text()))
            .refetch(RefetchTarget::Exact {
                operation: E::list_operation(),
                variables: params.to_variables(),
            });

        crate::log_info!("Deleting {} via {}", id, E::delete_operation().name);
        self.client
            .mutate(E::delete_operation(), json!({ "id": id }), options)
            .await
    }
}
