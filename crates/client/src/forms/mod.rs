//! Create/edit forms for dashboard entities.
//!
//! - [`validation`]: declarative per-field rules
//! - [`orchestrator`]: the generic [`EntityForm`] state machine
//! - [`upload`]: one-shot file upload per binary field
//! - [`employee`] / [`service`]: the concrete entities

pub mod employee;
pub mod orchestrator;
pub mod service;
pub mod upload;
pub mod validation;

use bizdesk_shared::{ErrorDescriptor, FieldErrors, MutationMessage, Operation};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::query::RefetchTarget;
use crate::routes::Route;

pub use employee::{load_service_options, EmployeeForm};
pub use orchestrator::EntityForm;
pub use service::ServiceForm;
pub use upload::FileUploader;
pub use validation::{Field, Schema};

/// User-visible side effects of a flow (toasts and navigation).
pub trait Feedback {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn navigate(&self, route: Route);
}

/// Feedback that only logs. Used where no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFeedback;

impl Feedback for LogFeedback {
    fn success(&self, message: &str) {
        crate::log_info!("{}", message);
    }

    fn error(&self, message: &str) {
        crate::log_error!("{}", message);
    }

    fn navigate(&self, route: Route) {
        crate::log_info!("Navigate to {}", route);
    }
}

/// Which mutation a submission issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitTarget {
    Create,
    Edit { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    Idle,
    Submitting,
    Success,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Rejected locally; no call was made.
    Invalid(FieldErrors),
    Saved(MutationMessage),
    Failed(ErrorDescriptor),
    /// The form already succeeded.
    Finished,
}

/// A record type editable through an [`EntityForm`].
pub trait FormEntity: DeserializeOwned + Clone + Send + 'static {
    type Input: Serialize + Clone + Default + for<'a> From<&'a Self>;

    const CREATE_TITLE: &'static str;
    const EDIT_TITLE: &'static str;
    const SAVED_MESSAGE: &'static str;

    fn id(&self) -> &str;

    fn create_operation() -> &'static Operation;
    fn edit_operation() -> &'static Operation;
    fn get_operation() -> &'static Operation;

    fn schema() -> Schema;

    /// Mutation variables from validated values.
    fn variables(values: Map<String, Value>) -> Map<String, Value> {
        values
    }

    /// Listing to return to after a save.
    fn listing_route() -> Route;

    /// Queries to re-issue after a save.
    fn refetch_queries() -> Vec<RefetchTarget>;

    /// Fields filled by a file upload.
    fn upload_fields() -> &'static [&'static str] {
        &[]
    }

    fn apply_upload(_input: &mut Self::Input, _field: &str, _url: String) {}
}
