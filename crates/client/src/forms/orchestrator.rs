//! The generic create/edit form.
//!
//! ```text
//!   Idle ──submit──▶ Submitting ──ok──▶ Success (navigates away)
//!    ▲   (invalid: stays Idle)  │
//!    └──────────failed──────────┘ (last_error kept)
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use bizdesk_shared::{ClientError, ErrorDescriptor, FieldErrors, MutationMessage};
use serde_json::{json, Value};

use super::upload::UPLOAD_IN_PROGRESS;
use super::{Feedback, FileUploader, FormEntity, FormPhase, SubmitOutcome, SubmitTarget};
use crate::api_client::UploadFile;
use crate::client::ProtocolClient;
use crate::query::{MutationOptions, QueryCell, QueryOptions};

const UPLOAD_SUCCESS: &str = "File uploaded successfully!";
const UPLOAD_FAILED: &str = "File upload failed. Try again.";

struct FormState {
    phase: FormPhase,
    last_error: Option<ErrorDescriptor>,
    field_errors: FieldErrors,
}

pub struct EntityForm<E: FormEntity> {
    client: ProtocolClient,
    feedback: Rc<dyn Feedback>,
    target: SubmitTarget,
    input: RefCell<E::Input>,
    state: RefCell<FormState>,
    uploaders: Vec<FileUploader>,
}

impl<E: FormEntity> EntityForm<E> {
    fn with_target(client: ProtocolClient, feedback: Rc<dyn Feedback>, target: SubmitTarget, input: E::Input) -> Self {
        Self {
            client,
            feedback,
            target,
            input: RefCell::new(input),
            state: RefCell::new(FormState {
                phase: FormPhase::Idle,
                last_error: None,
                field_errors: FieldErrors::new(),
            }),
            uploaders: E::upload_fields().iter().copied().map(FileUploader::new).collect(),
        }
    }

    /// Empty form issuing the create operation.
    pub fn create(client: ProtocolClient, feedback: Rc<dyn Feedback>) -> Self {
        Self::with_target(client, feedback, SubmitTarget::Create, E::Input::default())
    }

    /// Form pre-filled from `record`, issuing the edit operation.
    pub fn edit(client: ProtocolClient, feedback: Rc<dyn Feedback>, record: &E) -> Self {
        let target = SubmitTarget::Edit {
            id: record.id().to_string(),
        };
        Self::with_target(client, feedback, target, E::Input::from(record))
    }

    /// Build the form for a route parameter: `"new"` creates, anything else
    /// loads that record fresh from the network.
    pub async fn load(client: ProtocolClient, feedback: Rc<dyn Feedback>, id_param: &str) -> Result<Self, ErrorDescriptor> {
        if id_param == "new" {
            return Ok(Self::create(client, feedback));
        }

        let cell: QueryCell<Option<E>> = client
            .query(E::get_operation(), json!({ "id": id_param }), QueryOptions::network_only())
            .await;
        let state = cell.snapshot();
        if let Some(error) = state.error {
            crate::log_warn!("Could not load {}: {}", id_param, error.message);
            return Err(error);
        }
        match state.data.flatten() {
            Some(record) => Ok(Self::edit(client, feedback, &record)),
            None => Err(ClientError::Application {
                message: format!("{id_param} was not found"),
                code: Some("NOT_FOUND".to_string()),
            }
            .descriptor()),
        }
    }

    pub fn target(&self) -> &SubmitTarget {
        &self.target
    }

    pub fn title(&self) -> &'static str {
        match self.target {
            SubmitTarget::Create => E::CREATE_TITLE,
            SubmitTarget::Edit { .. } => E::EDIT_TITLE,
        }
    }

    pub fn input(&self) -> E::Input {
        self.input.borrow().clone()
    }

    pub fn update(&self, f: impl FnOnce(&mut E::Input)) {
        f(&mut self.input.borrow_mut());
    }

    pub fn phase(&self) -> FormPhase {
        self.state.borrow().phase
    }

    pub fn is_submitting(&self) -> bool {
        self.phase() == FormPhase::Submitting
    }

    pub fn last_error(&self) -> Option<ErrorDescriptor> {
        self.state.borrow().last_error.clone()
    }

    pub fn field_errors(&self) -> FieldErrors {
        self.state.borrow().field_errors.clone()
    }

    pub fn uploader(&self, field: &str) -> Option<&FileUploader> {
        self.uploaders.iter().find(|u| u.field() == field)
    }

    /// Upload a file for `field` and store the returned URL in the input.
    /// Failure is reported but leaves the rest of the form usable.
    pub async fn upload_file(&self, field: &str, file: UploadFile) -> Result<String, ClientError> {
        let Some(uploader) = self.uploader(field) else {
            return Err(ClientError::Upload(format!("{field} does not accept files")));
        };
        match uploader.upload(&self.client, file).await {
            Ok(url) => {
                E::apply_upload(&mut self.input.borrow_mut(), field, url.clone());
                self.feedback.success(UPLOAD_SUCCESS);
                Ok(url)
            }
            // the uploader logs the transfer's own reason
            Err(err) => {
                let message = match &err {
                    ClientError::Upload(reason) if reason == UPLOAD_IN_PROGRESS => UPLOAD_IN_PROGRESS,
                    _ => UPLOAD_FAILED,
                };
                self.feedback.error(message);
                Err(err)
            }
        }
    }

    /// Validate and send the form. Exactly one of create/edit is issued.
    pub async fn submit(&self) -> SubmitOutcome {
        if self.phase() == FormPhase::Success {
            return SubmitOutcome::Finished;
        }

        let input = self.input();
        let values = match E::schema().validate(&input) {
            Ok(values) => values,
            Err(errors) => {
                crate::log_debug!("Form rejected: {}", errors);
                self.state.borrow_mut().field_errors = errors.clone();
                return SubmitOutcome::Invalid(errors);
            }
        };

        let mut variables = E::variables(values);
        let operation = match &self.target {
            SubmitTarget::Create => E::create_operation(),
            SubmitTarget::Edit { id } => {
                variables.insert("id".to_string(), Value::String(id.clone()));
                E::edit_operation()
            }
        };

        {
            let mut state = self.state.borrow_mut();
            state.phase = FormPhase::Submitting;
            state.field_errors = FieldErrors::new();
        }
        crate::log_info!("Submitting {}", operation.name);

        let on_success = self.feedback.clone();
        let on_failure = self.feedback.clone();
        let options = E::refetch_queries().into_iter().fold(
            MutationOptions::<MutationMessage>::new()
                .on_completed(move |payload: &MutationMessage| {
                    on_success.success(payload.message.as_deref().unwrap_or(E::SAVED_MESSAGE));
                })
                .on_error(move |error| on_failure.error(error.display_text())),
            MutationOptions::refetch,
        );

        let result = self
            .client
            .mutate::<MutationMessage>(operation, Value::Object(variables), options)
            .await;

        match result {
            Ok(payload) => {
                self.state.borrow_mut().phase = FormPhase::Success;
                self.feedback.navigate(E::listing_route());
                SubmitOutcome::Saved(payload)
            }
            Err(error) => {
                let mut state = self.state.borrow_mut();
                state.phase = FormPhase::Idle;
                state.last_error = Some(error.clone());
                SubmitOutcome::Failed(error)
            }
        }
    }
}
