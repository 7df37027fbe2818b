use bizdesk_shared::operations::{
    ADD_EMPLOYEE, EDIT_EMPLOYEE, FETCH_SERVICES_WITHOUT_PAGINATION, GET_ALL_EMPLOYEES, GET_EMPLOYEE_BY_ID,
};
use bizdesk_shared::{Employee, EmployeeInput, Operation, PageParams, ServiceOptions};
use serde_json::json;

use super::{Field, FormEntity, Schema};
use crate::client::ProtocolClient;
use crate::query::{QueryCell, QueryOptions, RefetchTarget};
use crate::routes::Route;

pub const PROFILE_URL_FIELD: &str = "profileUrl";

pub type EmployeeForm = super::EntityForm<Employee>;

impl FormEntity for Employee {
    type Input = EmployeeInput;

    const CREATE_TITLE: &'static str = "Create New Employees";
    const EDIT_TITLE: &'static str = "Edit Employees";
    const SAVED_MESSAGE: &'static str = "Employee saved";

    fn id(&self) -> &str {
        &self.id
    }

    fn create_operation() -> &'static Operation {
        &ADD_EMPLOYEE
    }

    fn edit_operation() -> &'static Operation {
        &EDIT_EMPLOYEE
    }

    fn get_operation() -> &'static Operation {
        &GET_EMPLOYEE_BY_ID
    }

    fn schema() -> Schema {
        Schema::new()
            .field(Field::string("email").email("Invalid email address"))
            .field(Field::string("firstName").min_len(2, "First name must be at least 2 characters"))
            .field(Field::string("lastName").min_len(2, "Last name must be at least 2 characters"))
            .field(Field::string(PROFILE_URL_FIELD).url("Invalid URL"))
            .field(Field::array("services").each_min_len(1, "Service is required."))
            .field(Field::array("weeklyAvailability").each_min_len(1, "At least one day required."))
    }

    fn listing_route() -> Route {
        Route::Employees
    }

    /// The listing the form navigates back to is remounted on its first page,
    /// so that page is refreshed whether or not a listing is mounted now.
    fn refetch_queries() -> Vec<RefetchTarget> {
        vec![RefetchTarget::Exact {
            operation: &GET_ALL_EMPLOYEES,
            variables: PageParams::default().to_variables(),
        }]
    }

    fn upload_fields() -> &'static [&'static str] {
        &[PROFILE_URL_FIELD]
    }

    fn apply_upload(input: &mut EmployeeInput, field: &str, url: String) {
        if field == PROFILE_URL_FIELD {
            input.profile_url = url;
        }
    }
}

/// Services offered in the employee form's picker.
pub async fn load_service_options(client: &ProtocolClient) -> QueryCell<ServiceOptions> {
    client
        .query(&FETCH_SERVICES_WITHOUT_PAGINATION, json!({}), QueryOptions::default())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::{FormPhase, SubmitOutcome, SubmitTarget};
    use crate::listing::EmployeeListing;
    use crate::testing::{client_with, FeedbackEvent, MockTransport, RecordingFeedback};
    use bizdesk_shared::{toggle_weekday, ApiError, ErrorKind, FileDescriptor, GraphqlResponse, UploadResponse, Weekday};
    use std::rc::Rc;

    fn employee() -> Employee {
        Employee {
            id: "e1".to_string(),
            email: "ada@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            profile_url: Some("https://cdn.example.com/ada.png".to_string()),
            services: vec!["s1".to_string()],
            weekly_availability: vec![Weekday::Mon],
        }
    }

    fn fill(form: &EmployeeForm) {
        form.update(|input| {
            input.email = "grace@example.com".to_string();
            input.first_name = "Grace".to_string();
            input.last_name = "Hopper".to_string();
            input.profile_url = "https://cdn.example.com/grace.png".to_string();
            input.services = vec!["s1".to_string()];
            toggle_weekday(&mut input.weekly_availability, Weekday::Tue, true);
        });
    }

    fn employee_page(rows: Vec<serde_json::Value>) -> GraphqlResponse {
        let total = rows.len();
        GraphqlResponse::data(json!({"getAllEmployees": {"employees": rows, "total_employees": total}}))
    }

    fn employee_row(id: &str, first: &str) -> serde_json::Value {
        json!({
            "__typename": "Employee", "id": id, "email": format!("{id}@example.com"),
            "firstName": first, "lastName": "Person", "profileUrl": null,
            "services": ["s1"], "weeklyAvailability": ["Mon"]
        })
    }

    #[tokio::test]
    async fn create_issues_only_add_employee() {
        let transport = MockTransport::new();
        transport.respond("addEmployee", GraphqlResponse::data(json!({"addEmployee": {"message": "Employee added"}})));
        transport.respond("getAllEmployees", employee_page(vec![]));
        let client = client_with(&transport);
        let feedback = Rc::new(RecordingFeedback::default());

        let form = EmployeeForm::create(client, feedback.clone());
        assert_eq!(form.title(), "Create New Employees");
        fill(&form);

        let outcome = form.submit().await;
        assert!(matches!(outcome, SubmitOutcome::Saved(_)));
        assert_eq!(form.phase(), FormPhase::Success);

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].operation, "addEmployee");
        assert_eq!(calls[1].operation, "getAllEmployees");
        assert_eq!(calls[1].variables, json!({"page": 1, "limit": 10, "search": ""}));
        assert!(calls[0].variables.get("id").is_none());
        assert_eq!(calls[0].variables["weeklyAvailability"], json!(["Tue"]));
        assert_eq!(
            feedback.events(),
            vec![
                FeedbackEvent::Success("Employee added".to_string()),
                FeedbackEvent::Navigate(Route::Employees),
            ]
        );
    }

    #[tokio::test]
    async fn edit_issues_only_edit_employee_with_id() {
        let transport = MockTransport::new();
        transport.respond("editEmployee", GraphqlResponse::data(json!({"editEmployee": {"message": "Employee updated"}})));
        transport.respond("getAllEmployees", employee_page(vec![]));
        let client = client_with(&transport);

        let form = EmployeeForm::edit(client, Rc::new(RecordingFeedback::default()), &employee());
        assert_eq!(form.target(), &SubmitTarget::Edit { id: "e1".to_string() });
        assert_eq!(form.title(), "Edit Employees");

        form.submit().await;
        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].operation, "editEmployee");
        assert_eq!(calls[1].operation, "getAllEmployees");
        assert_eq!(calls[0].variables["id"], "e1");
        assert_eq!(calls[0].variables["firstName"], "Ada");
    }

    #[tokio::test]
    async fn listing_remounted_after_create_shows_the_new_employee() {
        let transport = MockTransport::new();
        transport.respond("getAllEmployees", employee_page(vec![employee_row("e1", "Ada")]));
        transport.respond("addEmployee", GraphqlResponse::data(json!({"addEmployee": {"message": "Employee added"}})));
        transport.respond(
            "getAllEmployees",
            employee_page(vec![employee_row("e1", "Ada"), employee_row("e2", "Grace")]),
        );
        let client = client_with(&transport);
        let feedback = Rc::new(RecordingFeedback::default());

        let listing = EmployeeListing::new(client.clone(), feedback.clone());
        assert_eq!(listing.list(PageParams::default()).await.data().unwrap().total_employees, 1);
        drop(listing);

        let form = EmployeeForm::create(client.clone(), feedback.clone());
        fill(&form);
        assert!(matches!(form.submit().await, SubmitOutcome::Saved(_)));

        let listing = EmployeeListing::new(client, feedback);
        let page = listing.list(PageParams::default()).await.data().unwrap();
        assert_eq!(page.total_employees, 2);
        assert_eq!(page.employees[1].first_name, "Grace");

        let names: Vec<String> = transport.calls().into_iter().map(|c| c.operation).collect();
        assert_eq!(names, vec!["getAllEmployees", "addEmployee", "getAllEmployees"]);
    }

    #[tokio::test]
    async fn invalid_input_makes_no_call() {
        let transport = MockTransport::new();
        let client = client_with(&transport);
        let form = EmployeeForm::create(client, Rc::new(RecordingFeedback::default()));
        form.update(|input| {
            input.email = "nope".to_string();
            input.first_name = "A".to_string();
            input.last_name = "Lovelace".to_string();
            input.services = vec![String::new()];
        });

        let SubmitOutcome::Invalid(errors) = form.submit().await else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.field("email"), ["Invalid email address"]);
        assert_eq!(errors.field("firstName"), ["First name must be at least 2 characters"]);
        assert_eq!(errors.field("profileUrl"), ["Invalid URL"]);
        assert_eq!(errors.field("services"), ["Service is required."]);
        assert_eq!(form.phase(), FormPhase::Idle);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn server_failure_returns_to_idle_with_error() {
        let transport = MockTransport::new();
        transport.respond("addEmployee", GraphqlResponse::error("Email already exists"));
        let client = client_with(&transport);
        let feedback = Rc::new(RecordingFeedback::default());
        let form = EmployeeForm::create(client, feedback.clone());
        fill(&form);

        let outcome = form.submit().await;
        assert!(matches!(outcome, SubmitOutcome::Failed(_)));
        assert_eq!(form.phase(), FormPhase::Idle);
        let error = form.last_error().unwrap();
        assert_eq!(error.kind, ErrorKind::Application);
        assert_eq!(feedback.events(), vec![FeedbackEvent::Error("Email already exists".to_string())]);

        // still editable and resubmittable
        transport.respond("addEmployee", GraphqlResponse::data(json!({"addEmployee": {"message": "ok"}})));
        assert!(matches!(form.submit().await, SubmitOutcome::Saved(_)));
    }

    #[tokio::test]
    async fn load_new_and_existing() {
        let transport = MockTransport::new();
        transport.respond(
            "getEmployeeById",
            GraphqlResponse::data(json!({"getEmployeeById": {
                "__typename": "Employee", "id": "e1", "email": "ada@example.com",
                "firstName": "Ada", "lastName": "Lovelace", "profileUrl": null,
                "services": ["s1"], "weeklyAvailability": ["Mon", "Fri"]
            }})),
        );
        let client = client_with(&transport);
        let feedback: Rc<RecordingFeedback> = Rc::new(RecordingFeedback::default());

        let form = EmployeeForm::load(client.clone(), feedback.clone(), "new").await.unwrap();
        assert_eq!(form.target(), &SubmitTarget::Create);
        assert!(transport.calls().is_empty());

        let form = EmployeeForm::load(client.clone(), feedback.clone(), "e1").await.unwrap();
        assert_eq!(form.target(), &SubmitTarget::Edit { id: "e1".to_string() });
        assert_eq!(form.input().weekly_availability, vec![Weekday::Mon, Weekday::Fri]);
        assert_eq!(form.input().profile_url, "");

        transport.respond("getEmployeeById", GraphqlResponse::data(json!({"getEmployeeById": null})));
        let err = EmployeeForm::load(client, feedback, "missing").await.err().unwrap();
        assert_eq!(err.code.as_deref(), Some("NOT_FOUND"));
    }

    #[tokio::test]
    async fn upload_fills_profile_url() {
        let transport = MockTransport::new();
        transport.upload_response(Ok(UploadResponse {
            files: vec![FileDescriptor {
                url: Some("https://cdn.example.com/new.png".to_string()),
            }],
        }));
        let client = client_with(&transport);
        let feedback = Rc::new(RecordingFeedback::default());
        let form = EmployeeForm::create(client, feedback.clone());

        form.upload_file(PROFILE_URL_FIELD, crate::api_client::UploadFile::new("new.png", "image/png", vec![1]))
            .await
            .unwrap();
        assert_eq!(form.input().profile_url, "https://cdn.example.com/new.png");
        assert_eq!(
            feedback.events(),
            vec![FeedbackEvent::Success("File uploaded successfully!".to_string())]
        );
        assert!(form.upload_file("email", crate::api_client::UploadFile::new("x", "text/plain", vec![])).await.is_err());
    }

    #[tokio::test]
    async fn failed_transfer_shows_retry_message_and_keeps_input() {
        let transport = MockTransport::new();
        transport.upload_response(Err(ApiError::Http {
            status: 413,
            body: "too large".to_string(),
        }));
        let client = client_with(&transport);
        let feedback = Rc::new(RecordingFeedback::default());
        let form = EmployeeForm::create(client, feedback.clone());
        fill(&form);

        let err = form
            .upload_file(PROFILE_URL_FIELD, crate::api_client::UploadFile::new("big.png", "image/png", vec![0; 8]))
            .await
            .unwrap_err();
        assert!(matches!(err, bizdesk_shared::ClientError::Upload(_)));
        assert_eq!(form.input().profile_url, "https://cdn.example.com/grace.png");
        assert_eq!(
            feedback.events(),
            vec![FeedbackEvent::Error("File upload failed. Try again.".to_string())]
        );
        assert_eq!(form.phase(), FormPhase::Idle);
    }

    #[tokio::test]
    async fn service_options_come_from_unpaginated_query() {
        let transport = MockTransport::new();
        transport.respond(
            "fetchServicesWithoutPagination",
            GraphqlResponse::data(json!({"fetchServicesWithoutPagination": {"services": [
                {"__typename": "Service", "id": "s1", "name": "Cut", "price": "20", "duration": "00:30"}
            ]}})),
        );
        let client = client_with(&transport);
        let options = load_service_options(&client).await;
        assert_eq!(options.data().unwrap().services[0].name, "Cut");
    }
}
