use bizdesk_shared::operations::{ADD_SERVICE, EDIT_SERVICE, GET_ALL_SERVICES, GET_SERVICE_BY_ID};
use bizdesk_shared::{compose_duration, Operation, PageParams, Service, ServiceInput};
use serde_json::{Map, Value};

use super::{Field, FormEntity, Schema};
use crate::query::RefetchTarget;
use crate::routes::Route;

/// Minute choices offered by the duration picker.
pub const MINUTE_OPTIONS: [&str; 4] = ["00", "15", "30", "45"];

pub type ServiceForm = super::EntityForm<Service>;

/// Hour choices offered by the duration picker (`"00"`..`"11"`).
pub fn hour_options() -> Vec<String> {
    (0..12).map(|h| format!("{h:02}")).collect()
}

fn as_minutes(values: &Map<String, Value>, field: &str) -> i64 {
    values
        .get(field)
        .and_then(Value::as_str)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0)
}

impl FormEntity for Service {
    type Input = ServiceInput;

    const CREATE_TITLE: &'static str = "Create New Service";
    const EDIT_TITLE: &'static str = "Edit Service";
    const SAVED_MESSAGE: &'static str = "Service saved";

    fn id(&self) -> &str {
        &self.id
    }

    fn create_operation() -> &'static Operation {
        &ADD_SERVICE
    }

    fn edit_operation() -> &'static Operation {
        &EDIT_SERVICE
    }

    fn get_operation() -> &'static Operation {
        &GET_SERVICE_BY_ID
    }

    fn schema() -> Schema {
        Schema::new()
            .field(Field::string("name").min_len(2, "Service name must be at least 2 characters."))
            .field(Field::string("price").trim().min_len(1, "Price is requred."))
            .field(Field::string("hours").trim())
            .field(Field::string("minutes").trim())
            .check("minutes", "Duration must be at least 15 minutes", |values| {
                as_minutes(values, "hours") >= 1 || as_minutes(values, "minutes") >= 15
            })
    }

    /// `hours` and `minutes` travel as one `HH:MM` duration.
    fn variables(mut values: Map<String, Value>) -> Map<String, Value> {
        let hours = values.remove("hours");
        let minutes = values.remove("minutes");
        let duration = compose_duration(
            hours.as_ref().and_then(Value::as_str).unwrap_or("00"),
            minutes.as_ref().and_then(Value::as_str).unwrap_or("00"),
        );
        values.insert("duration".to_string(), Value::String(duration));
        values
    }

    fn listing_route() -> Route {
        Route::Services
    }

    fn refetch_queries() -> Vec<RefetchTarget> {
        vec![RefetchTarget::Exact {
            operation: &GET_ALL_SERVICES,
            variables: PageParams::default().to_variables(),
        }]
    }
}
