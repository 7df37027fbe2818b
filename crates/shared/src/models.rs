//! Shared data models for the bizdesk dashboard.

use serde::{Deserialize, Serialize};

// --- Common Definitions ---

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

/// Day of the week as the service encodes it (`"Sun"` .. `"Sat"`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Weekday {
    Sun,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Sun,
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
    ];

    /// Full label shown next to the availability checkbox.
    pub fn label(&self) -> &'static str {
        match self {
            Weekday::Sun => "Sunday",
            Weekday::Mon => "Monday",
            Weekday::Tue => "Tuesday",
            Weekday::Wed => "Wednesday",
            Weekday::Thu => "Thursday",
            Weekday::Fri => "Friday",
            Weekday::Sat => "Saturday",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Weekday::Sun => "Sun",
            Weekday::Mon => "Mon",
            Weekday::Tue => "Tue",
            Weekday::Wed => "Wed",
            Weekday::Thu => "Thu",
            Weekday::Fri => "Fri",
            Weekday::Sat => "Sat",
        }
    }
}

/// Toggle a day in an availability set, keeping the set free of duplicates.
pub fn toggle_weekday(days: &mut Vec<Weekday>, day: Weekday, checked: bool) {
    if checked {
        if !days.contains(&day) {
            days.push(day);
        }
    } else {
        days.retain(|d| *d != day);
    }
}

/// Pagination and search parameters for listing queries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PageParams {
    pub page: u32,
    pub limit: u32,
    pub search: String,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            search: String::new(),
        }
    }
}

impl PageParams {
    /// Build parameters, falling back to the defaults for absent or
    /// out-of-range values (page is 1-indexed, limit must be positive).
    pub fn new(page: Option<u32>, limit: Option<u32>, search: Option<&str>) -> Self {
        Self {
            page: page.filter(|p| *p >= 1).unwrap_or(DEFAULT_PAGE),
            limit: limit.filter(|l| *l > 0).unwrap_or(DEFAULT_LIMIT),
            search: search.unwrap_or_default().to_string(),
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    /// Read `page`, `q` and `limit` from a URL query string (with or without
    /// the leading `?`). Missing or unparsable values take the defaults.
    pub fn from_query(query: &str) -> Self {
        let mut page = None;
        let mut limit = None;
        let mut search = None;
        for pair in query.trim_start_matches('?').split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = value.replace('+', " ");
            let value = urlencoding::decode(&value)
                .map(|v| v.into_owned())
                .unwrap_or(value);
            match key {
                "page" => page = value.trim().parse().ok(),
                "limit" => limit = value.trim().parse().ok(),
                "q" => search = Some(value),
                _ => {}
            }
        }
        Self::new(page, limit, search.as_deref())
    }

    /// Variables object sent with listing queries.
    pub fn to_variables(&self) -> serde_json::Value {
        serde_json::json!({
            "page": self.page,
            "limit": self.limit,
            "search": self.search,
        })
    }
}

/// A page of results together with the unclamped total.
pub trait ResultPage {
    type Item;

    fn items(&self) -> &[Self::Item];
    fn total_count(&self) -> u64;
}

// --- Employees ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub weekly_availability: Vec<Weekday>,
}

/// Editable employee fields, without the server-issued id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeInput {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_url: String,
    pub services: Vec<String>,
    pub weekly_availability: Vec<Weekday>,
}

impl From<&Employee> for EmployeeInput {
    fn from(employee: &Employee) -> Self {
        Self {
            email: employee.email.clone(),
            first_name: employee.first_name.clone(),
            last_name: employee.last_name.clone(),
            profile_url: employee.profile_url.clone().unwrap_or_default(),
            services: employee.services.clone(),
            weekly_availability: employee.weekly_availability.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmployeePage {
    pub employees: Vec<Employee>,
    pub total_employees: u64,
}

impl ResultPage for EmployeePage {
    type Item = Employee;

    fn items(&self) -> &[Employee] {
        &self.employees
    }

    fn total_count(&self) -> u64 {
        self.total_employees
    }
}

// --- Services ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub price: String,
    /// `HH:MM`
    pub duration: String,
}

impl Service {
    /// Split the stored duration into its hour and minute parts, defaulting to `"00"`.
    pub fn duration_parts(&self) -> (String, String) {
        split_duration(&self.duration)
    }
}

pub fn split_duration(duration: &str) -> (String, String) {
    let mut parts = duration.split(':');
    let hours = parts
        .next()
        .filter(|h| !h.is_empty())
        .unwrap_or("00")
        .to_string();
    let minutes = parts
        .next()
        .filter(|m| !m.is_empty())
        .unwrap_or("00")
        .to_string();
    (hours, minutes)
}

/// Compose the wire duration from the hour/minute pickers.
pub fn compose_duration(hours: &str, minutes: &str) -> String {
    format!("{:0>2}:{}", hours.trim(), minutes.trim())
}

/// Editable service fields as collected by the form (duration split in two).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceInput {
    pub name: String,
    pub price: String,
    pub hours: String,
    pub minutes: String,
}

impl Default for ServiceInput {
    fn default() -> Self {
        Self {
            name: String::new(),
            price: String::new(),
            hours: "00".to_string(),
            minutes: "00".to_string(),
        }
    }
}

impl From<&Service> for ServiceInput {
    fn from(service: &Service) -> Self {
        let (hours, minutes) = service.duration_parts();
        Self {
            name: service.name.clone(),
            price: service.price.clone(),
            hours,
            minutes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServicePage {
    pub services: Vec<Service>,
    pub total_services: u64,
}

impl ResultPage for ServicePage {
    type Item = Service;

    fn items(&self) -> &[Service] {
        &self.services
    }

    fn total_count(&self) -> u64 {
        self.total_services
    }
}

/// Unpaginated service list used to populate pickers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceOptions {
    pub services: Vec<Service>,
}

// --- Mutation payloads ---

/// Acknowledgement returned by create/edit/delete mutations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MutationMessage {
    #[serde(default)]
    pub message: Option<String>,
}

// --- Auth ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthPayload {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LoginType {
    EmailAndPassword,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UserRole {
    Business,
}

// --- Uploads ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileDescriptor {
    #[serde(default)]
    pub url: Option<String>,
}

/// Body returned by the upload endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UploadResponse {
    #[serde(default)]
    pub files: Vec<FileDescriptor>,
}

impl UploadResponse {
    /// URL of the first uploaded file, if the endpoint returned one.
    pub fn first_url(&self) -> Option<&str> {
        self.files
            .first()
            .and_then(|f| f.url.as_deref())
            .filter(|u| !u.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_params_from_query_string() {
        let params = PageParams::from_query("?page=2&q=abc&limit=25");
        assert_eq!(params, PageParams::new(Some(2), Some(25), Some("abc")));

        let params = PageParams::from_query("q=hair+cut%21&page=zero");
        assert_eq!(params.page, DEFAULT_PAGE);
        assert_eq!(params.limit, DEFAULT_LIMIT);
        assert_eq!(params.search, "hair cut!");

        assert_eq!(PageParams::from_query(""), PageParams::default());
        assert_eq!(PageParams::from_query("page=0&limit=0"), PageParams::default());
    }

    #[test]
    fn page_params_fall_back_to_defaults() {
        let params = PageParams::new(None, None, None);
        assert_eq!(params, PageParams::default());

        let params = PageParams::new(Some(0), Some(0), Some("abc"));
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 10);
        assert_eq!(params.search, "abc");
    }

    #[test]
    fn weekday_serializes_as_short_code() {
        let json = serde_json::to_string(&vec![Weekday::Mon, Weekday::Sat]).unwrap();
        assert_eq!(json, r#"["Mon","Sat"]"#);
        for day in Weekday::ALL {
            assert_eq!(
                serde_json::to_value(day).unwrap(),
                serde_json::Value::String(day.code().to_string())
            );
        }
    }

    #[test]
    fn toggle_weekday_keeps_set_semantics() {
        let mut days = vec![Weekday::Mon];
        toggle_weekday(&mut days, Weekday::Mon, true);
        toggle_weekday(&mut days, Weekday::Fri, true);
        assert_eq!(days, vec![Weekday::Mon, Weekday::Fri]);
        toggle_weekday(&mut days, Weekday::Mon, false);
        assert_eq!(days, vec![Weekday::Fri]);
    }

    #[test]
    fn duration_split_and_compose() {
        assert_eq!(split_duration("01:30"), ("01".to_string(), "30".to_string()));
        assert_eq!(split_duration(""), ("00".to_string(), "00".to_string()));
        assert_eq!(compose_duration("1", "45"), "01:45");
        assert_eq!(compose_duration("11", "00"), "11:00");
    }

    #[test]
    fn employee_decodes_camel_case_and_ignores_typename() {
        let employee: Employee = serde_json::from_value(serde_json::json!({
            "__typename": "Employee",
            "id": "e1",
            "email": "a@b.co",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "profileUrl": null,
            "services": ["s1"],
            "weeklyAvailability": ["Mon", "Tue"]
        }))
        .unwrap();
        assert_eq!(employee.first_name, "Ada");
        assert_eq!(employee.weekly_availability, vec![Weekday::Mon, Weekday::Tue]);
        assert_eq!(EmployeeInput::from(&employee).profile_url, "");
    }

    #[test]
    fn upload_response_first_url() {
        let resp: UploadResponse =
            serde_json::from_str(r#"{"files":[{"url":"https://cdn/x.png"},{"url":"https://cdn/y.png"}]}"#)
                .unwrap();
        assert_eq!(resp.first_url(), Some("https://cdn/x.png"));
        assert_eq!(UploadResponse::default().first_url(), None);
    }
}
