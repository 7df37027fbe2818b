//! Catalogue of the named operations the dashboard issues.
//!
//! Every entity selection asks for `__typename` and `id` so responses can be
//! normalized by the client cache.

use crate::protocol::{Operation, OperationKind};

// --- Employees ---

pub static GET_ALL_EMPLOYEES: Operation = Operation {
    name: "getAllEmployees",
    kind: OperationKind::Query,
    root_field: "getAllEmployees",
    document: r#"query getAllEmployees($page: Int, $limit: Int, $search: String) {
  getAllEmployees(page: $page, limit: $limit, search: $search) {
    total_employees
    employees {
      __typename
      id
      email
      firstName
      lastName
      profileUrl
      services
      weeklyAvailability
    }
  }
}"#,
};

pub static GET_EMPLOYEE_BY_ID: Operation = Operation {
    name: "getEmployeeById",
    kind: OperationKind::Query,
    root_field: "getEmployeeById",
    document: r#"query getEmployeeById($id: ID!) {
  getEmployeeById(id: $id) {
    __typename
    id
    email
    firstName
    lastName
    profileUrl
    services
    weeklyAvailability
  }
}"#,
};

pub static ADD_EMPLOYEE: Operation = Operation {
    name: "addEmployee",
    kind: OperationKind::Mutation,
    root_field: "addEmployee",
    document: r#"mutation addEmployee($email: String!, $firstName: String!, $lastName: String!, $profileUrl: String, $services: [ID!], $weeklyAvailability: [String!]) {
  addEmployee(email: $email, firstName: $firstName, lastName: $lastName, profileUrl: $profileUrl, services: $services, weeklyAvailability: $weeklyAvailability) {
    message
  }
}"#,
};

pub static EDIT_EMPLOYEE: Operation = Operation {
    name: "editEmployee",
    kind: OperationKind::Mutation,
    root_field: "editEmployee",
    document: r#"mutation editEmployee($id: ID!, $email: String!, $firstName: String!, $lastName: String!, $profileUrl: String, $services: [ID!], $weeklyAvailability: [String!]) {
  editEmployee(id: $id, email: $email, firstName: $firstName, lastName: $lastName, profileUrl: $profileUrl, services: $services, weeklyAvailability: $weeklyAvailability) {
    message
  }
}"#,
};

pub static DELETE_EMPLOYEE: Operation = Operation {
    name: "deleteEmployee",
    kind: OperationKind::Mutation,
    root_field: "deleteEmployee",
    document: r#"mutation deleteEmployee($id: ID!) {
  deleteEmployee(id: $id) {
    message
  }
}"#,
};

pub static EMPLOYEE_UPDATED: Operation = Operation {
    name: "employeeUpdated",
    kind: OperationKind::Subscription,
    root_field: "employeeUpdated",
    document: r#"subscription employeeUpdated {
  employeeUpdated {
    __typename
    id
    email
    firstName
    lastName
    profileUrl
    services
    weeklyAvailability
  }
}"#,
};

// --- Services ---

pub static GET_ALL_SERVICES: Operation = Operation {
    name: "getAllServices",
    kind: OperationKind::Query,
    root_field: "getAllServices",
    document: r#"query getAllServices($page: Int, $limit: Int, $search: String) {
  getAllServices(page: $page, limit: $limit, search: $search) {
    total_services
    services {
      __typename
      id
      name
      price
      duration
    }
  }
}"#,
};

pub static FETCH_SERVICES_WITHOUT_PAGINATION: Operation = Operation {
    name: "fetchServicesWithoutPagination",
    kind: OperationKind::Query,
    root_field: "fetchServicesWithoutPagination",
    document: r#"query fetchServicesWithoutPagination {
  fetchServicesWithoutPagination {
    services {
      __typename
      id
      name
      price
      duration
    }
  }
}"#,
};

pub static GET_SERVICE_BY_ID: Operation = Operation {
    name: "getServiceById",
    kind: OperationKind::Query,
    root_field: "getServiceById",
    document: r#"query getServiceById($id: ID!) {
  getServiceById(id: $id) {
    __typename
    id
    name
    price
    duration
  }
}"#,
};

pub static ADD_SERVICE: Operation = Operation {
    name: "AddService",
    kind: OperationKind::Mutation,
    root_field: "AddService",
    document: r#"mutation AddService($name: String!, $price: String!, $duration: String!) {
  AddService(name: $name, price: $price, duration: $duration) {
    message
  }
}"#,
};

pub static EDIT_SERVICE: Operation = Operation {
    name: "EditService",
    kind: OperationKind::Mutation,
    root_field: "EditService",
    document: r#"mutation EditService($id: ID!, $name: String!, $price: String!, $duration: String!) {
  EditService(id: $id, name: $name, price: $price, duration: $duration) {
    message
  }
}"#,
};

pub static DELETE_SERVICE: Operation = Operation {
    name: "deleteService",
    kind: OperationKind::Mutation,
    root_field: "deleteService",
    document: r#"mutation deleteService($id: ID!) {
  deleteService(id: $id) {
    message
  }
}"#,
};

// --- Auth ---

pub static LOGIN_USER: Operation = Operation {
    name: "loginUser",
    kind: OperationKind::Mutation,
    root_field: "loginUser",
    document: r#"mutation loginUser($email: String!, $password: String!, $loginType: String!, $googleToken: String) {
  loginUser(email: $email, password: $password, loginType: $loginType, googleToken: $googleToken) {
    token
  }
}"#,
};

pub static REGISTER_USER: Operation = Operation {
    name: "registerUser",
    kind: OperationKind::Mutation,
    root_field: "registerUser",
    document: r#"mutation registerUser($firstName: String!, $lastName: String!, $email: String!, $password: String!, $loginType: String!, $userRole: String!) {
  registerUser(firstName: $firstName, lastName: $lastName, email: $email, password: $password, loginType: $loginType, userRole: $userRole) {
    token
  }
}"#,
};

pub static FORGOT_PASSWORD: Operation = Operation {
    name: "forgotPassword",
    kind: OperationKind::Mutation,
    root_field: "forgotPassword",
    document: r#"mutation forgotPassword($email: String!) {
  forgotPassword(email: $email) {
    message
  }
}"#,
};

pub static RESET_PASSWORD: Operation = Operation {
    name: "resetPassword",
    kind: OperationKind::Mutation,
    root_field: "resetPassword",
    document: r#"mutation resetPassword($token: String!, $password: String!) {
  resetPassword(token: $token, password: $password) {
    message
  }
}"#,
};
