//! Navigation targets of the business dashboard.
//!
//! The view layer owns the router; this crate only names where flows send the
//! user next.

use std::fmt;

use crate::auth_session::SessionStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    SignIn,
    SignUp,
    ForgotPassword,
    ResetPassword { token: String },
    Overview,
    Employees,
    /// `id` is `"new"` for the create form.
    Employee { id: String },
    Services,
    Service { id: String },
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::SignIn => "/business/sign-in".to_string(),
            Route::SignUp => "/business/sign-up".to_string(),
            Route::ForgotPassword => "/business/forgot-password".to_string(),
            Route::ResetPassword { token } => format!("/business/forgot-password/{token}"),
            Route::Overview => "/business/dashboard/overview".to_string(),
            Route::Employees => "/business/dashboard/employee".to_string(),
            Route::Employee { id } => format!("/business/dashboard/employee/{id}"),
            Route::Services => "/business/dashboard/services".to_string(),
            Route::Service { id } => format!("/business/dashboard/services/{id}"),
        }
    }

    /// Where the dashboard root sends the user.
    pub fn landing(session: &SessionStore) -> Route {
        if session.is_authenticated() {
            Route::Overview
        } else {
            Route::SignIn
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
