//! Sign-in, sign-up and password recovery against the auth mutations.

use std::rc::Rc;

use bizdesk_shared::operations::{FORGOT_PASSWORD, LOGIN_USER, REGISTER_USER, RESET_PASSWORD};
use bizdesk_shared::{AuthPayload, ClientError, ErrorDescriptor, FieldErrors, LoginType, MutationMessage, Operation, UserRole};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::client::ProtocolClient;
use crate::forms::{Feedback, Field, Schema};
use crate::query::MutationOptions;
use crate::routes::Route;

const EMAIL_MESSAGE: &str = "Enter a valid email address";
const PASSWORDS_MUST_MATCH: &str = "Passwords must match";
const SIGNED_IN: &str = "Signed In Successfully!";
const SIGNED_UP: &str = "Signed Up Successfully!";
const RESET_LINK_SENT: &str = "Password reset link sent";
const PASSWORD_RESET: &str = "Password reset successfully";

/// Why an auth flow did not complete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Rejected locally; nothing was sent.
    #[error("{0}")]
    Invalid(FieldErrors),
    #[error("{0}")]
    Failed(ErrorDescriptor),
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordInput {
    pub new_password: String,
    pub confirm_new_password: String,
}

fn email_field() -> Field {
    Field::string("email").trim().email(EMAIL_MESSAGE)
}

fn sign_in_schema() -> Schema {
    Schema::new()
        .field(email_field())
        .field(Field::string("password").password())
}

fn name_field(name: &'static str, label: &str) -> Field {
    Field::string(name)
        .trim()
        .min_len(2, format!("{label} must be at least 2 characters long"))
        .max_len(50, format!("{label} must be less than 50 characters"))
}

fn sign_up_schema() -> Schema {
    Schema::new()
        .field(name_field("firstName", "First name"))
        .field(name_field("lastName", "Last name"))
        .field(email_field())
        .field(Field::string("password").password())
}

fn forgot_password_schema() -> Schema {
    Schema::new().field(email_field())
}

fn reset_password_schema() -> Schema {
    Schema::new()
        .field(Field::string("newPassword").password())
        .field(Field::string("confirmNewPassword").password())
        .equals("confirmNewPassword", "newPassword", PASSWORDS_MUST_MATCH)
}

fn validate(schema: Schema, input: &impl Serialize) -> Result<Map<String, Value>, AuthError> {
    schema.validate(input).map_err(|errors| {
        crate::log_debug!("Auth input rejected: {}", errors);
        AuthError::Invalid(errors)
    })
}

/// Auth flows bound to one client. Successful sign-in and sign-up store the
/// returned token in the client's session store.
#[derive(Clone)]
pub struct AuthFlows {
    client: ProtocolClient,
    feedback: Rc<dyn Feedback>,
}

impl AuthFlows {
    pub fn new(client: ProtocolClient, feedback: Rc<dyn Feedback>) -> Self {
        Self { client, feedback }
    }

    async fn send<T>(&self, operation: &'static Operation, variables: Map<String, Value>) -> Result<T, AuthError>
    where
        T: DeserializeOwned + 'static,
    {
        let feedback = self.feedback.clone();
        let options = MutationOptions::new().on_error(move |error| feedback.error(error.display_text()));
        self.client
            .mutate(operation, Value::Object(variables), options)
            .await
            .map_err(AuthError::Failed)
    }

    fn accept_token(&self, payload: AuthPayload, message: &str) -> Result<(), AuthError> {
        let Some(token) = payload.token.filter(|t| !t.is_empty()) else {
            let error = ClientError::Protocol("response carried no token".to_string()).descriptor();
            self.feedback.error(error.display_text());
            return Err(AuthError::Failed(error));
        };
        self.client.session().set(token);
        self.feedback.success(message);
        self.feedback.navigate(Route::Overview);
        Ok(())
    }

    pub async fn sign_in(&self, input: &SignInInput) -> Result<(), AuthError> {
        let mut variables = validate(sign_in_schema(), input)?;
        variables.insert("loginType".to_string(), json!(LoginType::EmailAndPassword));
        variables.insert("googleToken".to_string(), json!(""));

        crate::log_info!("Signing in");
        let payload: AuthPayload = self.send(&LOGIN_USER, variables).await?;
        self.accept_token(payload, SIGNED_IN)
    }

    pub async fn sign_up(&self, input: &SignUpInput) -> Result<(), AuthError> {
        let mut variables = validate(sign_up_schema(), input)?;
        variables.insert("loginType".to_string(), json!(LoginType::EmailAndPassword));
        variables.insert("userRole".to_string(), json!(UserRole::Business));

        crate::log_info!("Registering business account");
        let payload: AuthPayload = self.send(&REGISTER_USER, variables).await?;
        self.accept_token(payload, SIGNED_UP)
    }

    /// Request a reset link. The server's message is shown on success.
    pub async fn forgot_password(&self, email: &str) -> Result<MutationMessage, AuthError> {
        let variables = validate(forgot_password_schema(), &json!({ "email": email }))?;
        let payload: MutationMessage = self.send(&FORGOT_PASSWORD, variables).await?;
        self.feedback
            .success(payload.message.as_deref().unwrap_or(RESET_LINK_SENT));
        Ok(payload)
    }

    /// Set a new password using the token from the reset link, then return
    /// to sign-in.
    pub async fn reset_password(&self, token: &str, input: &ResetPasswordInput) -> Result<MutationMessage, AuthError> {
        let values = validate(reset_password_schema(), input)?;
        let mut variables = Map::new();
        variables.insert("token".to_string(), json!(token));
        if let Some(password) = values.get("newPassword") {
            variables.insert("password".to_string(), password.clone());
        }

        let payload: MutationMessage = self.send(&RESET_PASSWORD, variables).await?;
        self.feedback
            .success(payload.message.as_deref().unwrap_or(PASSWORD_RESET));
        self.feedback.navigate(Route::SignIn);
        Ok(payload)
    }

    /// Drop the token and every cached result.
    pub fn sign_out(&self) {
        crate::log_info!("Signing out");
        self.client.session().clear();
        self.client.reset_store();
        self.feedback.navigate(Route::SignIn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{client_with, FeedbackEvent, MockTransport, RecordingFeedback};
    use bizdesk_shared::GraphqlResponse;

    fn flows(transport: &MockTransport) -> (AuthFlows, Rc<RecordingFeedback>) {
        let feedback = Rc::new(RecordingFeedback::default());
        (AuthFlows::new(client_with(transport), feedback.clone()), feedback)
    }

    fn credentials(password: &str) -> SignInInput {
        SignInInput {
            email: " owner@example.com ".to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn sign_in_stores_token_and_navigates() {
        let transport = MockTransport::new();
        transport.respond("loginUser", GraphqlResponse::data(json!({"loginUser": {"token": "tok-1"}})));
        let (auth, feedback) = flows(&transport);

        auth.sign_in(&credentials("Abcdef1!")).await.unwrap();

        assert_eq!(auth.client.session().read().unwrap().as_str(), "tok-1");
        let call = &transport.calls()[0];
        assert_eq!(
            call.variables,
            json!({
                "email": "owner@example.com", "password": "Abcdef1!",
                "loginType": "EmailAndPassword", "googleToken": ""
            })
        );
        assert_eq!(
            feedback.events(),
            vec![
                FeedbackEvent::Success("Signed In Successfully!".to_string()),
                FeedbackEvent::Navigate(Route::Overview),
            ]
        );
    }

    #[tokio::test]
    async fn weak_password_is_rejected_locally() {
        let transport = MockTransport::new();
        let (auth, feedback) = flows(&transport);

        let Err(AuthError::Invalid(errors)) = auth.sign_in(&credentials("abc")).await else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.field("password").len(), 4);
        assert!(transport.calls().is_empty());
        assert!(feedback.events().is_empty());
    }

    #[tokio::test]
    async fn rejected_login_keeps_session_empty() {
        let transport = MockTransport::new();
        transport.respond("loginUser", GraphqlResponse::error("Invalid credentials"));
        let (auth, feedback) = flows(&transport);

        let err = auth.sign_in(&credentials("Abcdef1!")).await.unwrap_err();
        assert!(matches!(err, AuthError::Failed(ref e) if e.message == "Invalid credentials"));
        assert!(!auth.client.session().is_authenticated());
        assert_eq!(feedback.events(), vec![FeedbackEvent::Error("Invalid credentials".to_string())]);
    }

    #[tokio::test]
    async fn missing_token_is_a_failure() {
        let transport = MockTransport::new();
        transport.respond("loginUser", GraphqlResponse::data(json!({"loginUser": {"token": null}})));
        let (auth, _) = flows(&transport);

        assert!(matches!(auth.sign_in(&credentials("Abcdef1!")).await, Err(AuthError::Failed(_))));
        assert!(!auth.client.session().is_authenticated());
    }

    #[tokio::test]
    async fn sign_up_registers_a_business() {
        let transport = MockTransport::new();
        transport.respond("registerUser", GraphqlResponse::data(json!({"registerUser": {"token": "tok-2"}})));
        let (auth, feedback) = flows(&transport);

        let input = SignUpInput {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            password: "Abcdef1!".to_string(),
        };
        auth.sign_up(&input).await.unwrap();

        let call = &transport.calls()[0];
        assert_eq!(call.variables["userRole"], "Business");
        assert_eq!(call.variables["loginType"], "EmailAndPassword");
        assert_eq!(call.variables["firstName"], "Ada");
        assert!(auth.client.session().is_authenticated());
        assert_eq!(feedback.events()[0], FeedbackEvent::Success("Signed Up Successfully!".to_string()));
    }

    #[tokio::test]
    async fn sign_up_name_bounds() {
        let transport = MockTransport::new();
        let (auth, _) = flows(&transport);
        let input = SignUpInput {
            first_name: "A".to_string(),
            last_name: "L".repeat(51),
            email: "nope".to_string(),
            password: "Abcdef1!".to_string(),
        };

        let Err(AuthError::Invalid(errors)) = auth.sign_up(&input).await else {
            panic!("expected validation failure");
        };
        assert_eq!(errors.field("firstName"), ["First name must be at least 2 characters long"]);
        assert_eq!(errors.field("lastName"), ["Last name must be less than 50 characters"]);
        assert_eq!(errors.field("email"), ["Enter a valid email address"]);
    }

    #[tokio::test]
    async fn forgot_password_shows_server_message() {
        let transport = MockTransport::new();
        transport.respond(
            "forgotPassword",
            GraphqlResponse::data(json!({"forgotPassword": {"message": "Check your inbox"}})),
        );
        let (auth, feedback) = flows(&transport);

        auth.forgot_password("owner@example.com").await.unwrap();
        assert_eq!(feedback.events(), vec![FeedbackEvent::Success("Check your inbox".to_string())]);
    }

    #[tokio::test]
    async fn reset_password_requires_matching_confirmation() {
        let transport = MockTransport::new();
        let (auth, _) = flows(&transport);
        let input = ResetPasswordInput {
            new_password: "Abcdef1!".to_string(),
            confirm_new_password: "Abcdef1?".to_string(),
        };

        let Err(AuthError::Invalid(errors)) = auth.reset_password("reset-token", &input).await else {
            panic!("expected mismatch");
        };
        assert_eq!(errors.field("confirmNewPassword"), ["Passwords must match"]);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn reset_password_sends_token_and_returns_to_sign_in() {
        let transport = MockTransport::new();
        transport.respond(
            "resetPassword",
            GraphqlResponse::data(json!({"resetPassword": {"message": "Password updated"}})),
        );
        let (auth, feedback) = flows(&transport);
        let input = ResetPasswordInput {
            new_password: "Abcdef1!".to_string(),
            confirm_new_password: "Abcdef1!".to_string(),
        };

        auth.reset_password("reset-token", &input).await.unwrap();
        assert_eq!(
            transport.calls()[0].variables,
            json!({"token": "reset-token", "password": "Abcdef1!"})
        );
        assert_eq!(
            feedback.events(),
            vec![
                FeedbackEvent::Success("Password updated".to_string()),
                FeedbackEvent::Navigate(Route::SignIn),
            ]
        );
    }

    #[tokio::test]
    async fn sign_out_clears_session_and_cache() {
        let transport = MockTransport::new();
        transport.respond("loginUser", GraphqlResponse::data(json!({"loginUser": {"token": "tok-1"}})));
        let (auth, _) = flows(&transport);
        auth.sign_in(&credentials("Abcdef1!")).await.unwrap();
        auth.client
            .cache()
            .write_entities(&json!({"__typename": "Service", "id": "s1", "name": "Cut"}));
        assert!(!auth.client.cache().entities_snapshot().is_empty());

        auth.sign_out();
        assert!(!auth.client.session().is_authenticated());
        assert!(auth.client.cache().entities_snapshot().is_empty());
    }
}
