//! Contact form route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use herbal_core::Email;

use crate::api::ContactMessage;
use crate::filters;
use crate::middleware::{CspNonce, PageContext};
use crate::models::{Flash, push_flash};
use crate::services::FieldErrors;
use crate::state::AppState;

/// Shortest message accepted.
const MIN_MESSAGE_LENGTH: usize = 10;

/// Longest message accepted.
const MAX_MESSAGE_LENGTH: usize = 5000;

/// Contact form data.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

/// Contact page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/contact.html")]
pub struct ContactTemplate {
    pub page: PageContext,
    pub form: ContactForm,
    pub errors: FieldErrors,
    pub error: Option<String>,
}

/// Check the form and build the backend message.
fn validate_contact(form: &ContactForm) -> Result<ContactMessage, FieldErrors> {
    let mut errors = FieldErrors::default();

    let name = form.name.trim();
    if name.is_empty() {
        errors.insert("name", "Please enter your name");
    }

    let email = Email::parse(&form.email);
    if email.is_err() {
        errors.insert("email", "Please enter a valid email address");
    }

    let subject = form.subject.trim();
    if subject.is_empty() {
        errors.insert("subject", "Please enter a subject");
    }

    let message = form.message.trim();
    let length = message.chars().count();
    if length < MIN_MESSAGE_LENGTH {
        errors.insert(
            "message",
            format!("Message must be at least {MIN_MESSAGE_LENGTH} characters"),
        );
    } else if length > MAX_MESSAGE_LENGTH {
        errors.insert(
            "message",
            format!("Message must be at most {MAX_MESSAGE_LENGTH} characters"),
        );
    }

    match email {
        Ok(email) if errors.is_empty() => Ok(ContactMessage {
            name: name.to_string(),
            email: email.into_inner(),
            subject: subject.to_string(),
            message: message.to_string(),
        }),
        _ => Err(errors),
    }
}

/// Display the contact page, prefilled for signed-in customers.
pub async fn show(page: PageContext) -> impl IntoResponse {
    let form = page
        .user
        .as_ref()
        .map(|user| ContactForm {
            name: user.name.clone(),
            email: user.email.clone(),
            ..ContactForm::default()
        })
        .unwrap_or_default();

    ContactTemplate {
        page,
        form,
        errors: FieldErrors::default(),
        error: None,
    }
}

/// Handle contact form submission.
#[instrument(skip(state, session, nonce), fields(email = %form.email))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Form(form): Form<ContactForm>,
) -> Response {
    let (errors, error) = match validate_contact(&form) {
        Err(errors) => (errors, None),
        Ok(message) => match state.backend().submit_contact(&message).await {
            Ok(response) => {
                tracing::info!("Contact message submitted");
                let thanks = response.message.unwrap_or_else(|| {
                    "Thanks for reaching out! We'll get back to you within 1-2 business days."
                        .to_string()
                });
                push_flash(&session, Flash::success(thanks)).await;
                return Redirect::to("/contact").into_response();
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to submit contact message");
                (
                    FieldErrors::default(),
                    Some(e.user_message("Something went wrong. Please try again.")),
                )
            }
        },
    };

    (
        StatusCode::UNPROCESSABLE_ENTITY,
        ContactTemplate {
            page: PageContext::load(&state, Some(&session), &nonce).await,
            form,
            errors,
            error,
        },
    )
        .into_response()
}
