//! Account route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::api::{ProfileUpdate, User};
use crate::error::Result;
use crate::filters;
use crate::middleware::{CspNonce, PageContext, RequireAuth, SessionExpired};
use crate::models::{Flash, push_flash};
use crate::routes::orders::OrderSummaryView;
use crate::services::AccountSession;
use crate::state::AppState;

/// Orders shown on the overview.
const RECENT_ORDERS: usize = 3;

/// User display data for templates.
#[derive(Clone)]
pub struct UserView {
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub bio: String,
    pub location: String,
    pub is_verified: bool,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone().unwrap_or_default(),
            bio: user.bio.clone().unwrap_or_default(),
            location: user.location.clone().unwrap_or_default(),
            is_verified: user.is_verified,
        }
    }
}

/// Profile form data.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub location: String,
}

impl From<ProfileForm> for ProfileUpdate {
    fn from(form: ProfileForm) -> Self {
        Self {
            name: form.name,
            avatar: Some(form.avatar),
            bio: Some(form.bio),
            location: Some(form.location),
        }
    }
}

/// Account overview page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountIndexTemplate {
    pub page: PageContext,
    pub user: UserView,
    pub recent_orders: Vec<OrderSummaryView>,
}

/// Display account overview page.
///
/// The profile is re-fetched so edits made elsewhere show up. A token the
/// backend no longer accepts signs the visitor out.
///
/// # Errors
///
/// Returns an error if the session store fails.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    RequireAuth(_, token): RequireAuth,
) -> Result<Response> {
    let account = AccountSession::new(state.backend(), &session);

    let Some(user) = account.load_current_user().await? else {
        return Ok(SessionExpired.into_response());
    };

    let recent_orders = match state.backend().list_orders(token.expose()).await {
        Ok(orders) => orders
            .iter()
            .take(RECENT_ORDERS)
            .map(OrderSummaryView::from)
            .collect(),
        Err(e) if e.is_unauthorized() => return Ok(SessionExpired.into_response()),
        Err(e) => {
            tracing::warn!("Failed to load recent orders: {e}");
            Vec::new()
        }
    };

    Ok(AccountIndexTemplate {
        page: PageContext::load(&state, Some(&session), &nonce).await,
        user: UserView::from(&user),
        recent_orders,
    }
    .into_response())
}

/// Save profile edits.
#[instrument(skip_all)]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    _auth: RequireAuth,
    Form(form): Form<ProfileForm>,
) -> Response {
    let account = AccountSession::new(state.backend(), &session);

    match account.update_profile(ProfileUpdate::from(form)).await {
        Ok(_) => push_flash(&session, Flash::success("Profile updated")).await,
        Err(e) if e.is_unauthorized() => return SessionExpired.into_response(),
        Err(e) => {
            if e.is_server_side() {
                tracing::error!("Profile update failed: {e}");
            }
            push_flash(&session, Flash::error(e.user_message("Could not update your profile")))
                .await;
        }
    }

    Redirect::to("/account").into_response()
}
