//! Content page route handlers.
//!
//! Serves the markdown pages loaded at startup (policies, about).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::PageContext;
use crate::state::AppState;

/// Content page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/content.html")]
pub struct ContentPageTemplate {
    pub page: PageContext,
    pub title: String,
    pub description: String,
    pub updated_at: Option<String>,
    pub content_html: String,
}

/// Display a content page by slug.
///
/// # Errors
///
/// Returns 404 if the page doesn't exist.
#[instrument(skip(state, page))]
pub async fn show(
    State(state): State<AppState>,
    page: PageContext,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let content = state
        .content()
        .get_page(&slug)
        .ok_or_else(|| AppError::NotFound(format!("Page {slug}")))?;

    Ok(ContentPageTemplate {
        page,
        title: content.meta.title.clone(),
        description: content.meta.description.clone().unwrap_or_default(),
        updated_at: content
            .meta
            .updated_at
            .map(|date| date.format("%B %-d, %Y").to_string()),
        content_html: content.content_html.clone(),
    })
}

/// Create the pages routes router.
pub fn router() -> Router<AppState> {
    Router::new().route("/{slug}", get(show))
}
