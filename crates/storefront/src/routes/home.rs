//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::filters;
use crate::middleware::PageContext;
use crate::routes::products::ProductView;
use crate::services::catalog;
use crate::state::AppState;

/// Products per home page section.
const SECTION_LIMIT: usize = 4;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub new_arrivals: Vec<ProductView>,
    pub best_sellers: Vec<ProductView>,
    pub categories: Vec<String>,
    /// Set when the catalog could not be loaded; the page still renders.
    pub catalog_unavailable: bool,
}

/// Display the home page.
#[instrument(skip(state, page))]
pub async fn home(State(state): State<AppState>, page: PageContext) -> impl IntoResponse {
    match state.backend().list_products().await {
        Ok(products) => HomeTemplate {
            page,
            new_arrivals: catalog::new_arrivals(&products, SECTION_LIMIT)
                .iter()
                .map(ProductView::from)
                .collect(),
            best_sellers: catalog::best_sellers(&products, SECTION_LIMIT)
                .iter()
                .map(ProductView::from)
                .collect(),
            categories: catalog::categories(&products),
            catalog_unavailable: false,
        },
        Err(e) => {
            tracing::error!("Failed to fetch catalog for home page: {e}");
            HomeTemplate {
                page,
                new_arrivals: Vec::new(),
                best_sellers: Vec::new(),
                categories: Vec::new(),
                catalog_unavailable: true,
            }
        }
    }
}
