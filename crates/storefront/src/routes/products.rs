//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use tracing::instrument;

use herbal_core::{ProductId, Rating};

use crate::api::Product;
use crate::error::Result;
use crate::filters;
use crate::middleware::PageContext;
use crate::services::catalog::{self, CatalogQuery, ListingParams, ProductFilter, SortOrder};
use crate::state::AppState;

/// Star widget data: one CSS modifier per star slot.
#[derive(Clone)]
pub struct RatingView {
    pub stars: Vec<&'static str>,
    pub display: String,
}

impl From<Rating> for RatingView {
    fn from(rating: Rating) -> Self {
        let full = (0..rating.full_stars()).map(|_| "full");
        let half = rating.has_half_star().then_some("half");
        let empty = (0..rating.empty_stars()).map(|_| "empty");

        Self {
            stars: full.chain(half).chain(empty).collect(),
            display: rating.display(),
        }
    }
}

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub original_price: Option<String>,
    pub discount_percent: Option<u32>,
    pub image: Option<String>,
    pub images: Vec<String>,
    pub category: Option<String>,
    pub rating: RatingView,
    pub review_count: u32,
    pub is_new: bool,
    pub is_best_seller: bool,
    pub in_stock: bool,
    /// "Only 3 left" when stock is low.
    pub stock_note: Option<String>,
}

/// Stock at or below this shows a low-stock note.
const LOW_STOCK: u32 = 5;

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price().display(),
            original_price: product.original_price().map(|p| p.display()),
            discount_percent: product.discount_percent(),
            image: product.primary_image().map(String::from),
            images: product.images.clone(),
            category: product.category.clone(),
            rating: RatingView::from(product.rating),
            review_count: product.review_count,
            is_new: product.is_new,
            is_best_seller: product.is_best_seller,
            in_stock: product.in_stock(),
            stock_note: product
                .stock
                .filter(|stock| (1..=LOW_STOCK).contains(stock))
                .map(|stock| format!("Only {stock} left")),
        }
    }
}

/// A `<select>` or tab option.
#[derive(Clone)]
pub struct OptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: PageContext,
    pub products: Vec<ProductView>,
    pub filters: Vec<OptionView>,
    pub sorts: Vec<OptionView>,
    pub category: String,
    pub search: String,
    pub sort: String,
    pub total: usize,
    pub current_page: usize,
    pub total_pages: usize,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: PageContext,
    pub product: ProductView,
    pub related_products: Vec<ProductView>,
}

fn filter_options(products: &[Product], selected: &ProductFilter) -> Vec<OptionView> {
    let fixed = [
        (ProductFilter::All, "All"),
        (ProductFilter::New, "New Arrivals"),
        (ProductFilter::BestSeller, "Best Sellers"),
    ]
    .into_iter()
    .map(|(filter, label)| OptionView {
        value: filter.as_query().to_string(),
        label: label.to_string(),
        selected: &filter == selected,
    });

    let categories = catalog::categories(products).into_iter().map(|name| {
        let filter = ProductFilter::Category(name.clone());
        OptionView {
            value: name.clone(),
            label: name,
            selected: &filter == selected,
        }
    });

    fixed.chain(categories).collect()
}

fn sort_options(selected: SortOrder) -> Vec<OptionView> {
    SortOrder::ALL
        .iter()
        .map(|sort| OptionView {
            value: sort.as_query().to_string(),
            label: sort.label().to_string(),
            selected: *sort == selected,
        })
        .collect()
}

/// Listing URL for another page of the same query.
fn page_url(query: &CatalogQuery, page: usize) -> String {
    let mut url = format!(
        "/products?category={}&sort={}",
        urlencoding::encode(query.filter.as_query()),
        query.sort.as_query()
    );
    if let Some(search) = &query.search {
        url.push_str("&q=");
        url.push_str(&urlencoding::encode(search));
    }
    url.push_str(&format!("&page={page}"));
    url
}

/// Display product listing page.
///
/// # Errors
///
/// Returns an error page when the catalog cannot be fetched.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    Query(params): Query<ListingParams>,
) -> Result<impl IntoResponse> {
    let products = state.backend().list_products().await?;
    let query = CatalogQuery::from(params);
    let results = catalog::browse(&products, &query);

    Ok(ProductsIndexTemplate {
        page,
        products: results.products.iter().map(ProductView::from).collect(),
        filters: filter_options(&products, &query.filter),
        sorts: sort_options(query.sort),
        category: query.filter.as_query().to_string(),
        search: query.search.clone().unwrap_or_default(),
        sort: query.sort.as_query().to_string(),
        total: results.total,
        current_page: results.page,
        total_pages: results.total_pages,
        prev_url: results
            .has_previous()
            .then(|| page_url(&query, results.page - 1)),
        next_url: results
            .has_next()
            .then(|| page_url(&query, results.page + 1)),
    })
}

/// Display product detail page.
///
/// # Errors
///
/// Returns 404 for unknown products and an error page when the backend fails.
#[instrument(skip(state, page))]
pub async fn show(
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let product = state.backend().get_product(&ProductId::new(id)).await?;

    let related_products = match state.backend().list_products().await {
        Ok(products) => catalog::related(&products, &product)
            .iter()
            .map(ProductView::from)
            .collect(),
        Err(e) => {
            tracing::warn!("Failed to load related products: {e}");
            Vec::new()
        }
    };

    Ok(ProductShowTemplate {
        page,
        product: ProductView::from(&product),
        related_products,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_view() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "_id": "p1",
            "name": "Elderberry Syrup",
            "price": 18,
            "originalPrice": 24,
            "rating": 4.5,
            "countInStock": 3
        }))
        .unwrap();
        let view = ProductView::from(&product);

        assert_eq!(view.price, "$18.00");
        assert_eq!(view.original_price.as_deref(), Some("$24.00"));
        assert_eq!(view.discount_percent, Some(25));
        assert_eq!(view.rating.stars, vec!["full", "full", "full", "full", "half"]);
        assert_eq!(view.stock_note.as_deref(), Some("Only 3 left"));
        assert!(view.image.is_none());
    }

    #[test]
    fn test_page_url_keeps_query() {
        let query = CatalogQuery::from(ListingParams {
            category: Some("Herbal Teas".to_string()),
            q: Some("mint & lemon".to_string()),
            sort: Some("price-asc".to_string()),
            page: None,
        });
        assert_eq!(
            page_url(&query, 2),
            "/products?category=Herbal%20Teas&sort=price-asc&q=mint%20%26%20lemon&page=2"
        );
    }

    #[test]
    fn test_sort_options_mark_selection() {
        let options = sort_options(SortOrder::Rating);
        assert_eq!(options.len(), 5);
        assert!(options.iter().filter(|o| o.selected).all(|o| o.value == "rating"));
    }
}
