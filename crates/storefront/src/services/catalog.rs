//! Product listing: filter, search, sort and paginate the cached catalog.
//!
//! The backend returns the whole catalog in one response, which is cached.
//! Listing pages are computed from that copy so paging and re-sorting never
//! cost a round trip.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::Deserialize;

use crate::api::Product;

/// Products per listing page.
pub const PAGE_SIZE: usize = 12;

/// Related products shown on a detail page.
pub const RELATED_LIMIT: usize = 4;

/// Which slice of the catalog to list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProductFilter {
    #[default]
    All,
    New,
    BestSeller,
    Category(String),
}

impl ProductFilter {
    /// Parse the `category` query value. Blank means all.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "all" => Self::All,
            "new" => Self::New,
            "bestseller" | "best-sellers" => Self::BestSeller,
            other => Self::Category(other.to_string()),
        }
    }

    /// Value for the `category` query parameter.
    #[must_use]
    pub fn as_query(&self) -> &str {
        match self {
            Self::All => "all",
            Self::New => "new",
            Self::BestSeller => "bestseller",
            Self::Category(name) => name,
        }
    }

    fn matches(&self, product: &Product) -> bool {
        match self {
            Self::All => true,
            Self::New => product.is_new,
            Self::BestSeller => product.is_best_seller,
            Self::Category(name) => product
                .category
                .as_deref()
                .is_some_and(|category| category.eq_ignore_ascii_case(name)),
        }
    }
}

/// Listing sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Backend order.
    #[default]
    Featured,
    PriceAsc,
    PriceDesc,
    Rating,
    Newest,
}

impl SortOrder {
    pub const ALL: [Self; 5] = [
        Self::Featured,
        Self::PriceAsc,
        Self::PriceDesc,
        Self::Rating,
        Self::Newest,
    ];

    /// Parse the `sort` query value; unknown values fall back to featured.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "price-asc" => Self::PriceAsc,
            "price-desc" => Self::PriceDesc,
            "rating" => Self::Rating,
            "newest" => Self::Newest,
            _ => Self::Featured,
        }
    }

    #[must_use]
    pub const fn as_query(&self) -> &'static str {
        match self {
            Self::Featured => "featured",
            Self::PriceAsc => "price-asc",
            Self::PriceDesc => "price-desc",
            Self::Rating => "rating",
            Self::Newest => "newest",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Featured => "Featured",
            Self::PriceAsc => "Price: Low to High",
            Self::PriceDesc => "Price: High to Low",
            Self::Rating => "Top Rated",
            Self::Newest => "Newest",
        }
    }

    fn compare(self, a: &Product, b: &Product) -> Ordering {
        match self {
            Self::Featured => Ordering::Equal,
            Self::PriceAsc => a.price.cmp(&b.price),
            Self::PriceDesc => b.price.cmp(&a.price),
            Self::Rating => b
                .rating
                .value()
                .total_cmp(&a.rating.value())
                .then(b.review_count.cmp(&a.review_count)),
            // Dated products first, newest first; then flagged-new ones
            Self::Newest => match (a.created_at, b.created_at) {
                (Some(a), Some(b)) => b.cmp(&a),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
            .then(b.is_new.cmp(&a.is_new)),
        }
    }
}

/// Raw listing query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingParams {
    pub category: Option<String>,
    pub q: Option<String>,
    pub sort: Option<String>,
    pub page: Option<usize>,
}

/// A parsed listing query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub filter: ProductFilter,
    pub search: Option<String>,
    pub sort: SortOrder,
    /// 1-based page number.
    pub page: usize,
}

impl From<ListingParams> for CatalogQuery {
    fn from(params: ListingParams) -> Self {
        Self {
            filter: ProductFilter::parse(params.category.as_deref().unwrap_or_default()),
            search: params
                .q
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty()),
            sort: SortOrder::parse(params.sort.as_deref().unwrap_or_default()),
            page: params.page.unwrap_or(1).max(1),
        }
    }
}

/// One page of listing results.
#[derive(Debug, Clone)]
pub struct CatalogPage {
    pub products: Vec<Product>,
    /// Products matching the query across all pages.
    pub total: usize,
    /// The page actually shown (clamped into range).
    pub page: usize,
    pub total_pages: usize,
}

impl CatalogPage {
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

fn matches_search(product: &Product, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    product.name.to_lowercase().contains(&needle)
        || product.description.to_lowercase().contains(&needle)
        || product
            .category
            .as_deref()
            .is_some_and(|category| category.to_lowercase().contains(&needle))
}

/// Apply a query to the catalog.
#[must_use]
pub fn browse(products: &[Product], query: &CatalogQuery) -> CatalogPage {
    let mut matching: Vec<&Product> = products
        .iter()
        .filter(|product| query.filter.matches(product))
        .filter(|product| {
            query
                .search
                .as_deref()
                .is_none_or(|needle| matches_search(product, needle))
        })
        .collect();

    // Stable sort keeps backend order among equals
    matching.sort_by(|a, b| query.sort.compare(a, b));

    let total = matching.len();
    let total_pages = total.div_ceil(PAGE_SIZE).max(1);
    let page = query.page.clamp(1, total_pages);

    let products = matching
        .into_iter()
        .skip((page - 1) * PAGE_SIZE)
        .take(PAGE_SIZE)
        .cloned()
        .collect();

    CatalogPage {
        products,
        total,
        page,
        total_pages,
    }
}

/// Distinct backend categories, sorted.
#[must_use]
pub fn categories(products: &[Product]) -> Vec<String> {
    products
        .iter()
        .filter_map(|product| product.category.clone())
        .filter(|category| !category.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Other products in the same category.
#[must_use]
pub fn related(products: &[Product], product: &Product) -> Vec<Product> {
    let Some(category) = product.category.as_deref() else {
        return Vec::new();
    };

    products
        .iter()
        .filter(|other| other.id != product.id)
        .filter(|other| {
            other
                .category
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(category))
        })
        .take(RELATED_LIMIT)
        .cloned()
        .collect()
}

/// Products flagged new, in backend order.
#[must_use]
pub fn new_arrivals(products: &[Product], limit: usize) -> Vec<Product> {
    products
        .iter()
        .filter(|p| p.is_new)
        .take(limit)
        .cloned()
        .collect()
}

/// Products flagged best sellers, in backend order.
#[must_use]
pub fn best_sellers(products: &[Product], limit: usize) -> Vec<Product> {
    products
        .iter()
        .filter(|p| p.is_best_seller)
        .take(limit)
        .cloned()
        .collect()
}
