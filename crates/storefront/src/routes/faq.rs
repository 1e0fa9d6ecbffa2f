//! FAQ page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::api::Faq;
use crate::filters;
use crate::middleware::PageContext;
use crate::state::AppState;

/// Heading for questions without a category.
const DEFAULT_CATEGORY: &str = "General";

/// One question and its answer.
#[derive(Clone)]
pub struct FaqItemView {
    pub question: String,
    pub answer: String,
}

/// Questions sharing a category.
#[derive(Clone)]
pub struct FaqGroupView {
    pub name: String,
    pub items: Vec<FaqItemView>,
}

/// FAQ page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/faq.html")]
pub struct FaqTemplate {
    pub page: PageContext,
    pub groups: Vec<FaqGroupView>,
    pub error: Option<String>,
}

/// Group questions by category, keeping the order categories first appear in.
fn group_faqs(faqs: &[Faq]) -> Vec<FaqGroupView> {
    let mut groups: Vec<FaqGroupView> = Vec::new();

    for faq in faqs {
        let name = faq
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY);
        let item = FaqItemView {
            question: faq.question.clone(),
            answer: faq.answer.clone(),
        };

        match groups.iter_mut().find(|group| group.name == name) {
            Some(group) => group.items.push(item),
            None => groups.push(FaqGroupView {
                name: name.to_string(),
                items: vec![item],
            }),
        }
    }

    groups
}

/// Display the FAQ page.
///
/// A backend failure still renders the page, with a notice instead of the
/// questions.
#[instrument(skip(state, page))]
pub async fn show(State(state): State<AppState>, page: PageContext) -> impl IntoResponse {
    let (groups, error) = match state.backend().list_faqs().await {
        Ok(faqs) => (group_faqs(&faqs), None),
        Err(e) => {
            tracing::error!("Failed to fetch FAQs: {e}");
            (
                Vec::new(),
                Some("Our FAQ is unavailable right now. Please try again later.".to_string()),
            )
        }
    };

    FaqTemplate {
        page,
        groups,
        error,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_group_faqs_keeps_first_seen_order() {
        let faqs: Vec<Faq> = serde_json::from_value(serde_json::json!([
            {"_id": "1", "question": "How long does shipping take?", "answer": "3-5 days", "category": "Shipping"},
            {"_id": "2", "question": "Are teas organic?", "answer": "Yes", "category": "Products"},
            {"_id": "3", "question": "Do you ship abroad?", "answer": "Not yet", "category": "Shipping"},
            {"_id": "4", "question": "Who are you?", "answer": "Herbalists"}
        ]))
        .unwrap();

        let groups = group_faqs(&faqs);
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Shipping", "Products", "General"]);
        assert_eq!(groups[0].items.len(), 2);
        assert_eq!(groups[0].items[1].question, "Do you ship abroad?");
    }
}
