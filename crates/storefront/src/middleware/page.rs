//! Per-page layout context.
//!
//! Every full page needs the same chrome: who is signed in, the cart badge,
//! pending toasts, footer links and the CSP nonce. [`PageContext`] gathers
//! them in one extractor so handlers only deal with their own data.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use super::csp::CspNonce;
use crate::models::{CartState, CurrentUser, Flash, session_keys, take_flashes};
use crate::state::AppState;

/// A footer link to a content page.
#[derive(Debug, Clone)]
pub struct FooterLink {
    pub href: String,
    pub title: String,
}

/// Layout data shared by all full-page templates.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub user: Option<CurrentUser>,
    pub cart_count: u32,
    /// Toasts to show on this page; taken from the session.
    pub flashes: Vec<Flash>,
    pub footer_links: Vec<FooterLink>,
    pub nonce: String,
}

impl PageContext {
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    /// Gather layout data. Pending toasts are removed from the session, so
    /// call this only when a page is actually going to be rendered.
    pub async fn load(state: &AppState, session: Option<&Session>, nonce: &CspNonce) -> Self {
        let footer_links = state
            .content()
            .footer_pages()
            .into_iter()
            .map(|page| FooterLink {
                href: format!("/pages/{}", page.slug),
                title: page.meta.title.clone(),
            })
            .collect();

        let Some(session) = session else {
            return Self {
                footer_links,
                nonce: nonce.value().to_string(),
                ..Self::default()
            };
        };

        let user: Option<CurrentUser> = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten();
        let cart_count = session
            .get::<CartState>(session_keys::CART)
            .await
            .ok()
            .flatten()
            .map_or(0, |cart| cart.item_count());
        let flashes = take_flashes(session).await;

        Self {
            user,
            cart_count,
            flashes,
            footer_links,
            nonce: nonce.value().to_string(),
        }
    }
}

impl FromRequestParts<AppState> for PageContext {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let nonce = parts
            .extensions
            .get::<CspNonce>()
            .cloned()
            .unwrap_or_else(|| CspNonce(String::new()));

        Ok(Self::load(state, parts.extensions.get::<Session>(), &nonce).await)
    }
}
