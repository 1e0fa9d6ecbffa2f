//! Order history route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use tower_sessions::Session;
use tracing::instrument;

use herbal_core::{OrderId, Price};

use crate::api::Order;
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{PageContext, RequireAuth};
use crate::models::{Flash, push_flash};
use crate::state::AppState;

/// Order row for the history list.
#[derive(Clone)]
pub struct OrderSummaryView {
    pub id: String,
    pub date: String,
    pub status: String,
    pub badge_class: String,
    pub item_count: u32,
    pub total: String,
}

impl From<&Order> for OrderSummaryView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            date: order.created_at.format("%B %-d, %Y").to_string(),
            status: order.status.label().to_string(),
            badge_class: order.status.badge_class().to_string(),
            item_count: order.item_count(),
            total: Price::usd(order.total).display(),
        }
    }
}

/// Order line display data.
#[derive(Clone)]
pub struct OrderLineView {
    pub product_id: String,
    pub name: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

/// Full order display data.
#[derive(Clone)]
pub struct OrderView {
    pub summary: OrderSummaryView,
    pub items: Vec<OrderLineView>,
    pub subtotal: String,
    pub shipping: String,
    pub tax: String,
    /// Address block, one entry per line.
    pub ship_to: Vec<String>,
    /// e.g. "Visa ending in 4242".
    pub payment: Option<String>,
    pub cancellable: bool,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        let ship_to = order
            .shipping_address
            .as_ref()
            .map(|a| {
                vec![
                    a.full_name.clone(),
                    a.address.clone(),
                    format!("{}, {} {}", a.city, a.state, a.postal_code),
                    a.country.clone(),
                ]
            })
            .unwrap_or_default();

        Self {
            summary: OrderSummaryView::from(order),
            items: order
                .items
                .iter()
                .map(|line| OrderLineView {
                    product_id: line.product_id.to_string(),
                    name: line.name.clone(),
                    image: line.image.clone(),
                    quantity: line.quantity,
                    price: line.unit_price().display(),
                    line_price: line.line_total().display(),
                })
                .collect(),
            subtotal: Price::usd(order.subtotal).display(),
            shipping: Price::usd(order.shipping_cost).display(),
            tax: Price::usd(order.tax).display(),
            ship_to,
            payment: order
                .payment
                .as_ref()
                .map(|p| format!("{} ending in {}", p.card_brand, p.last4)),
            cancellable: order.status.is_cancellable(),
        }
    }
}

/// Order history template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub page: PageContext,
    pub orders: Vec<OrderSummaryView>,
}

/// Order detail template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/show.html")]
pub struct OrderShowTemplate {
    pub page: PageContext,
    pub order: OrderView,
}

/// Display order history, newest first.
///
/// # Errors
///
/// Returns an error page when the backend fails.
#[instrument(skip(state, page, token))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    RequireAuth(_, token): RequireAuth,
) -> Result<impl IntoResponse> {
    let orders = state.backend().list_orders(token.expose()).await?;

    Ok(OrdersIndexTemplate {
        page,
        orders: orders.iter().map(OrderSummaryView::from).collect(),
    })
}

/// Display a single order.
///
/// # Errors
///
/// Returns 404 for unknown orders and an error page when the backend fails.
#[instrument(skip(state, page, token))]
pub async fn show(
    State(state): State<AppState>,
    page: PageContext,
    RequireAuth(_, token): RequireAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let order = state
        .backend()
        .get_order(token.expose(), &OrderId::new(id))
        .await?;

    Ok(OrderShowTemplate {
        page,
        order: OrderView::from(&order),
    })
}

/// Cancel an order that has not shipped yet.
///
/// # Errors
///
/// Returns 404 for unknown orders and an error page when the order cannot be
/// loaded.
#[instrument(skip(state, session, token))]
pub async fn cancel(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(_, token): RequireAuth,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let order_id = OrderId::new(id);
    let order = state.backend().get_order(token.expose(), &order_id).await?;
    let back = Redirect::to(&format!("/orders/{order_id}"));

    if !order.status.is_cancellable() {
        push_flash(
            &session,
            Flash::error(format!(
                "This order is {} and can no longer be cancelled",
                order.status.label().to_lowercase()
            )),
        )
        .await;
        return Ok(back);
    }

    add_breadcrumb("orders", "Cancel order", Some(&[("order_id", order_id.as_str())]));
    match state.backend().cancel_order(token.expose(), &order_id).await {
        Ok(_) => {
            tracing::info!(order_id = %order_id, "Order cancelled");
            push_flash(&session, Flash::success("Your order has been cancelled")).await;
        }
        Err(e) if e.is_unauthorized() => return Err(e.into()),
        Err(e) => {
            tracing::warn!("Failed to cancel order {order_id}: {e}");
            push_flash(&session, Flash::error(e.user_message("Could not cancel the order"))).await;
        }
    }

    Ok(back)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn order(status: &str) -> Order {
        serde_json::from_value(serde_json::json!({
            "_id": "o1",
            "createdAt": "2026-03-04T10:00:00Z",
            "status": status,
            "items": [
                {"productId": "tea", "quantity": 2, "name": "Tea", "price": 12.5}
            ],
            "subtotal": 25,
            "shippingCost": 5.99,
            "tax": 0,
            "total": 30.99,
            "shippingAddress": {
                "fullName": "Sage Green", "email": "sage@herbs.test",
                "phone": "5551234567", "address": "1 Herb Way", "city": "Austin",
                "state": "TX", "postalCode": "73301", "country": "US"
            },
            "payment": {
                "method": "card", "cardBrand": "Visa",
                "last4": "4242", "cardholderName": "Sage Green"
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_order_view() {
        let view = OrderView::from(&order("Processing"));
        assert_eq!(view.summary.date, "March 4, 2026");
        assert_eq!(view.summary.total, "$30.99");
        assert_eq!(view.summary.item_count, 2);
        assert_eq!(view.items[0].line_price, "$25.00");
        assert_eq!(view.ship_to[2], "Austin, TX 73301");
        assert_eq!(view.payment.as_deref(), Some("Visa ending in 4242"));
        assert!(view.cancellable);
    }

    #[test]
    fn test_shipped_order_not_cancellable() {
        let view = OrderView::from(&order("Shipped"));
        assert!(!view.cancellable);
        assert_eq!(view.summary.badge_class, "badge--shipped");
    }
}
