//! Two-step checkout: shipping address, then payment.
//!
//! Card details are validated here and reduced to a [`PaymentSummary`]
//! (brand, last four digits, cardholder). The full number and CVV are never
//! stored or sent anywhere.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tower_sessions::Session;
use tracing::instrument;

use herbal_core::Email;

use crate::api::{BackendClient, BackendError, NewOrder, Order, PaymentSummary, ShippingAddress};
use crate::error::add_breadcrumb;
use crate::models::{AuthToken, CartState, session_keys};
use crate::services::cart::{CartContainer, CartError};

static PERSON_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L} .'\-]{2,60}$").expect("Invalid regex"));

static CITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L} .'\-]{2,50}$").expect("Invalid regex"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?\d{10,15}$").expect("Invalid regex"));

static US_ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("Invalid regex"));

static POSTAL_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{3,10}$").expect("Invalid regex"));

static EXPIRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})\s*/\s*(\d{2})$").expect("Invalid regex"));

static CVV_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{3,4}$").expect("Invalid regex"));

// =============================================================================
// Forms
// =============================================================================

/// Step 1 form data.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ShippingForm {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl From<&ShippingAddress> for ShippingForm {
    fn from(address: &ShippingAddress) -> Self {
        Self {
            full_name: address.full_name.clone(),
            email: address.email.clone(),
            phone: address.phone.clone(),
            address: address.address.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            postal_code: address.postal_code.clone(),
            country: address.country.clone(),
        }
    }
}

/// Step 2 form data.
#[derive(Deserialize, Default)]
#[serde(default)]
pub struct PaymentForm {
    pub cardholder_name: String,
    pub card_number: String,
    pub expiry: String,
    pub cvv: String,
}

impl std::fmt::Debug for PaymentForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentForm")
            .field("cardholder_name", &self.cardholder_name)
            .field("card_number", &"[REDACTED]")
            .field("expiry", &self.expiry)
            .field("cvv", &"[REDACTED]")
            .finish()
    }
}

/// Inline validation messages keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Record a message; the first one per field wins.
    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    fn check(&mut self, field: &'static str, result: Result<(), &'static str>) {
        if let Err(message) = result {
            self.insert(field, message);
        }
    }
}

// =============================================================================
// Field rules
// =============================================================================

fn person_name(value: &str, blank: &'static str) -> Result<(), &'static str> {
    if value.is_empty() {
        Err(blank)
    } else if PERSON_NAME_RE.is_match(value) {
        Ok(())
    } else {
        Err("Use 2-60 letters, spaces, periods, apostrophes or hyphens")
    }
}

fn email(value: &str) -> Result<(), &'static str> {
    if value.is_empty() {
        return Err("Email is required");
    }
    Email::parse(value)
        .map(|_| ())
        .map_err(|_| "Enter a valid email address")
}

/// Phone numbers may contain spaces, dashes, dots and parentheses.
fn phone(value: &str) -> Result<(), &'static str> {
    if value.is_empty() {
        return Err("Phone number is required");
    }
    let compact: String = value
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();
    if PHONE_RE.is_match(&compact) {
        Ok(())
    } else {
        Err("Enter a phone number with 10-15 digits")
    }
}

fn street_address(value: &str) -> Result<(), &'static str> {
    match value.chars().count() {
        0 => Err("Address is required"),
        1..5 => Err("Address must be at least 5 characters"),
        _ => Ok(()),
    }
}

fn city(value: &str) -> Result<(), &'static str> {
    if value.is_empty() {
        Err("City is required")
    } else if CITY_RE.is_match(value) {
        Ok(())
    } else {
        Err("Use 2-50 letters for the city")
    }
}

fn region(value: &str) -> Result<(), &'static str> {
    match value.chars().count() {
        0 => Err("State or province is required"),
        2..=50 => Ok(()),
        _ => Err("State must be 2-50 characters"),
    }
}

/// US ZIP (`12345`, `12345-6789`) or 3-10 letters and digits.
fn postal_code(value: &str) -> Result<(), &'static str> {
    if value.is_empty() {
        return Err("Postal code is required");
    }
    if US_ZIP_RE.is_match(value) {
        return Ok(());
    }
    let compact: String = value.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    if POSTAL_CODE_RE.is_match(&compact) {
        Ok(())
    } else {
        Err("Enter a valid postal code")
    }
}

fn country(value: &str) -> Result<(), &'static str> {
    if value.is_empty() {
        Err("Country is required")
    } else {
        Ok(())
    }
}

/// Validate step 1 and build the address to store.
///
/// # Errors
///
/// Returns every failing field with its message.
pub fn validate_shipping(form: &ShippingForm) -> Result<ShippingAddress, FieldErrors> {
    let address = ShippingAddress {
        full_name: form.full_name.trim().to_string(),
        email: form.email.trim().to_lowercase(),
        phone: form.phone.trim().to_string(),
        address: form.address.trim().to_string(),
        city: form.city.trim().to_string(),
        state: form.state.trim().to_string(),
        postal_code: form.postal_code.trim().to_uppercase(),
        country: form.country.trim().to_string(),
    };

    let mut errors = FieldErrors::default();
    errors.check(
        "full_name",
        person_name(&address.full_name, "Full name is required"),
    );
    errors.check("email", email(&address.email));
    errors.check("phone", phone(&address.phone));
    errors.check("address", street_address(&address.address));
    errors.check("city", city(&address.city));
    errors.check("state", region(&address.state));
    errors.check("postal_code", postal_code(&address.postal_code));
    errors.check("country", country(&address.country));

    if errors.is_empty() {
        Ok(address)
    } else {
        Err(errors)
    }
}

// =============================================================================
// Cards
// =============================================================================

/// Card network, detected from the number prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    Discover,
    Other,
}

impl CardBrand {
    /// Detect the brand from a digits-only card number.
    #[must_use]
    pub fn detect(digits: &str) -> Self {
        let prefix = |n: usize| digits.get(..n).and_then(|p| p.parse::<u32>().ok());

        if digits.starts_with('4') {
            Self::Visa
        } else if prefix(2).is_some_and(|p| (51..=55).contains(&p))
            || prefix(4).is_some_and(|p| (2221..=2720).contains(&p))
        {
            Self::Mastercard
        } else if prefix(2).is_some_and(|p| p == 34 || p == 37) {
            Self::Amex
        } else if digits.starts_with("6011")
            || digits.starts_with("65")
            || prefix(3).is_some_and(|p| (644..=649).contains(&p))
        {
            Self::Discover
        } else {
            Self::Other
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Visa => "Visa",
            Self::Mastercard => "Mastercard",
            Self::Amex => "American Express",
            Self::Discover => "Discover",
            Self::Other => "Card",
        }
    }
}

/// Luhn checksum over a digits-only string.
#[must_use]
pub fn luhn_valid(digits: &str) -> bool {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let sum: u32 = digits
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let d = u32::from(b - b'0');
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

fn card_number(digits: &str) -> Result<(), &'static str> {
    if digits.is_empty() {
        return Err("Card number is required");
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) || !(13..=19).contains(&digits.len()) {
        return Err("Card number must be 13-19 digits");
    }
    if luhn_valid(digits) {
        Ok(())
    } else {
        Err("Card number is not valid")
    }
}

/// `MM/YY`, valid through the end of that month.
fn expiry(value: &str, today: NaiveDate) -> Result<(), &'static str> {
    if value.is_empty() {
        return Err("Expiry date is required");
    }
    let captures = EXPIRY_RE.captures(value).ok_or("Use the format MM/YY")?;
    let month: u32 = captures[1].parse().map_err(|_| "Use the format MM/YY")?;
    let year: i32 = captures[2].parse().map_err(|_| "Use the format MM/YY")?;

    if !(1..=12).contains(&month) {
        return Err("Expiry month must be 01-12");
    }
    if (2000 + year, month) < (today.year(), today.month()) {
        return Err("This card has expired");
    }
    Ok(())
}

fn cvv(value: &str) -> Result<(), &'static str> {
    if value.is_empty() {
        Err("CVV is required")
    } else if CVV_RE.is_match(value) {
        Ok(())
    } else {
        Err("CVV must be 3 or 4 digits")
    }
}

/// Validate step 2 and reduce the card to a summary.
///
/// # Errors
///
/// Returns every failing field with its message.
pub fn validate_payment(form: &PaymentForm, today: NaiveDate) -> Result<PaymentSummary, FieldErrors> {
    let cardholder = form.cardholder_name.trim();
    let digits: String = form
        .card_number
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .collect();

    let mut errors = FieldErrors::default();
    errors.check(
        "cardholder_name",
        person_name(cardholder, "Cardholder name is required"),
    );
    errors.check("card_number", card_number(&digits));
    errors.check("expiry", expiry(form.expiry.trim(), today));
    errors.check("cvv", cvv(form.cvv.trim()));

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(PaymentSummary {
        method: "card".to_string(),
        card_brand: CardBrand::detect(&digits).name().to_string(),
        last4: digits
            .get(digits.len().saturating_sub(4)..)
            .unwrap_or_default()
            .to_string(),
        cardholder_name: cardholder.to_string(),
    })
}

/// Assemble the order request from the cart mirror.
#[must_use]
pub fn build_order(
    cart: &CartState,
    shipping_address: ShippingAddress,
    payment: PaymentSummary,
) -> NewOrder {
    let totals = cart.totals();
    NewOrder {
        items: cart.items().to_vec(),
        shipping_address,
        payment,
        subtotal: totals.subtotal.amount,
        shipping_cost: totals.shipping.amount,
        tax: totals.tax.amount,
        total: totals.total.amount,
    }
}

// =============================================================================
// Flow
// =============================================================================

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("not signed in")]
    NotSignedIn,

    #[error("cart is empty")]
    EmptyCart,

    /// Step 2 was reached without a stored shipping address.
    #[error("shipping address missing")]
    MissingShipping,

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Checkout state bound to one visitor's session.
pub struct CheckoutFlow<'a> {
    backend: &'a BackendClient,
    session: &'a Session,
}

impl<'a> CheckoutFlow<'a> {
    #[must_use]
    pub const fn new(backend: &'a BackendClient, session: &'a Session) -> Self {
        Self { backend, session }
    }

    /// The address saved by step 1.
    pub async fn shipping(&self) -> Option<ShippingAddress> {
        self.session
            .get(session_keys::CHECKOUT_SHIPPING)
            .await
            .ok()
            .flatten()
    }

    /// Store the step 1 address.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    pub async fn save_shipping(
        &self,
        address: &ShippingAddress,
    ) -> Result<(), tower_sessions::session::Error> {
        self.session
            .insert(session_keys::CHECKOUT_SHIPPING, address)
            .await
    }

    /// Place the order, then empty the cart and forget the draft.
    ///
    /// The cart is re-fetched first so the order contains what the backend
    /// holds, not a stale mirror.
    ///
    /// # Errors
    ///
    /// Returns `EmptyCart` or `MissingShipping` when the flow is incomplete,
    /// otherwise the backend's rejection.
    #[instrument(skip_all)]
    pub async fn place_order(&self, payment: PaymentSummary) -> Result<Order, CheckoutError> {
        let token: AuthToken = self
            .session
            .get(session_keys::AUTH_TOKEN)
            .await
            .ok()
            .flatten()
            .ok_or(CheckoutError::NotSignedIn)?;

        let carts = CartContainer::new(self.backend, self.session);
        let cart = match carts.refresh().await {
            Ok(cart) => cart,
            Err(CartError::Backend(e)) if e.is_unauthorized() => return Err(e.into()),
            Err(e) => {
                tracing::warn!(error = %e, "Cart refresh before checkout failed, using mirror");
                carts.state().await
            }
        };
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let shipping = self.shipping().await.ok_or(CheckoutError::MissingShipping)?;

        add_breadcrumb("checkout", "Placing order", None);
        let order = self
            .backend
            .create_order(token.expose(), &build_order(&cart, shipping, payment))
            .await?;
        tracing::info!(order_id = %order.id, total = %order.total, "Order placed");

        if let Err(e) = carts.clear().await {
            tracing::warn!(error = %e, "Failed to clear cart after order");
        }
        if let Err(e) = self
            .session
            .remove::<ShippingAddress>(session_keys::CHECKOUT_SHIPPING)
            .await
        {
            tracing::warn!("Failed to clear checkout draft: {e}");
        }

        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use herbal_core::Price;

    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
    }

    fn shipping_form() -> ShippingForm {
        ShippingForm {
            full_name: "Mary O'Neil-Smith".to_string(),
            email: "Mary@Herbs.test".to_string(),
            phone: "+1 (555) 123-4567".to_string(),
            address: "12 Garden Lane".to_string(),
            city: "St. Louis".to_string(),
            state: "MO".to_string(),
            postal_code: "63101".to_string(),
            country: "United States".to_string(),
        }
    }

    fn payment_form() -> PaymentForm {
        PaymentForm {
            cardholder_name: "Mary O'Neil".to_string(),
            card_number: "4242 4242 4242 4242".to_string(),
            expiry: "12/27".to_string(),
            cvv: "123".to_string(),
        }
    }

    #[test]
    fn test_valid_shipping() {
        let address = validate_shipping(&shipping_form()).unwrap();
        assert_eq!(address.email, "mary@herbs.test");
        assert_eq!(address.city, "St. Louis");
    }

    #[test]
    fn test_shipping_reports_every_field() {
        let errors = validate_shipping(&ShippingForm::default()).unwrap_err();
        assert_eq!(errors.len(), 8);
        assert_eq!(errors.get("full_name"), Some("Full name is required"));
        assert_eq!(errors.get("country"), Some("Country is required"));
    }

    #[test]
    fn test_name_rule() {
        assert!(person_name("Jo", "x").is_ok());
        assert!(person_name("José Álvarez", "x").is_ok());
        assert!(person_name("J", "x").is_err());
        assert!(person_name("R2-D2", "x").is_err());
        assert!(person_name(&"a".repeat(61), "x").is_err());
    }

    #[test]
    fn test_phone_rule() {
        assert!(phone("5551234567").is_ok());
        assert!(phone("+44 20 7946 0958").is_ok());
        assert!(phone("555-1234").is_err());
        assert!(phone("+1234567890123456").is_err());
        assert!(phone("555abc4567").is_err());
    }

    #[test]
    fn test_postal_code_rule() {
        assert!(postal_code("12345").is_ok());
        assert!(postal_code("12345-6789").is_ok());
        assert!(postal_code("SW1A 1AA").is_ok());
        assert!(postal_code("K1A 0B1").is_ok());
        assert!(postal_code("12").is_err());
        assert!(postal_code("ABCDEFGHIJK").is_err());
        assert!(postal_code("12#45").is_err());
    }

    #[test]
    fn test_address_city_state_rules() {
        assert!(street_address("1 Elm").is_ok());
        assert!(street_address("1 El").is_err());
        assert!(city("Winston-Salem").is_ok());
        assert!(city("Area 51").is_err());
        assert!(region("CA").is_ok());
        assert!(region("C").is_err());
    }

    #[test]
    fn test_luhn() {
        assert!(luhn_valid("4242424242424242"));
        assert!(luhn_valid("378282246310005"));
        assert!(luhn_valid("6011111111111117"));
        assert!(!luhn_valid("4242424242424241"));
        assert!(!luhn_valid(""));
        assert!(!luhn_valid("4242abcd"));
    }

    #[test]
    fn test_card_brand() {
        assert_eq!(CardBrand::detect("4242424242424242"), CardBrand::Visa);
        assert_eq!(CardBrand::detect("5555555555554444"), CardBrand::Mastercard);
        assert_eq!(CardBrand::detect("2223003122003222"), CardBrand::Mastercard);
        assert_eq!(CardBrand::detect("378282246310005"), CardBrand::Amex);
        assert_eq!(CardBrand::detect("6011111111111117"), CardBrand::Discover);
        assert_eq!(CardBrand::detect("3530111333300000"), CardBrand::Other);
    }

    #[test]
    fn test_expiry_rule() {
        assert!(expiry("06/26", today()).is_ok());
        assert!(expiry("12/30", today()).is_ok());
        assert_eq!(expiry("05/26", today()), Err("This card has expired"));
        assert_eq!(expiry("13/27", today()), Err("Expiry month must be 01-12"));
        assert_eq!(expiry("1/27", today()), Err("Use the format MM/YY"));
        assert_eq!(expiry("", today()), Err("Expiry date is required"));
    }

    #[test]
    fn test_valid_payment_keeps_only_summary() {
        let summary = validate_payment(&payment_form(), today()).unwrap();
        assert_eq!(summary.card_brand, "Visa");
        assert_eq!(summary.last4, "4242");
        assert_eq!(summary.cardholder_name, "Mary O'Neil");

        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("4242424242424242"));
        assert!(!json.contains("123"));
    }

    #[test]
    fn test_payment_errors() {
        let form = PaymentForm {
            card_number: "4242 4242 4242 4241".to_string(),
            cvv: "12".to_string(),
            ..payment_form()
        };
        let errors = validate_payment(&form, today()).unwrap_err();
        assert_eq!(errors.get("card_number"), Some("Card number is not valid"));
        assert_eq!(errors.get("cvv"), Some("CVV must be 3 or 4 digits"));
        assert!(!errors.has("expiry"));

        let form = PaymentForm {
            card_number: "4242".to_string(),
            ..payment_form()
        };
        let errors = validate_payment(&form, today()).unwrap_err();
        assert_eq!(
            errors.get("card_number"),
            Some("Card number must be 13-19 digits")
        );
    }

    #[test]
    fn test_payment_form_debug_redacts_card() {
        let debug = format!("{:?}", payment_form());
        assert!(!debug.contains("4242"));
        assert!(debug.contains("Mary O'Neil"));
    }

    #[test]
    fn test_build_order_uses_cart_totals() {
        let product: crate::api::Product = serde_json::from_value(serde_json::json!({
            "id": "p1", "name": "Chamomile", "price": 12.5
        }))
        .unwrap();
        let mut cart = CartState::default();
        cart.add(&product, 2);

        let order = build_order(
            &cart,
            validate_shipping(&shipping_form()).unwrap(),
            validate_payment(&payment_form(), today()).unwrap(),
        );
        assert_eq!(order.items.len(), 1);
        assert_eq!(Price::usd(order.subtotal).display(), "$25.00");
        assert_eq!(Price::usd(order.shipping_cost).display(), "$5.99");
        assert_eq!(Price::usd(order.total).display(), "$30.99");
    }
}
