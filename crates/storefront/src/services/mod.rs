//! Business logic services for the storefront.
//!
//! - `session` - sign-in state (token + profile snapshot)
//! - `cart` - optimistic cart mirror reconciled against the backend
//! - `checkout` - two-step checkout validation and order placement
//! - `catalog` - listing filters, sorting and pagination

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod session;

pub use cart::{CartContainer, CartError};
pub use checkout::{CheckoutError, CheckoutFlow, FieldErrors};
pub use session::{AccountSession, AuthError, forget_sign_in};
