//! Domain models for the storefront.
//!
//! Everything here is stored in the visitor's session.

pub mod cart;
pub mod flash;
pub mod session;

pub use cart::{CartState, CartTotals};
pub use flash::{Flash, FlashLevel, push_flash, take_flashes};
pub use session::{AuthToken, CurrentUser, keys as session_keys};
