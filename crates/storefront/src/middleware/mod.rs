//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with `request_id`)
//! 3. Request ID (fill the span field, tag Sentry, echo header)
//! 4. Security headers (CSP built from the nonce)
//! 5. CSP nonce (per-request nonce for inline scripts)
//! 6. Session layer (tower-sessions, in-memory store)
//! 7. Session expiry (sign out when the backend refuses the token)
//!
//! Form posts to auth and contact routes are additionally rate limited.

pub mod auth;
pub mod csp;
pub mod page;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, safe_next_path};
pub use csp::{CspNonce, csp_nonce_middleware};
pub use page::PageContext;
pub use rate_limit::form_rate_limiter;
pub use request_id::{make_request_span, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::{SessionExpired, create_session_layer, session_expiry_middleware};
