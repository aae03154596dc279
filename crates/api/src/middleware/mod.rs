//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (propagate or create `x-request-id`)
//! 4. CORS, path normalization, `nosniff`
//! 5. Rate limiting on the auth routes (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{RequireAdmin, RequireAuth, RequireStaff};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
