//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layer (capture errors, binary only)
//! 2. `TraceLayer` (request span with `request_id` and `subject_id`)
//! 3. Request ID
//! 4. CORS and compression
//! 5. Security headers
//! 6. Stats: time and count the request, stamp `x-response-time`
//! 7. Session: resolve the identity from the session cookie
//! 8. Authorization gate: allow verified identities and exempt routes
//! 9. CSRF: validate state-changing requests
//!
//! Steps 6 to 9 also wrap the fallback, so unknown paths are gated.

pub mod auth;
pub mod csrf;
pub mod gate;
pub mod request_id;
pub mod security_headers;
pub mod session;
pub mod stats;

pub use auth::{Authenticated, CurrentIdentity};
pub use csrf::{csrf_protection, has_form_body};
pub use gate::{Admission, ExemptRoute, GateExemptions, admit, authorization_gate};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::{RequestIdentity, identify, resolve_identity};
pub use stats::{RESPONSE_TIME_HEADER, RequestStats, StatsSnapshot, record_stats};
