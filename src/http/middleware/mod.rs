//! Server-side request middleware.
//!
//! # Data Flow
//! ```text
//! Request
//!     → access_log.rs (buffer body, time the handler, log afterwards)
//!     → content_type.rs (415 unless Content-Type is application/json)
//!     → signature.rs (400 if the HMAC header does not match the body)
//!     → save_body.rs (body kept as a request extension for handlers)
//!     → handler
//! ```
//!
//! Every layer that reads the body puts an identical one back.

pub mod access_log;
pub mod content_type;
pub mod save_body;
pub mod signature;

pub use access_log::access_log;
pub use content_type::require_json;
pub use save_body::{save_body, BodyLimit, BufferedBody};
pub use signature::{verify_signature, SignatureVerifier};
