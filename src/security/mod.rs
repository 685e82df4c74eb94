//! Security subsystem.
//!
//! # Design Decisions
//! - Request bodies are authenticated with HMAC-SHA256, hex encoded in a header
//! - The same signer is used to sign outbound and verify inbound requests
//! - Verification compares in constant time

pub mod signature;

pub use signature::Signer;
