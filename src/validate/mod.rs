//! Header validation and normalization of mbox messages.

pub mod message_id;
pub mod normalizer;
pub mod validator;

pub use normalizer::{normalize_headers, normalize_message};
pub use validator::{validate_headers, validate_message};
