//! Core data model types: messages, listing rows, decoded content,
//! addresses and validation findings.

pub mod address;
pub mod mail;
pub mod validation;
