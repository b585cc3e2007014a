//! Mailbox storage: status mutation, atomic write-back, listing and
//! appending.

pub mod append;
pub mod mailbox;
pub mod status;
pub mod writer;

pub use mailbox::Mailbox;
