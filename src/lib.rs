//! `mboxview`: parse, validate, fix and update classic mbox mailboxes.
//!
//! This crate provides the core library for splitting mbox files,
//! modelling RFC 5322 headers, decoding MIME bodies, normalizing headers
//! and rewriting `Status:` headers with crash-safe write-back.

pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod store;
pub mod validate;
