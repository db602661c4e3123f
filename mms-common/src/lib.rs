//! Shared library for the membership services
//!
//! Relational access (members, applications, invoices, notes, issues, CPD),
//! the document mirror and report projections.

pub mod application;
pub mod association;
pub mod config;
pub mod cpd;
pub mod db;
pub mod docstore;
pub mod error;
pub mod invoice;
pub mod issue;
pub mod lookup;
pub mod member;
pub mod note;
pub mod organisation;
pub mod position;
pub mod report;
pub mod resource;
pub mod time;

pub use error::{AssociationError, Error, Result};
