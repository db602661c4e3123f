//! Batch jobs for the membership services
//!
//! - [`sync`]: timestamp-guarded re-sync of recent records into the mirror
//! - [`export`]: migration of every member or resource into CouchDB
//! - [`report`]: CSV reports from the relational store

pub mod couch;
pub mod export;
pub mod report;
pub mod sync;

pub use couch::{CouchError, CouchStore};
