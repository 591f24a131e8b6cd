//! Persistence layer for monitored hosts and their certificate records.
//!
//! The only implementation ([`host_store::HostStore`]) is a single SQLite
//! database in WAL mode behind a mutex-guarded connection. All writes for
//! one probe outcome happen inside one transaction, which together with the
//! unique index on `certificates.host_id` is what upholds the
//! at-most-one-record-per-host guarantee under concurrent scan triggers.

pub mod host_store;
