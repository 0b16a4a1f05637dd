//! # mailbox-core
//!
//! Core business logic for `Mailbox`, a store of draft and sent email.
//!
//! This crate provides:
//! - **Create workflow** - drafts are stored before any send is attempted,
//!   and a sent message atomically replaces its draft
//! - **Month listings** - newest-first pages of one type and month with
//!   continuation tokens
//! - Local storage (`SQLite`)
//! - SMTP transmission and HTML to text conversion

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod email;
mod error;
pub mod providers;
pub mod service;

pub use email::{
    CreateInput, Cursor, EmailInput, EmailRecord, EmailType, GenerateText, ListQuery, ListResult,
    PartitionKey, SqliteEmailStore, TimeIndex, YearMonth, create, delete, get, list_by_year_month,
    send_draft,
};
pub use error::{Error, Result};
pub use providers::{Clock, FixedClock, FixedRandom, Providers, RandomSource, SystemClock, UuidRandom};
pub use service::{HtmlText, Security, SmtpConfig, SmtpTransmitter, TextExtractor};
