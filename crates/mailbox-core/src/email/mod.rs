//! Draft and sent email records.
//!
//! This module provides the record model, the month index, the `SQLite`
//! store, and the create and listing workflows built on them.

mod api;
mod create;
mod index;
mod list;
mod model;
mod records;
mod repository;

pub use api::{
    DeleteEmailApi, GetEmailApi, PutEmailApi, QueryIndexApi, SendEmailApi, TransitionApi,
};
pub use create::{DRAFT_ID_PREFIX, create, send_draft};
pub use index::{
    Cursor, IndexPage, PartitionKey, RawIndexEntry, TIME_FORMAT, YearMonth, format_time,
    parse_time,
};
pub use list::{ListQuery, ListResult, list_by_year_month};
pub use model::{CreateInput, EmailInput, EmailRecord, EmailType, GenerateText, TimeIndex};
pub use records::{delete, get};
pub use repository::{DEFAULT_PAGE_SIZE, SqliteEmailStore};
