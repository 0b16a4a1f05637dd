//! Collaborator capabilities required by the email workflows.
//!
//! Each workflow names only the capabilities it uses, so a test double only
//! has to implement those.

use std::future::Future;

use super::index::{Cursor, IndexPage, PartitionKey};
use super::model::EmailRecord;
use crate::Result;

/// Reads a record by identifier.
pub trait GetEmailApi {
    /// Returns the record stored under `message_id`, if any.
    fn get_email(&self, message_id: &str) -> impl Future<Output = Result<Option<EmailRecord>>> + Send;
}

/// Inserts a new record.
pub trait PutEmailApi {
    /// Inserts `email`; fails with [`crate::Error::InvalidInput`] if the
    /// identifier is already taken.
    fn put_email(&self, email: &EmailRecord) -> impl Future<Output = Result<()>> + Send;
}

/// Deletes a record by identifier.
pub trait DeleteEmailApi {
    /// Deletes the record; returns false if nothing was stored under `message_id`.
    fn delete_email(&self, message_id: &str) -> impl Future<Output = Result<bool>> + Send;
}

/// Replaces a draft with its sent record in one transaction.
pub trait TransitionApi {
    /// Deletes the draft stored under `draft_id` and inserts `sent`, or
    /// writes nothing at all.
    fn transition(
        &self,
        draft_id: &str,
        sent: &EmailRecord,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Reads the month index.
pub trait QueryIndexApi {
    /// Returns one page of `partition` in descending update time, starting
    /// strictly after `start_after` when given.
    fn query_index(
        &self,
        partition: &PartitionKey,
        start_after: Option<&Cursor>,
    ) -> impl Future<Output = Result<IndexPage>> + Send;
}

/// Transmits a message.
pub trait SendEmailApi {
    /// Sends `email` and returns the identifier assigned by the transmission
    /// service.
    fn send_email(&self, email: &EmailRecord) -> impl Future<Output = Result<String>> + Send;
}
