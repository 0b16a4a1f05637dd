//! Single-record operations.

use tracing::info;

use super::api::{DeleteEmailApi, GetEmailApi};
use super::model::EmailRecord;
use crate::{Error, Result};

/// Loads a record by identifier.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if nothing is stored under `message_id`, or
/// [`Error::Decode`] if the stored record is malformed.
pub async fn get<S>(store: &S, message_id: &str) -> Result<EmailRecord>
where
    S: GetEmailApi,
{
    store
        .get_email(message_id)
        .await?
        .ok_or_else(|| Error::NotFound(message_id.to_owned()))
}

/// Deletes a record by identifier.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if nothing is stored under `message_id`.
pub async fn delete<S>(store: &S, message_id: &str) -> Result<()>
where
    S: DeleteEmailApi,
{
    if !store.delete_email(message_id).await? {
        return Err(Error::NotFound(message_id.to_owned()));
    }
    info!(message_id, "Email deleted");
    Ok(())
}
