//! Month listing workflow.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::api::QueryIndexApi;
use super::index::{Cursor, PartitionKey, RawIndexEntry, YearMonth};
use super::model::{EmailType, TimeIndex};
use crate::{Error, Result};

/// One listing request: a type, a month and an optional continuation token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Record type to list.
    pub email_type: EmailType,
    /// Month to list.
    pub year_month: YearMonth,
    /// Token from the previous page, absent on the first call.
    pub cursor: Option<Cursor>,
}

impl ListQuery {
    /// Builds a query from textual arguments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the year is not four digits, the
    /// month not two digits, or the token is malformed.
    pub fn parse(
        email_type: EmailType,
        year: &str,
        month: &str,
        cursor: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            email_type,
            year_month: YearMonth::parse(year, month)?,
            cursor: cursor.map(Cursor::decode).transpose()?,
        })
    }

    /// Partition this query reads.
    #[must_use]
    pub const fn partition_key(&self) -> PartitionKey {
        PartitionKey::new(self.email_type, self.year_month)
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult {
    /// Entries, most recently updated first.
    pub items: Vec<TimeIndex>,
    /// Token for the next page; absent once the month is exhausted.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub next_cursor: Option<Cursor>,
}

impl IntoIterator for ListResult {
    type Item = TimeIndex;
    type IntoIter = std::vec::IntoIter<TimeIndex>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Lists one page of a month partition, newest first.
///
/// # Errors
///
/// - [`Error::InvalidInput`] if the cursor belongs to another partition.
/// - [`Error::Decode`] if any stored entry on the page is malformed; no
///   partial page is returned.
/// - The store's error if the query fails.
pub async fn list_by_year_month<Q>(store: &Q, query: &ListQuery) -> Result<ListResult>
where
    Q: QueryIndexApi,
{
    let partition = query.partition_key();
    let partition_text = partition.to_string();

    if let Some(cursor) = &query.cursor {
        if cursor.partition() != partition_text {
            return Err(Error::InvalidInput(format!(
                "cursor belongs to {}, not {partition_text}",
                cursor.partition()
            )));
        }
    }

    debug!(partition = %partition_text, "Querying month index");
    let page = store.query_index(&partition, query.cursor.as_ref()).await?;

    let items = page
        .entries
        .into_iter()
        .map(|entry| decode_entry(entry, &partition_text))
        .collect::<Result<Vec<_>>>()
        .inspect_err(|e| warn!(partition = %partition_text, error = %e, "Index entry rejected"))?;

    Ok(ListResult {
        items,
        next_cursor: page.last_evaluated,
    })
}

fn decode_entry(entry: RawIndexEntry, partition: &str) -> Result<TimeIndex> {
    if entry.type_year_month != partition {
        return Err(Error::Decode(format!(
            "{} belongs to {}, not {partition}",
            entry.message_id, entry.type_year_month
        )));
    }
    entry.into_time_index()
}
