//! Month index keys, continuation cursors and raw index entries.
//!
//! Records are listed through a composite index whose partition key is
//! `{type}#{YYYY}-{MM}` and whose sort key is the update time. Both the write
//! path and the read path render the partition key through [`YearMonth`], so
//! the two can never disagree on padding.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::model::{EmailType, TimeIndex};
use crate::{Error, Result};

/// Textual format of `time_updated`, second precision, UTC.
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Formats a timestamp with [`TIME_FORMAT`].
#[must_use]
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Parses a stored timestamp.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the text does not match [`TIME_FORMAT`].
pub fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, TIME_FORMAT)
        .map(|t| t.and_utc())
        .map_err(|e| Error::Decode(format!("invalid time {s:?}: {e}")))
}

/// Serde helpers for timestamps in [`TIME_FORMAT`].
pub(crate) mod time_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_time(time))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, super::TIME_FORMAT)
            .map(|t| t.and_utc())
            .map_err(serde::de::Error::custom)
    }
}

/// A calendar month, the time component of a partition key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Creates a year-month.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] unless `year` has four digits and
    /// `month` is in `1..=12`.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1000..=9999).contains(&year) {
            return Err(Error::InvalidInput(format!(
                "year must have four digits: {year}"
            )));
        }
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidInput(format!("month out of range: {month}")));
        }
        Ok(Self { year, month })
    }

    /// The month a timestamp falls in.
    #[must_use]
    pub fn from_time(time: &DateTime<Utc>) -> Self {
        Self {
            year: time.year(),
            month: time.month(),
        }
    }

    /// Parses the textual year and month of a listing request.
    ///
    /// The year must be exactly four digits and the month exactly two digits;
    /// `"3"` is rejected rather than padded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] on any other shape.
    pub fn parse(year: &str, month: &str) -> Result<Self> {
        let digits = |s: &str, len: usize| s.len() == len && s.bytes().all(|b| b.is_ascii_digit());

        if !digits(year, 4) {
            return Err(Error::InvalidInput(format!(
                "year must be four digits: {year:?}"
            )));
        }
        if !digits(month, 2) {
            return Err(Error::InvalidInput(format!(
                "month must be two digits: {month:?}"
            )));
        }

        let year = year
            .parse()
            .map_err(|_| Error::InvalidInput(format!("invalid year: {year:?}")))?;
        let month = month
            .parse()
            .map_err(|_| Error::InvalidInput(format!("invalid month: {month:?}")))?;
        Self::new(year, month)
    }

    /// Four-digit year.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Month, 1 through 12.
    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Partition key of the month index: `{type}#{YYYY}-{MM}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartitionKey {
    email_type: EmailType,
    year_month: YearMonth,
}

impl PartitionKey {
    /// Creates a partition key.
    #[must_use]
    pub const fn new(email_type: EmailType, year_month: YearMonth) -> Self {
        Self {
            email_type,
            year_month,
        }
    }

    /// Partition of a record of `email_type` updated at `time`.
    #[must_use]
    pub fn for_time(email_type: EmailType, time: &DateTime<Utc>) -> Self {
        Self::new(email_type, YearMonth::from_time(time))
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.email_type, self.year_month)
    }
}

/// An index entry exactly as stored, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawIndexEntry {
    /// Stored identifier.
    pub message_id: String,
    /// Stored type text.
    pub email_type: String,
    /// Stored time text.
    pub time_updated: String,
    /// Stored partition key.
    pub type_year_month: String,
}

impl RawIndexEntry {
    /// Validates the entry and converts it into a [`TimeIndex`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the type or time cannot be parsed, or if
    /// the stored partition key differs from the one derived from them.
    pub fn into_time_index(self) -> Result<TimeIndex> {
        if self.message_id.is_empty() {
            return Err(Error::Decode("index entry without message id".into()));
        }
        let email_type: EmailType = self.email_type.parse().map_err(|_| {
            Error::Decode(format!(
                "{}: unknown email type {:?}",
                self.message_id, self.email_type
            ))
        })?;
        let time_updated = parse_time(&self.time_updated)?;

        let derived = PartitionKey::for_time(email_type, &time_updated).to_string();
        if derived != self.type_year_month {
            return Err(Error::Decode(format!(
                "{}: stored partition {:?} does not match {:?}",
                self.message_id, self.type_year_month, derived
            )));
        }

        Ok(TimeIndex {
            message_id: self.message_id,
            email_type,
            time_updated,
        })
    }
}

/// One page read from the month index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexPage {
    /// Entries in descending update time.
    pub entries: Vec<RawIndexEntry>,
    /// Position of the last entry when more entries follow.
    pub last_evaluated: Option<Cursor>,
}

/// Continuation token: the index position of the last entry of a page.
///
/// Serialized as an opaque URL-safe string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    type_year_month: String,
    time_updated: String,
    message_id: String,
}

#[derive(Deserialize)]
struct CursorFields {
    p: String,
    t: String,
    id: String,
}

impl Cursor {
    /// Position of a stored entry.
    #[must_use]
    pub fn from_entry(entry: &RawIndexEntry) -> Self {
        Self {
            type_year_month: entry.type_year_month.clone(),
            time_updated: entry.time_updated.clone(),
            message_id: entry.message_id.clone(),
        }
    }

    /// Partition the cursor points into.
    #[must_use]
    pub fn partition(&self) -> &str {
        &self.type_year_month
    }

    /// Stored update time of the boundary entry.
    #[must_use]
    pub fn time_updated(&self) -> &str {
        &self.time_updated
    }

    /// Identifier of the boundary entry.
    #[must_use]
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Encodes the cursor as an opaque token.
    #[must_use]
    pub fn encode(&self) -> String {
        let json = serde_json::json!({
            "p": self.type_year_month,
            "t": self.time_updated,
            "id": self.message_id,
        });
        URL_SAFE_NO_PAD.encode(json.to_string())
    }

    /// Decodes a token produced by [`Cursor::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the token is malformed.
    pub fn decode(token: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| Error::InvalidInput(format!("malformed cursor: {e}")))?;
        let fields: CursorFields = serde_json::from_slice(&bytes)
            .map_err(|e| Error::InvalidInput(format!("malformed cursor: {e}")))?;
        Ok(Self {
            type_year_month: fields.p,
            time_updated: fields.t,
            message_id: fields.id,
        })
    }
}

impl Serialize for Cursor {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        Self::decode(&token).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(id: &str, email_type: &str, time: &str, partition: &str) -> RawIndexEntry {
        RawIndexEntry {
            message_id: id.into(),
            email_type: email_type.into(),
            time_updated: time.into(),
            type_year_month: partition.into(),
        }
    }

    #[test]
    fn test_time_round_trip() {
        let time = Utc.with_ymd_and_hms(2022, 3, 16, 16, 55, 45).unwrap();
        let text = format_time(&time);
        assert_eq!(text, "2022-03-16T16:55:45Z");
        assert_eq!(parse_time(&text).unwrap(), time);
        assert!(matches!(parse_time("2022-03-16"), Err(Error::Decode(_))));
    }

    #[test]
    fn test_year_month_parse_is_strict() {
        let ym = YearMonth::parse("2022", "03").unwrap();
        assert_eq!((ym.year(), ym.month()), (2022, 3));
        assert_eq!(ym.to_string(), "2022-03");

        for (year, month) in [
            ("2022", "3"),
            ("22", "03"),
            ("2022", "13"),
            ("2022", "00"),
            ("20x2", "03"),
            ("2022", "+3"),
        ] {
            assert!(
                matches!(YearMonth::parse(year, month), Err(Error::InvalidInput(_))),
                "{year}-{month} should be rejected"
            );
        }
    }

    #[test]
    fn test_partition_key_same_on_both_paths() {
        let time = Utc.with_ymd_and_hms(2022, 3, 1, 0, 0, 0).unwrap();
        let written = PartitionKey::for_time(EmailType::Draft, &time);
        let read = PartitionKey::new(EmailType::Draft, YearMonth::parse("2022", "03").unwrap());

        assert_eq!(written, read);
        assert_eq!(written.to_string(), "draft#2022-03");
    }

    #[test]
    fn test_raw_entry_conversion() {
        let index = entry("abc", "sent", "2022-03-16T16:55:45Z", "sent#2022-03")
            .into_time_index()
            .unwrap();
        assert_eq!(index.message_id, "abc");
        assert_eq!(index.email_type, EmailType::Sent);
        assert_eq!(format_time(&index.time_updated), "2022-03-16T16:55:45Z");
    }

    #[test]
    fn test_raw_entry_rejects_malformed() {
        let bad = [
            entry("abc", "inbox", "2022-03-16T16:55:45Z", "inbox#2022-03"),
            entry("abc", "sent", "yesterday", "sent#2022-03"),
            entry("abc", "sent", "2022-03-16T16:55:45Z", "sent#2022-3"),
            entry("abc", "sent", "2022-03-16T16:55:45Z", "draft#2022-03"),
            entry("", "sent", "2022-03-16T16:55:45Z", "sent#2022-03"),
        ];
        for raw in bad {
            assert!(matches!(raw.into_time_index(), Err(Error::Decode(_))));
        }
    }

    #[test]
    fn test_cursor_token() {
        let cursor = Cursor::from_entry(&entry(
            "abc",
            "sent",
            "2022-03-16T16:55:45Z",
            "sent#2022-03",
        ));
        let token = cursor.encode();
        assert!(!token.contains('='));
        assert_eq!(Cursor::decode(&token).unwrap(), cursor);

        let json = serde_json::to_string(&cursor).unwrap();
        assert_eq!(json, format!("\"{token}\""));
        assert_eq!(serde_json::from_str::<Cursor>(&json).unwrap(), cursor);

        assert!(matches!(
            Cursor::decode("not a token"),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            Cursor::decode(&URL_SAFE_NO_PAD.encode("{}")),
            Err(Error::InvalidInput(_))
        ));
    }
}
