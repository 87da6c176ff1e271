use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Model name under which books are kept in the datasource
pub const MODEL_NAME: &str = "Book";

/// Largest distance from the epoch, in milliseconds, that still names a
/// calendar date (±100,000,000 days).
pub const MAX_EPOCH_MILLIS: i64 = 8_640_000_000_000_000;

/// A stored book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Generated by the datasource, never changes
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    /// Written as epoch milliseconds
    #[serde(with = "epoch_millis")]
    pub created_date: OffsetDateTime,
}

/// Payload accepted by `create`; the id is always generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewBook {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    #[serde(with = "epoch_millis")]
    pub created_date: OffsetDateTime,
}

/// Payload accepted by `updateById`. Absent fields keep their stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BookPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    #[serde(with = "epoch_millis")]
    pub created_date: OffsetDateTime,
}

/// Milliseconds since the epoch for `date`
pub fn to_epoch_millis(date: OffsetDateTime) -> i64 {
    (date.unix_timestamp_nanos().div_euclid(1_000_000)) as i64
}

/// The date `millis` milliseconds after the epoch, if it is a calendar date
pub fn from_epoch_millis(millis: i64) -> Option<OffsetDateTime> {
    if millis.unsigned_abs() > MAX_EPOCH_MILLIS.unsigned_abs() {
        return None;
    }
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
}

/// Serde adapter storing an `OffsetDateTime` as integer epoch milliseconds.
pub mod epoch_millis {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(date: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(super::to_epoch_millis(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OffsetDateTime, D::Error> {
        let millis = i64::deserialize(deserializer)?;
        super::from_epoch_millis(millis).ok_or_else(|| {
            D::Error::custom(format!("{millis} is not a valid epoch-millisecond timestamp"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn book_round_trips_created_date_as_millis() {
        let book = Book {
            id: 1,
            title: Some("Dune".to_string()),
            pages: None,
            created_date: datetime!(2023-11-14 22:13:20 UTC),
        };

        let value = serde_json::to_value(&book).unwrap();
        assert_eq!(
            value,
            json!({"id": 1, "title": "Dune", "createdDate": 1_700_000_000_000_i64})
        );
        assert_eq!(serde_json::from_value::<Book>(value).unwrap(), book);
    }

    #[test]
    fn new_book_rejects_id_and_unknown_fields() {
        let with_id = json!({"id": 3, "createdDate": 0});
        assert!(serde_json::from_value::<NewBook>(with_id).is_err());

        let unknown = json!({"author": "Herbert", "createdDate": 0});
        assert!(serde_json::from_value::<NewBook>(unknown).is_err());
    }

    #[test]
    fn patch_skips_absent_fields_when_serialized() {
        let patch = BookPatch {
            title: None,
            pages: Some(320),
            created_date: OffsetDateTime::UNIX_EPOCH,
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"pages": 320, "createdDate": 0})
        );
    }

    #[test]
    fn epoch_millis_bounds() {
        assert_eq!(from_epoch_millis(0), Some(OffsetDateTime::UNIX_EPOCH));
        assert!(from_epoch_millis(MAX_EPOCH_MILLIS).is_some());
        assert!(from_epoch_millis(-MAX_EPOCH_MILLIS).is_some());
        assert!(from_epoch_millis(MAX_EPOCH_MILLIS + 1).is_none());
        assert!(from_epoch_millis(i64::MIN).is_none());
        assert_eq!(to_epoch_millis(datetime!(1969-12-31 23:59:59.999 UTC)), -1);
    }
}
