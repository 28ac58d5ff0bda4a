use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};
use mongodb::bson::DateTime as BsonDateTime;

pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

pub fn chrono_to_bson(dt: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(dt.timestamp_millis())
}

pub fn bson_to_chrono(dt: BsonDateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis()).unwrap_or_default()
}

/// Calendar-day key (`YYYY-MM-DD`) used for task dates.
pub fn day_key(date: NaiveDate) -> String {
    date.format(DAY_KEY_FORMAT).to_string()
}

/// Today's key in the server's local time zone.
pub fn today_key() -> String {
    day_key(Local::now().date_naive())
}

/// Widest offset any time zone uses (UTC+14).
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Today's key for a client `offset_minutes` east of UTC.
pub fn today_key_at_offset(offset_minutes: i32) -> Option<String> {
    if offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
        return None;
    }
    let offset = FixedOffset::east_opt(offset_minutes * 60)?;
    Some(day_key(Utc::now().with_timezone(&offset).date_naive()))
}

/// A well-formed key for a day that some time zone is on right now.
pub fn is_current_day_key(value: &str) -> bool {
    match NaiveDate::parse_from_str(value, DAY_KEY_FORMAT) {
        Ok(date) => (date - Utc::now().date_naive()).num_days().abs() <= 1,
        Err(_) => false,
    }
}

/// Serde adapter storing `DateTime<Utc>` as a BSON datetime.
pub mod bson_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson::DateTime as BsonDateTime;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        super::chrono_to_bson(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        BsonDateTime::deserialize(deserializer).map(super::bson_to_chrono)
    }
}

pub mod bson_datetime_option {
    use chrono::{DateTime, Utc};
    use mongodb::bson::DateTime as BsonDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_some(&super::chrono_to_bson(*dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value: Option<BsonDateTime> = Option::deserialize(deserializer)?;
        Ok(value.map(super::bson_to_chrono))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_key_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(day_key(date), "2026-03-07");
    }

    #[test]
    fn current_day_key_accepts_neighbouring_days_only() {
        let today = Utc::now().date_naive();
        assert!(is_current_day_key(&day_key(today)));
        assert!(is_current_day_key(&day_key(today.pred_opt().unwrap())));
        assert!(is_current_day_key(&day_key(today.succ_opt().unwrap())));
        assert!(!is_current_day_key(&day_key(today - chrono::Duration::days(3))));
        assert!(!is_current_day_key("07/03/2026"));
    }

    #[test]
    fn offset_day_follows_client_clock() {
        let now = Utc::now();
        let ist = FixedOffset::east_opt(330 * 60).unwrap();
        assert_eq!(
            today_key_at_offset(330).as_deref(),
            Some(day_key(now.with_timezone(&ist).date_naive()).as_str())
        );
        assert_eq!(today_key_at_offset(0), Some(day_key(now.date_naive())));
        assert!(today_key_at_offset(15 * 60).is_none());
        assert!(today_key_at_offset(-15 * 60).is_none());
    }

    #[test]
    fn bson_conversion_keeps_milliseconds() {
        let now = DateTime::<Utc>::from_timestamp_millis(1_760_000_000_123).unwrap();
        assert_eq!(bson_to_chrono(chrono_to_bson(now)), now);
    }
}
