//! Serde helpers for extended-JSON encodings of dates and identifiers
//!
//! Records are rendered the way document-store clients expect them:
//! dates as `{"$date": "<rfc3339>"}` and identifiers as `{"$uuid": "<uuid>"}`.

/// `DateTime<Utc>` <-> `{"$date": "2024-01-01T00:00:00.000Z"}`
pub mod date {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct ExtDate {
        #[serde(rename = "$date")]
        date: String,
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        ExtDate {
            date: value.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = ExtDate::deserialize(deserializer)?;

        DateTime::parse_from_rfc3339(&raw.date)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

/// `Uuid` <-> `{"$uuid": "xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx"}`
pub mod id {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use uuid::Uuid;

    #[derive(Serialize, Deserialize)]
    struct ExtUuid {
        #[serde(rename = "$uuid")]
        uuid: Uuid,
    }

    pub fn serialize<S>(value: &Uuid, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        ExtUuid { uuid: *value }.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Uuid, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(ExtUuid::deserialize(deserializer)?.uuid)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        #[serde(rename = "_id", with = "super::id")]
        id: uuid::Uuid,
        #[serde(with = "super::date")]
        at: chrono::DateTime<Utc>,
    }

    #[test]
    fn test_extended_shape() {
        let sample = Sample {
            id: uuid::Uuid::nil(),
            at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        };

        let value = serde_json::to_value(&sample).unwrap();
        assert_eq!(value["at"]["$date"], "2024-03-01T12:00:00.000Z");
        assert_eq!(value["_id"]["$uuid"], "00000000-0000-0000-0000-000000000000");

        let parsed: Sample = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, sample);
    }
}
