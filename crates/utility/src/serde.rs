/// (De)serializes a `chrono::Duration` as `hh:mm:ss`. Hours may exceed 24.
pub mod duration {
    use chrono::Duration;
    use schemars::gen::SchemaGenerator;
    use schemars::schema::{InstanceType, Schema, SchemaObject};
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let total_seconds = duration.num_seconds();
        let sign = if total_seconds < 0 { "-" } else { "" };
        let total_seconds = total_seconds.abs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        let formatted = format!("{}{:02}:{:02}:{:02}", sign, hours, minutes, seconds);
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(D::Error::custom)
    }

    pub fn parse(s: &str) -> Result<Duration, String> {
        let (negative, s) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let parts: Vec<&str> = s.split(':').collect();

        if parts.len() != 3 {
            return Err(format!(
                "expected format hh:mm:ss, got {} component(s)",
                parts.len()
            ));
        }

        let hours: i64 = parts[0].parse().map_err(|why| format!("hours: {}", why))?;
        let minutes: i64 =
            parts[1].parse().map_err(|why| format!("minutes: {}", why))?;
        let seconds: i64 =
            parts[2].parse().map_err(|why| format!("seconds: {}", why))?;

        if !(0..60).contains(&minutes) || !(0..60).contains(&seconds) {
            return Err("minutes and seconds must be between 0 and 59".to_owned());
        }

        let duration = Duration::hours(hours)
            + Duration::minutes(minutes)
            + Duration::seconds(seconds);
        Ok(if negative { -duration } else { duration })
    }

    pub fn schema(_gen: &mut SchemaGenerator) -> Schema {
        SchemaObject {
            instance_type: Some(InstanceType::String.into()),
            format: Some("hh:mm:ss".to_owned()),
            ..Default::default()
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Trip {
        #[serde(with = "super::duration")]
        duration: Duration,
    }

    #[test]
    fn duration_uses_hh_mm_ss() {
        let trip = Trip {
            duration: Duration::minutes(95) + Duration::seconds(7),
        };
        let json = serde_json::to_string(&trip).unwrap();
        assert_eq!(json, r#"{"duration":"01:35:07"}"#);
        assert_eq!(serde_json::from_str::<Trip>(&json).unwrap(), trip);
    }

    #[test]
    fn duration_rejects_malformed_input() {
        assert!(serde_json::from_str::<Trip>(r#"{"duration":"01:35"}"#).is_err());
        assert!(serde_json::from_str::<Trip>(r#"{"duration":"01:75:00"}"#).is_err());
    }
}
