use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de, Deserialize, Deserializer};
use std::{fmt::Display, str::FromStr};

/// Trims an optional string; blank becomes `None`.
pub fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Parses an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Deserializes a number given either as a JSON number or a numeric string.
///
/// `null`, a missing field and blank strings all yield `None`.
pub fn lenient_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => n
            .to_string()
            .parse()
            .map(Some)
            .map_err(de::Error::custom),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(serde_json::Value::String(s)) => {
            s.trim().parse().map(Some).map_err(de::Error::custom)
        }
        Some(other) => Err(de::Error::custom(format!(
            "expected a number, found {}",
            other
        ))),
    }
}

/// Distinguishes an omitted field (`None`) from an explicit `null` (`Some(None)`).
///
/// Use with `#[serde(default, deserialize_with = "nullable")]`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Deserializes a boolean given as a JSON bool or the strings `true`/`false`.
pub fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Bool(b)) => Ok(Some(b)),
        Some(serde_json::Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            "" => Ok(None),
            other => Err(de::Error::custom(format!(
                "expected a boolean, found {}",
                other
            ))),
        },
        Some(other) => Err(de::Error::custom(format!(
            "expected a boolean, found {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Body {
        #[serde(default, deserialize_with = "lenient_number")]
        quantity: Option<i32>,
        #[serde(default, deserialize_with = "lenient_number")]
        selling_price: Option<Decimal>,
        #[serde(default, deserialize_with = "lenient_bool")]
        is_active: Option<bool>,
        #[serde(default, deserialize_with = "nullable")]
        phone: Option<Option<String>>,
    }

    #[test]
    fn numbers_accept_strings_and_numbers() {
        let body: Body =
            serde_json::from_str(r#"{"quantity":"12","sellingPrice":19.99,"isActive":"false"}"#)
                .unwrap();
        assert_eq!(body.quantity, Some(12));
        assert_eq!(body.selling_price, Some(Decimal::from_str("19.99").unwrap()));
        assert_eq!(body.is_active, Some(false));

        let body: Body = serde_json::from_str(r#"{"quantity":-4,"sellingPrice":"  "}"#).unwrap();
        assert_eq!(body.quantity, Some(-4));
        assert_eq!(body.selling_price, None);
        assert_eq!(body.is_active, None);
    }

    #[test]
    fn garbage_numbers_are_rejected() {
        assert!(serde_json::from_str::<Body>(r#"{"sellingPrice":"abc"}"#).is_err());
        assert!(serde_json::from_str::<Body>(r#"{"quantity":[1]}"#).is_err());
        assert!(serde_json::from_str::<Body>(r#"{"isActive":"maybe"}"#).is_err());
    }

    #[test]
    fn nullable_separates_absent_from_null() {
        let absent: Body = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.phone, None);
        let null: Body = serde_json::from_str(r#"{"phone":null}"#).unwrap();
        assert_eq!(null.phone, Some(None));
        let set: Body = serde_json::from_str(r#"{"phone":"555"}"#).unwrap();
        assert_eq!(set.phone, Some(Some("555".into())));
    }

    #[test]
    fn clean_trims_and_drops_blank() {
        assert_eq!(clean(Some("  ".into())), None);
        assert_eq!(clean(None), None);
        assert_eq!(clean(Some(" Acme ".into())), Some("Acme".into()));
    }

    #[test]
    fn timestamps_accept_dates_and_rfc3339() {
        let day = parse_timestamp("2024-03-01").unwrap();
        assert_eq!(day.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        let ts = parse_timestamp("2024-03-01T10:30:00+02:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-01T08:30:00+00:00");
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn email_pattern() {
        assert!(is_valid_email("alice@x.com"));
        assert!(!is_valid_email("alice@x"));
        assert!(!is_valid_email("al ice@x.com"));
        assert!(!is_valid_email("@x.com"));
    }
}
