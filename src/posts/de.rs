//! Numeric fields arrive from the frontend as either JSON numbers or
//! numeric strings. The create path rejects garbage; the update path drops
//! it so the stored field stays unchanged.

use serde::{Deserialize, Deserializer, de::Error};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    Num(i64),
    Str(String),
}

/// Accepts `1200` or `"1200"`; anything unparsable is a deserialization error.
pub fn flexible_i64<'de, D>(de: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumOrStr>::deserialize(de)? {
        None => Ok(None),
        Some(NumOrStr::Num(n)) => Ok(Some(n)),
        Some(NumOrStr::Str(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected an integer, got {s:?}"))),
    }
}

/// Like [`flexible_i64`] but unparsable input becomes `None`.
pub fn lenient_i64<'de, D>(de: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumOrStr>::deserialize(de)? {
        Some(NumOrStr::Num(n)) => Ok(Some(n)),
        Some(NumOrStr::Str(s)) => Ok(s.trim().parse().ok()),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Strict {
        #[serde(default, deserialize_with = "super::flexible_i64")]
        n: Option<i64>,
    }

    #[derive(Deserialize)]
    struct Lenient {
        #[serde(default, deserialize_with = "super::lenient_i64")]
        n: Option<i64>,
    }

    #[test]
    fn flexible_accepts_numbers_and_numeric_strings() {
        let a: Strict = serde_json::from_str(r#"{"n": 1200}"#).unwrap();
        let b: Strict = serde_json::from_str(r#"{"n": "1200"}"#).unwrap();
        let c: Strict = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(a.n, Some(1200));
        assert_eq!(b.n, Some(1200));
        assert_eq!(c.n, None);
    }

    #[test]
    fn flexible_rejects_garbage() {
        assert!(serde_json::from_str::<Strict>(r#"{"n": "lots"}"#).is_err());
    }

    #[test]
    fn lenient_drops_garbage() {
        let a: Lenient = serde_json::from_str(r#"{"n": "lots"}"#).unwrap();
        let b: Lenient = serde_json::from_str(r#"{"n": "3"}"#).unwrap();
        assert_eq!(a.n, None);
        assert_eq!(b.n, Some(3));
    }
}
