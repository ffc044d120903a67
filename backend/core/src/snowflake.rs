//! Snowflake id (de)serialization.
//!
//! Discord sends 64-bit ids as JSON strings, but hand-written payloads and
//! older tooling use plain numbers. Both are accepted; ids are written back
//! as strings.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};

/// Numeric id assigned by the remote service.
pub type Snowflake = u64;

struct SnowflakeVisitor;

impl<'de> Visitor<'de> for SnowflakeVisitor {
    type Value = Snowflake;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a snowflake id as a string or unsigned integer")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        u64::try_from(v).map_err(|_| E::custom(format!("negative snowflake: {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse::<u64>()
            .map_err(|_| E::custom(format!("invalid snowflake: {v:?}")))
    }
}

/// Parse a snowflake out of an already-parsed JSON value.
pub fn from_value(value: &serde_json::Value) -> Option<Snowflake> {
    match value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

pub fn serialize<S: Serializer>(id: &Snowflake, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&id.to_string())
}

pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Snowflake, D::Error> {
    d.deserialize_any(SnowflakeVisitor)
}

/// `Option<Snowflake>` variant, for use with `#[serde(with = "snowflake::option")]`.
pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(id: &Option<Snowflake>, s: S) -> Result<S::Ok, S::Error> {
        match id {
            Some(id) => s.serialize_str(&id.to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Snowflake>, D::Error> {
        struct OptionVisitor;

        impl<'de> Visitor<'de> for OptionVisitor {
            type Value = Option<Snowflake>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an optional snowflake id")
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(None)
            }

            fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
                d.deserialize_any(SnowflakeVisitor).map(Some)
            }
        }

        d.deserialize_option(OptionVisitor)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "crate::snowflake")]
        id: u64,
        #[serde(default, with = "crate::snowflake::option")]
        guild_id: Option<u64>,
    }

    #[test]
    fn accepts_strings_and_numbers() {
        let a: Holder = serde_json::from_str(r#"{"id":"886696135069155348"}"#).unwrap();
        let b: Holder = serde_json::from_str(r#"{"id":1234,"guild_id":"42"}"#).unwrap();
        assert_eq!(a.id, 886696135069155348);
        assert_eq!(a.guild_id, None);
        assert_eq!(b.id, 1234);
        assert_eq!(b.guild_id, Some(42));
    }

    #[test]
    fn writes_strings() {
        let json = serde_json::to_string(&Holder { id: 7, guild_id: None }).unwrap();
        assert_eq!(json, r#"{"id":"7","guild_id":null}"#);
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_str::<Holder>(r#"{"id":"abc"}"#).is_err());
        assert!(serde_json::from_str::<Holder>(r#"{"id":-3}"#).is_err());
    }

    #[test]
    fn reads_from_value() {
        assert_eq!(super::from_value(&serde_json::json!("99")), Some(99));
        assert_eq!(super::from_value(&serde_json::json!(99)), Some(99));
        assert_eq!(super::from_value(&serde_json::json!(true)), None);
    }
}
