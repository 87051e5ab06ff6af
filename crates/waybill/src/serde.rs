use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Visitor};

use crate::TrackingId;

/// Serializes as the rendered tracking number: an upper-case base-36 string.
///
/// The string is the canonical external form of an id; surrounding layers
/// persist and index it, so the id never appears as a bare integer on the
/// wire.
impl Serialize for TrackingId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.encode().as_str())
    }
}

/// Deserializes from a rendered tracking number.
///
/// Accepts what [`TrackingId::decode`] accepts: 1 to 13 base-36 characters
/// (lower-case tolerated), within the 63-bit id space.
impl<'de> Deserialize<'de> for TrackingId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct Base36Visitor;

        impl Visitor<'_> for Base36Visitor {
            type Value = TrackingId;

            fn expecting(&self, formatter: &mut core::fmt::Formatter) -> core::fmt::Result {
                formatter.write_str("a base-36 encoded tracking number")
            }

            #[inline]
            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                TrackingId::decode(v).map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_str(Base36Visitor)
    }
}

#[cfg(test)]
mod tests {
    use crate::{DecodeError, TrackingId};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(PartialEq, Eq, Debug, Serialize, Deserialize)]
    struct Record {
        tracking_number: TrackingId,
    }

    #[test]
    fn serializes_as_base36_string() {
        let record = Record {
            tracking_number: TrackingId::from_raw(46),
        };

        let json = serde_json::to_string(&record).expect("serialize");
        assert_eq!(json, json!({"tracking_number": "1A"}).to_string());
        let back: Record = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, record);
    }

    #[test]
    fn roundtrips_boundary_ids() {
        for id in [
            TrackingId::from_raw(0),
            TrackingId::from_parts(12_345, 678, 90),
            TrackingId::from_raw(TrackingId::MAX_RAW),
        ] {
            let json = serde_json::to_string(&id).expect("serialize");
            let back: TrackingId = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(back, id);
        }
    }

    #[test]
    fn accepts_lowercase_input() {
        let id: TrackingId = serde_json::from_value(json!("1a")).expect("deserialize");
        assert_eq!(id, TrackingId::from_raw(46));
    }

    #[test]
    fn rejects_invalid_strings() {
        let err = serde_json::from_value::<TrackingId>(json!("TRACK-1"))
            .expect_err("dash is not base-36");
        assert!(
            err.to_string().contains(
                &DecodeError::InvalidAscii {
                    byte: b'-',
                    index: 5
                }
                .to_string()
            )
        );

        serde_json::from_value::<TrackingId>(json!("")).expect_err("empty string");
        serde_json::from_value::<TrackingId>(json!(42)).expect_err("not a string");
    }

    #[test]
    fn rejects_reserved_bit_values() {
        let above = crate::encode_base36(TrackingId::MAX_RAW + 1);
        let err = serde_json::from_value::<TrackingId>(json!(above)).expect_err("top bit set");
        assert!(err.to_string().contains(&DecodeError::Overflow.to_string()));
    }
}
