//! Serde support for `0x` prefixed hex encoded byte vectors.

use {
    serde::{Deserialize, Deserializer, Serializer, de},
    std::borrow::Cow,
};

pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Cow::<str>::deserialize(deserializer)?;
    let s = s
        .strip_prefix("0x")
        .ok_or_else(|| de::Error::custom(format!("{s:?} missing \"0x\" prefix")))?;
    hex::decode(s).map_err(|err| de::Error::custom(format!("invalid hex: {err}")))
}
