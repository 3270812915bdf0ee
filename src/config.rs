use {
    base64ct::{Base64, Encoding, Error},
    hmac::{Hmac, NewMac},
    rocket::serde::{de, Deserialize},
    sha2::Sha256,
    std::fmt,
};

#[derive(Debug, Deserialize)]
pub struct Config {
    /// The key used for signing session JWTs. Should be base64 decodable.
    #[serde(deserialize_with = "deserialize_base64_to_hmac")]
    pub jwt_key: Hmac<Sha256>,

    /// How long a session cookie stays valid, in days.
    #[serde(default = "default_session_days")]
    pub session_days: u64,

    /// Venue capacity shown on the check-in station and the dashboard.
    #[serde(default = "default_station_capacity")]
    pub station_capacity: u32,
}

fn default_session_days() -> u64 {
    30
}

fn default_station_capacity() -> u32 {
    500
}

/// Deserializes standard base64 in constant time into a [`std::vec::Vec`] of [`u8`]s.
fn deserialize_base64_to_hmac<'de, D: de::Deserializer<'de>>(
    de: D,
) -> Result<Hmac<Sha256>, D::Error> {
    use de::Unexpected::Str;

    struct Visitor;

    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Hmac<Sha256>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("padded base64 string")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
            let bytes = Base64::decode_vec(value).map_err(|err| match err {
                Error::InvalidEncoding => E::invalid_value(Str(value), &"a base64 string"),
                Error::InvalidLength => unreachable!(),
            })?;
            self.visit_bytes(&bytes)
        }

        fn visit_bytes<E: de::Error>(self, value: &[u8]) -> Result<Self::Value, E> {
            Ok(Hmac::new_from_slice(value).unwrap())
        }
    }

    de.deserialize_any(Visitor)
}
