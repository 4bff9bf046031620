use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Parses a raw JSON body. Blank bodies deserialize as the default value so
/// callers can omit `{}`.
pub fn json_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::Input(format!("invalid request body: {}", e)))
}

#[cfg(test)]
mod body_tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Sample {
        #[serde(default)]
        n: u32,
    }

    #[test]
    fn blank_body_is_default() {
        assert_eq!(json_body::<Sample>(&Bytes::from_static(b" \n")).unwrap(), Sample::default());
    }

    #[test]
    fn bad_json_is_input_error() {
        let err = json_body::<Sample>(&Bytes::from_static(b"{n:")).unwrap_err();
        assert!(matches!(err, ApiError::Input(msg) if msg.starts_with("invalid request body")));
    }

    #[test]
    fn wrong_shape_is_input_error() {
        assert!(json_body::<Sample>(&Bytes::from_static(b"[1, 2]")).is_err());
    }
}
