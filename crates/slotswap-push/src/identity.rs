//! Reads the account identity out of a stored JWT credential.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use tracing::debug;

/// Base64url decoder that accepts both padded and unpadded payloads.
/// Issuers differ on whether they keep the padding.
const PAYLOAD_B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Best-effort read of the `sub` claim from an encoded JWT.
///
/// No signature verification happens here; the server re-checks the token on
/// every call anyway. The value only decides whether a push subscription can
/// be opened and labels it in logs. Returns `None` for anything that does not
/// look like a token. Never panics, never errors.
pub fn subject_of(token: &str) -> Option<String> {
    let payload = match token.split('.').nth(1) {
        Some(segment) if !segment.is_empty() => segment,
        _ => {
            debug!("Credential has no payload segment");
            return None;
        }
    };

    let bytes = match PAYLOAD_B64.decode(payload) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Credential payload is not base64url: {}", e);
            return None;
        }
    };

    let claims: serde_json::Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => {
            debug!("Credential payload is not JSON: {}", e);
            return None;
        }
    };

    claims.get("sub").and_then(|sub| sub.as_str()).map(str::to_owned)
}
