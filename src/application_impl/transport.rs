//! Transport form of refresh tokens: standard padded base64 of the signed
//! compact string.

use crate::application_port::{EncodedRefreshToken, RefreshToken, TokenError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

pub fn encode_transport(token: &RefreshToken) -> EncodedRefreshToken {
    EncodedRefreshToken(STANDARD.encode(token.0.as_bytes()))
}

pub fn decode_transport(encoded: &str) -> Result<RefreshToken, TokenError> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|_| TokenError::Malformed)?;
    let token = String::from_utf8(bytes).map_err(|_| TokenError::Malformed)?;
    Ok(RefreshToken(token))
}
