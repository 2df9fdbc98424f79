//! Base64url helpers matching the JWT wire convention.
//!
//! Encoding never emits `=`; decoding accepts input with or without the
//! trailing padding. Token segments are decoded strictly, key secrets leniently.

use std::borrow::Cow;

use base64::alphabet;
use base64::engine::general_purpose::{
    GeneralPurpose, GeneralPurposeConfig, STANDARD, URL_SAFE, URL_SAFE_NO_PAD,
};
use base64::engine::DecodePaddingMode;
use base64::{DecodeError, Engine as _};

/// Accepts non-canonical trailing bits and any padding.
const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode bytes as unpadded base64url.
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode base64url, restoring stripped padding first.
pub fn decode(input: &str) -> Result<Vec<u8>, DecodeError> {
    URL_SAFE.decode(restore_padding(input.trim()).as_bytes())
}

/// Decode a JWK `k` value: either alphabet, trailing bits ignored.
pub fn decode_key(input: &str) -> Result<Vec<u8>, DecodeError> {
    let normalized: String = input
        .trim()
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            c => c,
        })
        .collect();
    LENIENT_URL_SAFE.decode(restore_padding(&normalized).as_bytes())
}

/// Decode standard base64 (`+`, `/`), restoring stripped padding first.
pub fn decode_standard(input: &str) -> Result<Vec<u8>, DecodeError> {
    STANDARD.decode(restore_padding(input.trim()).as_bytes())
}

/// Pad with `=` until the length is a multiple of 4.
pub(crate) fn restore_padding(input: &str) -> Cow<'_, str> {
    match input.len() % 4 {
        0 => Cow::Borrowed(input),
        rem => {
            let mut padded = String::with_capacity(input.len() + 4 - rem);
            padded.push_str(input);
            padded.extend(std::iter::repeat('=').take(4 - rem));
            Cow::Owned(padded)
        }
    }
}
