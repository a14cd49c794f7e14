use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use sha2::{Digest, Sha256};

/// SHA-256 of the raw body, standard padded base64.
///
/// An empty body is hashed like any other input.
pub fn digest_base64(body: &[u8]) -> String {
    BASE64.encode(Sha256::digest(body))
}
