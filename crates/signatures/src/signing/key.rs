use crate::error::SignatureError;

/// Capability to sign canonical request bytes.
///
/// Implementations are sync — signing is CPU-bound.
/// For async backends (e.g. KMS), use `spawn_blocking`.
pub trait SigningKeyHandle: Send + Sync {
    /// Sign canonical bytes. Returns raw signature bytes.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, SignatureError>;

    /// Algorithm identifier string (e.g. "ed25519").
    fn algorithm(&self) -> &str;
}

/// Capability to check a signature over canonical request bytes.
pub trait VerifyingKeyHandle: Send + Sync {
    /// `false` for any mismatch, including a signature of the wrong length.
    fn verify(&self, data: &[u8], signature: &[u8]) -> bool;

    fn algorithm(&self) -> &str;
}
