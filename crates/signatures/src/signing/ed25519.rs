use std::fmt;

use base64::Engine;
use ed25519_dalek::pkcs8::spki::SubjectPublicKeyInfoRef;
use ed25519_dalek::pkcs8::{ALGORITHM_OID, DecodePrivateKey, DecodePublicKey, PrivateKeyInfo};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::error::SignatureError;

use super::FORGIVING_BASE64;
use super::header::ALGORITHM;
use super::key::{SigningKeyHandle, VerifyingKeyHandle};

/// Ed25519 private key imported for signing only.
pub struct Ed25519SigningKey {
    signing_key: SigningKey,
}

impl Ed25519SigningKey {
    /// Imports a base64 PKCS#8 DER private key.
    pub fn from_pkcs8_base64(encoded: &str) -> Result<Self, SignatureError> {
        let der = decode_key(encoded)?;
        let info = PrivateKeyInfo::try_from(der.as_slice())
            .map_err(|e| SignatureError::MalformedKey(format!("invalid PKCS#8 structure: {e}")))?;
        if info.algorithm.oid != ALGORITHM_OID {
            return Err(not_ed25519(&info.algorithm.oid));
        }

        let signing_key = SigningKey::from_pkcs8_der(&der)
            .map_err(|e| SignatureError::MalformedKey(format!("invalid Ed25519 private key: {e}")))?;
        Ok(Self { signing_key })
    }

    /// Builds a key directly from its 32-byte secret seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// The matching public half, for publishing or local verification.
    pub fn verifying_key(&self) -> Ed25519VerifyingKey {
        Ed25519VerifyingKey {
            verifying_key: self.signing_key.verifying_key(),
        }
    }
}

// Only the public half is printed.
impl fmt::Debug for Ed25519SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519SigningKey")
            .field("public_key", &self.verifying_key().public_key_bytes())
            .finish_non_exhaustive()
    }
}

impl SigningKeyHandle for Ed25519SigningKey {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, SignatureError> {
        Ok(self.signing_key.sign(data).to_bytes().to_vec())
    }

    fn algorithm(&self) -> &str {
        ALGORITHM
    }
}

/// Ed25519 public key imported for verification only.
#[derive(Clone)]
pub struct Ed25519VerifyingKey {
    verifying_key: VerifyingKey,
}

impl Ed25519VerifyingKey {
    /// Imports a base64 SPKI DER public key.
    pub fn from_spki_base64(encoded: &str) -> Result<Self, SignatureError> {
        let der = decode_key(encoded)?;
        let info = SubjectPublicKeyInfoRef::try_from(der.as_slice())
            .map_err(|e| SignatureError::MalformedKey(format!("invalid SPKI structure: {e}")))?;
        if info.algorithm.oid != ALGORITHM_OID {
            return Err(not_ed25519(&info.algorithm.oid));
        }

        let verifying_key = VerifyingKey::from_public_key_der(&der)
            .map_err(|e| SignatureError::MalformedKey(format!("invalid Ed25519 public key: {e}")))?;
        Ok(Self { verifying_key })
    }

    /// Raw 32-byte public key.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }
}

impl fmt::Debug for Ed25519VerifyingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ed25519VerifyingKey")
            .field("public_key", &self.public_key_bytes())
            .finish()
    }
}

impl VerifyingKeyHandle for Ed25519VerifyingKey {
    fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        self.verifying_key.verify(data, &signature).is_ok()
    }

    fn algorithm(&self) -> &str {
        ALGORITHM
    }
}

/// Imports a base64 SPKI Ed25519 public key for verification.
pub fn import_public_key(encoded: &str) -> Result<Ed25519VerifyingKey, SignatureError> {
    Ed25519VerifyingKey::from_spki_base64(encoded)
}

/// Imports a base64 PKCS#8 Ed25519 private key for signing.
pub fn import_private_key(encoded: &str) -> Result<Ed25519SigningKey, SignatureError> {
    Ed25519SigningKey::from_pkcs8_base64(encoded)
}

fn decode_key(encoded: &str) -> Result<Vec<u8>, SignatureError> {
    FORGIVING_BASE64
        .decode(encoded.trim())
        .map_err(|e| SignatureError::MalformedKey(format!("invalid base64: {e}")))
}

fn not_ed25519(oid: &impl fmt::Display) -> SignatureError {
    SignatureError::MalformedKey(format!("key algorithm {oid} is not Ed25519"))
}
