mod key;
mod ed25519;
mod date;
mod digest;
mod canonical;
mod header;
mod request;
mod verifier;
mod signer;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

pub use key::{SigningKeyHandle, VerifyingKeyHandle};
pub use ed25519::{Ed25519SigningKey, Ed25519VerifyingKey, import_private_key, import_public_key};
pub use date::{format_date, parse_date};
pub use digest::digest_base64;
pub use canonical::{CanonicalRequest, Verb, canonical_string};
pub use header::{ALGORITHM, SIGNED_HEADERS, SignatureParameters, extract_signature};
pub use request::{RequestComponents, SIGNATURE, request_url};
pub use verifier::{Verifier, VerifierOptions};
pub use signer::{SignedHeaders, SignedRequest, Signer};

/// Standard alphabet, padding optional on decode.
///
/// Peers emit padded base64, but some key and signature producers strip the
/// trailing `=`; both forms decode to the same bytes.
pub(crate) const FORGIVING_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);
