pub mod server;
pub mod error;
pub mod signing;

pub use server::{AppState, run, router};
pub use error::SignatureError;
pub use signing::{
    RequestComponents, SignedHeaders, SignedRequest, Signer, Verb, Verifier, VerifierOptions,
};
