#![cfg_attr(not(feature = "std"), no_std)]

//! Verification of hardware key attestation certificate chains.
//!
//! The crate validates an X.509 chain issued by a device's secure hardware up to a
//! configured trust anchor, decodes the key attestation record embedded in the leaf
//! certificate and checks it against a challenge chosen by the verifier.

extern crate alloc;

pub mod asn;
pub mod attestation;
pub mod certificate;
pub mod chain;
pub mod error;
pub mod verifier;

#[cfg(test)]
mod mock;

mod traits;
mod types;

pub use attestation::*;
pub use certificate::{Certificate, Name, SubjectPublicKeyInfo};
pub use chain::{validate_chain, verify_signature, ChainValidationResult, PublicKey, TrustAnchors};
pub use error::*;
pub use traits::*;
pub use types::*;
pub use verifier::{verify, AttestationVerifier, VerificationPolicy, Verdict};
#[cfg(feature = "std")]
pub use verifier::SharedTrustAnchors;
