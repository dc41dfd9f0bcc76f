use alloc::vec::Vec;

use base64::{engine::general_purpose, Engine as _};
use codec::{Decode, Encode};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

use crate::error::ChainInputError;

/// Message a prover signs to derive its attestation challenge.
pub const CHALLENGE_MESSAGE: &str = "Android CK Verification";

/// Length of a [SignatureChallenge] in bytes.
pub const SIGNATURE_CHALLENGE_LENGTH: usize = 65;

/// A recoverable secp256k1 signature over [CHALLENGE_MESSAGE], used as attestation challenge
/// to bind an attested key to an account.
#[derive(Debug, Encode, Decode, TypeInfo, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureChallenge {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub v: u8,
}

impl SignatureChallenge {
    /// `r || s || v`
    pub fn to_bytes(&self) -> [u8; SIGNATURE_CHALLENGE_LENGTH] {
        let mut bytes = [0u8; SIGNATURE_CHALLENGE_LENGTH];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.v;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != SIGNATURE_CHALLENGE_LENGTH {
            return None;
        }
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Some(Self { r, s, v: bytes[64] })
    }
}

/// Reads a certificate chain given as one DER certificate per line, encoded as hex (with or
/// without `0x` prefix) or base64. Empty lines are skipped.
pub fn parse_certificate_chain(text: &str) -> Result<Vec<Vec<u8>>, ChainInputError> {
    let chain = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(index, line)| decode_certificate(line).ok_or(ChainInputError::InvalidLine(index)))
        .collect::<Result<Vec<_>, _>>()?;

    if chain.is_empty() {
        return Err(ChainInputError::Empty);
    }
    Ok(chain)
}

fn decode_certificate(line: &str) -> Option<Vec<u8>> {
    let digits = line.strip_prefix("0x").or_else(|| line.strip_prefix("0X")).unwrap_or(line);
    hex::decode(digits)
        .ok()
        .or_else(|| general_purpose::STANDARD.decode(line).ok())
        .filter(|bytes| !bytes.is_empty())
}
