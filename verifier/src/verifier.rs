use alloc::{string::String, string::ToString, vec::Vec};
#[cfg(feature = "std")]
use std::sync::{Arc, RwLock};

use codec::{Decode, Encode};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

use crate::{
    asn::DecoderConfig,
    attestation::{extract_attestation_with, SecurityLevel},
    certificate::Certificate,
    chain::{validate_chain, TrustAnchors},
    error::VerificationError,
    traits::{KeyProvider, TrustAnchorStore},
};

/// Outcome of a verification run.
#[derive(Debug, Encode, Decode, TypeInfo, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub trusted: bool,
    /// Present whenever the attestation record of the leaf could be decoded
    pub security_level: Option<SecurityLevel>,
    /// Human-readable failures, `reasons[i] == failures[i].to_string()`
    pub reasons: Vec<String>,
    pub failures: Vec<VerificationError>,
}

impl Verdict {
    fn new() -> Self {
        Self { trusted: false, security_level: None, reasons: Vec::new(), failures: Vec::new() }
    }

    fn fail(&mut self, failure: VerificationError) {
        log::warn!("attestation not trusted: {}", failure);
        self.reasons.push(failure.to_string());
        self.failures.push(failure);
    }

    fn finish(mut self) -> Self {
        self.trusted = self.failures.is_empty();
        self
    }
}

/// Additional requirements a chain has to meet. Everything is off by default.
#[derive(Debug, Default, Encode, Decode, TypeInfo, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerificationPolicy {
    pub min_security_level: Option<SecurityLevel>,
    pub max_chain_length: Option<u32>,
    /// Requires a hardware enforced root of trust of a locked device with verified boot.
    pub require_verified_boot: bool,
    /// Unix timestamp in milliseconds all certificates must be valid at, also checked against
    /// the usage expiry of the attested key.
    pub validity_at: Option<i64>,
    pub decoder: DecoderConfig,
}

impl VerificationPolicy {
    pub fn with_min_security_level(mut self, level: SecurityLevel) -> Self {
        self.min_security_level = Some(level);
        self
    }
}

/// Verifies a leaf-first chain of DER certificates and the attestation record of its leaf.
///
/// Checks continue after a failure wherever the remaining checks are still meaningful, so the
/// verdict lists all failures found. Only an empty, too long or unparseable chain stops early.
pub fn verify<C: AsRef<[u8]>>(
    chain: &[C],
    expected_challenge: &[u8],
    trust_anchors: &TrustAnchors,
    policy: &VerificationPolicy,
) -> Verdict {
    let mut verdict = Verdict::new();

    if let Some(max) = policy.max_chain_length {
        if chain.len() > max as usize {
            verdict.fail(VerificationError::ChainTooLong { length: chain.len() as u32, max });
            return verdict.finish();
        }
    }

    if chain.is_empty() {
        verdict.fail(VerificationError::EmptyChain);
        return verdict.finish();
    }

    let mut certificates = Vec::with_capacity(chain.len());
    for (index, der) in chain.iter().enumerate() {
        match Certificate::from_der_with(der.as_ref(), &policy.decoder) {
            Ok(certificate) => certificates.push(certificate),
            Err(error) => {
                verdict.fail(VerificationError::MalformedCertificate { index: index as u32, error });
                return verdict.finish();
            }
        }
    }

    let result = validate_chain(&certificates, trust_anchors);
    if let (Some(index), Some(cause)) = (result.broken_at_index, result.link_error) {
        verdict.fail(VerificationError::ChainBroken { index, cause });
    }
    if !result.reached_trust_anchor {
        verdict.fail(VerificationError::NoTrustAnchor);
    }

    if let Some(at) = policy.validity_at {
        for (index, certificate) in certificates.iter().enumerate() {
            if !certificate.is_valid_at(at) {
                verdict.fail(VerificationError::CertificateNotValid { index: index as u32, at });
            }
        }
    }

    // non-empty, checked above
    let leaf = &certificates[0];
    let record = match extract_attestation_with(leaf, &policy.decoder) {
        Ok(record) => record,
        Err(error) => {
            verdict.fail(error.into());
            return verdict.finish();
        }
    };
    verdict.security_level = Some(record.attestation_security_level);

    if record.attestation_challenge.as_slice() != expected_challenge {
        verdict.fail(VerificationError::ChallengeMismatch);
    }

    if let Some(required) = policy.min_security_level {
        let actual = record.attestation_security_level;
        if !actual.satisfies(required) {
            verdict.fail(VerificationError::PolicyViolation { required, actual });
        }
    }

    if policy.require_verified_boot {
        let verified = record
            .hardware_enforced
            .root_of_trust()
            .map_or(false, |root| root.is_verified());
        if !verified {
            verdict.fail(VerificationError::UnverifiedBoot);
        }
    }

    if let (Some(at), Some(expiry)) = (policy.validity_at, record.usage_expire_date_time()) {
        if expiry <= at {
            verdict.fail(VerificationError::UsageExpired);
        }
    }

    verdict.finish()
}

/// Verifies chains against the anchors of a [TrustAnchorStore] under a fixed policy.
pub struct AttestationVerifier<S> {
    store: S,
    policy: VerificationPolicy,
}

impl<S: TrustAnchorStore> AttestationVerifier<S> {
    pub fn new(store: S, policy: VerificationPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &VerificationPolicy {
        &self.policy
    }

    /// Verifies against the anchors present when the call starts.
    pub fn verify<C: AsRef<[u8]>>(&self, chain: &[C], expected_challenge: &[u8]) -> Verdict {
        let anchors = self.store.trust_anchors();
        verify(chain, expected_challenge, &anchors, &self.policy)
    }

    /// Requests an attested key for `challenge` from `provider` and verifies its chain.
    pub fn attest<P: KeyProvider>(&self, provider: &P, challenge: &[u8]) -> Result<Verdict, P::Error> {
        let chain = provider.generate_attested_key(challenge)?;
        Ok(self.verify(&chain, challenge))
    }
}

/// Trust anchors that can be replaced while verifications are running.
#[cfg(feature = "std")]
#[derive(Debug, Default)]
pub struct SharedTrustAnchors(RwLock<Arc<TrustAnchors>>);

#[cfg(feature = "std")]
impl SharedTrustAnchors {
    pub fn new(anchors: TrustAnchors) -> Self {
        Self(RwLock::new(Arc::new(anchors)))
    }

    /// Swaps in `anchors`; verifications already running keep their snapshot.
    pub fn replace(&self, anchors: TrustAnchors) -> Arc<TrustAnchors> {
        let mut current = self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        core::mem::replace(&mut *current, Arc::new(anchors))
    }
}

#[cfg(feature = "std")]
impl TrustAnchorStore for SharedTrustAnchors {
    fn trust_anchors(&self) -> Arc<TrustAnchors> {
        self.0.read().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }
}
