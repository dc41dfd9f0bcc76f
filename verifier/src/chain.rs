use alloc::{collections::BTreeSet, vec, vec::Vec};

use asn1::{oid, ObjectIdentifier};
use codec::{Decode, Encode};
use num_bigint::BigUint;
use p256::ecdsa::signature::hazmat::PrehashVerifier;
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::{
    asn,
    certificate::{Certificate, Name, SubjectPublicKeyInfo},
    error::{CertificateError, SignatureError},
};

pub const SHA256_WITH_RSA: ObjectIdentifier = oid!(1, 2, 840, 113549, 1, 1, 11); // https://oidref.com/1.2.840.113549.1.1.11
pub const SHA384_WITH_RSA: ObjectIdentifier = oid!(1, 2, 840, 113549, 1, 1, 12); // https://oidref.com/1.2.840.113549.1.1.12
pub const SHA512_WITH_RSA: ObjectIdentifier = oid!(1, 2, 840, 113549, 1, 1, 13); // https://oidref.com/1.2.840.113549.1.1.13
pub const ECDSA_WITH_SHA256: ObjectIdentifier = oid!(1, 2, 840, 10045, 4, 3, 2); // https://oidref.com/1.2.840.10045.4.3.2
pub const ECDSA_WITH_SHA384: ObjectIdentifier = oid!(1, 2, 840, 10045, 4, 3, 3); // https://oidref.com/1.2.840.10045.4.3.3
pub const ECDSA_WITH_SHA512: ObjectIdentifier = oid!(1, 2, 840, 10045, 4, 3, 4); // https://oidref.com/1.2.840.10045.4.3.4

pub const RSA_PBK: ObjectIdentifier = oid!(1, 2, 840, 113549, 1, 1, 1);
pub const ECDSA_PBK: ObjectIdentifier = oid!(1, 2, 840, 10045, 2, 1);

pub const CURVE_P256: ObjectIdentifier = oid!(1, 2, 840, 10045, 3, 1, 7);
pub const CURVE_P384: ObjectIdentifier = oid!(1, 3, 132, 0, 34);

// DER encoded DigestInfo prefixes, see https://www.rfc-editor.org/rfc/rfc8017#section-9.2
pub(crate) const SHA256_DIGEST_INFO: [u8; 19] = hex_literal::hex!("3031300d060960864801650304020105000420");
pub(crate) const SHA384_DIGEST_INFO: [u8; 19] = hex_literal::hex!("3041300d060960864801650304020205000430");
pub(crate) const SHA512_DIGEST_INFO: [u8; 19] = hex_literal::hex!("3051300d060960864801650304020305000440");

/// Largest accepted RSA modulus, twice the size of the Google root's.
pub const MAX_RSA_MODULUS_BITS: u64 = 8192;
/// Largest accepted RSA public exponent size, so that `e <= 2^32 - 1`.
pub const MAX_RSA_EXPONENT_BITS: u64 = 32;

/// SubjectPublicKeyInfo of the Google hardware attestation root.
pub const GOOGLE_ROOT_PUBLIC_KEY: &[u8] = include_bytes!("./__root_key__/public.key");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    Ecdsa(EcdsaCurve),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    pub modulus: BigUint,
    pub exponent: BigUint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcdsaCurve {
    P256(p256::ecdsa::VerifyingKey),
    P384(p384::ecdsa::VerifyingKey),
}

impl PublicKey {
    pub fn parse(info: &SubjectPublicKeyInfo) -> Result<Self, SignatureError> {
        match &info.algorithm.algorithm {
            &RSA_PBK => Ok(PublicKey::Rsa(parse_rsa_pbk(&info.subject_public_key)?)),
            &ECDSA_PBK => {
                let parameters = info
                    .algorithm
                    .parameters
                    .as_deref()
                    .ok_or(SignatureError::InvalidPublicKey)?;
                let curve = asn1::parse_single::<ObjectIdentifier>(parameters)
                    .map_err(|_| SignatureError::InvalidPublicKey)?;
                let point = &info.subject_public_key;
                match curve {
                    CURVE_P256 => p256::ecdsa::VerifyingKey::from_sec1_bytes(point)
                        .map(|key| PublicKey::Ecdsa(EcdsaCurve::P256(key)))
                        .map_err(|_| SignatureError::InvalidPublicKey),
                    CURVE_P384 => p384::ecdsa::VerifyingKey::from_sec1_bytes(point)
                        .map(|key| PublicKey::Ecdsa(EcdsaCurve::P384(key)))
                        .map_err(|_| SignatureError::InvalidPublicKey),
                    _ => Err(SignatureError::UnsupportedPublicKeyAlgorithm),
                }
            }
            _ => Err(SignatureError::UnsupportedPublicKeyAlgorithm),
        }
    }

    fn rsa(&self) -> Result<&RsaPublicKey, SignatureError> {
        match self {
            PublicKey::Rsa(key) => Ok(key),
            _ => Err(SignatureError::KeyAlgorithmMismatch),
        }
    }

    fn ecdsa(&self) -> Result<&EcdsaCurve, SignatureError> {
        match self {
            PublicKey::Ecdsa(curve) => Ok(curve),
            _ => Err(SignatureError::KeyAlgorithmMismatch),
        }
    }
}

fn parse_rsa_pbk(data: &[u8]) -> Result<RsaPublicKey, SignatureError> {
    let invalid = |_| SignatureError::InvalidPublicKey;
    let key = asn::decode(data).map_err(invalid)?;
    let [modulus, exponent] = key.as_sequence().map_err(invalid)? else {
        return Err(SignatureError::InvalidPublicKey);
    };
    let modulus = BigUint::from_bytes_be(modulus.as_unsigned_integer().map_err(invalid)?);
    let exponent = BigUint::from_bytes_be(exponent.as_unsigned_integer().map_err(invalid)?);
    if modulus == BigUint::default() || exponent == BigUint::default() {
        return Err(SignatureError::InvalidPublicKey);
    }
    let key = RsaPublicKey { modulus, exponent };
    key.check_bounds()?;
    Ok(key)
}

impl RsaPublicKey {
    /// Rejects keys above [MAX_RSA_MODULUS_BITS] or [MAX_RSA_EXPONENT_BITS].
    fn check_bounds(&self) -> Result<(), SignatureError> {
        if self.modulus.bits() > MAX_RSA_MODULUS_BITS || self.exponent.bits() > MAX_RSA_EXPONENT_BITS {
            return Err(SignatureError::InvalidPublicKey);
        }
        Ok(())
    }
}

/// Verifies the signature of `certificate` over its `tbs_bytes` with the issuer's key.
pub fn verify_signature(certificate: &Certificate, issuer: &PublicKey) -> Result<(), SignatureError> {
    if certificate.signature_algorithm.algorithm != certificate.tbs_signature_algorithm.algorithm {
        return Err(SignatureError::SignatureMismatch);
    }

    let payload = &certificate.tbs_bytes;
    let signature = &certificate.signature_value;
    match certificate.signature_algorithm.algorithm {
        SHA256_WITH_RSA => {
            validate_rsa::<Sha256>(payload, signature, issuer.rsa()?, &SHA256_DIGEST_INFO)
        }
        SHA384_WITH_RSA => {
            validate_rsa::<Sha384>(payload, signature, issuer.rsa()?, &SHA384_DIGEST_INFO)
        }
        SHA512_WITH_RSA => {
            validate_rsa::<Sha512>(payload, signature, issuer.rsa()?, &SHA512_DIGEST_INFO)
        }
        ECDSA_WITH_SHA256 => validate_ecdsa::<Sha256>(payload, signature, issuer.ecdsa()?),
        ECDSA_WITH_SHA384 => validate_ecdsa::<Sha384>(payload, signature, issuer.ecdsa()?),
        ECDSA_WITH_SHA512 => validate_ecdsa::<Sha512>(payload, signature, issuer.ecdsa()?),
        _ => Err(SignatureError::UnsupportedSignatureAlgorithm),
    }
}

/// RSASSA-PKCS1-v1_5, comparing the complete encoded message.
/// [See RFC](https://www.rfc-editor.org/rfc/rfc8017#section-8.2.2)
fn validate_rsa<D: Digest>(
    payload: &[u8],
    signature: &[u8],
    key: &RsaPublicKey,
    digest_info: &[u8],
) -> Result<(), SignatureError> {
    key.check_bounds()?;
    let k = ((key.modulus.bits() + 7) / 8) as usize;
    if signature.len() != k {
        return Err(SignatureError::InvalidSignatureEncoding);
    }
    let signature_num = BigUint::from_bytes_be(signature);
    if signature_num >= key.modulus {
        return Err(SignatureError::InvalidSignature);
    }

    let computed = signature_num.modpow(&key.exponent, &key.modulus).to_bytes_be();
    let mut encoded = vec![0u8; k.saturating_sub(computed.len())];
    encoded.extend_from_slice(&computed);

    let hashed = D::digest(payload);
    let t_len = digest_info.len() + hashed.len();
    if k < t_len + 11 {
        return Err(SignatureError::InvalidSignature);
    }
    let mut expected = Vec::with_capacity(k);
    expected.extend_from_slice(&[0x00, 0x01]);
    expected.resize(k - t_len - 1, 0xff);
    expected.push(0x00);
    expected.extend_from_slice(digest_info);
    expected.extend_from_slice(&hashed);

    if encoded != expected {
        return Err(SignatureError::InvalidSignature);
    }
    Ok(())
}

fn validate_ecdsa<D: Digest>(
    payload: &[u8],
    signature: &[u8],
    curve: &EcdsaCurve,
) -> Result<(), SignatureError> {
    // the prehash is verified so that any digest works with either curve
    let hashed = D::digest(payload);
    match curve {
        EcdsaCurve::P256(verifying_key) => {
            let signature = p256::ecdsa::Signature::from_der(signature)
                .map_err(|_| SignatureError::InvalidSignatureEncoding)?;
            verifying_key
                .verify_prehash(&hashed, &signature)
                .map_err(|_| SignatureError::InvalidSignature)
        }
        EcdsaCurve::P384(verifying_key) => {
            let signature = p384::ecdsa::Signature::from_der(signature)
                .map_err(|_| SignatureError::InvalidSignatureEncoding)?;
            verifying_key
                .verify_prehash(&hashed, &signature)
                .map_err(|_| SignatureError::InvalidSignature)
        }
    }
}

/// Public keys and subject names a chain may end in.
///
/// Keys are compared by their canonical `SubjectPublicKeyInfo` DER, names by their DER.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustAnchors {
    public_keys: BTreeSet<Vec<u8>>,
    subjects: BTreeSet<Vec<u8>>,
}

impl TrustAnchors {
    pub fn new() -> Self {
        Self::default()
    }

    /// The root key of Google's hardware attestation PKI.
    pub fn google_hardware_attestation() -> Self {
        let mut anchors = Self::new();
        anchors.public_keys.insert(GOOGLE_ROOT_PUBLIC_KEY.to_vec());
        anchors
    }

    /// Adds a DER encoded `SubjectPublicKeyInfo`.
    pub fn add_public_key(&mut self, spki: &[u8]) -> Result<(), CertificateError> {
        let info = SubjectPublicKeyInfo::from_der(spki)?;
        self.public_keys.insert(info.raw);
        Ok(())
    }

    pub fn with_public_key(mut self, spki: &[u8]) -> Result<Self, CertificateError> {
        self.add_public_key(spki)?;
        Ok(self)
    }

    /// Trusts the public key of `certificate`.
    pub fn add_certificate(&mut self, certificate: &Certificate) {
        self.public_keys.insert(certificate.public_key_info.raw.clone());
    }

    pub fn with_certificate(mut self, certificate: &Certificate) -> Self {
        self.add_certificate(certificate);
        self
    }

    /// Trusts any last certificate whose subject DER equals `subject`.
    ///
    /// **A subject anchor is not bound to a key.** Whoever can present a certificate with this
    /// subject satisfies it, so prefer [TrustAnchors::add_public_key] where the key is known.
    pub fn add_subject(&mut self, subject: &Name) {
        self.subjects.insert(subject.raw.clone());
    }

    /// See [TrustAnchors::add_subject].
    pub fn with_subject(mut self, subject: &Name) -> Self {
        self.add_subject(subject);
        self
    }

    pub fn contains(&self, certificate: &Certificate) -> bool {
        self.public_keys.contains(&certificate.public_key_info.raw)
            || self.subjects.contains(&certificate.subject.raw)
    }

    pub fn is_empty(&self) -> bool {
        self.public_keys.is_empty() && self.subjects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.public_keys.len() + self.subjects.len()
    }
}

#[derive(Debug, Encode, Decode, TypeInfo, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainValidationResult {
    pub valid: bool,
    /// Index of the first certificate whose signature does not verify with its issuer's key
    pub broken_at_index: Option<u32>,
    pub reached_trust_anchor: bool,
    pub link_error: Option<SignatureError>,
}

/// Validates a leaf-first chain by ensuring that
///
/// - every certificate is signed by the key of the certificate following it
/// - the last certificate's key or subject is one of the `trust_anchors`
///
/// The self-signature of the last certificate is not checked, it is trusted by being an anchor.
pub fn validate_chain(chain: &[Certificate], trust_anchors: &TrustAnchors) -> ChainValidationResult {
    let mut broken_at_index = None;
    let mut link_error = None;

    for (index, link) in chain.windows(2).enumerate() {
        let (certificate, issuer) = (&link[0], &link[1]);
        let verified = PublicKey::parse(&issuer.public_key_info)
            .and_then(|key| verify_signature(certificate, &key));
        match verified {
            Ok(()) => log::debug!(
                "certificate {} [{}] is signed by [{}]",
                index,
                certificate.subject,
                issuer.subject
            ),
            Err(error) => {
                log::debug!("certificate {} [{}] is broken: {}", index, certificate.subject, error);
                broken_at_index = Some(index as u32);
                link_error = Some(error);
                break;
            }
        }
    }

    let reached_trust_anchor = chain.last().map_or(false, |last| trust_anchors.contains(last));
    if !reached_trust_anchor {
        log::debug!("chain of {} certificates does not end in a trust anchor", chain.len());
    }

    ChainValidationResult {
        valid: broken_at_index.is_none() && reached_trust_anchor,
        broken_at_index,
        reached_trust_anchor,
        link_error,
    }
}
