use core::fmt;

use codec::{Decode, Encode};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

use crate::attestation::SecurityLevel;

/// Structural violation of the DER encoding rules.
#[derive(Debug, Encode, Decode, TypeInfo, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncodingError {
    /// Input ended before the declared tag, length or value was complete
    Truncated,
    /// Indefinite length form is not allowed in DER
    IndefiniteLength,
    /// More length octets than supported
    LengthOverflow,
    /// Length is not encoded in its shortest form (strict mode only)
    NonMinimalLength,
    /// High tag number form used where the low form fits, or padded with `0x80`
    NonMinimalTag,
    /// Tag number does not fit into 32 bits
    TagNumberOverflow,
    /// Bytes remain after the value was decoded
    TrailingData,
    /// Nesting is deeper than the configured bound
    DepthExceeded,
    /// Value has a different tag or form than expected at this position
    UnexpectedTag,
    /// INTEGER or ENUMERATED content is empty or not minimal
    InvalidInteger,
    /// INTEGER does not fit the target type
    IntegerOverflow,
    /// BOOLEAN content is not a single `0x00`/`0xFF` octet
    InvalidBoolean,
    /// NULL has content
    InvalidNull,
    /// BIT STRING is empty or has unused bits
    InvalidBitString,
    /// OBJECT IDENTIFIER could not be decoded
    InvalidObjectIdentifier,
    /// UTCTime or GeneralizedTime could not be decoded
    InvalidTime,
    /// A tag number appears more than once where it must be unique
    DuplicateEntry(u32),
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => f.write_str("truncated encoding"),
            Self::IndefiniteLength => f.write_str("indefinite length"),
            Self::LengthOverflow => f.write_str("length does not fit in four octets"),
            Self::NonMinimalLength => f.write_str("non-minimal length encoding"),
            Self::NonMinimalTag => f.write_str("non-minimal tag encoding"),
            Self::TagNumberOverflow => f.write_str("tag number overflow"),
            Self::TrailingData => f.write_str("trailing data"),
            Self::DepthExceeded => f.write_str("nesting depth exceeded"),
            Self::UnexpectedTag => f.write_str("unexpected tag"),
            Self::InvalidInteger => f.write_str("invalid integer"),
            Self::IntegerOverflow => f.write_str("integer overflow"),
            Self::InvalidBoolean => f.write_str("invalid boolean"),
            Self::InvalidNull => f.write_str("invalid null"),
            Self::InvalidBitString => f.write_str("invalid bit string"),
            Self::InvalidObjectIdentifier => f.write_str("invalid object identifier"),
            Self::InvalidTime => f.write_str("invalid time"),
            Self::DuplicateEntry(tag) => write!(f, "duplicate entry with tag {}", tag),
        }
    }
}

/// Fields of a X.509 certificate, used to name the one that is missing or malformed.
#[derive(Debug, Encode, Decode, TypeInfo, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificateField {
    Certificate,
    TbsCertificate,
    Version,
    SerialNumber,
    Signature,
    Issuer,
    Validity,
    Subject,
    SubjectPublicKeyInfo,
    Extensions,
    SignatureAlgorithm,
    SignatureValue,
}

/// Error occurring when building a [crate::Certificate] from DER.
#[derive(Debug, Encode, Decode, TypeInfo, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificateError {
    /// The ASN.1 structure itself is broken
    Encoding(EncodingError),
    /// Well-formed ASN.1 that lacks a required certificate field or carries a wrong one
    MalformedField(CertificateField),
}

impl fmt::Display for CertificateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encoding(e) => write!(f, "malformed encoding: {}", e),
            Self::MalformedField(field) => write!(f, "malformed field {:?}", field),
        }
    }
}

impl From<EncodingError> for CertificateError {
    fn from(e: EncodingError) -> Self {
        Self::Encoding(e)
    }
}

/// Error occurring when decoding the key attestation record.
#[derive(Debug, Encode, Decode, TypeInfo, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttestationError {
    /// The extension or the record within does not have the expected structure
    MalformedEncoding(EncodingError),
    /// The certificate has no key attestation extension
    MissingExtension,
    /// Attestation version is not supported
    UnsupportedVersion(i64),
}

impl fmt::Display for AttestationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedEncoding(e) => write!(f, "attestation record malformed: {}", e),
            Self::MissingExtension => f.write_str("no attestation extension"),
            Self::UnsupportedVersion(version) => {
                write!(f, "unsupported attestation version {}", version)
            }
        }
    }
}

impl From<EncodingError> for AttestationError {
    fn from(e: EncodingError) -> Self {
        Self::MalformedEncoding(e)
    }
}

/// Reason a certificate's signature could not be verified with its issuer's key.
#[derive(Debug, Encode, Decode, TypeInfo, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureError {
    /// Signature algorithm is not supported
    UnsupportedSignatureAlgorithm,
    /// Public key algorithm or curve is not supported
    UnsupportedPublicKeyAlgorithm,
    /// Error occurred while parsing the issuer's public key
    InvalidPublicKey,
    /// The declared signature algorithm does not fit the issuer's key type
    KeyAlgorithmMismatch,
    /// Specified signature algorithms do not match.
    ///
    /// The signature field in the sequence
    /// [tbsCertificate](https://www.rfc-editor.org/rfc/rfc5280#section-4.1.2.3)
    /// MUST contain the same algorithm identifier as the signatureAlgorithm
    /// field in the sequence
    /// [Certificate](https://www.rfc-editor.org/rfc/rfc5280#section-4.1.1.2).
    SignatureMismatch,
    /// Signature has an invalid encoding
    InvalidSignatureEncoding,
    /// Signature is invalid
    InvalidSignature,
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::UnsupportedSignatureAlgorithm => "unsupported signature algorithm",
            Self::UnsupportedPublicKeyAlgorithm => "unsupported public key algorithm",
            Self::InvalidPublicKey => "invalid public key",
            Self::KeyAlgorithmMismatch => "signature algorithm does not match issuer key",
            Self::SignatureMismatch => "inner and outer signature algorithms differ",
            Self::InvalidSignatureEncoding => "invalid signature encoding",
            Self::InvalidSignature => "invalid signature",
        };
        f.write_str(msg)
    }
}

/// A single failed check of a verification run. Its [Display](fmt::Display) output is the
/// human-readable reason reported in a [crate::Verdict].
#[derive(Debug, Encode, Decode, TypeInfo, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerificationError {
    EmptyChain,
    ChainTooLong { length: u32, max: u32 },
    MalformedCertificate { index: u32, error: CertificateError },
    ChainBroken { index: u32, cause: SignatureError },
    NoTrustAnchor,
    MissingExtension,
    MalformedRecord(EncodingError),
    UnsupportedVersion(i64),
    ChallengeMismatch,
    PolicyViolation { required: SecurityLevel, actual: SecurityLevel },
    UnverifiedBoot,
    CertificateNotValid { index: u32, at: i64 },
    UsageExpired,
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyChain => f.write_str("empty certificate chain"),
            Self::ChainTooLong { length, max } => {
                write!(f, "certificate chain too long ({} > {})", length, max)
            }
            Self::MalformedCertificate { index, .. } => {
                write!(f, "certificate {} malformed", index)
            }
            Self::ChainBroken { index, cause } => {
                write!(f, "certificate chain broken at index {}: {}", index, cause)
            }
            Self::NoTrustAnchor => f.write_str("no trust anchor reached"),
            Self::MissingExtension => f.write_str("no attestation extension"),
            Self::MalformedRecord(e) => write!(f, "attestation record malformed: {}", e),
            Self::UnsupportedVersion(version) => {
                write!(f, "unsupported attestation version {}", version)
            }
            Self::ChallengeMismatch => f.write_str("challenge mismatch"),
            Self::PolicyViolation { required, actual } => {
                write!(f, "security level {} below required {}", actual, required)
            }
            Self::UnverifiedBoot => f.write_str("device boot state not verified"),
            Self::CertificateNotValid { index, at } => {
                write!(f, "certificate {} not valid at {}", index, at)
            }
            Self::UsageExpired => f.write_str("attestation usage expired"),
        }
    }
}

impl From<AttestationError> for VerificationError {
    fn from(e: AttestationError) -> Self {
        match e {
            AttestationError::MalformedEncoding(e) => Self::MalformedRecord(e),
            AttestationError::MissingExtension => Self::MissingExtension,
            AttestationError::UnsupportedVersion(version) => Self::UnsupportedVersion(version),
        }
    }
}

/// Error occurring when reading a textual certificate chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainInputError {
    /// Line (zero based, counting only non-empty lines) is neither hex nor base64
    InvalidLine(usize),
    /// The text contains no certificate
    Empty,
}

impl fmt::Display for ChainInputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLine(line) => write!(f, "certificate {} is neither hex nor base64", line),
            Self::Empty => f.write_str("no certificate found"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodingError {}
#[cfg(feature = "std")]
impl std::error::Error for CertificateError {}
#[cfg(feature = "std")]
impl std::error::Error for AttestationError {}
#[cfg(feature = "std")]
impl std::error::Error for SignatureError {}
#[cfg(feature = "std")]
impl std::error::Error for VerificationError {}
#[cfg(feature = "std")]
impl std::error::Error for ChainInputError {}

