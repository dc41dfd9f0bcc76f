pub mod authorization;

pub use authorization::*;

use alloc::{string::ToString, vec::Vec};
use core::fmt;

use asn1::{oid, ObjectIdentifier};
use codec::{Decode, Encode};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

use crate::{
    asn::{self, DecoderConfig},
    certificate::Certificate,
    error::{AttestationError, EncodingError},
};

/// OID of the X.509 extension carrying the key description.
pub const KEY_ATTESTATION_OID: ObjectIdentifier = oid!(1, 3, 6, 1, 4, 1, 11129, 2, 1, 17);

/// Keymaster 1 to 4 and KeyMint 1 to 4.
pub const SUPPORTED_VERSIONS: [i64; 8] = [1, 2, 3, 4, 100, 200, 300, 400];

#[derive(Debug, Encode, Decode, TypeInfo, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SecurityLevel {
    Software,
    TrustedEnvironment,
    /// Only exists from attestation version 3 on
    StrongBox,
    Other(i64),
}

impl From<i64> for SecurityLevel {
    fn from(value: i64) -> Self {
        match value {
            0 => SecurityLevel::Software,
            1 => SecurityLevel::TrustedEnvironment,
            2 => SecurityLevel::StrongBox,
            other => SecurityLevel::Other(other),
        }
    }
}

impl SecurityLevel {
    fn rank(self) -> Option<u8> {
        match self {
            SecurityLevel::Software => Some(0),
            SecurityLevel::TrustedEnvironment => Some(1),
            SecurityLevel::StrongBox => Some(2),
            SecurityLevel::Other(_) => None,
        }
    }

    /// Whether this level is at least `required`. Unknown levels satisfy no minimum.
    pub fn satisfies(self, required: SecurityLevel) -> bool {
        match (self.rank(), required.rank()) {
            (Some(actual), Some(required)) => actual >= required,
            _ => false,
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityLevel::Software => f.write_str("Software"),
            SecurityLevel::TrustedEnvironment => f.write_str("TrustedEnvironment"),
            SecurityLevel::StrongBox => f.write_str("StrongBox"),
            SecurityLevel::Other(value) => write!(f, "Other({})", value),
        }
    }
}

/// The decoded `KeyDescription` of the
/// [certificate schema](https://source.android.com/docs/security/features/keystore/attestation#schema).
#[derive(Debug, Encode, Decode, TypeInfo, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationRecord {
    pub attestation_version: i64,
    pub attestation_security_level: SecurityLevel,
    /// Keymaster or KeyMint version
    pub keymaster_version: i64,
    pub keymaster_security_level: SecurityLevel,
    pub attestation_challenge: Vec<u8>,
    pub unique_id: Vec<u8>,
    pub software_enforced: PropertySet,
    pub hardware_enforced: PropertySet,
}

impl AttestationRecord {
    /// The root of trust, preferring the hardware enforced list.
    pub fn root_of_trust(&self) -> Option<&RootOfTrust> {
        self.hardware_enforced
            .root_of_trust()
            .or_else(|| self.software_enforced.root_of_trust())
    }

    /// Usage expiry from either list, hardware enforced first.
    pub fn usage_expire_date_time(&self) -> Option<i64> {
        self.hardware_enforced
            .usage_expire_date_time()
            .or_else(|| self.software_enforced.usage_expire_date_time())
    }
}

/// Reads the version of a record without decoding the rest of it.
///
/// Field layouts differ between versions, which is why the version is known before anything else.
pub fn peek_attestation_version(extension: &[u8]) -> Result<i64, AttestationError> {
    let config = DecoderConfig::default();
    let wrapper = asn::decode_with(extension, &config)?;
    let description = asn::decode_with(wrapper.as_octet_string()?, &config)?;
    let version = description.as_sequence()?.first().ok_or(EncodingError::UnexpectedTag)?;
    Ok(integer(version)?)
}

/// Decodes the DER encoded extension value (the `extnValue` OCTET STRING).
pub fn decode_attestation_record(extension: &[u8]) -> Result<AttestationRecord, AttestationError> {
    decode_attestation_record_with(extension, &DecoderConfig::default())
}

pub fn decode_attestation_record_with(
    extension: &[u8],
    config: &DecoderConfig,
) -> Result<AttestationRecord, AttestationError> {
    let wrapper = asn::decode_with(extension, config)?;
    let description_der = wrapper.as_octet_string()?;
    let description = asn::decode_with(description_der, config)?;
    let fields = description.as_sequence()?;

    let version = integer(fields.first().ok_or(EncodingError::UnexpectedTag)?)?;
    if !SUPPORTED_VERSIONS.contains(&version) {
        return Err(AttestationError::UnsupportedVersion(version));
    }

    let [_, attestation_security_level, keymaster_version, keymaster_security_level, attestation_challenge, unique_id, _, _] =
        fields
    else {
        return Err(EncodingError::UnexpectedTag.into());
    };
    // authorization lists are decoded from their original bytes
    let raw_fields = asn::split_elements(asn::content_of(description_der, config)?, config)?;
    let [.., software_enforced, hardware_enforced] = raw_fields.as_slice() else {
        return Err(EncodingError::UnexpectedTag.into());
    };

    Ok(AttestationRecord {
        attestation_version: version,
        attestation_security_level: integer(attestation_security_level)?.into(),
        keymaster_version: integer(keymaster_version)?,
        keymaster_security_level: integer(keymaster_security_level)?.into(),
        attestation_challenge: attestation_challenge.as_octet_string()?.to_vec(),
        unique_id: unique_id.as_octet_string()?.to_vec(),
        software_enforced: PropertySet::decode(software_enforced, config)?,
        hardware_enforced: PropertySet::decode(hardware_enforced, config)?,
    })
}

/// Decodes the attestation record of `certificate`, usually the leaf of a chain.
pub fn extract_attestation(certificate: &Certificate) -> Result<AttestationRecord, AttestationError> {
    extract_attestation_with(certificate, &DecoderConfig::default())
}

pub fn extract_attestation_with(
    certificate: &Certificate,
    config: &DecoderConfig,
) -> Result<AttestationRecord, AttestationError> {
    let extension = certificate
        .get_extension(&KEY_ATTESTATION_OID.to_string())
        .ok_or(AttestationError::MissingExtension)?;
    decode_attestation_record_with(extension, config)
}
