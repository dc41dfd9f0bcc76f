use alloc::{collections::BTreeMap, string::String, vec::Vec};

use codec::{Decode, Encode};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

use crate::{
    asn::{self, Asn1Value, DecoderConfig, TagClass, ENUMERATED, SET},
    error::EncodingError,
};

/// Shape of the value a known authorization tag carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Integer,
    IntegerSet,
    /// Presence only, encoded as NULL
    Boolean,
    Bytes,
    /// INTEGER holding Unix milliseconds
    DateTime,
    RootOfTrust,
}

macro_rules! known_tags {
    ($( $name:ident = $number:literal => $shape:ident, )+) => {
        /// Authorization tags with a known value shape, numbered as in the
        /// [certificate schema](https://source.android.com/docs/security/features/keystore/attestation#schema).
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum KnownTag {
            $( $name = $number, )+
        }

        impl KnownTag {
            pub fn from_number(number: u32) -> Option<Self> {
                match number {
                    $( $number => Some(Self::$name), )+
                    _ => None,
                }
            }

            pub fn shape(self) -> ValueShape {
                match self {
                    $( Self::$name => ValueShape::$shape, )+
                }
            }
        }
    };
}

known_tags! {
    Purpose = 1 => IntegerSet,
    Algorithm = 2 => Integer,
    KeySize = 3 => Integer,
    BlockMode = 4 => IntegerSet,
    Digest = 5 => IntegerSet,
    Padding = 6 => IntegerSet,
    CallerNonce = 7 => Boolean,
    MinMacLength = 8 => Integer,
    EcCurve = 10 => Integer,
    RsaPublicExponent = 200 => Integer,
    MgfDigest = 203 => IntegerSet,
    RollbackResistance = 303 => Boolean,
    EarlyBootOnly = 305 => Boolean,
    ActiveDateTime = 400 => DateTime,
    OriginationExpireDateTime = 401 => DateTime,
    UsageExpireDateTime = 402 => DateTime,
    UsageCountLimit = 405 => Integer,
    NoAuthRequired = 503 => Boolean,
    UserAuthType = 504 => Integer,
    AuthTimeout = 505 => Integer,
    AllowWhileOnBody = 506 => Boolean,
    TrustedUserPresenceRequired = 507 => Boolean,
    TrustedConfirmationRequired = 508 => Boolean,
    UnlockedDeviceRequired = 509 => Boolean,
    AllApplications = 600 => Boolean,
    ApplicationId = 601 => Bytes,
    CreationDateTime = 701 => DateTime,
    Origin = 702 => Integer,
    RollbackResistant = 703 => Boolean,
    RootOfTrust = 704 => RootOfTrust,
    OsVersion = 705 => Integer,
    OsPatchLevel = 706 => Integer,
    AttestationApplicationId = 709 => Bytes,
    AttestationIdBrand = 710 => Bytes,
    AttestationIdDevice = 711 => Bytes,
    AttestationIdProduct = 712 => Bytes,
    AttestationIdSerial = 713 => Bytes,
    AttestationIdImei = 714 => Bytes,
    AttestationIdMeid = 715 => Bytes,
    AttestationIdManufacturer = 716 => Bytes,
    AttestationIdModel = 717 => Bytes,
    VendorPatchLevel = 718 => Integer,
    BootPatchLevel = 719 => Integer,
    DeviceUniqueAttestation = 720 => Boolean,
    AttestationIdSecondImei = 723 => Bytes,
    ModuleHash = 724 => Bytes,
}

impl KnownTag {
    pub fn number(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Encode, Decode, TypeInfo, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthorizationValue {
    Integer(i64),
    IntegerSet(Vec<i64>),
    Boolean(bool),
    Bytes(Vec<u8>),
    /// Unix milliseconds
    DateTime(i64),
    RootOfTrust(RootOfTrust),
    /// DER of the tagged value of an unknown tag
    Raw(Vec<u8>),
}

impl AuthorizationValue {
    fn decode(shape: ValueShape, value: &Asn1Value) -> Result<Self, EncodingError> {
        Ok(match shape {
            ValueShape::Integer => Self::Integer(integer(value)?),
            ValueShape::IntegerSet => {
                if !value.is_universal(SET) {
                    return Err(EncodingError::UnexpectedTag);
                }
                Self::IntegerSet(value.children()?.iter().map(integer).collect::<Result<_, _>>()?)
            }
            ValueShape::Boolean => {
                value.as_null()?;
                Self::Boolean(true)
            }
            ValueShape::Bytes => Self::Bytes(value.as_octet_string()?.to_vec()),
            ValueShape::DateTime => Self::DateTime(integer(value)?),
            ValueShape::RootOfTrust => Self::RootOfTrust(RootOfTrust::decode(value)?),
        })
    }
}

/// Reads an INTEGER, or an ENUMERATED in its place.
pub(crate) fn integer(value: &Asn1Value) -> Result<i64, EncodingError> {
    if value.is_universal(ENUMERATED) {
        value.as_enumerated()
    } else {
        value.as_integer()
    }
}

#[derive(Debug, Encode, Decode, TypeInfo, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerifiedBootState {
    Verified,
    SelfSigned,
    Unverified,
    Failed,
    Other(i64),
}

impl From<i64> for VerifiedBootState {
    fn from(value: i64) -> Self {
        match value {
            0 => VerifiedBootState::Verified,
            1 => VerifiedBootState::SelfSigned,
            2 => VerifiedBootState::Unverified,
            3 => VerifiedBootState::Failed,
            other => VerifiedBootState::Other(other),
        }
    }
}

#[derive(Debug, Encode, Decode, TypeInfo, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootOfTrust {
    pub verified_boot_key: Vec<u8>,
    pub device_locked: bool,
    pub verified_boot_state: VerifiedBootState,
    /// Only present from attestation version 3 on
    pub verified_boot_hash: Option<Vec<u8>>,
}

impl RootOfTrust {
    fn decode(value: &Asn1Value) -> Result<Self, EncodingError> {
        let (key, locked, state, hash) = match value.as_sequence()? {
            [key, locked, state] => (key, locked, state, None),
            [key, locked, state, hash] => (key, locked, state, Some(hash)),
            _ => return Err(EncodingError::UnexpectedTag),
        };
        Ok(Self {
            verified_boot_key: key.as_octet_string()?.to_vec(),
            device_locked: locked.as_bool()?,
            verified_boot_state: integer(state)?.into(),
            verified_boot_hash: hash.map(|h| h.as_octet_string().map(<[u8]>::to_vec)).transpose()?,
        })
    }

    /// Whether the device is locked and booted a verified image.
    pub fn is_verified(&self) -> bool {
        self.device_locked && self.verified_boot_state == VerifiedBootState::Verified
    }
}

/// Authorization list entries keyed by tag number.
#[derive(Debug, Default, Encode, Decode, TypeInfo, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySet(pub BTreeMap<u32, AuthorizationValue>);

impl PropertySet {
    /// Decodes a DER encoded `AuthorizationList` SEQUENCE of `[tag] EXPLICIT` entries.
    ///
    /// Unknown tags keep the encoding of their inner value exactly as found in `list`.
    pub fn decode(list: &[u8], config: &DecoderConfig) -> Result<Self, EncodingError> {
        let entries = asn::decode_with(list, config)?;
        let entries = entries.as_sequence()?;
        let raw_entries = asn::split_elements(asn::content_of(list, config)?, config)?;

        let mut properties = BTreeMap::new();
        for (entry, raw) in entries.iter().zip(raw_entries) {
            if entry.class != TagClass::ContextSpecific {
                return Err(EncodingError::UnexpectedTag);
            }
            let inner = entry.explicit_inner().ok_or(EncodingError::UnexpectedTag)?;
            let value = match KnownTag::from_number(entry.number) {
                Some(tag) => AuthorizationValue::decode(tag.shape(), inner)?,
                None => AuthorizationValue::Raw(asn::content_of(raw, config)?.to_vec()),
            };
            if properties.insert(entry.number, value).is_some() {
                return Err(EncodingError::DuplicateEntry(entry.number));
            }
        }
        Ok(Self(properties))
    }

    pub fn get(&self, tag: u32) -> Option<&AuthorizationValue> {
        self.0.get(&tag)
    }

    pub fn contains(&self, tag: u32) -> bool {
        self.0.contains_key(&tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn integer(&self, tag: KnownTag) -> Option<i64> {
        match self.get(tag.number()) {
            Some(AuthorizationValue::Integer(value)) => Some(*value),
            _ => None,
        }
    }

    fn date_time(&self, tag: KnownTag) -> Option<i64> {
        match self.get(tag.number()) {
            Some(AuthorizationValue::DateTime(value)) => Some(*value),
            _ => None,
        }
    }

    fn bytes(&self, tag: KnownTag) -> Option<&[u8]> {
        match self.get(tag.number()) {
            Some(AuthorizationValue::Bytes(value)) => Some(value),
            _ => None,
        }
    }

    pub fn purposes(&self) -> Option<&[i64]> {
        match self.get(KnownTag::Purpose.number()) {
            Some(AuthorizationValue::IntegerSet(values)) => Some(values),
            _ => None,
        }
    }

    pub fn algorithm(&self) -> Option<i64> {
        self.integer(KnownTag::Algorithm)
    }

    pub fn key_size(&self) -> Option<i64> {
        self.integer(KnownTag::KeySize)
    }

    pub fn origin(&self) -> Option<i64> {
        self.integer(KnownTag::Origin)
    }

    pub fn os_version(&self) -> Option<i64> {
        self.integer(KnownTag::OsVersion)
    }

    pub fn os_patch_level(&self) -> Option<i64> {
        self.integer(KnownTag::OsPatchLevel)
    }

    pub fn creation_date_time(&self) -> Option<i64> {
        self.date_time(KnownTag::CreationDateTime)
    }

    pub fn usage_expire_date_time(&self) -> Option<i64> {
        self.date_time(KnownTag::UsageExpireDateTime)
    }

    pub fn no_auth_required(&self) -> bool {
        self.contains(KnownTag::NoAuthRequired.number())
    }

    pub fn root_of_trust(&self) -> Option<&RootOfTrust> {
        match self.get(KnownTag::RootOfTrust.number()) {
            Some(AuthorizationValue::RootOfTrust(root)) => Some(root),
            _ => None,
        }
    }

    /// Decodes the attestation application id, if present.
    pub fn attestation_application_id(
        &self,
    ) -> Result<Option<AttestationApplicationId>, EncodingError> {
        self.bytes(KnownTag::AttestationApplicationId)
            .map(AttestationApplicationId::from_der)
            .transpose()
    }
}

/// The calling application's identity as reported by the keystore.
#[derive(Debug, Encode, Decode, TypeInfo, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationApplicationId {
    pub package_infos: Vec<AttestationPackageInfo>,
    /// Digests of the signing certificates of the application
    pub signature_digests: Vec<Vec<u8>>,
}

#[derive(Debug, Encode, Decode, TypeInfo, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationPackageInfo {
    pub package_name: String,
    pub version: i64,
}

impl AttestationApplicationId {
    pub fn from_der(der: &[u8]) -> Result<Self, EncodingError> {
        let value = asn::decode_with(der, &DecoderConfig::default())?;
        let [package_infos, signature_digests] = value.as_sequence()? else {
            return Err(EncodingError::UnexpectedTag);
        };

        let package_infos = package_infos
            .as_set()?
            .iter()
            .map(|info| match info.as_sequence()? {
                [name, version] => Ok(AttestationPackageInfo {
                    package_name: String::from_utf8_lossy(name.as_octet_string()?).into_owned(),
                    version: integer(version)?,
                }),
                _ => Err(EncodingError::UnexpectedTag),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let signature_digests = signature_digests
            .as_set()?
            .iter()
            .map(|digest| digest.as_octet_string().map(<[u8]>::to_vec))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { package_infos, signature_digests })
    }
}
