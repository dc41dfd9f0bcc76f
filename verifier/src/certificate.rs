use alloc::{
    collections::BTreeMap,
    format,
    string::{String, ToString},
    vec::Vec,
};
use core::{fmt, iter::Peekable, slice::Iter};

use asn1::{oid, ObjectIdentifier};

use crate::{
    asn::{self, Asn1Value, DecoderConfig, TagClass, INTEGER},
    error::{CertificateError, CertificateField},
};

const COMMON_NAME: ObjectIdentifier = oid!(2, 5, 4, 3);
const SERIAL_NUMBER: ObjectIdentifier = oid!(2, 5, 4, 5);
const COUNTRY: ObjectIdentifier = oid!(2, 5, 4, 6);
const LOCALITY: ObjectIdentifier = oid!(2, 5, 4, 7);
const STATE: ObjectIdentifier = oid!(2, 5, 4, 8);
const ORGANIZATION: ObjectIdentifier = oid!(2, 5, 4, 10);
const ORGANIZATIONAL_UNIT: ObjectIdentifier = oid!(2, 5, 4, 11);
const TITLE: ObjectIdentifier = oid!(2, 5, 4, 12);

/// Represents a [X.509 v3 certificate](https://www.rfc-editor.org/rfc/rfc5280#section-4.1)
/// reduced to what chain validation and attestation extraction need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The `tbsCertificate` exactly as it appeared in the input; this is what the issuer signed.
    pub tbs_bytes: Vec<u8>,
    /// The encoded version number, `0` for v1 and `2` for v3.
    pub version: u64,
    /// Content octets of the serial number INTEGER.
    pub serial_number: Vec<u8>,
    pub tbs_signature_algorithm: AlgorithmIdentifier,
    pub signature_algorithm: AlgorithmIdentifier,
    pub signature_value: Vec<u8>,
    pub issuer: Name,
    pub subject: Name,
    pub public_key_info: SubjectPublicKeyInfo,
    /// Extension values keyed by dotted OID, each the DER encoding of the `extnValue` OCTET STRING.
    pub extensions: BTreeMap<String, Vec<u8>>,
    /// Unix milliseconds.
    pub not_before: i64,
    /// Unix milliseconds.
    pub not_after: i64,
}

/// [See RFC](https://www.rfc-editor.org/rfc/rfc5280#section-4.1.1.2)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmIdentifier {
    pub algorithm: ObjectIdentifier,
    /// DER of the parameters, if any.
    pub parameters: Option<Vec<u8>>,
}

/// [See RFC](https://www.rfc-editor.org/rfc/rfc5280#section-4.1.2.7)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectPublicKeyInfo {
    /// Canonical DER of the whole structure, used to compare keys with trust anchors.
    pub raw: Vec<u8>,
    pub algorithm: AlgorithmIdentifier,
    pub subject_public_key: Vec<u8>,
}

/// A distinguished name. [See RFC](https://www.rfc-editor.org/rfc/rfc5280#section-4.1.2.4)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    /// Canonical DER of the name, used to compare issuers, subjects and trust anchors.
    pub raw: Vec<u8>,
    /// Attribute label (or dotted OID for unknown types) and value, in encoding order.
    pub attributes: Vec<(String, String)>,
}

impl Name {
    /// Value of the first `CN` attribute.
    pub fn common_name(&self) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(label, _)| label == "CN")
            .map(|(_, value)| value.as_str())
    }

    fn parse(value: &Asn1Value, field: CertificateField) -> Result<Self, CertificateError> {
        let rdns = value.as_sequence().map_err(|_| malformed(field))?;
        let mut attributes = Vec::new();
        for rdn in rdns {
            for attribute in rdn.as_set().map_err(|_| malformed(field))? {
                match attribute.as_sequence().map_err(|_| malformed(field))? {
                    [typ, value] => {
                        let typ = typ.as_object_identifier().map_err(|_| malformed(field))?;
                        attributes.push((attribute_label(&typ), attribute_value(value)));
                    }
                    _ => return Err(malformed(field)),
                }
            }
        }
        Ok(Self { raw: value.to_der(), attributes })
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (label, value)) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", label, value)?;
        }
        Ok(())
    }
}

fn attribute_label(typ: &ObjectIdentifier) -> String {
    let label = match *typ {
        COMMON_NAME => "CN",
        SERIAL_NUMBER => "serialNumber",
        COUNTRY => "C",
        LOCALITY => "L",
        STATE => "ST",
        ORGANIZATION => "O",
        ORGANIZATIONAL_UNIT => "OU",
        TITLE => "title",
        _ => return typ.to_string(),
    };
    label.to_string()
}

fn attribute_value(value: &Asn1Value) -> String {
    // non-string values are shown as `#` followed by their hex DER, see RFC 4514
    value.as_string().unwrap_or_else(|_| format!("#{}", hex::encode(value.to_der())))
}

fn malformed(field: CertificateField) -> CertificateError {
    CertificateError::MalformedField(field)
}

fn required<'a>(
    fields: &mut Peekable<Iter<'a, Asn1Value>>,
    field: CertificateField,
) -> Result<&'a Asn1Value, CertificateError> {
    fields.next().ok_or(malformed(field))
}

impl AlgorithmIdentifier {
    fn parse(value: &Asn1Value, field: CertificateField) -> Result<Self, CertificateError> {
        let (algorithm, parameters) = match value.as_sequence().map_err(|_| malformed(field))? {
            [algorithm] => (algorithm, None),
            [algorithm, parameters] => (algorithm, Some(parameters.to_der())),
            _ => return Err(malformed(field)),
        };
        let algorithm = algorithm.as_object_identifier().map_err(|_| malformed(field))?;
        Ok(Self { algorithm, parameters })
    }
}

impl SubjectPublicKeyInfo {
    fn parse(value: &Asn1Value) -> Result<Self, CertificateError> {
        let field = CertificateField::SubjectPublicKeyInfo;
        match value.as_sequence().map_err(|_| malformed(field))? {
            [algorithm, key] => Ok(Self {
                raw: value.to_der(),
                algorithm: AlgorithmIdentifier::parse(algorithm, field)?,
                subject_public_key: key.as_bit_string().map_err(|_| malformed(field))?.to_vec(),
            }),
            _ => Err(malformed(field)),
        }
    }

    /// Decodes a standalone DER encoded `SubjectPublicKeyInfo`.
    pub fn from_der(der: &[u8]) -> Result<Self, CertificateError> {
        Self::parse(&asn::decode(der)?)
    }
}

/// Shorthand for [Certificate::from_der].
pub fn parse_certificate(der: &[u8]) -> Result<Certificate, CertificateError> {
    Certificate::from_der(der)
}

impl Certificate {
    pub fn from_der(der: &[u8]) -> Result<Self, CertificateError> {
        Self::from_der_with(der, &DecoderConfig::default())
    }

    pub fn from_der_with(der: &[u8], config: &DecoderConfig) -> Result<Self, CertificateError> {
        let root = asn::decode_with(der, config)?;
        let [tbs, signature_algorithm, signature_value] =
            root.as_sequence().map_err(|_| malformed(CertificateField::Certificate))?
        else {
            return Err(malformed(CertificateField::Certificate));
        };

        // the signature covers the original bytes, never a re-encoding
        let tbs_bytes = asn::split_elements(asn::content_of(der, config)?, config)?
            .first()
            .map(|raw| raw.to_vec())
            .ok_or(malformed(CertificateField::TbsCertificate))?;

        let signature_algorithm =
            AlgorithmIdentifier::parse(signature_algorithm, CertificateField::SignatureAlgorithm)?;
        let signature_value = signature_value
            .as_bit_string()
            .map_err(|_| malformed(CertificateField::SignatureValue))?
            .to_vec();

        let mut fields = tbs
            .as_sequence()
            .map_err(|_| malformed(CertificateField::TbsCertificate))?
            .iter()
            .peekable();

        let version = match fields.next_if(|f| f.is(TagClass::ContextSpecific, 0)) {
            Some(tagged) => tagged
                .explicit_inner()
                .and_then(|v| v.as_integer().ok())
                .and_then(|v| u64::try_from(v).ok())
                .ok_or(malformed(CertificateField::Version))?,
            None => 0,
        };

        let serial = required(&mut fields, CertificateField::SerialNumber)?;
        if !serial.is_universal(INTEGER) {
            return Err(malformed(CertificateField::SerialNumber));
        }
        let serial_number = serial
            .primitive_bytes()
            .map_err(|_| malformed(CertificateField::SerialNumber))?
            .to_vec();

        let tbs_signature_algorithm = AlgorithmIdentifier::parse(
            required(&mut fields, CertificateField::Signature)?,
            CertificateField::Signature,
        )?;
        let issuer =
            Name::parse(required(&mut fields, CertificateField::Issuer)?, CertificateField::Issuer)?;
        let (not_before, not_after) =
            parse_validity(required(&mut fields, CertificateField::Validity)?)?;
        let subject =
            Name::parse(required(&mut fields, CertificateField::Subject)?, CertificateField::Subject)?;
        let public_key_info = SubjectPublicKeyInfo::parse(required(
            &mut fields,
            CertificateField::SubjectPublicKeyInfo,
        )?)?;

        // issuerUniqueID and subjectUniqueID are skipped
        fields.next_if(|f| f.is(TagClass::ContextSpecific, 1));
        fields.next_if(|f| f.is(TagClass::ContextSpecific, 2));

        let extensions = match fields.next_if(|f| f.is(TagClass::ContextSpecific, 3)) {
            Some(tagged) => parse_extensions(
                tagged.explicit_inner().ok_or(malformed(CertificateField::Extensions))?,
            )?,
            None => BTreeMap::new(),
        };

        if fields.next().is_some() {
            return Err(malformed(CertificateField::TbsCertificate));
        }

        Ok(Self {
            tbs_bytes,
            version,
            serial_number,
            tbs_signature_algorithm,
            signature_algorithm,
            signature_value,
            issuer,
            subject,
            public_key_info,
            extensions,
            not_before,
            not_after,
        })
    }

    /// The DER encoded `extnValue` OCTET STRING of the extension with the given dotted OID.
    pub fn get_extension(&self, oid: &str) -> Option<&[u8]> {
        self.extensions.get(oid).map(Vec::as_slice)
    }

    /// Whether `time` (Unix ms) lies within `[not_before, not_after)`.
    pub fn is_valid_at(&self, time: i64) -> bool {
        self.not_before <= time && time < self.not_after
    }

    pub fn is_self_issued(&self) -> bool {
        self.issuer.raw == self.subject.raw
    }
}

fn parse_validity(value: &Asn1Value) -> Result<(i64, i64), CertificateError> {
    let field = CertificateField::Validity;
    match value.as_sequence().map_err(|_| malformed(field))? {
        [not_before, not_after] => Ok((
            not_before.as_time_millis().map_err(|_| malformed(field))?,
            not_after.as_time_millis().map_err(|_| malformed(field))?,
        )),
        _ => Err(malformed(field)),
    }
}

/// [See RFC](https://www.rfc-editor.org/rfc/rfc5280#section-4.1.2.9)
fn parse_extensions(value: &Asn1Value) -> Result<BTreeMap<String, Vec<u8>>, CertificateError> {
    let field = CertificateField::Extensions;
    let mut extensions = BTreeMap::new();
    for extension in value.as_sequence().map_err(|_| malformed(field))? {
        let (id, value) = match extension.as_sequence().map_err(|_| malformed(field))? {
            [id, value] => (id, value),
            [id, critical, value] => {
                critical.as_bool().map_err(|_| malformed(field))?;
                (id, value)
            }
            _ => return Err(malformed(field)),
        };
        let id = id.as_object_identifier().map_err(|_| malformed(field))?.to_string();
        value.as_octet_string().map_err(|_| malformed(field))?;
        if extensions.insert(id, value.to_der()).is_some() {
            return Err(malformed(field));
        }
    }
    Ok(extensions)
}
