//! Generic DER decoding into an owned tree of [Asn1Value]s.
//!
//! The decoder knows nothing about certificates or attestation records. It reads
//! tag-length-value records, recurses into constructed values and rejects anything that
//! does not add up exactly: truncated input, trailing bytes, indefinite lengths and
//! nesting beyond [DecoderConfig::max_depth].

use alloc::{string::String, vec::Vec};

use codec::{Decode, Encode};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

use crate::error::EncodingError;

/// Default bound on the nesting depth, the top-level value being at depth 1.
pub const DEFAULT_MAX_DEPTH: u32 = 32;

// Universal tag numbers used in this crate.
pub const BOOLEAN: u32 = 1;
pub const INTEGER: u32 = 2;
pub const BIT_STRING: u32 = 3;
pub const OCTET_STRING: u32 = 4;
pub const NULL: u32 = 5;
pub const OBJECT_IDENTIFIER: u32 = 6;
pub const ENUMERATED: u32 = 10;
pub const UTF8_STRING: u32 = 12;
pub const SEQUENCE: u32 = 16;
pub const SET: u32 = 17;
pub const NUMERIC_STRING: u32 = 18;
pub const PRINTABLE_STRING: u32 = 19;
pub const T61_STRING: u32 = 20;
pub const IA5_STRING: u32 = 22;
pub const UTC_TIME: u32 = 23;
pub const GENERALIZED_TIME: u32 = 24;
pub const VISIBLE_STRING: u32 = 26;
pub const BMP_STRING: u32 = 30;

/// Bounds applied while decoding.
#[derive(Debug, Encode, Decode, TypeInfo, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecoderConfig {
    /// Maximum nesting depth; deeper input fails with [EncodingError::DepthExceeded].
    pub max_depth: u32,
    /// Reject non-minimal length and tag encodings.
    pub strict: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self { max_depth: DEFAULT_MAX_DEPTH, strict: false }
    }
}

impl DecoderConfig {
    pub fn strict() -> Self {
        Self { strict: true, ..Default::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagClass {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

impl TagClass {
    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => TagClass::Universal,
            1 => TagClass::Application,
            2 => TagClass::ContextSpecific,
            _ => TagClass::Private,
        }
    }

    fn bits(self) -> u8 {
        match self {
            TagClass::Universal => 0,
            TagClass::Application => 1,
            TagClass::ContextSpecific => 2,
            TagClass::Private => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asn1Content {
    Primitive(Vec<u8>),
    Constructed(Vec<Asn1Value>),
}

/// A decoded ASN.1 value. Children of constructed values are owned in encoding order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asn1Value {
    pub class: TagClass,
    pub number: u32,
    pub content: Asn1Content,
}

/// Decodes exactly one value using the [default](DecoderConfig::default) bounds.
pub fn decode(bytes: &[u8]) -> Result<Asn1Value, EncodingError> {
    decode_with(bytes, &DecoderConfig::default())
}

/// Decodes exactly one value; bytes after it are [EncodingError::TrailingData].
pub fn decode_with(bytes: &[u8], config: &DecoderConfig) -> Result<Asn1Value, EncodingError> {
    let mut reader = Reader::new(bytes, config);
    let value = reader.read_value(1)?;
    if !reader.is_empty() {
        return Err(EncodingError::TrailingData);
    }
    Ok(value)
}

/// Returns the content octets of the single value encoded in `bytes`, without decoding them.
pub fn content_of<'a>(bytes: &'a [u8], config: &DecoderConfig) -> Result<&'a [u8], EncodingError> {
    let mut reader = Reader::new(bytes, config);
    let (_, content, _) = reader.read_raw()?;
    if !reader.is_empty() {
        return Err(EncodingError::TrailingData);
    }
    Ok(content)
}

/// Splits a concatenation of encoded values into the raw slices of each value, headers
/// included. Nested content is not inspected.
pub fn split_elements<'a>(
    bytes: &'a [u8],
    config: &DecoderConfig,
) -> Result<Vec<&'a [u8]>, EncodingError> {
    let mut reader = Reader::new(bytes, config);
    let mut elements = Vec::new();
    while !reader.is_empty() {
        let (_, _, raw) = reader.read_raw()?;
        elements.push(raw);
    }
    Ok(elements)
}

struct Header {
    class: TagClass,
    constructed: bool,
    number: u32,
    length: usize,
}

struct Reader<'a, 'c> {
    data: &'a [u8],
    config: &'c DecoderConfig,
}

impl<'a, 'c> Reader<'a, 'c> {
    fn new(data: &'a [u8], config: &'c DecoderConfig) -> Self {
        Self { data, config }
    }

    fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn read_byte(&mut self) -> Result<u8, EncodingError> {
        let (&byte, rest) = self.data.split_first().ok_or(EncodingError::Truncated)?;
        self.data = rest;
        Ok(byte)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], EncodingError> {
        if len > self.data.len() {
            return Err(EncodingError::Truncated);
        }
        let (taken, rest) = self.data.split_at(len);
        self.data = rest;
        Ok(taken)
    }

    fn read_header(&mut self) -> Result<Header, EncodingError> {
        let first = self.read_byte()?;
        let class = TagClass::from_bits(first >> 6);
        let constructed = first & 0x20 != 0;
        let mut number = u32::from(first & 0x1f);

        if number == 0x1f {
            number = 0;
            loop {
                let byte = self.read_byte()?;
                // X.690 8.1.2.4.2: the first subsequent octet shall not be 0x80
                if number == 0 && byte == 0x80 {
                    return Err(EncodingError::NonMinimalTag);
                }
                if number > (u32::MAX >> 7) {
                    return Err(EncodingError::TagNumberOverflow);
                }
                number = (number << 7) | u32::from(byte & 0x7f);
                if byte & 0x80 == 0 {
                    break;
                }
            }
            if self.config.strict && number < 0x1f {
                return Err(EncodingError::NonMinimalTag);
            }
        }

        let length = self.read_length()?;
        if length > self.data.len() {
            return Err(EncodingError::Truncated);
        }

        Ok(Header { class, constructed, number, length })
    }

    fn read_length(&mut self) -> Result<usize, EncodingError> {
        let first = self.read_byte()?;
        if first < 0x80 {
            return Ok(usize::from(first));
        }
        if first == 0x80 {
            return Err(EncodingError::IndefiniteLength);
        }

        let count = usize::from(first & 0x7f);
        if count > 4 {
            return Err(EncodingError::LengthOverflow);
        }
        let octets = self.take(count)?;
        let length = octets.iter().fold(0usize, |acc, byte| (acc << 8) | usize::from(*byte));

        if self.config.strict && (length < 0x80 || octets[0] == 0) {
            return Err(EncodingError::NonMinimalLength);
        }
        Ok(length)
    }

    /// Reads one value without recursing: its header, content and full raw encoding.
    fn read_raw(&mut self) -> Result<(Header, &'a [u8], &'a [u8]), EncodingError> {
        let start = self.data;
        let header = self.read_header()?;
        let content = self.take(header.length)?;
        let consumed = start.len() - self.data.len();
        Ok((header, content, &start[..consumed]))
    }

    fn read_value(&mut self, depth: u32) -> Result<Asn1Value, EncodingError> {
        if depth > self.config.max_depth {
            return Err(EncodingError::DepthExceeded);
        }

        let header = self.read_header()?;
        let body = self.take(header.length)?;

        let content = if header.constructed {
            let mut inner = Reader::new(body, self.config);
            let mut children = Vec::new();
            while !inner.is_empty() {
                children.push(inner.read_value(depth + 1)?);
            }
            Asn1Content::Constructed(children)
        } else {
            Asn1Content::Primitive(body.to_vec())
        };

        Ok(Asn1Value { class: header.class, number: header.number, content })
    }
}

impl Asn1Value {
    pub fn primitive(class: TagClass, number: u32, bytes: Vec<u8>) -> Self {
        Self { class, number, content: Asn1Content::Primitive(bytes) }
    }

    pub fn constructed(class: TagClass, number: u32, children: Vec<Asn1Value>) -> Self {
        Self { class, number, content: Asn1Content::Constructed(children) }
    }

    pub fn sequence(children: Vec<Asn1Value>) -> Self {
        Self::constructed(TagClass::Universal, SEQUENCE, children)
    }

    pub fn set(children: Vec<Asn1Value>) -> Self {
        Self::constructed(TagClass::Universal, SET, children)
    }

    pub fn integer(value: i64) -> Self {
        Self::primitive(TagClass::Universal, INTEGER, minimal_integer(value))
    }

    pub fn enumerated(value: i64) -> Self {
        Self::primitive(TagClass::Universal, ENUMERATED, minimal_integer(value))
    }

    pub fn boolean(value: bool) -> Self {
        Self::primitive(TagClass::Universal, BOOLEAN, alloc::vec![if value { 0xff } else { 0x00 }])
    }

    pub fn null() -> Self {
        Self::primitive(TagClass::Universal, NULL, Vec::new())
    }

    pub fn octet_string(bytes: &[u8]) -> Self {
        Self::primitive(TagClass::Universal, OCTET_STRING, bytes.to_vec())
    }

    /// Wraps `inner` as `[number] EXPLICIT`.
    pub fn explicit(number: u32, inner: Asn1Value) -> Self {
        Self::constructed(TagClass::ContextSpecific, number, alloc::vec![inner])
    }

    pub fn is_constructed(&self) -> bool {
        matches!(self.content, Asn1Content::Constructed(_))
    }

    pub fn is(&self, class: TagClass, number: u32) -> bool {
        self.class == class && self.number == number
    }

    pub fn is_universal(&self, number: u32) -> bool {
        self.is(TagClass::Universal, number)
    }

    pub fn children(&self) -> Result<&[Asn1Value], EncodingError> {
        match &self.content {
            Asn1Content::Constructed(children) => Ok(children),
            Asn1Content::Primitive(_) => Err(EncodingError::UnexpectedTag),
        }
    }

    pub fn primitive_bytes(&self) -> Result<&[u8], EncodingError> {
        match &self.content {
            Asn1Content::Primitive(bytes) => Ok(bytes),
            Asn1Content::Constructed(_) => Err(EncodingError::UnexpectedTag),
        }
    }

    fn universal_primitive(&self, number: u32) -> Result<&[u8], EncodingError> {
        if !self.is_universal(number) {
            return Err(EncodingError::UnexpectedTag);
        }
        self.primitive_bytes()
    }

    pub fn as_sequence(&self) -> Result<&[Asn1Value], EncodingError> {
        if !self.is_universal(SEQUENCE) {
            return Err(EncodingError::UnexpectedTag);
        }
        self.children()
    }

    pub fn as_set(&self) -> Result<&[Asn1Value], EncodingError> {
        if !self.is_universal(SET) {
            return Err(EncodingError::UnexpectedTag);
        }
        self.children()
    }

    pub fn as_integer(&self) -> Result<i64, EncodingError> {
        signed_integer(self.universal_primitive(INTEGER)?)
    }

    pub fn as_enumerated(&self) -> Result<i64, EncodingError> {
        signed_integer(self.universal_primitive(ENUMERATED)?)
    }

    /// Magnitude of a non-negative INTEGER as big-endian bytes without sign padding.
    pub fn as_unsigned_integer(&self) -> Result<&[u8], EncodingError> {
        let bytes = self.universal_primitive(INTEGER)?;
        match bytes {
            [] => Err(EncodingError::InvalidInteger),
            [first, ..] if first & 0x80 != 0 => Err(EncodingError::InvalidInteger),
            [0, rest @ ..] if !rest.is_empty() => Ok(rest),
            _ => Ok(bytes),
        }
    }

    pub fn as_bool(&self) -> Result<bool, EncodingError> {
        match self.universal_primitive(BOOLEAN)? {
            [0x00] => Ok(false),
            [0xff] => Ok(true),
            _ => Err(EncodingError::InvalidBoolean),
        }
    }

    pub fn as_null(&self) -> Result<(), EncodingError> {
        match self.universal_primitive(NULL)? {
            [] => Ok(()),
            _ => Err(EncodingError::InvalidNull),
        }
    }

    pub fn as_octet_string(&self) -> Result<&[u8], EncodingError> {
        self.universal_primitive(OCTET_STRING)
    }

    /// Content of a BIT STRING that has no unused bits, as keys and signatures do.
    pub fn as_bit_string(&self) -> Result<&[u8], EncodingError> {
        match self.universal_primitive(BIT_STRING)? {
            [0, bits @ ..] => Ok(bits),
            _ => Err(EncodingError::InvalidBitString),
        }
    }

    pub fn as_object_identifier(&self) -> Result<asn1::ObjectIdentifier, EncodingError> {
        self.universal_primitive(OBJECT_IDENTIFIER)?;
        asn1::parse_single::<asn1::ObjectIdentifier>(&self.to_der())
            .map_err(|_| EncodingError::InvalidObjectIdentifier)
    }

    /// UTCTime or GeneralizedTime as milliseconds since the Unix epoch.
    pub fn as_time_millis(&self) -> Result<i64, EncodingError> {
        let der = self.to_der();
        if self.is_universal(UTC_TIME) {
            let time = asn1::parse_single::<asn1::UtcTime>(&der)
                .map_err(|_| EncodingError::InvalidTime)?;
            datetime_millis(time.as_datetime())
        } else if self.is_universal(GENERALIZED_TIME) {
            let time = asn1::parse_single::<asn1::GeneralizedTime>(&der)
                .map_err(|_| EncodingError::InvalidTime)?;
            datetime_millis(time.as_datetime())
        } else {
            Err(EncodingError::UnexpectedTag)
        }
    }

    /// Any of the character string types found in distinguished names.
    pub fn as_string(&self) -> Result<String, EncodingError> {
        if self.class != TagClass::Universal {
            return Err(EncodingError::UnexpectedTag);
        }
        let bytes = self.primitive_bytes()?;
        match self.number {
            UTF8_STRING | NUMERIC_STRING | PRINTABLE_STRING | T61_STRING | IA5_STRING
            | VISIBLE_STRING => Ok(String::from_utf8_lossy(bytes).into_owned()),
            BMP_STRING => {
                let units = bytes.chunks(2).map(|c| {
                    u16::from_be_bytes([c[0], c.get(1).copied().unwrap_or_default()])
                });
                Ok(char::decode_utf16(units)
                    .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                    .collect())
            }
            _ => Err(EncodingError::UnexpectedTag),
        }
    }

    /// The single child of a `[n] EXPLICIT` value.
    pub fn explicit_inner(&self) -> Option<&Asn1Value> {
        if self.class != TagClass::ContextSpecific {
            return None;
        }
        match &self.content {
            Asn1Content::Constructed(children) if children.len() == 1 => children.first(),
            _ => None,
        }
    }

    /// Looks up the `[number] EXPLICIT` child of a constructed value and returns its inner value.
    pub fn find_explicit(&self, number: u32) -> Option<&Asn1Value> {
        self.children()
            .ok()?
            .iter()
            .find(|child| child.is(TagClass::ContextSpecific, number))
            .and_then(Asn1Value::explicit_inner)
    }

    /// Minimal DER encoding of this value.
    pub fn to_der(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_der(&mut out);
        out
    }

    fn write_der(&self, out: &mut Vec<u8>) {
        write_identifier(out, self.class, self.is_constructed(), self.number);
        match &self.content {
            Asn1Content::Primitive(bytes) => {
                write_length(out, bytes.len());
                out.extend_from_slice(bytes);
            }
            Asn1Content::Constructed(children) => {
                let mut body = Vec::new();
                for child in children {
                    child.write_der(&mut body);
                }
                write_length(out, body.len());
                out.extend_from_slice(&body);
            }
        }
    }
}

fn signed_integer(bytes: &[u8]) -> Result<i64, EncodingError> {
    if bytes.is_empty() {
        return Err(EncodingError::InvalidInteger);
    }
    if bytes.len() > 8 {
        return Err(EncodingError::IntegerOverflow);
    }
    let init: i64 = if bytes[0] & 0x80 != 0 { -1 } else { 0 };
    Ok(bytes.iter().fold(init, |acc, byte| (acc << 8) | i64::from(*byte)))
}

fn minimal_integer(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xff && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

fn datetime_millis(time: &asn1::DateTime) -> Result<i64, EncodingError> {
    let date = chrono::NaiveDate::from_ymd_opt(
        i32::from(time.year()),
        u32::from(time.month()),
        u32::from(time.day()),
    )
    .ok_or(EncodingError::InvalidTime)?;
    let date_time = date
        .and_hms_opt(u32::from(time.hour()), u32::from(time.minute()), u32::from(time.second()))
        .ok_or(EncodingError::InvalidTime)?;
    Ok(date_time.and_utc().timestamp_millis())
}

fn write_identifier(out: &mut Vec<u8>, class: TagClass, constructed: bool, number: u32) {
    let lead = (class.bits() << 6) | if constructed { 0x20 } else { 0x00 };
    if number < 0x1f {
        out.push(lead | number as u8);
        return;
    }

    out.push(lead | 0x1f);
    let mut groups = [0u8; 5];
    let mut remaining = number;
    let mut start = groups.len();
    loop {
        start -= 1;
        groups[start] = (remaining & 0x7f) as u8;
        remaining >>= 7;
        if remaining == 0 {
            break;
        }
    }
    let last = groups.len() - 1;
    for (i, group) in groups.iter().enumerate().skip(start) {
        out.push(if i < last { group | 0x80 } else { *group });
    }
}

fn write_length(out: &mut Vec<u8>, length: usize) {
    if length < 0x80 {
        out.push(length as u8);
        return;
    }
    let bytes = (length as u64).to_be_bytes();
    let skip = bytes.iter().take_while(|b| **b == 0).count();
    out.push(0x80 | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use hex_literal::hex;

    macro_rules! rejects {
        ($( $(#[$attr:meta])* $test_name:ident( $config:expr, $input:expr, $expected:expr ); )+) => {
            $(
                $(#[$attr])*
                #[test]
                fn $test_name() {
                    assert_eq!(decode_with(&$input, &$config), Err($expected));
                }
            )+
        }
    }

    fn sample_tree() -> Asn1Value {
        Asn1Value::sequence(vec![
            Asn1Value::integer(4),
            Asn1Value::enumerated(2),
            Asn1Value::octet_string(b"challenge"),
            Asn1Value::sequence(vec![
                Asn1Value::explicit(1, Asn1Value::set(vec![Asn1Value::integer(2)])),
                Asn1Value::explicit(503, Asn1Value::null()),
                Asn1Value::explicit(
                    704,
                    Asn1Value::sequence(vec![
                        Asn1Value::octet_string(&[0xab; 32]),
                        Asn1Value::boolean(true),
                        Asn1Value::enumerated(0),
                    ]),
                ),
            ]),
            Asn1Value::primitive(TagClass::Private, 0x4000, vec![1, 2, 3]),
            Asn1Value::primitive(TagClass::Application, 7, vec![0; 300]),
        ])
    }

    #[test]
    fn test_decode_primitive_and_constructed() {
        let value = decode(&hex!("30 06 02 01 05 04 01 ff")).unwrap();
        assert!(value.is_constructed());
        let fields = value.as_sequence().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].as_integer(), Ok(5));
        assert_eq!(fields[1].as_octet_string(), Ok(&[0xff][..]));
    }

    #[test]
    fn test_decode_high_tag_number() {
        // [704] EXPLICIT INTEGER 5
        let value = decode(&hex!("bf 85 40 03 02 01 05")).unwrap();
        assert_eq!(value.class, TagClass::ContextSpecific);
        assert_eq!(value.number, 704);
        assert_eq!(value.explicit_inner().and_then(|v| v.as_integer().ok()), Some(5));
        assert_eq!(value.to_der(), hex!("bf 85 40 03 02 01 05"));
    }

    #[test]
    fn test_round_trip() {
        let tree = sample_tree();
        let encoded = tree.to_der();
        assert_eq!(decode(&encoded), Ok(tree.clone()));
        assert_eq!(decode_with(&encoded, &DecoderConfig::strict()), Ok(tree));
    }

    fn boundary_shapes() -> Vec<Asn1Value> {
        vec![
            Asn1Value::octet_string(&[]),
            Asn1Value::null(),
            Asn1Value::sequence(vec![]),
            Asn1Value::octet_string(&[0x5a; 127]),
            Asn1Value::octet_string(&[0x5a; 128]),
            Asn1Value::octet_string(&[0x5a; 255]),
            Asn1Value::octet_string(&[0x5a; 256]),
            Asn1Value::sequence(vec![Asn1Value::octet_string(&[0; 252])]),
            Asn1Value::primitive(TagClass::ContextSpecific, 30, vec![]),
            Asn1Value::primitive(TagClass::ContextSpecific, 31, vec![1]),
            Asn1Value::constructed(TagClass::Private, 0x3fff, vec![Asn1Value::null()]),
            Asn1Value::constructed(TagClass::Application, 0x4000, vec![]),
        ]
    }

    #[test]
    fn test_boundary_headers() {
        let headers: [&[u8]; 12] = [
            &hex!("04 00"),
            &hex!("05 00"),
            &hex!("30 00"),
            &hex!("04 7f"),
            &hex!("04 81 80"),
            &hex!("04 81 ff"),
            &hex!("04 82 01 00"),
            &hex!("30 81 ff 04 81 fc"),
            &hex!("9e 00"),
            &hex!("9f 1f 01"),
            &hex!("ff ff 7f 02 05 00"),
            &hex!("7f 81 80 00 00"),
        ];
        for (shape, header) in boundary_shapes().iter().zip(headers) {
            assert!(shape.to_der().starts_with(header), "{:?}", shape);
        }
    }

    #[test]
    fn test_boundary_shapes_round_trip() {
        for shape in boundary_shapes() {
            let encoded = shape.to_der();
            assert_eq!(decode(&encoded).as_ref(), Ok(&shape));
            assert_eq!(decode_with(&encoded, &DecoderConfig::strict()), Ok(shape));
        }
    }

    #[test]
    fn test_boundary_shapes_reject_every_truncation() {
        for shape in boundary_shapes() {
            let encoded = shape.to_der();
            for len in 0..encoded.len() {
                assert!(decode(&encoded[..len]).is_err(), "{:?} decoded from {} bytes", shape, len);
            }
        }
    }

    #[test]
    fn test_decoding_is_deterministic() {
        let encoded = sample_tree().to_der();
        assert_eq!(decode(&encoded), decode(&encoded));
    }

    #[test]
    fn test_every_truncation_is_rejected() {
        let encoded = sample_tree().to_der();
        for len in 0..encoded.len() {
            assert!(decode(&encoded[..len]).is_err(), "prefix of length {} decoded", len);
        }
    }

    fn nested(depth: u32) -> Asn1Value {
        (1..depth).fold(Asn1Value::sequence(vec![]), |inner, _| Asn1Value::sequence(vec![inner]))
    }

    #[test]
    fn test_depth_bound() {
        assert_eq!(decode(&nested(DEFAULT_MAX_DEPTH).to_der()), Ok(nested(DEFAULT_MAX_DEPTH)));
        assert_eq!(
            decode(&nested(DEFAULT_MAX_DEPTH + 1).to_der()),
            Err(EncodingError::DepthExceeded)
        );

        let shallow = DecoderConfig { max_depth: 2, strict: false };
        assert_eq!(decode_with(&nested(3).to_der(), &shallow), Err(EncodingError::DepthExceeded));
    }

    #[test]
    fn test_non_minimal_length_only_rejected_in_strict_mode() {
        let encoded = hex!("30 81 03 02 01 05");
        assert_eq!(
            decode(&encoded).map(|v| v.to_der()),
            Ok(hex!("30 03 02 01 05").to_vec())
        );
        assert_eq!(
            decode_with(&encoded, &DecoderConfig::strict()),
            Err(EncodingError::NonMinimalLength)
        );
    }

    rejects! {
        test_reject_empty_input(DecoderConfig::default(), hex!(""), EncodingError::Truncated);
        test_reject_missing_length(DecoderConfig::default(), hex!("30"), EncodingError::Truncated);
        test_reject_length_beyond_input(DecoderConfig::default(), hex!("04 05 01 02"), EncodingError::Truncated);
        test_reject_child_overrunning_parent(DecoderConfig::default(), hex!("30 03 02 02 01"), EncodingError::Truncated);
        test_reject_truncated_long_length(DecoderConfig::default(), hex!("04 82 01"), EncodingError::Truncated);
        test_reject_indefinite_length(DecoderConfig::default(), hex!("30 80 00 00"), EncodingError::IndefiniteLength);
        test_reject_five_length_octets(DecoderConfig::default(), hex!("04 85 00 00 00 00 01 00"), EncodingError::LengthOverflow);
        test_reject_trailing_data(DecoderConfig::default(), hex!("05 00 00"), EncodingError::TrailingData);
        test_reject_padded_high_tag(DecoderConfig::default(), hex!("9f 80 01 00"), EncodingError::NonMinimalTag);
        test_reject_tag_number_overflow(DecoderConfig::default(), hex!("9f 8f ff ff ff ff 7f 00"), EncodingError::TagNumberOverflow);
        test_reject_high_form_for_low_tag_in_strict_mode(DecoderConfig::strict(), hex!("9f 1e 00"), EncodingError::NonMinimalTag);
        test_reject_leading_zero_length_in_strict_mode(DecoderConfig::strict(), hex!("04 82 00 81") , EncodingError::NonMinimalLength);
    }

    #[test]
    fn test_integer_accessors() {
        assert_eq!(decode(&hex!("02 01 00")).unwrap().as_integer(), Ok(0));
        assert_eq!(decode(&hex!("02 01 ff")).unwrap().as_integer(), Ok(-1));
        assert_eq!(decode(&hex!("02 02 01 00")).unwrap().as_integer(), Ok(256));
        assert_eq!(decode(&hex!("02 02 ff 7f")).unwrap().as_integer(), Ok(-129));
        assert_eq!(
            decode(&hex!("02 08 7f ff ff ff ff ff ff ff")).unwrap().as_integer(),
            Ok(i64::MAX)
        );
        assert_eq!(
            decode(&hex!("02 09 00 80 00 00 00 00 00 00 00")).unwrap().as_integer(),
            Err(EncodingError::IntegerOverflow)
        );
        assert_eq!(decode(&hex!("02 00")).unwrap().as_integer(), Err(EncodingError::InvalidInteger));
        assert_eq!(decode(&hex!("0a 01 02")).unwrap().as_integer(), Err(EncodingError::UnexpectedTag));
        assert_eq!(decode(&hex!("0a 01 02")).unwrap().as_enumerated(), Ok(2));
        assert_eq!(
            decode(&hex!("02 03 00 ff 01")).unwrap().as_unsigned_integer(),
            Ok(&hex!("ff 01")[..])
        );

        for value in [0, 1, -1, 127, 128, -128, -129, 255, 256, i64::MIN, i64::MAX] {
            assert_eq!(decode(&Asn1Value::integer(value).to_der()).unwrap().as_integer(), Ok(value));
        }
    }

    #[test]
    fn test_bool_null_and_bit_string_accessors() {
        assert_eq!(decode(&hex!("01 01 ff")).unwrap().as_bool(), Ok(true));
        assert_eq!(decode(&hex!("01 01 00")).unwrap().as_bool(), Ok(false));
        assert_eq!(decode(&hex!("01 01 01")).unwrap().as_bool(), Err(EncodingError::InvalidBoolean));
        assert_eq!(decode(&hex!("05 00")).unwrap().as_null(), Ok(()));
        assert_eq!(decode(&hex!("05 01 00")).unwrap().as_null(), Err(EncodingError::InvalidNull));
        assert_eq!(decode(&hex!("03 03 00 01 02")).unwrap().as_bit_string(), Ok(&hex!("01 02")[..]));
        assert_eq!(
            decode(&hex!("03 02 04 f0")).unwrap().as_bit_string(),
            Err(EncodingError::InvalidBitString)
        );
    }

    #[test]
    fn test_object_identifier_and_time_accessors() {
        let oid = decode(&hex!("06 0a 2b 06 01 04 01 d6 79 02 01 11")).unwrap();
        assert_eq!(
            alloc::string::ToString::to_string(&oid.as_object_identifier().unwrap()),
            "1.3.6.1.4.1.11129.2.1.17"
        );

        let utc = Asn1Value::primitive(TagClass::Universal, UTC_TIME, b"220709105155Z".to_vec());
        assert_eq!(utc.as_time_millis(), Ok(1_657_363_915_000));
        let generalized =
            Asn1Value::primitive(TagClass::Universal, GENERALIZED_TIME, b"20220709105155Z".to_vec());
        assert_eq!(generalized.as_time_millis(), Ok(1_657_363_915_000));
        let epoch = Asn1Value::primitive(TagClass::Universal, UTC_TIME, b"700101000000Z".to_vec());
        assert_eq!(epoch.as_time_millis(), Ok(0));
        let garbage = Asn1Value::primitive(TagClass::Universal, UTC_TIME, b"not a time".to_vec());
        assert_eq!(garbage.as_time_millis(), Err(EncodingError::InvalidTime));
    }

    #[test]
    fn test_find_explicit() {
        let tree = sample_tree();
        let list = &tree.as_sequence().unwrap()[3];
        assert_eq!(list.find_explicit(503), Some(&Asn1Value::null()));
        assert!(list.find_explicit(704).unwrap().as_sequence().is_ok());
        assert_eq!(list.find_explicit(2), None);
    }

    fn list_content(der: &[u8]) -> &[u8] {
        let config = DecoderConfig::strict();
        content_of(der, &config).unwrap()
    }

    #[test]
    fn test_raw_slices_outlive_the_config() {
        let der = hex!("30 06 02 01 05 05 00");
        let content = list_content(&der);
        assert_eq!(content, &hex!("02 01 05 05 00")[..]);

        let elements = split_elements(content, &DecoderConfig::default()).unwrap();
        assert_eq!(elements, vec![&hex!("02 01 05")[..], &hex!("05 00")[..]]);
    }

    #[test]
    fn test_split_elements_keeps_raw_bytes() {
        let input = hex!("02 01 05 04 81 01 ff");
        let config = DecoderConfig::default();
        assert_eq!(
            split_elements(&input, &config),
            Ok(vec![&hex!("02 01 05")[..], &hex!("04 81 01 ff")[..]])
        );
        assert_eq!(content_of(&hex!("30 03 02 01 05"), &config), Ok(&hex!("02 01 05")[..]));
    }
}
