use alloc::{
    string::{String, ToString},
    vec,
    vec::Vec,
};

use asn1::ObjectIdentifier;
use num_bigint::BigUint;
use p256::{
    ecdsa::{signature::hazmat::PrehashSigner, SigningKey},
    elliptic_curve::sec1::ToEncodedPoint,
};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::{
    asn::{self, Asn1Value, TagClass},
    attestation::KEY_ATTESTATION_OID,
    chain::{
        TrustAnchors, CURVE_P256, ECDSA_PBK, ECDSA_WITH_SHA256, ECDSA_WITH_SHA384,
        ECDSA_WITH_SHA512, RSA_PBK, SHA256_DIGEST_INFO, SHA256_WITH_RSA, SHA384_DIGEST_INFO,
        SHA384_WITH_RSA, SHA512_DIGEST_INFO, SHA512_WITH_RSA,
    },
};

const COMMON_NAME: ObjectIdentifier = asn1::oid!(2, 5, 4, 3);

const RSA_MODULUS: &[u8] = b"e4ba6d4886acae3c170a9a27940875273ac1d2bd565a7ea83bfb9c7b95efc0d0a644a42bdf459ad0c448c46b7a9a0f1dd3b075f01d8ada8fc1e221887868be3c515e0dc01389901a39ae9a99012378d5929515971bb3f5a8b5c3fa9e4d56c27275cd72550a59ef475bc42262606771f0679c7010e3531c603e84825293310db1";
const RSA_PRIVATE_EXPONENT: &[u8] = b"e345db1115c0bfe03584f368204fc71913e943dd9ed08cc9ddd045cd074f13e83f4e3552e2a7e70d49fc842fc7c30d02363640fa3660a28bf5bb1c56de4e35b718bd5ae65f77dde91e48095c9ffe88f37535e0611c1791d6708f5df5d5aa9699036d85b5cbb8881f041e99b3635eef9075c7def0347b0fa9873a419d5dafd381";

pub fn oid_value(oid: &ObjectIdentifier) -> Asn1Value {
    asn::decode(&asn1::write_single(oid).unwrap()).unwrap()
}

pub fn bit_string(bytes: &[u8]) -> Asn1Value {
    let mut content = vec![0];
    content.extend_from_slice(bytes);
    Asn1Value::primitive(TagClass::Universal, asn::BIT_STRING, content)
}

fn unsigned_integer(bytes: &[u8]) -> Asn1Value {
    let mut content = Vec::new();
    if bytes.first().map_or(true, |b| b & 0x80 != 0) {
        content.push(0);
    }
    content.extend_from_slice(bytes);
    Asn1Value::primitive(TagClass::Universal, asn::INTEGER, content)
}

pub fn name(common_name: &str) -> Asn1Value {
    Asn1Value::sequence(vec![Asn1Value::set(vec![Asn1Value::sequence(vec![
        oid_value(&COMMON_NAME),
        Asn1Value::primitive(TagClass::Universal, asn::UTF8_STRING, common_name.as_bytes().to_vec()),
    ])])])
}

fn utc_time(time: &str) -> Asn1Value {
    Asn1Value::primitive(TagClass::Universal, asn::UTC_TIME, time.as_bytes().to_vec())
}

fn digest(algorithm: &ObjectIdentifier, message: &[u8]) -> Vec<u8> {
    match *algorithm {
        ECDSA_WITH_SHA384 | SHA384_WITH_RSA => Sha384::digest(message).to_vec(),
        ECDSA_WITH_SHA512 | SHA512_WITH_RSA => Sha512::digest(message).to_vec(),
        _ => Sha256::digest(message).to_vec(),
    }
}

fn algorithm_identifier(algorithm: &ObjectIdentifier) -> Asn1Value {
    match *algorithm {
        SHA256_WITH_RSA | SHA384_WITH_RSA | SHA512_WITH_RSA => {
            Asn1Value::sequence(vec![oid_value(algorithm), Asn1Value::null()])
        }
        _ => Asn1Value::sequence(vec![oid_value(algorithm)]),
    }
}

/// A key that can issue test certificates.
pub trait TestSigner {
    fn public_key_info(&self) -> Asn1Value;

    fn sign_with(&self, algorithm: &ObjectIdentifier, message: &[u8]) -> Vec<u8>;

    fn spki_der(&self) -> Vec<u8> {
        self.public_key_info().to_der()
    }
}

/// A P-256 key derived from a one byte seed.
pub struct TestKey(SigningKey);

impl TestKey {
    pub fn new(seed: u8) -> Self {
        Self(SigningKey::from_slice(&[seed; 32]).unwrap())
    }

    pub fn spki_der(&self) -> Vec<u8> {
        TestSigner::spki_der(self)
    }
}

impl TestSigner for TestKey {
    fn public_key_info(&self) -> Asn1Value {
        let point = p256::PublicKey::from(self.0.verifying_key()).to_encoded_point(false);
        Asn1Value::sequence(vec![
            Asn1Value::sequence(vec![oid_value(&ECDSA_PBK), oid_value(&CURVE_P256)]),
            bit_string(point.as_bytes()),
        ])
    }

    fn sign_with(&self, algorithm: &ObjectIdentifier, message: &[u8]) -> Vec<u8> {
        let signature: p256::ecdsa::Signature =
            self.0.sign_prehash(&digest(algorithm, message)).unwrap();
        signature.to_der().as_bytes().to_vec()
    }
}

/// A fixed RSA-1024 key signing with PKCS#1 v1.5.
pub struct TestRsaKey {
    modulus: BigUint,
    exponent: BigUint,
    private_exponent: BigUint,
}

impl TestRsaKey {
    pub fn new() -> Self {
        Self {
            modulus: BigUint::parse_bytes(RSA_MODULUS, 16).unwrap(),
            exponent: BigUint::from(65537u32),
            private_exponent: BigUint::parse_bytes(RSA_PRIVATE_EXPONENT, 16).unwrap(),
        }
    }

    /// Only the public part is meaningful, signatures made with it never verify.
    pub fn public_only(modulus: BigUint, exponent: BigUint) -> Self {
        Self { modulus, exponent, private_exponent: BigUint::from(1u32) }
    }

    pub fn spki_der(&self) -> Vec<u8> {
        TestSigner::spki_der(self)
    }
}

impl TestSigner for TestRsaKey {
    fn public_key_info(&self) -> Asn1Value {
        let key = Asn1Value::sequence(vec![
            unsigned_integer(&self.modulus.to_bytes_be()),
            unsigned_integer(&self.exponent.to_bytes_be()),
        ]);
        Asn1Value::sequence(vec![
            Asn1Value::sequence(vec![oid_value(&RSA_PBK), Asn1Value::null()]),
            bit_string(&key.to_der()),
        ])
    }

    fn sign_with(&self, algorithm: &ObjectIdentifier, message: &[u8]) -> Vec<u8> {
        let digest_info: &[u8] = match *algorithm {
            SHA384_WITH_RSA => &SHA384_DIGEST_INFO,
            SHA512_WITH_RSA => &SHA512_DIGEST_INFO,
            _ => &SHA256_DIGEST_INFO,
        };
        let k = ((self.modulus.bits() + 7) / 8) as usize;
        let t_len = digest_info.len() + digest(algorithm, message).len();

        let mut encoded = vec![0x00, 0x01];
        encoded.resize(k - t_len - 1, 0xff);
        encoded.push(0x00);
        encoded.extend_from_slice(digest_info);
        encoded.extend_from_slice(&digest(algorithm, message));

        let signature = BigUint::from_bytes_be(&encoded)
            .modpow(&self.private_exponent, &self.modulus)
            .to_bytes_be();
        let mut padded = vec![0u8; k - signature.len()];
        padded.extend_from_slice(&signature);
        padded
    }
}

/// Builds DER certificates signed by a [TestSigner].
#[derive(Clone)]
pub struct CertificateBuilder {
    subject: String,
    issuer: String,
    serial: i64,
    public_key_info: Asn1Value,
    not_before: String,
    not_after: String,
    algorithm: ObjectIdentifier,
    outer_algorithm: Option<ObjectIdentifier>,
    extensions: Vec<(ObjectIdentifier, Vec<u8>)>,
}

impl CertificateBuilder {
    pub fn new(subject: &str, key: &impl TestSigner) -> Self {
        Self {
            subject: subject.to_string(),
            issuer: subject.to_string(),
            serial: 1,
            public_key_info: key.public_key_info(),
            not_before: "700101000000Z".to_string(),
            not_after: "491231235959Z".to_string(),
            algorithm: ECDSA_WITH_SHA256,
            outer_algorithm: None,
            extensions: Vec::new(),
        }
    }

    pub fn issuer(mut self, issuer: &str) -> Self {
        self.issuer = issuer.to_string();
        self
    }

    pub fn serial(mut self, serial: i64) -> Self {
        self.serial = serial;
        self
    }

    /// UTCTime strings, `YYMMDDhhmmssZ`.
    pub fn validity(mut self, not_before: &str, not_after: &str) -> Self {
        self.not_before = not_before.to_string();
        self.not_after = not_after.to_string();
        self
    }

    pub fn signature_algorithm(mut self, algorithm: ObjectIdentifier) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Declares a different algorithm outside the `tbsCertificate` than inside.
    pub fn outer_signature_algorithm(mut self, algorithm: ObjectIdentifier) -> Self {
        self.outer_algorithm = Some(algorithm);
        self
    }

    /// Adds an extension whose OCTET STRING wraps `value`.
    pub fn extension(mut self, id: ObjectIdentifier, value: Vec<u8>) -> Self {
        self.extensions.push((id, value));
        self
    }

    pub fn attestation(self, description: &KeyDescriptionBuilder) -> Self {
        self.extension(KEY_ATTESTATION_OID, description.build().to_der())
    }

    pub fn tbs(&self) -> Asn1Value {
        let mut fields = vec![
            Asn1Value::explicit(0, Asn1Value::integer(2)),
            Asn1Value::integer(self.serial),
            algorithm_identifier(&self.algorithm),
            name(&self.issuer),
            Asn1Value::sequence(vec![utc_time(&self.not_before), utc_time(&self.not_after)]),
            name(&self.subject),
            self.public_key_info.clone(),
        ];
        if !self.extensions.is_empty() {
            let extensions = self
                .extensions
                .iter()
                .map(|(id, value)| {
                    Asn1Value::sequence(vec![oid_value(id), Asn1Value::octet_string(value)])
                })
                .collect();
            fields.push(Asn1Value::explicit(3, Asn1Value::sequence(extensions)));
        }
        Asn1Value::sequence(fields)
    }

    pub fn sign(&self, issuer: &impl TestSigner) -> Vec<u8> {
        let tbs = self.tbs();
        let signature = issuer.sign_with(&self.algorithm, &tbs.to_der());
        Asn1Value::sequence(vec![
            tbs,
            algorithm_identifier(self.outer_algorithm.as_ref().unwrap_or(&self.algorithm)),
            bit_string(&signature),
        ])
        .to_der()
    }
}

/// Builds `KeyDescription` records.
#[derive(Clone)]
pub struct KeyDescriptionBuilder {
    version: i64,
    security_level: i64,
    challenge: Vec<u8>,
    software: Vec<Asn1Value>,
    hardware: Vec<Asn1Value>,
}

impl KeyDescriptionBuilder {
    /// A KeyMint 1 record from the trusted environment.
    pub fn new(challenge: &[u8]) -> Self {
        Self {
            version: 100,
            security_level: 1,
            challenge: challenge.to_vec(),
            software: Vec::new(),
            hardware: Vec::new(),
        }
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    /// Sets both the attestation and the keymaster security level.
    pub fn security_level(mut self, level: i64) -> Self {
        self.security_level = level;
        self
    }

    pub fn software(mut self, tag: u32, value: Asn1Value) -> Self {
        self.software.push(Asn1Value::explicit(tag, value));
        self
    }

    pub fn hardware(mut self, tag: u32, value: Asn1Value) -> Self {
        self.hardware.push(Asn1Value::explicit(tag, value));
        self
    }

    pub fn root_of_trust(self, device_locked: bool, verified_boot_state: i64) -> Self {
        self.hardware(
            704,
            Asn1Value::sequence(vec![
                Asn1Value::octet_string(&[0x87; 32]),
                Asn1Value::boolean(device_locked),
                Asn1Value::enumerated(verified_boot_state),
                Asn1Value::octet_string(&[0x3f; 32]),
            ]),
        )
    }

    pub fn build(&self) -> Asn1Value {
        Asn1Value::sequence(vec![
            Asn1Value::integer(self.version),
            Asn1Value::enumerated(self.security_level),
            Asn1Value::integer(self.version),
            Asn1Value::enumerated(self.security_level),
            Asn1Value::octet_string(&self.challenge),
            Asn1Value::octet_string(&[]),
            Asn1Value::sequence(self.software.clone()),
            Asn1Value::sequence(self.hardware.clone()),
        ])
    }

    /// DER of the extension value as found in a certificate.
    pub fn extension_value(&self) -> Vec<u8> {
        Asn1Value::octet_string(&self.build().to_der()).to_der()
    }
}

/// Leaf (carrying `description`), intermediate and root, leaf first, with the root key as anchor.
pub fn attested_chain(description: &KeyDescriptionBuilder) -> (Vec<Vec<u8>>, TrustAnchors) {
    let root = TestKey::new(1);
    let intermediate = TestKey::new(2);
    let leaf = TestKey::new(3);
    let chain = vec![
        CertificateBuilder::new("Android Keystore Key", &leaf)
            .issuer("Intermediate")
            .attestation(description)
            .sign(&intermediate),
        CertificateBuilder::new("Intermediate", &intermediate).issuer("Root").sign(&root),
        CertificateBuilder::new("Root", &root).sign(&root),
    ];
    let anchors = TrustAnchors::new().with_public_key(&root.spki_der()).unwrap();
    (chain, anchors)
}
