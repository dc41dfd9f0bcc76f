use std::path::Path;

use anyhow::{Context, Result};
use ck_attestation::{parse_certificate_chain, Certificate, TrustAnchors, VerificationPolicy};
use log::info;
use serde::Deserialize;

/// Verifier configuration read from a JSON file.
///
/// Keys and certificates are DER, given as hex (optionally `0x` prefixed) or base64.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// `SubjectPublicKeyInfo` structures
    pub trusted_public_keys: Vec<String>,
    /// Certificates whose public keys are trusted
    pub trusted_root_certificates: Vec<String>,
    pub policy: VerificationPolicy,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&content).context("invalid config")
    }

    /// The configured anchors, or the Google hardware attestation root if none are configured.
    pub fn trust_anchors(&self) -> Result<TrustAnchors> {
        if self.trusted_public_keys.is_empty() && self.trusted_root_certificates.is_empty() {
            info!("no trust anchors configured, using the Google hardware attestation root");
            return Ok(TrustAnchors::google_hardware_attestation());
        }

        let mut anchors = TrustAnchors::new();
        for (index, key) in self.trusted_public_keys.iter().enumerate() {
            let der = decode_der(key).with_context(|| format!("trustedPublicKeys[{index}]"))?;
            anchors
                .add_public_key(&der)
                .with_context(|| format!("trustedPublicKeys[{index}] is not a public key"))?;
        }
        for (index, certificate) in self.trusted_root_certificates.iter().enumerate() {
            let der = decode_der(certificate)
                .with_context(|| format!("trustedRootCertificates[{index}]"))?;
            let certificate = Certificate::from_der(&der).with_context(|| {
                format!("trustedRootCertificates[{index}] is not a certificate")
            })?;
            anchors.add_certificate(&certificate);
        }
        info!("loaded {} trust anchors", anchors.len());
        Ok(anchors)
    }
}

fn decode_der(value: &str) -> Result<Vec<u8>> {
    let mut blobs = parse_certificate_chain(value)?;
    match blobs.len() {
        1 => Ok(blobs.remove(0)),
        n => anyhow::bail!("expected a single value, found {n}"),
    }
}
