use std::{io::Read, process::ExitCode, sync::Arc};

use anyhow::{anyhow, Context, Result};
use ck_attestation::{
    extract_attestation, parse_certificate_chain, AttestationVerifier, Certificate,
    SignatureChallenge, Verdict,
};
use clap::Parser;
use log::info;
use serde_json::{json, Value};

use crate::{
    cli::{ChallengeCmd, Cli, Command, InspectCmd, VerifyCmd},
    config::Config,
};

/// Parse and run command line arguments
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.subcommand {
        Command::Verify(cmd) => {
            let verdict = verify(&cmd)?;
            println!("{}", serde_json::to_string_pretty(&verdict)?);
            Ok(if verdict.trusted { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Command::Inspect(cmd) => {
            println!("{}", serde_json::to_string_pretty(&inspect(&cmd)?)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Challenge(cmd) => {
            println!("{}", challenge(&cmd)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

pub fn verify(cmd: &VerifyCmd) -> Result<Verdict> {
    let config = match &cmd.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let mut policy = config.policy.clone();
    if let Some(level) = cmd.min_security_level {
        policy.min_security_level = Some(level);
    }

    let verifier = AttestationVerifier::new(Arc::new(config.trust_anchors()?), policy);
    let chain = read_chain(&cmd.chain)?;
    let challenge = decode_hex(&cmd.challenge).context("invalid challenge")?;

    info!("verifying chain of {} certificates", chain.len());
    Ok(verifier.verify(&chain, &challenge))
}

pub fn inspect(cmd: &InspectCmd) -> Result<Value> {
    let chain = read_chain(&cmd.chain)?;
    let certificates = chain
        .iter()
        .enumerate()
        .map(|(index, der)| {
            Certificate::from_der(der).with_context(|| format!("certificate {index} malformed"))
        })
        .collect::<Result<Vec<_>>>()?;

    let summaries = certificates
        .iter()
        .map(|certificate| {
            json!({
                "subject": certificate.subject.to_string(),
                "issuer": certificate.issuer.to_string(),
                "serialNumber": hex::encode(&certificate.serial_number),
                "notBefore": certificate.not_before,
                "notAfter": certificate.not_after,
                "signatureAlgorithm": certificate.signature_algorithm.algorithm.to_string(),
            })
        })
        .collect::<Vec<_>>();

    let attestation = match certificates.first().map(extract_attestation) {
        Some(Ok(record)) => serde_json::to_value(record)?,
        Some(Err(e)) => json!({ "error": e.to_string() }),
        None => Value::Null,
    };

    Ok(json!({ "certificates": summaries, "attestation": attestation }))
}

pub fn challenge(cmd: &ChallengeCmd) -> Result<String> {
    let challenge = SignatureChallenge {
        r: fixed::<32>(&cmd.r).context("invalid r")?,
        s: fixed::<32>(&cmd.s).context("invalid s")?,
        v: fixed::<1>(&cmd.v).context("invalid v")?[0],
    };
    Ok(format!("0x{}", hex::encode(challenge.to_bytes())))
}

fn read_chain(source: &str) -> Result<Vec<Vec<u8>>> {
    let text = if source == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read chain from stdin")?;
        text
    } else {
        std::fs::read_to_string(source).with_context(|| format!("failed to read {source}"))?
    };
    parse_certificate_chain(&text).with_context(|| format!("invalid certificate chain in {source}"))
}

fn decode_hex(value: &str) -> Result<Vec<u8>> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    Ok(hex::decode(digits)?)
}

fn fixed<const N: usize>(value: &str) -> Result<[u8; N]> {
    decode_hex(value)?
        .try_into()
        .map_err(|bytes: Vec<u8>| anyhow!("expected {N} bytes, found {}", bytes.len()))
}
