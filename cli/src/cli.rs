use std::path::PathBuf;

use ck_attestation::SecurityLevel;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub subcommand: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Verifies a certificate chain and prints the verdict as JSON.
    Verify(VerifyCmd),
    /// Prints the certificates of a chain and the attestation record of its leaf.
    Inspect(InspectCmd),
    /// Assembles the 65 byte challenge from the parts of a recoverable signature.
    Challenge(ChallengeCmd),
}

#[derive(Debug, Args)]
pub struct VerifyCmd {
    /// File with one hex or base64 certificate per line, leaf first; `-` reads stdin
    #[arg(long)]
    pub chain: String,

    /// Expected attestation challenge as hex, optionally `0x` prefixed
    #[arg(long, allow_hyphen_values = true)]
    pub challenge: String,

    /// JSON file with trust anchors and policy
    ///
    /// `--config verifier.json`
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Overrides the minimum security level of the configured policy
    #[arg(long, value_parser = parse_security_level)]
    pub min_security_level: Option<SecurityLevel>,
}

#[derive(Debug, Args)]
pub struct InspectCmd {
    /// File with one hex or base64 certificate per line, leaf first; `-` reads stdin
    #[arg(long)]
    pub chain: String,
}

#[derive(Debug, Args)]
pub struct ChallengeCmd {
    /// 32 bytes hex
    #[arg(long)]
    pub r: String,
    /// 32 bytes hex
    #[arg(long)]
    pub s: String,
    /// Recovery id as one byte hex, e.g. `1b`
    #[arg(long)]
    pub v: String,
}

pub fn parse_security_level(value: &str) -> Result<SecurityLevel, String> {
    match value.to_ascii_lowercase().as_str() {
        "software" => Ok(SecurityLevel::Software),
        "tee" | "trusted-environment" | "trustedenvironment" => {
            Ok(SecurityLevel::TrustedEnvironment)
        }
        "strongbox" | "strong-box" => Ok(SecurityLevel::StrongBox),
        other => Err(format!(
            "unknown security level '{other}', expected software, tee or strongbox"
        )),
    }
}
