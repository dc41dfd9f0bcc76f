//! Command line verifier for hardware key attestation chains.

use std::process::ExitCode;

use anyhow::Result;

mod cli;
mod command;
mod config;

fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    command::run()
}
