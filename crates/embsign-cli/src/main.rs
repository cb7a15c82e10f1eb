//! Command-line interface for the embsign embedded-signature tool.
//!
//! Prepares ELF binaries, PDF documents and ZIP/JAR archives with a
//! placeholder, signs prepared files with an OpenSSH Ed25519 key, and
//! verifies signed files.

use clap::{ArgAction, Parser, Subcommand};
use embsign::EmbSign;
use std::error::Error as _;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "embsign")]
#[command(about = "Embed and verify Ed25519 signatures inside ELF, PDF and ZIP files")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replace the placeholder in a prepared file with a signature
    Sign {
        /// OpenSSH Ed25519 private key
        #[arg(short = 'k', long = "key")]
        key: PathBuf,

        /// Passphrase for an encrypted private key
        #[arg(long, env = "EMBSIGN_PASSPHRASE", hide_env_values = true)]
        passphrase: Option<String>,

        /// Output file (default: <INPUT>.signed)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Prepared input file
        input: PathBuf,
    },

    /// Check the signature embedded in a file
    Verify {
        /// OpenSSH Ed25519 public key
        #[arg(short = 'k', long = "key")]
        key: PathBuf,

        /// Signed file
        input: PathBuf,
    },

    /// Prepare a file by adding the placeholder
    InjectPlaceholder {
        /// Output file (default: <INPUT>.placeholder)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// ELF section name
        #[arg(long, default_value = embsign::container::elf::DEFAULT_SECTION_NAME)]
        section: String,

        /// ELF binary, PDF document, or ZIP/JAR archive
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error [{}]: {err}", err.stage());
            let mut source = err.source();
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> embsign::Result<()> {
    match command {
        Command::Sign {
            key,
            passphrase,
            output,
            input,
        } => {
            let output = output.unwrap_or_else(|| with_suffix(&input, "signed"));
            let mut signer = EmbSign::new().private_key(key);
            if let Some(passphrase) = passphrase {
                signer = signer.passphrase(passphrase);
            }
            signer.sign_file(&input, &output)?;
            println!("Signed: {}", output.display());
        }
        Command::Verify { key, input } => {
            EmbSign::new().public_key(key).verify_file(&input)?;
            println!("Signature verified successfully.");
        }
        Command::InjectPlaceholder {
            output,
            section,
            input,
        } => {
            let output = output.unwrap_or_else(|| with_suffix(&input, "placeholder"));
            let format = EmbSign::new()
                .section_name(section)
                .inject_placeholder(&input, &output)?;
            println!("Injected placeholder into {format}: {}", output.display());
        }
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// `report.pdf` + `signed` -> `report.pdf.signed`
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}
