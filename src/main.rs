//! `eip712-auth` command line
//!
//! Hashes, signs and verifies EIP-712 typed-data documents. Every command
//! prints one `ApiResponse` JSON object on stdout; logs go to stderr.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use eip712_auth::eip712::{
    address_of, encode_type, parse_private_key, recover_address_with, type_hash,
    verify_signature_with, Eip712Error, Eip712Signature, TypedData, Verification,
};
use eip712_auth::error::{AuthError, ErrorCode};
use eip712_auth::types::{
    ApiResponse, EncodeTypeOutput, HashOutput, RecoverOutput, SignOutput, VerifyOutput,
};
use eip712_auth::utils::crypto::to_hex_prefixed;
use eip712_auth::utils::logging;
use eip712_auth::utils::security_config::{SecurityLevel, SecuritySettings};
use eip712_auth::{log_debug, log_error};
use std::io::Read;
use std::path::PathBuf;

const MODULE: &str = "cli";

/// EIP-712 typed-data hashing, signing and verification.
#[derive(Parser)]
#[command(name = "eip712-auth")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Print debug logs to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Verification policy preset
    #[arg(long, global = true, value_parser = parse_level, conflicts_with = "config")]
    level: Option<SecurityLevel>,

    /// JSON file with security settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the domain separator, struct hash and signing hash.
    Hash(DocumentArgs),

    /// Print the canonical type strings of the primary and domain types.
    EncodeType(DocumentArgs),

    /// Sign the document's signing hash with a private key.
    Sign {
        #[command(flatten)]
        document: DocumentArgs,

        /// Hex private key, optional 0x prefix
        #[arg(long)]
        private_key: String,
    },

    /// Recover the signer address from a signature.
    Recover {
        #[command(flatten)]
        document: DocumentArgs,

        /// 65-byte hex signature (r || s || v)
        #[arg(long)]
        signature: String,
    },

    /// Check that a signature was produced by an address.
    ///
    /// A clean mismatch is a successful run reporting "outcome": "mismatch".
    Verify {
        #[command(flatten)]
        document: DocumentArgs,

        /// 65-byte hex signature (r || s || v)
        #[arg(long)]
        signature: String,

        /// Expected signer address
        #[arg(long)]
        address: String,
    },
}

#[derive(Args)]
struct DocumentArgs {
    /// Typed-data JSON file, or `-` for stdin
    #[arg(long, value_name = "FILE")]
    typed_data: PathBuf,
}

fn parse_level(s: &str) -> Result<SecurityLevel, String> {
    s.parse::<SecurityLevel>().map_err(|e| e.message)
}

fn main() {
    let cli = Cli::parse();
    if cli.verbose {
        logging::enable_debug();
    }

    match run(&cli) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            let report = report(&e);
            log_error!(MODULE, "Command failed", code = format!("{:?}", report.code));
            println!("{}", ApiResponse::<()>::err(report).to_json());
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<String> {
    let settings = load_settings(cli)?;
    log_debug!(MODULE, "Loaded security settings", level = format!("{:?}", settings.level));

    let json = match &cli.command {
        Commands::Hash(document) => {
            let typed = load_document(document)?;
            let pre_image = typed.pre_image()?;
            ApiResponse::ok(HashOutput::from(&pre_image)).to_json()
        }
        Commands::EncodeType(document) => {
            let typed = load_document(document)?;
            let primary = &typed.message.primary_type;
            ApiResponse::ok(EncodeTypeOutput {
                primary_type: primary.clone(),
                encoded_type: encode_type(&typed.registry, primary)?,
                type_hash: to_hex_prefixed(&type_hash(&typed.registry, primary)?),
                domain_type: typed.domain_type()?,
            })
            .to_json()
        }
        Commands::Sign { document, private_key } => {
            let typed = load_document(document)?;
            let key = parse_private_key(private_key)?;
            let hash = typed.signing_hash()?;
            let signature = typed.sign(&key)?;
            ApiResponse::ok(SignOutput::new(&signature, &address_of(&key), &hash)).to_json()
        }
        Commands::Recover { document, signature } => {
            let typed = load_document(document)?;
            let hash = typed.signing_hash()?;
            let signature = Eip712Signature::from_hex(signature)?;
            let address = recover_address_with(&hash, &signature.to_bytes(), &settings)?;
            ApiResponse::ok(RecoverOutput {
                address: address.to_checksum(),
                signing_hash: to_hex_prefixed(&hash),
            })
            .to_json()
        }
        Commands::Verify { document, signature, address } => {
            let typed = load_document(document)?;
            let hash = typed.signing_hash()?;
            let signature = Eip712Signature::from_hex(signature)?;

            let verification =
                verify_signature_with(&hash, &signature.to_bytes(), address, &settings);
            match VerifyOutput::from_verification(&verification, address, &hash) {
                Some(output) => ApiResponse::ok(output).to_json(),
                None => return Err(verification_error(verification).into()),
            }
        }
    };

    Ok(json)
}

fn verification_error(verification: Verification) -> Eip712Error {
    match verification.into_result() {
        Err(e) => e,
        Ok(()) => Eip712Error::RecoveryFailed("verification reported no error".to_string()),
    }
}

fn load_settings(cli: &Cli) -> anyhow::Result<SecuritySettings> {
    let settings = match (&cli.config, cli.level) {
        (Some(path), _) => SecuritySettings::from_file(path)?,
        (None, Some(level)) => SecuritySettings::with_level(level),
        (None, None) => SecuritySettings::default(),
    };
    Ok(settings)
}

fn load_document(args: &DocumentArgs) -> anyhow::Result<TypedData> {
    let contents = if args.typed_data.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("reading typed data from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(&args.typed_data)
            .with_context(|| format!("reading {}", args.typed_data.display()))?
    };

    Ok(TypedData::from_json(&contents)?)
}

/// Map any failure to the JSON error report
fn report(error: &anyhow::Error) -> AuthError {
    if let Some(e) = error.downcast_ref::<AuthError>() {
        return e.clone();
    }
    if let Some(e) = error.downcast_ref::<Eip712Error>() {
        return AuthError::from(e.clone());
    }
    if error.downcast_ref::<std::io::Error>().is_some() {
        return AuthError::new(ErrorCode::InvalidInput, error.to_string())
            .with_details(format!("{:#}", error));
    }
    AuthError::internal(format!("{:#}", error))
}
