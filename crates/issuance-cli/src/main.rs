// crates/issuance-cli/src/main.rs
// ============================================================================
// Module: Issuance CLI Entry Point
// Description: Command dispatcher for identity parsing and provisioner policy.
// Purpose: Let operators inspect enrollment identities and provisioner config.
// Dependencies: clap, humantime, issuance-identity, issuance-provisioner, serde, thiserror, time
// ============================================================================

//! ## Overview
//! The `issuance` CLI parses enrollment identity documents and client IDs,
//! validates authority configuration files, and shows the sign policy a
//! provisioner produces. `provisioner evaluate` runs that policy against a
//! template assembled from flags, so operators can check a request offline.
//! Security posture: inputs are untrusted and size-limited; challenge
//! secrets are never printed.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::net::IpAddr;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use issuance_identity::parse_client_id;
use issuance_identity::parse_device_id;
use issuance_identity::parse_user_id;
use issuance_provisioner::AuthorityConfig;
use issuance_provisioner::CertificateTemplate;
use issuance_provisioner::FileAuditSink;
use issuance_provisioner::NoopAuditSink;
use issuance_provisioner::PolicyElement;
use issuance_provisioner::ProvisionerAuditSink;
use issuance_provisioner::ProvisionerCollection;
use issuance_provisioner::ProvisionerError;
use issuance_provisioner::ProvisionerExtension;
use issuance_provisioner::ProvisionerInterface;
use issuance_provisioner::PublicKeyInfo;
use issuance_provisioner::SignRequest;
use issuance_provisioner::StderrAuditSink;
use issuance_provisioner::Subject;
use issuance_provisioner::apply_policy;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum identity document size accepted from files or stdin.
const MAX_DOCUMENT_BYTES: usize = 64 * 1024;
/// Input argument that selects stdin.
const STDIN_MARKER: &str = "-";
/// Audit log path selecting stderr instead of a file.
const STDERR_MARKER: &str = "-";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "issuance", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Append provisioner audit events to this file as JSON lines (`-` for stderr).
    #[arg(long, value_name = "PATH|-", global = true)]
    audit_log: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Identity document and client ID utilities.
    Identity {
        /// Selected identity subcommand.
        #[command(subcommand)]
        command: IdentityCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Provisioner policy utilities.
    Provisioner {
        /// Selected provisioner subcommand.
        #[command(subcommand)]
        command: ProvisionerCommand,
    },
}

/// Identity subcommands.
#[derive(Subcommand, Debug)]
enum IdentityCommand {
    /// Parse a user identity document.
    User(DocumentArgs),
    /// Parse a device identity document.
    Device(DocumentArgs),
    /// Parse a client ID URI.
    ClientId(ClientIdArgs),
}

/// Identity document input.
#[derive(Args, Debug)]
struct DocumentArgs {
    /// Document path, or `-` for stdin.
    #[arg(value_name = "PATH|-")]
    input: String,
}

/// Client ID input.
#[derive(Args, Debug)]
struct ClientIdArgs {
    /// Client ID URI (`wireapp://user!device@domain`).
    #[arg(value_name = "URI")]
    uri: String,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate a configuration file.
    Validate(ConfigArgs),
}

/// Config file selection.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Optional config file path (defaults to issuance.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Provisioner subcommands.
#[derive(Subcommand, Debug)]
enum ProvisionerCommand {
    /// Print the ordered sign policy of a provisioner.
    Policy(ProvisionerArgs),
    /// Print a provisioner as serialized (secrets redacted).
    Show(ProvisionerArgs),
    /// Apply a provisioner's sign policy to a template built from flags.
    Evaluate(EvaluateCommand),
}

/// Provisioner selection.
#[derive(Args, Debug)]
struct ProvisionerArgs {
    /// Provisioner identifier (for example `scep/devices`).
    #[arg(long, value_name = "ID")]
    id: String,
    /// Config file selection.
    #[command(flatten)]
    config: ConfigArgs,
}

/// Arguments for `provisioner evaluate`.
#[derive(Args, Debug)]
struct EvaluateCommand {
    /// Provisioner selection.
    #[command(flatten)]
    provisioner: ProvisionerArgs,
    /// Requested subject common name.
    #[arg(long, value_name = "NAME", default_value = "")]
    common_name: String,
    /// DNS subject alternative names.
    #[arg(long = "dns", value_name = "NAME")]
    dns_names: Vec<String>,
    /// Email subject alternative names.
    #[arg(long = "email", value_name = "ADDRESS")]
    email_addresses: Vec<String>,
    /// IP subject alternative names.
    #[arg(long = "ip", value_name = "ADDRESS")]
    ip_addresses: Vec<IpAddr>,
    /// URI subject alternative names.
    #[arg(long = "uri", value_name = "URI")]
    uris: Vec<String>,
    /// RSA public key length in bits.
    #[arg(long, value_name = "BITS", conflicts_with_all = ["ec_curve", "ed25519"])]
    rsa_bits: Option<u32>,
    /// ECDSA public key curve name.
    #[arg(long, value_name = "CURVE", conflicts_with = "ed25519")]
    ec_curve: Option<String>,
    /// Use an Ed25519 public key.
    #[arg(long, action = ArgAction::SetTrue)]
    ed25519: bool,
    /// Requested certificate lifetime (for example `12h`).
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    duration: Option<Duration>,
}

/// Result of a successful `provisioner evaluate`.
#[derive(Debug, Serialize)]
struct EvaluationReport {
    /// Evaluated provisioner identifier.
    provisioner_id: String,
    /// Final certificate subject.
    subject: Subject,
    /// Start of validity (Unix seconds).
    not_before_unix: Option<i64>,
    /// End of validity (Unix seconds).
    not_after_unix: Option<i64>,
    /// Provisioner extension attached by the policy.
    provisioner_extension: Option<ProvisionerExtension>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Bounded read failures.
#[derive(Debug, Error)]
enum ReadLimitError {
    /// Input I/O failure.
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    /// Input size exceeds the configured limit.
    #[error("input exceeds size limit ({size} bytes > {limit} bytes)")]
    TooLarge {
        /// Observed size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Parses arguments and executes the selected command.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("issuance {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }
    let Some(command) = cli.command else {
        return Err(CliError::new("no command given; run `issuance --help`".to_string()));
    };
    let audit = audit_sink(cli.audit_log.as_deref())?;
    let output = execute(command, audit)?;
    write_stdout_line(&output).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Dispatches a command and returns its stdout text.
fn execute(command: Commands, audit: Arc<dyn ProvisionerAuditSink>) -> CliResult<String> {
    match command {
        Commands::Identity {
            command,
        } => command_identity(command),
        Commands::Config {
            command,
        } => command_config(command, audit),
        Commands::Provisioner {
            command,
        } => command_provisioner(command, audit),
    }
}

/// Selects the audit sink for provisioner events.
fn audit_sink(path: Option<&Path>) -> CliResult<Arc<dyn ProvisionerAuditSink>> {
    match path {
        Some(path) if path.as_os_str() == STDERR_MARKER => Ok(Arc::new(StderrAuditSink)),
        Some(path) => {
            let sink = FileAuditSink::new(path).map_err(|err| {
                CliError::new(format!("failed to open audit log {}: {err}", path.display()))
            })?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(NoopAuditSink)),
    }
}

// ============================================================================
// SECTION: Identity Commands
// ============================================================================

/// Executes identity subcommands.
fn command_identity(command: IdentityCommand) -> CliResult<String> {
    match command {
        IdentityCommand::User(args) => {
            let bytes = read_document(&args.input)?;
            let user = parse_user_id(&bytes).map_err(|err| CliError::new(err.to_string()))?;
            to_json(&user)
        }
        IdentityCommand::Device(args) => {
            let bytes = read_document(&args.input)?;
            let device = parse_device_id(&bytes).map_err(|err| CliError::new(err.to_string()))?;
            to_json(&device)
        }
        IdentityCommand::ClientId(args) => {
            let client = parse_client_id(&args.uri).map_err(|err| CliError::new(err.to_string()))?;
            to_json(&client)
        }
    }
}

/// Reads an identity document from a path or stdin.
fn read_document(input: &str) -> CliResult<Vec<u8>> {
    let result = if input == STDIN_MARKER {
        read_limited(std::io::stdin().lock(), MAX_DOCUMENT_BYTES)
    } else {
        File::open(input)
            .map_err(ReadLimitError::from)
            .and_then(|file| read_limited(file, MAX_DOCUMENT_BYTES))
    };
    result.map_err(|err| CliError::new(err.to_string()))
}

/// Reads at most `max_bytes` from `reader`, failing when more is available.
fn read_limited<R: Read>(reader: R, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    let mut limited = reader.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Executes config subcommands.
fn command_config(
    command: ConfigCommand,
    audit: Arc<dyn ProvisionerAuditSink>,
) -> CliResult<String> {
    match command {
        ConfigCommand::Validate(args) => {
            let collection = load_collection(&args, audit)?;
            let mut output = format!("config valid: {} provisioner(s)", collection.len());
            for provisioner in collection.list() {
                output.push('\n');
                output.push_str(&provisioner.id());
            }
            Ok(output)
        }
    }
}

/// Loads the configuration and builds the provisioner collection.
fn load_collection(
    args: &ConfigArgs,
    audit: Arc<dyn ProvisionerAuditSink>,
) -> CliResult<ProvisionerCollection> {
    let config = AuthorityConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    ProvisionerCollection::load(&config, audit)
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

// ============================================================================
// SECTION: Provisioner Commands
// ============================================================================

/// Executes provisioner subcommands.
fn command_provisioner(
    command: ProvisionerCommand,
    audit: Arc<dyn ProvisionerAuditSink>,
) -> CliResult<String> {
    match command {
        ProvisionerCommand::Policy(args) => {
            let collection = load_collection(&args.config, audit)?;
            let elements = authorize(&collection, &args.id)?;
            let summaries: Vec<_> = elements.iter().map(PolicyElement::summary).collect();
            to_json(&summaries)
        }
        ProvisionerCommand::Show(args) => {
            let collection = load_collection(&args.config, audit)?;
            let provisioner = collection.load_by_id(&args.id).ok_or_else(|| {
                CliError::new(ProvisionerError::NotFound(args.id.clone()).to_string())
            })?;
            to_json(provisioner.as_ref())
        }
        ProvisionerCommand::Evaluate(command) => command_evaluate(&command, audit),
    }
}

/// Applies a provisioner's sign policy to a template built from flags.
fn command_evaluate(
    command: &EvaluateCommand,
    audit: Arc<dyn ProvisionerAuditSink>,
) -> CliResult<String> {
    let collection = load_collection(&command.provisioner.config, audit)?;
    let elements = authorize(&collection, &command.provisioner.id)?;
    let request = sign_request(command.duration)?;
    let mut template = build_template(command);
    apply_policy(&elements, &mut template, &request)
        .map_err(|err| CliError::new(format!("policy violation: {err}")))?;
    to_json(&EvaluationReport {
        provisioner_id: command.provisioner.id.clone(),
        subject: template.subject,
        not_before_unix: template.not_before.map(time::OffsetDateTime::unix_timestamp),
        not_after_unix: template.not_after.map(time::OffsetDateTime::unix_timestamp),
        provisioner_extension: template.provisioner_extension,
    })
}

/// Resolves the sign policy for a provisioner identifier.
fn authorize(collection: &ProvisionerCollection, id: &str) -> CliResult<Vec<PolicyElement>> {
    collection.authorize_sign(id, "").map_err(|err| CliError::new(err.to_string()))
}

/// Builds a sign request evaluated now, with an optional requested lifetime.
fn sign_request(duration: Option<Duration>) -> CliResult<SignRequest> {
    let mut request = SignRequest::now();
    if let Some(duration) = duration {
        let span = time::Duration::try_from(duration)
            .map_err(|_| CliError::new("requested duration is out of range".to_string()))?;
        let not_after = request
            .now
            .checked_add(span)
            .ok_or_else(|| CliError::new("requested duration is out of range".to_string()))?;
        request.not_after = Some(not_after);
    }
    Ok(request)
}

/// Assembles a certificate template from evaluate flags.
fn build_template(command: &EvaluateCommand) -> CertificateTemplate {
    let public_key = if let Some(bits) = command.rsa_bits {
        Some(PublicKeyInfo::Rsa {
            bits,
        })
    } else if let Some(curve) = &command.ec_curve {
        Some(PublicKeyInfo::Ecdsa {
            curve: curve.clone(),
        })
    } else if command.ed25519 {
        Some(PublicKeyInfo::Ed25519)
    } else {
        None
    };
    CertificateTemplate {
        subject: Subject {
            common_name: command.common_name.clone(),
        },
        dns_names: command.dns_names.clone(),
        email_addresses: command.email_addresses.clone(),
        ip_addresses: command.ip_addresses.clone(),
        uris: command.uris.clone(),
        public_key,
        ..CertificateTemplate::default()
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Renders a value as pretty JSON.
fn to_json<T: Serialize + ?Sized>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("failed to render JSON: {err}")))
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
