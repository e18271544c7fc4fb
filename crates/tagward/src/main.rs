use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info, warn};

use tagward::{
    handle_request, initialize, rpc_codes, AttemptOutcome, JsonRpcRequest, JsonRpcResponse,
    RootConfig, RootError, ShieldState,
};
use tagward_vault::{decrypt_file, encrypt_file, EnvelopeCipher, KeySource};

/// Tagward: RFID read shield
///
/// Decides what each reader may learn from a contactless credential,
/// and keeps a record of every read it lets through.
#[derive(Parser, Debug)]
#[command(name = "tagward", version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a configuration file
    Init {
        /// Populate it with the demonstration devices and cards
        #[arg(long)]
        demo: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Replay the scripted read attempts and print the audit log
    Simulate,

    /// Serve JSON-RPC requests over stdio
    Serve,

    /// Encrypt a file, generating the key if needed
    Encrypt {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Key file (defaults to the configured vault key)
        #[arg(long)]
        key_file: Option<PathBuf>,
    },

    /// Decrypt a file produced by `encrypt`
    Decrypt {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Key file (defaults to the configured vault key)
        #[arg(long)]
        key_file: Option<PathBuf>,
    },

    /// Run the scripted attempts and write the encrypted audit log
    AuditExport {
        #[arg(short, long)]
        output: PathBuf,

        /// Key file (defaults to the configured vault key)
        #[arg(long)]
        key_file: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("tagward=debug,tagward_policy=debug,tagward_vault=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tagward=info"))
    };

    // stdout carries JSON-RPC responses in `serve`
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<RootConfig, RootError> {
    match path {
        Some(p) => RootConfig::load(p),
        None => {
            let default_path = RootConfig::default_config_path();
            RootConfig::load(&default_path)
        }
    }
}

/// Fall back to the demo fixture when nothing is registered.
fn load_scenario(path: Option<&PathBuf>) -> Result<RootConfig, RootError> {
    let config = load_config(path)?;
    if config.devices.is_empty() {
        info!("no devices configured, using demo setup");
        return Ok(RootConfig::demo());
    }
    Ok(config)
}

fn resolve_key_file(
    config_path: Option<&PathBuf>,
    key_file: Option<PathBuf>,
) -> Result<PathBuf, RootError> {
    match key_file {
        Some(k) => Ok(k),
        None => Ok(load_config(config_path)?.vault.key_file),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli).await;
    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), RootError> {
    let config_path = cli.config.as_ref();
    match cli.command {
        Commands::Init { demo, force } => cmd_init(config_path, demo, force),
        Commands::Simulate => cmd_simulate(config_path),
        Commands::Serve => cmd_serve(config_path).await,
        Commands::Encrypt {
            input,
            output,
            key_file,
        } => cmd_encrypt(resolve_key_file(config_path, key_file)?, &input, &output),
        Commands::Decrypt {
            input,
            output,
            key_file,
        } => cmd_decrypt(resolve_key_file(config_path, key_file)?, &input, &output),
        Commands::AuditExport { output, key_file } => {
            let key_file = resolve_key_file(config_path, key_file)?;
            cmd_audit_export(config_path, key_file, &output)
        }
    }
}

fn cmd_init(config_path: Option<&PathBuf>, demo: bool, force: bool) -> Result<(), RootError> {
    let save_path = config_path
        .cloned()
        .unwrap_or_else(RootConfig::default_config_path);

    if save_path.exists() && !force {
        return Err(RootError::Config(format!(
            "{} already exists (use --force to overwrite)",
            save_path.display()
        )));
    }

    let config = if demo {
        RootConfig::demo()
    } else {
        RootConfig::default()
    };
    config.validate()?;
    config.save(&save_path)?;

    println!("Tagward initialized.");
    println!("  Config:   {}", save_path.display());
    println!("  Key file: {}", config.vault.key_file.display());
    println!("  Devices:  {}", config.devices.len());

    Ok(())
}

fn print_outcome(state: &ShieldState, device_id: &str, distance_m: f64, outcome: &AttemptOutcome) {
    let device_name = state
        .config
        .devices
        .iter()
        .find(|d| d.id == device_id)
        .map(|d| d.name.as_str())
        .unwrap_or(device_id);

    match outcome {
        AttemptOutcome::NoSignal => {
            println!("{} at {:.1}m: no signal", device_name, distance_m);
        }
        AttemptOutcome::Delivered { action, payload } => {
            println!(
                "{} at {:.1}m: {} -> owner={} account={} expiry={}",
                device_name,
                distance_m,
                action,
                payload.owner_name,
                payload.account_number,
                payload.expiry
            );
        }
        AttemptOutcome::Blocked { action } => {
            println!("{} at {:.1}m: {} -> nothing delivered", device_name, distance_m, action);
        }
    }
}

fn cmd_simulate(config_path: Option<&PathBuf>) -> Result<(), RootError> {
    let state = initialize(load_scenario(config_path)?)?;

    for (attempt, outcome) in state.run_scripted_attempts()? {
        print_outcome(&state, &attempt.device_id, attempt.distance_m, &outcome);
    }

    println!();
    println!("--- AUDIT LOG ---");
    println!("{}", state.audit_log.render());
    Ok(())
}

async fn cmd_serve(config_path: Option<&PathBuf>) -> Result<(), RootError> {
    let state = initialize(load_config(config_path)?)?;
    info!("serving JSON-RPC on stdio");

    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(stdin).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => handle_request(&state, &request),
            Err(e) => {
                warn!(error = %e, "unparseable request");
                JsonRpcResponse::error(
                    serde_json::Value::Null,
                    rpc_codes::PARSE_ERROR,
                    format!("parse error: {}", e),
                )
            }
        };

        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
    }

    info!(events = state.audit_log.len(), "stdin closed, shutting down");
    Ok(())
}

fn cmd_encrypt(key_file: PathBuf, input: &Path, output: &Path) -> Result<(), RootError> {
    let (cipher, source) = EnvelopeCipher::from_key_file_or_generate(&key_file)?;
    if source == KeySource::Generated {
        println!("Generated new key at {}", key_file.display());
    }
    let bytes = encrypt_file(&cipher, input, output)?;
    println!("Encrypted {} bytes -> {}", bytes, output.display());
    Ok(())
}

fn cmd_decrypt(key_file: PathBuf, input: &Path, output: &Path) -> Result<(), RootError> {
    let cipher = EnvelopeCipher::from_key_file(&key_file)?;
    let bytes = decrypt_file(&cipher, input, output)?;
    println!("Decrypted {} bytes -> {}", bytes, output.display());
    Ok(())
}

fn cmd_audit_export(
    config_path: Option<&PathBuf>,
    key_file: PathBuf,
    output: &Path,
) -> Result<(), RootError> {
    let state = initialize(load_scenario(config_path)?)?;
    state.run_scripted_attempts()?;

    let (cipher, _) = EnvelopeCipher::from_key_file_or_generate(&key_file)?;
    let token = state.export_audit(&cipher)?;
    std::fs::write(output, &token)?;

    println!(
        "Exported {} audit events -> {}",
        state.audit_log.len(),
        output.display()
    );
    Ok(())
}
