//! Developer CLI for the credential shim.
//!
//! Stores, reads and deletes credentials through the shim exactly as an app's
//! UI layer would. Without the platform keychain the backing store lives in
//! process memory, so `exercise` is the way to see a full round trip.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use credshim_core::{
    Convention, CredentialError, CredentialShim, ShimConfig, BUFFER_CAPACITY_ENV, CONVENTION_ENV,
};
use eyre::{bail, eyre, Result, WrapErr};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "credshim", version, about = "Credential storage shim CLI")]
struct Cli {
    #[command(flatten)]
    shim: ShimArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ShimArgs {
    /// JSON file holding a shim config; flags and environment override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backing-store convention: object-handle, borrowed-handle or fixed-buffer.
    #[arg(long, global = true, env = CONVENTION_ENV)]
    convention: Option<Convention>,

    /// Retrieval buffer size in bytes for the fixed-buffer convention.
    #[arg(long, global = true, env = BUFFER_CAPACITY_ENV)]
    capacity: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Store a secret, replacing any existing one.
    Set {
        service: String,
        user: String,
        secret: String,
    },
    /// Print a stored secret.
    Get {
        service: String,
        user: String,
        /// Print the raw bytes as hex instead of decoding them as text.
        #[arg(long)]
        hex: bool,
    },
    /// Delete a stored secret.
    Delete { service: String, user: String },
    /// Run set, get, delete, get on every convention and check each result.
    Exercise {
        /// Service name to use; defaults to one derived from the process id.
        #[arg(long)]
        service: Option<String>,
        #[arg(long, default_value = "credshim-cli")]
        user: String,
        #[arg(long, default_value = "hello")]
        secret: String,
    },
}

impl ShimArgs {
    fn config(&self) -> Result<ShimConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .wrap_err_with(|| format!("failed to read {}", path.display()))?;
                serde_json::from_str(&raw)
                    .wrap_err_with(|| format!("invalid shim config in {}", path.display()))?
            }
            None => ShimConfig::default(),
        };
        if let Some(convention) = self.convention {
            config.convention = convention;
        }
        if let Some(capacity) = self.capacity {
            config.buffer_capacity = capacity;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init()
    {
        eprintln!("warning: logging disabled: {err}");
    }

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.shim.config()?;
    tracing::debug!(
        convention = %config.convention,
        capacity = config.buffer_capacity,
        "using shim config"
    );

    match cli.command {
        Command::Set {
            service,
            user,
            secret,
        } => {
            let shim = CredentialShim::from_config(&config)?;
            shim.set(&service, &user, &secret)
                .wrap_err("failed to store credential")?;
            println!("stored");
        }
        Command::Get { service, user, hex } => {
            let shim = CredentialShim::from_config(&config)?;
            if hex {
                let bytes = shim
                    .get_bytes(&service, &user)
                    .wrap_err("failed to read credential")?;
                println!("{}", hex::encode(bytes));
            } else {
                match shim.get(&service, &user) {
                    Ok(secret) => println!("{secret}"),
                    Err(CredentialError::NotString(bytes)) => {
                        bail!("credential is not text (hex: {})", hex::encode(bytes))
                    }
                    Err(err) => return Err(eyre!(err).wrap_err("failed to read credential")),
                }
            }
        }
        Command::Delete { service, user } => {
            let shim = CredentialShim::from_config(&config)?;
            shim.delete(&service, &user)
                .wrap_err("failed to delete credential")?;
            println!("deleted");
        }
        Command::Exercise {
            service,
            user,
            secret,
        } => {
            let service =
                service.unwrap_or_else(|| format!("credshim.exercise.{}", std::process::id()));
            for convention in Convention::ALL {
                let config = ShimConfig {
                    convention,
                    ..config
                };
                let shim = CredentialShim::from_config(&config)?;
                exercise(&shim, &service, &user, &secret)
                    .wrap_err_with(|| format!("{convention} failed"))?;
                println!("{convention}: ok");
            }
        }
    }
    Ok(())
}

fn exercise(shim: &CredentialShim, service: &str, user: &str, secret: &str) -> Result<()> {
    shim.set(service, user, secret).wrap_err("set")?;
    let read = shim.get(service, user).wrap_err("get")?;
    if read != secret {
        bail!("get returned a different secret");
    }
    shim.delete(service, user).wrap_err("delete")?;
    match shim.get(service, user) {
        Err(CredentialError::NotFound) => Ok(()),
        Ok(_) => bail!("credential still present after delete"),
        Err(err) => Err(eyre!(err).wrap_err("get after delete")),
    }
}
