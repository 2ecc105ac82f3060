//! CLI entry point for sparkpost-relay.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use sparkpost_relay::{MailMessage, Mailer, ProviderSettings, Region, SendingMethod};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Method {
    Http,
    Smtp,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RegionArg {
    Us,
    Eu,
}

#[derive(Parser, Debug)]
#[command(name = "sparkpost-relay")]
#[command(about = "Send a JSON-encoded email through the SparkPost API")]
struct Cli {
    /// Path to the message JSON file
    message: PathBuf,

    /// SparkPost API key
    #[arg(long, env = "SPARKPOST_API_KEY", default_value = "", hide_env_values = true)]
    api_key: String,

    /// Stored template id to send instead of inline content
    #[arg(long, env = "SPARKPOST_TEMPLATE")]
    template: Option<String>,

    /// Enable open and click tracking
    #[arg(long, env = "SPARKPOST_ENABLE_TRACKING")]
    enable_tracking: bool,

    /// Mark the message as transactional
    #[arg(long, env = "SPARKPOST_TRANSACTIONAL")]
    transactional: bool,

    /// Sending method
    #[arg(long, value_enum, default_value = "http")]
    method: Method,

    /// Provider region
    #[arg(long, value_enum, default_value = "us", env = "SPARKPOST_REGION")]
    region: RegionArg,

    /// Override the transmissions endpoint URL
    #[arg(long, env = "SPARKPOST_ENDPOINT")]
    endpoint: Option<String>,

    /// Print the request instead of sending it
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn settings(&self) -> ProviderSettings {
        ProviderSettings {
            api_key: self.api_key.clone(),
            enable_tracking: self.enable_tracking,
            transactional: self.transactional,
            template: self.template.clone(),
            sending_method: match self.method {
                Method::Http => SendingMethod::Http,
                Method::Smtp => SendingMethod::Smtp,
            },
            region: match self.region {
                RegionArg::Us => Region::Us,
                RegionArg::Eu => Region::Eu,
            },
            endpoint: self.endpoint.clone(),
        }
    }
}

fn load_message(path: &Path) -> Result<MailMessage, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read {}: {e}", path.display()))?;
    serde_json::from_str(&raw).map_err(|e| format!("invalid message {}: {e}", path.display()))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let message = match load_message(&cli.message) {
        Ok(message) => message,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mailer = match Mailer::new(cli.settings()) {
        Ok(mailer) => mailer,
        Err(e) => {
            error!("Failed to create mailer: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.dry_run {
        return match mailer.request_preview(&message) {
            Ok((headers, body)) => {
                for (name, value) in headers.pairs() {
                    println!("{name}: {value}");
                }
                println!();
                println!("{body:#}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Failed to build request: {e}");
                ExitCode::FAILURE
            }
        };
    }

    if mailer.deliver(&message) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
