//! Command-line front end: runs one streamed analysis and prints the result.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use soullinker_analysis::observability::init_observability;
use soullinker_analysis::prelude::*;

#[derive(Parser)]
#[command(name = "soullinker", version, about = "Streamed contact analysis client")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Analyze a contact's chat history and print the profile as JSON
    Analyze {
        /// Contact id on the server
        contact_id: u64,
        /// Restrict the analysis to these message ids (comma separated)
        #[arg(long, value_delimiter = ',')]
        messages: Vec<i64>,
        /// API key forwarded to the analysis service
        #[arg(long)]
        api_key: Option<String>,
        /// Server base URL; overrides SOULLINKER_BASE_URL
        #[arg(long)]
        base_url: Option<String>,
        /// Suppress progress output on stderr
        #[arg(long)]
        quiet: bool,
    },
}

/// Load .env from the crate dir, then the current dir.
fn load_env() {
    if let Ok(canon) = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join(".env")
        .canonicalize()
    {
        let _ = dotenvy::from_path(canon);
    }
    let _ = dotenvy::dotenv();
}

struct StderrProgress {
    quiet: bool,
    last_percent: Option<u8>,
}

impl SessionObserver for StderrProgress {
    fn on_progress(&mut self, p: &ProgressSnapshot) {
        let percent = p.rounded_percent();
        if self.quiet || self.last_percent == Some(percent) {
            return;
        }
        self.last_percent = Some(percent);
        let steps: String = p
            .stage
            .checkmarks()
            .iter()
            .map(|done| if *done { '✓' } else { '○' })
            .collect();
        eprintln!(
            "{steps} {percent:>3}% {} [{} tokens]",
            p.status_message, p.generated_tokens
        );
    }

    fn on_error(&mut self, failure: &SessionFailure) {
        eprintln!("error: {}", failure.user_message());
    }
}

async fn analyze(
    contact_id: u64,
    messages: Vec<i64>,
    api_key: Option<String>,
    base_url: Option<String>,
    quiet: bool,
) -> Result<NormalizedAnalysis, ClientError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = base_url {
        config = config.base_url(base_url);
    }
    let client = AnalysisClient::new(config)?;

    let mut request = if messages.is_empty() {
        AnalysisRequest::whole_target(contact_id)
    } else {
        AnalysisRequest::items(contact_id, messages)
    };
    if let Some(key) = api_key {
        request = request.api_key(key);
    }

    let job = client.start(request)?;
    let cancel = job.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling analysis");
            cancel.cancel();
        }
    });

    let mut observer = StderrProgress {
        quiet,
        last_percent: None,
    };
    job.drive(&mut observer).await
}

#[tokio::main]
async fn main() -> ExitCode {
    load_env();
    init_observability("warn");
    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Analyze {
            contact_id,
            messages,
            api_key,
            base_url,
            quiet,
        } => match analyze(contact_id, messages, api_key, base_url, quiet).await {
            Ok(analysis) => match serde_json::to_string_pretty(&analysis) {
                Ok(json) => {
                    println!("{json}");
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    eprintln!("error: could not render result: {err}");
                    ExitCode::FAILURE
                }
            },
            // Session failures were already reported by the observer.
            Err(ClientError::Failed(_)) => ExitCode::FAILURE,
            Err(err) => {
                eprintln!("error: {err}");
                ExitCode::FAILURE
            }
        },
    }
}
