mod display;
mod server;

use std::io::Read;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use phishguard_ai::{ArtifactSet, Pipeline};
use phishguard_core::{DEFAULT_PHISHING_LABEL, EmailText, PipelineError};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "phishguard", version, about = "Phishing email detection")]
struct Cli {
    /// Directory holding the fitted vectorizers, model, and label encoder.
    #[arg(long, global = true, env = "PHISHGUARD_ARTIFACTS", default_value = "artifacts")]
    artifacts: PathBuf,

    /// Class name that counts as a phishing verdict.
    #[arg(long, global = true, env = "PHISHGUARD_PHISHING_LABEL", default_value = DEFAULT_PHISHING_LABEL)]
    phishing_label: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify one email (from --text, --file, or stdin).
    Check {
        /// Email content.
        #[arg(long, conflicts_with = "file")]
        text: Option<String>,

        /// Read the email content from a file.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Print the prediction as JSON instead of a result card.
        #[arg(long)]
        json: bool,
    },
    /// Show what the artifact directory contains.
    Inspect,
    /// Serve the detection form and JSON API over HTTP.
    Serve {
        #[arg(long, env = "PHISHGUARD_LISTEN", default_value = "127.0.0.1:8501")]
        listen: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Check { text, file, json } => {
            let email = match read_email(text, file)? {
                Ok(email) => email,
                Err(PipelineError::EmptyInput) => {
                    tracing::warn!("empty submission");
                    eprintln!("{}", PipelineError::EmptyInput.user_message());
                    return Ok(ExitCode::from(2));
                }
                Err(e) => return Err(e).context("read email"),
            };

            let pipeline = load_pipeline(&cli.artifacts)?;
            let prediction = pipeline.predict(&email).context("classify email")?;

            if json {
                let out = serde_json::json!({
                    "label": prediction.label,
                    "verdict": prediction.verdict(&cli.phishing_label),
                    "distribution": prediction.distribution,
                });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                display::print_result_card(&prediction, &cli.phishing_label);
            }
        }
        Command::Inspect => {
            let pipeline = load_pipeline(&cli.artifacts)?;
            display::print_summary(&pipeline.summary());
        }
        Command::Serve { listen } => {
            let pipeline = load_pipeline(&cli.artifacts)?;
            let state = Arc::new(server::AppState {
                pipeline: Arc::new(pipeline),
                phishing_label: cli.phishing_label,
            });
            server::serve(state, listen).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn load_pipeline(dir: &std::path::Path) -> anyhow::Result<Pipeline> {
    let artifacts = ArtifactSet::load(dir)
        .with_context(|| format!("load artifacts from {}", dir.display()))?;
    Ok(Pipeline::new(artifacts))
}

/// Gather the email text; I/O failures are fatal, content problems are not.
fn read_email(
    text: Option<String>,
    file: Option<PathBuf>,
) -> anyhow::Result<Result<EmailText, PipelineError>> {
    if let Some(text) = text {
        return Ok(EmailText::parse(text));
    }
    let bytes = match file {
        Some(path) => {
            std::fs::read(&path).with_context(|| format!("read {}", path.display()))?
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("read stdin")?;
            buf
        }
    };
    Ok(EmailText::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn check_defaults() {
        let cli = Cli::try_parse_from(["phishguard", "check", "--text", "hi"]).unwrap();
        assert_eq!(cli.phishing_label, DEFAULT_PHISHING_LABEL);
        match cli.command {
            Command::Check { text, file, json } => {
                assert_eq!(text.as_deref(), Some("hi"));
                assert!(file.is_none());
                assert!(!json);
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn text_and_file_conflict() {
        let parsed = Cli::try_parse_from(["phishguard", "check", "--text", "a", "--file", "b"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn serve_listen_address() {
        let cli =
            Cli::try_parse_from(["phishguard", "serve", "--listen", "0.0.0.0:9000"]).unwrap();
        match cli.command {
            Command::Serve { listen } => assert_eq!(listen.port(), 9000),
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn blank_text_is_empty_input() {
        let email = read_email(Some("  \n ".into()), None).unwrap();
        assert_eq!(email, Err(PipelineError::EmptyInput));
    }

    #[test]
    fn file_input_is_read() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"verify your account").unwrap();
        let email = read_email(None, Some(f.path().to_path_buf())).unwrap().unwrap();
        assert_eq!(email.as_str(), "verify your account");
    }

    #[test]
    fn non_utf8_file_is_invalid_input() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&[b'o', b'k', 0xff]).unwrap();
        let email = read_email(None, Some(f.path().to_path_buf())).unwrap();
        assert!(matches!(email, Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(read_email(None, Some(PathBuf::from("/nonexistent/email.txt"))).is_err());
    }

    #[test]
    fn missing_artifacts_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_pipeline(dir.path()).err().unwrap();
        assert!(format!("{err:#}").contains("load artifacts"));
    }
}
