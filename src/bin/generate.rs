use std::io::Read;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use study_buddy::config::QaConfig;
use study_buddy::{AppConfig, FlashcardGenerator};

#[derive(Parser, Debug)]
#[command(name = "generate")]
#[command(about = "Generate flashcard drafts from a study text file")]
struct Cli {
    /// Text file to read; stdin when omitted.
    #[arg(long)]
    file: Option<String>,
    /// Skip the QA service even when a key is configured.
    #[arg(long, default_value_t = false)]
    offline: bool,
    #[arg(long)]
    max_drafts: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let text = match &cli.file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed reading study text: {}", path))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed reading study text from stdin")?;
            buf
        }
    };

    let config = AppConfig::from_env();
    let qa = if cli.offline {
        QaConfig {
            api_key: None,
            ..config.qa
        }
    } else {
        config.qa
    };
    let mut generation = config.generation;
    if let Some(max_drafts) = cli.max_drafts {
        generation.max_drafts = max_drafts;
    }

    let generator = FlashcardGenerator::from_config(qa, generation)?;
    let drafts = generator.generate_flashcards_from_text(&text).await;

    println!("{}", serde_json::to_string_pretty(&drafts)?);
    eprintln!(
        "Generated {} drafts via {}.",
        drafts.len(),
        if generator.uses_qa_service() {
            "qa service"
        } else {
            "offline generator"
        }
    );

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
