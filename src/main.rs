use anyhow::Result;
use tracing_subscriber::EnvFilter;

use study_buddy::db::Database;
use study_buddy::flashcards::FlashcardService;
use study_buddy::mail::mailer_from_config;
use study_buddy::payments::PaymentService;
use study_buddy::server::AppState;
use study_buddy::suggestions::SuggestionService;
use study_buddy::users::UserService;
use study_buddy::{run_server, AppConfig, FlashcardGenerator};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::from_env();
    tokio::fs::create_dir_all(&config.data_dir).await?;

    let db = Database::new(&config).await?;
    let generator = FlashcardGenerator::from_config(config.qa.clone(), config.generation.clone())?;
    let mailer = mailer_from_config(&config.mail)?;

    let state = AppState {
        users: UserService::new(db.clone(), mailer.clone(), config.mail.clone()),
        flashcards: FlashcardService::new(db.clone(), generator),
        suggestions: SuggestionService::new(db.clone(), mailer, config.mail.clone()),
        payments: PaymentService::new(db),
    };

    run_server(config, state).await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
