pub mod config;
pub mod db;
pub mod error;
pub mod flashcards;
pub mod generation;
pub mod mail;
pub mod models;
pub mod payments;
pub mod qa_client;
pub mod server;
pub mod suggestions;
pub mod users;

pub use config::AppConfig;
pub use generation::FlashcardGenerator;
pub use server::run_server;
