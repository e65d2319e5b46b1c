pub mod chunker;
pub mod difficulty;
pub mod mock;
pub mod qa;
pub mod questions;

use std::sync::Arc;

use anyhow::Result;

use crate::config::{GenerationConfig, QaConfig};
use crate::models::FlashcardDraft;
use crate::qa_client::{HuggingFaceClient, QuestionAnswerer};

pub use chunker::chunk_words;
pub use difficulty::score_difficulty;
pub use mock::generate_mock_flashcards;
pub use qa::{QaGenerator, QaOutcome};
pub use questions::propose_questions;

/// Entry point for flashcard generation.
///
/// Routes to the QA service when a credential is configured and falls back
/// to the offline generator whenever the service path yields nothing.
#[derive(Clone)]
pub struct FlashcardGenerator {
    qa: Option<QaGenerator>,
    max_drafts: usize,
}

impl FlashcardGenerator {
    pub fn new(
        qa: QaConfig,
        generation: GenerationConfig,
        client: Option<Arc<dyn QuestionAnswerer>>,
    ) -> Self {
        let max_drafts = generation.max_drafts;
        let qa = match client {
            Some(client) if qa.has_credential() => {
                Some(QaGenerator::new(client, qa, generation))
            }
            _ => None,
        };

        Self { qa, max_drafts }
    }

    /// Builds the Hugging Face client from `qa` when a key is present.
    pub fn from_config(qa: QaConfig, generation: GenerationConfig) -> Result<Self> {
        let client = match qa.api_key.as_deref() {
            Some(key) if qa.has_credential() => {
                let client: Arc<dyn QuestionAnswerer> = Arc::new(HuggingFaceClient::new(
                    qa.api_url.clone(),
                    key.trim(),
                    qa.request_timeout,
                )?);
                Some(client)
            }
            _ => None,
        };

        if client.is_none() {
            tracing::info!("no qa credential configured; using offline flashcard generation");
        }

        Ok(Self::new(qa, generation, client))
    }

    pub fn uses_qa_service(&self) -> bool {
        self.qa.is_some()
    }

    pub async fn generate_flashcards_from_text(&self, text: &str) -> Vec<FlashcardDraft> {
        let mut drafts = match &self.qa {
            Some(qa) => match qa.generate(text).await {
                QaOutcome::Generated(drafts) => drafts,
                QaOutcome::ServiceUnavailable => {
                    tracing::warn!("qa service unavailable; falling back to offline generation");
                    generate_mock_flashcards(text)
                }
                QaOutcome::NoUsableAnswers => {
                    tracing::info!("qa service gave no usable answers; using offline generation");
                    generate_mock_flashcards(text)
                }
            },
            None => generate_mock_flashcards(text),
        };

        drafts.truncate(self.max_drafts);
        drafts
    }
}
