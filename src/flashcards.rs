use crate::db::Database;
use crate::error::{ServiceError, ServiceResult};
use crate::generation::FlashcardGenerator;
use crate::models::Flashcard;

pub const MIN_STUDY_TEXT_CHARS: usize = 50;

#[derive(Clone)]
pub struct FlashcardService {
    db: Database,
    generator: FlashcardGenerator,
}

impl FlashcardService {
    pub fn new(db: Database, generator: FlashcardGenerator) -> Self {
        Self { db, generator }
    }

    /// Generates cards from study text and stores them for `user_id`.
    pub async fn generate_for_user(&self, user_id: &str, text: &str) -> ServiceResult<Vec<Flashcard>> {
        let text = text.trim();
        if text.chars().count() < MIN_STUDY_TEXT_CHARS {
            return Err(ServiceError::Invalid(format!(
                "Please provide at least {MIN_STUDY_TEXT_CHARS} characters of study material"
            )));
        }

        self.ensure_user(user_id).await?;

        let drafts = self.generator.generate_flashcards_from_text(text).await;
        if drafts.is_empty() {
            return Err(ServiceError::Failed(
                "Failed to generate flashcards. Please try again.".to_string(),
            ));
        }

        let cards = self.db.insert_flashcards(user_id, &drafts).await?;
        tracing::info!("stored {} flashcards for user {}", cards.len(), user_id);
        Ok(cards)
    }

    pub async fn list(&self, user_id: &str) -> ServiceResult<Vec<Flashcard>> {
        self.ensure_user(user_id).await?;
        Ok(self.db.list_flashcards(user_id).await?)
    }

    pub async fn get(&self, user_id: &str, flashcard_id: &str) -> ServiceResult<Flashcard> {
        self.db
            .get_flashcard(user_id, flashcard_id)
            .await?
            .ok_or_else(|| not_found(flashcard_id))
    }

    pub async fn record_study(
        &self,
        user_id: &str,
        flashcard_id: &str,
        correct: bool,
    ) -> ServiceResult<Flashcard> {
        self.db
            .record_study(user_id, flashcard_id, correct)
            .await?
            .ok_or_else(|| not_found(flashcard_id))
    }

    pub async fn delete(&self, user_id: &str, flashcard_id: &str) -> ServiceResult<()> {
        if self.db.delete_flashcard(user_id, flashcard_id).await? {
            Ok(())
        } else {
            Err(not_found(flashcard_id))
        }
    }

    async fn ensure_user(&self, user_id: &str) -> ServiceResult<()> {
        match self.db.get_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::NotFound(format!("user not found: {user_id}"))),
        }
    }
}

fn not_found(flashcard_id: &str) -> ServiceError {
    ServiceError::NotFound(format!("flashcard not found: {flashcard_id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GenerationConfig, QaConfig};
    use crate::models::Difficulty;

    const NOTES: &str = "The mitochondria is the powerhouse of the cell. \
                         It produces ATP through cellular respiration.";

    async fn service() -> (FlashcardService, String) {
        let db = Database::in_memory().await.unwrap();
        let user = db.create_user("ada", "ada@example.com").await.unwrap();
        let generator =
            FlashcardGenerator::new(QaConfig::default(), GenerationConfig::default(), None);
        (FlashcardService::new(db, generator), user.id)
    }

    #[tokio::test]
    async fn short_text_is_rejected() {
        let (service, user_id) = service().await;
        let err = service
            .generate_for_user(&user_id, "   too short   ")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));
    }

    #[tokio::test]
    async fn generated_cards_are_persisted_for_the_user() {
        let (service, user_id) = service().await;
        let cards = service.generate_for_user(&user_id, NOTES).await.unwrap();

        assert_eq!(cards.len(), 2);
        assert!(cards.iter().all(|c| c.difficulty == Difficulty::Medium));
        assert_eq!(service.list(&user_id).await.unwrap().len(), 2);

        let studied = service.record_study(&user_id, &cards[0].id, true).await.unwrap();
        assert_eq!(studied.times_studied, 1);
        assert_eq!(studied.correct_answers, 1);

        service.delete(&user_id, &cards[0].id).await.unwrap();
        let err = service.get(&user_id, &cards[0].id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn unknown_user_cannot_generate() {
        let (service, _) = service().await;
        let err = service.generate_for_user("nobody", NOTES).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn text_without_usable_sentences_fails() {
        let (service, user_id) = service().await;
        let err = service
            .generate_for_user(&user_id, &"abc. ".repeat(12))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Failed(_)));
    }
}
