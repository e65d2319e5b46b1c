use std::sync::Arc;

use crate::config::MailConfig;
use crate::db::Database;
use crate::error::{ServiceError, ServiceResult};
use crate::mail::{send_bulk_confirmations, Mailer};
use crate::models::Suggestion;

pub const MIN_SUGGESTION_CHARS: usize = 10;

#[derive(Clone)]
pub struct SuggestionService {
    db: Database,
    mailer: Arc<dyn Mailer>,
    mail: MailConfig,
}

impl SuggestionService {
    pub fn new(db: Database, mailer: Arc<dyn Mailer>, mail: MailConfig) -> Self {
        Self { db, mailer, mail }
    }

    pub async fn submit(&self, user_id: &str, content: &str) -> ServiceResult<Suggestion> {
        let content = content.trim();
        if content.chars().count() < MIN_SUGGESTION_CHARS {
            return Err(ServiceError::Invalid(format!(
                "Please provide a meaningful suggestion (at least {MIN_SUGGESTION_CHARS} characters)"
            )));
        }

        self.ensure_user(user_id).await?;
        Ok(self.db.insert_suggestion(user_id, content).await?)
    }

    pub async fn list(&self, user_id: &str) -> ServiceResult<Vec<Suggestion>> {
        self.ensure_user(user_id).await?;
        Ok(self.db.list_suggestions(user_id).await?)
    }

    async fn ensure_user(&self, user_id: &str) -> ServiceResult<()> {
        match self.db.get_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(ServiceError::NotFound(format!("user not found: {user_id}"))),
        }
    }

    /// Mails every user with unconfirmed suggestions. Suggestions are only
    /// marked as confirmed when at least one mail went out.
    pub async fn send_confirmations(&self) -> ServiceResult<String> {
        let users = self.db.users_with_pending_suggestions().await?;
        if users.is_empty() {
            return Ok("No pending confirmations to send".to_string());
        }

        let delivered = send_bulk_confirmations(self.mailer.as_ref(), &self.mail, &users).await;
        if delivered == 0 {
            return Err(ServiceError::Failed(
                "Failed to send confirmation emails".to_string(),
            ));
        }

        let marked = self.db.mark_pending_suggestions_sent().await?;
        tracing::info!(
            "confirmed {} suggestions; {} of {} emails delivered",
            marked,
            delivered,
            users.len()
        );

        Ok(format!(
            "Confirmation emails sent to {delivered} users successfully!"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::testing::RecordingMailer;

    fn mail_config() -> MailConfig {
        MailConfig::default()
    }

    async fn setup(reject: Vec<String>) -> (SuggestionService, Database, Arc<RecordingMailer>) {
        let db = Database::in_memory().await.unwrap();
        let mailer = Arc::new(RecordingMailer {
            reject,
            ..RecordingMailer::default()
        });
        let service = SuggestionService::new(db.clone(), mailer.clone(), mail_config());
        (service, db, mailer)
    }

    #[tokio::test]
    async fn short_suggestions_are_rejected() {
        let (service, db, _) = setup(vec![]).await;
        let user = db.create_user("ada", "ada@example.com").await.unwrap();

        let err = service.submit(&user.id, "  meh  ").await.unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));
    }

    #[tokio::test]
    async fn listing_for_unknown_user_is_not_found() {
        let (service, db, _) = setup(vec![]).await;
        let err = service.list("missing").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let user = db.create_user("ada", "ada@example.com").await.unwrap();
        assert!(service.list(&user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn nothing_pending_is_not_an_error() {
        let (service, _, mailer) = setup(vec![]).await;
        let message = service.send_confirmations().await.unwrap();
        assert_eq!(message, "No pending confirmations to send");
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn confirmations_mark_suggestions_sent() {
        let (service, db, mailer) = setup(vec!["bob@example.com".to_string()]).await;
        let ada = db.create_user("ada", "ada@example.com").await.unwrap();
        let bob = db.create_user("bob", "bob@example.com").await.unwrap();
        service.submit(&ada.id, "Please add spaced repetition").await.unwrap();
        service.submit(&bob.id, "Support image flashcards too").await.unwrap();

        let message = service.send_confirmations().await.unwrap();
        assert_eq!(message, "Confirmation emails sent to 1 users successfully!");
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
        assert!(service.list(&bob.id).await.unwrap()[0].email_sent);
    }

    #[tokio::test]
    async fn all_failed_deliveries_leave_suggestions_pending() {
        let (service, db, _) = setup(vec!["ada@example.com".to_string()]).await;
        let ada = db.create_user("ada", "ada@example.com").await.unwrap();
        service.submit(&ada.id, "Please add spaced repetition").await.unwrap();

        let err = service.send_confirmations().await.unwrap_err();
        assert!(matches!(err, ServiceError::Failed(_)));
        assert!(!service.list(&ada.id).await.unwrap()[0].email_sent);
    }
}
