use std::sync::Arc;

use crate::config::MailConfig;
use crate::db::Database;
use crate::error::{is_unique_violation, ServiceError, ServiceResult};
use crate::mail::{welcome_email, Mailer};
use crate::models::User;

#[derive(Clone)]
pub struct UserService {
    db: Database,
    mailer: Arc<dyn Mailer>,
    mail: MailConfig,
}

impl UserService {
    pub fn new(db: Database, mailer: Arc<dyn Mailer>, mail: MailConfig) -> Self {
        Self { db, mailer, mail }
    }

    pub async fn register(&self, username: &str, email: &str) -> ServiceResult<User> {
        let username = username.trim();
        let email = email.trim().to_lowercase();

        if username.is_empty() {
            return Err(ServiceError::Invalid("Username is required".to_string()));
        }
        if !looks_like_email(&email) {
            return Err(ServiceError::Invalid(
                "Please provide a valid email address".to_string(),
            ));
        }

        let user = match self.db.create_user(username, &email).await {
            Ok(user) => user,
            Err(err) if is_unique_violation(&err) => {
                return Err(ServiceError::Conflict(
                    "Username or email already registered".to_string(),
                ))
            }
            Err(err) => return Err(err.into()),
        };

        // A lost welcome mail never blocks registration.
        if let Err(err) = self.mailer.send(&welcome_email(&self.mail, &user)).await {
            tracing::warn!("failed to send welcome email to {}: {:#}", user.email, err);
        }

        Ok(user)
    }

    pub async fn get(&self, user_id: &str) -> ServiceResult<User> {
        self.db
            .get_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("user not found: {user_id}")))
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::testing::RecordingMailer;

    fn mail_config() -> MailConfig {
        MailConfig::default()
    }

    #[test]
    fn email_shape_check() {
        assert!(looks_like_email("ada@example.com"));
        assert!(!looks_like_email("ada@example"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("ada example@x.com"));
    }

    #[tokio::test]
    async fn register_sends_welcome_and_rejects_duplicates() {
        let db = Database::in_memory().await.unwrap();
        let mailer = Arc::new(RecordingMailer::default());
        let service = UserService::new(db, mailer.clone(), mail_config());

        let user = service.register(" ada ", "Ada@Example.com").await.unwrap();
        assert_eq!(user.username, "ada");
        assert_eq!(user.email, "ada@example.com");
        assert!(!user.is_premium);
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);

        let err = service.register("ada", "other@example.com").await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let err = service.get("missing").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
