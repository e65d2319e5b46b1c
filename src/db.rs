use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::{
    Difficulty, Flashcard, FlashcardDraft, Payment, PaymentStatus, Suggestion, User,
};

const USER_COLUMNS: &str = "id, username, email, is_premium, created_at";
const FLASHCARD_COLUMNS: &str =
    "id, user_id, title, question, answer, difficulty, times_studied, correct_answers, created_at";
const SUGGESTION_COLUMNS: &str = "id, user_id, content, email_sent, created_at";
const PAYMENT_COLUMNS: &str =
    "id, user_id, invoice_id, amount_minor, currency, status, payment_method, created_at, paid_at";

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(config: &AppConfig) -> Result<Self> {
        tokio::fs::create_dir_all(&config.data_dir).await?;

        let options = SqliteConnectOptions::from_str(&config.sqlite_dsn())?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Single-connection in-memory store; the database lives as long as the
    /// connection, so the pool must never recycle it.
    #[cfg(test)]
    pub(crate) async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                is_premium INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS flashcards (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                question TEXT NOT NULL,
                answer TEXT NOT NULL,
                difficulty TEXT NOT NULL DEFAULT 'medium',
                times_studied INTEGER NOT NULL DEFAULT 0,
                correct_answers INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS suggestions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                content TEXT NOT NULL,
                email_sent INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS payments (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                invoice_id TEXT NOT NULL UNIQUE,
                amount_minor INTEGER NOT NULL,
                currency TEXT NOT NULL DEFAULT 'KES',
                status TEXT NOT NULL DEFAULT 'pending',
                payment_method TEXT,
                created_at TEXT NOT NULL,
                paid_at TEXT,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_flashcards_user ON flashcards(user_id);
            CREATE INDEX IF NOT EXISTS idx_suggestions_pending ON suggestions(email_sent);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn create_user(&self, username: &str, email: &str) -> Result<User> {
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            email: email.to_string(),
            is_premium: false,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO users (id, username, email, is_premium, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.is_premium)
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(row_to_user))
    }

    /// Persists a batch of drafts for one user in a single transaction.
    pub async fn insert_flashcards(
        &self,
        user_id: &str,
        drafts: &[FlashcardDraft],
    ) -> Result<Vec<Flashcard>> {
        let now = Utc::now();
        let cards: Vec<Flashcard> = drafts
            .iter()
            .map(|draft| Flashcard {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                title: draft.title.clone(),
                question: draft.question.clone(),
                answer: draft.answer.clone(),
                difficulty: draft.difficulty,
                times_studied: 0,
                correct_answers: 0,
                created_at: now,
            })
            .collect();

        let mut tx = self.pool.begin().await?;
        for card in &cards {
            insert_flashcard_tx(&mut tx, card).await?;
        }
        tx.commit().await?;

        Ok(cards)
    }

    pub async fn list_flashcards(&self, user_id: &str) -> Result<Vec<Flashcard>> {
        let rows = sqlx::query(&format!(
            "SELECT {FLASHCARD_COLUMNS} FROM flashcards WHERE user_id = ? \
             ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_flashcard).collect())
    }

    pub async fn get_flashcard(&self, user_id: &str, flashcard_id: &str) -> Result<Option<Flashcard>> {
        let row = sqlx::query(&format!(
            "SELECT {FLASHCARD_COLUMNS} FROM flashcards WHERE id = ? AND user_id = ?"
        ))
        .bind(flashcard_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_flashcard))
    }

    /// Returns the updated card, or `None` when the user owns no such card.
    pub async fn record_study(
        &self,
        user_id: &str,
        flashcard_id: &str,
        correct: bool,
    ) -> Result<Option<Flashcard>> {
        let result = sqlx::query(
            r#"
            UPDATE flashcards
            SET times_studied = times_studied + 1,
                correct_answers = correct_answers + ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(i64::from(correct))
        .bind(flashcard_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_flashcard(user_id, flashcard_id).await
    }

    pub async fn delete_flashcard(&self, user_id: &str, flashcard_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM flashcards WHERE id = ? AND user_id = ?")
            .bind(flashcard_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn insert_suggestion(&self, user_id: &str, content: &str) -> Result<Suggestion> {
        let suggestion = Suggestion {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            content: content.to_string(),
            email_sent: false,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO suggestions (id, user_id, content, email_sent, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&suggestion.id)
        .bind(&suggestion.user_id)
        .bind(&suggestion.content)
        .bind(suggestion.email_sent)
        .bind(suggestion.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(suggestion)
    }

    pub async fn list_suggestions(&self, user_id: &str) -> Result<Vec<Suggestion>> {
        let rows = sqlx::query(&format!(
            "SELECT {SUGGESTION_COLUMNS} FROM suggestions WHERE user_id = ? \
             ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_suggestion).collect())
    }

    /// Distinct owners of suggestions that have not been confirmed by mail.
    pub async fn users_with_pending_suggestions(&self) -> Result<Vec<User>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT u.id, u.username, u.email, u.is_premium, u.created_at
            FROM users u
            JOIN suggestions s ON s.user_id = u.id
            WHERE s.email_sent = 0
            ORDER BY u.created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_user).collect())
    }

    pub async fn mark_pending_suggestions_sent(&self) -> Result<u64> {
        let result = sqlx::query("UPDATE suggestions SET email_sent = 1 WHERE email_sent = 0")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn create_payment(
        &self,
        user_id: &str,
        invoice_id: &str,
        amount_minor: i64,
        currency: &str,
    ) -> Result<Payment> {
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            invoice_id: invoice_id.to_string(),
            amount_minor,
            currency: currency.to_string(),
            status: PaymentStatus::Pending,
            payment_method: None,
            created_at: Utc::now(),
            paid_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO payments (id, user_id, invoice_id, amount_minor, currency, status, payment_method, created_at, paid_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.user_id)
        .bind(&payment.invoice_id)
        .bind(payment.amount_minor)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(&payment.payment_method)
        .bind(payment.created_at.to_rfc3339())
        .bind(payment.paid_at.map(|ts| ts.to_rfc3339()))
        .execute(&self.pool)
        .await?;

        Ok(payment)
    }

    pub async fn get_payment(&self, invoice_id: &str) -> Result<Option<Payment>> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE invoice_id = ?"
        ))
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_payment))
    }

    /// Moves a pending payment to `next`. Completing a payment stamps
    /// `paid_at` and upgrades the owner to premium in the same transaction.
    /// Returns `None` when the payment is missing or no longer pending.
    pub async fn settle_pending_payment(
        &self,
        invoice_id: &str,
        next: PaymentStatus,
        payment_method: Option<&str>,
    ) -> Result<Option<Payment>> {
        let paid_at = (next == PaymentStatus::Completed).then(|| Utc::now().to_rfc3339());

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = ?,
                payment_method = COALESCE(?, payment_method),
                paid_at = ?
            WHERE invoice_id = ? AND status = 'pending'
            "#,
        )
        .bind(next.as_str())
        .bind(payment_method)
        .bind(&paid_at)
        .bind(invoice_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        if next == PaymentStatus::Completed {
            sqlx::query(
                "UPDATE users SET is_premium = 1 WHERE id = (SELECT user_id FROM payments WHERE invoice_id = ?)",
            )
            .bind(invoice_id)
            .execute(&mut *tx)
            .await?;
        }

        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE invoice_id = ?"
        ))
        .bind(invoice_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(Some(row_to_payment(row)))
    }
}

async fn insert_flashcard_tx(tx: &mut Transaction<'_, Sqlite>, card: &Flashcard) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO flashcards (id, user_id, title, question, answer, difficulty, times_studied, correct_answers, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&card.id)
    .bind(&card.user_id)
    .bind(&card.title)
    .bind(&card.question)
    .bind(&card.answer)
    .bind(card.difficulty.as_str())
    .bind(card.times_studied)
    .bind(card.correct_answers)
    .bind(card.created_at.to_rfc3339())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn parse_ts(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_user(row: SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        is_premium: row.get("is_premium"),
        created_at: parse_ts(&row.get::<String, _>("created_at")),
    }
}

fn row_to_flashcard(row: SqliteRow) -> Flashcard {
    Flashcard {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        question: row.get("question"),
        answer: row.get("answer"),
        difficulty: Difficulty::from_db(&row.get::<String, _>("difficulty")),
        times_studied: row.get("times_studied"),
        correct_answers: row.get("correct_answers"),
        created_at: parse_ts(&row.get::<String, _>("created_at")),
    }
}

fn row_to_suggestion(row: SqliteRow) -> Suggestion {
    Suggestion {
        id: row.get("id"),
        user_id: row.get("user_id"),
        content: row.get("content"),
        email_sent: row.get("email_sent"),
        created_at: parse_ts(&row.get::<String, _>("created_at")),
    }
}

fn row_to_payment(row: SqliteRow) -> Payment {
    Payment {
        id: row.get("id"),
        user_id: row.get("user_id"),
        invoice_id: row.get("invoice_id"),
        amount_minor: row.get("amount_minor"),
        currency: row.get("currency"),
        status: PaymentStatus::from_db(&row.get::<String, _>("status")),
        payment_method: row.get("payment_method"),
        created_at: parse_ts(&row.get::<String, _>("created_at")),
        paid_at: row
            .get::<Option<String>, _>("paid_at")
            .as_deref()
            .map(parse_ts),
    }
}
