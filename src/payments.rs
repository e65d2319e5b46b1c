use crate::db::Database;
use crate::error::{is_unique_violation, ServiceError, ServiceResult};
use crate::models::{Payment, PaymentStatus};

/// Only pending payments move, and never back to pending.
pub fn can_transition(from: PaymentStatus, to: PaymentStatus) -> bool {
    from == PaymentStatus::Pending && to != PaymentStatus::Pending
}

#[derive(Clone)]
pub struct PaymentService {
    db: Database,
}

impl PaymentService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        user_id: &str,
        invoice_id: &str,
        amount_minor: i64,
        currency: &str,
    ) -> ServiceResult<Payment> {
        let invoice_id = invoice_id.trim();
        let currency = currency.trim().to_ascii_uppercase();

        if invoice_id.is_empty() {
            return Err(ServiceError::Invalid("invoice id is required".to_string()));
        }
        if amount_minor <= 0 {
            return Err(ServiceError::Invalid("amount must be positive".to_string()));
        }
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ServiceError::Invalid(format!(
                "invalid currency code: {currency}"
            )));
        }
        if self.db.get_user(user_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("user not found: {user_id}")));
        }

        match self
            .db
            .create_payment(user_id, invoice_id, amount_minor, &currency)
            .await
        {
            Ok(payment) => Ok(payment),
            Err(err) if is_unique_violation(&err) => Err(ServiceError::Conflict(format!(
                "invoice already recorded: {invoice_id}"
            ))),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn get(&self, invoice_id: &str) -> ServiceResult<Payment> {
        self.db
            .get_payment(invoice_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("payment not found: {invoice_id}")))
    }

    pub async fn update_status(
        &self,
        invoice_id: &str,
        next: PaymentStatus,
        payment_method: Option<&str>,
    ) -> ServiceResult<Payment> {
        let current = self.get(invoice_id).await?;
        if !can_transition(current.status, next) {
            return Err(ServiceError::Conflict(format!(
                "cannot move payment {} from {} to {}",
                invoice_id,
                current.status.as_str(),
                next.as_str()
            )));
        }

        let payment = self
            .db
            .settle_pending_payment(invoice_id, next, payment_method)
            .await?
            .ok_or_else(|| {
                ServiceError::Conflict(format!("payment {invoice_id} is no longer pending"))
            })?;

        if payment.status == PaymentStatus::Completed {
            tracing::info!("user {} upgraded to premium via {}", payment.user_id, invoice_id);
        }
        Ok(payment)
    }
}
