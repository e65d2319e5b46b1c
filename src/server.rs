use std::net::SocketAddr;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::ServiceError;
use crate::flashcards::FlashcardService;
use crate::models::{
    ActionResponse, CreatePaymentRequest, CreateUserRequest, Flashcard, GenerateRequest,
    GenerateResponse, Payment, PaymentStatusRequest, StudyStatsRequest, Suggestion,
    SuggestionRequest, User,
};
use crate::payments::PaymentService;
use crate::suggestions::SuggestionService;
use crate::users::UserService;

#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
    pub flashcards: FlashcardService,
    pub suggestions: SuggestionService,
    pub payments: PaymentService,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/users", post(create_user))
        .route("/api/users/:user_id", get(get_user))
        .route("/api/users/:user_id/flashcards", get(list_flashcards))
        .route(
            "/api/users/:user_id/flashcards/:flashcard_id",
            get(get_flashcard).delete(delete_flashcard),
        )
        .route("/api/users/:user_id/suggestions", get(list_suggestions))
        .route("/api/flashcards/generate", post(generate_flashcards))
        .route("/api/flashcards/stats", post(update_stats))
        .route("/api/suggestions", post(submit_suggestion))
        .route("/api/suggestions/confirmations", post(send_confirmations))
        .route("/api/payments", post(create_payment))
        .route("/api/payments/:invoice_id", get(get_payment))
        .route("/api/payments/:invoice_id/status", post(update_payment_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: AppConfig, state: AppState) -> Result<()> {
    let app = router(state);

    let addr: SocketAddr = config.bind_addr.parse()?;
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state
        .users
        .register(&request.username, &request.email)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.users.get(&user_id).await?))
}

async fn generate_flashcards(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let flashcards = state
        .flashcards
        .generate_for_user(&request.user_id, &request.text)
        .await?;

    Ok(Json(GenerateResponse {
        success: true,
        count: flashcards.len(),
        flashcards,
    }))
}

async fn list_flashcards(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Flashcard>>, ApiError> {
    Ok(Json(state.flashcards.list(&user_id).await?))
}

async fn get_flashcard(
    State(state): State<AppState>,
    Path((user_id, flashcard_id)): Path<(String, String)>,
) -> Result<Json<Flashcard>, ApiError> {
    Ok(Json(state.flashcards.get(&user_id, &flashcard_id).await?))
}

async fn delete_flashcard(
    State(state): State<AppState>,
    Path((user_id, flashcard_id)): Path<(String, String)>,
) -> Result<Json<ActionResponse>, ApiError> {
    state.flashcards.delete(&user_id, &flashcard_id).await?;
    Ok(Json(ActionResponse::ok()))
}

async fn update_stats(
    State(state): State<AppState>,
    Json(request): Json<StudyStatsRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    state
        .flashcards
        .record_study(&request.user_id, &request.flashcard_id, request.is_correct)
        .await?;
    Ok(Json(ActionResponse::ok()))
}

async fn submit_suggestion(
    State(state): State<AppState>,
    Json(request): Json<SuggestionRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    state
        .suggestions
        .submit(&request.user_id, &request.content)
        .await?;
    Ok(Json(ActionResponse::with_message(
        "Thank you! Your suggestion has been submitted successfully.",
    )))
}

async fn list_suggestions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Suggestion>>, ApiError> {
    Ok(Json(state.suggestions.list(&user_id).await?))
}

async fn send_confirmations(
    State(state): State<AppState>,
) -> Result<Json<ActionResponse>, ApiError> {
    let message = state.suggestions.send_confirmations().await?;
    Ok(Json(ActionResponse::with_message(message)))
}

async fn create_payment(
    State(state): State<AppState>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), ApiError> {
    let payment = state
        .payments
        .create(
            &request.user_id,
            &request.invoice_id,
            request.amount_minor,
            &request.currency,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

async fn get_payment(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
) -> Result<Json<Payment>, ApiError> {
    Ok(Json(state.payments.get(&invoice_id).await?))
}

async fn update_payment_status(
    State(state): State<AppState>,
    Path(invoice_id): Path<String>,
    Json(request): Json<PaymentStatusRequest>,
) -> Result<Json<Payment>, ApiError> {
    let payment = state
        .payments
        .update_status(
            &invoice_id,
            request.status,
            request.payment_method.as_deref(),
        )
        .await?;
    Ok(Json(payment))
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        let status = match &value {
            ServiceError::Invalid(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Internal(err) => {
                tracing::error!("request failed: {:#}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        Self {
            status,
            message: value.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "success": false, "error": self.message });
        (self.status, Json(body)).into_response()
    }
}
