use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;

use certprep_core::model::{ExamId, ExamType, ReviewDraft};
use services::api::{
    ExamView, GenerateQuestionsRequest, GenerateQuestionsResponse, PreGenerateRequest,
    PreGenerateResponse, QuestionQuery, QuestionView, RandomQuestionsQuery, RandomQuestionsResponse, ReviewQuery, ReviewView,
};
use services::sessions::enrich_options;
use services::{AppServices, ExamReviewService, PoolService};

use crate::error::ApiError;

/// Handles shared by every request.
#[derive(Clone)]
pub struct AppState {
    pool: PoolService,
    reviews: ExamReviewService,
}

impl AppState {
    #[must_use]
    pub fn new(services: &AppServices) -> Self {
        Self {
            pool: services.pool(),
            reviews: services.reviews(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/exams", get(list_exams))
        .route("/api/exams/by-type/{exam_type}", get(exam_by_type))
        .route("/api/exams/pre-generate", post(pre_generate))
        .route("/api/exams/{id}", get(exam_detail))
        .route("/api/exams/{id}/generate-questions", post(generate_questions))
        .route("/api/exams/{id}/random-questions", get(random_questions))
        .route("/api/questions", get(list_questions))
        .route("/api/reviews", get(list_reviews).post(submit_review))
        .with_state(state)
}

async fn list_exams(State(state): State<AppState>) -> Result<Json<Vec<ExamView>>, ApiError> {
    let exams = state.pool.list_exams().await?;
    Ok(Json(exams.iter().map(ExamView::from).collect()))
}

async fn exam_by_type(
    State(state): State<AppState>,
    Path(exam_type): Path<String>,
) -> Result<Json<ExamView>, ApiError> {
    let exam_type = ExamType::parse(exam_type)?;
    let summary = state.pool.exam_by_type(&exam_type).await?;
    Ok(Json(ExamView::from(&summary)))
}

async fn exam_detail(
    State(state): State<AppState>,
    Path(id): Path<ExamId>,
) -> Result<Json<ExamView>, ApiError> {
    let summary = state.pool.exam(id).await?;
    Ok(Json(ExamView::from(&summary)))
}

/// Applies the enrichment policy. A full pool is reported as skipped, never as an error.
async fn generate_questions(
    State(state): State<AppState>,
    Path(id): Path<ExamId>,
    Json(request): Json<GenerateQuestionsRequest>,
) -> Result<Json<GenerateQuestionsResponse>, ApiError> {
    let summary = state.pool.exam(id).await?;
    let report = state
        .pool
        .enrich(&summary.exam, enrich_options(&request))
        .await?;
    Ok(Json(GenerateQuestionsResponse::from(&report)))
}

async fn random_questions(
    State(state): State<AppState>,
    Path(id): Path<ExamId>,
    Query(query): Query<RandomQuestionsQuery>,
) -> Result<Json<RandomQuestionsResponse>, ApiError> {
    let sample = state.pool.sample(id, query.limit).await?;
    Ok(Json(RandomQuestionsResponse::from(&sample)))
}

async fn list_questions(
    State(state): State<AppState>,
    Query(query): Query<QuestionQuery>,
) -> Result<Json<Vec<QuestionView>>, ApiError> {
    let questions = state
        .pool
        .list_questions(&query.filter(), query.limit)
        .await?;
    Ok(Json(questions.iter().map(QuestionView::from).collect()))
}

async fn pre_generate(
    State(state): State<AppState>,
    Json(request): Json<PreGenerateRequest>,
) -> Result<(StatusCode, Json<PreGenerateResponse>), ApiError> {
    let summary = state
        .pool
        .pre_generate(&request.exam_type, request.num_questions)
        .await?;
    info!(exam_type = %request.exam_type, "pre-generation started");
    Ok((
        StatusCode::ACCEPTED,
        Json(PreGenerateResponse {
            exam_id: summary.exam.id(),
            exam_type: request.exam_type,
            questions_count: summary.question_count,
            status: "started".into(),
        }),
    ))
}

async fn submit_review(
    State(state): State<AppState>,
    Json(draft): Json<ReviewDraft>,
) -> Result<(StatusCode, Json<ReviewView>), ApiError> {
    let review = state.reviews.submit(draft).await?;
    Ok((StatusCode::CREATED, Json(ReviewView::from(&review))))
}

async fn list_reviews(
    State(state): State<AppState>,
    Query(query): Query<ReviewQuery>,
) -> Result<Json<Vec<ReviewView>>, ApiError> {
    let reviews = state.reviews.list(query.exam_id, query.limit).await?;
    Ok(Json(reviews.iter().map(ReviewView::from).collect()))
}
