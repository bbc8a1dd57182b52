use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    db::Db,
    error::{AppError, AppResult},
    lessons::LessonService,
    models::*,
    query::{LessonFilter, LessonQueryBuilder},
};

/// Full application: lesson routes, liveness probe and HTTP layers.
pub fn app(db: Db) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(router(db))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
}

pub fn router(db: Db) -> Router {
    Router::new()
        .route("/", get(list_lessons))
        .route("/lessons", post(create_lessons))
        .with_state(db)
}

async fn list_lessons(
    State(db): State<Db>,
    query: Result<Query<ListLessonsQuery>, QueryRejection>,
) -> AppResult<Json<Vec<LessonSummary>>> {
    let Query(query) = query.map_err(AppError::query)?;
    let filter = LessonFilter::try_from(query)?;
    let lessons = LessonQueryBuilder::execute(&db, &filter).await?;
    Ok(Json(lessons))
}

async fn create_lessons(
    State(db): State<Db>,
    body: Result<Json<CreateLessonsReq>, JsonRejection>,
) -> AppResult<Json<Vec<i32>>> {
    let Json(req) = body.map_err(|e| AppError::InvalidInput(e.body_text()))?;
    let ids = LessonService::create_lessons(&db, req).await?;
    Ok(Json(ids))
}
