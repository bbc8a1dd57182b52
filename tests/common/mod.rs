#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

use lesson_scheduler::routes;

pub fn build_test_app(pool: PgPool) -> Router {
    routes::app(pool)
}

pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap();
    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub async fn insert_teacher(pool: &PgPool, name: &str) -> i32 {
    sqlx::query_scalar("INSERT INTO teachers (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn insert_student(pool: &PgPool, name: &str) -> i32 {
    sqlx::query_scalar("INSERT INTO students (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn insert_lesson(pool: &PgPool, day: &str, title: &str, status: &str) -> i32 {
    sqlx::query_scalar("INSERT INTO lessons (date, title, status) VALUES ($1, $2, $3) RETURNING id")
        .bind(date(day))
        .bind(title)
        .bind(status)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn link_teacher(pool: &PgPool, lesson_id: i32, teacher_id: i32) {
    sqlx::query("INSERT INTO lesson_teachers (lesson_id, teacher_id) VALUES ($1, $2)")
        .bind(lesson_id)
        .bind(teacher_id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn link_student(pool: &PgPool, lesson_id: i32, student_id: i32, visit: Option<bool>) {
    sqlx::query("INSERT INTO lesson_students (lesson_id, student_id, visit) VALUES ($1, $2, $3)")
        .bind(lesson_id)
        .bind(student_id)
        .bind(visit)
        .execute(pool)
        .await
        .unwrap();
}

/// Lesson with `students` linked students, all marked present.
pub async fn lesson_with_students(pool: &PgPool, day: &str, students: usize) -> i32 {
    let lesson_id = insert_lesson(pool, day, "Group lesson", "planned").await;
    for n in 0..students {
        let student_id = insert_student(pool, &format!("Student {n}")).await;
        link_student(pool, lesson_id, student_id, Some(true)).await;
    }
    lesson_id
}

pub fn ids(body: &Value) -> Vec<i64> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|lesson| lesson["id"].as_i64().unwrap())
        .collect()
}
