use tracing::instrument;

use crate::{
    db::Db,
    error::{AppError, AppResult},
    models::CreateLessonsReq,
    schedule,
};

pub struct LessonService;

impl LessonService {
    /// Create one lesson per date of the request's recurrence rule and link
    /// every lesson to the requested teachers.
    ///
    /// All rows are written in one transaction; on failure nothing is kept.
    /// Returns the new ids in date order.
    #[instrument(skip(db, req), fields(title = %req.title))]
    pub async fn create_lessons(db: &Db, req: CreateLessonsReq) -> AppResult<Vec<i32>> {
        let dates = schedule::generate(
            &req.first_date,
            req.last_date.as_deref(),
            req.lessons_count,
            &req.days,
        )?;

        let mut teacher_ids = req.teacher_ids;
        teacher_ids.sort_unstable();
        teacher_ids.dedup();

        let mut tx = db.begin().await.map_err(AppError::insert)?;
        let mut ids = Vec::with_capacity(dates.len());

        for date in dates {
            let id: i32 =
                sqlx::query_scalar("INSERT INTO lessons (date, title) VALUES ($1, $2) RETURNING id")
                    .bind(date)
                    .bind(&req.title)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(AppError::insert)?;

            if !teacher_ids.is_empty() {
                sqlx::query(
                    "INSERT INTO lesson_teachers (lesson_id, teacher_id) \
                     SELECT $1, UNNEST($2::INTEGER[])",
                )
                .bind(id)
                .bind(&teacher_ids[..])
                .execute(&mut *tx)
                .await
                .map_err(AppError::insert)?;
            }

            ids.push(id);
        }

        tx.commit().await.map_err(AppError::insert)?;
        tracing::info!(count = ids.len(), "lessons created");
        Ok(ids)
    }
}
