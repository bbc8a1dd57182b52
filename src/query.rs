//! Composition of the lesson listing query.
//!
//! The listing is a single grouped query over lessons, their students and
//! their teachers. Optional filters are described by [`PREDICATES`]; each one
//! knows whether it is present in a [`LessonFilter`] and how to append itself
//! to the row stage (`WHERE`) or the group stage (`HAVING`).

use chrono::NaiveDate;
use sqlx::{Postgres, QueryBuilder};
use tracing::instrument;

use crate::{
    db::Db,
    error::{AppError, AppResult},
    models::{LessonRow, LessonSummary, ListLessonsQuery},
};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LESSONS_PER_PAGE: i64 = 5;

const SELECT_LESSONS: &str = "SELECT \
        lessons.id, lessons.date, lessons.title, lessons.status, \
        COUNT(DISTINCT lesson_students.student_id) AS student_count, \
        COUNT(*) FILTER (WHERE lesson_students.visit IS TRUE) AS visits_present, \
        COUNT(lesson_students.visit) AS visits_recorded, \
        COALESCE( \
            JSONB_AGG(DISTINCT JSONB_BUILD_OBJECT( \
                'id', lesson_students.student_id, \
                'name', students.name, \
                'visit', lesson_students.visit)) \
            FILTER (WHERE lesson_students.student_id IS NOT NULL), \
            '[]'::jsonb) AS students, \
        COALESCE( \
            JSONB_AGG(DISTINCT JSONB_BUILD_OBJECT('id', teachers.id, 'name', teachers.name)) \
            FILTER (WHERE teachers.id IS NOT NULL), \
            '[]'::jsonb) AS teachers \
     FROM lessons \
     LEFT JOIN lesson_students ON lesson_students.lesson_id = lessons.id \
     LEFT JOIN students ON students.id = lesson_students.student_id \
     LEFT JOIN lesson_teachers ON lesson_teachers.lesson_id = lessons.id \
     LEFT JOIN teachers ON teachers.id = lesson_teachers.teacher_id";

const GROUP_BY_LESSON: &str =
    " GROUP BY lessons.id, lessons.date, lessons.title, lessons.status";

const STUDENT_COUNT: &str = "COUNT(DISTINCT lesson_students.student_id)";

/// A filter given either as one exact value or as an inclusive range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound<T> {
    Exact(T),
    Between(T, T),
}

impl<T: Copy> Bound<T> {
    /// One value is an exact match, two are a range, none is no filter.
    fn from_values(field: &str, values: &[T]) -> AppResult<Option<Self>> {
        match values {
            [] => Ok(None),
            [value] => Ok(Some(Bound::Exact(*value))),
            [low, high] => Ok(Some(Bound::Between(*low, *high))),
            _ => Err(AppError::query(format!(
                "{field} takes one or two comma-separated values, got {}",
                values.len()
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonFilter {
    pub date: Option<Bound<NaiveDate>>,
    pub status: Option<String>,
    pub teacher_ids: Option<Vec<i32>>,
    pub students_count: Option<Bound<i64>>,
    pub page: i64,
    pub lessons_per_page: i64,
}

impl Default for LessonFilter {
    fn default() -> Self {
        Self {
            date: None,
            status: None,
            teacher_ids: None,
            students_count: None,
            page: DEFAULT_PAGE,
            lessons_per_page: DEFAULT_LESSONS_PER_PAGE,
        }
    }
}

impl LessonFilter {
    pub fn limit(&self) -> i64 {
        self.lessons_per_page
    }

    /// Pages are 1-based and not clamped; a bad page is left to the database.
    /// Fails only when the offset does not fit in an `i64`.
    pub fn offset(&self) -> AppResult<i64> {
        self.page
            .checked_sub(1)
            .and_then(|skipped| skipped.checked_mul(self.lessons_per_page))
            .ok_or_else(|| {
                AppError::query(format!(
                    "page {} with lessonsPerPage {} is out of range",
                    self.page, self.lessons_per_page
                ))
            })
    }
}

impl TryFrom<ListLessonsQuery> for LessonFilter {
    type Error = AppError;

    fn try_from(query: ListLessonsQuery) -> AppResult<Self> {
        let date = match query.date {
            Some(dates) => Bound::from_values("date", &dates)?,
            None => None,
        };
        let students_count = match query.students_count {
            Some(counts) => Bound::from_values("studentsCount", &counts)?,
            None => None,
        };

        let filter = Self {
            date,
            status: query.status.filter(|s| !s.is_empty()),
            teacher_ids: query.teacher_ids.filter(|ids| !ids.is_empty()),
            students_count,
            page: query.page.unwrap_or(DEFAULT_PAGE),
            lessons_per_page: query.lessons_per_page.unwrap_or(DEFAULT_LESSONS_PER_PAGE),
        };
        filter.offset()?;
        Ok(filter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Where,
    Having,
}

/// A named optional filter.
struct Predicate {
    name: &'static str,
    stage: Stage,
    is_present: fn(&LessonFilter) -> bool,
    apply: fn(&LessonFilter, &mut QueryBuilder<'_, Postgres>),
}

const PREDICATES: &[Predicate] = &[
    Predicate {
        name: "date",
        stage: Stage::Where,
        is_present: |f: &LessonFilter| f.date.is_some(),
        apply: apply_date,
    },
    Predicate {
        name: "status",
        stage: Stage::Where,
        is_present: |f: &LessonFilter| f.status.is_some(),
        apply: apply_status,
    },
    Predicate {
        name: "teacherIds",
        stage: Stage::Where,
        is_present: |f: &LessonFilter| f.teacher_ids.is_some(),
        apply: apply_teacher_ids,
    },
    Predicate {
        name: "studentsCount",
        stage: Stage::Having,
        is_present: |f: &LessonFilter| f.students_count.is_some(),
        apply: apply_students_count,
    },
];

fn apply_date(filter: &LessonFilter, qb: &mut QueryBuilder<'_, Postgres>) {
    match filter.date {
        Some(Bound::Exact(day)) => {
            qb.push("lessons.date = ").push_bind(day);
        }
        Some(Bound::Between(from, to)) => {
            qb.push("lessons.date BETWEEN ")
                .push_bind(from)
                .push(" AND ")
                .push_bind(to);
        }
        None => {}
    }
}

fn apply_status(filter: &LessonFilter, qb: &mut QueryBuilder<'_, Postgres>) {
    if let Some(status) = &filter.status {
        qb.push("lessons.status = ").push_bind(status.clone());
    }
}

// Matches join rows, so only the selected teachers show up in `teachers`.
fn apply_teacher_ids(filter: &LessonFilter, qb: &mut QueryBuilder<'_, Postgres>) {
    if let Some(ids) = &filter.teacher_ids {
        qb.push("lesson_teachers.teacher_id = ANY(")
            .push_bind(ids.clone())
            .push(")");
    }
}

fn apply_students_count(filter: &LessonFilter, qb: &mut QueryBuilder<'_, Postgres>) {
    match filter.students_count {
        Some(Bound::Exact(count)) => {
            qb.push(STUDENT_COUNT).push(" = ").push_bind(count);
        }
        Some(Bound::Between(low, high)) => {
            qb.push(STUDENT_COUNT)
                .push(" BETWEEN ")
                .push_bind(low)
                .push(" AND ")
                .push_bind(high);
        }
        None => {}
    }
}

/// Appends every present predicate of `stage`, joined with `AND`.
fn push_stage(filter: &LessonFilter, stage: Stage, qb: &mut QueryBuilder<'_, Postgres>) {
    let keyword = match stage {
        Stage::Where => " WHERE ",
        Stage::Having => " HAVING ",
    };

    let present = PREDICATES
        .iter()
        .filter(|p| p.stage == stage && (p.is_present)(filter));

    for (i, predicate) in present.enumerate() {
        tracing::trace!(filter = predicate.name, "applying lesson filter");
        qb.push(if i == 0 { keyword } else { " AND " });
        (predicate.apply)(filter, qb);
    }
}

pub struct LessonQueryBuilder;

impl LessonQueryBuilder {
    pub fn build(filter: &LessonFilter) -> AppResult<QueryBuilder<'static, Postgres>> {
        let offset = filter.offset()?;
        let mut qb = QueryBuilder::new(SELECT_LESSONS);

        push_stage(filter, Stage::Where, &mut qb);
        qb.push(GROUP_BY_LESSON);
        push_stage(filter, Stage::Having, &mut qb);

        qb.push(" ORDER BY lessons.id")
            .push(" LIMIT ")
            .push_bind(filter.limit())
            .push(" OFFSET ")
            .push_bind(offset);
        Ok(qb)
    }

    #[instrument(skip(db))]
    pub async fn execute(db: &Db, filter: &LessonFilter) -> AppResult<Vec<LessonSummary>> {
        let mut qb = Self::build(filter)?;
        let rows = qb
            .build_query_as::<LessonRow>()
            .fetch_all(db)
            .await
            .map_err(AppError::query)?;

        tracing::debug!(count = rows.len(), "lessons fetched");
        Ok(rows.into_iter().map(LessonSummary::from).collect())
    }
}
