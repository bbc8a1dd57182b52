use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_with::{formats::CommaSeparator, serde_as, StringWithSeparator};
use sqlx::types::Json;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StudentVisit {
    pub id: i32,
    pub name: String,
    pub visit: Option<bool>, // None until attendance is recorded
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TeacherRef {
    pub id: i32,
    pub name: String,
}

/// One grouped row of the listing query.
#[derive(sqlx::FromRow, Debug)]
pub struct LessonRow {
    pub id: i32,
    pub date: NaiveDate,
    pub title: String,
    pub status: String,
    pub student_count: i64,
    pub visits_present: i64,
    pub visits_recorded: i64,
    pub students: Json<Vec<StudentVisit>>,
    pub teachers: Json<Vec<TeacherRef>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LessonSummary {
    pub id: i32,
    pub date: NaiveDate,
    pub title: String,
    pub status: String,
    pub visit_count: i64,
    pub students: Vec<StudentVisit>,
    pub teachers: Vec<TeacherRef>,
}

/// Attendance counters of a lesson as seen through the teacher join.
///
/// `present` and `recorded` are multiplied by the number of joined teachers,
/// `students` is a distinct count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitTally {
    pub students: i64,
    pub present: i64,
    pub recorded: i64,
}

impl VisitTally {
    /// `floor(present / (recorded / students))`, evaluated exactly.
    ///
    /// No linked students or no recorded visits both count as zero.
    pub fn visit_count(&self) -> i64 {
        if self.students == 0 || self.recorded == 0 {
            return 0;
        }
        self.present * self.students / self.recorded
    }
}

impl From<LessonRow> for LessonSummary {
    fn from(row: LessonRow) -> Self {
        let tally = VisitTally {
            students: row.student_count,
            present: row.visits_present,
            recorded: row.visits_recorded,
        };
        Self {
            id: row.id,
            date: row.date,
            title: row.title,
            status: row.status,
            visit_count: tally.visit_count(),
            students: row.students.0,
            teachers: row.teachers.0,
        }
    }
}

/// Raw query string of `GET /`. List-valued parameters are comma-joined.
#[serde_as]
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListLessonsQuery {
    #[serde_as(as = "Option<StringWithSeparator::<CommaSeparator, NaiveDate>>")]
    pub date: Option<Vec<NaiveDate>>,
    pub status: Option<String>,
    #[serde_as(as = "Option<StringWithSeparator::<CommaSeparator, i32>>")]
    pub teacher_ids: Option<Vec<i32>>,
    #[serde_as(as = "Option<StringWithSeparator::<CommaSeparator, i64>>")]
    pub students_count: Option<Vec<i64>>,
    pub page: Option<i64>,
    pub lessons_per_page: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateLessonsReq {
    #[serde(default)]
    pub teacher_ids: Vec<i32>,
    pub title: String,
    pub days: Vec<u8>,
    pub first_date: String,
    pub last_date: Option<String>,
    pub lessons_count: Option<u32>,
}
