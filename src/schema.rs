//! Workload plan data model: plans, teaching tables and their rows.
//!
//! Summary and methodical-work types live in `summary_schema.rs`.

use crate::labels::{self, ACTUAL, PLANNED, SEMESTER1_TOTAL, SEMESTER2_TOTAL, YEAR_TOTAL};
use crate::summary_schema::{MethodWorkTable, SummaryTable};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of per-category hour columns in a teaching table.
pub const HOUR_COLUMNS: usize = 17;

/// A named workload plan owning its tables, summary and methodical work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    /// SHA-256 of the imported workbook bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(default)]
    pub tables: Vec<PlanTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryTable>,
    #[serde(default)]
    pub methodical: MethodWorkTable,
}

impl Plan {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: format!("plan_{}", Uuid::new_v4().simple()),
            name: name.into(),
            created_at: now,
            updated_at: now,
            source_file: None,
            content_hash: None,
            tables: Vec::new(),
            summary: None,
            methodical: MethodWorkTable::default(),
        }
    }

    /// Deep copy under a fresh id and timestamps ("save as new plan").
    pub fn duplicate(&self, name: impl Into<String>) -> Self {
        let mut copy = self.clone();
        let fresh = Plan::new(name);
        copy.id = fresh.id;
        copy.name = fresh.name;
        copy.created_at = fresh.created_at;
        copy.updated_at = fresh.updated_at;
        copy
    }
}

/// One recognized worksheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanTable {
    pub sheet_name: String,
    /// Localized sheet name shown to users ("Таблица 2").
    #[serde(default)]
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semester_title: Option<String>,
    /// Whether this table counts towards teaching work in the summary.
    #[serde(default)]
    pub include_in_summary: bool,
    pub imported_at: DateTime<Utc>,
    #[serde(flatten)]
    pub totals: PeriodTotals,
    #[serde(default)]
    pub rows: Vec<PlanRow>,
}

impl PlanTable {
    pub fn new(sheet_name: &str, semester_title: Option<String>) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            display_name: labels::localized_sheet_name(sheet_name),
            semester_title,
            include_in_summary: false,
            imported_at: Utc::now(),
            totals: PeriodTotals::default(),
            rows: Vec::new(),
        }
    }

    pub fn summary_rows(&self) -> impl Iterator<Item = &PlanRow> {
        self.rows.iter().filter(|r| r.is_summary)
    }
}

/// A discipline line or an embedded total line of a teaching table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanRow {
    #[serde(default)]
    pub row_order: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<i32>,
    /// Discipline name, or the total header text for summary rows.
    #[serde(default)]
    pub discipline_name: String,
    /// Faculty/group, or the "Поручено"/"Выполнено" kind for summary rows.
    #[serde(default)]
    pub faculty_group: String,
    #[serde(flatten)]
    pub quantities: Quantities,
    #[serde(flatten)]
    pub hours: Hours,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub is_summary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_kind: Option<TotalKind>,
}

impl PlanRow {
    /// Tag a summary row that arrived without a kind from its label text.
    pub fn tag_total_kind(&mut self) {
        if self.is_summary && self.total_kind.is_none() {
            self.total_kind = TotalKind::from_labels(&self.discipline_name, &self.faculty_group);
        }
    }
}

/// The "Количество" block: course, streams, groups and students.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streams: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub students: Option<i32>,
}

/// Teaching hours by activity type, in spreadsheet column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hours {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lectures: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub practicals: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labs: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervised_self_study: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_projects: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_papers: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_fail_exams: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graded_exams: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exams: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_exams: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_board: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thesis_supervision: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_practice: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_practice: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_diploma_practice: Option<i32>,
}

impl Hours {
    /// Build from the seventeen hour columns, left to right.
    pub fn from_columns(c: [Option<i32>; HOUR_COLUMNS]) -> Self {
        Self {
            lectures: c[0],
            practicals: c[1],
            labs: c[2],
            supervised_self_study: c[3],
            course_projects: c[4],
            course_papers: c[5],
            tests: c[6],
            pass_fail_exams: c[7],
            graded_exams: c[8],
            exams: c[9],
            state_exams: c[10],
            state_board: c[11],
            thesis_supervision: c[12],
            reviews: c[13],
            study_practice: c[14],
            work_practice: c[15],
            pre_diploma_practice: c[16],
        }
    }

    pub fn columns(&self) -> [Option<i32>; HOUR_COLUMNS] {
        [
            self.lectures,
            self.practicals,
            self.labs,
            self.supervised_self_study,
            self.course_projects,
            self.course_papers,
            self.tests,
            self.pass_fail_exams,
            self.graded_exams,
            self.exams,
            self.state_exams,
            self.state_board,
            self.thesis_supervision,
            self.reviews,
            self.study_practice,
            self.work_practice,
            self.pre_diploma_practice,
        ]
    }

    /// Sum of all hour fields, absent counted as zero.
    pub fn sum(&self) -> i32 {
        self.columns()
            .iter()
            .map(|h| h.unwrap_or(0))
            .fold(0, i32::saturating_add)
    }
}

/// Period a total row covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalPeriod {
    Semester1,
    Semester2,
    Year,
}

impl TotalPeriod {
    pub const ALL: [TotalPeriod; 3] = [Self::Semester1, Self::Semester2, Self::Year];

    pub fn header(self) -> &'static str {
        match self {
            Self::Semester1 => SEMESTER1_TOTAL,
            Self::Semester2 => SEMESTER2_TOTAL,
            Self::Year => YEAR_TOTAL,
        }
    }

    /// Recognize a total header ("Итого за 1 семестр:") by prefix.
    pub fn from_header(text: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| labels::starts_with_ignore_case(text, p.header()))
    }
}

/// Planned ("Поручено") or actual ("Выполнено") hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    Planned,
    Actual,
}

impl Measure {
    pub fn label(self) -> &'static str {
        match self {
            Self::Planned => PLANNED,
            Self::Actual => ACTUAL,
        }
    }

    pub fn from_label(text: &str) -> Option<Self> {
        [Self::Planned, Self::Actual]
            .into_iter()
            .find(|m| labels::eq_ignore_case(text, m.label()))
    }
}

/// Which of the six table totals a summary row carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TotalKind {
    pub period: TotalPeriod,
    pub measure: Measure,
}

impl TotalKind {
    pub const ALL: [TotalKind; 6] = [
        TotalKind::new(TotalPeriod::Semester1, Measure::Planned),
        TotalKind::new(TotalPeriod::Semester1, Measure::Actual),
        TotalKind::new(TotalPeriod::Semester2, Measure::Planned),
        TotalKind::new(TotalPeriod::Semester2, Measure::Actual),
        TotalKind::new(TotalPeriod::Year, Measure::Planned),
        TotalKind::new(TotalPeriod::Year, Measure::Actual),
    ];

    pub const fn new(period: TotalPeriod, measure: Measure) -> Self {
        Self { period, measure }
    }

    pub fn from_labels(header: &str, kind: &str) -> Option<Self> {
        Some(Self::new(
            TotalPeriod::from_header(header)?,
            Measure::from_label(kind)?,
        ))
    }
}

/// The six semester/year plan/fact totals of a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodTotals {
    #[serde(default)]
    pub sem1_plan: Option<i32>,
    #[serde(default)]
    pub sem1_fact: Option<i32>,
    #[serde(default)]
    pub sem2_plan: Option<i32>,
    #[serde(default)]
    pub sem2_fact: Option<i32>,
    #[serde(default)]
    pub year_plan: Option<i32>,
    #[serde(default)]
    pub year_fact: Option<i32>,
}

impl PeriodTotals {
    fn slot(&mut self, kind: TotalKind) -> &mut Option<i32> {
        match (kind.period, kind.measure) {
            (TotalPeriod::Semester1, Measure::Planned) => &mut self.sem1_plan,
            (TotalPeriod::Semester1, Measure::Actual) => &mut self.sem1_fact,
            (TotalPeriod::Semester2, Measure::Planned) => &mut self.sem2_plan,
            (TotalPeriod::Semester2, Measure::Actual) => &mut self.sem2_fact,
            (TotalPeriod::Year, Measure::Planned) => &mut self.year_plan,
            (TotalPeriod::Year, Measure::Actual) => &mut self.year_fact,
        }
    }

    pub fn get(&self, kind: TotalKind) -> Option<i32> {
        match (kind.period, kind.measure) {
            (TotalPeriod::Semester1, Measure::Planned) => self.sem1_plan,
            (TotalPeriod::Semester1, Measure::Actual) => self.sem1_fact,
            (TotalPeriod::Semester2, Measure::Planned) => self.sem2_plan,
            (TotalPeriod::Semester2, Measure::Actual) => self.sem2_fact,
            (TotalPeriod::Year, Measure::Planned) => self.year_plan,
            (TotalPeriod::Year, Measure::Actual) => self.year_fact,
        }
    }

    pub fn set(&mut self, kind: TotalKind, value: Option<i32>) {
        *self.slot(kind) = value;
    }

    pub fn any_set(&self) -> bool {
        TotalKind::ALL.iter().any(|k| self.get(*k).is_some())
    }
}
