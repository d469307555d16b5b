//! Organization-wide summary table and methodical-work types.
//!
//! Separate from `schema.rs` since these tables have a fixed structure
//! addressed by code, while teaching tables are free-form imports.

use crate::labels;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Codes of the twelve fixed summary rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SummaryCode {
    #[serde(rename = "1")]
    Teaching,
    #[serde(rename = "2")]
    Methodical,
    #[serde(rename = "2.1")]
    MethodicalProcess,
    #[serde(rename = "2.2")]
    MethodicalPublishing,
    #[serde(rename = "2.3")]
    MethodicalBase,
    #[serde(rename = "3")]
    OrganizationalMethodical,
    #[serde(rename = "4")]
    StudentResearch,
    #[serde(rename = "5")]
    Research,
    #[serde(rename = "6")]
    Qualification,
    #[serde(rename = "7")]
    Extracurricular,
    #[serde(rename = "8")]
    Other,
    #[serde(rename = "")]
    Total,
}

impl SummaryCode {
    /// Skeleton order.
    pub const ALL: [SummaryCode; 12] = [
        Self::Teaching,
        Self::Methodical,
        Self::MethodicalProcess,
        Self::MethodicalPublishing,
        Self::MethodicalBase,
        Self::OrganizationalMethodical,
        Self::StudentResearch,
        Self::Research,
        Self::Qualification,
        Self::Extracurricular,
        Self::Other,
        Self::Total,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Teaching => "1",
            Self::Methodical => "2",
            Self::MethodicalProcess => "2.1",
            Self::MethodicalPublishing => "2.2",
            Self::MethodicalBase => "2.3",
            Self::OrganizationalMethodical => "3",
            Self::StudentResearch => "4",
            Self::Research => "5",
            Self::Qualification => "6",
            Self::Extracurricular => "7",
            Self::Other => "8",
            Self::Total => "",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL.into_iter().find(|c| c.as_str() == code)
    }

    pub fn default_work_name(self) -> &'static str {
        match self {
            Self::Teaching => "Учебная работа",
            Self::Methodical => "Учебно-методическая работа",
            Self::MethodicalProcess => "Разработка методического обеспечения учебного процесса",
            Self::MethodicalPublishing => {
                "Подготовка к изданию учебно-методических и научных разработок"
            }
            Self::MethodicalBase => "Совершенствование учебно-материальной базы",
            Self::OrganizationalMethodical => "Организационно-методическая работа",
            Self::StudentResearch => "Организация научно-исследовательской работы студентов",
            Self::Research => "Научно-исследовательская работа",
            Self::Qualification => "Повышение квалификации",
            Self::Extracurricular => "Внеучебная работа",
            Self::Other => "Другие виды работ",
            Self::Total => "Итого:",
        }
    }

    /// Rows written by aggregation passes and never edited by hand.
    pub fn is_managed(self) -> bool {
        matches!(self, Self::Teaching | Self::Total)
    }
}

/// Six plan/fact hour values of a summary row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryValues {
    #[serde(default)]
    pub sem1_plan: i32,
    #[serde(default)]
    pub sem1_fact: i32,
    #[serde(default)]
    pub sem2_plan: i32,
    #[serde(default)]
    pub sem2_fact: i32,
    #[serde(default)]
    pub year_plan: i32,
    #[serde(default)]
    pub year_fact: i32,
}

impl SummaryValues {
    /// Column-wise add, clamped at the `i32` bounds.
    pub fn add(&mut self, other: &SummaryValues) {
        self.sem1_plan = self.sem1_plan.saturating_add(other.sem1_plan);
        self.sem1_fact = self.sem1_fact.saturating_add(other.sem1_fact);
        self.sem2_plan = self.sem2_plan.saturating_add(other.sem2_plan);
        self.sem2_fact = self.sem2_fact.saturating_add(other.sem2_fact);
        self.year_plan = self.year_plan.saturating_add(other.year_plan);
        self.year_fact = self.year_fact.saturating_add(other.year_fact);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub row_order: u32,
    pub code: SummaryCode,
    pub work_name: String,
    #[serde(flatten)]
    pub values: SummaryValues,
    #[serde(default)]
    pub is_total_row: bool,
}

/// Fixed-structure rollup owned 1:1 by a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryTable {
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    /// Twelve zero-valued rows in skeleton order.
    pub fn skeleton() -> Self {
        let rows = SummaryCode::ALL
            .into_iter()
            .zip(1u32..)
            .map(|(code, row_order)| SummaryRow {
                row_order,
                code,
                work_name: code.default_work_name().to_string(),
                values: SummaryValues::default(),
                is_total_row: code == SummaryCode::Total,
            })
            .collect();

        Self {
            created_at: Utc::now(),
            rows,
        }
    }

    pub fn row(&self, code: SummaryCode) -> Option<&SummaryRow> {
        self.rows.iter().find(|r| r.code == code)
    }

    pub fn row_mut(&mut self, code: SummaryCode) -> Option<&mut SummaryRow> {
        self.rows.iter_mut().find(|r| r.code == code)
    }
}

/// Closed set of methodical-work categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodCategory {
    MethodicalProcess,
    MethodicalPublishing,
    MethodicalBase,
    OrganizationalResearch,
    ResearchWork,
    Qualification,
    Extracurricular,
    OtherWork,
}

impl MethodCategory {
    pub const ALL: [MethodCategory; 8] = [
        Self::MethodicalProcess,
        Self::MethodicalPublishing,
        Self::MethodicalBase,
        Self::OrganizationalResearch,
        Self::ResearchWork,
        Self::Qualification,
        Self::Extracurricular,
        Self::OtherWork,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::MethodicalProcess => "Разработка методического обеспечения учебного процесса",
            Self::MethodicalPublishing => "Подготовка к изданию учебно-методических разработок",
            Self::MethodicalBase => "Совершенствование учебно-материальной базы",
            Self::OrganizationalResearch => "Организация научно-исследовательской работы студентов",
            Self::ResearchWork => "Научно-исследовательская работа",
            Self::Qualification => "Повышение квалификации",
            Self::Extracurricular => "Внеучебная работа",
            Self::OtherWork => "Другие виды работ",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::MethodicalProcess => "methodical_process",
            Self::MethodicalPublishing => "methodical_publishing",
            Self::MethodicalBase => "methodical_base",
            Self::OrganizationalResearch => "organizational_research",
            Self::ResearchWork => "research_work",
            Self::Qualification => "qualification",
            Self::Extracurricular => "extracurricular",
            Self::OtherWork => "other_work",
        }
    }

    /// Resolve a category from its Russian label or its API key.
    pub fn from_label(text: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| labels::eq_ignore_case(text, c.label()) || labels::eq_ignore_case(text, c.key()))
    }

    /// Summary row that receives this category's hours.
    pub fn target_code(self) -> SummaryCode {
        match self {
            Self::MethodicalProcess => SummaryCode::MethodicalProcess,
            Self::MethodicalPublishing => SummaryCode::MethodicalPublishing,
            Self::MethodicalBase => SummaryCode::MethodicalBase,
            Self::OrganizationalResearch => SummaryCode::StudentResearch,
            Self::ResearchWork => SummaryCode::Research,
            Self::Qualification => SummaryCode::Qualification,
            Self::Extracurricular => SummaryCode::Extracurricular,
            Self::OtherWork => SummaryCode::Other,
        }
    }

    /// Categories whose target rows must exist before bucketing runs.
    pub fn is_required_target(self) -> bool {
        matches!(
            self,
            Self::MethodicalProcess | Self::MethodicalPublishing | Self::MethodicalBase
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodWorkRow {
    pub row_order: u32,
    pub category: MethodCategory,
    #[serde(default)]
    pub work_name: String,
    #[serde(default)]
    pub hours: Option<i32>,
    #[serde(default)]
    pub deadline: String,
    #[serde(default)]
    pub completion_note: String,
}

/// Editable methodical entry as submitted by a client; category is free text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MethodWorkDraft {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub work_name: String,
    #[serde(default)]
    pub hours: Option<i32>,
    #[serde(default)]
    pub deadline: String,
    #[serde(default)]
    pub completion_note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodWorkTable {
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub rows: Vec<MethodWorkRow>,
}

impl Default for MethodWorkTable {
    fn default() -> Self {
        Self {
            created_at: Utc::now(),
            rows: Vec::new(),
        }
    }
}
