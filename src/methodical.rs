//! Methodical-work entries: materialization from drafts and semester bucketing.
//!
//! Each entry's free-text deadline decides the semester its hours count
//! towards: September through February is the first semester, March through
//! August the second. Only planned hours are written to the summary.

use crate::summary_schema::{
    MethodCategory, MethodWorkDraft, MethodWorkRow, MethodWorkTable, SummaryCode, SummaryTable,
};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Academic semester a date falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Semester {
    First,
    Second,
}

impl Semester {
    pub fn of(date: NaiveDate) -> Self {
        match date.month() {
            9..=12 | 1 | 2 => Self::First,
            _ => Self::Second,
        }
    }
}

/// Hours accumulated per semester for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SemesterHours {
    pub first: i32,
    pub second: i32,
}

impl SemesterHours {
    fn add(&mut self, semester: Semester, hours: i32) {
        match semester {
            Semester::First => self.first = self.first.saturating_add(hours),
            Semester::Second => self.second = self.second.saturating_add(hours),
        }
    }

    pub fn year(&self) -> i32 {
        self.first.saturating_add(self.second)
    }
}

impl MethodWorkTable {
    /// Build the table from editable drafts.
    ///
    /// Drafts with no content in any field are excluded, unknown categories are
    /// skipped. Rows are ordered by category, then by input order.
    pub fn from_drafts(drafts: &[MethodWorkDraft]) -> Self {
        let mut resolved: Vec<(MethodCategory, &MethodWorkDraft)> = Vec::new();
        for draft in drafts {
            if is_blank_draft(draft) {
                continue;
            }
            match MethodCategory::from_label(&draft.category) {
                Some(category) => resolved.push((category, draft)),
                None => warn!("Skipping methodical entry with unknown category '{}'", draft.category),
            }
        }

        // Stable sort keeps input order within a category.
        resolved.sort_by_key(|(category, _)| MethodCategory::ALL.iter().position(|c| c == category));

        let rows = resolved
            .into_iter()
            .zip(0u32..)
            .map(|((category, draft), row_order)| MethodWorkRow {
                row_order,
                category,
                work_name: draft.work_name.trim().to_string(),
                hours: draft.hours,
                deadline: draft.deadline.trim().to_string(),
                completion_note: draft.completion_note.trim().to_string(),
            })
            .collect();

        Self {
            rows,
            ..Default::default()
        }
    }
}

fn is_blank_draft(draft: &MethodWorkDraft) -> bool {
    draft.work_name.trim().is_empty()
        && draft.hours.is_none()
        && draft.deadline.trim().is_empty()
        && draft.completion_note.trim().is_empty()
}

/// Sum each category's hours into semester buckets by deadline.
pub fn bucket_by_semester(methodical: &MethodWorkTable) -> HashMap<MethodCategory, SemesterHours> {
    let mut totals: HashMap<MethodCategory, SemesterHours> = MethodCategory::ALL
        .into_iter()
        .map(|c| (c, SemesterHours::default()))
        .collect();

    for row in &methodical.rows {
        let hours = match row.hours {
            Some(h) if h != 0 => h,
            _ => continue,
        };
        let Some(date) = parse_deadline(&row.deadline) else {
            debug!(
                "Methodical entry '{}': deadline '{}' not a date, not counted",
                row.work_name, row.deadline
            );
            continue;
        };
        if let Some(bucket) = totals.get_mut(&row.category) {
            bucket.add(Semester::of(date), hours);
        }
    }

    totals
}

/// Write semester buckets into the planned fields of each category's summary row.
///
/// Rows "2.1", "2.2" and "2.3" must all exist, otherwise nothing is written.
/// Other targets are written when present. Actual-hours fields are untouched.
pub fn apply_methodical_summary(summary: &mut SummaryTable, methodical: &MethodWorkTable) {
    if summary.rows.is_empty() {
        return;
    }

    let missing: Vec<&str> = MethodCategory::ALL
        .into_iter()
        .filter(|c| c.is_required_target())
        .map(MethodCategory::target_code)
        .filter(|code| summary.row(*code).is_none())
        .map(SummaryCode::as_str)
        .collect();
    if !missing.is_empty() {
        warn!("Summary lacks methodical rows {:?}, methodical totals not written", missing);
        return;
    }

    let totals = bucket_by_semester(methodical);
    for category in MethodCategory::ALL {
        let bucket = totals.get(&category).copied().unwrap_or_default();
        let Some(row) = summary.row_mut(category.target_code()) else {
            debug!("Summary has no row {:?}, skipping", category.target_code());
            continue;
        };
        row.values.sem1_plan = bucket.first;
        row.values.sem2_plan = bucket.second;
        row.values.year_plan = bucket.year();
    }
}

/// Parse a free-text deadline.
///
/// Localized forms are tried first (`15.10.2024`, `15.10.24`, `15/10/2024`,
/// `15 октября 2024 г.`, `октябрь 2024`), then generic ones (`2024-10-15`,
/// `10/25/2024`). A trailing time of day is ignored.
pub fn parse_deadline(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    parse_numeric_dmy(text)
        .or_else(|| parse_month_name(text))
        .or_else(|| parse_generic(text))
}

fn numeric_dmy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{1,2})[./\-](\d{1,2})[./\-](\d{4}|\d{2})(?:\s|$)").expect("valid regex")
    })
}

fn month_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(\d{1,2})\s+)?([а-яё]+)\.?\s+(\d{4})").expect("valid regex")
    })
}

fn parse_numeric_dmy(text: &str) -> Option<NaiveDate> {
    let caps = numeric_dmy_re().captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year = expand_year(&caps[3])?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_month_name(text: &str) -> Option<NaiveDate> {
    let lower = text.to_lowercase();
    let caps = month_name_re().captures(&lower)?;
    let day: u32 = match caps.get(1) {
        Some(d) => d.as_str().parse().ok()?,
        None => 1,
    };
    let month = russian_month(&caps[2])?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_generic(text: &str) -> Option<NaiveDate> {
    let date_part = text.split_whitespace().next()?;
    let date_part = date_part.split('T').next()?;
    ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

fn expand_year(digits: &str) -> Option<i32> {
    let year: i32 = digits.parse().ok()?;
    Some(if digits.len() == 2 { 2000 + year } else { year })
}

/// Month number from a Russian month name in any grammatical case.
fn russian_month(word: &str) -> Option<u32> {
    const STEMS: [(&str, u32); 13] = [
        ("янв", 1),
        ("фев", 2),
        ("мар", 3),
        ("апр", 4),
        ("май", 5),
        ("мая", 5),
        ("июн", 6),
        ("июл", 7),
        ("авг", 8),
        ("сен", 9),
        ("окт", 10),
        ("ноя", 11),
        ("дек", 12),
    ];
    STEMS
        .iter()
        .find(|(stem, _)| word.starts_with(stem))
        .map(|(_, month)| *month)
}
