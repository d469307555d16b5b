//! Literal labels of the workload-plan spreadsheet layout and case-insensitive matching.
//!
//! All label comparisons go through the helpers below, which lowercase both
//! sides with full Unicode rules so Cyrillic labels match regardless of case.

/// Marker in the number column that identifies the header row.
pub const HEADER_MARKER: &str = "№ п.п.";

/// Substring in the name column that identifies the semester-title row.
pub const SEMESTER_MARKER: &str = "семестр";

/// Header prefixes of the embedded total rows.
pub const SEMESTER1_TOTAL: &str = "Итого за 1 семестр";
pub const SEMESTER2_TOTAL: &str = "Итого за 2 семестр";
pub const YEAR_TOTAL: &str = "Итого за год";

/// Kind cell of a total row: planned ("assigned") or actual ("completed") hours.
pub const PLANNED: &str = "Поручено";
pub const ACTUAL: &str = "Выполнено";

/// Name of the reusable draft plan.
pub const DRAFT_PLAN_NAME: &str = "Черновик";

/// Case-insensitive equality on trimmed text.
pub fn eq_ignore_case(text: &str, label: &str) -> bool {
    text.trim().to_lowercase() == label.to_lowercase()
}

/// Case-insensitive prefix match on trimmed text.
pub fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.trim()
        .to_lowercase()
        .starts_with(&prefix.to_lowercase())
}

/// Case-insensitive substring match.
pub fn contains_ignore_case(text: &str, needle: &str) -> bool {
    text.to_lowercase().contains(&needle.to_lowercase())
}

/// True when the cell text is one of the two total-row kinds.
pub fn is_plan_or_fact(text: &str) -> bool {
    eq_ignore_case(text, PLANNED) || eq_ignore_case(text, ACTUAL)
}

/// Russian display name for a sheet: "Table 2" becomes "Таблица 2".
pub fn localized_sheet_name(sheet_name: &str) -> String {
    match sheet_name.get(..5) {
        Some(head) if head.eq_ignore_ascii_case("table") => {
            format!("Таблица{}", &sheet_name[5..])
        }
        _ => sheet_name.to_string(),
    }
}
