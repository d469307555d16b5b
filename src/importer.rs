//! Plan import and recalculation pipeline.
//!
//! workbook bytes → sheet parser → per-table totals → methodical buckets →
//! summary table.

use crate::config::AppConfig;
use crate::methodical::apply_methodical_summary;
use crate::schema::{Plan, PlanTable};
use crate::sheet_parser;
use crate::summary;
use crate::summary_schema::SummaryTable;
use crate::totals::recalculate_table;
use anyhow::Result;
use sha2::{Digest, Sha256};
use tracing::info;

/// Parse a workbook into recalculated tables with default summary flags.
pub fn import_tables(filename: &str, data: &[u8], config: &AppConfig) -> Result<Vec<PlanTable>> {
    let mut tables = sheet_parser::parse_file(filename, data, &config.sheet_prefix)?;
    for table in &mut tables {
        table.include_in_summary = config.is_teaching_sheet(&table.sheet_name);
        recalculate_table(table);
    }
    Ok(tables)
}

/// Build a new plan from an uploaded workbook.
pub fn build_plan(name: &str, filename: &str, data: &[u8], config: &AppConfig) -> Result<Plan> {
    let mut plan = Plan::new(name);
    load_workbook(&mut plan, filename, data, config)?;
    Ok(plan)
}

/// Replace a plan's tables with a freshly imported workbook and recalculate.
///
/// The summary and methodical work are kept, so hand-edited summary rows
/// survive a re-import.
pub fn load_workbook(plan: &mut Plan, filename: &str, data: &[u8], config: &AppConfig) -> Result<()> {
    let tables = import_tables(filename, data, config)?;

    plan.content_hash = Some(content_hash(data));
    plan.source_file = Some(filename.to_string());
    plan.tables = tables;

    recalculate_plan(plan);
    info!(
        "Plan '{}' loaded {} table(s) from {}",
        plan.name,
        plan.tables.len(),
        filename
    );
    Ok(())
}

/// Hex SHA-256 of uploaded workbook bytes.
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Run every aggregation pass over a plan. Idempotent.
pub fn recalculate_plan(plan: &mut Plan) {
    for table in &mut plan.tables {
        for row in &mut table.rows {
            row.tag_total_kind();
        }
        recalculate_table(table);
    }

    let mut summary = match plan.summary.take() {
        Some(existing) if !existing.rows.is_empty() => existing,
        _ => SummaryTable::skeleton(),
    };
    apply_methodical_summary(&mut summary, &plan.methodical);
    plan.summary = Some(summary::create_or_update(Some(summary), &plan.tables));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Hours, Measure, PlanRow, TotalKind, TotalPeriod};
    use crate::summary_schema::{MethodCategory, MethodWorkRow, SummaryCode};

    fn teaching_table(name: &str, include: bool, lectures: i32) -> PlanTable {
        let mut table = PlanTable::new(name, Some("1 семестр".to_string()));
        table.include_in_summary = include;
        table.rows = vec![
            PlanRow {
                row_order: 0,
                number: Some(1),
                discipline_name: "Математика".to_string(),
                hours: Hours {
                    lectures: Some(lectures),
                    practicals: Some(5),
                    ..Default::default()
                },
                ..Default::default()
            },
            // Kind left untagged, as a row edited by a client would arrive
            PlanRow {
                row_order: 1,
                discipline_name: "Итого за год:".to_string(),
                faculty_group: "Поручено".to_string(),
                is_summary: true,
                ..Default::default()
            },
            PlanRow {
                row_order: 2,
                discipline_name: "Итого за 1 семестр:".to_string(),
                faculty_group: "Выполнено".to_string(),
                is_summary: true,
                total_kind: Some(TotalKind::new(TotalPeriod::Semester1, Measure::Actual)),
                ..Default::default()
            },
        ];
        table
    }

    fn sample_plan() -> Plan {
        let mut plan = Plan::new("Тест");
        plan.tables = vec![
            teaching_table("Table 1", false, 100),
            teaching_table("Table 2", true, 10),
            teaching_table("Table 3", true, 20),
        ];
        plan.methodical.rows = vec![MethodWorkRow {
            row_order: 0,
            category: MethodCategory::MethodicalBase,
            work_name: "Стенд".to_string(),
            hours: Some(12),
            deadline: "10.03.2025".to_string(),
            completion_note: String::new(),
        }];
        plan
    }

    #[test]
    fn test_recalculate_plan_end_to_end() {
        let mut plan = sample_plan();
        recalculate_plan(&mut plan);

        let table2 = &plan.tables[1];
        assert_eq!(table2.rows[0].total, Some(15));
        assert_eq!(table2.rows[1].total, Some(15));
        assert_eq!(
            table2.rows[1].total_kind,
            Some(TotalKind::new(TotalPeriod::Year, Measure::Planned))
        );
        assert_eq!(table2.totals.year_plan, Some(15));
        assert_eq!(table2.totals.sem1_fact, Some(15));

        let summary = plan.summary.as_ref().unwrap();
        let teaching = summary.row(SummaryCode::Teaching).unwrap();
        assert_eq!(teaching.values.year_plan, 15 + 25);
        assert_eq!(teaching.values.sem1_fact, 15 + 25);

        let base = summary.row(SummaryCode::MethodicalBase).unwrap();
        assert_eq!(base.values.sem2_plan, 12);
        assert_eq!(base.values.year_plan, 12);

        let total = summary.row(SummaryCode::Total).unwrap();
        assert_eq!(total.values.year_plan, 40 + 12);
        assert_eq!(total.values.sem2_plan, 12);
    }

    #[test]
    fn test_recalculate_plan_is_idempotent() {
        let mut plan = sample_plan();
        plan.summary = Some(SummaryTable {
            rows: Vec::new(),
            ..SummaryTable::skeleton()
        });
        recalculate_plan(&mut plan);
        let first = plan.summary.clone();
        let first_tables: Vec<_> = plan.tables.iter().map(|t| (t.totals, t.rows.clone())).collect();

        recalculate_plan(&mut plan);
        let second_tables: Vec<_> = plan.tables.iter().map(|t| (t.totals, t.rows.clone())).collect();
        assert_eq!(plan.summary, first);
        assert_eq!(second_tables, first_tables);
    }

    #[test]
    fn test_content_hash() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_import_rejects_unsupported_file() {
        let result = import_tables("plan.docx", b"whatever", &AppConfig::default());
        assert!(result.is_err());
    }
}
