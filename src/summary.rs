//! Organization-wide summary table aggregation.

use crate::schema::{PeriodTotals, PlanTable};
use crate::summary_schema::{SummaryCode, SummaryTable, SummaryValues};
use tracing::{debug, warn};

/// Reuse `existing` (or start from the fixed skeleton), write the teaching-work
/// row from the tables flagged for inclusion, then recompute the total row.
///
/// Only the teaching row ("1") and the total row are written; every other row
/// keeps whatever values it already had.
pub fn create_or_update(existing: Option<SummaryTable>, tables: &[PlanTable]) -> SummaryTable {
    let mut summary = existing.unwrap_or_else(SummaryTable::skeleton);
    if summary.rows.is_empty() {
        summary.rows = SummaryTable::skeleton().rows;
    }

    let teaching = teaching_totals(tables.iter().filter(|t| t.include_in_summary));
    match summary.row_mut(SummaryCode::Teaching) {
        Some(row) => row.values = teaching,
        None => warn!("Summary has no teaching row (code \"1\"), teaching totals not written"),
    }

    recalculate_total_row(&mut summary);
    summary
}

/// Column-wise sum of table totals, absent values counted as zero.
fn teaching_totals<'a>(tables: impl Iterator<Item = &'a PlanTable>) -> SummaryValues {
    let mut sum = SummaryValues::default();
    for table in tables {
        debug!("Teaching work includes '{}'", table.sheet_name);
        sum.add(&values_from_totals(&table.totals));
    }
    sum
}

fn values_from_totals(totals: &PeriodTotals) -> SummaryValues {
    SummaryValues {
        sem1_plan: totals.sem1_plan.unwrap_or(0),
        sem1_fact: totals.sem1_fact.unwrap_or(0),
        sem2_plan: totals.sem2_plan.unwrap_or(0),
        sem2_fact: totals.sem2_fact.unwrap_or(0),
        year_plan: totals.year_plan.unwrap_or(0),
        year_fact: totals.year_fact.unwrap_or(0),
    }
}

/// Total row := column-wise sum of every other row.
pub fn recalculate_total_row(summary: &mut SummaryTable) {
    let mut sum = SummaryValues::default();
    for row in summary.rows.iter().filter(|r| !r.is_total_row) {
        sum.add(&row.values);
    }

    match summary.rows.iter_mut().find(|r| r.is_total_row) {
        Some(total) => total.values = sum,
        None => warn!("Summary has no total row, total not recalculated"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(name: &str, include: bool, totals: PeriodTotals) -> PlanTable {
        let mut table = PlanTable::new(name, None);
        table.include_in_summary = include;
        table.totals = totals;
        table
    }

    fn sample_tables() -> Vec<PlanTable> {
        vec![
            table(
                "Table 1",
                false,
                PeriodTotals {
                    year_plan: Some(1000),
                    ..Default::default()
                },
            ),
            table(
                "Table 2",
                true,
                PeriodTotals {
                    sem1_plan: Some(200),
                    sem1_fact: Some(190),
                    sem2_plan: Some(194),
                    year_plan: Some(394),
                    ..Default::default()
                },
            ),
            table(
                "Table 3",
                true,
                PeriodTotals {
                    sem1_plan: Some(201),
                    sem2_plan: Some(200),
                    year_plan: Some(401),
                    year_fact: None,
                    ..Default::default()
                },
            ),
        ]
    }

    #[test]
    fn test_teaching_row_sums_included_tables_only() {
        let summary = create_or_update(None, &sample_tables());
        let teaching = summary.row(SummaryCode::Teaching).unwrap();
        assert_eq!(teaching.values.sem1_plan, 401);
        assert_eq!(teaching.values.sem1_fact, 190);
        assert_eq!(teaching.values.sem2_plan, 394);
        assert_eq!(teaching.values.year_plan, 795);
        assert_eq!(teaching.values.year_fact, 0);
    }

    #[test]
    fn test_total_row_sums_other_rows() {
        let mut existing = SummaryTable::skeleton();
        existing.row_mut(SummaryCode::Research).unwrap().values.year_fact = 40;
        existing.row_mut(SummaryCode::MethodicalBase).unwrap().values.sem1_plan = 9;
        existing.row_mut(SummaryCode::Total).unwrap().values.year_plan = 77_777;

        let summary = create_or_update(Some(existing), &sample_tables());
        let total = summary.row(SummaryCode::Total).unwrap();
        assert_eq!(total.values.year_fact, 40);
        assert_eq!(total.values.sem1_plan, 410);
        assert_eq!(total.values.year_plan, 795);
    }

    #[test]
    fn test_unmanaged_rows_survive_and_identity_is_stable() {
        let mut existing = SummaryTable::skeleton();
        existing.row_mut(SummaryCode::Qualification).unwrap().values.sem2_fact = 12;
        existing.row_mut(SummaryCode::Qualification).unwrap().work_name = "Курсы".to_string();

        let first = create_or_update(Some(existing), &sample_tables());
        let second = create_or_update(Some(first.clone()), &sample_tables());

        assert_eq!(first, second);
        assert_eq!(second.rows.len(), 12);
        let codes: Vec<SummaryCode> = second.rows.iter().map(|r| r.code).collect();
        assert_eq!(codes, SummaryCode::ALL.to_vec());
        let qualification = second.row(SummaryCode::Qualification).unwrap();
        assert_eq!(qualification.values.sem2_fact, 12);
        assert_eq!(qualification.work_name, "Курсы");
    }

    #[test]
    fn test_empty_existing_gets_skeleton() {
        let mut existing = SummaryTable::skeleton();
        existing.rows.clear();
        let summary = create_or_update(Some(existing), &[]);
        assert_eq!(summary.rows.len(), 12);
        assert!(summary.rows.iter().all(|r| r.values == SummaryValues::default()));
    }

    #[test]
    fn test_missing_teaching_row_still_totals() {
        let mut existing = SummaryTable::skeleton();
        existing.rows.retain(|r| r.code != SummaryCode::Teaching);
        existing.row_mut(SummaryCode::Other).unwrap().values.sem1_fact = 3;

        let summary = create_or_update(Some(existing), &sample_tables());
        assert_eq!(summary.rows.len(), 11);
        assert_eq!(summary.row(SummaryCode::Total).unwrap().values.sem1_fact, 3);
        assert_eq!(summary.row(SummaryCode::Total).unwrap().values.year_plan, 0);
    }
}
