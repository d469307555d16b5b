//! Per-table totals recalculation.
//!
//! Both passes are idempotent. Every summary row of a table shows the table's
//! grand total regardless of the period it is labelled with; this matches the
//! spreadsheet convention the plans are kept in.

use crate::schema::{PlanTable, TotalKind};
use tracing::debug;

/// Recompute row totals, then the table's six period totals.
pub fn recalculate_table(table: &mut PlanTable) {
    recalculate_row_totals(table);
    recalculate_period_totals(table);
}

/// Discipline rows: sum of their hours. Summary rows: sum of discipline totals.
pub fn recalculate_row_totals(table: &mut PlanTable) {
    let mut grand_total = 0i32;
    for row in table.rows.iter_mut().filter(|r| !r.is_summary) {
        let total = row.hours.sum();
        row.total = Some(total);
        grand_total = grand_total.saturating_add(total);
    }

    for row in table.rows.iter_mut().filter(|r| r.is_summary) {
        row.total = Some(grand_total);
    }

    debug!(
        "Table '{}': grand total {} over {} row(s)",
        table.sheet_name,
        grand_total,
        table.rows.len()
    );
}

/// Set each period total from the first summary row tagged with that kind;
/// kinds without a row become unset.
pub fn recalculate_period_totals(table: &mut PlanTable) {
    for kind in TotalKind::ALL {
        let value = table
            .summary_rows()
            .find(|r| r.total_kind == Some(kind))
            .and_then(|r| r.total);
        table.totals.set(kind, value);
    }
}
