//! In-memory plan store backed by `RwLock`.
//!
//! Plans own their tables, summary and methodical rows by value, so deleting
//! a plan drops everything it owns. Every mutation goes through [`PlanStore::update`],
//! which recalculates the plan and refreshes `updated_at` before storing it.

use crate::importer::recalculate_plan;
use crate::labels::{self, DRAFT_PLAN_NAME};
use crate::schema::{Plan, PlanRow, PlanTable};
use crate::summary_schema::{MethodWorkDraft, MethodWorkTable, SummaryCode, SummaryValues};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("plan not found: {0}")]
    PlanNotFound(String),
    #[error("table {index} not found in plan {plan_id}")]
    TableNotFound { plan_id: String, index: usize },
    #[error("summary row \"{0}\" not found")]
    SummaryRowNotFound(String),
    #[error("summary row \"{0}\" is calculated and cannot be edited")]
    ManagedSummaryRow(String),
}

impl StoreError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::PlanNotFound(_) | Self::TableNotFound { .. } | Self::SummaryRowNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::ManagedSummaryRow(_) => StatusCode::CONFLICT,
        }
    }
}

/// Listing entry for a stored plan.
#[derive(Debug, Clone, Serialize)]
pub struct PlanInfo {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub table_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PlanStore {
    plans: Arc<RwLock<HashMap<String, Plan>>>,
}

impl PlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recalculate and store a new plan.
    pub fn insert(&self, mut plan: Plan) -> Plan {
        recalculate_plan(&mut plan);
        info!("Storing plan {} ('{}')", plan.id, plan.name);
        self.plans
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(plan.id.clone(), plan.clone());
        plan
    }

    pub fn get(&self, id: &str) -> Option<Plan> {
        self.plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// All plans, most recently updated first.
    pub fn list(&self) -> Vec<PlanInfo> {
        let plans = self.plans.read().unwrap_or_else(PoisonError::into_inner);
        let mut infos: Vec<PlanInfo> = plans
            .values()
            .map(|p| PlanInfo {
                id: p.id.clone(),
                name: p.name.clone(),
                created_at: p.created_at,
                updated_at: p.updated_at,
                table_count: p.tables.len(),
            })
            .collect();
        infos.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        infos
    }

    /// Apply `edit` to a plan, then recalculate and refresh `updated_at`.
    /// A failed edit leaves the stored plan unchanged.
    pub fn update<F>(&self, id: &str, edit: F) -> Result<Plan, StoreError>
    where
        F: FnOnce(&mut Plan) -> Result<(), StoreError>,
    {
        let mut plans = self.plans.write().unwrap_or_else(PoisonError::into_inner);
        let stored = plans
            .get_mut(id)
            .ok_or_else(|| StoreError::PlanNotFound(id.to_string()))?;
        apply_edit(stored, edit)
    }

    /// Remove a plan with everything it owns. Returns true if it existed.
    pub fn delete(&self, id: &str) -> bool {
        let removed = self
            .plans
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some();
        if removed {
            info!("Deleted plan {}", id);
        }
        removed
    }

    /// Store a deep copy of a plan under a new id ("save as new plan").
    pub fn copy_as_new(&self, id: &str, name: Option<&str>) -> Result<Plan, StoreError> {
        let source = self
            .get(id)
            .ok_or_else(|| StoreError::PlanNotFound(id.to_string()))?;
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} (копия)", source.name));
        // Only one plan may carry the draft name.
        let name = if labels::eq_ignore_case(&name, DRAFT_PLAN_NAME) {
            format!("{} (копия)", DRAFT_PLAN_NAME)
        } else {
            name
        };
        Ok(self.insert(source.duplicate(name)))
    }

    pub fn set_table_include(&self, id: &str, index: usize, include: bool) -> Result<Plan, StoreError> {
        self.update(id, |plan| {
            table_mut(plan, index)?.include_in_summary = include;
            Ok(())
        })
    }

    /// Replace a table's rows with edited ones. Summary rows without a kind
    /// are tagged from their labels during recalculation.
    pub fn replace_table_rows(&self, id: &str, index: usize, mut rows: Vec<PlanRow>) -> Result<Plan, StoreError> {
        for (order, row) in rows.iter_mut().enumerate() {
            row.row_order = order as u32;
        }
        self.update(id, |plan| {
            table_mut(plan, index)?.rows = rows;
            Ok(())
        })
    }

    /// Overwrite the values of an editable summary row.
    pub fn update_summary_row(&self, id: &str, code: SummaryCode, values: SummaryValues) -> Result<Plan, StoreError> {
        if code.is_managed() {
            return Err(StoreError::ManagedSummaryRow(code.as_str().to_string()));
        }
        self.update(id, |plan| {
            let row = plan
                .summary
                .as_mut()
                .and_then(|s| s.row_mut(code))
                .ok_or_else(|| StoreError::SummaryRowNotFound(code.as_str().to_string()))?;
            row.values = values;
            Ok(())
        })
    }

    /// Materialize drafts as the plan's methodical work.
    pub fn replace_methodical(&self, id: &str, drafts: &[MethodWorkDraft]) -> Result<Plan, StoreError> {
        let methodical = MethodWorkTable::from_drafts(drafts);
        self.update(id, |plan| {
            plan.methodical = methodical;
            Ok(())
        })
    }

    /// Replace the draft plan's tables with freshly imported ones.
    pub fn replace_draft_tables(&self, tables: Vec<PlanTable>, source_file: &str, content_hash: String) -> Result<Plan, StoreError> {
        let mut plans = self.plans.write().unwrap_or_else(PoisonError::into_inner);
        let id = draft_id(&mut plans);
        let draft = plans
            .get_mut(&id)
            .ok_or_else(|| StoreError::PlanNotFound(id.clone()))?;
        apply_edit(draft, |plan| {
            plan.tables = tables;
            plan.source_file = Some(source_file.to_string());
            plan.content_hash = Some(content_hash);
            Ok(())
        })
    }

    /// Id of the single draft plan, creating it on first use.
    pub fn ensure_draft(&self) -> String {
        let mut plans = self.plans.write().unwrap_or_else(PoisonError::into_inner);
        draft_id(&mut plans)
    }
}

/// Edit a copy of `stored`, recalculate it and write it back on success.
fn apply_edit<F>(stored: &mut Plan, edit: F) -> Result<Plan, StoreError>
where
    F: FnOnce(&mut Plan) -> Result<(), StoreError>,
{
    let mut plan = stored.clone();
    edit(&mut plan)?;
    recalculate_plan(&mut plan);
    plan.updated_at = Utc::now();
    *stored = plan.clone();
    Ok(plan)
}

/// Find or create the draft plan. Caller holds the write guard.
fn draft_id(plans: &mut HashMap<String, Plan>) -> String {
    if let Some(draft) = plans.values().find(|p| p.name == DRAFT_PLAN_NAME) {
        return draft.id.clone();
    }

    let mut draft = Plan::new(DRAFT_PLAN_NAME);
    recalculate_plan(&mut draft);
    let id = draft.id.clone();
    info!("Created draft plan {}", id);
    plans.insert(id.clone(), draft);
    id
}

fn table_mut(plan: &mut Plan, index: usize) -> Result<&mut PlanTable, StoreError> {
    let plan_id = plan.id.clone();
    plan.tables
        .get_mut(index)
        .ok_or(StoreError::TableNotFound { plan_id, index })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Hours;

    fn plan_with_table(name: &str) -> Plan {
        let mut plan = Plan::new(name);
        let mut table = PlanTable::new("Table 2", None);
        table.include_in_summary = true;
        table.rows.push(PlanRow {
            discipline_name: "Физика".to_string(),
            hours: Hours {
                labs: Some(12),
                ..Default::default()
            },
            ..Default::default()
        });
        table.rows.push(PlanRow {
            row_order: 1,
            discipline_name: "Итого за год:".to_string(),
            faculty_group: "Поручено".to_string(),
            is_summary: true,
            ..Default::default()
        });
        plan.tables.push(table);
        plan
    }

    #[test]
    fn test_insert_recalculates() {
        let store = PlanStore::new();
        let plan = store.insert(plan_with_table("Весна"));
        let stored = store.get(&plan.id).unwrap();
        assert_eq!(stored.tables[0].totals.year_plan, Some(12));
        let summary = stored.summary.unwrap();
        assert_eq!(summary.row(SummaryCode::Teaching).unwrap().values.year_plan, 12);
    }

    #[test]
    fn test_update_refreshes_timestamp_and_recalculates() {
        let store = PlanStore::new();
        let plan = store.insert(plan_with_table("Весна"));

        let updated = store
            .update(&plan.id, |p| {
                p.tables[0].rows[0].hours.lectures = Some(8);
                Ok(())
            })
            .unwrap();

        assert!(updated.updated_at >= plan.updated_at);
        assert_eq!(updated.created_at, plan.created_at);
        assert_eq!(updated.tables[0].totals.year_plan, Some(20));
        assert_eq!(store.get(&plan.id).unwrap().tables[0].rows[0].total, Some(20));
    }

    #[test]
    fn test_failed_update_leaves_plan_unchanged() {
        let store = PlanStore::new();
        let plan = store.insert(plan_with_table("Весна"));

        let result = store.update(&plan.id, |p| {
            p.name = "Изменено".to_string();
            Err(StoreError::ManagedSummaryRow("1".to_string()))
        });

        assert!(matches!(result, Err(StoreError::ManagedSummaryRow(_))));
        assert_eq!(store.get(&plan.id).unwrap().name, "Весна");
    }

    #[test]
    fn test_update_unknown_plan() {
        let store = PlanStore::new();
        let err = store.update("plan_missing", |_| Ok(())).unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_delete_and_list() {
        let store = PlanStore::new();
        let a = store.insert(plan_with_table("А"));
        let b = store.insert(plan_with_table("Б"));
        store.update(&a.id, |_| Ok(())).unwrap();

        let listed = store.list();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].updated_at >= listed[1].updated_at);
        assert_eq!(listed[0].table_count, 1);

        assert!(store.delete(&b.id));
        assert!(!store.delete(&b.id));
        assert!(store.get(&b.id).is_none());
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_copy_as_new() {
        let store = PlanStore::new();
        let plan = store.insert(plan_with_table("Осень"));

        let copy = store.copy_as_new(&plan.id, None).unwrap();
        assert_ne!(copy.id, plan.id);
        assert_eq!(copy.name, "Осень (копия)");
        assert_eq!(copy.tables.len(), 1);

        let named = store.copy_as_new(&plan.id, Some("  План 2025 ")).unwrap();
        assert_eq!(named.name, "План 2025");
        assert_eq!(store.list().len(), 3);

        assert!(store.copy_as_new("plan_missing", None).is_err());
    }

    #[test]
    fn test_ensure_draft_is_reused() {
        let store = PlanStore::new();
        let first = store.ensure_draft();
        let second = store.ensure_draft();
        assert_eq!(first, second);
        let draft = store.get(&first).unwrap();
        assert_eq!(draft.name, DRAFT_PLAN_NAME);
        assert_eq!(draft.summary.unwrap().rows.len(), 12);
    }

    #[test]
    fn test_set_table_include() {
        let store = PlanStore::new();
        let plan = store.insert(plan_with_table("Весна"));

        let updated = store.set_table_include(&plan.id, 0, false).unwrap();
        assert!(!updated.tables[0].include_in_summary);
        let summary = updated.summary.unwrap();
        assert_eq!(summary.row(SummaryCode::Teaching).unwrap().values.year_plan, 0);
        assert_eq!(summary.row(SummaryCode::Total).unwrap().values.year_plan, 0);

        let err = store.set_table_include(&plan.id, 5, true).unwrap_err();
        assert!(matches!(err, StoreError::TableNotFound { index: 5, .. }));
    }

    #[test]
    fn test_replace_table_rows_tags_and_recalculates() {
        let store = PlanStore::new();
        let plan = store.insert(plan_with_table("Весна"));

        let rows = vec![
            PlanRow {
                row_order: 7,
                discipline_name: "Химия".to_string(),
                hours: Hours {
                    exams: Some(4),
                    lectures: Some(30),
                    ..Default::default()
                },
                ..Default::default()
            },
            PlanRow {
                row_order: 3,
                discipline_name: "Итого за 2 семестр:".to_string(),
                faculty_group: "Выполнено".to_string(),
                is_summary: true,
                ..Default::default()
            },
        ];
        let updated = store.replace_table_rows(&plan.id, 0, rows).unwrap();
        let table = &updated.tables[0];
        assert_eq!(table.rows[0].row_order, 0);
        assert_eq!(table.rows[1].row_order, 1);
        assert_eq!(table.rows[1].total, Some(34));
        assert_eq!(table.totals.sem2_fact, Some(34));
        assert_eq!(table.totals.year_plan, None);
    }

    #[test]
    fn test_update_summary_row() {
        let store = PlanStore::new();
        let plan = store.insert(plan_with_table("Весна"));
        let values = SummaryValues {
            year_fact: 30,
            ..Default::default()
        };

        let updated = store
            .update_summary_row(&plan.id, SummaryCode::Research, values)
            .unwrap();
        let summary = updated.summary.unwrap();
        assert_eq!(summary.row(SummaryCode::Research).unwrap().values.year_fact, 30);
        assert_eq!(summary.row(SummaryCode::Total).unwrap().values.year_fact, 30);
        assert_eq!(summary.row(SummaryCode::Total).unwrap().values.year_plan, 12);

        let err = store
            .update_summary_row(&plan.id, SummaryCode::Teaching, values)
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        let err = store
            .update_summary_row(&plan.id, SummaryCode::Total, values)
            .unwrap_err();
        assert!(matches!(err, StoreError::ManagedSummaryRow(_)));
    }

    #[test]
    fn test_replace_methodical() {
        let store = PlanStore::new();
        let plan = store.insert(plan_with_table("Весна"));
        let drafts = vec![
            MethodWorkDraft {
                category: "methodical_process".to_string(),
                work_name: "Конспект лекций".to_string(),
                hours: Some(10),
                deadline: "15.10.2024".to_string(),
                ..Default::default()
            },
            MethodWorkDraft::default(),
        ];

        let updated = store.replace_methodical(&plan.id, &drafts).unwrap();
        assert_eq!(updated.methodical.rows.len(), 1);
        let summary = updated.summary.unwrap();
        let process = summary.row(SummaryCode::MethodicalProcess).unwrap();
        assert_eq!(process.values.sem1_plan, 10);
        assert_eq!(summary.row(SummaryCode::Total).unwrap().values.year_plan, 22);
    }

    #[test]
    fn test_replace_draft_tables() {
        let store = PlanStore::new();
        let source = plan_with_table("Источник");

        let draft = store
            .replace_draft_tables(source.tables.clone(), "plan.xlsx", "abc".to_string())
            .unwrap();
        assert_eq!(draft.name, DRAFT_PLAN_NAME);
        assert_eq!(draft.source_file.as_deref(), Some("plan.xlsx"));
        assert_eq!(draft.tables[0].totals.year_plan, Some(12));

        let again = store
            .replace_draft_tables(Vec::new(), "other.xlsx", "def".to_string())
            .unwrap();
        assert_eq!(again.id, draft.id);
        assert!(again.tables.is_empty());
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_huge_values_saturate_instead_of_overflowing() {
        let store = PlanStore::new();
        let plan = store.insert(plan_with_table("Весна"));

        store
            .update_summary_row(
                &plan.id,
                SummaryCode::Research,
                SummaryValues {
                    year_fact: i32::MAX,
                    ..Default::default()
                },
            )
            .unwrap();
        let updated = store
            .update_summary_row(
                &plan.id,
                SummaryCode::Qualification,
                SummaryValues {
                    year_fact: 1,
                    ..Default::default()
                },
            )
            .unwrap();
        let summary = updated.summary.unwrap();
        assert_eq!(summary.row(SummaryCode::Total).unwrap().values.year_fact, i32::MAX);

        let draft = |hours| MethodWorkDraft {
            category: "methodical_process".to_string(),
            work_name: "Практикум".to_string(),
            hours: Some(hours),
            deadline: "15.10.2024".to_string(),
            ..Default::default()
        };
        let updated = store
            .replace_methodical(&plan.id, &[draft(i32::MAX), draft(1)])
            .unwrap();
        let summary = updated.summary.unwrap();
        let process = summary.row(SummaryCode::MethodicalProcess).unwrap();
        assert_eq!(process.values.sem1_plan, i32::MAX);
        assert_eq!(process.values.year_plan, i32::MAX);
        assert_eq!(summary.row(SummaryCode::Total).unwrap().values.year_plan, i32::MAX);
    }

    #[test]
    fn test_draft_import_after_draft_deleted() {
        let store = PlanStore::new();
        let first = store.ensure_draft();
        assert!(store.delete(&first));

        let source = plan_with_table("Источник");
        let draft = store
            .replace_draft_tables(source.tables, "plan.xlsx", "abc".to_string())
            .unwrap();
        assert_ne!(draft.id, first);
        assert_eq!(draft.name, DRAFT_PLAN_NAME);
        assert_eq!(draft.tables.len(), 1);
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_copy_never_duplicates_draft_name() {
        let store = PlanStore::new();
        let draft_id = store.ensure_draft();
        let plan = store.insert(plan_with_table("Осень"));

        let copy = store.copy_as_new(&plan.id, Some(" черновик ")).unwrap();
        assert_eq!(copy.name, "Черновик (копия)");
        let copy = store.copy_as_new(&draft_id, None).unwrap();
        assert_eq!(copy.name, "Черновик (копия)");

        let drafts = store
            .list()
            .into_iter()
            .filter(|p| p.name == DRAFT_PLAN_NAME)
            .count();
        assert_eq!(drafts, 1);
        assert_eq!(store.ensure_draft(), draft_id);
    }
}
