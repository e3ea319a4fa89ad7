// ==========================================
// 内容同步系统 - 对账器实现
// ==========================================
// 依据: Sync_Engine_Specs_v0.4.md - 阶段 7: 对账
// 职责: 映射记录 vs 现有行 → 增 / 改 / 删 / 跳过
// ==========================================

use crate::config::table_config::TableConfig;
use crate::domain::record::{ExistingRow, MappedRecord};
use crate::domain::types::SyncOperation;
use crate::importer::sync_engine_trait::{ReconcileOutcome, Reconciler};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

pub struct DiffReconciler;

impl Reconciler for DiffReconciler {
    fn reconcile(
        &self,
        records: &[MappedRecord],
        existing: &HashMap<String, ExistingRow>,
        config: &TableConfig,
    ) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();
        let mut seen_keys: HashSet<&str> = HashSet::new();

        for (idx, record) in records.iter().enumerate() {
            seen_keys.insert(record.external_key.as_str());

            match existing.get(&record.external_key) {
                None => {
                    if config.operation_enabled(SyncOperation::Insert) {
                        outcome.inserts.push(idx);
                    }
                }
                Some(row) => {
                    if columns_differ(&record.columns, &row.columns) {
                        if config.operation_enabled(SyncOperation::Update) {
                            outcome.updates.push((idx, row.uid));
                        } else {
                            outcome.unchanged.push((idx, row.uid));
                        }
                    } else {
                        outcome.unchanged.push((idx, row.uid));
                    }
                }
            }
        }

        // 现有行中存在、本批缺席 → 删除
        if config.operation_enabled(SyncOperation::Delete) {
            for (key, row) in existing {
                if !seen_keys.contains(key.as_str()) {
                    outcome.deletes.push(row.uid);
                }
            }
            outcome.deletes.sort_unstable();
        }

        outcome
    }
}

/// 映射列与现有列是否有差异（仅比较映射产出的列）
fn columns_differ(mapped: &HashMap<String, Value>, existing: &HashMap<String, Value>) -> bool {
    mapped.iter().any(|(column, value)| {
        let current = existing.get(column).unwrap_or(&Value::Null);
        !values_equal(value, current)
    })
}

/// 跨存储形态的值比较
///
/// SQLite 无布尔类型（以 0/1 落库）、整数/浮点互通，
/// 逐字节比较会造成永久性的伪更新
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Bool(x), Value::Number(n)) | (Value::Number(n), Value::Bool(x)) => {
            n.as_i64() == Some(if *x { 1 } else { 0 })
        }
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(i), Some(j)) => i == j,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::String(x), Value::String(y)) => x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(disabled: &[&str]) -> TableConfig {
        serde_json::from_value(json!({
            "table": "articles",
            "source": { "kind": "csv", "path": "unused.csv" },
            "external_key": "ext_id",
            "disabled_operations": disabled,
            "fields": [
                { "source": "id", "column": "ext_id", "required": true },
                { "source": "title", "column": "title" }
            ]
        }))
        .unwrap()
    }

    fn record(row: usize, key: &str, title: &str) -> MappedRecord {
        MappedRecord {
            row_number: row,
            external_key: key.to_string(),
            columns: [
                ("ext_id".to_string(), json!(key)),
                ("title".to_string(), json!(title)),
            ]
            .into_iter()
            .collect(),
            children: HashMap::new(),
        }
    }

    fn existing_row(uid: i64, key: &str, title: &str) -> (String, ExistingRow) {
        (
            key.to_string(),
            ExistingRow {
                uid,
                columns: [
                    ("ext_id".to_string(), json!(key)),
                    ("title".to_string(), json!(title)),
                ]
                .into_iter()
                .collect(),
            },
        )
    }

    #[test]
    fn test_insert_update_skip_delete_partition() {
        let reconciler = DiffReconciler;
        let records = vec![
            record(1, "A1", "改过的标题"),
            record(2, "A2", "原标题"),
            record(3, "A3", "新记录"),
        ];
        let existing: HashMap<String, ExistingRow> = [
            existing_row(11, "A1", "旧标题"),
            existing_row(12, "A2", "原标题"),
            existing_row(13, "A9", "已下线"),
        ]
        .into_iter()
        .collect();

        let outcome = reconciler.reconcile(&records, &existing, &config(&[]));
        assert_eq!(outcome.inserts, vec![2]);
        assert_eq!(outcome.updates, vec![(0, 11)]);
        assert_eq!(outcome.unchanged, vec![(1, 12)]);
        assert_eq!(outcome.deletes, vec![13]);
    }

    #[test]
    fn test_delete_disabled_keeps_absent_rows() {
        let reconciler = DiffReconciler;
        let records = vec![record(1, "A1", "标题")];
        let existing: HashMap<String, ExistingRow> =
            [existing_row(11, "A1", "标题"), existing_row(13, "A9", "孤儿")]
                .into_iter()
                .collect();

        let outcome = reconciler.reconcile(&records, &existing, &config(&["delete"]));
        assert!(outcome.deletes.is_empty());
    }

    #[test]
    fn test_update_disabled_treats_changed_as_unchanged() {
        let reconciler = DiffReconciler;
        let records = vec![record(1, "A1", "新标题")];
        let existing: HashMap<String, ExistingRow> =
            [existing_row(11, "A1", "旧标题")].into_iter().collect();

        let outcome = reconciler.reconcile(&records, &existing, &config(&["update"]));
        assert!(outcome.updates.is_empty());
        assert_eq!(outcome.unchanged, vec![(0, 11)]);
    }

    #[test]
    fn test_values_equal_across_storage_forms() {
        assert!(values_equal(&json!(true), &json!(1)));
        assert!(values_equal(&json!(false), &json!(0)));
        assert!(values_equal(&json!(4), &json!(4)));
        assert!(values_equal(&json!(4.0), &json!(4)));
        assert!(!values_equal(&json!("4"), &json!(4)));
        assert!(values_equal(&Value::Null, &Value::Null));
    }
}
