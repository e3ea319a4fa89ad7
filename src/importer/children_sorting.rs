// ==========================================
// 内容同步系统 - 子记录排序跟踪器
// ==========================================
// 依据: Sync_Engine_Specs_v0.4.md - 4.2 子记录排序簿记
// 职责: 在一轮导入中累积子记录的目标排序值，容忍以占位符为键，
//       落库后统一改写为最终 uid，再交由存储层刷写排序列
// 生命周期: 单次导入运行；刷写完成后 reset
// ==========================================

use crate::domain::types::{RecordId, ReplaceOutcome, TemporaryKey};
use serde_json::Value;
use std::collections::HashMap;

// ==========================================
// ChildrenSortingTracker - 子记录排序跟踪器
// ==========================================
// 不变量:
// - 每个 (表, 标识符) 至多一条排序条目（后写覆盖）
// - 排序值恒为整数
#[derive(Debug, Default)]
pub struct ChildrenSortingTracker {
    /// 表名 → (记录标识符 → {排序列名: 排序值})
    entries: HashMap<String, HashMap<RecordId, HashMap<String, i64>>>,
}

impl ChildrenSortingTracker {
    pub fn new() -> Self {
        ChildrenSortingTracker::default()
    }

    /// 记录 (table, id) 的目标排序值
    ///
    /// id 可以是占位符也可以是最终 uid；value 强制转整数
    /// （JSON 数字截断、数字字符串解析、其余 → 0）。
    /// 同键重复写入时后写覆盖: 子记录按源顺序重扫时排序值整体重算
    pub fn add_sorting_information(
        &mut self,
        table: &str,
        id: RecordId,
        sort_field: &str,
        value: &Value,
    ) {
        let mut entry = HashMap::new();
        entry.insert(sort_field.to_string(), coerce_int(value));
        self.entries
            .entry(table.to_string())
            .or_default()
            .insert(id, entry);
    }

    /// 是否存在至少一条排序条目
    ///
    /// 无子记录时据此跳过整个排序刷写阶段
    pub fn has_sorting_information(&self) -> bool {
        self.entries.values().any(|entries| !entries.is_empty())
    }

    /// 将 (table, old_id) 的条目迁移到 new_id，排序值不变
    ///
    /// # 返回
    /// - Applied: 已迁移
    /// - KeyNotFound: 原键不存在，未做任何改动
    ///   （记录可能在跟踪排序时就已持有最终 uid，不构成错误）
    pub fn replace_id(&mut self, table: &str, old_id: &RecordId, new_id: RecordId) -> ReplaceOutcome {
        let Some(entries) = self.entries.get_mut(table) else {
            return ReplaceOutcome::KeyNotFound;
        };
        match entries.remove(old_id) {
            Some(entry) => {
                entries.insert(new_id, entry);
                ReplaceOutcome::Applied
            }
            None => ReplaceOutcome::KeyNotFound,
        }
    }

    /// 批量将 table 内的占位符键替换为最终 uid
    ///
    /// 只有 Temporary 键参与替换，Final 键一律不动 ——
    /// 标识符是和类型，最终 uid 不可能被误判为占位符
    pub fn replace_all_new_ids(&mut self, table: &str, new_ids: &HashMap<TemporaryKey, i64>) {
        for (key, uid) in new_ids {
            self.replace_id(table, &RecordId::Temporary(*key), RecordId::Final(*uid));
        }
    }

    /// 全量读取（表名 → 标识符 → {排序列: 排序值}）
    ///
    /// 由存储层排序刷写步骤消费
    pub fn sorting_information(
        &self,
    ) -> &HashMap<String, HashMap<RecordId, HashMap<String, i64>>> {
        &self.entries
    }

    /// 清空全部条目（独立导入运行之间调用）
    pub fn reset_sorting_information(&mut self) {
        self.entries.clear();
    }
}

/// 排序值强制转整数（与动态数据源的宽松取值对齐）
fn coerce_int(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().unwrap_or_else(|| {
            n.as_f64().map(|f| f as i64).unwrap_or(0)
        }),
        Value::String(s) => s.trim().parse::<i64>().unwrap_or_else(|_| {
            s.trim().parse::<f64>().map(|f| f as i64).unwrap_or(0)
        }),
        Value::Bool(true) => 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp(serial: u64) -> RecordId {
        RecordId::Temporary(TemporaryKey::new(serial))
    }

    #[test]
    fn test_fresh_tracker_is_empty() {
        let tracker = ChildrenSortingTracker::new();
        assert!(!tracker.has_sorting_information());
        assert!(tracker.sorting_information().is_empty());
    }

    #[test]
    fn test_add_coerces_string_value_to_int() {
        let mut tracker = ChildrenSortingTracker::new();
        tracker.add_sorting_information("tbl", temp(1), "sorting", &json!("4"));

        let info = tracker.sorting_information();
        assert_eq!(info["tbl"][&temp(1)]["sorting"], 4);
    }

    #[test]
    fn test_coerce_int_variants() {
        assert_eq!(coerce_int(&json!(7)), 7);
        assert_eq!(coerce_int(&json!(7.9)), 7);
        assert_eq!(coerce_int(&json!("12")), 12);
        assert_eq!(coerce_int(&json!(" 12 ")), 12);
        assert_eq!(coerce_int(&json!("abc")), 0);
        assert_eq!(coerce_int(&json!(null)), 0);
        assert_eq!(coerce_int(&json!(true)), 1);
    }

    #[test]
    fn test_last_write_wins_per_key() {
        let mut tracker = ChildrenSortingTracker::new();
        tracker.add_sorting_information("tbl", temp(1), "sorting", &json!(10));
        tracker.add_sorting_information("tbl", temp(1), "sorting", &json!(20));

        let info = tracker.sorting_information();
        assert_eq!(info["tbl"].len(), 1);
        assert_eq!(info["tbl"][&temp(1)]["sorting"], 20);
    }

    #[test]
    fn test_replace_id_moves_entry() {
        let mut tracker = ChildrenSortingTracker::new();
        tracker.add_sorting_information("tbl", temp(1), "sorting", &json!(4));

        let outcome = tracker.replace_id("tbl", &temp(1), RecordId::Final(99));
        assert_eq!(outcome, ReplaceOutcome::Applied);

        {
            let info = tracker.sorting_information();
            assert!(info["tbl"].get(&temp(1)).is_none());
            assert_eq!(info["tbl"][&RecordId::Final(99)]["sorting"], 4);
        }

        // 同一旧键再次替换为无操作
        let outcome = tracker.replace_id("tbl", &temp(1), RecordId::Final(100));
        assert_eq!(outcome, ReplaceOutcome::KeyNotFound);
        let info = tracker.sorting_information();
        assert_eq!(info["tbl"][&RecordId::Final(99)]["sorting"], 4);
        assert!(info["tbl"].get(&RecordId::Final(100)).is_none());
    }

    #[test]
    fn test_replace_id_unknown_table_is_noop() {
        let mut tracker = ChildrenSortingTracker::new();
        let outcome = tracker.replace_id("nothing", &temp(1), RecordId::Final(1));
        assert_eq!(outcome, ReplaceOutcome::KeyNotFound);
    }

    #[test]
    fn test_replace_all_new_ids_only_touches_temporary_keys() {
        let mut tracker = ChildrenSortingTracker::new();
        tracker.add_sorting_information("tbl", temp(1), "sorting", &json!(10));
        tracker.add_sorting_information("tbl", RecordId::Final(42), "sorting", &json!(20));

        let mut new_ids = HashMap::new();
        new_ids.insert(TemporaryKey::new(1), 101);
        tracker.replace_all_new_ids("tbl", &new_ids);

        let info = tracker.sorting_information();
        assert_eq!(info["tbl"][&RecordId::Final(101)]["sorting"], 10);
        // 原本就是最终 uid 的条目不受影响
        assert_eq!(info["tbl"][&RecordId::Final(42)]["sorting"], 20);
        assert!(info["tbl"].get(&temp(1)).is_none());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut tracker = ChildrenSortingTracker::new();
        tracker.add_sorting_information("a", temp(1), "sorting", &json!(1));
        tracker.add_sorting_information("b", temp(2), "rank", &json!(2));
        assert!(tracker.has_sorting_information());

        tracker.reset_sorting_information();
        assert!(!tracker.has_sorting_information());
        assert!(tracker.sorting_information().is_empty());
    }
}
