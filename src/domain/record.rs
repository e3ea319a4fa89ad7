// ==========================================
// 内容同步系统 - 同步记录与结果模型
// ==========================================
// 依据: Sync_Engine_Specs_v0.4.md - 3. 数据模型
// 职责: 管道各阶段之间流转的数据结构（不含业务逻辑）
// ==========================================

use crate::domain::types::{RecordId, Severity, TemporaryKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// 原始行记录（源字段名 → 原始值）
///
/// CSV 源的值一律为字符串，JSON/XML/数据库源保留原始类型
pub type RawRecord = HashMap<String, Value>;

// ==========================================
// MappedRecord - 映射后的中间记录
// ==========================================
// 说明: 字段映射阶段的产物，目标列名 → 已转换值
#[derive(Debug, Clone)]
pub struct MappedRecord {
    /// 源文件中的行号（1 起，用于消息定位）
    pub row_number: usize,
    /// 源侧外部键值（以目标外部键列为准提取）
    pub external_key: String,
    /// 目标列名 → 值
    pub columns: HashMap<String, Value>,
    /// 子表名 → 子记录列表（保持源内顺序）
    pub children: HashMap<String, Vec<ChildRecord>>,
}

// ==========================================
// ChildRecord - 子记录
// ==========================================
#[derive(Debug, Clone)]
pub struct ChildRecord {
    pub external_key: String,
    pub columns: HashMap<String, Value>,
}

// ==========================================
// ExistingRow - 存储层现有行
// ==========================================
#[derive(Debug, Clone)]
pub struct ExistingRow {
    pub uid: i64,
    pub columns: HashMap<String, Value>,
}

// ==========================================
// SyncViolation - 校验违规
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct SyncViolation {
    pub row_number: usize,
    pub external_key: Option<String>,
    pub severity: Severity,
    pub message: String,
    /// 该行是否从本轮同步中剔除
    pub discard: bool,
}

// ==========================================
// ReconcilePlan - 对账执行计划
// ==========================================
// 说明: 对账阶段产出、存储层事务化执行的增/改/删清单
#[derive(Debug, Clone, Default)]
pub struct ReconcilePlan {
    pub table: String,
    pub inserts: Vec<PlannedInsert>,
    pub updates: Vec<PlannedUpdate>,
    pub deletes: Vec<i64>,
    pub child_inserts: Vec<PlannedChildInsert>,
    pub child_updates: Vec<PlannedChildUpdate>,
    /// 删除主记录时需要级联清理的子表（子表名 → 父链接列）
    pub cascades: Vec<CascadeDelete>,
}

impl ReconcilePlan {
    pub fn new(table: &str) -> Self {
        ReconcilePlan {
            table: table.to_string(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty()
            && self.updates.is_empty()
            && self.deletes.is_empty()
            && self.child_inserts.is_empty()
            && self.child_updates.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct PlannedInsert {
    pub id: TemporaryKey,
    pub external_key: String,
    pub columns: HashMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct PlannedUpdate {
    pub uid: i64,
    pub columns: HashMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct PlannedChildInsert {
    pub table: String,
    pub id: TemporaryKey,
    pub external_key: String,
    /// 父链接列名
    pub parent_column: String,
    /// 父记录标识（可能仍是占位符，落库时解析）
    pub parent: RecordId,
    pub columns: HashMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct PlannedChildUpdate {
    pub table: String,
    pub uid: i64,
    pub parent_column: String,
    pub parent: RecordId,
    pub columns: HashMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct CascadeDelete {
    pub table: String,
    pub parent_column: String,
}

// ==========================================
// StoreOutcome - 落库结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct StoreOutcome {
    /// 表名 → (临时键 → 最终 uid)，驱动占位符替换
    pub new_ids: HashMap<String, HashMap<TemporaryKey, i64>>,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    pub child_inserted: usize,
    pub child_updated: usize,
}

// ==========================================
// MessageLog - 按严重级别分桶的消息
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageLog {
    success: Vec<String>,
    warning: Vec<String>,
    error: Vec<String>,
}

impl MessageLog {
    pub fn new() -> Self {
        MessageLog::default()
    }

    pub fn add(&mut self, severity: Severity, message: impl Into<String>) {
        match severity {
            Severity::Success => self.success.push(message.into()),
            Severity::Warning => self.warning.push(message.into()),
            Severity::Error => self.error.push(message.into()),
        }
    }

    pub fn messages(&self, severity: Severity) -> &[String] {
        match severity {
            Severity::Success => &self.success,
            Severity::Warning => &self.warning,
            Severity::Error => &self.error,
        }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.messages(severity).len()
    }

    pub fn has_errors(&self) -> bool {
        !self.error.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.success.is_empty() && self.warning.is_empty() && self.error.is_empty()
    }

    /// 合并另一份消息（保持各桶内顺序）
    pub fn merge(&mut self, other: MessageLog) {
        self.success.extend(other.success);
        self.warning.extend(other.warning);
        self.error.extend(other.error);
    }
}

// ==========================================
// SyncSummary - 同步汇总统计
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSummary {
    pub total_rows: usize,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub child_inserted: usize,
    pub child_updated: usize,
}

// ==========================================
// SyncReport - 单次同步结果
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: String,
    pub table: String,
    pub index: String,
    pub summary: SyncSummary,
    pub messages: MessageLog,
    pub elapsed_ms: u64,
}
