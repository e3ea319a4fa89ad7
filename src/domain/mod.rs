// ==========================================
// 内容同步系统 - 领域模型层
// ==========================================
// 职责: 同步管道共享的类型与数据结构
// ==========================================

pub mod record;
pub mod types;

pub use record::{
    ChildRecord, ExistingRow, MappedRecord, MessageLog, PlannedChildInsert, PlannedChildUpdate,
    PlannedInsert, PlannedUpdate, RawRecord, ReconcilePlan, StoreOutcome, SyncReport, SyncSummary,
    SyncViolation,
};
pub use types::{RecordId, ReplaceOutcome, Severity, SyncOperation, TemporaryKey};
