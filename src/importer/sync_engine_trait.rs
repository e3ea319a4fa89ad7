// ==========================================
// 内容同步系统 - 同步引擎 Trait
// ==========================================
// 依据: Sync_Engine_Specs_v0.4.md - 1.2 同步主流程
// 职责: 定义同步引擎与各管道阶段的接口（不包含实现）
// ==========================================

use crate::config::table_config::{SourceConfig, TableConfig};
use crate::domain::record::{
    ExistingRow, MappedRecord, RawRecord, SyncReport, SyncViolation,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;

// ==========================================
// SyncEngine Trait
// ==========================================
// 用途: 同步主接口，一次调用完成一个 (表, 配置索引) 的导入运行
// 实现者: SyncEngineImpl
#[async_trait]
pub trait SyncEngine: Send + Sync {
    /// 同步单个 (table, index) 配置
    ///
    /// # 返回
    /// - Ok(SyncReport): 含分级消息与计数的运行结果
    ///   （行级问题进入消息桶，不中断运行）
    /// - Err: 运行级失败（配置缺失、数据源不可读、事务失败）
    ///
    /// # 同步流程
    /// 1. 读取配置
    /// 2. 读取数据源
    /// 3. 字段映射
    /// 4. 数据转换（TRIM/UPPER/NULL/日期/slug）
    /// 5. 外键解析
    /// 6. 校验
    /// 7. 对账（增/改/删/跳过）
    /// 8. 子记录处理（临时键 + 排序簿记）
    /// 9. 落库（事务化）
    /// 10. 排序刷写（占位符 → 最终 uid 后）
    async fn synchronize(&self, table: &str, index: &str) -> Result<SyncReport, Box<dyn Error>>;

    /// 同步全部已登记配置（并发执行）
    ///
    /// 每个配置的运行彼此独立、各自持有独立的临时键注册表与
    /// 排序跟踪器；单个配置失败不影响其他配置
    async fn synchronize_all(
        &self,
    ) -> Result<Vec<Result<SyncReport, String>>, Box<dyn Error>>;
}

// ==========================================
// SourceReader Trait
// ==========================================
// 用途: 数据源读取接口（阶段 2）
// 实现者: UniversalSourceReader（按 SourceConfig 分发）
pub trait SourceReader: Send + Sync {
    /// 将配置的数据源解析为原始行记录
    ///
    /// # 返回
    /// - Ok(Vec<RawRecord>): 行记录列表（完全空白的行已跳过）
    /// - Err: 文件读取错误、格式错误
    fn read_records(&self, source: &SourceConfig) -> Result<Vec<RawRecord>, Box<dyn Error>>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 用途: 字段映射接口（阶段 3）
// 实现者: ConfiguredFieldMapper
pub trait FieldMapper: Send + Sync {
    /// 按配置将原始行映射为 MappedRecord（含子记录提取）
    ///
    /// # 参数
    /// - raw: 原始行记录
    /// - row_number: 行号（1 起，用于消息定位）
    /// - config: 表配置
    ///
    /// # 返回
    /// - Ok(MappedRecord): 映射成功
    /// - Err: 必填字段缺失或不可转换（整行失败，不中断运行）
    fn map_record(
        &self,
        raw: &RawRecord,
        row_number: usize,
        config: &TableConfig,
    ) -> Result<MappedRecord, Box<dyn Error>>;
}

// ==========================================
// Transformer Trait
// ==========================================
// 用途: 数据转换原语（阶段 4），由引擎按字段配置逐列套用
// 实现者: DataTransformer
pub trait Transformer: Send + Sync {
    /// 清洗文本（TRIM，可选转大写）
    fn clean_text(&self, value: &str, uppercase: bool) -> String;

    /// 标准化 NULL（空白字符串 → None）
    fn normalize_null(&self, value: Option<String>) -> Option<String>;

    /// 解析日期（YYYYMMDD 或 YYYY-MM-DD）
    fn parse_date(&self, value: &str) -> Result<chrono::NaiveDate, Box<dyn Error>>;

    /// slug 化（小写，非字母数字折叠为 '-'）
    fn slugify(&self, value: &str) -> String;
}

// ==========================================
// Validator Trait
// ==========================================
// 用途: 数据校验接口（阶段 6）
// 实现者: RecordValidator
pub trait Validator: Send + Sync {
    /// 校验映射后的记录集
    ///
    /// # 返回
    /// - Vec<SyncViolation>: 违规列表；discard=true 的行由引擎剔除
    ///
    /// # 规则
    /// - 外部键为空 → Error，剔除
    /// - 必填列为空 → Error，剔除
    /// - 同一批内外部键重复 → Warning，后出现者剔除（先到先得）
    fn validate(&self, records: &[MappedRecord], config: &TableConfig) -> Vec<SyncViolation>;
}

// ==========================================
// Reconciler Trait
// ==========================================
// 用途: 对账接口（阶段 7）—— 与现有行比对，划分增/改/删/跳过
// 实现者: DiffReconciler
pub trait Reconciler: Send + Sync {
    /// 比对映射记录与现有行
    ///
    /// # 参数
    /// - records: 已通过校验的记录
    /// - existing: 外部键 → 现有行（含 uid 与映射列当前值）
    /// - config: 表配置（delete 被禁用时 deletes 恒为空）
    fn reconcile(
        &self,
        records: &[MappedRecord],
        existing: &HashMap<String, ExistingRow>,
        config: &TableConfig,
    ) -> ReconcileOutcome;
}

// ==========================================
// ReconcileOutcome - 对账结果
// ==========================================
// 说明: 下标均指向 records 切片
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    /// 现有行中不存在的记录（待插入）
    pub inserts: Vec<usize>,
    /// 已存在且映射列有差异的记录（待更新）
    pub updates: Vec<(usize, i64)>,
    /// 已存在且无差异的记录（跳过，但子记录仍需处理）
    pub unchanged: Vec<(usize, i64)>,
    /// 现有行中存在、本批缺席的 uid（待删除；delete 禁用时为空）
    pub deletes: Vec<i64>,
}
