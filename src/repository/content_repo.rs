// ==========================================
// 内容同步系统 - 内容仓储 Trait
// ==========================================
// 依据: Sync_Engine_Specs_v0.4.md - 5. 存储契约
// 职责: 定义同步引擎所需的数据访问接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::record::{ExistingRow, ReconcilePlan, StoreOutcome};
use crate::domain::types::RecordId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::error::Error;

// ==========================================
// ContentRepository Trait
// ==========================================
// 用途: CMS 内部表的数据访问
// 实现者: ContentRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// 读取表中现有行，按外部键索引
    ///
    /// # 参数
    /// - table: 表名
    /// - key_column: 外部键列名
    /// - columns: 需要一并取出用于差异比较的列
    ///
    /// # 返回
    /// - Ok: 外部键值 → (uid, 列值)；外部键为空的行不纳入
    async fn fetch_existing(
        &self,
        table: &str,
        key_column: &str,
        columns: &[String],
    ) -> Result<HashMap<String, ExistingRow>, Box<dyn Error>>;

    /// 事务化执行对账计划
    ///
    /// 父记录先插入，子记录的父链接列经由占位符映射解析；
    /// 删除主记录时级联清理配置声明的子表
    ///
    /// # 返回
    /// - Ok(StoreOutcome): 含 表 → (临时键 → 最终 uid) 映射与各项计数
    /// - Err: 数据库错误（整个事务回滚）
    async fn apply_plan(&self, plan: &ReconcilePlan) -> Result<StoreOutcome, Box<dyn Error>>;

    /// 刷写排序列
    ///
    /// 仅处理 Final 键的条目；残留的 Temporary 键说明占位符
    /// 未被替换，跳过并告警（由调用方在报告中体现）
    ///
    /// # 返回
    /// - Ok(usize): 实际更新的行数
    async fn update_sorting(
        &self,
        sorting: &HashMap<String, HashMap<RecordId, HashMap<String, i64>>>,
    ) -> Result<usize, Box<dyn Error>>;

    /// 统计表行数（报告与测试用）
    async fn count_rows(&self, table: &str) -> Result<usize, Box<dyn Error>>;
}
