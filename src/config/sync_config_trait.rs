// ==========================================
// 内容同步系统 - 同步配置读取 Trait
// ==========================================
// 依据: Table_Config_Spec_v0.2.md - 2. 配置存取
// 职责: 定义引擎所需的配置读取接口（不包含实现）
// 红线: 不包含业务逻辑
// ==========================================

use crate::config::table_config::TableConfig;
use async_trait::async_trait;
use std::error::Error;

// ==========================================
// SyncConfigReader Trait
// ==========================================
// 用途: 引擎按 (表, 索引) 取同步配置
// 实现者: ConfigManager（从 sync_config 表读取）
#[async_trait]
pub trait SyncConfigReader: Send + Sync {
    /// 读取指定 (table, index) 的同步配置
    ///
    /// # 返回
    /// - Ok(TableConfig): 配置存在且解析成功
    /// - Err: 配置缺失或 JSON 非法（显式错误，不做兜底猜测）
    async fn get_table_config(
        &self,
        table: &str,
        index: &str,
    ) -> Result<TableConfig, Box<dyn Error>>;

    /// 列出所有已登记的 (table, index) 对
    ///
    /// 用于 "同步全部配置" 入口
    async fn list_table_configs(&self) -> Result<Vec<(String, String)>, Box<dyn Error>>;
}
