// ==========================================
// 内容同步系统 - 配置层
// ==========================================
// 职责: 声明式表同步配置的模型与存取
// ==========================================

pub mod config_manager;
pub mod sync_config_trait;
pub mod table_config;

pub use config_manager::ConfigManager;
pub use sync_config_trait::SyncConfigReader;
pub use table_config::{
    ChildConfig, DataType, FieldMapping, ForeignKeyConfig, SourceConfig, TableConfig,
};
