// ==========================================
// 内容同步系统 - 核心库
// ==========================================
// 依据: Sync_Engine_Specs_v0.4.md
// 技术栈: Rust + SQLite
// 系统定位: CMS 外部数据源同步引擎
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 类型与数据结构
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 同步层 - 步骤管道
pub mod importer;

// 配置层 - 声明式表配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 结果呈现
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{RecordId, ReplaceOutcome, Severity, SyncOperation, TemporaryKey};

// 领域数据结构
pub use domain::{MessageLog, ReconcilePlan, StoreOutcome, SyncReport, SyncSummary};

// 同步引擎
pub use importer::{
    ChildrenSortingTracker, SyncEngine, SyncEngineImpl, TemporaryKeyRegistry,
};

// 配置
pub use config::{ConfigManager, SyncConfigReader, TableConfig};

// API
pub use api::{CallContext, CliCallContext};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "内容数据同步系统";
