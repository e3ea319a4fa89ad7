// ==========================================
// 内容同步系统 - 同步层
// ==========================================
// 职责: 外部数据源同步到内部表的步骤管道
// 支持: CSV, JSON, XML, 数据库查询
// ==========================================

// 模块声明
pub mod children_sorting;
pub mod error;
pub mod field_mapper;
pub mod reconciler;
pub mod source_reader;
pub mod sync_engine_impl;
pub mod sync_engine_trait;
pub mod temp_key;
pub mod transformer;
pub mod validator;

// 重导出核心类型
pub use children_sorting::ChildrenSortingTracker;
pub use error::{SyncError, SyncResult};
pub use field_mapper::ConfiguredFieldMapper;
pub use reconciler::DiffReconciler;
pub use source_reader::UniversalSourceReader;
pub use sync_engine_impl::SyncEngineImpl;
pub use temp_key::TemporaryKeyRegistry;
pub use transformer::DataTransformer;
pub use validator::RecordValidator;

// 重导出 Trait 接口
pub use sync_engine_trait::{
    FieldMapper, ReconcileOutcome, Reconciler, SourceReader, SyncEngine, Transformer, Validator,
};
