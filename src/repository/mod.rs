// ==========================================
// 内容同步系统 - 数据仓储层
// ==========================================
// 职责: CMS 内部表的数据访问
// ==========================================

pub mod content_repo;
pub mod content_repo_impl;
pub mod error;

pub use content_repo::ContentRepository;
pub use content_repo_impl::ContentRepositoryImpl;
pub use error::{RepositoryError, RepositoryResult};
