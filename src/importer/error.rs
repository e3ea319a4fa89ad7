// ==========================================
// 内容同步系统 - 同步模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 同步模块错误类型
#[derive(Error, Debug)]
pub enum SyncError {
    // ===== 数据源错误 =====
    #[error("数据源文件不存在: {0}")]
    SourceNotFound(String),

    #[error("数据源格式不支持: {0}")]
    UnsupportedSource(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("JSON 解析失败: {0}")]
    JsonParseError(String),

    #[error("JSON 指针未命中记录数组: {0}")]
    JsonPointerError(String),

    #[error("XML 解析失败: {0}")]
    XmlParseError(String),

    #[error("数据源查询失败: {0}")]
    QuerySourceError(String),

    // ===== 字段映射错误 =====
    #[error("字段映射失败 (行 {row}): {message}")]
    FieldMappingError { row: usize, message: String },

    #[error("类型转换失败 (行 {row}, 字段 {field}): {message}")]
    TypeConversionError {
        row: usize,
        field: String,
        message: String,
    },

    #[error("日期格式错误 (行 {row}, 字段 {field}): 期望 YYYYMMDD 或 YYYY-MM-DD，实际 {value}")]
    DateFormatError {
        row: usize,
        field: String,
        value: String,
    },

    // ===== 数据质量错误 =====
    #[error("外部键缺失 (行 {0})")]
    MissingExternalKey(usize),

    // ===== 配置错误 =====
    #[error("同步配置不存在: {table}/{index}")]
    ConfigNotFound { table: String, index: String },

    #[error("同步配置解析失败 ({key}): {message}")]
    ConfigParseError { key: String, message: String },

    // ===== 数据库错误 =====
    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::SourceNotFound(err.to_string())
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for SyncError {
    fn from(err: rusqlite::Error) -> Self {
        SyncError::DatabaseQueryError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for SyncError {
    fn from(err: csv::Error) -> Self {
        SyncError::CsvParseError(err.to_string())
    }
}

// 实现 From<serde_json::Error>
impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::JsonParseError(err.to_string())
    }
}

// 实现 From<quick_xml::Error>
impl From<quick_xml::Error> for SyncError {
    fn from(err: quick_xml::Error) -> Self {
        SyncError::XmlParseError(err.to_string())
    }
}

/// Result 类型别名
pub type SyncResult<T> = Result<T, SyncError>;
