// ==========================================
// 内容同步系统 - 表同步配置模型
// ==========================================
// 依据: Table_Config_Spec_v0.2.md - 1. 配置结构
// 职责: 声明式的 "每表一份" 同步配置（serde 反序列化自 sync_config 表）
// ==========================================

use crate::domain::types::SyncOperation;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ==========================================
// TableConfig - 单表同步配置
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// 目标表名
    pub table: String,

    /// 配置索引（同一表可挂多份配置，默认 "0"）
    #[serde(default = "default_index")]
    pub index: String,

    /// 数据源描述
    pub source: SourceConfig,

    /// 外部键列名（目标表中保存源侧键值的列）
    pub external_key: String,

    /// 字段映射
    pub fields: Vec<FieldMapping>,

    /// 子表配置
    #[serde(default)]
    pub children: Vec<ChildConfig>,

    /// 禁用的同步操作（如只增不删的数据源禁用 delete）
    #[serde(default)]
    pub disabled_operations: Vec<SyncOperation>,
}

impl TableConfig {
    pub fn operation_enabled(&self, operation: SyncOperation) -> bool {
        !self.disabled_operations.contains(&operation)
    }
}

fn default_index() -> String {
    "0".to_string()
}

// ==========================================
// SourceConfig - 数据源描述
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// CSV 文件（带表头行）
    Csv {
        path: String,
        #[serde(default = "default_delimiter")]
        delimiter: char,
    },
    /// JSON 文件（pointer 定位记录数组，如 "/data/items"；空则取根）
    Json {
        path: String,
        #[serde(default)]
        pointer: String,
    },
    /// XML 文件（record_element 为单条记录的元素名）
    Xml {
        path: String,
        record_element: String,
    },
    /// 外部 SQLite 库查询（列名即源字段名）
    Query {
        db_path: String,
        sql: String,
    },
}

fn default_delimiter() -> char {
    ','
}

// ==========================================
// DataType - 目标列数据类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    String,
    Integer,
    Decimal,
    Date,
    Boolean,
}

// ==========================================
// FieldMapping - 单字段映射
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    /// 源字段名
    pub source: String,

    /// 目标列名
    pub column: String,

    #[serde(default)]
    pub data_type: DataType,

    /// 必填: 值缺失或不可转换时整行剔除
    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub trim: bool,

    #[serde(default)]
    pub uppercase: bool,

    /// 写入前做 slug 化（小写、非字母数字折叠为 '-'）
    #[serde(default)]
    pub slug: bool,

    /// 外键映射: 源值按另一张已同步表的外部键解析为该表 uid
    #[serde(default)]
    pub foreign: Option<ForeignKeyConfig>,

    /// 源值缺失时的默认值
    #[serde(default)]
    pub default: Option<Value>,
}

// ==========================================
// ForeignKeyConfig - 外键解析配置
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyConfig {
    /// 被引用的目标表
    pub table: String,
    /// 被引用表中的外部键列
    pub key_column: String,
}

// ==========================================
// ChildConfig - 子表配置
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildConfig {
    /// 子表名
    pub table: String,

    /// 父记录原始数据中承载子记录数组的源字段
    pub source: String,

    /// 子表中指向父 uid 的链接列
    pub parent_column: String,

    /// 子表外部键列名
    pub external_key: String,

    /// 排序列名（缺省则不跟踪排序）
    #[serde(default)]
    pub sort_field: Option<String>,

    pub fields: Vec<FieldMapping>,
}
