// ==========================================
// 内容同步系统 - 字段映射器实现
// ==========================================
// 依据: Table_Config_Spec_v0.2.md - 3. 字段映射规则
// 职责: 按配置把原始行转为目标列值，提取子记录数组
// ==========================================

use crate::config::table_config::{DataType, FieldMapping, TableConfig};
use crate::domain::record::{ChildRecord, MappedRecord, RawRecord};
use crate::importer::error::SyncError;
use crate::importer::sync_engine_trait::FieldMapper;
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;

pub struct ConfiguredFieldMapper;

impl ConfiguredFieldMapper {
    /// 将一组字段映射应用到原始行
    ///
    /// 必填字段缺失或不可转换 → 整行失败；
    /// 非必填字段转换失败 → 置空（行级告警由校验阶段补充）
    fn map_fields(
        &self,
        raw: &RawRecord,
        fields: &[FieldMapping],
        row_number: usize,
    ) -> Result<HashMap<String, Value>, SyncError> {
        let mut columns = HashMap::new();

        for mapping in fields {
            let raw_value = raw.get(&mapping.source).unwrap_or(&Value::Null);

            let picked = if raw_value.is_null() {
                mapping.default.clone().unwrap_or(Value::Null)
            } else {
                raw_value.clone()
            };

            let coerced = match coerce(&picked, mapping.data_type) {
                Ok(value) => value,
                Err(message) => {
                    if mapping.required {
                        return Err(SyncError::TypeConversionError {
                            row: row_number,
                            field: mapping.source.clone(),
                            message,
                        });
                    }
                    Value::Null
                }
            };

            if mapping.required && coerced.is_null() {
                return Err(SyncError::FieldMappingError {
                    row: row_number,
                    message: format!("必填字段缺失: {}", mapping.source),
                });
            }

            columns.insert(mapping.column.clone(), coerced);
        }

        Ok(columns)
    }
}

impl FieldMapper for ConfiguredFieldMapper {
    fn map_record(
        &self,
        raw: &RawRecord,
        row_number: usize,
        config: &TableConfig,
    ) -> Result<MappedRecord, Box<dyn Error>> {
        let columns = self.map_fields(raw, &config.fields, row_number)?;

        // 外部键以目标列值为准提取
        let external_key = columns
            .get(&config.external_key)
            .map(value_to_key)
            .unwrap_or_default();

        // 提取子记录数组
        let mut children: HashMap<String, Vec<ChildRecord>> = HashMap::new();
        for child_config in &config.children {
            let node = raw.get(&child_config.source).unwrap_or(&Value::Null);
            let items = match node {
                Value::Null => Vec::new(),
                Value::Array(items) => items.clone(),
                _ => {
                    return Err(Box::new(SyncError::FieldMappingError {
                        row: row_number,
                        message: format!("子记录字段 {} 不是数组", child_config.source),
                    }))
                }
            };

            let mut child_records = Vec::new();
            for item in &items {
                let child_raw: RawRecord = match item.as_object() {
                    Some(object) => object.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                    None => {
                        return Err(Box::new(SyncError::FieldMappingError {
                            row: row_number,
                            message: format!("子记录字段 {} 的元素不是对象", child_config.source),
                        }))
                    }
                };

                let child_columns =
                    self.map_fields(&child_raw, &child_config.fields, row_number)?;
                let child_key = child_columns
                    .get(&child_config.external_key)
                    .map(value_to_key)
                    .unwrap_or_default();

                child_records.push(ChildRecord {
                    external_key: child_key,
                    columns: child_columns,
                });
            }

            children.insert(child_config.table.clone(), child_records);
        }

        Ok(MappedRecord {
            row_number,
            external_key,
            columns,
            children,
        })
    }
}

/// 目标列值 → 外部键字符串
fn value_to_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// 按声明类型转换值
///
/// Date 在此保持字符串形态，由转换阶段统一解析并规范化
fn coerce(value: &Value, data_type: DataType) -> Result<Value, String> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    match data_type {
        DataType::String | DataType::Date => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(if *b { "1" } else { "0" }.to_string())),
            _ => Err(format!("无法转换为字符串: {}", value)),
        },
        DataType::Integer => match value {
            Value::Number(n) => n
                .as_i64()
                .map(Value::from)
                .ok_or_else(|| format!("不是整数: {}", n)),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(Value::Null);
                }
                trimmed
                    .parse::<i64>()
                    .map(Value::from)
                    .map_err(|_| format!("不是整数: {}", s))
            }
            _ => Err(format!("无法转换为整数: {}", value)),
        },
        DataType::Decimal => match value {
            Value::Number(n) => n
                .as_f64()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("不是数值: {}", n)),
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Ok(Value::Null);
                }
                trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| format!("不是数值: {}", s))
            }
            _ => Err(format!("无法转换为数值: {}", value)),
        },
        DataType::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::Bool(n.as_i64().unwrap_or(0) != 0)),
            Value::String(s) => match s.trim().to_uppercase().as_str() {
                "1" | "Y" | "TRUE" | "是" => Ok(Value::Bool(true)),
                "0" | "N" | "FALSE" | "否" | "" => Ok(Value::Bool(false)),
                other => Err(format!("无法转换为布尔: {}", other)),
            },
            _ => Err(format!("无法转换为布尔: {}", value)),
        },
    }
}
