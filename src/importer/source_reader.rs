// ==========================================
// 内容同步系统 - 数据源读取器实现
// ==========================================
// 依据: Sync_Engine_Specs_v0.4.md - 阶段 2: 数据源读取
// 支持: CSV / JSON / XML / SQLite 查询
// ==========================================

use crate::config::table_config::SourceConfig;
use crate::domain::record::RawRecord;
use crate::importer::error::SyncError;
use crate::importer::sync_engine_trait::SourceReader;
use csv::ReaderBuilder;
use quick_xml::events::Event;
use serde_json::Value;
use std::collections::HashMap;
use std::error::Error;
use std::fs::File;
use std::path::Path;

/// 行记录是否完全空白（全部值为空串或 null）
fn is_blank_record(record: &RawRecord) -> bool {
    record.values().all(|v| match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    })
}

fn check_exists(path: &str) -> Result<(), SyncError> {
    if !Path::new(path).exists() {
        return Err(SyncError::SourceNotFound(path.to_string()));
    }
    Ok(())
}

// ==========================================
// CSV 读取
// ==========================================
fn read_csv(path: &str, delimiter: char) -> Result<Vec<RawRecord>, Box<dyn Error>> {
    check_exists(path)?;

    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter as u8)
        .flexible(true) // 允许行长度不一致
        .from_reader(file);

    // 读取表头
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        let mut row_map: RawRecord = HashMap::new();

        for (col_idx, value) in record.iter().enumerate() {
            if let Some(header) = headers.get(col_idx) {
                row_map.insert(header.clone(), Value::String(value.trim().to_string()));
            }
        }

        // 跳过完全空白的行
        if is_blank_record(&row_map) {
            continue;
        }

        records.push(row_map);
    }

    Ok(records)
}

// ==========================================
// JSON 读取
// ==========================================
fn read_json(path: &str, pointer: &str) -> Result<Vec<RawRecord>, Box<dyn Error>> {
    check_exists(path)?;

    let file = File::open(path)?;
    let document: Value = serde_json::from_reader(file)?;

    let node = if pointer.is_empty() {
        &document
    } else {
        document
            .pointer(pointer)
            .ok_or_else(|| SyncError::JsonPointerError(pointer.to_string()))?
    };

    let items = node
        .as_array()
        .ok_or_else(|| SyncError::JsonPointerError(format!("{} 不是数组", pointer)))?;

    let mut records = Vec::new();
    for item in items {
        let object = item.as_object().ok_or_else(|| {
            SyncError::JsonParseError("记录数组元素不是对象".to_string())
        })?;

        let row_map: RawRecord = object
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if is_blank_record(&row_map) {
            continue;
        }

        records.push(row_map);
    }

    Ok(records)
}

// ==========================================
// XML 读取
// ==========================================
// 约定: record_element 的每个子元素视为一个字段，取其文本内容
fn read_xml(path: &str, record_element: &str) -> Result<Vec<RawRecord>, Box<dyn Error>> {
    check_exists(path)?;

    let content = std::fs::read_to_string(path)?;
    let mut reader = quick_xml::Reader::from_str(&content);

    let mut records = Vec::new();
    let mut current: Option<RawRecord> = None;
    let mut field_name: Option<String> = None;
    let mut field_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == record_element {
                    current = Some(HashMap::new());
                } else if current.is_some() {
                    field_name = Some(name);
                    field_text.clear();
                }
            }
            Ok(Event::Text(ref e)) => {
                if field_name.is_some() {
                    field_text.push_str(&e.unescape()?);
                }
            }
            Ok(Event::End(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == record_element {
                    if let Some(record) = current.take() {
                        if !is_blank_record(&record) {
                            records.push(record);
                        }
                    }
                } else if let Some(field) = field_name.take() {
                    if let Some(record) = current.as_mut() {
                        record.insert(field, Value::String(field_text.trim().to_string()));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Box::new(SyncError::XmlParseError(e.to_string()))),
        }
    }

    Ok(records)
}

// ==========================================
// SQLite 查询读取
// ==========================================
fn read_query(db_path: &str, sql: &str) -> Result<Vec<RawRecord>, Box<dyn Error>> {
    check_exists(db_path)?;

    // 源库只读打开，绝不回写
    let conn = crate::db::open_source_connection(db_path)
        .map_err(|e| SyncError::DatabaseConnectionError(e.to_string()))?;

    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| SyncError::QuerySourceError(e.to_string()))?;
    let column_names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect();

    let mut rows = stmt
        .query([])
        .map_err(|e| SyncError::QuerySourceError(e.to_string()))?;

    let mut records = Vec::new();
    while let Some(row) = rows.next().map_err(|e| SyncError::QuerySourceError(e.to_string()))? {
        let mut row_map: RawRecord = HashMap::new();
        for (idx, name) in column_names.iter().enumerate() {
            let value = match row.get_ref(idx)? {
                rusqlite::types::ValueRef::Null => Value::Null,
                rusqlite::types::ValueRef::Integer(i) => Value::from(i),
                rusqlite::types::ValueRef::Real(f) => {
                    serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
                }
                rusqlite::types::ValueRef::Text(t) => {
                    Value::String(String::from_utf8_lossy(t).to_string())
                }
                // BLOB 列对字段映射无意义
                rusqlite::types::ValueRef::Blob(_) => Value::Null,
            };
            row_map.insert(name.clone(), value);
        }

        if is_blank_record(&row_map) {
            continue;
        }
        records.push(row_map);
    }

    Ok(records)
}

// ==========================================
// 通用数据源读取器（按配置分发）
// ==========================================
pub struct UniversalSourceReader;

impl SourceReader for UniversalSourceReader {
    fn read_records(&self, source: &SourceConfig) -> Result<Vec<RawRecord>, Box<dyn Error>> {
        match source {
            SourceConfig::Csv { path, delimiter } => read_csv(path, *delimiter),
            SourceConfig::Json { path, pointer } => read_json(path, pointer),
            SourceConfig::Xml {
                path,
                record_element,
            } => read_xml(path, record_element),
            SourceConfig::Query { db_path, sql } => read_query(db_path, sql),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_csv_reader_basic() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "id,title").unwrap();
        writeln!(temp_file, "A1,第一篇").unwrap();
        writeln!(temp_file, "A2,第二篇").unwrap();

        let reader = UniversalSourceReader;
        let records = reader
            .read_records(&SourceConfig::Csv {
                path: temp_file.path().to_str().unwrap().to_string(),
                delimiter: ',',
            })
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["id"], json!("A1"));
        assert_eq!(records[1]["title"], json!("第二篇"));
    }

    #[test]
    fn test_csv_reader_skips_blank_rows() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "id,title").unwrap();
        writeln!(temp_file, "A1,第一篇").unwrap();
        writeln!(temp_file, ",").unwrap();
        writeln!(temp_file, "A2,第二篇").unwrap();

        let reader = UniversalSourceReader;
        let records = reader
            .read_records(&SourceConfig::Csv {
                path: temp_file.path().to_str().unwrap().to_string(),
                delimiter: ',',
            })
            .unwrap();

        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_csv_reader_file_not_found() {
        let reader = UniversalSourceReader;
        let result = reader.read_records(&SourceConfig::Csv {
            path: "non_existent.csv".to_string(),
            delimiter: ',',
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_json_reader_with_pointer() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(
            temp_file,
            r#"{{"data": {{"items": [
                {{"id": "A1", "count": 3}},
                {{"id": "A2", "count": 5}}
            ]}}}}"#
        )
        .unwrap();

        let reader = UniversalSourceReader;
        let records = reader
            .read_records(&SourceConfig::Json {
                path: temp_file.path().to_str().unwrap().to_string(),
                pointer: "/data/items".to_string(),
            })
            .unwrap();

        assert_eq!(records.len(), 2);
        // JSON 源保留原始类型
        assert_eq!(records[0]["count"], json!(3));
    }

    #[test]
    fn test_json_reader_bad_pointer() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, r#"{{"items": []}}"#).unwrap();

        let reader = UniversalSourceReader;
        let result = reader.read_records(&SourceConfig::Json {
            path: temp_file.path().to_str().unwrap().to_string(),
            pointer: "/nothing".to_string(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_xml_reader_basic() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(
            temp_file,
            "<articles>\
               <article><id>A1</id><title>第一篇</title></article>\
               <article><id>A2</id><title>第二篇</title></article>\
             </articles>"
        )
        .unwrap();

        let reader = UniversalSourceReader;
        let records = reader
            .read_records(&SourceConfig::Xml {
                path: temp_file.path().to_str().unwrap().to_string(),
                record_element: "article".to_string(),
            })
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["id"], json!("A1"));
        assert_eq!(records[1]["title"], json!("第二篇"));
    }

    #[test]
    fn test_query_reader_basic() {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap().to_string();
        {
            let conn = rusqlite::Connection::open(&db_path).unwrap();
            conn.execute_batch(
                "CREATE TABLE feed (id TEXT, amount INTEGER);
                 INSERT INTO feed VALUES ('A1', 10), ('A2', 20);",
            )
            .unwrap();
        }

        let reader = UniversalSourceReader;
        let records = reader
            .read_records(&SourceConfig::Query {
                db_path,
                sql: "SELECT id, amount FROM feed ORDER BY id".to_string(),
            })
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["amount"], json!(10));
    }
}
