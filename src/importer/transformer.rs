// ==========================================
// 内容同步系统 - 数据转换器实现
// ==========================================
// 依据: Sync_Engine_Specs_v0.4.md - 阶段 4: 数据转换
// 职责: TRIM / UPPER / NULL 标准化 / 日期解析 / slug 化
// ==========================================

use crate::importer::error::SyncError;
use crate::importer::sync_engine_trait::Transformer;
use chrono::NaiveDate;

pub struct DataTransformer;

impl Transformer for DataTransformer {
    fn clean_text(&self, value: &str, uppercase: bool) -> String {
        let trimmed = value.trim();
        if uppercase {
            trimmed.to_uppercase()
        } else {
            trimmed.to_string()
        }
    }

    fn normalize_null(&self, value: Option<String>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    fn parse_date(&self, value: &str) -> Result<NaiveDate, Box<dyn std::error::Error>> {
        NaiveDate::parse_from_str(value, "%Y%m%d")
            .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
            .map_err(|_| {
                Box::new(SyncError::DateFormatError {
                    row: 0, // 调用方需指定行号
                    field: String::new(),
                    value: value.to_string(),
                }) as Box<dyn std::error::Error>
            })
    }

    fn slugify(&self, value: &str) -> String {
        let mut slug = String::with_capacity(value.len());
        let mut previous_dash = true; // 抑制首部 '-'
        for ch in value.trim().chars() {
            if ch.is_ascii_alphanumeric() {
                slug.push(ch.to_ascii_lowercase());
                previous_dash = false;
            } else if !previous_dash {
                slug.push('-');
                previous_dash = true;
            }
        }
        while slug.ends_with('-') {
            slug.pop();
        }
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_basic() {
        let transformer = DataTransformer;
        assert_eq!(transformer.clean_text("  hello  ", false), "hello");
        assert_eq!(transformer.clean_text("  hello  ", true), "HELLO");
    }

    #[test]
    fn test_normalize_null() {
        let transformer = DataTransformer;
        assert_eq!(transformer.normalize_null(Some("  ".to_string())), None);
        assert_eq!(transformer.normalize_null(Some("".to_string())), None);
        assert_eq!(
            transformer.normalize_null(Some("  value  ".to_string())),
            Some("value".to_string())
        );
        assert_eq!(transformer.normalize_null(None), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let transformer = DataTransformer;
        let date = transformer.parse_date("20250120").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 1, 20).unwrap());

        // 兼容 YYYY-MM-DD
        let date = transformer.parse_date("2025-01-20").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 1, 20).unwrap());

        assert!(transformer.parse_date("01/20/2025").is_err());
    }

    #[test]
    fn test_slugify() {
        let transformer = DataTransformer;
        assert_eq!(transformer.slugify("Hello World"), "hello-world");
        assert_eq!(transformer.slugify("  Rust & SQLite!  "), "rust-sqlite");
        assert_eq!(transformer.slugify("--a--b--"), "a-b");
        assert_eq!(transformer.slugify("汉字标题"), "");
    }
}
