// ==========================================
// 内容同步系统 - 配置管理集成测试
// ==========================================
// 覆盖: sync_config 表的写入/读取/列举、缺失配置报错
// ==========================================


use content_sync::config::{ConfigManager, SyncConfigReader, TableConfig};
use serde_json::json;
use std::error::Error;

fn sample_config(table: &str, index: &str) -> TableConfig {
    serde_json::from_value(json!({
        "table": table,
        "index": index,
        "source": { "kind": "csv", "path": "/data/feed.csv" },
        "external_key": "ext_id",
        "fields": [
            { "source": "id", "column": "ext_id", "required": true }
        ]
    }))
    .unwrap()
}

#[tokio::test]
async fn test_save_and_get_roundtrip() -> Result<(), Box<dyn Error>> {
    let (_db_file, db_path) = test_helpers::create_test_db()?;
    let manager = ConfigManager::new(&db_path)?;

    manager.save_table_config(&sample_config("articles", "0"))?;

    let loaded = manager.get_table_config("articles", "0").await?;
    assert_eq!(loaded.table, "articles");
    assert_eq!(loaded.external_key, "ext_id");
    assert_eq!(loaded.fields.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_save_overwrites_existing_config() -> Result<(), Box<dyn Error>> {
    let (_db_file, db_path) = test_helpers::create_test_db()?;
    let manager = ConfigManager::new(&db_path)?;

    manager.save_table_config(&sample_config("articles", "0"))?;

    let mut updated = sample_config("articles", "0");
    updated.external_key = "remote_id".to_string();
    manager.save_table_config(&updated)?;

    let loaded = manager.get_table_config("articles", "0").await?;
    assert_eq!(loaded.external_key, "remote_id");

    Ok(())
}

#[tokio::test]
async fn test_missing_config_is_explicit_error() -> Result<(), Box<dyn Error>> {
    let (_db_file, db_path) = test_helpers::create_test_db()?;
    let manager = ConfigManager::new(&db_path)?;

    let result = manager.get_table_config("articles", "0").await;
    assert!(result.is_err());

    Ok(())
}

#[tokio::test]
async fn test_list_table_configs() -> Result<(), Box<dyn Error>> {
    let (_db_file, db_path) = test_helpers::create_test_db()?;
    let manager = ConfigManager::new(&db_path)?;

    manager.save_table_config(&sample_config("articles", "0"))?;
    manager.save_table_config(&sample_config("articles", "full"))?;
    manager.save_table_config(&sample_config("categories", "0"))?;

    let pairs = manager.list_table_configs().await?;
    assert_eq!(pairs.len(), 3);
    assert!(pairs.contains(&("articles".to_string(), "0".to_string())));
    assert!(pairs.contains(&("articles".to_string(), "full".to_string())));
    assert!(pairs.contains(&("categories".to_string(), "0".to_string())));

    Ok(())
}
