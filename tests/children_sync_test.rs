// ==========================================
// 内容同步系统 - 子记录同步集成测试
// ==========================================
// 覆盖: 临时键签发/解析、父链接回填、排序刷写、级联删除
// ==========================================


use content_sync::importer::SyncEngine;
use serde_json::json;
use std::error::Error;

/// 写入文章 + 章节的 JSON 数据源并登记配置
fn setup_feed(
    db_path: &str,
    feed_path: &str,
    articles: serde_json::Value,
) -> Result<(), Box<dyn Error>> {
    std::fs::write(feed_path, serde_json::to_string(&json!({ "articles": articles }))?)?;

    test_helpers::save_config(
        db_path,
        json!({
            "table": "articles",
            "source": { "kind": "json", "path": feed_path, "pointer": "/articles" },
            "external_key": "ext_id",
            "fields": [
                { "source": "id", "column": "ext_id", "required": true },
                { "source": "title", "column": "title", "trim": true }
            ],
            "children": [{
                "table": "article_sections",
                "source": "sections",
                "parent_column": "article_uid",
                "external_key": "ext_id",
                "sort_field": "sorting",
                "fields": [
                    { "source": "id", "column": "ext_id", "required": true },
                    { "source": "body", "column": "body" }
                ]
            }]
        }),
    )
}

#[tokio::test]
async fn test_children_insert_with_temporary_keys() -> Result<(), Box<dyn Error>> {
    let (_db_file, db_path) = test_helpers::create_test_db()?;
    let feed_file = tempfile::NamedTempFile::new()?;
    let feed_path = feed_file.path().to_str().unwrap().to_string();

    setup_feed(
        &db_path,
        &feed_path,
        json!([
            {
                "id": "A1",
                "title": "第一篇",
                "sections": [
                    { "id": "S1", "body": "引言" },
                    { "id": "S2", "body": "正文" },
                    { "id": "S3", "body": "结语" }
                ]
            },
            {
                "id": "A2",
                "title": "第二篇",
                "sections": [
                    { "id": "S4", "body": "独立章节" }
                ]
            }
        ]),
    )?;

    let engine = test_helpers::build_engine(&db_path)?;
    let report = engine.synchronize("articles", "0").await?;

    assert_eq!(report.summary.inserted, 2);
    assert_eq!(report.summary.child_inserted, 4);
    assert!(!report.messages.has_errors());

    // 父链接列指向真实 uid
    let conn = rusqlite::Connection::open(&db_path)?;
    let parent_uid: i64 = conn.query_row(
        "SELECT uid FROM articles WHERE ext_id = 'A1'",
        [],
        |row| row.get(0),
    )?;
    let linked: i64 = conn.query_row(
        "SELECT COUNT(*) FROM article_sections WHERE article_uid = ?1",
        [parent_uid],
        |row| row.get(0),
    )?;
    assert_eq!(linked, 3);

    // 排序列反映源内顺序（占位符已被最终 uid 替换后刷写）
    let bodies = test_helpers::query_values(
        &db_path,
        "SELECT body FROM article_sections WHERE article_uid IN
            (SELECT uid FROM articles WHERE ext_id = 'A1')
         ORDER BY sorting",
    )?;
    let bodies: Vec<String> = bodies
        .into_iter()
        .map(|v| match v {
            rusqlite::types::Value::Text(s) => s,
            other => panic!("意外的列类型: {:?}", other),
        })
        .collect();
    assert_eq!(bodies, ["引言", "正文", "结语"]);

    let sortings = test_helpers::query_values(
        &db_path,
        "SELECT sorting FROM article_sections WHERE article_uid IN
            (SELECT uid FROM articles WHERE ext_id = 'A1')
         ORDER BY sorting",
    )?;
    assert_eq!(
        sortings,
        vec![
            rusqlite::types::Value::Integer(10),
            rusqlite::types::Value::Integer(20),
            rusqlite::types::Value::Integer(30),
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_rerun_is_idempotent_for_inserts() -> Result<(), Box<dyn Error>> {
    let (_db_file, db_path) = test_helpers::create_test_db()?;
    let feed_file = tempfile::NamedTempFile::new()?;
    let feed_path = feed_file.path().to_str().unwrap().to_string();

    let articles = json!([
        {
            "id": "A1",
            "title": "第一篇",
            "sections": [
                { "id": "S1", "body": "引言" },
                { "id": "S2", "body": "正文" }
            ]
        }
    ]);
    setup_feed(&db_path, &feed_path, articles)?;

    let engine = test_helpers::build_engine(&db_path)?;
    engine.synchronize("articles", "0").await?;
    let second = engine.synchronize("articles", "0").await?;

    // 第二轮无新增，主记录无差异跳过
    assert_eq!(second.summary.inserted, 0);
    assert_eq!(second.summary.child_inserted, 0);
    assert_eq!(second.summary.skipped, 1);
    assert_eq!(test_helpers::count_rows(&db_path, "articles")?, 1);
    assert_eq!(test_helpers::count_rows(&db_path, "article_sections")?, 2);

    Ok(())
}

#[tokio::test]
async fn test_reordered_children_rewrite_sorting() -> Result<(), Box<dyn Error>> {
    let (_db_file, db_path) = test_helpers::create_test_db()?;
    let feed_file = tempfile::NamedTempFile::new()?;
    let feed_path = feed_file.path().to_str().unwrap().to_string();

    setup_feed(
        &db_path,
        &feed_path,
        json!([
            {
                "id": "A1",
                "title": "第一篇",
                "sections": [
                    { "id": "S1", "body": "甲" },
                    { "id": "S2", "body": "乙" }
                ]
            }
        ]),
    )?;

    let engine = test_helpers::build_engine(&db_path)?;
    engine.synchronize("articles", "0").await?;

    // 源内顺序颠倒后重跑: 已有子记录按最终 uid 记录排序并刷写
    setup_feed(
        &db_path,
        &feed_path,
        json!([
            {
                "id": "A1",
                "title": "第一篇",
                "sections": [
                    { "id": "S2", "body": "乙" },
                    { "id": "S1", "body": "甲" }
                ]
            }
        ]),
    )?;
    let report = engine.synchronize("articles", "0").await?;
    assert_eq!(report.summary.child_inserted, 0);

    let bodies = test_helpers::query_values(
        &db_path,
        "SELECT body FROM article_sections ORDER BY sorting",
    )?;
    let bodies: Vec<String> = bodies
        .into_iter()
        .map(|v| match v {
            rusqlite::types::Value::Text(s) => s,
            other => panic!("意外的列类型: {:?}", other),
        })
        .collect();
    assert_eq!(bodies, ["乙", "甲"]);

    Ok(())
}

#[tokio::test]
async fn test_shared_child_key_is_inserted_once() -> Result<(), Box<dyn Error>> {
    let (_db_file, db_path) = test_helpers::create_test_db()?;
    let feed_file = tempfile::NamedTempFile::new()?;
    let feed_path = feed_file.path().to_str().unwrap().to_string();

    // 两个父记录引用同一个子记录源键: 注册表去重，只建一条
    setup_feed(
        &db_path,
        &feed_path,
        json!([
            {
                "id": "A1",
                "title": "第一篇",
                "sections": [ { "id": "SHARED", "body": "公共章节" } ]
            },
            {
                "id": "A2",
                "title": "第二篇",
                "sections": [ { "id": "SHARED", "body": "公共章节" } ]
            }
        ]),
    )?;

    let engine = test_helpers::build_engine(&db_path)?;
    let report = engine.synchronize("articles", "0").await?;

    assert_eq!(report.summary.child_inserted, 1);
    assert_eq!(test_helpers::count_rows(&db_path, "article_sections")?, 1);

    Ok(())
}

#[tokio::test]
async fn test_deleted_parent_cascades_children() -> Result<(), Box<dyn Error>> {
    let (_db_file, db_path) = test_helpers::create_test_db()?;
    let feed_file = tempfile::NamedTempFile::new()?;
    let feed_path = feed_file.path().to_str().unwrap().to_string();

    setup_feed(
        &db_path,
        &feed_path,
        json!([
            {
                "id": "A1",
                "title": "保留",
                "sections": [ { "id": "S1", "body": "甲" } ]
            },
            {
                "id": "A2",
                "title": "将下线",
                "sections": [ { "id": "S2", "body": "乙" } ]
            }
        ]),
    )?;

    let engine = test_helpers::build_engine(&db_path)?;
    engine.synchronize("articles", "0").await?;

    // A2 从数据源消失 → 主记录删除并级联清理其子记录
    setup_feed(
        &db_path,
        &feed_path,
        json!([
            {
                "id": "A1",
                "title": "保留",
                "sections": [ { "id": "S1", "body": "甲" } ]
            }
        ]),
    )?;
    let report = engine.synchronize("articles", "0").await?;

    assert_eq!(report.summary.deleted, 1);
    assert_eq!(test_helpers::count_rows(&db_path, "articles")?, 1);
    assert_eq!(test_helpers::count_rows(&db_path, "article_sections")?, 1);

    Ok(())
}
