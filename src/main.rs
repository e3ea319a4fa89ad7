// ==========================================
// 内容同步系统 - 命令行主入口
// ==========================================
// 职责: 薄适配层，调用同步引擎并经 CLI 上下文打印结果
// 用法: content-sync <db_path> <table> [index]
//       content-sync <db_path> --all
// ==========================================

use content_sync::api::{CallContext, CliCallContext};
use content_sync::config::ConfigManager;
use content_sync::importer::{
    ConfiguredFieldMapper, DataTransformer, DiffReconciler, RecordValidator, SyncEngine,
    SyncEngineImpl, UniversalSourceReader,
};
use content_sync::repository::ContentRepositoryImpl;

#[tokio::main]
async fn main() {
    content_sync::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", content_sync::APP_NAME);
    tracing::info!("系统版本: {}", content_sync::VERSION);
    tracing::info!("==================================================");

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("用法: {} <db_path> <table> [index]", args[0]);
        eprintln!("      {} <db_path> --all", args[0]);
        std::process::exit(2);
    }

    let db_path = &args[1];

    let repo = ContentRepositoryImpl::new(db_path).expect("无法打开内容数据库");
    let config = ConfigManager::new(db_path).expect("无法打开配置存储");

    let engine = SyncEngineImpl::new(
        repo,
        config,
        Box::new(UniversalSourceReader),
        Box::new(ConfiguredFieldMapper),
        Box::new(DataTransformer),
        Box::new(RecordValidator),
        Box::new(DiffReconciler),
    );

    let context = CliCallContext;
    let mut had_errors = false;

    if args[2] == "--all" {
        let results = engine
            .synchronize_all()
            .await
            .expect("同步配置列表读取失败");
        for result in results {
            match result {
                Ok(report) => {
                    had_errors |= report.messages.has_errors();
                    context.output_report(&report);
                }
                Err(message) => {
                    had_errors = true;
                    eprintln!("[错误] {}", message);
                }
            }
        }
    } else {
        let table = &args[2];
        let index = args.get(3).map(String::as_str).unwrap_or("0");
        match engine.synchronize(table, index).await {
            Ok(report) => {
                had_errors = report.messages.has_errors();
                context.output_report(&report);
            }
            Err(e) => {
                eprintln!("[错误] 同步 {}/{} 失败: {}", table, index, e);
                had_errors = true;
            }
        }
    }

    if had_errors {
        std::process::exit(1);
    }
}
