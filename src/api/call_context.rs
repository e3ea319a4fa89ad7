// ==========================================
// 内容同步系统 - 调用上下文
// ==========================================
// 依据: Sync_Engine_Specs_v0.4.md - 6. 结果上报
// 职责: 把分级消息交给各类宿主（CLI / 调度器 / 后台）各自呈现
// ==========================================

use crate::domain::record::SyncReport;
use crate::domain::types::Severity;

// ==========================================
// CallContext Trait
// ==========================================
// 用途: 同步结果的呈现出口
// 实现者: CliCallContext；调度器/后台上下文由宿主提供
pub trait CallContext: Send + Sync {
    /// 呈现一次同步运行的结果
    fn output_report(&self, report: &SyncReport);
}

// ==========================================
// CliCallContext - 命令行呈现
// ==========================================
pub struct CliCallContext;

impl CallContext for CliCallContext {
    fn output_report(&self, report: &SyncReport) {
        println!(
            "同步 {}/{} 完成 (run_id={}, 耗时 {} ms)",
            report.table, report.index, report.run_id, report.elapsed_ms
        );
        println!(
            "  读取 {} 行 | 插入 {} | 更新 {} | 删除 {} | 跳过 {} | 子记录 +{}/~{}",
            report.summary.total_rows,
            report.summary.inserted,
            report.summary.updated,
            report.summary.deleted,
            report.summary.skipped,
            report.summary.child_inserted,
            report.summary.child_updated,
        );

        for (severity, label) in [
            (Severity::Error, "错误"),
            (Severity::Warning, "警告"),
            (Severity::Success, "成功"),
        ] {
            for message in report.messages.messages(severity) {
                println!("  [{}] {}", label, message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::{MessageLog, SyncSummary};

    #[test]
    fn test_cli_context_does_not_panic_on_empty_report() {
        let mut messages = MessageLog::new();
        messages.add(Severity::Success, "表 articles: 读取 0 行");

        let report = SyncReport {
            run_id: "test-run".to_string(),
            table: "articles".to_string(),
            index: "0".to_string(),
            summary: SyncSummary::default(),
            messages,
            elapsed_ms: 1,
        };

        CliCallContext.output_report(&report);
    }
}
