use std::path::Path;

use anyhow::{Context, Result};

use audio_overview_automation::config::Config;
use audio_overview_automation::models::load_digest_file;
use audio_overview_automation::orchestrator::AutomationOrchestrator;
use audio_overview_automation::utils::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::from_env();

    // 第一个参数：文稿 TOML 文件路径
    let digest_path = std::env::args()
        .nth(1)
        .context("用法: audio_overview_automation <文稿文件.toml>")?;
    let work = load_digest_file(Path::new(&digest_path)).await?;
    tracing::info!(
        "📝 [{}] 文稿已加载 ({} 字符): {}",
        work.date,
        work.text.chars().count(),
        logging::truncate_text(&work.text, 80)
    );

    // 运行编排器
    let orchestrator = AutomationOrchestrator::new(config);
    let outcome = orchestrator.generate(&work).await?;

    if outcome.ingest.truncated {
        println!(
            "注意: 文稿被截断 ({} -> {} 字符)",
            outcome.ingest.original_chars, outcome.ingest.submitted_chars
        );
    }
    println!("产物: {}", outcome.artifact.path.display());

    Ok(())
}
