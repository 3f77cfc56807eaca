use std::path::Path;

use audio_overview_automation::browser::{launch_persistent_browser, ProfileLock};
use audio_overview_automation::config::Config;
use audio_overview_automation::models::load_digest_file;
use audio_overview_automation::orchestrator::AutomationOrchestrator;
use audio_overview_automation::utils::logging;
use audio_overview_automation::WorkItem;

#[tokio::test]
#[ignore] // 默认忽略，需要手动运行：cargo test -- --ignored
async fn test_browser_launch_and_teardown() {
    // 初始化日志
    logging::init();

    // 使用临时会话目录，不碰真实登录态
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let config = Config {
        chrome_profile_dir: dir.path().join("profile").display().to_string(),
        ..Config::default()
    };

    let (mut browser, page, handler_task) = launch_persistent_browser(&config)
        .await
        .expect("启动浏览器失败");

    let title = page.get_title().await;
    assert!(title.is_ok(), "应该能读取页面标题");

    browser.close().await.expect("关闭浏览器失败");
    let _ = browser.wait().await;
    handler_task.abort();
}

#[tokio::test]
#[ignore]
async fn test_generate_full_run() {
    // 初始化日志
    logging::init();

    // 加载配置（需要预先人工登录建立的会话目录）
    let config = Config::from_env();

    let work = WorkItem::new(
        "今日摘要：这是一次端到端冒烟测试的文稿内容。",
        chrono::Local::now().format("%Y-%m-%d").to_string(),
    );

    let orchestrator = AutomationOrchestrator::new(config);
    let outcome = orchestrator.generate(&work).await.expect("生成失败");

    assert!(outcome.artifact.size_bytes > 0, "产物不应为空");
    assert!(outcome.artifact.path.exists(), "产物文件应该存在");
}

#[tokio::test]
#[ignore]
async fn test_generate_refuses_when_profile_locked() {
    logging::init();

    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let profile = dir.path().join("profile");
    let config = Config {
        chrome_profile_dir: profile.display().to_string(),
        ..Config::default()
    };

    // 模拟上一次运行未退出：先占住锁
    let lock = ProfileLock::acquire(&profile).expect("获取锁失败");

    let orchestrator = AutomationOrchestrator::new(config);
    let work = WorkItem::new("文稿", "2026-08-26");
    let result = orchestrator.generate(&work).await;

    assert!(result.is_err(), "锁被占用时应该拒绝启动");
    lock.release();
}

#[tokio::test]
async fn test_load_digest_fixture() {
    let dir = tempfile::tempdir().expect("创建临时目录失败");
    let path = dir.path().join("digest-2026-08-26.toml");
    std::fs::write(
        &path,
        "date = \"2026-08-26\"\ntext = \"今日三条要闻……\"\n",
    )
    .expect("写入测试文件失败");

    let work = load_digest_file(Path::new(&path)).await.expect("加载失败");
    assert_eq!(work.date, "2026-08-26");
    assert!(!work.text.is_empty());
}
