//! 持久化会话浏览器启动
//!
//! 浏览器始终复用配置指定的用户数据目录，登录态由人工在有头模式下
//! 预先建立；本模块从不尝试输入凭据。

use std::path::Path;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{AutomationError, AutomationResult, BrowserError};

/// 启动复用持久化会话目录的浏览器
///
/// 返回浏览器句柄、初始页面和后台事件处理任务。事件处理任务由
/// 编排层持有并在清理时中止。
pub async fn launch_persistent_browser(
    config: &Config,
) -> AutomationResult<(Browser, Page, JoinHandle<()>)> {
    let profile_dir = Path::new(&config.chrome_profile_dir);
    tokio::fs::create_dir_all(profile_dir)
        .await
        .map_err(|e| AutomationError::write_failed(profile_dir.display().to_string(), e))?;

    info!("🚀 启动浏览器 (会话目录: {})", profile_dir.display());

    let mut builder = BrowserConfig::builder()
        .user_data_dir(profile_dir)
        .window_size(1280, 720)
        .args(vec![
            "--no-sandbox",
            "--disable-setuid-sandbox",
            "--disable-dev-shm-usage",
            "--disable-gpu",
        ]);
    if config.headless {
        builder = builder.new_headless_mode();
    } else {
        builder = builder.with_head();
    }
    let browser_config = builder.build().map_err(|message| {
        error!("配置浏览器失败: {}", message);
        AutomationError::Browser(BrowserError::ConfigurationFailed { message })
    })?;

    let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        AutomationError::launch_failed(e)
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(Duration::from_millis(300)).await;

    // 复用启动时自带的页面，没有则新建空白页
    let pages = browser.pages().await?;
    debug!("获取到 {} 个页面", pages.len());
    let page = match pages.into_iter().next() {
        Some(page) => page,
        None => browser.new_page("about:blank").await.map_err(|e| {
            error!("创建空白页面失败: {}", e);
            AutomationError::launch_failed(e)
        })?,
    };

    Ok((browser, page, handler_task))
}

/// 把浏览器的下载行为指向暂存目录
///
/// 远端应用没有稳定直链，产物只能经浏览器自身的下载机制落盘。
pub async fn allow_downloads_to(browser: &Browser, download_dir: &Path) -> AutomationResult<()> {
    tokio::fs::create_dir_all(download_dir)
        .await
        .map_err(|e| AutomationError::write_failed(download_dir.display().to_string(), e))?;
    let params = SetDownloadBehaviorParams::builder()
        .behavior(SetDownloadBehaviorBehavior::Allow)
        .download_path(download_dir.to_string_lossy().to_string())
        .build()
        .map_err(|message| {
            AutomationError::Browser(BrowserError::ConfigurationFailed { message })
        })?;
    browser.execute(params).await?;
    debug!("下载目录已指向: {}", download_dir.display());
    Ok(())
}
