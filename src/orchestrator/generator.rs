//! 生成编排器 - 编排层
//!
//! 一次 generate() 调用 = 一个 WorkItem = 一个浏览器会话。流程内
//! 严格串行：远端文档是单个共享可变资源，不允许两路交互同时驱动。

use std::path::Path;
use std::time::Duration;

use chromiumoxide::Browser;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::browser::{allow_downloads_to, launch_persistent_browser, ProfileLock};
use crate::config::Config;
use crate::error::{AutomationError, AutomationResult, BrowserError};
use crate::infrastructure::PageDriver;
use crate::models::{GenerationOutcome, WorkItem};
use crate::workflow::{GenerationFlow, LiveSurface, NotebookSurface};

/// 生成超时之外的重试次数上限（完整工作流重跑）
const MAX_GENERATION_RETRIES: usize = 1;

/// 等浏览器体面退出的时间，超过就强杀
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// 自动化编排器
///
/// 本引擎唯一的公开入口。
pub struct AutomationOrchestrator {
    config: Config,
}

impl AutomationOrchestrator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// 把一份文稿变成一个校验过的音频产物
    ///
    /// 无论成功、类型化失败还是整体超时，返回前都保证浏览器进程
    /// 已关停、会话目录锁已释放。
    pub async fn generate(&self, work: &WorkItem) -> AutomationResult<GenerationOutcome> {
        info!("{}", "=".repeat(60));
        info!("🚀 开始生成 [{}]", work.date);
        info!("{}", "=".repeat(60));

        // 会话目录单占：拿不到锁说明上一次运行还没退出，拒绝启动
        let lock = ProfileLock::acquire(Path::new(&self.config.chrome_profile_dir))?;

        let (browser, page, handler_task) = match launch_persistent_browser(&self.config).await {
            Ok(launched) => launched,
            Err(e) => {
                lock.release();
                return Err(e);
            }
        };

        let driver = PageDriver::new(page);
        let deadline = Duration::from_secs(self.config.overall_deadline_secs);

        let outcome =
            match allow_downloads_to(&browser, Path::new(&self.config.download_dir)).await {
                Ok(()) => {
                    let flow = GenerationFlow::new(&self.config);
                    let mut surface = LiveSurface::new(&driver, &self.config);
                    attempt_with_deadline(&flow, &mut surface, work, deadline).await
                }
                Err(e) => Err(e),
            };

        teardown(browser, handler_task).await;
        lock.release();

        match &outcome {
            Ok(result) => info!(
                "✅ 生成完成 [{}]: {}",
                work.date,
                result.artifact.path.display()
            ),
            Err(e) => error!("❌ 生成失败 [{}]: {}", work.date, e),
        }
        outcome
    }
}

/// 在整体截止时间内执行工作流（含超时重试）
///
/// 截止时间到点和其他失败一样要留下现场截图；内层 future 被取消后
/// 页面仍然可用，截图在取消之后、关停之前进行。
pub(crate) async fn attempt_with_deadline<S: NotebookSurface>(
    flow: &GenerationFlow,
    surface: &mut S,
    work: &WorkItem,
    deadline: Duration,
) -> AutomationResult<GenerationOutcome> {
    let attempt =
        tokio::time::timeout(deadline, run_with_retry(flow, &mut *surface, work)).await;
    match attempt {
        Ok(result) => {
            if result.is_err() {
                surface.capture_snapshot(&work.date).await;
            }
            result
        }
        Err(_) => {
            error!(
                "[{}] 整体截止时间已到 ({} 秒)",
                work.date,
                deadline.as_secs()
            );
            surface.capture_snapshot(&work.date).await;
            Err(AutomationError::Browser(BrowserError::DeadlineExceeded {
                deadline_secs: deadline.as_secs(),
            }))
        }
    }
}

/// 带重试地执行工作流
///
/// 只有生成超时允许重试，且只重试一次（整个工作流从 Idle 重跑）。
/// 其余失败原因（会话失效、界面改版）进程自己解决不了，立即上抛。
pub(crate) async fn run_with_retry<S: NotebookSurface>(
    flow: &GenerationFlow,
    surface: &mut S,
    work: &WorkItem,
) -> AutomationResult<GenerationOutcome> {
    let mut attempt = 0usize;
    loop {
        attempt += 1;
        match flow.run(surface, work).await {
            Ok(outcome) => return Ok(outcome),
            Err(e) if e.is_generation_timeout() && attempt <= MAX_GENERATION_RETRIES => {
                warn!(
                    "[{}] ⚠️ 生成超时，整体重跑一次 (第 {} 次尝试): {}",
                    work.date, attempt, e
                );
            }
            Err(e) => return Err(e),
        }
    }
}

/// 关停浏览器
///
/// 先体面 close，限时等子进程退出，不退出就强杀，最后收掉事件任务。
async fn teardown(mut browser: Browser, handler_task: JoinHandle<()>) {
    if let Err(e) = browser.close().await {
        warn!("关闭浏览器失败: {}", e);
    }
    let waited = tokio::time::timeout(CLOSE_GRACE, browser.wait()).await;
    match waited {
        Ok(Ok(_)) => info!("🧹 浏览器已退出"),
        Ok(Err(e)) => {
            warn!("等待浏览器退出出错: {}", e);
            browser.kill().await;
        }
        Err(_) => {
            warn!("浏览器未在 {} 秒内退出，强制结束", CLOSE_GRACE.as_secs());
            browser.kill().await;
        }
    }
    handler_task.abort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::surface::mock::MockSurface;

    fn flow_with(poll_secs: u64, ceiling_secs: u64) -> GenerationFlow {
        let config = Config {
            poll_interval_secs: poll_secs,
            generation_timeout_secs: ceiling_secs,
            ..Config::default()
        };
        GenerationFlow::new(&config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_timeout_retried_exactly_once() {
        // 永不就绪：第一遍超时后整体重跑一遍，仍超时则定格失败
        let flow = flow_with(15, 600);
        let mut surface = MockSurface::never_ready();
        let work = WorkItem::new("文稿", "2026-08-26");

        let result = run_with_retry(&flow, &mut surface, &work).await;

        assert!(matches!(
            result,
            Err(AutomationError::AudioGenerationTimeout { .. })
        ));
        // 两次完整的工作流尝试，不多不少
        assert_eq!(surface.navigations, 2);
        assert_eq!(surface.ingested.len(), 2);
        assert_eq!(surface.downloads, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_needs_no_retry() {
        let flow = flow_with(15, 600);
        let mut surface = MockSurface::cooperative(2);
        let work = WorkItem::new("文稿", "2026-08-26");

        let outcome = run_with_retry(&flow, &mut surface, &work).await.unwrap();

        assert!(outcome.artifact.size_bytes > 0);
        assert_eq!(surface.navigations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_failure_leaves_snapshot() {
        // 默认挡位：轮询 15s / 生成上限 600s / 整体截止 900s。
        // 重试的第二遍会在截止时间处被掐断，此时必须已留下现场截图
        let flow = flow_with(15, 600);
        let mut surface = MockSurface::never_ready();
        let work = WorkItem::new("文稿", "2026-08-26");

        let result =
            attempt_with_deadline(&flow, &mut surface, &work, Duration::from_secs(900)).await;

        match result {
            Err(AutomationError::Browser(BrowserError::DeadlineExceeded { deadline_secs })) => {
                assert_eq!(deadline_secs, 900);
            }
            other => panic!("期望 DeadlineExceeded，实际: {:?}", other.err()),
        }
        // 截止时间打断的是第二次尝试（第一次在 600s 处超时后重跑）
        assert_eq!(surface.navigations, 2);
        assert_eq!(surface.snapshots, vec!["2026-08-26".to_string()]);
    }

    #[tokio::test]
    async fn test_session_expiry_is_not_retried() {
        let flow = flow_with(1, 5);
        let mut surface = MockSurface {
            session_expired: true,
            ..Default::default()
        };
        let work = WorkItem::new("文稿", "2026-08-26");

        let result = run_with_retry(&flow, &mut surface, &work).await;

        assert!(matches!(result, Err(AutomationError::SessionExpired { .. })));
        assert_eq!(surface.navigations, 1);
    }

    #[tokio::test]
    async fn test_selector_failure_is_not_retried() {
        let flow = flow_with(1, 5);
        let mut surface = MockSurface {
            ready_after_polls: Some(0),
            fail_ingest: true,
            ..Default::default()
        };
        let work = WorkItem::new("文稿", "2026-08-26");

        let result = run_with_retry(&flow, &mut surface, &work).await;

        assert!(matches!(result, Err(AutomationError::WorkflowStep { .. })));
        assert_eq!(surface.navigations, 1);
    }
}
