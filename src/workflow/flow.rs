//! 生成工作流 - 流程层
//!
//! 核心职责：把"一份文稿到一个音频产物"的完整流程编排成显式的
//! 状态推进序列
//!
//! 流程顺序：
//! 1. 打开文档页 → 校验登录态
//! 2. 清空旧来源 → 摄入新文稿（超限先截断并记录）
//! 3. 触发生成 → 按固定间隔轮询完成信号（有上限）
//! 4. 下载产物 → 校验归档
//!
//! 定位失败一律带着失败时的状态名上抛并留下现场截图——界面改版
//! 造成的失败盲目重试只会烧掉轮询预算。

use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AutomationError, AutomationResult};
use crate::models::{GenerationOutcome, WorkItem};
use crate::workflow::state::WorkflowState;
use crate::workflow::surface::NotebookSurface;

/// 生成工作流状态机
///
/// - 编排完整的"摄入 → 生成 → 下载"流程
/// - 状态显式传递，只向前推进；恢复靠编排层整体重跑
/// - 不持有任何资源（浏览器、页面都在编排层）
pub struct GenerationFlow {
    poll_interval: Duration,
    generation_timeout: Duration,
    max_source_chars: usize,
}

impl GenerationFlow {
    /// 创建新的生成工作流
    pub fn new(config: &Config) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            generation_timeout: Duration::from_secs(config.generation_timeout_secs),
            max_source_chars: config.max_source_chars,
        }
    }

    /// 驱动一次完整的生成流程
    pub async fn run<S: NotebookSurface>(
        &self,
        surface: &mut S,
        work: &WorkItem,
    ) -> AutomationResult<GenerationOutcome> {
        let mut state = WorkflowState::Idle;

        // ========== Idle → Navigated ==========
        let result = surface.navigate().await;
        self.guard(surface, work, state, result).await?;
        state = WorkflowState::Navigated;
        info!("[{}] 状态: {}", work.date, state);

        // 会话判定必须在任何文档变更之前；失效则一个工作流步骤都不执行
        let result = surface.verify_session().await;
        self.guard(surface, work, state, result).await?;

        // ========== Navigated → SourcesCleared ==========
        let result = surface.clear_sources().await;
        let cleared = self.guard(surface, work, state, result).await?;
        state = WorkflowState::SourcesCleared;
        info!("[{}] 状态: {} (清除 {} 条旧来源)", work.date, state, cleared);

        // ========== SourcesCleared → SourceIngested ==========
        let (text, ingest) = work.truncated_text(self.max_source_chars);
        if ingest.truncated {
            warn!(
                "[{}] ⚠️ 文稿超限，已从 {} 字符截断到 {} 字符",
                work.date, ingest.original_chars, ingest.submitted_chars
            );
        }
        let result = surface.ingest_text(&text).await;
        self.guard(surface, work, state, result).await?;
        state = WorkflowState::SourceIngested;
        info!("[{}] 状态: {}", work.date, state);

        // ========== SourceIngested → GenerationTriggered ==========
        let result = surface.trigger_generation().await;
        self.guard(surface, work, state, result).await?;
        state = WorkflowState::GenerationTriggered;
        info!("[{}] 状态: {}", work.date, state);

        // ========== GenerationTriggered → GenerationPending → GenerationReady ==========
        state = WorkflowState::GenerationPending;
        self.poll_until_ready(surface, work, state).await?;
        state = WorkflowState::GenerationReady;
        info!("[{}] 状态: {}", work.date, state);

        // ========== GenerationReady → Downloaded ==========
        let result = surface.download(&work.date).await;
        let artifact = self.guard(surface, work, state, result).await?;
        state = WorkflowState::Downloaded;
        info!("[{}] 状态: {}", work.date, state);

        state = WorkflowState::Done;
        info!(
            "[{}] ✅ 状态: {} ({}, {:.1} MB)",
            work.date,
            state,
            artifact.path.display(),
            artifact.size_bytes as f64 / (1024.0 * 1024.0)
        );

        Ok(GenerationOutcome { artifact, ingest })
    }

    /// 轮询完成信号
    ///
    /// 远端没有推送式完成信号，只能按固定间隔观察界面状态。第一次
    /// 观察到就绪立即返回；超过上限抛 AudioGenerationTimeout（由
    /// 编排层决定是否整体重跑一次）。
    async fn poll_until_ready<S: NotebookSurface>(
        &self,
        surface: &mut S,
        work: &WorkItem,
        state: WorkflowState,
    ) -> AutomationResult<()> {
        info!(
            "[{}] ⏳ 等待生成完成 (间隔 {}s, 上限 {}s)...",
            work.date,
            self.poll_interval.as_secs(),
            self.generation_timeout.as_secs()
        );

        let mut elapsed = Duration::ZERO;
        loop {
            let result = surface.generation_ready().await;
            if self.guard(surface, work, state, result).await? {
                info!(
                    "[{}] ✓ 生成完成 (等待 {}s)",
                    work.date,
                    elapsed.as_secs()
                );
                return Ok(());
            }

            // 远端可能静默失败并留下错误文案，等满上限毫无意义
            let result = surface.check_failure_notice().await;
            self.guard(surface, work, state, result).await?;

            if elapsed >= self.generation_timeout {
                return Err(AutomationError::AudioGenerationTimeout {
                    waited_secs: elapsed.as_secs(),
                });
            }

            sleep(self.poll_interval).await;
            elapsed += self.poll_interval;
            if elapsed.as_secs() % 60 == 0 {
                info!("[{}] 仍在生成... (已等待 {}s)", work.date, elapsed.as_secs());
            }
        }
    }

    /// 步骤结果守卫
    ///
    /// 定位失败：留下现场截图，换包成携带状态名的 WorkflowStep。
    /// 会话失效 / 生成超时等其余错误原样上抛，由上层分别处置。
    async fn guard<S: NotebookSurface, T>(
        &self,
        surface: &mut S,
        work: &WorkItem,
        state: WorkflowState,
        result: AutomationResult<T>,
    ) -> AutomationResult<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e @ AutomationError::SelectorNotFound { .. }) => {
                warn!("[{}] ❌ {} 状态下定位失败: {}", work.date, state, e);
                if let Some(path) = surface.capture_snapshot(&work.date).await {
                    info!("[{}] 现场截图: {}", work.date, path.display());
                }
                Err(AutomationError::at_state(state, e))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::surface::mock::MockSurface;

    fn flow() -> GenerationFlow {
        let config = Config {
            poll_interval_secs: 15,
            generation_timeout_secs: 600,
            max_source_chars: 100_000,
            ..Config::default()
        };
        GenerationFlow::new(&config)
    }

    fn work_item_of_words(words: usize) -> WorkItem {
        let text = vec!["word"; words].join(" ");
        WorkItem::new(text, "2026-08-26")
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooperative_surface_yields_artifact() {
        // 500 词文稿 + 第 3 轮之后就绪的模拟界面
        let mut surface = MockSurface::cooperative(3);
        let work = work_item_of_words(500);

        let started = tokio::time::Instant::now();
        let outcome = flow().run(&mut surface, &work).await.unwrap();
        let elapsed = started.elapsed();

        assert!(outcome.artifact.size_bytes > 0);
        assert!(!outcome.ingest.truncated);
        assert_eq!(surface.downloads, 1);
        // 4 次探测内返回（第 4 次命中），耗时不超过 4 个轮询间隔
        assert_eq!(surface.polls, 4);
        assert!(elapsed <= Duration::from_secs(15 * 4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_ready_times_out_at_ceiling() {
        let mut surface = MockSurface::never_ready();
        let work = work_item_of_words(100);

        let result = flow().run(&mut surface, &work).await;
        match result {
            Err(AutomationError::AudioGenerationTimeout { waited_secs }) => {
                assert_eq!(waited_secs, 600);
            }
            other => panic!("期望 AudioGenerationTimeout，实际: {:?}", other.err()),
        }
        // 超时后不应有下载动作
        assert_eq!(surface.downloads, 0);
    }

    #[tokio::test]
    async fn test_oversized_text_is_truncated_and_reported() {
        let mut surface = MockSurface::cooperative(0);
        let config = Config {
            max_source_chars: 50,
            poll_interval_secs: 1,
            generation_timeout_secs: 5,
            ..Config::default()
        };
        let flow = GenerationFlow::new(&config);
        let work = WorkItem::new("x".repeat(200), "2026-08-26");

        let outcome = flow.run(&mut surface, &work).await.unwrap();

        assert!(outcome.ingest.truncated);
        assert_eq!(outcome.ingest.submitted_chars, 50);
        assert_eq!(outcome.ingest.original_chars, 200);
        // 提交给界面的就是截断后的文本
        assert_eq!(surface.ingested[0].chars().count(), 50);
    }

    #[tokio::test]
    async fn test_expired_session_stops_before_any_mutation() {
        let mut surface = MockSurface {
            session_expired: true,
            ..Default::default()
        };
        let work = work_item_of_words(10);

        let result = flow().run(&mut surface, &work).await;
        assert!(matches!(result, Err(AutomationError::SessionExpired { .. })));
        // 会话失效后不允许执行任何文档变更步骤
        assert_eq!(surface.cleared_calls, 0);
        assert!(surface.ingested.is_empty());
        assert_eq!(surface.downloads, 0);
    }

    #[tokio::test]
    async fn test_selector_failure_carries_state_and_snapshots() {
        let mut surface = MockSurface {
            ready_after_polls: Some(0),
            fail_ingest: true,
            ..Default::default()
        };
        let work = work_item_of_words(10);

        let result = flow().run(&mut surface, &work).await;
        match result {
            Err(AutomationError::WorkflowStep { state, source }) => {
                // 摄入发生在 SourcesCleared 之后、SourceIngested 之前
                assert_eq!(state, WorkflowState::SourcesCleared);
                assert!(matches!(
                    *source,
                    AutomationError::SelectorNotFound { .. }
                ));
            }
            other => panic!("期望 WorkflowStep，实际: {:?}", other.err()),
        }
        assert_eq!(surface.snapshots, vec!["2026-08-26".to_string()]);
    }

    #[tokio::test]
    async fn test_step_order_is_forward_only() {
        let mut surface = MockSurface::cooperative(0);
        let work = work_item_of_words(10);

        flow().run(&mut surface, &work).await.unwrap();

        let non_poll: Vec<&str> = surface
            .ops
            .iter()
            .copied()
            .filter(|op| *op != "poll")
            .collect();
        assert_eq!(
            non_poll,
            vec![
                "navigate",
                "verify_session",
                "clear_sources",
                "ingest_text",
                "trigger_generation",
                "download"
            ]
        );
    }
}
