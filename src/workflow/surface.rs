//! 远端界面抽象
//!
//! 工作流只认识"远端界面能做哪些动作"，不认识页面驱动的细节。
//! 这层缝隙让状态机可以在没有浏览器的环境下对着模拟界面跑完整流程。

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::sleep;
use tracing::info;

use crate::config::Config;
use crate::error::AutomationResult;
use crate::infrastructure::PageDriver;
use crate::models::Artifact;
use crate::services::{
    ArtifactRetriever, AudioStudio, ResilientLocator, SessionProbe, SnapshotWriter, SourcePanel,
};

/// 远端应用首页（未配置笔记本 URL 时的落点）
const APP_HOME_URL: &str = "https://notebooklm.google.com";

/// 远端界面能力集合
///
/// 每个方法对应工作流的一次交互；实现方自行决定交互怎么落到页面上。
/// 不需要对象安全，工作流以泛型方式持有实现。
#[allow(async_fn_in_trait)]
pub trait NotebookSurface {
    /// 打开目标文档页面
    async fn navigate(&mut self) -> AutomationResult<()>;
    /// 校验登录态（失效返回 SessionExpired）
    async fn verify_session(&mut self) -> AutomationResult<()>;
    /// 幂等清空已有来源，返回删除条数
    async fn clear_sources(&mut self) -> AutomationResult<usize>;
    /// 经纯文本入口摄入文稿（入参已截断）
    async fn ingest_text(&mut self, text: &str) -> AutomationResult<()>;
    /// 触发音频生成
    async fn trigger_generation(&mut self) -> AutomationResult<()>;
    /// 单次探测生成是否完成
    async fn generation_ready(&mut self) -> AutomationResult<bool>;
    /// 单次探测页面内的失败提示
    async fn check_failure_notice(&mut self) -> AutomationResult<()>;
    /// 下载并校验产物
    async fn download(&mut self, date: &str) -> AutomationResult<Artifact>;
    /// 尽力保存失败现场截图
    async fn capture_snapshot(&mut self, date: &str) -> Option<PathBuf>;
}

/// 真实页面上的远端界面实现
///
/// 把各业务能力服务拼成工作流需要的动作集合；定位器按调用创建，
/// 统一使用配置的单策略等待时间。
pub struct LiveSurface<'a> {
    driver: &'a PageDriver,
    notebook_url: String,
    navigation_timeout: Duration,
    element_timeout: Duration,
    probe: SessionProbe,
    panel: SourcePanel,
    studio: AudioStudio,
    retriever: ArtifactRetriever,
    snapshot: SnapshotWriter,
}

impl<'a> LiveSurface<'a> {
    pub fn new(driver: &'a PageDriver, config: &Config) -> Self {
        Self {
            driver,
            notebook_url: config.notebook_url.clone(),
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            element_timeout: Duration::from_secs(config.element_timeout_secs),
            probe: SessionProbe::new(),
            panel: SourcePanel::new(),
            studio: AudioStudio::new(),
            retriever: ArtifactRetriever::new(
                &config.download_dir,
                &config.episode_dir,
                Duration::from_secs(config.download_timeout_secs),
            ),
            snapshot: SnapshotWriter::new(&config.debug_dir),
        }
    }

    fn locator(&self) -> ResilientLocator<'_> {
        ResilientLocator::new(self.driver, self.element_timeout)
    }
}

impl NotebookSurface for LiveSurface<'_> {
    async fn navigate(&mut self) -> AutomationResult<()> {
        let url = if self.notebook_url.is_empty() {
            APP_HOME_URL
        } else {
            &self.notebook_url
        };
        info!("🌐 打开 {}", url);
        self.driver.goto(url, self.navigation_timeout).await?;
        // 页面渲染需要一点时间，等它稳定再做会话判定
        sleep(Duration::from_secs(2)).await;
        Ok(())
    }

    async fn verify_session(&mut self) -> AutomationResult<()> {
        self.probe.verify(self.driver).await
    }

    async fn clear_sources(&mut self) -> AutomationResult<usize> {
        self.panel.clear_sources(&self.locator()).await
    }

    async fn ingest_text(&mut self, text: &str) -> AutomationResult<()> {
        self.panel.ingest_text(&self.locator(), text).await?;
        // 等远端处理完来源，再进入生成步骤
        sleep(Duration::from_secs(3)).await;
        Ok(())
    }

    async fn trigger_generation(&mut self) -> AutomationResult<()> {
        self.studio.trigger_generation(&self.locator()).await
    }

    async fn generation_ready(&mut self) -> AutomationResult<bool> {
        self.studio.is_ready(&self.locator()).await
    }

    async fn check_failure_notice(&mut self) -> AutomationResult<()> {
        self.studio.check_failure_notice(&self.locator()).await
    }

    async fn download(&mut self, date: &str) -> AutomationResult<Artifact> {
        self.retriever.retrieve(&self.locator(), date).await
    }

    async fn capture_snapshot(&mut self, date: &str) -> Option<PathBuf> {
        self.snapshot.capture_best_effort(self.driver, date).await
    }
}

/// 模拟远端界面
///
/// 没有浏览器的环境下验证状态机行为用；可配置成完全配合、永不就绪
/// 或在指定步骤上出错。
#[cfg(test)]
pub(crate) mod mock {
    use std::path::PathBuf;

    use super::NotebookSurface;
    use crate::error::{AutomationError, AutomationResult};
    use crate::models::{Artifact, AudioFormat};

    #[derive(Default)]
    pub(crate) struct MockSurface {
        /// 第几次探测开始返回就绪（None = 永不就绪）
        pub ready_after_polls: Option<usize>,
        /// 摄入步骤是否抛定位失败
        pub fail_ingest: bool,
        /// 会话是否已失效
        pub session_expired: bool,
        // 调用记录
        pub navigations: usize,
        pub session_checks: usize,
        pub cleared_calls: usize,
        pub ingested: Vec<String>,
        pub polls: usize,
        pub downloads: usize,
        pub snapshots: Vec<String>,
        pub ops: Vec<&'static str>,
    }

    impl MockSurface {
        pub fn cooperative(ready_after_polls: usize) -> Self {
            Self {
                ready_after_polls: Some(ready_after_polls),
                ..Default::default()
            }
        }

        pub fn never_ready() -> Self {
            Self {
                ready_after_polls: None,
                ..Default::default()
            }
        }
    }

    impl NotebookSurface for MockSurface {
        async fn navigate(&mut self) -> AutomationResult<()> {
            self.navigations += 1;
            self.ops.push("navigate");
            Ok(())
        }

        async fn verify_session(&mut self) -> AutomationResult<()> {
            self.session_checks += 1;
            self.ops.push("verify_session");
            if self.session_expired {
                return Err(AutomationError::SessionExpired {
                    current_url: "https://accounts.google.com/v3/signin/identifier".to_string(),
                });
            }
            Ok(())
        }

        async fn clear_sources(&mut self) -> AutomationResult<usize> {
            self.cleared_calls += 1;
            self.ops.push("clear_sources");
            Ok(0)
        }

        async fn ingest_text(&mut self, text: &str) -> AutomationResult<()> {
            self.ops.push("ingest_text");
            if self.fail_ingest {
                return Err(AutomationError::selector_not_found(
                    "文本输入区",
                    vec!["css:textarea".to_string()],
                ));
            }
            self.ingested.push(text.to_string());
            Ok(())
        }

        async fn trigger_generation(&mut self) -> AutomationResult<()> {
            self.ops.push("trigger_generation");
            Ok(())
        }

        async fn generation_ready(&mut self) -> AutomationResult<bool> {
            self.polls += 1;
            self.ops.push("poll");
            Ok(match self.ready_after_polls {
                Some(n) => self.polls > n,
                None => false,
            })
        }

        async fn check_failure_notice(&mut self) -> AutomationResult<()> {
            Ok(())
        }

        async fn download(&mut self, date: &str) -> AutomationResult<Artifact> {
            self.downloads += 1;
            self.ops.push("download");
            Ok(Artifact {
                path: PathBuf::from(format!("episode-{}.mp3", date)),
                size_bytes: 2_048_000,
                format: AudioFormat::Mp3,
            })
        }

        async fn capture_snapshot(&mut self, date: &str) -> Option<PathBuf> {
            self.snapshots.push(date.to_string());
            Some(PathBuf::from(format!("error-{}.png", date)))
        }
    }
}
