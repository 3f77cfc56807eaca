//! 音频工作室操作 - 业务能力层
//!
//! 负责触发音频生成，以及提供"生成好了没有"的单次探测。远端没有
//! 任何推送式完成信号，轮询循环放在工作流层，这里只回答一次探测。

use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{AutomationError, AutomationResult};
use crate::services::locator::{LocatorSpec, ResilientLocator};

/// 音频工作室服务
///
/// 职责：
/// - 进入音频生成入口并点击生成
/// - 单次探测完成信号（播放控件出现）
/// - 单次探测页面内的失败提示
pub struct AudioStudio;

impl AudioStudio {
    pub fn new() -> Self {
        Self
    }

    /// 触发音频生成
    pub async fn trigger_generation(&self, locator: &ResilientLocator<'_>) -> AutomationResult<()> {
        info!("🎙️ 触发音频生成...");

        let studio_spec = LocatorSpec::new("音频生成入口")
            .text("button", "Audio Overview")
            .text("button", "Notebook guide")
            .aria("Audio Overview")
            .css(".notebook-guide-button");
        locator.click(&studio_spec).await?;
        sleep(Duration::from_secs(2)).await;

        let generate_spec = LocatorSpec::new("生成按钮")
            .text("button", "Generate")
            .text("button", "Create")
            .aria("Generate")
            .text("button", "Deep Dive");
        locator.click(&generate_spec).await?;
        sleep(Duration::from_secs(2)).await;

        info!("✓ 生成已触发");
        Ok(())
    }

    /// 单次探测生成是否完成
    ///
    /// 播放控件或音频播放器出现即视为完成；未出现不算错误。
    pub async fn is_ready(&self, locator: &ResilientLocator<'_>) -> AutomationResult<bool> {
        let ready_spec = Self::ready_spec();
        locator.exists(&ready_spec).await
    }

    /// 单次探测页面内的失败提示
    ///
    /// 远端偶尔会静默失败并在页面上留下错误文案；一旦出现就没有
    /// 继续等的意义，立即结束本次运行。
    pub async fn check_failure_notice(
        &self,
        locator: &ResilientLocator<'_>,
    ) -> AutomationResult<()> {
        let failure_spec = LocatorSpec::new("生成失败提示")
            .text("body *", "error")
            .text("body *", "failed")
            .text("body *", "try again");
        if locator.exists(&failure_spec).await? {
            let notice = locator
                .read_text(&failure_spec)
                .await
                .unwrap_or_else(|_| "(未能读取提示文案)".to_string());
            warn!("⚠️ 页面出现生成失败提示: {}", notice);
            return Err(AutomationError::Other(format!(
                "远端应用报告音频生成失败: {}",
                notice
            )));
        }
        Ok(())
    }

    /// 完成信号的定位说明
    pub fn ready_spec() -> LocatorSpec {
        LocatorSpec::new("播放控件")
            .aria("Play")
            .aria("play_arrow")
            .aria("Play audio")
            .css("audio")
            .css(".audio-player button")
    }
}

impl Default for AudioStudio {
    fn default() -> Self {
        Self::new()
    }
}
