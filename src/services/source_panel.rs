//! 来源面板操作 - 业务能力层
//!
//! 负责两件事：清空上一次运行遗留的来源，和把新文稿经纯文本入口
//! 摄入。选择纯文本入口而不是文件上传，是因为它的 UI 步骤更少、
//! 需要维护的定位器也就更少。

use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{AutomationError, AutomationResult};
use crate::services::locator::{LocatorSpec, ResilientLocator};

/// 单次运行最多清理的来源条目数
const MAX_SOURCES_TO_CLEAR: usize = 20;

/// 来源面板服务
///
/// 职责：
/// - 清空已有来源（幂等：没有可清的也算成功）
/// - 经纯文本入口摄入文稿
/// - 不做截断决策（截断在工作流层完成并记录）
pub struct SourcePanel;

impl SourcePanel {
    pub fn new() -> Self {
        Self
    }

    /// 清空所有已有来源
    ///
    /// 逐条删除第一个可见的来源条目，直到探测不到为止。
    /// 返回删除的条目数；一条都没有时返回 0，同样视为成功。
    pub async fn clear_sources(&self, locator: &ResilientLocator<'_>) -> AutomationResult<usize> {
        info!("🧹 清理已有来源...");

        let entry_spec = LocatorSpec::new("来源条目")
            .css("source-entry")
            .css("[data-source-entry]")
            .css(".source-list-view source-entry");

        let mut cleared = 0usize;
        for _ in 0..MAX_SOURCES_TO_CLEAR {
            if !locator.exists(&entry_spec).await? {
                break;
            }

            match self.delete_first_source(locator).await {
                Ok(()) => {
                    cleared += 1;
                    sleep(Duration::from_millis(500)).await;
                }
                Err(AutomationError::SelectorNotFound { .. }) => {
                    // 条目还在但删除控件找不到：放弃清理，让后续步骤继续
                    warn!("⚠️ 找不到来源的删除控件，跳过剩余清理");
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        info!("✓ 来源清理完成 (删除 {} 条)", cleared);
        Ok(cleared)
    }

    /// 删除第一个来源条目：打开条目菜单 → 点删除 → 确认弹窗（如有）
    async fn delete_first_source(&self, locator: &ResilientLocator<'_>) -> AutomationResult<()> {
        let more_spec = LocatorSpec::new("来源条目菜单按钮")
            .css("source-entry button[aria-label='More options']")
            .css("source-entry button[aria-label='Delete source']")
            .css("source-entry .more-button")
            .css("source-entry button:last-child");
        locator.click(&more_spec).await?;
        sleep(Duration::from_millis(500)).await;

        let delete_spec = LocatorSpec::new("删除菜单项")
            .text("[role='menuitem']", "Delete")
            .text("button", "Delete")
            .aria("Delete");
        locator.click(&delete_spec).await?;
        sleep(Duration::from_millis(500)).await;

        // 确认弹窗不一定出现，出现了才点
        let confirm_spec = LocatorSpec::new("删除确认按钮")
            .text("button", "Delete")
            .text("button", "Confirm")
            .text("button", "Remove");
        if locator.exists(&confirm_spec).await? {
            locator.click(&confirm_spec).await?;
            sleep(Duration::from_secs(1)).await;
        }

        Ok(())
    }

    /// 经纯文本入口摄入文稿
    ///
    /// 入参应当已完成截断；本方法只负责 UI 交互。
    pub async fn ingest_text(
        &self,
        locator: &ResilientLocator<'_>,
        text: &str,
    ) -> AutomationResult<()> {
        info!("📝 摄入文稿 ({} 字符)...", text.chars().count());

        let add_spec = LocatorSpec::new("添加来源按钮")
            .text("button", "Add source")
            .text("button", "Add")
            .aria("Add source")
            .css(".add-source-button")
            .css("button.add-source");
        locator.click(&add_spec).await?;
        sleep(Duration::from_secs(1)).await;

        let text_option_spec = LocatorSpec::new("纯文本来源选项")
            .text("button", "Copied text")
            .text("button", "Text")
            .aria("Copied text")
            .css("[data-source-type='text']")
            .text("div", "Copied text");
        locator.click(&text_option_spec).await?;
        sleep(Duration::from_secs(1)).await;

        let input_spec = LocatorSpec::new("文本输入区")
            .css("textarea")
            .css("[contenteditable='true']")
            .css("div[role='textbox']")
            .css(".text-input textarea");
        locator.fill(&input_spec, text).await?;
        sleep(Duration::from_secs(1)).await;

        let submit_spec = LocatorSpec::new("插入按钮")
            .text("button", "Insert")
            .text("button", "Add")
            .text("button", "Save")
            .text("button", "Submit")
            .css("button[type='submit']");
        locator.click(&submit_spec).await?;
        sleep(Duration::from_secs(2)).await;

        info!("✓ 文稿已摄入");
        Ok(())
    }
}

impl Default for SourcePanel {
    fn default() -> Self {
        Self::new()
    }
}
