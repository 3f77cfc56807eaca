//! 页面驱动 - 基础设施层
//!
//! 持有唯一的 page 资源，只暴露"执行 JS / 导航 / 截图"的能力

use std::path::Path;
use std::time::Duration;

use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::{AutomationError, AutomationResult};

/// 页面驱动
///
/// 职责：
/// - 持有唯一的 Page 资源
/// - 暴露 eval() / goto() / screenshot() 能力
/// - 不认识 WorkItem / WorkflowState
/// - 不处理业务流程
pub struct PageDriver {
    page: Page,
}

impl PageDriver {
    /// 创建新的页面驱动
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> AutomationResult<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(
        &self,
        js_code: impl Into<String>,
    ) -> AutomationResult<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 导航到指定 URL 并等待加载完成
    pub async fn goto(&self, url: &str, timeout: Duration) -> AutomationResult<()> {
        debug!("导航到: {}", url);
        tokio::time::timeout(timeout, async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<_, chromiumoxide::error::CdpError>(())
        })
        .await
        .map_err(|_| {
            AutomationError::navigation_failed(
                url,
                std::io::Error::new(std::io::ErrorKind::TimedOut, "导航超时"),
            )
        })?
        .map_err(|e| AutomationError::navigation_failed(url, e))?;
        Ok(())
    }

    /// 获取当前页面 URL
    pub async fn current_url(&self) -> AutomationResult<String> {
        let url = self.page.url().await?.unwrap_or_default();
        Ok(url)
    }

    /// 截取当前页面保存为 PNG
    pub async fn save_screenshot(&self, path: impl AsRef<Path>) -> AutomationResult<()> {
        self.page
            .save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
            .await?;
        Ok(())
    }
}
