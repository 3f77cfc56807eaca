//! 失败现场截图 - 业务能力层
//!
//! 只负责"把当前页面截图存盘"能力。失败截图按工作单元日期命名，
//! 是本引擎除产物之外唯一落盘的状态，供离线排查界面改版用。

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::{AutomationError, AutomationResult};
use crate::infrastructure::PageDriver;

/// 失败截图服务
pub struct SnapshotWriter {
    debug_dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(debug_dir: impl Into<PathBuf>) -> Self {
        Self {
            debug_dir: debug_dir.into(),
        }
    }

    /// 截取当前页面，命名为 error-<date>.png
    pub async fn capture(&self, driver: &PageDriver, date: &str) -> AutomationResult<PathBuf> {
        tokio::fs::create_dir_all(&self.debug_dir)
            .await
            .map_err(|e| AutomationError::write_failed(self.debug_dir.display().to_string(), e))?;
        let path = self.debug_dir.join(format!("error-{}.png", date));
        driver.save_screenshot(&path).await?;
        debug!("已保存失败截图: {}", path.display());
        Ok(path)
    }

    /// 尽力截图：失败只记日志，不影响原始错误的上抛
    pub async fn capture_best_effort(&self, driver: &PageDriver, date: &str) -> Option<PathBuf> {
        match self.capture(driver, date).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("⚠️ 保存失败截图失败: {}", e);
                None
            }
        }
    }
}
