//! 产物下载 - 业务能力层
//!
//! 远端应用没有稳定的带鉴权直链，下载必须走浏览器自身的下载机制：
//! 浏览器的下载行为在启动后被指向暂存目录（CDP Browser.setDownloadBehavior，
//! 见 browser 模块），这里负责点击下载控件、守望暂存目录直到文件落盘
//! 完整，再做体积和文件头校验后归档。

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::error::{AutomationError, AutomationResult, DownloadError};
use crate::models::{Artifact, AudioFormat};
use crate::services::locator::{LocatorSpec, ResilientLocator};

/// 目录守望的轮询步长
const WATCH_STEP: Duration = Duration::from_millis(500);

/// 产物下载服务
///
/// 职责：
/// - 经定位器点击下载控件（菜单路径优先，直接按钮兜底）
/// - 守望暂存目录直到新文件出现且体积稳定
/// - 校验体积与文件头，归档到成品目录
pub struct ArtifactRetriever {
    download_dir: PathBuf,
    episode_dir: PathBuf,
    download_timeout: Duration,
}

impl ArtifactRetriever {
    pub fn new(
        download_dir: impl Into<PathBuf>,
        episode_dir: impl Into<PathBuf>,
        download_timeout: Duration,
    ) -> Self {
        Self {
            download_dir: download_dir.into(),
            episode_dir: episode_dir.into(),
            download_timeout,
        }
    }

    /// 下载并校验产物
    pub async fn retrieve(
        &self,
        locator: &ResilientLocator<'_>,
        date: &str,
    ) -> AutomationResult<Artifact> {
        info!("⬇️ 下载音频产物...");
        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| {
                AutomationError::write_failed(self.download_dir.display().to_string(), e)
            })?;

        let before = self.list_files().await?;

        self.click_download(locator).await?;

        let downloaded = self.wait_for_download(&before).await?;
        let artifact = self.validate_and_store(&downloaded, date).await?;

        info!(
            "✓ 产物已归档: {} ({:.1} MB)",
            artifact.path.display(),
            artifact.size_bytes as f64 / (1024.0 * 1024.0)
        );
        Ok(artifact)
    }

    /// 点击下载控件：先走播放器菜单，菜单路径全失败再试直接按钮
    async fn click_download(&self, locator: &ResilientLocator<'_>) -> AutomationResult<()> {
        let more_spec = LocatorSpec::new("播放器菜单按钮")
            .aria("More options")
            .aria("more_vert")
            .css(".audio-player button[aria-label='More']")
            .css("artifact-library button[aria-label='More options']");

        match locator.click(&more_spec).await {
            Ok(()) => {
                sleep(Duration::from_millis(500)).await;
                let menu_item_spec = LocatorSpec::new("下载菜单项")
                    .text("[role='menuitem']", "Download")
                    .text("button", "Download")
                    .aria("Download");
                locator.click(&menu_item_spec).await?;
            }
            Err(AutomationError::SelectorNotFound { .. }) => {
                debug!("菜单路径未命中，尝试直接下载按钮");
                let direct_spec = LocatorSpec::new("下载按钮")
                    .text("button", "Download")
                    .aria("Download")
                    .css("a[download]")
                    .aria("Download audio");
                locator.click(&direct_spec).await?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    /// 守望暂存目录，等一个新文件出现并写完
    ///
    /// "写完"的判据：不带 .crdownload / .tmp 后缀，且连续两次探测体积不变。
    async fn wait_for_download(&self, before: &HashSet<PathBuf>) -> AutomationResult<PathBuf> {
        let deadline = Instant::now() + self.download_timeout;
        let mut last_size: Option<(PathBuf, u64)> = None;

        loop {
            for path in self.list_files().await? {
                if before.contains(&path) {
                    continue;
                }
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
                if ext == "crdownload" || ext == "tmp" {
                    continue;
                }

                let size = tokio::fs::metadata(&path)
                    .await
                    .map_err(|e| AutomationError::read_failed(path.display().to_string(), e))?
                    .len();
                match &last_size {
                    Some((seen, seen_size)) if *seen == path && *seen_size == size => {
                        return Ok(path);
                    }
                    _ => {
                        last_size = Some((path, size));
                    }
                }
            }

            if Instant::now() + WATCH_STEP > deadline {
                return Err(AutomationError::Download(DownloadError::Timeout {
                    waited_secs: self.download_timeout.as_secs(),
                }));
            }
            sleep(WATCH_STEP).await;
        }
    }

    /// 校验并归档：非零体积 + 可识别文件头，然后移入成品目录
    async fn validate_and_store(&self, path: &Path, date: &str) -> AutomationResult<Artifact> {
        let size_bytes = tokio::fs::metadata(path)
            .await
            .map_err(|e| AutomationError::read_failed(path.display().to_string(), e))?
            .len();
        if size_bytes == 0 {
            return Err(AutomationError::Download(DownloadError::EmptyFile {
                path: path.display().to_string(),
            }));
        }

        let mut header = [0u8; 12];
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| AutomationError::read_failed(path.display().to_string(), e))?;
        let len = content.len().min(12);
        header[..len].copy_from_slice(&content[..len]);

        let format = AudioFormat::sniff(&header[..len]).ok_or_else(|| {
            AutomationError::Download(DownloadError::UnrecognizedFormat {
                path: path.display().to_string(),
            })
        })?;

        tokio::fs::create_dir_all(&self.episode_dir)
            .await
            .map_err(|e| {
                AutomationError::write_failed(self.episode_dir.display().to_string(), e)
            })?;
        let target = self
            .episode_dir
            .join(format!("episode-{}.{}", date, format.extension()));

        if let Err(e) = tokio::fs::rename(path, &target).await {
            // 跨文件系统时 rename 不可用，退化为复制后删除
            debug!("rename 失败 ({}), 改用复制", e);
            tokio::fs::copy(path, &target).await.map_err(|e| {
                AutomationError::Download(DownloadError::MoveFailed {
                    from: path.display().to_string(),
                    to: target.display().to_string(),
                    source: Box::new(e),
                })
            })?;
            let _ = tokio::fs::remove_file(path).await;
        }

        Ok(Artifact {
            path: target,
            size_bytes,
            format,
        })
    }

    async fn list_files(&self) -> AutomationResult<HashSet<PathBuf>> {
        let dir = self.download_dir.display().to_string();
        let mut files = HashSet::new();
        let mut entries = tokio::fs::read_dir(&self.download_dir)
            .await
            .map_err(|e| AutomationError::read_failed(dir.clone(), e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AutomationError::read_failed(dir.clone(), e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| AutomationError::read_failed(dir.clone(), e))?;
            if file_type.is_file() {
                files.insert(entry.path());
            }
        }
        Ok(files)
    }
}
