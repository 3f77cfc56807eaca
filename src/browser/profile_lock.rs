//! 会话目录互斥锁
//!
//! 同一个持久化会话目录同时只允许一个浏览器进程使用，并发使用会
//! 损坏登录态。跨运行的互斥通过目录内的锁文件实现：拿不到锁说明
//! 上一次运行的浏览器还没退出，本次运行直接拒绝启动。

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{AutomationError, AutomationResult, BrowserError};

const LOCK_FILE_NAME: &str = ".automation.lock";

/// 会话目录锁
///
/// 正常路径由编排层显式 release()；进程 panic 时由 Drop 兜底删除。
#[derive(Debug)]
pub struct ProfileLock {
    lock_path: PathBuf,
    released: bool,
}

impl ProfileLock {
    /// 尝试获取指定会话目录的锁
    pub fn acquire(profile_dir: &Path) -> AutomationResult<Self> {
        std::fs::create_dir_all(profile_dir)
            .map_err(|e| AutomationError::write_failed(profile_dir.display().to_string(), e))?;
        let lock_path = profile_dir.join(LOCK_FILE_NAME);

        match OpenOptions::new().write(true).create_new(true).open(&lock_path) {
            Ok(mut file) => {
                // 记录持有者 PID，便于人工排查残留锁
                let _ = writeln!(file, "{}", std::process::id());
                debug!("已获取会话目录锁: {}", lock_path.display());
                Ok(Self {
                    lock_path,
                    released: false,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(AutomationError::Browser(BrowserError::ProfileLocked {
                    profile_dir: profile_dir.display().to_string(),
                }))
            }
            Err(e) => Err(AutomationError::write_failed(
                lock_path.display().to_string(),
                e,
            )),
        }
    }

    /// 释放锁
    pub fn release(mut self) {
        self.remove_lock_file();
        self.released = true;
    }

    fn remove_lock_file(&self) {
        if let Err(e) = std::fs::remove_file(&self.lock_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("删除锁文件失败 ({}): {}", self.lock_path.display(), e);
            }
        } else {
            debug!("已释放会话目录锁: {}", self.lock_path.display());
        }
    }
}

impl Drop for ProfileLock {
    fn drop(&mut self) {
        if !self.released {
            self.remove_lock_file();
        }
    }
}
