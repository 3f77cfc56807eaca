//! 会话有效性探测 - 业务能力层
//!
//! 只负责"判断登录态是否还活着"，不负责登录。凭据从不由代码输入，
//! 会话失效只能由人工在有头模式下重新登录解决。

use regex::Regex;
use tracing::info;

use crate::error::{AutomationError, AutomationResult};
use crate::infrastructure::PageDriver;

/// 登录页特征（按声明顺序匹配，命中任意一个即判定会话失效）
const LOGGED_OUT_SIGNATURES: [&str; 3] = [
    r"accounts\.google\.com/v3/signin",
    r"accounts\.google\.com/ServiceLogin",
    r"accounts\.google\.com/o/oauth2",
];

/// 会话探测服务
///
/// 职责：
/// - 对照登录页特征检查当前 URL
/// - 命中即返回 SessionExpired，不在内部重试
pub struct SessionProbe {
    signatures: Vec<Regex>,
}

impl SessionProbe {
    pub fn new() -> Self {
        let signatures = LOGGED_OUT_SIGNATURES
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect();
        Self { signatures }
    }

    /// 检查当前页面是否仍处于已登录状态
    pub async fn verify(&self, driver: &PageDriver) -> AutomationResult<()> {
        let current_url = driver.current_url().await?;
        self.verify_url(&current_url)?;
        info!("✓ 会话有效 (当前 URL: {})", current_url);
        Ok(())
    }

    /// 对照特征列表检查 URL
    pub fn verify_url(&self, url: &str) -> AutomationResult<()> {
        for signature in &self.signatures {
            if signature.is_match(url) {
                return Err(AutomationError::SessionExpired {
                    current_url: url.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Default for SessionProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signin_url_is_expired() {
        let probe = SessionProbe::new();
        let result =
            probe.verify_url("https://accounts.google.com/v3/signin/identifier?continue=x");
        assert!(matches!(result, Err(AutomationError::SessionExpired { .. })));
    }

    #[test]
    fn test_oauth_redirect_is_expired() {
        let probe = SessionProbe::new();
        let result = probe.verify_url("https://accounts.google.com/o/oauth2/v2/auth?x=1");
        assert!(result.is_err());
    }

    #[test]
    fn test_notebook_url_is_live() {
        let probe = SessionProbe::new();
        assert!(probe
            .verify_url("https://notebooklm.google.com/notebook/abc-123")
            .is_ok());
    }

    #[test]
    fn test_expired_error_carries_url() {
        let probe = SessionProbe::new();
        let url = "https://accounts.google.com/ServiceLogin?hl=en";
        match probe.verify_url(url) {
            Err(AutomationError::SessionExpired { current_url }) => {
                assert_eq!(current_url, url);
            }
            other => panic!("期望 SessionExpired，实际: {:?}", other),
        }
    }
}
