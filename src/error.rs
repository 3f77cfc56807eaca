use std::fmt;

use crate::workflow::WorkflowState;

/// 自动化引擎错误类型
///
/// 除生成超时（编排层内部重试一次）外，所有错误都原样上抛给调用方。
#[derive(Debug)]
pub enum AutomationError {
    /// 浏览器相关错误
    Browser(BrowserError),
    /// 文件操作错误
    File(FileError),
    /// 登录会话已失效（需要人工重新登录，不重试）
    SessionExpired {
        current_url: String,
    },
    /// 定位器的所有策略都未命中（通常意味着远端界面改版）
    SelectorNotFound {
        description: String,
        strategies: Vec<String>,
    },
    /// 音频生成超过轮询上限
    AudioGenerationTimeout {
        waited_secs: u64,
    },
    /// 下载产物校验失败
    Download(DownloadError),
    /// 工作流在某个状态上失败（携带失败时的状态名）
    WorkflowStep {
        state: WorkflowState,
        source: Box<AutomationError>,
    },
    /// 其他错误（用于包装第三方库错误）
    Other(String),
}

impl fmt::Display for AutomationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutomationError::Browser(e) => write!(f, "浏览器错误: {}", e),
            AutomationError::File(e) => write!(f, "文件错误: {}", e),
            AutomationError::SessionExpired { current_url } => {
                write!(
                    f,
                    "登录会话已失效，请在有头模式下手动重新登录 (当前 URL: {})",
                    current_url
                )
            }
            AutomationError::SelectorNotFound {
                description,
                strategies,
            } => {
                write!(
                    f,
                    "未能定位到 {} (已尝试全部 {} 个策略: {:?})",
                    description,
                    strategies.len(),
                    strategies
                )
            }
            AutomationError::AudioGenerationTimeout { waited_secs } => {
                write!(f, "音频生成超时 (已等待 {} 秒)", waited_secs)
            }
            AutomationError::Download(e) => write!(f, "下载错误: {}", e),
            AutomationError::WorkflowStep { state, source } => {
                write!(f, "工作流在 {} 状态失败: {}", state, source)
            }
            AutomationError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for AutomationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AutomationError::Browser(e) => Some(e),
            AutomationError::File(e) => Some(e),
            AutomationError::Download(e) => Some(e),
            AutomationError::WorkflowStep { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// 浏览器相关错误
#[derive(Debug)]
pub enum BrowserError {
    /// 启动浏览器失败
    LaunchFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 浏览器配置失败
    ConfigurationFailed {
        message: String,
    },
    /// 导航失败
    NavigationFailed {
        url: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 执行脚本失败
    ScriptExecutionFailed {
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 会话目录已被占用（上一次运行的浏览器尚未退出）
    ProfileLocked {
        profile_dir: String,
    },
    /// 整体截止时间已到
    DeadlineExceeded {
        deadline_secs: u64,
    },
}

impl fmt::Display for BrowserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserError::LaunchFailed { source } => {
                write!(f, "启动浏览器失败: {}", source)
            }
            BrowserError::ConfigurationFailed { message } => {
                write!(f, "浏览器配置失败: {}", message)
            }
            BrowserError::NavigationFailed { url, source } => {
                write!(f, "导航到 {} 失败: {}", url, source)
            }
            BrowserError::ScriptExecutionFailed { source } => {
                write!(f, "执行脚本失败: {}", source)
            }
            BrowserError::ProfileLocked { profile_dir } => {
                write!(
                    f,
                    "会话目录被占用 ({}), 请确认上一次运行的浏览器已退出",
                    profile_dir
                )
            }
            BrowserError::DeadlineExceeded { deadline_secs } => {
                write!(f, "整体运行超过截止时间 ({} 秒)", deadline_secs)
            }
        }
    }
}

impl std::error::Error for BrowserError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BrowserError::LaunchFailed { source }
            | BrowserError::NavigationFailed { source, .. }
            | BrowserError::ScriptExecutionFailed { source } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 下载产物校验错误
#[derive(Debug)]
pub enum DownloadError {
    /// 等待下载完成超时
    Timeout {
        waited_secs: u64,
    },
    /// 下载的文件为空
    EmptyFile {
        path: String,
    },
    /// 文件头不是可识别的音频格式
    UnrecognizedFormat {
        path: String,
    },
    /// 移动产物到目标目录失败
    MoveFailed {
        from: String,
        to: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadError::Timeout { waited_secs } => {
                write!(f, "等待下载完成超时 (已等待 {} 秒)", waited_secs)
            }
            DownloadError::EmptyFile { path } => {
                write!(f, "下载的文件为空: {}", path)
            }
            DownloadError::UnrecognizedFormat { path } => {
                write!(f, "文件头不是可识别的音频格式: {}", path)
            }
            DownloadError::MoveFailed { from, to, source } => {
                write!(f, "移动产物失败 ({} -> {}): {}", from, to, source)
            }
        }
    }
}

impl std::error::Error for DownloadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DownloadError::MoveFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 文件操作错误
#[derive(Debug)]
pub enum FileError {
    /// 文件不存在
    NotFound {
        path: String,
    },
    /// 读取文件失败
    ReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    WriteFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    TomlParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileError::NotFound { path } => write!(f, "文件不存在: {}", path),
            FileError::ReadFailed { path, source } => {
                write!(f, "读取文件失败 ({}): {}", path, source)
            }
            FileError::WriteFailed { path, source } => {
                write!(f, "写入文件失败 ({}): {}", path, source)
            }
            FileError::TomlParseFailed { path, source } => {
                write!(f, "TOML解析失败 ({}): {}", path, source)
            }
        }
    }
}

impl std::error::Error for FileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileError::ReadFailed { source, .. }
            | FileError::WriteFailed { source, .. }
            | FileError::TomlParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AutomationError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AutomationError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AutomationError {
    fn from(err: serde_json::Error) -> Self {
        AutomationError::Other(format!("JSON解析失败: {}", err))
    }
}

// ========== 便捷构造函数 ==========

impl AutomationError {
    /// 创建浏览器启动错误
    pub fn launch_failed(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        AutomationError::Browser(BrowserError::LaunchFailed {
            source: Box::new(source),
        })
    }

    /// 创建导航错误
    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AutomationError::Browser(BrowserError::NavigationFailed {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建带路径的读取失败错误
    pub fn read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AutomationError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建带路径的写入失败错误
    pub fn write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AutomationError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建定位失败错误
    pub fn selector_not_found(description: impl Into<String>, strategies: Vec<String>) -> Self {
        AutomationError::SelectorNotFound {
            description: description.into(),
            strategies,
        }
    }

    /// 将任意错误包装为某个工作流状态上的失败
    pub fn at_state(state: WorkflowState, source: AutomationError) -> Self {
        AutomationError::WorkflowStep {
            state,
            source: Box::new(source),
        }
    }

    /// 是否为生成超时错误（编排层据此决定是否重试）
    pub fn is_generation_timeout(&self) -> bool {
        matches!(self, AutomationError::AudioGenerationTimeout { .. })
    }
}

// ========== Result 类型别名 ==========

/// 自动化引擎结果类型
pub type AutomationResult<T> = Result<T, AutomationError>;
