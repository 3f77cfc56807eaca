/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 持久化浏览器会话目录（登录态所在，需预先人工登录建立）
    pub chrome_profile_dir: String,
    /// 复用的笔记本 URL（为空时打开应用首页）
    pub notebook_url: String,
    /// 是否以无头模式运行
    pub headless: bool,
    /// 成品音频输出目录
    pub episode_dir: String,
    /// 失败截图输出目录
    pub debug_dir: String,
    /// 浏览器下载暂存目录
    pub download_dir: String,
    /// 单次摄入的最大字符数（超出部分从尾部截断）
    pub max_source_chars: usize,
    /// 生成完成轮询间隔（秒）
    pub poll_interval_secs: u64,
    /// 生成等待上限（秒）
    pub generation_timeout_secs: u64,
    /// 单次调用整体截止时间（秒）
    pub overall_deadline_secs: u64,
    /// 页面导航超时（秒）
    pub navigation_timeout_secs: u64,
    /// 单个定位策略的等待时间（秒）
    pub element_timeout_secs: u64,
    /// 等待下载完成的上限（秒）
    pub download_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chrome_profile_dir: ".chrome-profile".to_string(),
            notebook_url: String::new(),
            headless: true,
            episode_dir: "output/episodes".to_string(),
            debug_dir: "output/debug".to_string(),
            download_dir: "output/downloads".to_string(),
            max_source_chars: 100_000,
            poll_interval_secs: 15,
            generation_timeout_secs: 600,
            overall_deadline_secs: 900,
            navigation_timeout_secs: 30,
            element_timeout_secs: 10,
            download_timeout_secs: 60,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            chrome_profile_dir: std::env::var("CHROME_PROFILE_DIR").unwrap_or(default.chrome_profile_dir),
            notebook_url: std::env::var("NOTEBOOK_URL").unwrap_or(default.notebook_url),
            headless: std::env::var("HEADLESS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.headless),
            episode_dir: std::env::var("EPISODE_DIR").unwrap_or(default.episode_dir),
            debug_dir: std::env::var("DEBUG_DIR").unwrap_or(default.debug_dir),
            download_dir: std::env::var("DOWNLOAD_DIR").unwrap_or(default.download_dir),
            max_source_chars: std::env::var("MAX_SOURCE_CHARS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_source_chars),
            poll_interval_secs: std::env::var("POLL_INTERVAL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.poll_interval_secs),
            generation_timeout_secs: std::env::var("GENERATION_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.generation_timeout_secs),
            overall_deadline_secs: std::env::var("OVERALL_DEADLINE_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.overall_deadline_secs),
            navigation_timeout_secs: std::env::var("NAVIGATION_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.navigation_timeout_secs),
            element_timeout_secs: std::env::var("ELEMENT_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.element_timeout_secs),
            download_timeout_secs: std::env::var("DOWNLOAD_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.download_timeout_secs),
        }
    }
}
