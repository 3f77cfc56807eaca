//! # Audio Overview Automation
//!
//! 一个把每日文稿驱动成音频播客的远端会话自动化引擎
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `PageDriver` - 唯一的 page owner，提供 eval() / goto() / screenshot() 能力
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每个服务一种能力
//! - `ResilientLocator` - 有序多策略定位能力（对抗界面改版）
//! - `SessionProbe` - 登录态判定能力
//! - `SourcePanel` - 来源清理与文稿摄入能力
//! - `AudioStudio` - 触发生成与完成探测能力
//! - `ArtifactRetriever` - 下载、校验与归档能力
//! - `SnapshotWriter` - 失败现场截图能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一份文稿"的完整处理流程
//! - `WorkflowState` - 显式状态序列（只向前推进）
//! - `NotebookSurface` - 远端界面抽象（可替换为模拟界面）
//! - `GenerationFlow` - 流程编排（摄入 → 生成 → 轮询 → 下载）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/` - 资源生命周期、整体截止时间、超时重试
//! - `AutomationOrchestrator` - 唯一的公开入口 generate()

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{launch_persistent_browser, ProfileLock};
pub use config::Config;
pub use error::{AutomationError, AutomationResult};
pub use infrastructure::PageDriver;
pub use models::{Artifact, AudioFormat, GenerationOutcome, IngestReport, WorkItem};
pub use orchestrator::AutomationOrchestrator;
pub use services::{LocatorSpec, ResilientLocator, Strategy};
pub use workflow::{GenerationFlow, WorkflowState};
