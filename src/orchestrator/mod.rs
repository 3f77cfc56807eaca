//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层是引擎唯一的公开入口，负责资源生命周期和整体调度：
//!
//! - 获取会话目录锁（上一次运行未退出时拒绝启动）
//! - 启动/关停浏览器进程，持有 CDP 事件任务
//! - 施加整体截止时间（默认 15 分钟）
//! - 生成超时重试一次（整个工作流从头重跑），其余错误一律上抛
//! - 失败时尽力留下现场截图
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator (资源 + 截止时间 + 重试)
//!     ↓
//! workflow::GenerationFlow (状态推进)
//!     ↓
//! services (能力层：locator / panel / studio / downloader / snapshot)
//!     ↓
//! infrastructure (基础设施：PageDriver)
//! ```
//!
//! ## 设计原则
//!
//! 1. **资源隔离**：只有编排层持有 Browser 和锁
//! 2. **清理兜底**：成功、失败、超时都走同一条关停路径，绝不泄漏
//!    无头浏览器进程（泄漏的进程还会占着会话目录锁，挡住下一次运行）

pub mod generator;

pub use generator::AutomationOrchestrator;
