//! 工作流状态
//!
//! 远端文档的生命周期被编码为显式状态序列，状态值由各转移函数
//! 显式传递，不存在隐式的"当前页面"全局量。转移只允许向前或进入
//! Failed；恢复靠整个工作流重跑，从不回退。

use std::fmt;

/// 工作流推进状态
///
/// 派生 Ord：状态的声明顺序即合法推进顺序，便于断言"只向前"。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WorkflowState {
    Idle,
    Navigated,
    SourcesCleared,
    SourceIngested,
    GenerationTriggered,
    GenerationPending,
    GenerationReady,
    Downloaded,
    Done,
    /// 吸收态，任何非终止状态都可进入
    Failed,
}

impl WorkflowState {
    /// 是否为终止状态
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Done | WorkflowState::Failed)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkflowState::Idle => "Idle",
            WorkflowState::Navigated => "Navigated",
            WorkflowState::SourcesCleared => "SourcesCleared",
            WorkflowState::SourceIngested => "SourceIngested",
            WorkflowState::GenerationTriggered => "GenerationTriggered",
            WorkflowState::GenerationPending => "GenerationPending",
            WorkflowState::GenerationReady => "GenerationReady",
            WorkflowState::Downloaded => "Downloaded",
            WorkflowState::Done => "Done",
            WorkflowState::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}
