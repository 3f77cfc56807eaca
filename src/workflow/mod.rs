pub mod flow;
pub mod state;
pub mod surface;

pub use flow::GenerationFlow;
pub use state::WorkflowState;
pub use surface::{LiveSurface, NotebookSurface};
