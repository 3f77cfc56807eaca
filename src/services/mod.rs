pub mod audio_studio;
pub mod downloader;
pub mod locator;
pub mod session_probe;
pub mod snapshot;
pub mod source_panel;

pub use audio_studio::AudioStudio;
pub use downloader::ArtifactRetriever;
pub use locator::{Handle, LocatorSpec, ResilientLocator, Strategy};
pub use session_probe::SessionProbe;
pub use snapshot::SnapshotWriter;
pub use source_panel::SourcePanel;
