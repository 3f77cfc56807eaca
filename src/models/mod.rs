pub mod digest_file;
pub mod work_item;

pub use digest_file::load_digest_file;
pub use work_item::{Artifact, AudioFormat, GenerationOutcome, IngestReport, WorkItem};
