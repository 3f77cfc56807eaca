pub mod persistent;
pub mod profile_lock;

pub use persistent::{allow_downloads_to, launch_persistent_browser};
pub use profile_lock::ProfileLock;
