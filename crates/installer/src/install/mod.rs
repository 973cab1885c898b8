//! Installation module
//!
//! Lays mod loaders and pack content into the game client's directory and
//! registers each pack as a launcher profile.

pub mod archive;
pub mod icon;
pub mod layout;
pub mod loader;
pub mod pack;
pub mod registry;

// Re-export commonly used types
pub use archive::{extract_and_merge, MergeMode, MergeReport};
pub use layout::{default_client_root, ClientLayout, ProfileLayout};
pub use loader::{LoaderInstaller, LoaderStatus};
pub use pack::{resolve_download_url, resolve_jvm_args, HostOs, InstallOutcome, PackInstaller};
pub use registry::{profile_id_for, ProfileRecord, REGISTRY_FILE_NAME};
