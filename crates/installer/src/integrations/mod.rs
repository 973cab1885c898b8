//! Presentation-facing pieces
//!
//! The UI seam the engine reports through, ready-made implementations of it,
//! and the worker that runs an install off the presentation thread.

pub mod ui;
pub mod worker;

pub use ui::{ChannelUi, ConsoleUi, InstallerUi, IntoProgressCallback, NullUi, UiEvent};
pub use worker::{InstallFailure, InstallReport, InstallWorker};
