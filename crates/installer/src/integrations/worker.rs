//! Background install runner
//!
//! Runs one install on its own task so the presentation side stays
//! responsive, and turns every way it can end (success, cancellation, error,
//! panic) into an [`InstallReport`].

use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::catalog::PackDefinition;
use crate::error::{ErrorKind, InstallError};
use crate::install::{InstallOutcome, PackInstaller};

/// Why an install did not complete, in presentable form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallFailure {
    pub kind: ErrorKind,
    pub message: String,
    /// Where to look for details
    pub log_hint: Option<PathBuf>,
}

impl InstallFailure {
    fn from_error(error: &InstallError, log_hint: Option<PathBuf>) -> Self {
        Self {
            kind: error.kind(),
            message: error.user_message(),
            log_hint,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub pack_name: String,
    pub result: Result<InstallOutcome, InstallFailure>,
}

impl InstallReport {
    pub fn succeeded(&self) -> bool {
        matches!(
            self.result,
            Ok(InstallOutcome::Installed { .. } | InstallOutcome::Updated { .. })
        )
    }

    /// One message suitable for a dialog
    pub fn summary(&self) -> String {
        match &self.result {
            Ok(InstallOutcome::Installed { .. }) => {
                format!("Installed '{}' successfully!", self.pack_name)
            }
            Ok(InstallOutcome::Updated { .. }) => {
                format!("Updated '{}' successfully!", self.pack_name)
            }
            Ok(InstallOutcome::Cancelled { .. }) => {
                format!("Update of '{}' was cancelled.", self.pack_name)
            }
            Err(failure) => match &failure.log_hint {
                Some(log) => format!("{} See {} for details.", failure.message, log.display()),
                None => failure.message.clone(),
            },
        }
    }
}

pub struct InstallWorker;

impl InstallWorker {
    /// Start installing `pack` under `client_root`
    ///
    /// The returned handle always resolves to a report; it never yields a join
    /// error for failures inside the install itself.
    pub fn spawn(
        installer: PackInstaller,
        client_root: PathBuf,
        pack: PackDefinition,
    ) -> JoinHandle<InstallReport> {
        tokio::spawn(async move {
            let pack_name = pack.profile_name.clone();
            let ui = installer.ui().clone();
            let log_hint = installer.config().diagnostic_log.clone();
            let installer = Arc::new(installer);

            let task = {
                let installer = installer.clone();
                tokio::spawn(async move { installer.install_or_update(&client_root, &pack).await })
            };

            let result = match task.await {
                Ok(Ok(outcome)) => {
                    if !matches!(outcome, InstallOutcome::Cancelled { .. }) {
                        ui.report_status("Installation Complete");
                    }
                    Ok(outcome)
                }
                Ok(Err(e)) => {
                    error!("Install of '{}' failed\n{}", pack_name, e.detailed_report());
                    ui.report_status("Error occurred.");
                    Err(InstallFailure::from_error(&e, log_hint))
                }
                Err(join_error) => {
                    let e = InstallError::from(join_error);
                    error!("Install of '{}' crashed: {}", pack_name, e);
                    ui.report_status("Error occurred.");
                    Err(InstallFailure::from_error(&e, log_hint))
                }
            };

            let report = InstallReport { pack_name, result };
            info!("{}", report.summary());
            report
        })
    }
}
