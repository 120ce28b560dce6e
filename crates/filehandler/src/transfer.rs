//! Raw file transfers between local disk and a handler location
//!
//! Unlike the codec entry points these move bytes as-is: a local file up to a
//! location, a stored file down to a local directory, or a whole local
//! directory tree up under a prefix.

use std::path::{Path, PathBuf};

use store_core::{BatchReport, Outcome, Result};
use tracing::{info, instrument, warn};

use crate::handle::build_handle;
use crate::handler::FileHandler;

impl FileHandler {
    /// Copy the local file `local_file` to `filename` under `output_path`
    ///
    /// # Returns
    /// Number of bytes written
    #[instrument(skip(self))]
    pub async fn upload_file(&self, local_file: &Path, output_path: &str, filename: &str) -> Result<u64> {
        let session = self.session().await?;
        let data = session.local().read(local_file).await?;
        let handle = build_handle(&session, output_path, filename).await?;

        info!("----Upload started: {} ----", filename);
        let size = session.write(&handle, data).await?;
        info!("----Upload finished: {} ----", filename);
        Ok(size)
    }

    /// Copy `filename` under `input_path` into `output_dir`
    ///
    /// The current directory is used when `output_dir` is `None`.
    ///
    /// # Returns
    /// Path of the local copy
    #[instrument(skip(self))]
    pub async fn download_file(
        &self,
        input_path: &str,
        filename: &str,
        output_dir: Option<&Path>,
    ) -> Result<PathBuf> {
        let session = self.session().await?;
        let handle = Self::existing_handle(&session, input_path, filename).await?;
        let target = output_dir.unwrap_or_else(|| Path::new(".")).join(filename);

        info!("----Download started: {} ----", filename);
        let data = session.read(&handle).await?;
        session.local().write(&target, data).await?;
        info!("----Download finished: {} ----", filename);

        Ok(target)
    }

    /// Upload the local directory `input_path/directory_name` under `output_path`
    ///
    /// Each file lands at `<output_path>/<directory_name>/<relative path>`.
    /// Failures are recorded per file and do not stop the upload.
    #[instrument(skip(self))]
    pub async fn upload_directory(
        &self,
        input_path: &Path,
        output_path: &str,
        directory_name: &str,
    ) -> Result<BatchReport> {
        let session = self.session().await?;
        let local_directory = input_path.join(directory_name);
        let files = session.local().walk(&local_directory).await?;

        let mut report = BatchReport::new();
        for relative in files {
            let filename = format!("{}/{}", directory_name, relative);

            let result = async {
                let data = session.local().read(&local_directory.join(&relative)).await?;
                let handle = build_handle(&session, output_path, &filename).await?;
                session.write(&handle, data).await
            }
            .await;

            match result {
                Ok(_) => report.record(filename, Outcome::Success),
                Err(e) => {
                    warn!(filename = %filename, error = %e, "Failed to upload file");
                    report.record(filename, Outcome::Fault(e.to_string()));
                }
            }
        }

        info!(
            uploaded = report.succeeded().len(),
            failed = report.faults().len(),
            "Directory upload finished"
        );
        Ok(report)
    }
}
