//! Worker configuration.

use std::path::{Path, PathBuf};

/// Scratch directory name under the user-data root.
pub const SCRATCH_DIR_NAME: &str = "temp_files";
/// Default output directory name under the user-data root.
pub const OUTPUT_DIR_NAME: &str = "output";
/// Cookie jar file name under the user-data root.
pub const COOKIES_FILE_NAME: &str = "cookies.txt";

/// Filesystem layout and host settings for one run.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Bundled tools and `assets/` fonts
    pub resources_dir: PathBuf,
    /// Per-user data root
    pub user_data_dir: PathBuf,
    /// Scratch files; removed when the run ends
    pub scratch_dir: PathBuf,
    /// Where finished parts are written
    pub output_dir: PathBuf,
    /// Candidate cookie jar; only used if it validates
    pub cookies_path: PathBuf,
    /// CPU count used to size software encoder threads
    pub cpu_count: usize,
}

impl WorkerConfig {
    /// Derive the layout from the resources and user-data roots.
    ///
    /// An empty or missing `output_dir` selects `<user_data>/output`.
    pub fn new(
        resources_dir: impl AsRef<Path>,
        user_data_dir: impl AsRef<Path>,
        output_dir: Option<PathBuf>,
    ) -> Self {
        let user_data_dir = user_data_dir.as_ref().to_path_buf();
        let output_dir = output_dir
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| user_data_dir.join(OUTPUT_DIR_NAME));

        Self {
            resources_dir: resources_dir.as_ref().to_path_buf(),
            scratch_dir: user_data_dir.join(SCRATCH_DIR_NAME),
            cookies_path: user_data_dir.join(COOKIES_FILE_NAME),
            output_dir,
            user_data_dir,
            cpu_count: default_cpu_count(),
        }
    }

    pub fn with_cpu_count(mut self, cpu_count: usize) -> Self {
        self.cpu_count = cpu_count.max(1);
        self
    }
}

fn default_cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
