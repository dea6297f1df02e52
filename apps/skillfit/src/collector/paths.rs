use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;

pub const CANDIDATES_DIR: &str = "candidates";
pub const CV_FILES_DIR: &str = "cv_files";

/// Where one ingestion run keeps its attachments and its candidate store.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPaths {
    pub cv_dir: PathBuf,
    pub store_file: PathBuf,
}

impl RunPaths {
    /// Paths for `job_title` on `date`, without touching the filesystem.
    pub fn for_job(data_dir: &Path, job_title: &str, date: NaiveDate) -> Self {
        let slug = job_slug(job_title);
        let day = date.format("%Y%m%d");
        RunPaths {
            cv_dir: data_dir
                .join(CV_FILES_DIR)
                .join(format!("cv_files_{slug}_{day}")),
            store_file: data_dir
                .join(CANDIDATES_DIR)
                .join(format!("candidates_{slug}_{day}.json")),
        }
    }

    pub fn create_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.cv_dir)
            .with_context(|| format!("creating {}", self.cv_dir.display()))?;
        if let Some(parent) = self.store_file.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        Ok(())
    }
}

fn separator_runs() -> &'static Regex {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    SEPARATORS.get_or_init(|| Regex::new(r"[-\s]+").expect("static regex is valid"))
}

fn non_word() -> &'static Regex {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    NON_WORD.get_or_init(|| Regex::new(r"[^\w\s-]").expect("static regex is valid"))
}

/// File-name friendly form of a job title: `Chargé d'études` → `chargé_détudes`.
pub fn job_slug(job_title: &str) -> String {
    let joined = separator_runs().replace_all(job_title.trim(), "_");
    let kept = non_word().replace_all(joined.trim_matches('_'), "");
    separator_runs()
        .replace_all(&kept, "_")
        .trim_matches('_')
        .to_lowercase()
}
