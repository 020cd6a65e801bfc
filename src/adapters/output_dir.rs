//! Output directory preparation for fresh runs.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::domain::errors::LaunchError;

fn output_dir_error(path: &Path, e: &std::io::Error) -> LaunchError {
    LaunchError::OutputDir {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

fn rolled_name(dir: &Path, n: u32) -> PathBuf {
    let mut name = dir.as_os_str().to_owned();
    name.push(format!("__{n}"));
    PathBuf::from(name)
}

/// Move an existing output directory aside to `<dir>__<n>`, using the
/// smallest free `n`. Returns where it went, or `None` if there was nothing
/// to move.
pub async fn roll_output_dir(dir: &Path) -> Result<Option<PathBuf>, LaunchError> {
    if !tokio::fs::try_exists(dir)
        .await
        .map_err(|e| output_dir_error(dir, &e))?
    {
        return Ok(None);
    }

    let mut n = 1;
    let target = loop {
        let candidate = rolled_name(dir, n);
        if !tokio::fs::try_exists(&candidate)
            .await
            .map_err(|e| output_dir_error(&candidate, &e))?
        {
            break candidate;
        }
        n += 1;
    };

    tokio::fs::rename(dir, &target)
        .await
        .map_err(|e| output_dir_error(dir, &e))?;
    info!(from = %dir.display(), to = %target.display(), "Rolled previous output directory");
    Ok(Some(target))
}

/// Roll any previous output and create an empty directory in its place.
pub async fn prepare_output_dir(dir: &Path) -> Result<Option<PathBuf>, LaunchError> {
    let rolled = roll_output_dir(dir).await?;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| output_dir_error(dir, &e))?;
    Ok(rolled)
}
