//! Model context housekeeping: usage-based trimming and on-disk
//! context caches.

use crate::providers::LanguageModel;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Clear the model context once usage crosses `threshold` of capacity.
///
/// Returns true when the context was cleared. Faults are logged and
/// reported as "not cleared"; housekeeping never takes a turn down.
pub fn check_and_trim(llm: &mut dyn LanguageModel, threshold: f32) -> bool {
    let capacity = llm.max_context_capacity();
    let usage = llm.context_usage();
    if capacity == 0 {
        return false;
    }

    let limit = (capacity as f32 * threshold) as usize;
    if usage < limit {
        return false;
    }

    info!(
        usage,
        capacity,
        percent = usage * 100 / capacity,
        "context threshold reached, clearing"
    );
    match llm.clear_context() {
        Ok(()) => {
            info!("context cleared");
            true
        }
        Err(e) => {
            warn!("failed to clear context: {e}");
            false
        }
    }
}

/// Cache file path for a session key.
pub fn cache_path(key: &str, cache_dir: &Path) -> PathBuf {
    cache_dir.join(format!("context_{key}.cache"))
}

/// Persist the model context to `cache_dir`. Returns true on success;
/// failures are logged, never fatal.
pub fn save_to_cache(llm: &dyn LanguageModel, key: &str, cache_dir: &Path) -> bool {
    let path = cache_path(key, cache_dir);
    debug!(path = %path.display(), "saving context cache");

    let result = llm.save_context().and_then(|blob| {
        fs::create_dir_all(cache_dir)?;
        fs::write(&path, blob)?;
        Ok(())
    });
    match result {
        Ok(()) => {
            info!(key, "context cache saved");
            true
        }
        Err(e) => {
            warn!(key, "failed to save context cache: {e}");
            false
        }
    }
}

/// Restore the model context from `cache_dir` if a cache exists.
/// Returns true only when a cache was found and loaded.
pub fn load_from_cache(llm: &mut dyn LanguageModel, key: &str, cache_dir: &Path) -> bool {
    let path = cache_path(key, cache_dir);
    if !path.exists() {
        info!(key, path = %path.display(), "no context cache found");
        return false;
    }
    debug!(path = %path.display(), "loading context cache");

    let result = fs::read(&path)
        .map_err(Into::into)
        .and_then(|blob| llm.load_context(&blob));
    match result {
        Ok(()) => {
            info!(key, "context cache loaded");
            true
        }
        Err(e) => {
            warn!(key, "failed to load context cache: {e}");
            false
        }
    }
}
