//! `!reset app`: recreate a statefulset with fresh persistent volumes.
//!
//! The live statefulset definition is saved to a file, the statefulset and
//! its PVCs are deleted, and the saved definition is applied again. Resets of
//! the same app are serialized; resets of different apps run concurrently.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;

use crate::executor::{is_not_found, Executor};
use crate::kubectl::Kubectl;
use crate::output;

pub struct ResetCommand {
    executor: Arc<dyn Executor>,
    kubectl: Kubectl,
    dir: PathBuf,
    locks: LockTable,
}

impl ResetCommand {
    pub fn new(executor: Arc<dyn Executor>, kubectl: Kubectl, dir: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            kubectl,
            dir: dir.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Where the definition of `app` is kept while it is being reset.
    pub fn spec_path(&self, app: &str) -> PathBuf {
        self.dir.join(format!("st-{}.yaml", file_key(app)))
    }

    /// Hold the lock that serializes resets sharing `app`'s file.
    ///
    /// The table entry is dropped once no reset holds or waits for it.
    fn lease(&self, app: &str) -> LockLease<'_> {
        let key = file_key(app);
        let lock = self.locks.lock().entry(key.clone()).or_default().clone();
        LockLease {
            locks: &self.locks,
            key,
            lock,
        }
    }

    /// Run a reset and produce the reply text.
    ///
    /// Usage and not-found conditions are replies; only filesystem failures
    /// are errors.
    pub async fn execute(&self, args: &[String]) -> Result<String> {
        let [app] = args else {
            return Ok(output::invalid_reset_syntax(args));
        };

        let lease = self.lease(app);
        let _guard = lease.lock.lock().await;

        tracing::info!(%app, "Resetting statefulset");
        let output = self.run_sequence(app).await?;
        if is_not_found(&output) {
            tracing::info!(%app, "Statefulset not found");
            return Ok(output::app_not_found(app));
        }
        Ok(output::cmd_response(&output))
    }

    async fn run_sequence(&self, app: &str) -> Result<String> {
        let path = self.spec_path(app);
        let _cleanup = RemoveOnDrop(&path);

        let definition = self
            .executor
            .execute(&self.kubectl.get_statefulset_yaml(app))
            .await;
        if is_not_found(&definition) {
            return Ok(definition);
        }

        tokio::fs::write(&path, &definition)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        let mut output = Vec::with_capacity(3);
        output.push(self.executor.execute(&self.kubectl.delete_file(&path)).await);
        output.push(self.executor.execute(&self.kubectl.delete_pvcs(app)).await);
        output.push(self.executor.execute(&self.kubectl.apply_file(&path)).await);
        Ok(output.join("\n"))
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().len()
    }
}

/// File name component for `app`. Apps that map to the same key share a file
/// and therefore a lock.
fn file_key(app: &str) -> String {
    app.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

type LockTable = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

struct LockLease<'a> {
    locks: &'a LockTable,
    key: String,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for LockLease<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock();
        // One reference in the table plus ours: nobody else is waiting.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.key);
        }
    }
}

/// Deletes the file when dropped, whether or not it was ever created.
struct RemoveOnDrop<'a>(&'a Path);

impl Drop for RemoveOnDrop<'_> {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(self.0) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.0.display(), error = %e, "Failed to remove reset file");
            }
        }
    }
}
