//! Filesystem-backed completion store.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use super::traits::CompletionStore;
use super::types::{Checkpoint, StageKind, StoreError};

/// Completion store over the archive directory layout.
///
/// Markers are the stage output directories themselves:
///
/// | stage     | complete when                      | owns             |
/// |-----------|------------------------------------|------------------|
/// | acquire   | `U/repro/`                         | nothing          |
/// | reprocess | `U/repro/` or `U/images/`          | `U/repro/`       |
/// | image     | `U/images/` or `U/wavdetect/`      | `U/images/`      |
/// | detect    | `U/wavdetect/U_<edition>.src`      | the `.src` file  |
///
/// Reprocessing and imaging also count as done when the next stage's output
/// exists, so archives with a cleaned-up `repro/` or `images/` resume.
/// Acquisition looks at `U/repro/` only: a unit with `images/` but no
/// `repro/` is downloaded again.
#[derive(Debug, Clone)]
pub struct FsCompletionStore {
    root: PathBuf,
}

impl FsCompletionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn unit_dir(&self, unit: &str) -> PathBuf {
        self.root.join(unit)
    }

    /// Paths whose presence means the checkpoint is complete.
    fn marker_paths(&self, unit: &str, checkpoint: &Checkpoint) -> Vec<PathBuf> {
        let dir = self.unit_dir(unit);
        match checkpoint.stage {
            StageKind::Acquire => vec![dir.join("repro")],
            StageKind::Reprocess => vec![dir.join("repro"), dir.join("images")],
            StageKind::Image => vec![dir.join("images"), dir.join("wavdetect")],
            StageKind::Detect => vec![self.source_list_path(unit, checkpoint.label())],
        }
    }

    /// The marker a stage itself produces, if any.
    fn owned_marker(&self, unit: &str, checkpoint: &Checkpoint) -> Option<PathBuf> {
        let dir = self.unit_dir(unit);
        match checkpoint.stage {
            StageKind::Acquire => None,
            StageKind::Reprocess => Some(dir.join("repro")),
            StageKind::Image => Some(dir.join("images")),
            StageKind::Detect => Some(self.source_list_path(unit, checkpoint.label())),
        }
    }

    /// `U/wavdetect/U_<edition>.src`
    pub fn source_list_path(&self, unit: &str, edition: &str) -> PathBuf {
        self.unit_dir(unit)
            .join("wavdetect")
            .join(format!("{}_{}.src", unit, edition))
    }

    /// Where a stage's log is written.
    pub fn log_path(&self, unit: &str, checkpoint: &Checkpoint) -> PathBuf {
        let dir = self.unit_dir(unit);
        match checkpoint.stage {
            StageKind::Acquire => dir.join("LOG.acquire"),
            StageKind::Reprocess => dir.join("LOG.repro"),
            StageKind::Image => dir.join("images").join("LOG"),
            StageKind::Detect => dir
                .join("wavdetect")
                .join(format!("LOG.{}", checkpoint.label())),
        }
    }
}

async fn path_exists(path: &Path) -> Result<bool, StoreError> {
    fs::try_exists(path)
        .await
        .map_err(|e| StoreError::io(path, e))
}

#[async_trait]
impl CompletionStore for FsCompletionStore {
    async fn exists(&self, unit: &str, checkpoint: &Checkpoint) -> Result<bool, StoreError> {
        for path in self.marker_paths(unit, checkpoint) {
            if path_exists(&path).await? {
                debug!("{} complete for {}: {}", checkpoint, unit, path.display());
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn mark(&self, unit: &str, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        let Some(marker) = self.owned_marker(unit, checkpoint) else {
            return Ok(());
        };

        match checkpoint.stage {
            StageKind::Detect => {
                if !path_exists(&marker).await? {
                    warn!(
                        "{} finished for {} without writing {}; marking anyway",
                        checkpoint,
                        unit,
                        marker.display()
                    );
                    if let Some(parent) = marker.parent() {
                        fs::create_dir_all(parent)
                            .await
                            .map_err(|e| StoreError::io(parent, e))?;
                    }
                    fs::write(&marker, b"")
                        .await
                        .map_err(|e| StoreError::io(&marker, e))?;
                }
            }
            _ => {
                fs::create_dir_all(&marker)
                    .await
                    .map_err(|e| StoreError::io(&marker, e))?;
            }
        }
        Ok(())
    }

    async fn write_log(
        &self,
        unit: &str,
        checkpoint: &Checkpoint,
        log: &str,
    ) -> Result<(), StoreError> {
        let path = self.log_path(unit, checkpoint);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }
        let mut contents = log.to_string();
        if !contents.ends_with('\n') {
            contents.push('\n');
        }
        fs::write(&path, contents)
            .await
            .map_err(|e| StoreError::io(&path, e))
    }

    async fn invalidate(&self, unit: &str, checkpoint: &Checkpoint) -> Result<(), StoreError> {
        let Some(marker) = self.owned_marker(unit, checkpoint) else {
            return Ok(());
        };

        let result = match checkpoint.stage {
            StageKind::Detect => fs::remove_file(&marker).await,
            _ => fs::remove_dir_all(&marker).await,
        };
        match result {
            Ok(()) => {
                warn!("Removed partial output {} for {}", marker.display(), unit);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&marker, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, FsCompletionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCompletionStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn test_fresh_unit_has_no_markers() {
        let (_dir, store) = setup();
        for cp in [
            Checkpoint::stage(StageKind::Acquire),
            Checkpoint::stage(StageKind::Reprocess),
            Checkpoint::stage(StageKind::Image),
            Checkpoint::detection("baseline"),
        ] {
            assert!(!store.exists("1843", &cp).await.unwrap(), "{cp}");
        }
    }

    #[tokio::test]
    async fn test_repro_dir_completes_acquire_and_reprocess() {
        let (dir, store) = setup();
        std::fs::create_dir_all(dir.path().join("1843/repro")).unwrap();

        assert!(store
            .exists("1843", &Checkpoint::stage(StageKind::Acquire))
            .await
            .unwrap());
        assert!(store
            .exists("1843", &Checkpoint::stage(StageKind::Reprocess))
            .await
            .unwrap());
        assert!(!store
            .exists("1843", &Checkpoint::stage(StageKind::Image))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_later_output_implies_earlier_stage() {
        let (dir, store) = setup();
        std::fs::create_dir_all(dir.path().join("1843/wavdetect")).unwrap();

        assert!(store
            .exists("1843", &Checkpoint::stage(StageKind::Image))
            .await
            .unwrap());

        std::fs::create_dir_all(dir.path().join("1843/images")).unwrap();
        assert!(store
            .exists("1843", &Checkpoint::stage(StageKind::Reprocess))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_images_without_repro_still_needs_acquire() {
        let (dir, store) = setup();
        std::fs::create_dir_all(dir.path().join("1843/images")).unwrap();

        assert!(!store
            .exists("1843", &Checkpoint::stage(StageKind::Acquire))
            .await
            .unwrap());
        assert!(store
            .exists("1843", &Checkpoint::stage(StageKind::Reprocess))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_detection_marker_is_the_source_list() {
        let (dir, store) = setup();
        let cp = Checkpoint::detection("baseline");
        std::fs::create_dir_all(dir.path().join("1843/wavdetect")).unwrap();
        assert!(!store.exists("1843", &cp).await.unwrap());

        std::fs::write(dir.path().join("1843/wavdetect/1843_baseline.src"), b"x").unwrap();
        assert!(store.exists("1843", &cp).await.unwrap());
        assert!(!store
            .exists("1843", &Checkpoint::detection("v2"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_acquire_mark_does_not_complete_reprocess() {
        let (_dir, store) = setup();
        store
            .mark("1843", &Checkpoint::stage(StageKind::Acquire))
            .await
            .unwrap();
        assert!(!store
            .exists("1843", &Checkpoint::stage(StageKind::Reprocess))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_mark_creates_owned_marker() {
        let (dir, store) = setup();
        let cp = Checkpoint::stage(StageKind::Image);
        store.mark("1843", &cp).await.unwrap();
        assert!(dir.path().join("1843/images").is_dir());
        assert!(store.exists("1843", &cp).await.unwrap());
    }

    #[tokio::test]
    async fn test_mark_detection_touches_missing_source_list() {
        let (dir, store) = setup();
        store
            .mark("1843", &Checkpoint::detection("baseline"))
            .await
            .unwrap();
        assert!(dir.path().join("1843/wavdetect/1843_baseline.src").is_file());
    }

    #[tokio::test]
    async fn test_log_locations() {
        let (dir, store) = setup();
        store
            .write_log("1843", &Checkpoint::stage(StageKind::Reprocess), "repro ok")
            .await
            .unwrap();
        store
            .write_log("1843", &Checkpoint::stage(StageKind::Image), "images ok")
            .await
            .unwrap();
        store
            .write_log("1843", &Checkpoint::detection("baseline"), "wd ok")
            .await
            .unwrap();

        let root = dir.path().join("1843");
        assert_eq!(
            std::fs::read_to_string(root.join("LOG.repro")).unwrap(),
            "repro ok\n"
        );
        assert_eq!(
            std::fs::read_to_string(root.join("images/LOG")).unwrap(),
            "images ok\n"
        );
        assert_eq!(
            std::fs::read_to_string(root.join("wavdetect/LOG.baseline")).unwrap(),
            "wd ok\n"
        );
    }

    #[tokio::test]
    async fn test_invalidate_removes_partial_output() {
        let (dir, store) = setup();
        let images = dir.path().join("1843/images");
        std::fs::create_dir_all(&images).unwrap();
        std::fs::write(images.join("partial.img"), b"x").unwrap();

        let cp = Checkpoint::stage(StageKind::Image);
        store.invalidate("1843", &cp).await.unwrap();
        assert!(!images.exists());
        assert!(!store.exists("1843", &cp).await.unwrap());

        // Nothing left to remove
        store.invalidate("1843", &cp).await.unwrap();
    }

    #[tokio::test]
    async fn test_invalidate_acquire_touches_nothing() {
        let (dir, store) = setup();
        let primary = dir.path().join("1843/primary");
        std::fs::create_dir_all(&primary).unwrap();

        store
            .invalidate("1843", &Checkpoint::stage(StageKind::Acquire))
            .await
            .unwrap();
        assert!(primary.is_dir());
    }
}
