//! Proof-of-payment artifact storage.

use crate::error::Result;
use crate::types::{ArtifactRef, ProofUpload};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Stores uploaded proof-of-payment artifacts and hands back retrievable
/// references.
///
/// The core keeps only the [`ArtifactRef`]; the bytes live with the
/// implementation. Storage is fail-closed for submissions: if `store`
/// fails, the purchase must not reserve anything.
#[async_trait]
pub trait ProofStore: Send + Sync + 'static {
    /// Persist an uploaded artifact.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RifaError::ProofStorage`] when the artifact
    /// cannot be persisted.
    async fn store(&self, upload: ProofUpload) -> Result<ArtifactRef>;

    /// Best-effort removal of a stored artifact, used to clean up after
    /// a submission that failed later in the pipeline. Discarding an
    /// unknown reference is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RifaError::ProofStorage`] when the backend
    /// refuses the removal; callers log and move on.
    async fn discard(&self, artifact: &ArtifactRef) -> Result<()>;
}

/// In-memory proof store for demos and tests.
#[derive(Debug, Default)]
pub struct MemoryProofStore {
    artifacts: Mutex<HashMap<String, ProofUpload>>,
}

impl MemoryProofStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of artifacts currently held.
    pub async fn artifact_count(&self) -> usize {
        self.artifacts.lock().await.len()
    }

    /// Whether `artifact` is currently held.
    pub async fn contains(&self, artifact: &ArtifactRef) -> bool {
        self.artifacts.lock().await.contains_key(artifact.as_str())
    }
}

#[async_trait]
impl ProofStore for MemoryProofStore {
    async fn store(&self, upload: ProofUpload) -> Result<ArtifactRef> {
        let reference = format!("proofs/{}/{}", Uuid::new_v4(), upload.file_name);
        self.artifacts
            .lock()
            .await
            .insert(reference.clone(), upload);
        Ok(ArtifactRef::new(reference))
    }

    async fn discard(&self, artifact: &ArtifactRef) -> Result<()> {
        self.artifacts.lock().await.remove(artifact.as_str());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn upload() -> ProofUpload {
        ProofUpload {
            file_name: "receipt.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: vec![0xFF, 0xD8, 0xFF],
        }
    }

    #[tokio::test]
    async fn store_returns_a_unique_retrievable_reference() {
        let store = MemoryProofStore::new();
        let first = store.store(upload()).await.unwrap();
        let second = store.store(upload()).await.unwrap();

        assert_ne!(first, second);
        assert!(store.contains(&first).await);
        assert!(store.contains(&second).await);
        assert_eq!(store.artifact_count().await, 2);
        assert!(first.as_str().ends_with("receipt.jpg"));
    }

    #[tokio::test]
    async fn discard_is_idempotent() {
        let store = MemoryProofStore::new();
        let artifact = store.store(upload()).await.unwrap();

        store.discard(&artifact).await.unwrap();
        assert!(!store.contains(&artifact).await);

        // Unknown references are fine.
        store.discard(&artifact).await.unwrap();
        assert_eq!(store.artifact_count().await, 0);
    }
}
