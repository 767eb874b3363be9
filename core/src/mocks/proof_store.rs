//! Mock proof store with a failure toggle.

use crate::error::{Result, RifaError};
use crate::providers::ProofStore;
use crate::types::{ArtifactRef, ProofUpload};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Proof store that keeps references in memory and can be told to fail.
#[derive(Debug, Default)]
pub struct MockProofStore {
    should_succeed: bool,
    stored: Mutex<Vec<ArtifactRef>>,
    discarded: Mutex<Vec<ArtifactRef>>,
}

impl MockProofStore {
    /// Create a mock that stores successfully.
    #[must_use]
    pub fn new() -> Self {
        Self {
            should_succeed: true,
            stored: Mutex::new(Vec::new()),
            discarded: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock whose `store` always fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            should_succeed: false,
            stored: Mutex::new(Vec::new()),
            discarded: Mutex::new(Vec::new()),
        }
    }

    /// References handed out so far, in order.
    pub async fn stored(&self) -> Vec<ArtifactRef> {
        self.stored.lock().await.clone()
    }

    /// References discarded so far, in order.
    pub async fn discarded(&self) -> Vec<ArtifactRef> {
        self.discarded.lock().await.clone()
    }
}

#[async_trait]
impl ProofStore for MockProofStore {
    async fn store(&self, upload: ProofUpload) -> Result<ArtifactRef> {
        if !self.should_succeed {
            return Err(RifaError::ProofStorage {
                reason: "mock proof store configured to fail".to_string(),
            });
        }
        let mut stored = self.stored.lock().await;
        let artifact = ArtifactRef::new(format!("mock-proofs/{}/{}", stored.len(), upload.file_name));
        stored.push(artifact.clone());
        Ok(artifact)
    }

    async fn discard(&self, artifact: &ArtifactRef) -> Result<()> {
        self.discarded.lock().await.push(artifact.clone());
        Ok(())
    }
}
