//! Optional host capability for interactive API key selection.
//!
//! Video generation may require the user to pick a key through the host
//! environment. The client only calls this hook when one is installed.

use async_trait::async_trait;

use crate::error::GenerationError;

#[async_trait]
pub trait CredentialPrompt: Send + Sync {
    /// Whether the host already has a usable credential selected.
    async fn has_credential(&self) -> bool;

    /// Asks the host to obtain a credential; resolves once the user acted.
    async fn request_credential(&self) -> Result<(), GenerationError>;
}

/// Prompts only when the host reports no credential.
pub async fn ensure_credential(prompt: Option<&dyn CredentialPrompt>) -> Result<(), GenerationError> {
    let Some(prompt) = prompt else {
        return Ok(());
    };
    if prompt.has_credential().await {
        return Ok(());
    }
    tracing::info!("no credential selected, requesting one from host");
    prompt.request_credential().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPrompt {
        has_key: bool,
        requests: AtomicUsize,
    }

    #[async_trait]
    impl CredentialPrompt for CountingPrompt {
        async fn has_credential(&self) -> bool {
            self.has_key
        }

        async fn request_credential(&self) -> Result<(), GenerationError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_no_prompt_installed() {
        assert!(ensure_credential(None).await.is_ok());
    }

    #[tokio::test]
    async fn test_prompt_skipped_when_key_present() {
        let prompt = CountingPrompt {
            has_key: true,
            requests: AtomicUsize::new(0),
        };
        ensure_credential(Some(&prompt)).await.unwrap();
        assert_eq!(prompt.requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_prompt_requested_when_key_missing() {
        let prompt = CountingPrompt {
            has_key: false,
            requests: AtomicUsize::new(0),
        };
        ensure_credential(Some(&prompt)).await.unwrap();
        assert_eq!(prompt.requests.load(Ordering::SeqCst), 1);
    }
}
