use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// One running child Stream controller, keyed by its owning StreamClass name.
struct RegistryEntry {
    cancel: CancellationToken,
}

/// Tracks which StreamClasses currently have a running Stream controller.
/// Ensure-started and ensure-stopped each take the write lock; a background
/// runner never holds it.
#[derive(Default)]
pub struct ControllerRegistry {
    entries: RwLock<HashMap<String, RegistryEntry>>,
}

impl ControllerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn is_started(&self, stream_class: &str) -> bool {
        self.entries.read().await.contains_key(stream_class)
    }

    /// Registers a freshly launched controller, replacing any stale entry.
    /// Returns the cancellation token the caller already handed to the
    /// background task.
    pub async fn register(&self, stream_class: &str, cancel: CancellationToken) {
        self.entries.write().await.insert(stream_class.to_string(), RegistryEntry { cancel });
    }

    /// Cancels and removes the entry for `stream_class`, if any.
    pub async fn unregister(&self, stream_class: &str) {
        if let Some(entry) = self.entries.write().await.remove(stream_class) {
            entry.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_unregister_cancels_token() {
        let registry = ControllerRegistry::new();
        let token = CancellationToken::new();
        registry.register("demo", token.clone()).await;
        assert!(registry.is_started("demo").await);

        registry.unregister("demo").await;
        assert!(!registry.is_started("demo").await);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn unregister_unknown_is_a_noop() {
        let registry = ControllerRegistry::new();
        registry.unregister("missing").await;
        assert!(!registry.is_started("missing").await);
    }
}
