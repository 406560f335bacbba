use async_trait::async_trait;

use crate::domain::Health;

/// Port for per-disk health checks
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Whether a probe tool is present at all
    fn is_available(&self) -> bool;

    /// Probe one physical device; failures map to a sentinel, never an error
    async fn probe(&self, device: &str) -> Health;
}
