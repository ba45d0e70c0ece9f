use async_trait::async_trait;
use tracing::warn;

use super::{CollectionSummary, Collector};
use crate::error::Result;
use crate::store::TimeSeriesStore;

// ---

/// Runs `primary`; runs `fallback` when the primary errors or collects
/// nothing.
pub struct FallbackCollector {
    primary: Box<dyn Collector>,
    fallback: Box<dyn Collector>,
}

impl FallbackCollector {
    pub fn new(primary: Box<dyn Collector>, fallback: Box<dyn Collector>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl Collector for FallbackCollector {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn collect(&self, store: &dyn TimeSeriesStore) -> Result<CollectionSummary> {
        // ---
        match self.primary.collect(store).await {
            Ok(summary) if summary.collected > 0 => Ok(summary),
            Ok(summary) => {
                warn!(
                    primary = self.primary.name(),
                    failed = summary.failed,
                    "primary collector produced nothing, falling back"
                );
                self.fallback.collect(store).await
            }
            Err(err) => {
                warn!(primary = self.primary.name(), error = %err, "primary collector failed, falling back");
                self.fallback.collect(store).await
            }
        }
    }
}
