//! Storefront bootstrap

use std::sync::Arc;
use std::time::Duration;

use app_state::{
    PrefetchStatus, Prefetcher, Query, QueryClient, SettleReport, TransitionCoordinator,
};
use app_ui::{NavigationError, Route, TransitionController};

use crate::config::StorefrontConfig;

/// The transition engine of one app process
pub struct Storefront {
    config: StorefrontConfig,
    coordinator: Arc<TransitionCoordinator>,
    prefetcher: Prefetcher,
    controller: TransitionController,
}

impl Default for Storefront {
    fn default() -> Self {
        Self::new(StorefrontConfig::default())
    }
}

impl Storefront {
    /// Build the coordinator, query client, prefetcher and controller
    pub fn new(config: StorefrontConfig) -> Self {
        let coordinator = Arc::new(TransitionCoordinator::new(config.coordinator.clone()));
        let client = QueryClient::new(config.cache.to_cache_config());
        let prefetcher = Prefetcher::new(Arc::clone(&coordinator), client);
        let controller = TransitionController::new(Arc::clone(&coordinator), config.transition.clone());

        tracing::info!(
            push_ms = config.transition.push_duration_ms,
            cache_entries = config.cache.max_entries,
            "storefront transition engine ready"
        );

        Self { config, coordinator, prefetcher, controller }
    }

    /// Configuration in effect
    pub fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    /// The process-wide coordinator
    pub fn coordinator(&self) -> &Arc<TransitionCoordinator> {
        &self.coordinator
    }

    /// Query client backing the prefetch cache
    pub fn client(&self) -> &QueryClient {
        self.prefetcher.client()
    }

    /// Prefetch scheduler
    pub fn prefetcher(&self) -> &Prefetcher {
        &self.prefetcher
    }

    /// Navigation and transition lifecycle
    pub fn controller(&self) -> &TransitionController {
        &self.controller
    }

    /// Mutable navigation and transition lifecycle
    pub fn controller_mut(&mut self) -> &mut TransitionController {
        &mut self.controller
    }

    /// Finger down on an item that navigates: start loading its data
    pub fn press_in<Q: Query + 'static>(&self, query: Q) -> PrefetchStatus {
        self.prefetcher.on_press_in(query)
    }

    /// Push a screen
    pub fn navigate(&mut self, route: Route) -> Result<String, NavigationError> {
        self.controller.push(route)
    }

    /// Advance the running transition by one frame
    pub fn tick(&mut self, dt: Duration) -> Result<Option<SettleReport>, NavigationError> {
        self.controller.tick(dt)
    }

    /// Log a lock held past the configured warning age
    pub fn check_stuck(&self) -> Option<Duration> {
        self.coordinator.check_stuck()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components_share_one_coordinator() {
        let storefront = Storefront::default();
        assert!(Arc::ptr_eq(storefront.coordinator(), storefront.controller().coordinator()));
        assert!(!storefront.coordinator().is_locked());
    }

    #[test]
    fn test_navigate_locks_until_settled() {
        let mut storefront = Storefront::default();
        storefront.navigate(Route::Cart).unwrap();
        assert!(storefront.coordinator().is_locked());
        assert!(storefront.check_stuck().is_none());

        let report = storefront
            .controller_mut()
            .run_to_settle(Duration::from_millis(16))
            .unwrap()
            .unwrap();
        assert_eq!(report.drain.ran(), 0);
        assert!(!storefront.coordinator().is_locked());
    }
}
