use crate::domain::{ObserverId, PushMessage, SensorEvent, SubscriptionRegistry};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Outbound side of the real-time channel.
///
/// Implementations deliver frames to connected observers; delivery to an
/// observer that has already gone away is a no-op, not an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObserverNotifier: Send + Sync {
    /// Deliver a frame to every connected observer.
    async fn broadcast(&self, message: &PushMessage);

    /// Deliver a frame to one specific observer.
    async fn notify(&self, observer: &ObserverId, message: &PushMessage);
}

/// Distributes one validated event to observers.
///
/// Per event: first an unfiltered `byBagType` broadcast, then, from a single
/// registry snapshot, a detailed `newData` plus an `increment` frame to every
/// observer whose filter matches the event's category exactly
/// (case-sensitive). No ordering is guaranteed across distinct events.
pub struct FanoutDispatcher {
    registry: Arc<SubscriptionRegistry>,
    notifier: Arc<dyn ObserverNotifier>,
}

impl FanoutDispatcher {
    pub fn new(registry: Arc<SubscriptionRegistry>, notifier: Arc<dyn ObserverNotifier>) -> Self {
        Self { registry, notifier }
    }

    #[instrument(skip_all, fields(category = %event.category))]
    pub async fn dispatch(&self, event: &SensorEvent) {
        self.notifier.broadcast(&PushMessage::by_bag_type(event)).await;

        let mut matched = 0usize;
        for (observer, filter) in self.registry.snapshot() {
            if filter.as_deref() == Some(event.category.as_str()) {
                self.notifier
                    .notify(&observer, &PushMessage::new_data(event))
                    .await;
                self.notifier
                    .notify(&observer, &PushMessage::increment(event))
                    .await;
                matched += 1;
            }
        }

        debug!(matched, "event fanned out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mockall::predicate;

    fn event(category: &str) -> SensorEvent {
        SensorEvent {
            category: category.to_string(),
            value: 1.0,
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_broadcast_happens_even_without_observers() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let mut notifier = MockObserverNotifier::new();
        notifier
            .expect_broadcast()
            .withf(|m| matches!(m, PushMessage::ByBagType(n) if n.category == "glass"))
            .times(1)
            .return_const(());
        notifier.expect_notify().times(0);

        let dispatcher = FanoutDispatcher::new(registry, Arc::new(notifier));
        dispatcher.dispatch(&event("glass")).await;
    }

    #[tokio::test]
    async fn test_matching_observer_gets_detail_and_increment() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let id = ObserverId::new();
        registry.register(id);
        registry.set_filter(id, "glass".to_string());

        let mut notifier = MockObserverNotifier::new();
        let mut seq = mockall::Sequence::new();
        notifier
            .expect_broadcast()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        notifier
            .expect_notify()
            .with(
                predicate::eq(id),
                predicate::function(|m: &PushMessage| matches!(m, PushMessage::NewData(_))),
            )
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        notifier
            .expect_notify()
            .with(
                predicate::eq(id),
                predicate::function(|m: &PushMessage| matches!(m, PushMessage::Increment(_))),
            )
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        let dispatcher = FanoutDispatcher::new(registry, Arc::new(notifier));
        dispatcher.dispatch(&event("glass")).await;
    }

    #[tokio::test]
    async fn test_non_matching_filter_receives_nothing_filtered() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let id = ObserverId::new();
        registry.register(id);
        registry.set_filter(id, "plastic".to_string());

        let mut notifier = MockObserverNotifier::new();
        notifier.expect_broadcast().times(1).return_const(());
        notifier.expect_notify().times(0);

        let dispatcher = FanoutDispatcher::new(registry, Arc::new(notifier));
        dispatcher.dispatch(&event("glass")).await;
    }

    #[tokio::test]
    async fn test_observer_without_filter_receives_nothing_filtered() {
        let registry = Arc::new(SubscriptionRegistry::new());
        registry.register(ObserverId::new());

        let mut notifier = MockObserverNotifier::new();
        notifier.expect_broadcast().times(1).return_const(());
        notifier.expect_notify().times(0);

        let dispatcher = FanoutDispatcher::new(registry, Arc::new(notifier));
        dispatcher.dispatch(&event("glass")).await;
    }

    #[tokio::test]
    async fn test_filter_match_is_case_sensitive() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let id = ObserverId::new();
        registry.register(id);
        registry.set_filter(id, "Glass".to_string());

        let mut notifier = MockObserverNotifier::new();
        notifier.expect_broadcast().times(1).return_const(());
        notifier.expect_notify().times(0);

        let dispatcher = FanoutDispatcher::new(registry, Arc::new(notifier));
        dispatcher.dispatch(&event("glass")).await;
    }

    #[tokio::test]
    async fn test_removed_observer_is_not_notified() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let id = ObserverId::new();
        registry.register(id);
        registry.set_filter(id, "glass".to_string());
        registry.remove(&id);

        let mut notifier = MockObserverNotifier::new();
        notifier.expect_broadcast().times(1).return_const(());
        notifier.expect_notify().times(0);

        let dispatcher = FanoutDispatcher::new(registry, Arc::new(notifier));
        dispatcher.dispatch(&event("glass")).await;
    }
}
