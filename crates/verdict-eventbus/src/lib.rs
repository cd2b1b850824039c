//! Event bus for test lifecycle events.
//!
//! Producers (the step runner) publish [`TestEvent`]s; listeners subscribe per
//! [`EventKind`] and get a [`HandlerToken`] back that removes them again.
//! Delivery is synchronous, in publication order, on the publishing thread.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use verdict_schema::{EventKind, TestEvent};

/// Event handler callback.
pub type EventHandler = Arc<dyn Fn(&TestEvent) + Send + Sync>;

/// Identifies one subscription so it can be removed later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerToken {
    kind: EventKind,
    id: u64,
}

impl HandlerToken {
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

/// The narrow capability a listener needs from a bus.
pub trait EventSubscriber: Send + Sync {
    /// Register a handler for one event kind.
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> HandlerToken;

    /// Remove a handler. Returns false if the token was not registered.
    fn unsubscribe(&self, token: HandlerToken) -> bool;
}

/// The event bus for distributing events to handlers.
pub struct EventBus {
    handlers: Arc<RwLock<BTreeMap<EventKind, Vec<(u64, EventHandler)>>>>,
    next_id: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Create a new event bus with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a closure for an event kind.
    pub fn subscribe_fn<F>(&self, kind: EventKind, handler: F) -> HandlerToken
    where
        F: Fn(&TestEvent) + Send + Sync + 'static,
    {
        self.subscribe(kind, Arc::new(handler))
    }

    /// Emit an event to all handlers registered for its kind.
    ///
    /// Handlers run after the registry lock is released, so a handler may
    /// subscribe or unsubscribe without deadlocking.
    pub fn emit(&self, event: impl Into<TestEvent>) {
        let event = event.into();
        let kind = event.kind();

        let targets: Vec<EventHandler> = {
            let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
            handlers
                .get(&kind)
                .map(|h| h.iter().map(|(_, handler)| Arc::clone(handler)).collect())
                .unwrap_or_default()
        };

        tracing::trace!(%kind, handlers = targets.len(), "dispatching event");
        for handler in targets {
            handler(&event);
        }
    }

    /// Get the number of handlers for an event kind.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        handlers.get(&kind).map(|h| h.len()).unwrap_or(0)
    }

    /// Get all event kinds that currently have handlers.
    pub fn event_kinds(&self) -> Vec<EventKind> {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        handlers
            .iter()
            .filter(|(_, h)| !h.is_empty())
            .map(|(kind, _)| *kind)
            .collect()
    }
}

impl EventSubscriber for EventBus {
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> HandlerToken {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        handlers.entry(kind).or_default().push((id, handler));
        tracing::trace!(%kind, id, "handler subscribed");
        HandlerToken { kind, id }
    }

    fn unsubscribe(&self, token: HandlerToken) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let Some(registered) = handlers.get_mut(&token.kind) else {
            return false;
        };
        let before = registered.len();
        registered.retain(|(id, _)| *id != token.id);
        let removed = registered.len() != before;
        if registered.is_empty() {
            handlers.remove(&token.kind);
        }
        if removed {
            tracing::trace!(kind = %token.kind, id = token.id, "handler unsubscribed");
        }
        removed
    }
}

impl<T: EventSubscriber + ?Sized> EventSubscriber for Arc<T> {
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> HandlerToken {
        (**self).subscribe(kind, handler)
    }

    fn unsubscribe(&self, token: HandlerToken) -> bool {
        (**self).unsubscribe(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use url::Url;
    use verdict_error::error;
    use verdict_schema::{SnippetsSuggested, Status, TestCaseFinished, TestResult};

    fn snippets(line: u32) -> SnippetsSuggested {
        SnippetsSuggested {
            uri: Url::parse("file:///a.feature").unwrap(),
            step_line: line,
            snippets: vec![format!("snippet {line}")],
        }
    }

    fn case_finished() -> TestCaseFinished {
        TestCaseFinished {
            result: TestResult::passed(),
        }
    }

    #[test]
    fn test_eventbus_subscribe_emit() {
        let bus = EventBus::new();
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = received.clone();

        bus.subscribe_fn(EventKind::SnippetsSuggested, move |event| {
            received_clone.lock().unwrap().push(event.clone());
        });

        bus.emit(snippets(3));
        bus.emit(case_finished());

        let events = received.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), EventKind::SnippetsSuggested);
    }

    #[test]
    fn test_eventbus_delivers_in_emission_order() {
        let bus = EventBus::default();
        let lines = Arc::new(Mutex::new(Vec::new()));
        let lines_clone = lines.clone();

        bus.subscribe_fn(EventKind::SnippetsSuggested, move |event| {
            if let TestEvent::SnippetsSuggested(s) = event {
                lines_clone.lock().unwrap().push(s.step_line);
            }
        });

        for line in [7, 2, 9] {
            bus.emit(snippets(line));
        }

        assert_eq!(*lines.lock().unwrap(), vec![7, 2, 9]);
    }

    #[test]
    fn test_eventbus_unsubscribe() {
        let bus = EventBus::default();
        let count = Arc::new(AtomicU64::new(0));
        let count_clone = count.clone();

        let token = bus.subscribe_fn(EventKind::TestCaseFinished, move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        bus.emit(case_finished());

        assert!(bus.unsubscribe(token));
        bus.emit(case_finished());

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.handler_count(EventKind::TestCaseFinished), 0);
    }

    #[test]
    fn test_eventbus_unsubscribe_twice_is_noop() {
        let bus = EventBus::default();
        let token = bus.subscribe_fn(EventKind::TestCaseFinished, |_| {});

        assert!(bus.unsubscribe(token));
        assert!(!bus.unsubscribe(token));
    }

    #[test]
    fn test_eventbus_unsubscribe_only_removes_own_handler() {
        let bus = EventBus::default();
        let first = bus.subscribe_fn(EventKind::TestCaseFinished, |_| {});
        let _second = bus.subscribe_fn(EventKind::TestCaseFinished, |_| {});

        bus.unsubscribe(first);
        assert_eq!(bus.handler_count(EventKind::TestCaseFinished), 1);
    }

    #[test]
    fn test_handler_may_unsubscribe_itself() {
        let bus = Arc::new(EventBus::default());
        let token_slot: Arc<Mutex<Option<HandlerToken>>> = Arc::new(Mutex::new(None));

        let bus_clone = Arc::clone(&bus);
        let slot_clone = Arc::clone(&token_slot);
        let token = bus.subscribe_fn(EventKind::TestCaseFinished, move |_| {
            if let Some(token) = slot_clone.lock().unwrap().take() {
                bus_clone.unsubscribe(token);
            }
        });
        *token_slot.lock().unwrap() = Some(token);

        bus.emit(case_finished());
        assert_eq!(bus.handler_count(EventKind::TestCaseFinished), 0);
    }

    #[test]
    fn test_eventbus_does_not_retain_events() {
        let bus = EventBus::new();
        bus.subscribe_fn(EventKind::TestCaseFinished, |_| {});
        let failure = error("boom").into_shared();

        bus.emit(TestCaseFinished {
            result: TestResult::with_error(Status::Failed, Arc::clone(&failure)),
        });

        assert_eq!(Arc::strong_count(&failure), 1);
    }

    #[test]
    fn test_eventbus_event_kinds() {
        let bus = EventBus::new();

        bus.subscribe_fn(EventKind::TestStepFinished, |_| {});
        let token = bus.subscribe_fn(EventKind::SnippetsSuggested, |_| {});

        assert_eq!(
            bus.event_kinds(),
            vec![EventKind::TestStepFinished, EventKind::SnippetsSuggested]
        );

        bus.unsubscribe(token);
        assert_eq!(bus.event_kinds(), vec![EventKind::TestStepFinished]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_eventbus_delivers_on_producer_thread() {
        let bus = Arc::new(EventBus::default());
        let count = Arc::new(AtomicU64::new(0));
        let count_clone = count.clone();
        bus.subscribe_fn(EventKind::SnippetsSuggested, move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let producer = Arc::clone(&bus);
        tokio::task::spawn_blocking(move || {
            for line in 0..10 {
                producer.emit(snippets(line));
            }
        })
        .await
        .unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 10);
    }
}
