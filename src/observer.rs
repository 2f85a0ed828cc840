//! Event observers.
//!
//! Every decoded [`Event`] is delivered to all global observers, in
//! registration order, then to every per-kind callback registered for its
//! [`EventKind`], in registration order. Callbacks run on the engine task:
//! they must not block. The `&Client` they receive can queue presence
//! updates or join replies, which the engine processes after the callback
//! returns.

use crate::client::Client;
use crate::event::{Event, EventKind};

/// Receives events from the engine.
pub trait EventHandler: Send {
    /// Called once per event.
    fn handle(&mut self, client: &Client, event: &Event);
}

impl<F> EventHandler for F
where
    F: FnMut(&Client, &Event) + Send,
{
    fn handle(&mut self, client: &Client, event: &Event) {
        self(client, event);
    }
}

/// Ordered observer set.
#[derive(Default)]
pub(crate) struct Observers {
    global: Vec<Box<dyn EventHandler>>,
    by_kind: Vec<(EventKind, Box<dyn EventHandler>)>,
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("global", &self.global.len())
            .field(
                "by_kind",
                &self.by_kind.iter().map(|(kind, _)| kind).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Observers {
    /// Register an observer for every event.
    pub(crate) fn observe(&mut self, handler: impl EventHandler + 'static) {
        self.global.push(Box::new(handler));
    }

    /// Register a callback for one event kind.
    pub(crate) fn on(&mut self, kind: EventKind, handler: impl EventHandler + 'static) {
        self.by_kind.push((kind, Box::new(handler)));
    }

    /// Deliver `event` to every matching observer.
    pub(crate) fn notify(&mut self, client: &Client, event: &Event) {
        for handler in &mut self.global {
            handler.handle(client, event);
        }

        let kind = event.kind();
        for (_, handler) in self.by_kind.iter_mut().filter(|(k, _)| *k == kind) {
            handler.handle(client, event);
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.global.is_empty() && self.by_kind.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &'static str) -> impl EventHandler {
        let log = Arc::clone(log);
        move |_: &Client, event: &Event| {
            log.lock().unwrap().push(format!("{tag}:{:?}", event.kind()));
        }
    }

    #[test]
    fn test_global_before_kind_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut observers = Observers::default();
        observers.on(EventKind::Ready, recorder(&log, "kind1"));
        observers.observe(recorder(&log, "global1"));
        observers.on(EventKind::Ready, recorder(&log, "kind2"));
        observers.observe(recorder(&log, "global2"));

        observers.notify(&Client::detached("1"), &Event::Ready);

        assert_eq!(
            *log.lock().unwrap(),
            vec!["global1:Ready", "global2:Ready", "kind1:Ready", "kind2:Ready"]
        );
    }

    #[test]
    fn test_kind_callbacks_are_filtered() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut observers = Observers::default();
        observers.on(EventKind::Join, recorder(&log, "join"));
        observers.on(EventKind::Spectate, recorder(&log, "spectate"));

        let event = Event::Spectate {
            secret: "s".to_string(),
        };
        observers.notify(&Client::detached("1"), &event);

        assert_eq!(*log.lock().unwrap(), vec!["spectate:Spectate"]);
    }

    #[test]
    fn test_empty() {
        let mut observers = Observers::default();
        assert!(observers.is_empty());
        observers.observe(|_: &Client, _: &Event| {});
        assert!(!observers.is_empty());
    }
}
