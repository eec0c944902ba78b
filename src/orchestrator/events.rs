//! Typed signal topics.
//!
//! Each signal (log, progress, done, error) is a `Topic`, and a combined topic
//! carries all four in emission order. Subscribers get their own unbounded
//! channel, so a slow consumer never stalls the run.

use crate::model::{RunSummary, UiEvent};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

struct Subscriber<T> {
    id: u64,
    tx: UnboundedSender<T>,
}

struct TopicInner<T> {
    next_id: u64,
    subscribers: Vec<Subscriber<T>>,
}

pub struct Topic<T> {
    inner: Mutex<TopicInner<T>>,
}

impl<T: Clone> Topic<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(TopicInner {
                next_id: 0,
                subscribers: Vec::new(),
            }),
        })
    }

    pub fn subscribe(self: &Arc<Self>) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push(Subscriber { id, tx });
        Subscription {
            id,
            rx,
            topic: Arc::downgrade(self),
        }
    }

    /// Deliver `value` to every live subscriber, pruning closed ones.
    pub fn publish(&self, value: T) {
        let mut inner = self.lock();
        inner
            .subscribers
            .retain(|s| s.tx.send(value.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TopicInner<T>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Receiving end of one subscription. Dropping it unsubscribes.
pub struct Subscription<T> {
    id: u64,
    rx: UnboundedReceiver<T>,
    topic: Weak<Topic<T>>,
}

impl<T> Subscription<T> {
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    pub fn unsubscribe(self) {
        // Drop does the work.
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(topic) = self.topic.upgrade() {
            let mut inner = topic
                .inner
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            inner.subscribers.retain(|s| s.id != self.id);
        }
    }
}

/// The four presentation signals of a coordinator, plus one stream carrying
/// all of them in emission order.
pub struct EventHub {
    pub log: Arc<Topic<String>>,
    pub progress: Arc<Topic<f64>>,
    pub done: Arc<Topic<RunSummary>>,
    pub error: Arc<Topic<String>>,
    all: Arc<Topic<UiEvent>>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self {
            log: Topic::new(),
            progress: Topic::new(),
            done: Topic::new(),
            error: Topic::new(),
            all: Topic::new(),
        }
    }
}

impl EventHub {
    /// Publish `event` on its own signal and on the combined stream.
    pub fn emit(&self, event: UiEvent) {
        match &event {
            UiEvent::Log(line) => self.log.publish(line.clone()),
            UiEvent::Progress(pct) => self.progress.publish(*pct),
            UiEvent::Done(summary) => self.done.publish(*summary),
            UiEvent::Error(msg) => self.error.publish(msg.clone()),
        }
        self.all.publish(event);
    }

    pub fn subscribe_all(&self) -> UiSubscriptions {
        UiSubscriptions {
            events: self.all.subscribe(),
        }
    }
}

/// Every signal as one ordered stream, for consumers that render them together.
pub struct UiSubscriptions {
    events: Subscription<UiEvent>,
}

impl UiSubscriptions {
    /// Drain everything currently queued without blocking.
    pub fn drain(&mut self) -> Vec<UiEvent> {
        let mut out = Vec::new();
        while let Some(ev) = self.events.try_recv() {
            out.push(ev);
        }
        out
    }

    pub fn unsubscribe(self) {
        self.events.unsubscribe();
    }

    /// Wait for the next event on any signal.
    pub async fn next(&mut self) -> Option<UiEvent> {
        self.events.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_reaches_every_subscriber() {
        let topic = Topic::<String>::new();
        let mut a = topic.subscribe();
        let mut b = topic.subscribe();

        topic.publish("hello".into());

        assert_eq!(a.try_recv().as_deref(), Some("hello"));
        assert_eq!(b.try_recv().as_deref(), Some("hello"));
        assert!(a.try_recv().is_none());
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let topic = Topic::<f64>::new();
        let mut keep = topic.subscribe();
        let gone = topic.subscribe();
        assert_eq!(topic.subscriber_count(), 2);

        gone.unsubscribe();
        assert_eq!(topic.subscriber_count(), 1);

        topic.publish(50.0);
        assert_eq!(keep.try_recv(), Some(50.0));
    }

    #[test]
    fn subscription_outliving_topic_is_harmless() {
        let topic = Topic::<u8>::new();
        let sub = topic.subscribe();
        drop(topic);
        drop(sub);
    }

    #[tokio::test]
    async fn combined_stream_keeps_emission_order() {
        let hub = EventHub::default();
        let mut subs = hub.subscribe_all();
        let mut errors = hub.error.subscribe();

        hub.emit(UiEvent::Log("Request: a".into()));
        hub.emit(UiEvent::Error("b failed".into()));
        hub.emit(UiEvent::Log("Request: c".into()));
        hub.emit(UiEvent::Done(RunSummary::default()));
        hub.emit(UiEvent::Progress(100.0));

        assert_eq!(
            subs.drain(),
            vec![
                UiEvent::Log("Request: a".into()),
                UiEvent::Error("b failed".into()),
                UiEvent::Log("Request: c".into()),
                UiEvent::Done(RunSummary::default()),
                UiEvent::Progress(100.0),
            ]
        );
        assert_eq!(errors.try_recv().as_deref(), Some("b failed"));

        hub.emit(UiEvent::Log("again".into()));
        assert_eq!(subs.next().await, Some(UiEvent::Log("again".into())));

        subs.unsubscribe();
        assert_eq!(hub.all.subscriber_count(), 0);
    }
}
