use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};

use crate::sync::{ActiveSelection, Selection};

/// Named broadcast topic
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Channel(Cow<'static, str>);

impl Channel {
    /// Selections made by brushing a map
    pub const FROM_MAP: Channel = Channel(Cow::Borrowed("selection-from-map"));

    /// Selections made by brushing the scatter plot
    pub const FROM_SCATTER: Channel = Channel(Cow::Borrowed("selection-from-scatter"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Receiver of published selections
pub trait SelectionSubscriber: Send + Sync {
    fn on_selection(&self, channel: &Channel, selection: &Selection) -> anyhow::Result<()>;
}

/// Handle returned by every subscribe call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// A subscriber that failed during a delivery round
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriberFailure {
    pub subscription: SubscriptionId,
    pub channel: Channel,
    pub message: String,
}

/// Outcome of one publish call
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub channel: Channel,
    pub sequence: u64,
    /// Subscribers invoked, failed ones included
    pub delivered: usize,
    pub failures: Vec<SubscriberFailure>,
}

impl DeliveryReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

enum SubscriberRef {
    Weak(Weak<dyn SelectionSubscriber>),
    Owned(Arc<dyn SelectionSubscriber>),
}

impl SubscriberRef {
    fn upgrade(&self) -> Option<Arc<dyn SelectionSubscriber>> {
        match self {
            SubscriberRef::Weak(weak) => weak.upgrade(),
            SubscriberRef::Owned(arc) => Some(Arc::clone(arc)),
        }
    }

    fn is_alive(&self) -> bool {
        match self {
            SubscriberRef::Weak(weak) => weak.strong_count() > 0,
            SubscriberRef::Owned(_) => true,
        }
    }
}

struct Registration {
    id: SubscriptionId,
    subscriber: SubscriberRef,
}

/// Publish/subscribe hub for selections.
///
/// Delivery is synchronous: every live subscriber of the channel runs, in
/// subscription order, before `publish` returns. A failing subscriber is
/// reported in the [`DeliveryReport`] and never stops the round. Views filter
/// their own echoes by not subscribing to the channel they publish on.
pub struct SelectionBroadcaster {
    registry: RwLock<IndexMap<Channel, Vec<Registration>>>,
    active: RwLock<Option<ActiveSelection>>,
    /// Serializes publish rounds and rebuilds; re-entrant so handlers may publish
    round: ReentrantMutex<()>,
    next_id: AtomicU64,
    sequence: AtomicU64,
}

impl SelectionBroadcaster {
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(IndexMap::new()),
            active: RwLock::new(None),
            round: ReentrantMutex::new(()),
            next_id: AtomicU64::new(1),
            sequence: AtomicU64::new(0),
        }
    }

    /// Subscribe without keeping the subscriber alive
    pub fn subscribe(&self, channel: &Channel, subscriber: Weak<dyn SelectionSubscriber>) -> SubscriptionId {
        self.register(channel, SubscriberRef::Weak(subscriber))
    }

    /// Subscribe and keep the subscriber alive until unsubscribed
    pub fn subscribe_owned(&self, channel: &Channel, subscriber: Arc<dyn SelectionSubscriber>) -> SubscriptionId {
        self.register(channel, SubscriberRef::Owned(subscriber))
    }

    /// Subscribe a closure
    pub fn subscribe_fn<F>(&self, channel: &Channel, f: F) -> SubscriptionId
    where
        F: Fn(&Selection) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe_owned(channel, handler_from_fn(f))
    }

    fn register(&self, channel: &Channel, subscriber: SubscriberRef) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.registry
            .write()
            .entry(channel.clone())
            .or_default()
            .push(Registration { id, subscriber });
        tracing::debug!("Subscription {:?} added on '{}'", id, channel);
        id
    }

    /// Remove a subscription. Unknown ids are ignored and return `false`.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry.write();
        for registrations in registry.values_mut() {
            if let Some(position) = registrations.iter().position(|r| r.id == id) {
                registrations.remove(position);
                return true;
            }
        }
        false
    }

    /// Number of live subscribers on a channel
    pub fn subscriber_count(&self, channel: &Channel) -> usize {
        self.registry
            .read()
            .get(channel)
            .map(|regs| regs.iter().filter(|r| r.subscriber.is_alive()).count())
            .unwrap_or(0)
    }

    /// Publish a selection and deliver it to the channel's subscribers.
    ///
    /// The selection becomes the active one before any subscriber runs.
    pub fn publish(&self, channel: &Channel, selection: Selection) -> DeliveryReport {
        let _round = self.round.lock();
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;

        *self.active.write() = Some(ActiveSelection {
            channel: channel.clone(),
            selection: selection.clone(),
            sequence,
        });

        // Snapshot so handlers may (un)subscribe or publish without deadlocking
        let (live, dead) = {
            let registry = self.registry.read();
            let mut live = Vec::new();
            let mut dead = 0usize;
            for registration in registry.get(channel).into_iter().flatten() {
                match registration.subscriber.upgrade() {
                    Some(subscriber) => live.push((registration.id, subscriber)),
                    None => dead += 1,
                }
            }
            (live, dead)
        };
        if dead > 0 {
            self.prune(channel);
        }

        tracing::debug!(
            "Round {} on '{}': {} ids to {} subscribers",
            sequence,
            channel,
            selection.len(),
            live.len()
        );

        let mut failures = Vec::new();
        for (id, subscriber) in &live {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| subscriber.on_selection(channel, &selection)));
            let message = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => format!("{e:#}"),
                Err(payload) => format!("panicked: {}", panic_message(payload.as_ref())),
            };
            tracing::warn!("Subscriber {:?} on '{}' failed: {}", id, channel, message);
            failures.push(SubscriberFailure {
                subscription: *id,
                channel: channel.clone(),
                message,
            });
        }

        DeliveryReport {
            channel: channel.clone(),
            sequence,
            delivered: live.len(),
            failures,
        }
    }

    /// Publish the empty selection
    pub fn clear(&self, channel: &Channel) -> DeliveryReport {
        self.publish(channel, Selection::empty())
    }

    /// The last published selection; `None` if nothing was ever published
    pub fn active_selection(&self) -> Option<ActiveSelection> {
        self.active.read().clone()
    }

    /// Hold the round lock, keeping publishes out while a rebuild runs
    pub fn lock_round(&self) -> ReentrantMutexGuard<'_, ()> {
        self.round.lock()
    }

    fn prune(&self, channel: &Channel) {
        if let Some(registrations) = self.registry.write().get_mut(channel) {
            registrations.retain(|r| r.subscriber.is_alive());
        }
    }
}

impl Default for SelectionBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscriber wrapping a closure
pub struct ClosureSubscriber<F> {
    handler: F,
}

impl<F> SelectionSubscriber for ClosureSubscriber<F>
where
    F: Fn(&Selection) -> anyhow::Result<()> + Send + Sync,
{
    fn on_selection(&self, _channel: &Channel, selection: &Selection) -> anyhow::Result<()> {
        (self.handler)(selection)
    }
}

/// Create a subscriber from a closure
pub fn handler_from_fn<F>(f: F) -> Arc<dyn SelectionSubscriber>
where
    F: Fn(&Selection) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(ClosureSubscriber { handler: f })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
