//! Broadcaster wiring shared by every view

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use dv_core::{
    Channel, Coordinator, CoreError, DeliveryReport, LinkedView, Selection, SelectionBroadcaster,
    SubscriptionId,
};

/// A view's connection to the selection broadcaster
pub struct ViewLinks {
    broadcaster: Arc<SelectionBroadcaster>,
    listens_to: Vec<Channel>,
    publishes_on: Option<Channel>,
    subscriptions: Mutex<Vec<SubscriptionId>>,
    /// Set for the length of this view's own publish round
    publishing: AtomicBool,
}

impl ViewLinks {
    pub fn new(broadcaster: Arc<SelectionBroadcaster>, listens_to: Vec<Channel>, publishes_on: Option<Channel>) -> Self {
        Self {
            broadcaster,
            listens_to,
            publishes_on,
            subscriptions: Mutex::new(Vec::new()),
            publishing: AtomicBool::new(false),
        }
    }

    pub fn listens_to(&self) -> &[Channel] {
        &self.listens_to
    }

    pub fn publishes_on(&self) -> Option<&Channel> {
        self.publishes_on.as_ref()
    }

    /// Publish on this view's own channel. Other views on the same channel
    /// still hear it; this view skips the echo.
    pub fn publish(&self, selection: Selection) -> anyhow::Result<DeliveryReport> {
        let channel = self
            .publishes_on
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("view has no publish channel"))?;

        let _round = self.broadcaster.lock_round();
        let was_publishing = self.publishing.swap(true, Ordering::AcqRel);
        let _reset = PublishingReset {
            flag: &self.publishing,
            restore: was_publishing,
        };
        Ok(self.broadcaster.publish(channel, selection))
    }

    /// Whether a round started by this view is being delivered
    pub fn is_publishing(&self) -> bool {
        self.publishing.load(Ordering::Acquire)
    }

    pub fn subscriptions(&self) -> Vec<SubscriptionId> {
        self.subscriptions.lock().clone()
    }

    /// Drop every subscription this view holds
    pub fn detach(&self) {
        for id in self.subscriptions.lock().drain(..) {
            self.broadcaster.unsubscribe(id);
        }
    }
}

struct PublishingReset<'a> {
    flag: &'a AtomicBool,
    restore: bool,
}

impl Drop for PublishingReset<'_> {
    fn drop(&mut self) {
        self.flag.store(self.restore, Ordering::Release);
    }
}

/// Views that own a [`ViewLinks`]
pub trait Linked: LinkedView {
    fn links(&self) -> &ViewLinks;
}

/// Subscribe a freshly built view exactly once, then register it with the
/// coordinator, which brings it up to date with the current record set.
pub fn attach<V>(view: Arc<V>, coordinator: &Coordinator) -> Result<Arc<V>, CoreError>
where
    V: Linked + 'static,
{
    {
        let links = view.links();
        let mut subscriptions = links.subscriptions.lock();
        if subscriptions.is_empty() {
            for channel in links.listens_to() {
                let weak = Arc::downgrade(&view);
                subscriptions.push(links.broadcaster.subscribe(channel, weak));
            }
        }
    }

    coordinator.register_view(view.clone())?;
    Ok(view)
}

/// Undo [`attach`]: drop the view's subscriptions and stop the coordinator
/// refreshing it. Once the caller's handles are gone the view is freed.
pub fn detach<V>(view: &V, coordinator: &Coordinator) -> bool
where
    V: Linked + ?Sized,
{
    view.links().detach();
    coordinator.unregister_view(view.id())
}
