use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, atomic::{AtomicBool, Ordering}};
use std::thread::JoinHandle;
use rs_can::CanError;
use crate::device::ChannelHandle;
use crate::sink::SinkEndpoint;

/// A running poll worker and the resources it holds.
pub struct ChannelSubscription {
    worker: JoinHandle<()>,
    stop: Arc<AtomicBool>,
    sink: SinkEndpoint,
}

impl ChannelSubscription {
    pub fn new(worker: JoinHandle<()>, stop: Arc<AtomicBool>, sink: SinkEndpoint) -> Self {
        Self { worker, stop, sink }
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    /// Stop the worker, wait for it and release the sink, in that order.
    pub fn teardown(self) {
        let Self { worker, stop, sink } = self;
        stop.store(true, Ordering::Release);
        if worker.join().is_err() {
            log::warn!("ZLGCAN - poll worker of sink: {} panicked", sink.id());
        }
        sink.release();
    }
}

/// Subscriptions keyed by channel handle, at most one per handle.
///
/// The map lock is held for map mutation only; workers are always joined after
/// it is dropped. Registrations of one handle run one at a time, those of
/// distinct handles run concurrently.
#[derive(Default)]
pub struct HandleRegistry {
    subscriptions: Mutex<HashMap<ChannelHandle, ChannelSubscription>>,
    registering: Mutex<HashSet<ChannelHandle>>,
    registered: Condvar,
}

/// Marks a handle as being registered until dropped.
struct Registration<'a> {
    registry: &'a HandleRegistry,
    handle: ChannelHandle,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let mut registering = self.registry.registering.lock()
            .unwrap_or_else(|e| e.into_inner());
        registering.remove(&self.handle);
        self.registry.registered.notify_all();
    }
}

impl HandleRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Replace the subscription of `handle` with the one `spawn` starts.
    ///
    /// The previous subscription is torn down completely before `spawn` runs.
    /// A concurrent call for the same handle waits until this one has inserted
    /// its subscription, so two workers never poll one channel.
    pub fn subscribe_with<F>(&self, handle: ChannelHandle, spawn: F) -> Result<(), CanError>
    where
        F: FnOnce() -> Result<ChannelSubscription, CanError>,
    {
        let _registration = self.begin_registration(handle);
        self.unregister(handle);

        let subscription = spawn()?;
        let replaced = self.lock().insert(handle, subscription);
        if let Some(prev) = replaced {
            prev.teardown();
        }
        log::info!("ZLGCAN - channel: {} subscribed", handle);

        Ok(())
    }

    /// Returns `false` when `handle` has no subscription.
    pub fn unregister(&self, handle: ChannelHandle) -> bool {
        let removed = self.lock().remove(&handle);
        match removed {
            Some(subscription) => {
                log::info!("ZLGCAN - channel: {} unsubscribing", handle);
                subscription.teardown();
                true
            },
            None => false,
        }
    }

    /// Tear down the subscriptions of `handles`, returns how many existed.
    pub fn remove_all<'a>(&self, handles: impl IntoIterator<Item = &'a ChannelHandle>) -> usize {
        let removed = {
            let mut subscriptions = self.lock();
            handles.into_iter()
                .filter_map(|h| subscriptions.remove(h).map(|s| (*h, s)))
                .collect::<Vec<_>>()
        };

        Self::teardown_all(removed)
    }

    /// Tear down every subscription, returns how many existed.
    pub fn close_all(&self) -> usize {
        let removed = self.lock()
            .drain()
            .collect::<Vec<_>>();

        Self::teardown_all(removed)
    }

    #[inline]
    pub fn contains(&self, handle: ChannelHandle) -> bool {
        self.lock().contains_key(&handle)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn teardown_all(removed: Vec<(ChannelHandle, ChannelSubscription)>) -> usize {
        let count = removed.len();
        for (handle, subscription) in removed {
            log::info!("ZLGCAN - channel: {} unsubscribing", handle);
            subscription.teardown();
        }

        count
    }

    fn begin_registration(&self, handle: ChannelHandle) -> Registration<'_> {
        let mut registering = self.registering.lock()
            .unwrap_or_else(|e| e.into_inner());
        while registering.contains(&handle) {
            log::debug!("ZLGCAN - channel: {} waiting for a pending subscription", handle);
            registering = self.registered.wait(registering)
                .unwrap_or_else(|e| e.into_inner());
        }
        registering.insert(handle);

        Registration { registry: self, handle }
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, HashMap<ChannelHandle, ChannelSubscription>> {
        // teardown must proceed even after a panicking holder
        self.subscriptions.lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for HandleRegistry {
    fn drop(&mut self) {
        self.close_all();
    }
}
