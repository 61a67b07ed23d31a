//! Cross-thread frame delivery.
//!
//! Poll workers push whole batches through a [`SinkSender`]; the thread that owns
//! the [`EventLoop`] pulls them and invokes each sink's callback there, one batch
//! per call, in the order the batches were sent.

use std::collections::HashMap;
use std::sync::{Arc, atomic::{AtomicBool, AtomicU64, Ordering}, mpsc::{channel, Receiver, RecvTimeoutError, Sender}};
use std::time::{Duration, Instant};
use rs_can::CanError;
use crate::can::CanMessage;

/// Consumer callback of a subscription.
pub type FrameCallback = Box<dyn FnMut(Vec<CanMessage>) + Send>;

enum Event {
    Register { id: u64, open: Arc<AtomicBool>, callback: FrameCallback },
    Frames { id: u64, frames: Vec<CanMessage> },
    Release { id: u64 },
}

struct SinkState {
    open: Arc<AtomicBool>,
    callback: FrameCallback,
}

/// The single consumer execution context.
///
/// Callbacks run only inside [`EventLoop::dispatch_pending`] and friends, on the
/// calling thread, never re-entrantly.
///
/// The queue is unbounded: batches accumulate until the owner dispatches, so
/// the owner must pump the loop at least as fast as subscriptions poll. Batches
/// a released sink had already queued stay in memory until the next dispatch
/// drops them; [`SinkSender::deliver`] refuses new ones.
pub struct EventLoop {
    sender: Sender<Event>,
    receiver: Receiver<Event>,
    next_id: Arc<AtomicU64>,
    sinks: HashMap<u64, SinkState>,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self {
            sender,
            receiver,
            next_id: Arc::new(AtomicU64::new(1)),
            sinks: Default::default(),
        }
    }

    #[inline]
    pub fn handle(&self) -> EventLoopHandle {
        EventLoopHandle {
            sender: self.sender.clone(),
            next_id: Arc::clone(&self.next_id),
        }
    }

    /// Count of sinks registered and not yet released.
    #[inline]
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Handle every queued event without blocking, returns the count of callbacks invoked.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut count = 0;
        while let Ok(event) = self.receiver.try_recv() {
            count += self.handle_event(event);
        }

        count
    }

    /// Wait up to `timeout` for the first event, then drain the queue.
    pub fn dispatch_timeout(&mut self, timeout: Duration) -> usize {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => self.handle_event(event) + self.dispatch_pending(),
            Err(RecvTimeoutError::Timeout) => 0,
            // we hold a sender ourselves
            Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    /// Dispatch for `duration`, returns the count of callbacks invoked.
    pub fn run_for(&mut self, duration: Duration) -> usize {
        let deadline = Instant::now() + duration;
        let mut count = 0;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break count;
            }
            count += self.dispatch_timeout(deadline - now);
        }
    }

    /// Dispatch until `done` holds or `timeout` elapses, returns the last `done` result.
    pub fn run_until(&mut self, timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if done() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.dispatch_timeout((deadline - now).min(Duration::from_millis(10)));
        }
    }

    fn handle_event(&mut self, event: Event) -> usize {
        match event {
            Event::Register { id, open, callback } => {
                log::trace!("ZLGCAN - sink: {} registered", id);
                self.sinks.insert(id, SinkState { open, callback });
                0
            },
            Event::Frames { id, frames } => match self.sinks.get_mut(&id) {
                Some(state) if state.open.load(Ordering::Acquire) => {
                    log::debug!("ZLGCAN - sink: {} dispatching {} frame(s)", id, frames.len());
                    (state.callback)(frames);
                    1
                },
                _ => {
                    log::trace!("ZLGCAN - sink: {} is released, {} frame(s) discarded", id, frames.len());
                    0
                },
            },
            Event::Release { id } => {
                log::trace!("ZLGCAN - sink: {} released", id);
                self.sinks.remove(&id);
                0
            },
        }
    }
}

/// Cloneable, thread-safe entry into an [`EventLoop`].
#[derive(Clone)]
pub struct EventLoopHandle {
    sender: Sender<Event>,
    next_id: Arc<AtomicU64>,
}

impl EventLoopHandle {
    /// Open a sink whose deliveries invoke `callback` on the loop's thread.
    pub fn open_sink(&self, callback: FrameCallback) -> Result<SinkEndpoint, CanError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let open = Arc::new(AtomicBool::new(true));
        self.sender.send(Event::Register { id, open: Arc::clone(&open), callback })
            .map_err(|_| CanError::other_error("event loop is dropped"))?;

        Ok(SinkEndpoint {
            sender: SinkSender { id, open, sender: self.sender.clone() },
        })
    }
}

/// Owner side of a sink, held by the subscription.
pub struct SinkEndpoint {
    sender: SinkSender,
}

impl SinkEndpoint {
    #[inline]
    pub fn id(&self) -> u64 {
        self.sender.id
    }

    #[inline]
    pub fn sender(&self) -> SinkSender {
        self.sender.clone()
    }

    /// Close the sink. Queued and later deliveries are discarded.
    pub fn release(self) {
        self.sender.open.store(false, Ordering::Release);
        // the loop may already be gone
        let _ = self.sender.sender.send(Event::Release { id: self.sender.id });
    }
}

/// Producer side of a sink, moved into a worker thread.
#[derive(Clone)]
pub struct SinkSender {
    id: u64,
    open: Arc<AtomicBool>,
    sender: Sender<Event>,
}

impl SinkSender {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Queue one batch, returns `false` when the sink or its loop is gone.
    pub fn deliver(&self, frames: Vec<CanMessage>) -> bool {
        if !self.is_open() {
            return false;
        }

        self.sender.send(Event::Frames { id: self.id, frames }).is_ok()
    }
}
