use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use rs_can::CanError;
use crate::api::ZCanApi;
use crate::can::{decode_can, decode_canfd, CanMessage, ZCanChlType, ZCanFdRxFrame, ZCanRxFrame};
use crate::device::ChannelHandle;
use crate::sink::SinkSender;

/// Read up to `max_count` classic frames, each truncated to its own DLC.
pub(crate) fn read_can<A: ZCanApi + ?Sized>(
    api: &A,
    handle: ChannelHandle,
    channel: u8,
    max_count: u32,
    timeout: i32,
) -> Result<Vec<CanMessage>, CanError> {
    let mut frames = vec![ZCanRxFrame::default(); max_count as usize];
    let count = api.receive(handle, &mut frames, timeout)? as usize;

    Ok(frames.iter()
        .take(count)
        .map(|raw| decode_can(raw, channel))
        .collect())
}

/// Read up to `max_count` CAN-FD frames, each truncated to its own length.
pub(crate) fn read_canfd<A: ZCanApi + ?Sized>(
    api: &A,
    handle: ChannelHandle,
    channel: u8,
    max_count: u32,
    timeout: i32,
) -> Result<Vec<CanMessage>, CanError> {
    let mut frames = vec![ZCanFdRxFrame::default(); max_count as usize];
    let count = api.receive_fd(handle, &mut frames, timeout)? as usize;

    Ok(frames.iter()
        .take(count)
        .map(|raw| decode_canfd(raw, channel))
        .collect())
}

/// Non-blocking receive loop of one subscribed channel.
pub struct PollWorker<A: ZCanApi + ?Sized> {
    pub(crate) api: Arc<A>,
    pub(crate) handle: ChannelHandle,
    pub(crate) channel: u8,
    pub(crate) can_type: ZCanChlType,
    pub(crate) batch_size: u32,
    pub(crate) interval: Duration,
    pub(crate) stop: Arc<AtomicBool>,
    pub(crate) sink: SinkSender,
}

impl<A: ZCanApi + ?Sized + 'static> PollWorker<A> {
    pub fn spawn(self) -> Result<JoinHandle<()>, CanError> {
        thread::Builder::new()
            .name(format!("zlgcan-poll-{}", self.channel))
            .spawn(move || self.run())
            .map_err(|e| CanError::OtherError(format!("can't spawn poll worker: {}", e)))
    }

    fn run(self) {
        log::debug!("ZLGCAN - poll worker of channel: {}({}) started", self.channel, self.handle);
        while !self.stop.load(Ordering::Acquire) {
            self.poll_once();
            thread::sleep(self.interval);
        }
        log::debug!("ZLGCAN - poll worker of channel: {}({}) stopped", self.channel, self.handle);
    }

    /// One pass over the driver queues, returns the count of frames delivered.
    pub(crate) fn poll_once(&self) -> usize {
        let mut count = self.forward(
            "CAN",
            read_can(self.api.as_ref(), self.handle, self.channel, self.batch_size, 0)
        );
        if self.can_type == ZCanChlType::CANFD {
            count += self.forward(
                "CAN-FD",
                read_canfd(self.api.as_ref(), self.handle, self.channel, self.batch_size, 0)
            );
        }

        count
    }

    fn forward(&self, kind: &str, frames: Result<Vec<CanMessage>, CanError>) -> usize {
        match frames {
            Ok(frames) if frames.is_empty() => 0,
            Ok(frames) => {
                let count = frames.len();
                log::trace!("ZLGCAN - channel: {} received {} {} frame(s)", self.channel, count, kind);
                if self.sink.deliver(frames) {
                    count
                }
                else {
                    log::trace!("ZLGCAN - channel: {} sink closed, {} frame(s) dropped", self.channel, count);
                    0
                }
            },
            Err(e) => {
                log::warn!("ZLGCAN - channel: {} receive {} failed: {}", self.channel, kind, e);
                0
            },
        }
    }
}
