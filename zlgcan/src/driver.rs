use std::collections::HashMap;
use std::sync::{Arc, atomic::AtomicBool};
use rs_can::CanError;
use crate::api::{ZCanApi, ZCanLibrary};
use crate::can::{
    decode_data, encode_can, encode_canfd, encode_data, CanMessage, ChannelConfig, ZCanChlError, ZCanChlStatus, ZCanChlType,
    ZCanData, ZCanDataObj, ZCanFrameType, MAX_RECEIVE_COUNT,
};
use crate::config::DriverConfig;
use crate::device::{ChannelHandle, DeviceHandle, PropertyHandle, ZDeviceInfo, ZDeviceInfoEx};
use crate::registry::{ChannelSubscription, HandleRegistry};
use crate::sink::EventLoopHandle;
use crate::worker::{read_can, read_canfd, PollWorker};

#[derive(Debug, Copy, Clone)]
struct ChannelContext {
    index: u8,
    can_type: ZCanChlType,
}

/// One adapter device and the channels initialized on it.
///
/// The device is `Closed` until [`ZCanDriver::open`] succeeds and again after
/// [`ZCanDriver::close`]; every channel handle is forgotten on close. Dropping
/// the driver closes it.
///
/// Subscriptions live in a [`HandleRegistry`], shared with other devices when
/// built by [`ZCanDriver::with_registry`].
pub struct ZCanDriver<A: ZCanApi + ?Sized = ZCanLibrary> {
    api: Arc<A>,
    events: EventLoopHandle,
    registry: Arc<HandleRegistry>,
    config: DriverConfig,
    device: DeviceHandle,
    channels: HashMap<ChannelHandle, ChannelContext>,
    property: Option<PropertyHandle>,
}

impl ZCanDriver<ZCanLibrary> {
    /// Load the vendor library named by `config`.
    pub fn load(config: DriverConfig, events: EventLoopHandle) -> Result<Self, CanError> {
        let api = Arc::new(ZCanLibrary::load(&config)?);
        Ok(Self::new(api, events, config))
    }
}

impl<A: ZCanApi + ?Sized> ZCanDriver<A> {
    pub fn new(api: Arc<A>, events: EventLoopHandle, config: DriverConfig) -> Self {
        Self::with_registry(api, events, config, Arc::new(HandleRegistry::new()))
    }

    pub fn with_registry(api: Arc<A>, events: EventLoopHandle, config: DriverConfig, registry: Arc<HandleRegistry>) -> Self {
        Self {
            api,
            events,
            registry,
            config,
            device: DeviceHandle::INVALID,
            channels: Default::default(),
            property: None,
        }
    }

    #[inline]
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    #[inline]
    pub fn registry(&self) -> &Arc<HandleRegistry> {
        &self.registry
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.device.is_valid()
    }

    /// The device handle, [`DeviceHandle::INVALID`] while closed.
    #[inline]
    pub fn device_handle(&self) -> DeviceHandle {
        self.device
    }

    /// The handle initialized for channel `index`, if any.
    pub fn channel_handle(&self, index: u8) -> Option<ChannelHandle> {
        self.channels.iter()
            .find(|(_, ctx)| ctx.index == index)
            .map(|(h, _)| *h)
    }

    pub fn open(&mut self, dev_type: u32, dev_index: u32, reserved: u32) -> Result<(), CanError> {
        if self.is_open() {
            return Err(CanError::DeviceAlreadyOpened);
        }

        let device = self.api.open_device(dev_type, dev_index, reserved)?;
        if !device.is_valid() {
            return Err(CanError::DeviceOpenFailed);
        }
        log::info!("ZLGCAN - device type: {}, index: {} opened({})", dev_type, dev_index, device);
        self.device = device;

        Ok(())
    }

    /// Tear down subscriptions, release the property and close the device.
    ///
    /// Returns `false` when already closed or when the driver refused to close,
    /// the device is considered closed afterwards in both cases.
    pub fn close(&mut self) -> bool {
        if !self.is_open() {
            return false;
        }

        let count = self.registry.remove_all(self.channels.keys());
        if count > 0 {
            log::info!("ZLGCAN - {} subscription(s) stopped", count);
        }
        self.release_property();

        let device = std::mem::replace(&mut self.device, DeviceHandle::INVALID);
        self.channels.clear();
        log::info!("ZLGCAN - closing device({})", device);
        match self.api.close_device(device) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("ZLGCAN - {}", e);
                false
            },
        }
    }

    /// Initialize channel `index`. Missing configuration fields take their documented defaults.
    pub fn init_channel(&mut self, index: u32, cfg: &ChannelConfig) -> Result<ChannelHandle, CanError> {
        let device = self.ensure_open()?;
        cfg.validate()?;
        let channel = u8::try_from(index)
            .map_err(|_| CanError::ArgumentError(format!("channel index: {} is out of range", index)))?;

        let handle = self.api.init_can(device, index, cfg)?;
        if !handle.is_valid() {
            return Err(CanError::InvalidHandle(format!("`ZCAN_InitCAN` channel: {} ret: {}", index, handle)));
        }

        let stale = self.channels.iter()
            .filter(|(h, ctx)| ctx.index == channel && **h != handle)
            .map(|(h, _)| *h)
            .collect::<Vec<_>>();
        self.registry.remove_all(&stale);
        for h in &stale {
            self.channels.remove(h);
        }

        log::info!("ZLGCAN - {:?} channel: {} initialized({})", cfg.can_type(), index, handle);
        self.channels.insert(handle, ChannelContext { index: channel, can_type: cfg.can_type() });

        Ok(handle)
    }

    pub fn start_channel(&self, handle: ChannelHandle) -> Result<(), CanError> {
        self.channel(handle)?;
        self.api.start_can(handle)
    }

    /// Reset the controller, the handle stays initialized.
    pub fn reset_channel(&self, handle: ChannelHandle) -> Result<(), CanError> {
        self.channel(handle)?;
        self.api.reset_can(handle)
    }

    pub fn clear_buffer(&self, handle: ChannelHandle) -> Result<(), CanError> {
        self.channel(handle)?;
        self.api.clear_buffer(handle)
    }

    /// Send classic frames in one driver call, returns the count accepted.
    pub fn transmit(&self, handle: ChannelHandle, frames: &[CanMessage]) -> Result<u32, CanError> {
        self.channel(handle)?;
        if frames.is_empty() {
            return Ok(0);
        }

        let raw = frames.iter()
            .map(encode_can)
            .collect::<Result<Vec<_>, _>>()?;
        log::trace!("ZLGCAN - channel({}) transmitting {} CAN frame(s)", handle, raw.len());
        self.api.transmit(handle, &raw)
    }

    /// Send CAN-FD frames in one driver call, returns the count accepted.
    pub fn transmit_fd(&self, handle: ChannelHandle, frames: &[CanMessage]) -> Result<u32, CanError> {
        self.channel(handle)?;
        if frames.is_empty() {
            return Ok(0);
        }

        let raw = frames.iter()
            .map(encode_canfd)
            .collect::<Result<Vec<_>, _>>()?;
        log::trace!("ZLGCAN - channel({}) transmitting {} CAN-FD frame(s)", handle, raw.len());
        self.api.transmit_fd(handle, &raw)
    }

    /// Receive up to `max_count` classic frames, at most [`MAX_RECEIVE_COUNT`].
    ///
    /// `timeout` is in milliseconds: `-1` blocks, `0` polls. Must not be mixed
    /// with a subscription of the same channel.
    pub fn receive(&self, handle: ChannelHandle, max_count: u32, timeout: i32) -> Result<Vec<CanMessage>, CanError> {
        let ctx = self.channel(handle)?;
        check_receive(max_count, timeout)?;
        if max_count == 0 {
            return Ok(Vec::new());
        }

        read_can(self.api.as_ref(), handle, ctx.index, max_count, timeout)
    }

    /// Receive up to `max_count` CAN-FD frames, see [`ZCanDriver::receive`].
    pub fn receive_fd(&self, handle: ChannelHandle, max_count: u32, timeout: i32) -> Result<Vec<CanMessage>, CanError> {
        let ctx = self.channel(handle)?;
        check_receive(max_count, timeout)?;
        if max_count == 0 {
            return Ok(Vec::new());
        }

        read_canfd(self.api.as_ref(), handle, ctx.index, max_count, timeout)
    }

    /// Send frames as merged data records in one device level call.
    ///
    /// Each frame goes to the channel index of [`Frame::channel`](rs_can::Frame::channel),
    /// classic or CAN-FD by [`Frame::is_can_fd`](rs_can::Frame::is_can_fd).
    pub fn transmit_data(&self, frames: &[CanMessage]) -> Result<u32, CanError> {
        let device = self.ensure_open()?;
        if frames.is_empty() {
            return Ok(0);
        }

        let raw = frames.iter()
            .map(encode_data)
            .collect::<Result<Vec<_>, _>>()?;
        log::trace!("ZLGCAN - device({}) transmitting {} data record(s)", device, raw.len());
        self.api.transmit_data(device, &raw)
    }

    /// Receive up to `max_count` merged data records of every channel, see [`ZCanDriver::receive`].
    pub fn receive_data(&self, max_count: u32, timeout: i32) -> Result<Vec<ZCanData>, CanError> {
        let device = self.ensure_open()?;
        check_receive(max_count, timeout)?;
        if max_count == 0 {
            return Ok(Vec::new());
        }

        let mut objs = vec![ZCanDataObj::default(); max_count as usize];
        let count = self.api.receive_data(device, &mut objs, timeout)? as usize;

        Ok(objs.iter()
            .take(count)
            .map(decode_data)
            .collect())
    }

    /// Stop the subscription of `handle`, returns `false` when there was none.
    pub fn unsubscribe(&self, handle: ChannelHandle) -> bool {
        if !self.channels.contains_key(&handle) {
            return false;
        }

        self.registry.unregister(handle)
    }

    #[inline]
    pub fn is_subscribed(&self, handle: ChannelHandle) -> bool {
        self.channels.contains_key(&handle) && self.registry.contains(handle)
    }

    pub fn read_channel_err_info(&self, handle: ChannelHandle) -> Result<Option<ZCanChlError>, CanError> {
        self.channel(handle)?;
        readback(self.api.read_channel_err_info(handle))
    }

    pub fn read_channel_status(&self, handle: ChannelHandle) -> Result<Option<ZCanChlStatus>, CanError> {
        self.channel(handle)?;
        readback(self.api.read_channel_status(handle))
    }

    /// Frames pending in the driver queue of `handle`.
    pub fn get_receive_num(&self, handle: ChannelHandle, can_type: ZCanFrameType) -> Result<Option<u32>, CanError> {
        self.channel(handle)?;
        readback(self.api.get_receive_num(handle, can_type))
    }

    pub fn device_info(&self) -> Result<Option<ZDeviceInfo>, CanError> {
        let device = self.ensure_open()?;
        readback(self.api.device_info(device))
    }

    /// Versions, names and channel counts; `None` when the driver does not report them.
    pub fn device_info_ex(&self) -> Result<Option<ZDeviceInfoEx>, CanError> {
        let device = self.ensure_open()?;
        readback(self.api.device_info_ex(device))
    }

    /// `false` for a closed device.
    pub fn is_online(&self) -> bool {
        if !self.is_open() {
            return false;
        }

        self.api.is_online(self.device)
            .unwrap_or_else(|e| {
                log::warn!("ZLGCAN - {}", e);
                false
            })
    }

    pub fn set_value(&self, path: &str, value: &str) -> Result<(), CanError> {
        let device = self.ensure_open()?;
        self.api.set_value(device, path, value)
    }

    pub fn get_value(&self, path: &str) -> Result<Option<String>, CanError> {
        let device = self.ensure_open()?;
        readback(self.api.get_value(device, path))
    }

    /// Acquire the device's `IProperty`, releasing the one held before.
    ///
    /// Returns `false` when the driver has none to give.
    pub fn get_property(&mut self) -> Result<bool, CanError> {
        let device = self.ensure_open()?;
        self.release_property();

        match readback(self.api.get_property(device))? {
            Some(p) if p.is_valid() => {
                self.property = Some(p);
                Ok(true)
            },
            _ => Ok(false),
        }
    }

    /// Returns `false` when no property is held.
    pub fn release_property(&mut self) -> bool {
        match self.property.take() {
            Some(p) => {
                if let Err(e) = self.api.release_property(p) {
                    log::warn!("ZLGCAN - {}", e);
                }
                true
            },
            None => false,
        }
    }

    #[inline]
    pub fn has_property(&self) -> bool {
        self.property.is_some()
    }

    pub fn set_property_value(&self, path: &str, value: &str) -> Result<(), CanError> {
        let property = self.ensure_property()?;
        self.api.set_property_value(property, path, value)
    }

    pub fn get_property_value(&self, path: &str) -> Result<Option<String>, CanError> {
        let property = self.ensure_property()?;
        readback(self.api.get_property_value(property, path))
    }

    #[inline]
    fn ensure_open(&self) -> Result<DeviceHandle, CanError> {
        if self.is_open() {
            Ok(self.device)
        }
        else {
            Err(CanError::DeviceNotOpened)
        }
    }

    #[inline]
    fn ensure_property(&self) -> Result<PropertyHandle, CanError> {
        self.ensure_open()?;
        self.property
            .ok_or(CanError::argument_error("`IProperty` is not acquired"))
    }

    fn channel(&self, handle: ChannelHandle) -> Result<ChannelContext, CanError> {
        self.ensure_open()?;
        if !handle.is_valid() {
            return Err(CanError::InvalidHandle(format!("channel: {}", handle)));
        }

        self.channels.get(&handle)
            .copied()
            .ok_or(CanError::DriverError(format!("channel handle: {} is not initialized", handle)))
    }
}

impl<A: ZCanApi + ?Sized + 'static> ZCanDriver<A> {
    /// Deliver every frame received on `handle` to `on_frames` on the event loop's thread.
    ///
    /// A previous subscription of the channel is torn down first; its callback
    /// is not invoked once this returns. Classic and CAN-FD channels are polled
    /// every `poll_interval_ms` for at most `poll_batch_size` frames of each kind,
    /// each non-empty driver batch arrives as one call. An invalid poll
    /// configuration is a [`CanError::DeviceConfigError`] and starts nothing.
    pub fn subscribe<F>(&self, handle: ChannelHandle, on_frames: F) -> Result<(), CanError>
    where
        F: FnMut(Vec<CanMessage>) + Send + 'static,
    {
        let ctx = self.channel(handle)?;
        self.config.validate()?;

        self.registry.subscribe_with(handle, || {
            let sink = self.events.open_sink(Box::new(on_frames))?;
            let stop = Arc::new(AtomicBool::new(false));
            let worker = PollWorker {
                api: Arc::clone(&self.api),
                handle,
                channel: ctx.index,
                can_type: ctx.can_type,
                batch_size: self.config.poll_batch_size(),
                interval: self.config.poll_interval(),
                stop: Arc::clone(&stop),
                sink: sink.sender(),
            };

            match worker.spawn() {
                Ok(worker) => Ok(ChannelSubscription::new(worker, stop, sink)),
                Err(e) => {
                    sink.release();
                    Err(e)
                },
            }
        })
    }
}

impl<A: ZCanApi + ?Sized> Drop for ZCanDriver<A> {
    fn drop(&mut self) {
        self.close();
    }
}

#[inline]
fn check_receive(max_count: u32, timeout: i32) -> Result<(), CanError> {
    if timeout < -1 {
        return Err(CanError::ArgumentError(format!("timeout: {} must be -1, 0 or positive", timeout)));
    }
    if max_count > MAX_RECEIVE_COUNT {
        return Err(CanError::ArgumentError(format!("max count: {} is out of range 0..={}", max_count, MAX_RECEIVE_COUNT)));
    }

    Ok(())
}

/// Driver failures of a readback are "no value", everything else propagates.
#[inline]
fn readback<T>(ret: Result<T, CanError>) -> Result<Option<T>, CanError> {
    match ret {
        Ok(v) => Ok(Some(v)),
        Err(CanError::DriverError(e)) => {
            log::warn!("ZLGCAN - {}", e);
            Ok(None)
        },
        Err(e) => Err(e),
    }
}
