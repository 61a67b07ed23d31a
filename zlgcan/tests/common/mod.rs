#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use rs_can::CanError;
use zlgcan_rs::api::ZCanApi;
use zlgcan_rs::can::{
    ChannelConfig, ZCanChlError, ZCanChlStatus, ZCanDataObj, ZCanFdRxFrame, ZCanFdTxFrame, ZCanFrameType, ZCanRxFrame,
    ZCanTxFrame,
};
use zlgcan_rs::config::DriverConfig;
use zlgcan_rs::device::{ChannelHandle, DeviceHandle, PropertyHandle, ZCanVersion, ZDeviceInfo, ZDeviceInfoEx};
use zlgcan_rs::driver::ZCanDriver;
use zlgcan_rs::sink::EventLoop;

/// Full-width handles so any narrowing shows up.
const HANDLE_BASE: u64 = 0x7FFF_0000_0000_0000;

#[derive(Default)]
struct MockChannel {
    device: DeviceHandle,
    index: u32,
    rx: VecDeque<Vec<ZCanRxFrame>>,
    rx_fd: VecDeque<Vec<ZCanFdRxFrame>>,
    tx: Vec<ZCanTxFrame>,
    tx_fd: Vec<ZCanFdTxFrame>,
}

#[derive(Default)]
struct MockState {
    next_handle: u64,
    devices: HashSet<DeviceHandle>,
    channels: HashMap<ChannelHandle, MockChannel>,
    init_configs: Vec<(u32, ChannelConfig)>,
    rx_data: VecDeque<Vec<ZCanDataObj>>,
    tx_data: Vec<ZCanDataObj>,
    calls: HashMap<&'static str, usize>,
    failing: HashSet<&'static str>,
    invalid_init: bool,
    fresh_init: bool,
    transmit_limit: Option<u32>,
    values: HashMap<String, String>,
    property: Option<PropertyHandle>,
    property_values: HashMap<String, String>,
}

/// In-memory driver. Received frames are queued per channel as driver batches,
/// one batch per `receive` call.
#[derive(Default)]
pub struct MockApi {
    state: Mutex<MockState>,
}

impl MockApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Default::default())
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn call(&self, name: &'static str) -> Result<MutexGuard<'_, MockState>, CanError> {
        let mut state = self.lock();
        *state.calls.entry(name).or_default() += 1;
        if state.failing.contains(name) {
            return Err(CanError::DriverError(format!("`{}` ret: 0", name)));
        }

        Ok(state)
    }

    fn next_handle(state: &mut MockState) -> u64 {
        state.next_handle += 1;
        HANDLE_BASE + state.next_handle
    }

    pub fn calls(&self, name: &str) -> usize {
        self.lock().calls.get(name).copied().unwrap_or_default()
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    pub fn fail(&self, name: &'static str) {
        self.lock().failing.insert(name);
    }

    pub fn recover(&self, name: &'static str) {
        self.lock().failing.remove(name);
    }

    pub fn set_invalid_init(&self, value: bool) {
        self.lock().invalid_init = value;
    }

    /// Hand out a new handle when a channel index is initialized again.
    pub fn set_fresh_init(&self, value: bool) {
        self.lock().fresh_init = value;
    }

    pub fn set_transmit_limit(&self, limit: Option<u32>) {
        self.lock().transmit_limit = limit;
    }

    pub fn open_devices(&self) -> usize {
        self.lock().devices.len()
    }

    pub fn init_configs(&self) -> Vec<(u32, ChannelConfig)> {
        self.lock().init_configs.clone()
    }

    pub fn push_rx(&self, handle: ChannelHandle, batch: Vec<ZCanRxFrame>) {
        if let Some(chl) = self.lock().channels.get_mut(&handle) {
            chl.rx.push_back(batch);
        }
    }

    pub fn push_rx_fd(&self, handle: ChannelHandle, batch: Vec<ZCanFdRxFrame>) {
        if let Some(chl) = self.lock().channels.get_mut(&handle) {
            chl.rx_fd.push_back(batch);
        }
    }

    pub fn push_data(&self, batch: Vec<ZCanDataObj>) {
        self.lock().rx_data.push_back(batch);
    }

    pub fn transmitted_data(&self) -> Vec<ZCanDataObj> {
        self.lock().tx_data.clone()
    }

    pub fn pending_rx(&self, handle: ChannelHandle) -> usize {
        self.lock().channels.get(&handle)
            .map(|chl| chl.rx.len() + chl.rx_fd.len())
            .unwrap_or_default()
    }

    pub fn transmitted(&self, handle: ChannelHandle) -> Vec<ZCanTxFrame> {
        self.lock().channels.get(&handle)
            .map(|chl| chl.tx.clone())
            .unwrap_or_default()
    }

    pub fn transmitted_fd(&self, handle: ChannelHandle) -> Vec<ZCanFdTxFrame> {
        self.lock().channels.get(&handle)
            .map(|chl| chl.tx_fd.clone())
            .unwrap_or_default()
    }

    pub fn held_property(&self) -> Option<PropertyHandle> {
        self.lock().property
    }
}

fn pop_batch<T: Copy>(queue: &mut VecDeque<Vec<T>>, frames: &mut [T]) -> u32 {
    let Some(mut batch) = queue.pop_front() else {
        return 0;
    };
    if batch.len() > frames.len() {
        let rest = batch.split_off(frames.len());
        queue.push_front(rest);
    }
    frames[..batch.len()].copy_from_slice(&batch);

    batch.len() as u32
}

impl ZCanApi for MockApi {
    fn open_device(&self, _: u32, _: u32, _: u32) -> Result<DeviceHandle, CanError> {
        let mut state = self.call("open_device")
            .map_err(|_| CanError::DeviceOpenFailed)?;
        let handle = DeviceHandle::from_raw(Self::next_handle(&mut state));
        state.devices.insert(handle);

        Ok(handle)
    }

    fn close_device(&self, dev_hdl: DeviceHandle) -> Result<(), CanError> {
        let mut state = self.lock();
        *state.calls.entry("close_device").or_default() += 1;
        // the device is gone even when the driver reports a failure
        state.devices.remove(&dev_hdl);
        state.channels.retain(|_, chl| chl.device != dev_hdl);
        if state.failing.contains("close_device") {
            return Err(CanError::DriverError("`ZCAN_CloseDevice` ret: 0".into()));
        }

        Ok(())
    }

    fn device_info(&self, _: DeviceHandle) -> Result<ZDeviceInfo, CanError> {
        self.call("device_info")?;
        Ok(ZDeviceInfo::new(0x0101, 0x0102, 0x0103, 0x0104, 0, 2, "MOCK0001", "USBCANFD-200U"))
    }

    fn device_info_ex(&self, _: DeviceHandle) -> Result<ZDeviceInfoEx, CanError> {
        self.call("device_info_ex")?;
        let versions = [
            ZCanVersion::new(1, 1, 0),
            ZCanVersion::new(1, 2, 3),
            ZCanVersion::new(2, 0, 0),
            ZCanVersion::new(2, 1, 9),
        ];
        Ok(ZDeviceInfoEx::new(versions, "MOCK", "USBCANFD-200U", "MOCK0001", 2, 0))
    }

    fn is_online(&self, dev_hdl: DeviceHandle) -> Result<bool, CanError> {
        let state = self.call("is_online")?;
        Ok(state.devices.contains(&dev_hdl))
    }

    fn init_can(&self, dev_hdl: DeviceHandle, channel: u32, cfg: &ChannelConfig) -> Result<ChannelHandle, CanError> {
        let mut state = self.call("init_can")?;
        if state.invalid_init || !state.devices.contains(&dev_hdl) {
            return Ok(ChannelHandle::INVALID);
        }
        state.init_configs.push((channel, *cfg));

        let existing = state.channels.iter()
            .find(|(_, chl)| chl.device == dev_hdl && chl.index == channel)
            .map(|(h, _)| *h);
        if let (Some(handle), true) = (existing, state.fresh_init) {
            state.channels.remove(&handle);
        }
        match existing.filter(|_| !state.fresh_init) {
            Some(handle) => Ok(handle),
            None => {
                let handle = ChannelHandle::from_raw(Self::next_handle(&mut state));
                state.channels.insert(handle, MockChannel { device: dev_hdl, index: channel, ..Default::default() });
                Ok(handle)
            },
        }
    }

    fn start_can(&self, _: ChannelHandle) -> Result<(), CanError> {
        self.call("start_can").map(|_| ())
    }

    fn reset_can(&self, _: ChannelHandle) -> Result<(), CanError> {
        self.call("reset_can").map(|_| ())
    }

    fn clear_buffer(&self, chl_hdl: ChannelHandle) -> Result<(), CanError> {
        let mut state = self.call("clear_buffer")?;
        if let Some(chl) = state.channels.get_mut(&chl_hdl) {
            chl.rx.clear();
            chl.rx_fd.clear();
        }

        Ok(())
    }

    fn read_channel_err_info(&self, _: ChannelHandle) -> Result<ZCanChlError, CanError> {
        self.call("read_channel_err_info")?;
        Ok(ZCanChlError::new(0x0100, [0, 12, 3], 0))
    }

    fn read_channel_status(&self, _: ChannelHandle) -> Result<ZCanChlStatus, CanError> {
        self.call("read_channel_status")?;
        Ok(ZCanChlStatus { regRECounter: 1, regTECounter: 2, ..Default::default() })
    }

    fn get_receive_num(&self, chl_hdl: ChannelHandle, can_type: ZCanFrameType) -> Result<u32, CanError> {
        let state = self.call("get_receive_num")?;
        let count = state.channels.get(&chl_hdl)
            .map(|chl| {
                let can = chl.rx.iter().map(Vec::len).sum::<usize>();
                let canfd = chl.rx_fd.iter().map(Vec::len).sum::<usize>();
                match can_type {
                    ZCanFrameType::CAN => can,
                    ZCanFrameType::CANFD => canfd,
                    ZCanFrameType::ALL => can + canfd,
                }
            })
            .unwrap_or_default();

        Ok(count as u32)
    }

    fn transmit(&self, chl_hdl: ChannelHandle, frames: &[ZCanTxFrame]) -> Result<u32, CanError> {
        let mut state = self.call("transmit")?;
        let limit = state.transmit_limit.unwrap_or(u32::MAX) as usize;
        let accepted = frames.len().min(limit);
        if let Some(chl) = state.channels.get_mut(&chl_hdl) {
            chl.tx.extend_from_slice(&frames[..accepted]);
        }

        Ok(accepted as u32)
    }

    fn transmit_fd(&self, chl_hdl: ChannelHandle, frames: &[ZCanFdTxFrame]) -> Result<u32, CanError> {
        let mut state = self.call("transmit_fd")?;
        let limit = state.transmit_limit.unwrap_or(u32::MAX) as usize;
        let accepted = frames.len().min(limit);
        if let Some(chl) = state.channels.get_mut(&chl_hdl) {
            chl.tx_fd.extend_from_slice(&frames[..accepted]);
        }

        Ok(accepted as u32)
    }

    fn receive(&self, chl_hdl: ChannelHandle, frames: &mut [ZCanRxFrame], _: i32) -> Result<u32, CanError> {
        let mut state = self.call("receive")?;
        Ok(state.channels.get_mut(&chl_hdl)
            .map(|chl| pop_batch(&mut chl.rx, frames))
            .unwrap_or_default())
    }

    fn receive_fd(&self, chl_hdl: ChannelHandle, frames: &mut [ZCanFdRxFrame], _: i32) -> Result<u32, CanError> {
        let mut state = self.call("receive_fd")?;
        Ok(state.channels.get_mut(&chl_hdl)
            .map(|chl| pop_batch(&mut chl.rx_fd, frames))
            .unwrap_or_default())
    }

    fn transmit_data(&self, _: DeviceHandle, objs: &[ZCanDataObj]) -> Result<u32, CanError> {
        let mut state = self.call("transmit_data")?;
        let limit = state.transmit_limit.unwrap_or(u32::MAX) as usize;
        let accepted = objs.len().min(limit);
        state.tx_data.extend_from_slice(&objs[..accepted]);

        Ok(accepted as u32)
    }

    fn receive_data(&self, _: DeviceHandle, objs: &mut [ZCanDataObj], _: i32) -> Result<u32, CanError> {
        let mut state = self.call("receive_data")?;
        Ok(pop_batch(&mut state.rx_data, objs))
    }

    fn set_value(&self, _: DeviceHandle, path: &str, value: &str) -> Result<(), CanError> {
        let mut state = self.call("set_value")?;
        state.values.insert(path.to_owned(), value.to_owned());
        Ok(())
    }

    fn get_value(&self, _: DeviceHandle, path: &str) -> Result<String, CanError> {
        let state = self.call("get_value")?;
        state.values.get(path)
            .cloned()
            .ok_or(CanError::DriverError(format!("`ZCAN_GetValue` {}: null pointer", path)))
    }

    fn get_property(&self, _: DeviceHandle) -> Result<PropertyHandle, CanError> {
        let mut state = self.call("get_property")?;
        let handle = PropertyHandle::from_raw(Self::next_handle(&mut state));
        state.property = Some(handle);

        Ok(handle)
    }

    fn release_property(&self, property: PropertyHandle) -> Result<(), CanError> {
        let mut state = self.call("release_property")?;
        if state.property == Some(property) {
            state.property = None;
        }

        Ok(())
    }

    fn set_property_value(&self, _: PropertyHandle, path: &str, value: &str) -> Result<(), CanError> {
        let mut state = self.call("set_property_value")?;
        state.property_values.insert(path.to_owned(), value.to_owned());
        Ok(())
    }

    fn get_property_value(&self, _: PropertyHandle, path: &str) -> Result<String, CanError> {
        let state = self.call("get_property_value")?;
        state.property_values.get(path)
            .cloned()
            .ok_or(CanError::DriverError(format!("{}, GetValue failed: null pointer", path)))
    }
}

/// A driver over `api` with a fast poll interval.
pub fn driver(api: &Arc<MockApi>, event_loop: &EventLoop) -> ZCanDriver<MockApi> {
    ZCanDriver::new(Arc::clone(api), event_loop.handle(), DriverConfig::default().with_poll_interval(5))
}

/// A classic receive frame with `len` bytes of a counting payload.
pub fn rx_frame(id: u32, len: u8) -> ZCanRxFrame {
    let data = (0..8).collect::<Vec<u8>>();
    ZCanRxFrame::new(id, len, 0, &data, id as u64)
}
