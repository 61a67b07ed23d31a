mod library;

pub use library::ZCanLibrary;

use rs_can::CanError;
use crate::can::{
    ChannelConfig, ZCanChlError, ZCanChlStatus, ZCanDataObj, ZCanFdRxFrame, ZCanFdTxFrame, ZCanFrameType, ZCanRxFrame, ZCanTxFrame,
};
use crate::device::{ChannelHandle, DeviceHandle, PropertyHandle, ZDeviceInfo, ZDeviceInfoEx};

/// The blocking, handle based driver calls.
///
/// Implementations translate the driver's status codes: a sentinel handle from
/// `open_device` is [`CanError::DeviceOpenFailed`], one from `init_can` is
/// [`CanError::InvalidHandle`], every other non-OK status is
/// [`CanError::DriverError`]. No call is retried.
///
/// All methods may be called from any thread, concurrently for distinct channels.
pub trait ZCanApi: Send + Sync {
    fn open_device(&self, dev_type: u32, dev_index: u32, reserved: u32) -> Result<DeviceHandle, CanError>;
    fn close_device(&self, dev_hdl: DeviceHandle) -> Result<(), CanError>;
    fn device_info(&self, dev_hdl: DeviceHandle) -> Result<ZDeviceInfo, CanError>;
    fn device_info_ex(&self, dev_hdl: DeviceHandle) -> Result<ZDeviceInfoEx, CanError>;
    fn is_online(&self, dev_hdl: DeviceHandle) -> Result<bool, CanError>;

    fn init_can(&self, dev_hdl: DeviceHandle, channel: u32, cfg: &ChannelConfig) -> Result<ChannelHandle, CanError>;
    fn start_can(&self, chl_hdl: ChannelHandle) -> Result<(), CanError>;
    fn reset_can(&self, chl_hdl: ChannelHandle) -> Result<(), CanError>;
    fn clear_buffer(&self, chl_hdl: ChannelHandle) -> Result<(), CanError>;
    fn read_channel_err_info(&self, chl_hdl: ChannelHandle) -> Result<ZCanChlError, CanError>;
    fn read_channel_status(&self, chl_hdl: ChannelHandle) -> Result<ZCanChlStatus, CanError>;
    fn get_receive_num(&self, chl_hdl: ChannelHandle, can_type: ZCanFrameType) -> Result<u32, CanError>;

    /// Returns the count of frames the driver accepted.
    fn transmit(&self, chl_hdl: ChannelHandle, frames: &[ZCanTxFrame]) -> Result<u32, CanError>;
    fn transmit_fd(&self, chl_hdl: ChannelHandle, frames: &[ZCanFdTxFrame]) -> Result<u32, CanError>;
    /// Fill the head of `frames`, `wait_time` in milliseconds (`-1` blocks).
    /// Returns the count of frames written.
    fn receive(&self, chl_hdl: ChannelHandle, frames: &mut [ZCanRxFrame], wait_time: i32) -> Result<u32, CanError>;
    fn receive_fd(&self, chl_hdl: ChannelHandle, frames: &mut [ZCanFdRxFrame], wait_time: i32) -> Result<u32, CanError>;

    /// Device level merged records, each addressed by its own channel index.
    fn transmit_data(&self, dev_hdl: DeviceHandle, objs: &[ZCanDataObj]) -> Result<u32, CanError>;
    fn receive_data(&self, dev_hdl: DeviceHandle, objs: &mut [ZCanDataObj], wait_time: i32) -> Result<u32, CanError>;

    fn set_value(&self, dev_hdl: DeviceHandle, path: &str, value: &str) -> Result<(), CanError>;
    fn get_value(&self, dev_hdl: DeviceHandle, path: &str) -> Result<String, CanError>;

    fn get_property(&self, dev_hdl: DeviceHandle) -> Result<PropertyHandle, CanError>;
    fn release_property(&self, property: PropertyHandle) -> Result<(), CanError>;
    fn set_property_value(&self, property: PropertyHandle, path: &str, value: &str) -> Result<(), CanError>;
    fn get_property_value(&self, property: PropertyHandle, path: &str) -> Result<String, CanError>;
}
