use std::ffi::{c_char, c_int, c_uchar, c_uint, c_void};
use dlopen2::symbor::{Container, Symbol, SymBorApi};
use rs_can::CanError;
use crate::api::ZCanApi;
use crate::can::{
    ChannelConfig, ZCanChlError, ZCanChlStatus, ZCanDataObj, ZCanFdRxFrame, ZCanFdTxFrame, ZCanFrameType, ZCanRxFrame, ZCanTxFrame,
    constant::{STATUS_OK, STATUS_ONLINE},
};
use crate::config::DriverConfig;
use crate::device::{ChannelHandle, DeviceHandle, PropertyHandle, ZDeviceInfo, ZDeviceInfoEx};
use crate::utils::{c_str_to_string, string_to_c_str};

#[cfg(all(target_os = "windows", target_arch = "x86"))]
const LIB_PATH: &str = "windows/x86/zlgcan.dll";
#[cfg(all(target_os = "windows", not(target_arch = "x86")))]
const LIB_PATH: &str = "windows/x86_64/zlgcan.dll";

type DevHdl = *mut c_void;
type ChlHdl = *mut c_void;

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
struct ZCanInitCfg {
    acc_code: c_uint,
    acc_mask: c_uint,
    reserved: c_uint,
    filter: c_uchar,
    timing0: c_uchar,
    timing1: c_uchar,
    mode: c_uchar,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
struct ZCanFdInitCfg {
    acc_code: c_uint,
    acc_mask: c_uint,
    abit_timing: c_uint,
    dbit_timing: c_uint,
    brp: c_uint,
    filter: c_uchar,
    mode: c_uchar,
    pad: u16,
    reserved: c_uint,
}

#[repr(C)]
#[derive(Copy, Clone)]
union ZCanInitCfgUnion {
    can: ZCanInitCfg,
    canfd: ZCanFdInitCfg,
}

/// `ZCAN_CHANNEL_INIT_CONFIG`
#[repr(C)]
#[derive(Copy, Clone)]
struct ZCanChlCfg {
    can_type: c_uint,
    cfg: ZCanInitCfgUnion,
}

impl From<&ChannelConfig> for ZCanChlCfg {
    fn from(value: &ChannelConfig) -> Self {
        // the larger FD member zeroes the whole union
        let mut raw = Self {
            can_type: value.can_type() as c_uint,
            cfg: ZCanInitCfgUnion { canfd: Default::default() },
        };
        match value {
            ChannelConfig::Classic(v) => {
                raw.cfg.can = ZCanInitCfg {
                    acc_code: v.acc_code,
                    acc_mask: v.acc_mask,
                    reserved: v.reserved,
                    filter: v.filter,
                    timing0: v.timing0,
                    timing1: v.timing1,
                    mode: v.mode,
                };
            },
            ChannelConfig::CanFd(v) => {
                raw.cfg.canfd = ZCanFdInitCfg {
                    acc_code: v.acc_code,
                    acc_mask: v.acc_mask,
                    abit_timing: v.abit_timing,
                    dbit_timing: v.dbit_timing,
                    brp: v.brp,
                    filter: v.filter,
                    mode: v.mode,
                    pad: v.pad,
                    reserved: v.reserved,
                };
            },
        }

        raw
    }
}

type SetValueFunc = Option<unsafe extern "C" fn(path: *const c_char, value: *const c_char) -> c_int>;
type GetValueFunc = Option<unsafe extern "C" fn(path: *const c_char) -> *const c_char>;
type GetPropertysFunc = Option<unsafe extern "C" fn(path: *const c_char, value: *const c_char) -> *const c_void>;

#[allow(non_snake_case, dead_code)]
#[repr(C)]
#[derive(Debug, Copy, Clone)]
struct IProperty {
    SetValue: SetValueFunc,
    GetValue: GetValueFunc,
    GetPropertys: GetPropertysFunc,
}

#[allow(non_snake_case)]
#[derive(Debug, Clone, SymBorApi)]
struct ZlgCanApi<'a> {
    /// DEVICE_HANDLE FUNC_CALL ZCAN_OpenDevice(UINT device_type, UINT device_index, UINT reserved);
    ZCAN_OpenDevice: Symbol<'a, unsafe extern "C" fn(dev_type: c_uint, dev_index: c_uint, reserved: c_uint) -> DevHdl>,
    /// UINT FUNC_CALL ZCAN_CloseDevice(DEVICE_HANDLE device_handle);
    ZCAN_CloseDevice: Symbol<'a, unsafe extern "C" fn(dev_hdl: DevHdl) -> c_uint>,
    /// UINT FUNC_CALL ZCAN_GetDeviceInf(DEVICE_HANDLE device_handle, ZCAN_DEVICE_INFO* pInfo);
    ZCAN_GetDeviceInf: Symbol<'a, unsafe extern "C" fn(dev_hdl: DevHdl, info: *mut ZDeviceInfo) -> c_uint>,
    /// UINT FUNC_CALL ZCAN_GetDeviceInfoEx(DEVICE_HANDLE device_handle, ZCAN_DEVICE_INFO_EX* pInfo);
    ZCAN_GetDeviceInfoEx: Option<Symbol<'a, unsafe extern "C" fn(dev_hdl: DevHdl, info: *mut ZDeviceInfoEx) -> c_uint>>,
    /// UINT FUNC_CALL ZCAN_IsDeviceOnLine(DEVICE_HANDLE device_handle);
    ZCAN_IsDeviceOnLine: Symbol<'a, unsafe extern "C" fn(dev_hdl: DevHdl) -> c_uint>,

    /// CHANNEL_HANDLE FUNC_CALL ZCAN_InitCAN(DEVICE_HANDLE device_handle, UINT can_index, ZCAN_CHANNEL_INIT_CONFIG* pInitConfig);
    ZCAN_InitCAN: Symbol<'a, unsafe extern "C" fn(dev_hdl: DevHdl, channel: c_uint, cfg: *const ZCanChlCfg) -> ChlHdl>,
    /// UINT FUNC_CALL ZCAN_StartCAN(CHANNEL_HANDLE channel_handle);
    ZCAN_StartCAN: Symbol<'a, unsafe extern "C" fn(chl_hdl: ChlHdl) -> c_uint>,
    /// UINT FUNC_CALL ZCAN_ResetCAN(CHANNEL_HANDLE channel_handle);
    ZCAN_ResetCAN: Symbol<'a, unsafe extern "C" fn(chl_hdl: ChlHdl) -> c_uint>,
    /// UINT FUNC_CALL ZCAN_ClearBuffer(CHANNEL_HANDLE channel_handle);
    ZCAN_ClearBuffer: Symbol<'a, unsafe extern "C" fn(chl_hdl: ChlHdl) -> c_uint>,
    /// UINT FUNC_CALL ZCAN_ReadChannelErrInfo(CHANNEL_HANDLE channel_handle, ZCAN_CHANNEL_ERR_INFO* pErrInfo);
    ZCAN_ReadChannelErrInfo: Symbol<'a, unsafe extern "C" fn(chl_hdl: ChlHdl, err: *mut ZCanChlError) -> c_uint>,
    /// UINT FUNC_CALL ZCAN_ReadChannelStatus(CHANNEL_HANDLE channel_handle, ZCAN_CHANNEL_STATUS* pCANStatus);
    ZCAN_ReadChannelStatus: Symbol<'a, unsafe extern "C" fn(chl_hdl: ChlHdl, status: *mut ZCanChlStatus) -> c_uint>,
    /// UINT FUNC_CALL ZCAN_GetReceiveNum(CHANNEL_HANDLE channel_handle, BYTE type);
    ZCAN_GetReceiveNum: Symbol<'a, unsafe extern "C" fn(chl_hdl: ChlHdl, can_type: c_uchar) -> c_uint>,

    /// UINT FUNC_CALL ZCAN_Transmit(CHANNEL_HANDLE channel_handle, ZCAN_Transmit_Data* pTransmit, UINT len);
    ZCAN_Transmit: Symbol<'a, unsafe extern "C" fn(chl_hdl: ChlHdl, frames: *const ZCanTxFrame, len: c_uint) -> c_uint>,
    /// UINT FUNC_CALL ZCAN_Receive(CHANNEL_HANDLE channel_handle, ZCAN_Receive_Data* pReceive, UINT len, int wait_time = -1);
    ZCAN_Receive: Symbol<'a, unsafe extern "C" fn(chl_hdl: ChlHdl, frames: *mut ZCanRxFrame, size: c_uint, timeout: c_int) -> c_uint>,
    /// UINT FUNC_CALL ZCAN_TransmitFD(CHANNEL_HANDLE channel_handle, ZCAN_TransmitFD_Data* pTransmit, UINT len);
    ZCAN_TransmitFD: Symbol<'a, unsafe extern "C" fn(chl_hdl: ChlHdl, frames: *const ZCanFdTxFrame, len: c_uint) -> c_uint>,
    /// UINT FUNC_CALL ZCAN_ReceiveFD(CHANNEL_HANDLE channel_handle, ZCAN_ReceiveFD_Data* pReceive, UINT len, int wait_time = -1);
    ZCAN_ReceiveFD: Symbol<'a, unsafe extern "C" fn(chl_hdl: ChlHdl, frames: *mut ZCanFdRxFrame, size: c_uint, timeout: c_int) -> c_uint>,
    /// UINT FUNC_CALL ZCAN_TransmitData(DEVICE_HANDLE device_handle, ZCANDataObj* pTransmit, UINT len);
    ZCAN_TransmitData: Option<Symbol<'a, unsafe extern "C" fn(dev_hdl: DevHdl, objs: *const ZCanDataObj, len: c_uint) -> c_uint>>,
    /// UINT FUNC_CALL ZCAN_ReceiveData(DEVICE_HANDLE device_handle, ZCANDataObj* pReceive, UINT len, int wait_time = -1);
    ZCAN_ReceiveData: Option<Symbol<'a, unsafe extern "C" fn(dev_hdl: DevHdl, objs: *mut ZCanDataObj, size: c_uint, timeout: c_int) -> c_uint>>,

    /// UINT FUNC_CALL ZCAN_SetValue(DEVICE_HANDLE device_handle, const char* path, const void* value);
    ZCAN_SetValue: Symbol<'a, unsafe extern "C" fn(dev_hdl: DevHdl, path: *const c_char, value: *const c_void) -> c_uint>,
    /// const void* FUNC_CALL ZCAN_GetValue(DEVICE_HANDLE device_handle, const char* path);
    ZCAN_GetValue: Symbol<'a, unsafe extern "C" fn(dev_hdl: DevHdl, path: *const c_char) -> *const c_void>,

    /// IProperty* FUNC_CALL GetIProperty(DEVICE_HANDLE device_handle);
    GetIProperty: Symbol<'a, unsafe extern "C" fn(dev_hdl: DevHdl) -> *mut IProperty>,
    /// UINT FUNC_CALL ReleaseIProperty(IProperty * pIProperty);
    ReleaseIProperty: Symbol<'a, unsafe extern "C" fn(p: *mut IProperty) -> c_uint>,
}

#[inline]
fn dev_ptr(hdl: DeviceHandle) -> DevHdl {
    hdl.raw() as usize as DevHdl
}

#[inline]
fn chl_ptr(hdl: ChannelHandle) -> ChlHdl {
    hdl.raw() as usize as ChlHdl
}

#[inline]
fn property_ptr(hdl: PropertyHandle) -> Result<*mut IProperty, CanError> {
    if hdl.is_valid() {
        Ok(hdl.raw() as usize as *mut IProperty)
    }
    else {
        Err(CanError::InvalidHandle(format!("property: {}", hdl)))
    }
}

#[inline]
fn check_status(func: &str, ret: c_uint) -> Result<(), CanError> {
    match ret {
        STATUS_OK => Ok(()),
        code => Err(CanError::DriverError(format!("`{}` ret: {}", func, code))),
    }
}

/// The vendor shared library bound at runtime.
pub struct ZCanLibrary {
    api: Container<ZlgCanApi<'static>>,
}

// SAFETY: the container only holds resolved function pointers of a library that
// stays loaded for its lifetime; the driver serializes calls per handle itself.
unsafe impl Send for ZCanLibrary {}
unsafe impl Sync for ZCanLibrary {}

impl ZCanLibrary {
    /// Load `<library>/windows/<arch>/zlgcan.dll` named by the configuration.
    ///
    /// The `ZCAN_*` table bound here is the one `zlgcan.dll` exports; the Linux
    /// libraries export per-family tables with other signatures, so other
    /// targets get a [`CanError::DeviceConfigError`].
    #[cfg(target_os = "windows")]
    pub fn load(cfg: &DriverConfig) -> Result<Self, CanError> {
        cfg.validate()?;
        let libpath = format!("{}/{}", cfg.library().trim_end_matches(['/', '\\']), LIB_PATH);
        log::info!("ZLGCAN - loading library: {}", libpath);
        let api = unsafe {
            Container::load(&libpath)
                .map_err(|e| CanError::DeviceConfigError(format!("can't open library: {}, {}", libpath, e)))
        }?;

        Ok(Self { api })
    }

    #[cfg(not(target_os = "windows"))]
    pub fn load(cfg: &DriverConfig) -> Result<Self, CanError> {
        cfg.validate()?;
        Err(CanError::DeviceConfigError(
            format!("`ZCAN_*` library under {} is only supported on Windows", cfg.library())
        ))
    }
}

impl ZCanApi for ZCanLibrary {
    fn open_device(&self, dev_type: u32, dev_index: u32, reserved: u32) -> Result<DeviceHandle, CanError> {
        let ret = unsafe { (self.api.ZCAN_OpenDevice)(dev_type, dev_index, reserved) };
        match DeviceHandle::from_raw(ret as usize as u64) {
            hdl if hdl.is_valid() => Ok(hdl),
            _ => Err(CanError::DeviceOpenFailed),
        }
    }

    fn close_device(&self, dev_hdl: DeviceHandle) -> Result<(), CanError> {
        check_status("ZCAN_CloseDevice", unsafe { (self.api.ZCAN_CloseDevice)(dev_ptr(dev_hdl)) })
    }

    fn device_info(&self, dev_hdl: DeviceHandle) -> Result<ZDeviceInfo, CanError> {
        let mut info = ZDeviceInfo::default();
        check_status("ZCAN_GetDeviceInf", unsafe { (self.api.ZCAN_GetDeviceInf)(dev_ptr(dev_hdl), &mut info) })?;

        Ok(info)
    }

    fn device_info_ex(&self, dev_hdl: DeviceHandle) -> Result<ZDeviceInfoEx, CanError> {
        let func = self.api.ZCAN_GetDeviceInfoEx.as_ref()
            .ok_or(CanError::driver_error("`ZCAN_GetDeviceInfoEx` is not supported"))?;
        let mut info = ZDeviceInfoEx::default();
        check_status("ZCAN_GetDeviceInfoEx", unsafe { func(dev_ptr(dev_hdl), &mut info) })?;

        Ok(info)
    }

    fn is_online(&self, dev_hdl: DeviceHandle) -> Result<bool, CanError> {
        let ret = unsafe { (self.api.ZCAN_IsDeviceOnLine)(dev_ptr(dev_hdl)) };
        Ok(ret == STATUS_ONLINE)
    }

    fn init_can(&self, dev_hdl: DeviceHandle, channel: u32, cfg: &ChannelConfig) -> Result<ChannelHandle, CanError> {
        let raw = ZCanChlCfg::from(cfg);
        let ret = unsafe { (self.api.ZCAN_InitCAN)(dev_ptr(dev_hdl), channel, &raw) };
        match ChannelHandle::from_raw(ret as usize as u64) {
            hdl if hdl.is_valid() => Ok(hdl),
            hdl => Err(CanError::InvalidHandle(format!("`ZCAN_InitCAN` channel: {} ret: {}", channel, hdl))),
        }
    }

    fn start_can(&self, chl_hdl: ChannelHandle) -> Result<(), CanError> {
        check_status("ZCAN_StartCAN", unsafe { (self.api.ZCAN_StartCAN)(chl_ptr(chl_hdl)) })
    }

    fn reset_can(&self, chl_hdl: ChannelHandle) -> Result<(), CanError> {
        check_status("ZCAN_ResetCAN", unsafe { (self.api.ZCAN_ResetCAN)(chl_ptr(chl_hdl)) })
    }

    fn clear_buffer(&self, chl_hdl: ChannelHandle) -> Result<(), CanError> {
        check_status("ZCAN_ClearBuffer", unsafe { (self.api.ZCAN_ClearBuffer)(chl_ptr(chl_hdl)) })
    }

    fn read_channel_err_info(&self, chl_hdl: ChannelHandle) -> Result<ZCanChlError, CanError> {
        let mut info = ZCanChlError::default();
        check_status("ZCAN_ReadChannelErrInfo", unsafe { (self.api.ZCAN_ReadChannelErrInfo)(chl_ptr(chl_hdl), &mut info) })?;

        Ok(info)
    }

    fn read_channel_status(&self, chl_hdl: ChannelHandle) -> Result<ZCanChlStatus, CanError> {
        let mut status = ZCanChlStatus::default();
        check_status("ZCAN_ReadChannelStatus", unsafe { (self.api.ZCAN_ReadChannelStatus)(chl_ptr(chl_hdl), &mut status) })?;

        Ok(status)
    }

    fn get_receive_num(&self, chl_hdl: ChannelHandle, can_type: ZCanFrameType) -> Result<u32, CanError> {
        let ret = unsafe { (self.api.ZCAN_GetReceiveNum)(chl_ptr(chl_hdl), can_type as c_uchar) };
        if ret > 0 {
            log::trace!("ZLGCAN - get receive {} number: {}.", can_type, ret);
        }

        Ok(ret)
    }

    fn transmit(&self, chl_hdl: ChannelHandle, frames: &[ZCanTxFrame]) -> Result<u32, CanError> {
        let len = frames.len() as c_uint;
        let ret = unsafe { (self.api.ZCAN_Transmit)(chl_ptr(chl_hdl), frames.as_ptr(), len) };
        if ret < len {
            log::warn!("ZLGCAN - transmit CAN frame expect: {}, actual: {}!", len, ret);
        }
        else {
            log::trace!("ZLGCAN - transmit CAN frame: {}", ret);
        }

        Ok(ret)
    }

    fn transmit_fd(&self, chl_hdl: ChannelHandle, frames: &[ZCanFdTxFrame]) -> Result<u32, CanError> {
        let len = frames.len() as c_uint;
        let ret = unsafe { (self.api.ZCAN_TransmitFD)(chl_ptr(chl_hdl), frames.as_ptr(), len) };
        if ret < len {
            log::warn!("ZLGCAN - transmit CAN-FD frame expect: {}, actual: {}!", len, ret);
        }
        else {
            log::trace!("ZLGCAN - transmit CAN-FD frame: {}", ret);
        }

        Ok(ret)
    }

    fn receive(&self, chl_hdl: ChannelHandle, frames: &mut [ZCanRxFrame], wait_time: i32) -> Result<u32, CanError> {
        let size = frames.len() as c_uint;
        let ret = unsafe { (self.api.ZCAN_Receive)(chl_ptr(chl_hdl), frames.as_mut_ptr(), size, wait_time) };
        if ret > 0 {
            log::trace!("ZLGCAN - receive CAN frame: {}", ret);
        }

        Ok(ret.min(size))
    }

    fn receive_fd(&self, chl_hdl: ChannelHandle, frames: &mut [ZCanFdRxFrame], wait_time: i32) -> Result<u32, CanError> {
        let size = frames.len() as c_uint;
        let ret = unsafe { (self.api.ZCAN_ReceiveFD)(chl_ptr(chl_hdl), frames.as_mut_ptr(), size, wait_time) };
        if ret > 0 {
            log::trace!("ZLGCAN - receive CAN-FD frame: {}", ret);
        }

        Ok(ret.min(size))
    }

    fn transmit_data(&self, dev_hdl: DeviceHandle, objs: &[ZCanDataObj]) -> Result<u32, CanError> {
        let func = self.api.ZCAN_TransmitData.as_ref()
            .ok_or(CanError::driver_error("`ZCAN_TransmitData` is not supported"))?;
        let len = objs.len() as c_uint;
        let ret = unsafe { func(dev_ptr(dev_hdl), objs.as_ptr(), len) };
        if ret < len {
            log::warn!("ZLGCAN - transmit data expect: {}, actual: {}!", len, ret);
        }
        else {
            log::trace!("ZLGCAN - transmit data: {}", ret);
        }

        Ok(ret)
    }

    fn receive_data(&self, dev_hdl: DeviceHandle, objs: &mut [ZCanDataObj], wait_time: i32) -> Result<u32, CanError> {
        let func = self.api.ZCAN_ReceiveData.as_ref()
            .ok_or(CanError::driver_error("`ZCAN_ReceiveData` is not supported"))?;
        let size = objs.len() as c_uint;
        let ret = unsafe { func(dev_ptr(dev_hdl), objs.as_mut_ptr(), size, wait_time) };
        if ret > 0 {
            log::trace!("ZLGCAN - receive data: {}", ret);
        }

        Ok(ret.min(size))
    }

    fn set_value(&self, dev_hdl: DeviceHandle, path: &str, value: &str) -> Result<(), CanError> {
        let (c_path, c_value) = (string_to_c_str(path)?, string_to_c_str(value)?);
        let ret = unsafe { (self.api.ZCAN_SetValue)(dev_ptr(dev_hdl), c_path.as_ptr(), c_value.as_ptr() as *const c_void) };
        check_status("ZCAN_SetValue", ret)
            .map_err(|e| CanError::DriverError(format!("{} {}", path, e)))
    }

    fn get_value(&self, dev_hdl: DeviceHandle, path: &str) -> Result<String, CanError> {
        let c_path = string_to_c_str(path)?;
        let ret = unsafe { (self.api.ZCAN_GetValue)(dev_ptr(dev_hdl), c_path.as_ptr()) };
        c_str_to_string(ret as *const c_char)
            .map_err(|e| CanError::DriverError(format!("`ZCAN_GetValue` {}: {}", path, e)))
    }

    fn get_property(&self, dev_hdl: DeviceHandle) -> Result<PropertyHandle, CanError> {
        let ret = unsafe { (self.api.GetIProperty)(dev_ptr(dev_hdl)) };
        if ret.is_null() {
            Err(CanError::DriverError("`GetIProperty` ret: null".into()))
        }
        else {
            Ok(PropertyHandle::from_raw(ret as usize as u64))
        }
    }

    fn release_property(&self, property: PropertyHandle) -> Result<(), CanError> {
        let p = property_ptr(property)?;
        check_status("ReleaseIProperty", unsafe { (self.api.ReleaseIProperty)(p) })
    }

    fn set_property_value(&self, property: PropertyHandle, path: &str, value: &str) -> Result<(), CanError> {
        let p = property_ptr(property)?;
        let func = unsafe { (*p).SetValue }
            .ok_or(CanError::driver_error("`IProperty::SetValue` is not supported"))?;
        let (c_path, c_value) = (string_to_c_str(path)?, string_to_c_str(value)?);
        match unsafe { func(c_path.as_ptr(), c_value.as_ptr()) } as c_uint {
            STATUS_OK => Ok(()),
            code => Err(CanError::DriverError(format!("{}, SetValue failed ret: {}", path, code))),
        }
    }

    fn get_property_value(&self, property: PropertyHandle, path: &str) -> Result<String, CanError> {
        let p = property_ptr(property)?;
        let func = unsafe { (*p).GetValue }
            .ok_or(CanError::driver_error("`IProperty::GetValue` is not supported"))?;
        let c_path = string_to_c_str(path)?;
        c_str_to_string(unsafe { func(c_path.as_ptr()) })
            .map_err(|e| CanError::DriverError(format!("{}, GetValue failed: {}", path, e)))
    }
}
