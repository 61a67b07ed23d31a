use std::ffi::{c_uchar, c_uint, c_ushort};
use std::fmt::{Display, Formatter};
use crate::can::{INVALID_CHANNEL_HANDLE, INVALID_DEVICE_HANDLE};

macro_rules! handle_type {
    ($(#[$meta:meta])* $name:ident, $invalid:expr) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
        pub struct $name(u64);

        impl $name {
            /// The driver's sentinel value.
            pub const INVALID: Self = Self($invalid);

            #[inline]
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(&self) -> u64 {
                self.0
            }

            #[inline]
            pub const fn is_valid(&self) -> bool {
                self.0 != $invalid
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:#018x}", self.0)
            }
        }
    };
}

handle_type!(
    /// Opaque device handle returned by `ZCAN_OpenDevice`.
    DeviceHandle, INVALID_DEVICE_HANDLE
);
handle_type!(
    /// Opaque channel handle returned by `ZCAN_InitCAN`, valid while its device is open.
    ChannelHandle, INVALID_CHANNEL_HANDLE
);
handle_type!(
    /// The driver's `IProperty` interface pointer.
    PropertyHandle, 0
);

/// `ZCAN_DEVICE_INFO`
#[allow(non_snake_case)]
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct ZDeviceInfo {
    pub(crate) hw_Version: c_ushort,
    pub(crate) fw_Version: c_ushort,
    pub(crate) dr_Version: c_ushort,
    pub(crate) in_Version: c_ushort,
    pub(crate) irq_Num: c_ushort,
    pub(crate) can_Num: c_uchar,
    pub(crate) str_Serial_Num: [c_uchar; 20],
    pub(crate) str_hw_Type: [c_uchar; 40],
    pub(crate) reserved: [c_ushort; 4],
}

impl Default for ZDeviceInfo {
    fn default() -> Self {
        Self {
            hw_Version: 0,
            fw_Version: 0,
            dr_Version: 0,
            in_Version: 0,
            irq_Num: 0,
            can_Num: 0,
            str_Serial_Num: [0; 20],
            str_hw_Type: [0; 40],
            reserved: [0; 4],
        }
    }
}

impl ZDeviceInfo {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        hardware: u16,
        firmware: u16,
        driver: u16,
        library: u16,
        irq: u16,
        can_number: u8,
        serial: &str,
        hw_type: &str,
    ) -> Self {
        let mut info = Self {
            hw_Version: hardware,
            fw_Version: firmware,
            dr_Version: driver,
            in_Version: library,
            irq_Num: irq,
            can_Num: can_number,
            ..Default::default()
        };
        copy_str(&mut info.str_Serial_Num, serial);
        copy_str(&mut info.str_hw_Type, hw_type);

        info
    }

    #[inline]
    pub fn hardware_version(&self) -> u16 {
        self.hw_Version
    }

    #[inline]
    pub fn firmware_version(&self) -> u16 {
        self.fw_Version
    }

    #[inline]
    pub fn driver_version(&self) -> u16 {
        self.dr_Version
    }

    #[inline]
    pub fn library_version(&self) -> u16 {
        self.in_Version
    }

    #[inline]
    pub fn irq_number(&self) -> u16 {
        self.irq_Num
    }

    #[inline]
    pub fn can_number(&self) -> u8 {
        self.can_Num
    }

    #[inline]
    pub fn serial_number(&self) -> String {
        fixed_str(&self.str_Serial_Num)
    }

    #[inline]
    pub fn hardware_type(&self) -> String {
        fixed_str(&self.str_hw_Type)
    }
}

/// `ZCAN_VERSION`
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct ZCanVersion {
    pub major_version: c_uint,
    pub minor_version: c_uint,
    pub patch_version: c_uint,
}

impl ZCanVersion {
    #[inline]
    pub const fn new(major_version: u32, minor_version: u32, patch_version: u32) -> Self {
        Self { major_version, minor_version, patch_version }
    }
}

impl Display for ZCanVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "V{}.{}.{}", self.major_version, self.minor_version, self.patch_version)
    }
}

/// `ZCAN_DEVICE_INFO_EX`
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct ZDeviceInfoEx {
    pub(crate) hardware_version: ZCanVersion,
    pub(crate) firmware_version: ZCanVersion,
    pub(crate) driver_version: ZCanVersion,
    pub(crate) library_version: ZCanVersion,
    pub(crate) device_name: [c_uchar; 64],
    pub(crate) hardware_type: [c_uchar; 64],
    pub(crate) serial_number: [c_uchar; 64],
    pub(crate) can_channel_number: c_uint,
    pub(crate) lin_channel_number: c_uint,
    pub(crate) reserved: [c_uchar; 256],
}

impl Default for ZDeviceInfoEx {
    fn default() -> Self {
        Self {
            hardware_version: Default::default(),
            firmware_version: Default::default(),
            driver_version: Default::default(),
            library_version: Default::default(),
            device_name: [0; 64],
            hardware_type: [0; 64],
            serial_number: [0; 64],
            can_channel_number: 0,
            lin_channel_number: 0,
            reserved: [0; 256],
        }
    }
}

impl ZDeviceInfoEx {
    /// `versions` are hardware, firmware, driver and library in that order.
    pub fn new(
        versions: [ZCanVersion; 4],
        device_name: &str,
        hardware_type: &str,
        serial_number: &str,
        can_channels: u32,
        lin_channels: u32,
    ) -> Self {
        let [hardware_version, firmware_version, driver_version, library_version] = versions;
        let mut info = Self {
            hardware_version,
            firmware_version,
            driver_version,
            library_version,
            can_channel_number: can_channels,
            lin_channel_number: lin_channels,
            ..Default::default()
        };
        copy_str(&mut info.device_name, device_name);
        copy_str(&mut info.hardware_type, hardware_type);
        copy_str(&mut info.serial_number, serial_number);

        info
    }

    #[inline]
    pub fn hardware_version(&self) -> ZCanVersion {
        self.hardware_version
    }

    #[inline]
    pub fn firmware_version(&self) -> ZCanVersion {
        self.firmware_version
    }

    #[inline]
    pub fn driver_version(&self) -> ZCanVersion {
        self.driver_version
    }

    #[inline]
    pub fn library_version(&self) -> ZCanVersion {
        self.library_version
    }

    #[inline]
    pub fn device_name(&self) -> String {
        fixed_str(&self.device_name)
    }

    #[inline]
    pub fn hardware_type(&self) -> String {
        fixed_str(&self.hardware_type)
    }

    #[inline]
    pub fn serial_number(&self) -> String {
        fixed_str(&self.serial_number)
    }

    #[inline]
    pub fn can_channel_number(&self) -> u32 {
        self.can_channel_number
    }

    #[inline]
    pub fn lin_channel_number(&self) -> u32 {
        self.lin_channel_number
    }
}

/// Format a `0xMmm` driver version as `V{M}.{mm}`.
#[inline]
pub fn version_string(version: u16) -> String {
    format!("V{}.{:02X}", version >> 8, version & 0xFF)
}

/// Keeps the trailing NUL.
#[inline]
fn copy_str(buf: &mut [u8], value: &str) {
    let size = value.len().min(buf.len() - 1);
    buf[..size].copy_from_slice(&value.as_bytes()[..size]);
}

#[inline]
fn fixed_str(buf: &[u8]) -> String {
    let end = buf.iter()
        .position(|&b| b == 0)
        .unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).trim().to_owned()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use super::{version_string, ChannelHandle, DeviceHandle, ZCanVersion, ZDeviceInfo, ZDeviceInfoEx};

    #[test]
    fn handles() {
        assert!(!DeviceHandle::INVALID.is_valid());
        assert!(!ChannelHandle::from_raw(0).is_valid());

        let raw = 0xFFFF_8000_0000_1234;
        let hdl = ChannelHandle::from_raw(raw);
        assert!(hdl.is_valid());
        assert_eq!(hdl.raw(), raw);
        assert_eq!(hdl.to_string(), "0xffff800000001234");

        let set: HashSet<_> = [hdl, ChannelHandle::from_raw(raw), ChannelHandle::from_raw(1)].into();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn device_info() {
        let info = ZDeviceInfo::new(0x0101, 0x0210, 0, 0, 0, 2, "31F01031C93", "USBCANFD-200U");
        assert_eq!(info.serial_number(), "31F01031C93");
        assert_eq!(info.hardware_type(), "USBCANFD-200U");
        assert_eq!(info.can_number(), 2);
        assert_eq!(version_string(info.hardware_version()), "V1.01");
        assert_eq!(version_string(info.firmware_version()), "V2.10");

        let info = ZDeviceInfo::new(0, 0, 0, 0, 0, 0, &"X".repeat(64), "");
        assert_eq!(info.serial_number().len(), 19);
        assert_eq!(info.hardware_type(), "");
    }

    #[test]
    fn device_info_ex() {
        let versions = [
            ZCanVersion::new(1, 0, 2),
            ZCanVersion::new(2, 10, 0),
            ZCanVersion::default(),
            ZCanVersion::new(3, 1, 7),
        ];
        let info = ZDeviceInfoEx::new(versions, "USBCANFD-200U", "USBCANFD", "31F01031C93", 2, 0);
        assert_eq!(std::mem::size_of::<ZDeviceInfoEx>(), 4 * 12 + 3 * 64 + 2 * 4 + 256);
        assert_eq!(info.hardware_version().to_string(), "V1.0.2");
        assert_eq!(info.firmware_version(), ZCanVersion::new(2, 10, 0));
        assert_eq!(info.library_version().to_string(), "V3.1.7");
        assert_eq!(info.device_name(), "USBCANFD-200U");
        assert_eq!(info.hardware_type(), "USBCANFD");
        assert_eq!(info.serial_number(), "31F01031C93");
        assert_eq!(info.can_channel_number(), 2);
        assert_eq!(info.lin_channel_number(), 0);

        let info = ZDeviceInfoEx::new(versions, &"N".repeat(100), "", "", 0, 0);
        assert_eq!(info.device_name().len(), 63);
    }
}
