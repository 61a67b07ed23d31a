use std::ffi::{c_uchar, c_uint};
use derive_getters::Getters;
use serde::Deserialize;
use rs_can::CanError;
use crate::can::{ZCanChlMode, ZCanChlType, ZCanFilterType, constant::{DEFAULT_ACC_MASK, DEFAULT_TIMING1}};

/// Channel initialization parameters, selected by the `canType` discriminator.
///
/// Only the fields of the active variant exist, the overlapped driver layout is
/// built at the FFI boundary. Fields missing from a deserialized document take
/// the variant's [`Default`] value: `accMask` accepts all identifiers, `timing1`
/// is [`DEFAULT_TIMING1`] and every other field is zero.
///
/// ```yaml
/// canType: CAN
/// timing0: 0x00
/// timing1: 0x1C
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize)]
#[serde(tag = "canType")]
pub enum ChannelConfig {
    #[serde(rename = "CAN", alias = "0")]
    Classic(ClassicChannelConfig),
    #[serde(rename = "CANFD", alias = "1")]
    CanFd(FdChannelConfig),
}

impl ChannelConfig {
    /// Classic channel with the given bus timing registers, everything else defaulted.
    #[inline]
    pub fn classic(timing0: u8, timing1: u8) -> Self {
        Self::Classic(ClassicChannelConfig { timing0, timing1, ..Default::default() })
    }

    /// CAN-FD channel with the given arbitration and data phase timings.
    #[inline]
    pub fn canfd(abit_timing: u32, dbit_timing: u32) -> Self {
        Self::CanFd(FdChannelConfig { abit_timing, dbit_timing, ..Default::default() })
    }

    /// A defaulted configuration of the variant named by a raw `canType` value.
    pub fn with_type(can_type: u8) -> Result<Self, CanError> {
        match ZCanChlType::try_from(can_type)? {
            ZCanChlType::CAN => Ok(Self::Classic(Default::default())),
            ZCanChlType::CANFD => Ok(Self::CanFd(Default::default())),
        }
    }

    #[inline]
    pub fn can_type(&self) -> ZCanChlType {
        match self {
            Self::Classic(_) => ZCanChlType::CAN,
            Self::CanFd(_) => ZCanChlType::CANFD,
        }
    }

    /// Reject field values the driver does not define.
    pub fn validate(&self) -> Result<(), CanError> {
        let (filter, mode) = match self {
            Self::Classic(cfg) => (cfg.filter, cfg.mode),
            Self::CanFd(cfg) => (cfg.filter, cfg.mode),
        };
        ZCanFilterType::try_from(filter)?;
        ZCanChlMode::try_from(mode)?;

        Ok(())
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::Classic(Default::default())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClassicChannelConfig {
    pub acc_code: u32,
    pub acc_mask: u32,
    pub reserved: u32,
    pub filter: u8,
    pub timing0: u8,
    pub timing1: u8,
    pub mode: u8,
}

impl Default for ClassicChannelConfig {
    fn default() -> Self {
        Self {
            acc_code: 0,
            acc_mask: DEFAULT_ACC_MASK,
            reserved: 0,
            filter: 0,
            timing0: 0,
            timing1: DEFAULT_TIMING1,
            mode: 0,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FdChannelConfig {
    pub acc_code: u32,
    pub acc_mask: u32,
    pub abit_timing: u32,
    pub dbit_timing: u32,
    pub brp: u32,
    pub filter: u8,
    pub mode: u8,
    pub pad: u16,
    pub reserved: u32,
}

impl Default for FdChannelConfig {
    fn default() -> Self {
        Self {
            acc_code: 0,
            acc_mask: DEFAULT_ACC_MASK,
            abit_timing: 0,
            dbit_timing: 0,
            brp: 0,
            filter: 0,
            mode: 0,
            pad: 0,
            reserved: 0,
        }
    }
}

/// Register snapshot of a channel controller.
#[allow(non_snake_case)]
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct ZCanChlStatus {
    pub errInterrupt: c_uchar,  /**< not used(for backward compatibility) */
    pub regMode: c_uchar,       /**< not used */
    pub regStatus: c_uchar,     /**< not used */
    pub regALCapture: c_uchar,  /**< not used */
    pub regECCapture: c_uchar,  /**< not used */
    pub regEWLimit: c_uchar,    /**< not used */
    pub regRECounter: c_uchar,  /**< RX errors */
    pub regTECounter: c_uchar,  /**< TX errors */
    pub Reserved: c_uint,
}

/// Error counters of a channel.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Getters)]
pub struct ZCanChlError {
    #[getter(copy)]
    pub(crate) error_code: c_uint,
    #[getter(copy)]
    pub(crate) passive_err_data: [c_uchar; 3],
    #[getter(copy)]
    pub(crate) ar_lost_err_data: c_uchar,
}

impl ZCanChlError {
    #[inline]
    pub fn new(error_code: u32, passive_err_data: [u8; 3], ar_lost_err_data: u8) -> Self {
        Self { error_code, passive_err_data, ar_lost_err_data }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChannelConfig, ClassicChannelConfig, FdChannelConfig};
    use crate::can::{ZCanChlType, DEFAULT_ACC_MASK, DEFAULT_TIMING1};
    use rs_can::CanError;

    #[test]
    fn classic_defaults() {
        let cfg = ClassicChannelConfig::default();
        assert_eq!(cfg.acc_mask, DEFAULT_ACC_MASK);
        assert_eq!(cfg.timing1, DEFAULT_TIMING1);
        assert_eq!(cfg.acc_code, 0);
        assert_eq!(cfg.timing0, 0);
        assert_eq!(cfg.filter, 0);
        assert_eq!(cfg.mode, 0);
    }

    #[test]
    fn deserialize_classic() -> anyhow::Result<()> {
        let cfg: ChannelConfig = serde_yaml::from_str("canType: CAN\ntiming0: 1\n")?;
        match cfg {
            ChannelConfig::Classic(v) => {
                assert_eq!(v.timing0, 1);
                assert_eq!(v.timing1, DEFAULT_TIMING1);
                assert_eq!(v.acc_mask, DEFAULT_ACC_MASK);
            },
            _ => panic!("classic configuration expected"),
        }

        Ok(())
    }

    #[test]
    fn deserialize_canfd() -> anyhow::Result<()> {
        let doc = "canType: CANFD\nabitTiming: 104286\ndbitTiming: 4260362\naccCode: 16\n";
        let cfg: ChannelConfig = serde_yaml::from_str(doc)?;
        assert_eq!(cfg.can_type(), ZCanChlType::CANFD);
        assert_eq!(cfg, ChannelConfig::CanFd(FdChannelConfig {
            acc_code: 16,
            abit_timing: 104286,
            dbit_timing: 4260362,
            ..Default::default()
        }));

        Ok(())
    }

    #[test]
    fn with_type() {
        assert_eq!(ChannelConfig::with_type(0), Ok(ChannelConfig::Classic(Default::default())));
        assert_eq!(ChannelConfig::with_type(1), Ok(ChannelConfig::CanFd(Default::default())));
        assert!(matches!(ChannelConfig::with_type(2), Err(CanError::ArgumentError(_))));
    }

    #[test]
    fn validate() {
        assert!(ChannelConfig::classic(0, 0x1C).validate().is_ok());
        let cfg = ChannelConfig::Classic(ClassicChannelConfig { filter: 2, ..Default::default() });
        assert!(matches!(cfg.validate(), Err(CanError::ArgumentError(_))));
        let cfg = ChannelConfig::CanFd(FdChannelConfig { mode: 7, ..Default::default() });
        assert!(matches!(cfg.validate(), Err(CanError::ArgumentError(_))));
    }
}
