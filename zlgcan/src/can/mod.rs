mod channel;
pub(crate) mod constant;
mod data;
mod frame;
mod message;

pub use channel::*;
pub use data::*;
pub use constant::{
    CANFD_BRS, CANFD_ESI, DEFAULT_ACC_MASK, DEFAULT_POLL_BATCH_SIZE, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_TIMING1, INVALID_CHANNEL_HANDLE, INVALID_DEVICE_HANDLE, MAX_RECEIVE_COUNT,
};
pub use frame::*;
pub use message::*;

use std::fmt::{Display, Formatter};
use rs_can::CanError;

/// The channel type selected by the `canType` discriminator.
#[repr(C)]
#[allow(non_camel_case_types)]
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum ZCanChlType {
    #[default]
    CAN = 0,
    CANFD = 1,
}

impl TryFrom<u8> for ZCanChlType {
    type Error = CanError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ZCanChlType::CAN),
            1 => Ok(ZCanChlType::CANFD),
            v => Err(CanError::ArgumentError(format!("`canType`: {} not supported", v))),
        }
    }
}

/// Then CAN frame type used in `get_receive_num`.
#[repr(C)]
#[allow(non_camel_case_types)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ZCanFrameType {
    CAN = 0,
    CANFD = 1,
    ALL = 2,
}

impl TryFrom<u8> for ZCanFrameType {
    type Error = CanError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ZCanFrameType::CAN),
            1 => Ok(ZCanFrameType::CANFD),
            2 => Ok(ZCanFrameType::ALL),
            v => Err(CanError::ArgumentError(format!("frame type: {} not supported", v))),
        }
    }
}

impl Display for ZCanFrameType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CAN => write!(f, "CAN"),
            Self::CANFD => write!(f, "CANFD"),
            Self::ALL => write!(f, "CAN|CANFD"),
        }
    }
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum ZCanTxMode {
    #[default]
    Normal = 0,             //**< normal transmission */
    Once = 1,               //**< single-shot transmission */
    SelfReception = 2,      //**< self reception */
    SelfReceptionOnce = 3,  //**< single-shot transmission & self reception */
}

impl TryFrom<u32> for ZCanTxMode {
    type Error = CanError;
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ZCanTxMode::Normal),
            1 => Ok(ZCanTxMode::Once),
            2 => Ok(ZCanTxMode::SelfReception),
            3 => Ok(ZCanTxMode::SelfReceptionOnce),
            v => Err(CanError::ArgumentError(format!("transmit type: {} not supported", v))),
        }
    }
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum ZCanFilterType {
    #[default]
    Double = 0,
    Single = 1,
}

impl TryFrom<u8> for ZCanFilterType {
    type Error = CanError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ZCanFilterType::Double),
            1 => Ok(ZCanFilterType::Single),
            v => Err(CanError::ArgumentError(format!("`filter`: {} not supported", v))),
        }
    }
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum ZCanChlMode {
    #[default]
    Normal = 0,
    ListenOnly = 1,
}

impl TryFrom<u8> for ZCanChlMode {
    type Error = CanError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ZCanChlMode::Normal),
            1 => Ok(ZCanChlMode::ListenOnly),
            v => Err(CanError::ArgumentError(format!("`mode`: {} not supported", v))),
        }
    }
}
