use std::fmt::{Display, Formatter};
use rs_can::{CANFD_FRAME_MAX_SIZE, CAN_FRAME_MAX_SIZE, Direct, Frame, Id, utils::{can_dlc, is_can_fd_len}};
use crate::can::ZCanTxMode;

#[derive(Debug, Clone)]
pub struct CanMessage {
    pub(crate) timestamp: u64,
    pub(crate) arbitration_id: u32,
    pub(crate) is_extended_id: bool,
    pub(crate) is_remote_frame: bool,
    pub(crate) is_error_frame: bool,
    pub(crate) channel: u8,
    pub(crate) length: usize,
    pub(crate) data: Vec<u8>,
    pub(crate) is_fd: bool,
    pub(crate) direct: Direct,
    pub(crate) bitrate_switch: bool,
    pub(crate) error_state_indicator: bool,
    pub(crate) tx_mode: ZCanTxMode,
}

impl Frame for CanMessage {
    type Channel = u8;

    #[inline]
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        let length = data.len();
        let is_fd = is_can_fd_len(length).ok()?;
        let id: Id = id.into();

        Some(Self {
            timestamp: 0,
            arbitration_id: id.as_raw(),
            is_extended_id: id.is_extended(),
            is_remote_frame: false,
            is_error_frame: false,
            channel: Default::default(),
            length,
            data: data.to_vec(),
            is_fd,
            direct: Default::default(),
            bitrate_switch: false,
            error_state_indicator: false,
            tx_mode: Default::default(),
        })
    }

    #[inline]
    fn new_remote(id: impl Into<Id>, len: usize) -> Option<Self> {
        if len > CAN_FRAME_MAX_SIZE {
            return None;
        }
        let id: Id = id.into();

        Some(Self {
            timestamp: 0,
            arbitration_id: id.as_raw(),
            is_extended_id: id.is_extended(),
            is_remote_frame: true,
            is_error_frame: false,
            channel: Default::default(),
            length: len,
            data: Default::default(),
            is_fd: false,
            direct: Default::default(),
            bitrate_switch: false,
            error_state_indicator: false,
            tx_mode: Default::default(),
        })
    }

    #[inline]
    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    #[inline]
    fn set_timestamp(&mut self, value: Option<u64>) -> &mut Self {
        self.timestamp = value.unwrap_or_default();
        self
    }

    #[inline]
    fn id(&self) -> Id {
        Id::from_bits(self.arbitration_id, self.is_extended_id)
    }

    #[inline]
    fn is_can_fd(&self) -> bool {
        self.is_fd
    }

    #[inline]
    fn set_can_fd(&mut self, value: bool) -> &mut Self {
        if !value && self.length > CAN_FRAME_MAX_SIZE {
            log::warn!("ZLGCAN - resize a frame to: {}", CAN_FRAME_MAX_SIZE);
            self.length = CAN_FRAME_MAX_SIZE;
            self.data.truncate(CAN_FRAME_MAX_SIZE);
        }
        self.is_fd = value;
        self
    }

    #[inline]
    fn is_remote(&self) -> bool {
        self.is_remote_frame
    }

    #[inline]
    fn is_extended(&self) -> bool {
        self.is_extended_id
    }

    #[inline]
    fn direct(&self) -> Direct {
        self.direct
    }

    #[inline]
    fn set_direct(&mut self, direct: Direct) -> &mut Self {
        self.direct = direct;
        self
    }

    #[inline]
    fn is_bitrate_switch(&self) -> bool {
        self.bitrate_switch
    }

    #[inline]
    fn set_bitrate_switch(&mut self, value: bool) -> &mut Self {
        self.bitrate_switch = value;
        self
    }

    #[inline]
    fn is_error_frame(&self) -> bool {
        self.is_error_frame
    }

    #[inline]
    fn set_error_frame(&mut self, value: bool) -> &mut Self {
        self.is_error_frame = value;
        self
    }

    #[inline]
    fn is_esi(&self) -> bool {
        self.error_state_indicator
    }

    #[inline]
    fn set_esi(&mut self, value: bool) -> &mut Self {
        self.error_state_indicator = value;
        self
    }

    #[inline]
    fn channel(&self) -> Self::Channel {
        self.channel
    }

    #[inline]
    fn set_channel(&mut self, value: Self::Channel) -> &mut Self {
        self.channel = value;
        self
    }

    #[inline]
    fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    #[inline]
    fn dlc(&self) -> Option<usize> {
        can_dlc(self.length, self.is_fd)
    }

    #[inline]
    fn length(&self) -> usize {
        self.length
    }
}

impl PartialEq for CanMessage {
    fn eq(&self, other: &Self) -> bool {
        if self.length != other.length {
            return false;
        }

        if self.is_remote_frame {
            other.is_remote_frame && (self.arbitration_id == other.arbitration_id)
        }
        else {
            (self.arbitration_id == other.arbitration_id) &&
                (self.is_extended_id == other.is_extended_id) &&
                (self.is_error_frame == other.is_error_frame) &&
                (self.is_fd == other.is_fd) &&
                (self.bitrate_switch == other.bitrate_switch) &&
                (self.error_state_indicator == other.error_state_indicator) &&
                (self.data == other.data)
        }
    }
}

impl CanMessage {
    /// A CAN-FD frame regardless of the payload size.
    #[inline]
    pub fn new_fd(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > CANFD_FRAME_MAX_SIZE {
            return None;
        }
        let mut msg = <Self as Frame>::new(id, data)?;
        msg.is_fd = true;

        Some(msg)
    }

    #[inline(always)]
    pub fn tx_mode(&self) -> ZCanTxMode {
        self.tx_mode
    }

    #[inline(always)]
    pub fn set_tx_mode(&mut self, tx_mode: ZCanTxMode) -> &mut Self {
        self.tx_mode = tx_mode;
        self
    }
}

impl Display for CanMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        <dyn Frame<Channel = u8> as Display>::fmt(self, f)
    }
}
