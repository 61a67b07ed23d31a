use std::ffi::{c_uchar, c_uint, c_ulonglong};
use rs_can::{CanError, CANFD_FRAME_MAX_SIZE, CAN_FRAME_MAX_SIZE, Direct, EFF_MASK, IdentifierFlags};
use crate::can::{CanMessage, ZCanTxMode, constant::{CANFD_BRS, CANFD_ESI}};

/// `can_frame`/`canfd_frame` of the driver header.
#[repr(C)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ZCanMsg20<const S: usize> {
    pub(crate) can_id: c_uint,
    pub(crate) can_len: c_uchar,
    pub(crate) flags: c_uchar,  /* padding when using can else additional flags for CAN FD */
    pub(crate) __res0: c_uchar, /* reserved / padding */
    pub(crate) __res1: c_uchar, /* reserved / padding */
    pub(crate) data: [c_uchar; S],
}

impl<const S: usize> Default for ZCanMsg20<S> {
    fn default() -> Self {
        Self {
            can_id: Default::default(),
            can_len: Default::default(),
            flags: Default::default(),
            __res0: Default::default(),
            __res1: Default::default(),
            data: [Default::default(); S],
        }
    }
}

/// `ZCAN_Transmit_Data`/`ZCAN_TransmitFD_Data`
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct ZCanFrameTx<const S: usize> {
    pub(crate) frame: ZCanMsg20<S>,
    pub(crate) tx_mode: c_uint,
}

impl<const S: usize> ZCanFrameTx<S> {
    /// The raw identifier including the flag bits.
    #[inline]
    pub fn can_id(&self) -> u32 {
        self.frame.can_id
    }

    #[inline]
    pub fn len(&self) -> u8 {
        self.frame.can_len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frame.can_len == 0
    }

    #[inline]
    pub fn flags(&self) -> u8 {
        self.frame.flags
    }

    /// The whole payload buffer, including the bytes past `len`.
    #[inline]
    pub fn buffer(&self) -> &[u8; S] {
        &self.frame.data
    }

    #[inline]
    pub fn tx_mode(&self) -> u32 {
        self.tx_mode
    }
}

/// `ZCAN_Receive_Data`/`ZCAN_ReceiveFD_Data`
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct ZCanFrameRx<const S: usize> {
    pub(crate) frame: ZCanMsg20<S>,
    pub(crate) timestamp: c_ulonglong,
}

impl<const S: usize> ZCanFrameRx<S> {
    /// Build a received frame the way the driver fills it, `data` beyond `S` is dropped.
    pub fn new(can_id: u32, can_len: u8, flags: u8, data: &[u8], timestamp: u64) -> Self {
        let mut frame = ZCanMsg20::<S> { can_id, can_len, flags, ..Default::default() };
        let size = data.len().min(S);
        frame.data[..size].copy_from_slice(&data[..size]);

        Self { frame, timestamp }
    }
}

pub type ZCanTxFrame = ZCanFrameTx<CAN_FRAME_MAX_SIZE>;
pub type ZCanFdTxFrame = ZCanFrameTx<CANFD_FRAME_MAX_SIZE>;
pub type ZCanRxFrame = ZCanFrameRx<CAN_FRAME_MAX_SIZE>;
pub type ZCanFdRxFrame = ZCanFrameRx<CANFD_FRAME_MAX_SIZE>;

#[inline]
pub(crate) fn pack_id(msg: &CanMessage) -> u32 {
    let mut flags = IdentifierFlags::empty();
    flags.set(IdentifierFlags::EXTENDED, msg.is_extended_id);
    flags.set(IdentifierFlags::REMOTE, msg.is_remote_frame);
    flags.set(IdentifierFlags::ERROR, msg.is_error_frame);

    (msg.arbitration_id & EFF_MASK) | flags.bits()
}

#[inline]
pub(crate) fn unpack_id(can_id: u32, msg: &mut CanMessage) {
    let flags = IdentifierFlags::from_bits_truncate(can_id);
    msg.arbitration_id = can_id & EFF_MASK;
    msg.is_extended_id = flags.contains(IdentifierFlags::EXTENDED);
    msg.is_remote_frame = flags.contains(IdentifierFlags::REMOTE);
    msg.is_error_frame = flags.contains(IdentifierFlags::ERROR);
}

fn encode<const S: usize>(msg: &CanMessage) -> Result<ZCanFrameTx<S>, CanError> {
    if msg.length > S {
        return Err(CanError::ArgumentError(
            format!("frame length: {} is out of range 0..={}", msg.length, S)
        ));
    }

    let mut frame = ZCanMsg20::<S> {
        can_id: pack_id(msg),
        can_len: msg.length as u8,
        ..Default::default()
    };
    let size = msg.data.len().min(msg.length);
    frame.data[..size].copy_from_slice(&msg.data[..size]);

    Ok(ZCanFrameTx { frame, tx_mode: msg.tx_mode as u32 })
}

fn decode<const S: usize>(raw: &ZCanFrameRx<S>, channel: u8, is_fd: bool) -> CanMessage {
    let length = (raw.frame.can_len as usize).min(S);
    let mut msg = CanMessage {
        timestamp: raw.timestamp,
        arbitration_id: 0,
        is_extended_id: false,
        is_remote_frame: false,
        is_error_frame: false,
        channel,
        length,
        data: raw.frame.data[..length].to_vec(),
        is_fd,
        direct: Direct::Receive,
        bitrate_switch: is_fd && (raw.frame.flags & CANFD_BRS) > 0,
        error_state_indicator: is_fd && (raw.frame.flags & CANFD_ESI) > 0,
        tx_mode: ZCanTxMode::default(),
    };
    unpack_id(raw.frame.can_id, &mut msg);

    msg
}

/// Classic frame to the driver layout; payload bytes past `length` stay zero.
#[inline]
pub fn encode_can(msg: &CanMessage) -> Result<ZCanTxFrame, CanError> {
    encode(msg)
}

/// CAN-FD frame to the driver layout with the `BRS`/`ESI` flag byte.
#[inline]
pub fn encode_canfd(msg: &CanMessage) -> Result<ZCanFdTxFrame, CanError> {
    let mut frame: ZCanFdTxFrame = encode(msg)?;
    if msg.bitrate_switch {
        frame.frame.flags |= CANFD_BRS;
    }
    if msg.error_state_indicator {
        frame.frame.flags |= CANFD_ESI;
    }

    Ok(frame)
}

#[inline]
pub fn decode_can(raw: &ZCanRxFrame, channel: u8) -> CanMessage {
    decode(raw, channel, false)
}

#[inline]
pub fn decode_canfd(raw: &ZCanFdRxFrame, channel: u8) -> CanMessage {
    decode(raw, channel, true)
}
