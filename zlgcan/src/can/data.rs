use std::ffi::{c_uchar, c_ushort};
use derive_getters::Getters;
use rs_can::{CanError, CANFD_FRAME_MAX_SIZE, CAN_FRAME_MAX_SIZE, Direct};
use crate::can::{CanMessage, ZCanTxMode, constant::{CANFD_BRS, CANFD_ESI}};
use super::frame::{pack_id, unpack_id};

const DATA_SIZE: usize = 92;

// ZCANCANFDData
const FD_TIMESTAMP: usize = 0;
const FD_FLAG: usize = 8;
const FD_CAN_ID: usize = 16;
const FD_LEN: usize = 20;
const FD_FLAGS: usize = 21;
const FD_DATA: usize = 24;

// ZCANCANFDData::flag
const FLAG_FRAME_TYPE_MASK: u32 = 0x03;
const FLAG_TRANSMIT_TYPE_SHIFT: u32 = 4;
const FLAG_TRANSMIT_TYPE_MASK: u32 = 0x0F;
const FLAG_TX_ECHO_REQUEST: u32 = 1 << 8;
const FLAG_TX_ECHOED: u32 = 1 << 9;

/// The payload kind of a [`ZCanDataObj`].
#[repr(C)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ZCanDataType {
    CanFd = 1,
    Error = 2,
    Gps = 3,
    Lin = 4,
    BusUsage = 5,
}

impl TryFrom<u8> for ZCanDataType {
    type Error = CanError;
    fn try_from(value: u8) -> Result<Self, CanError> {
        match value {
            1 => Ok(ZCanDataType::CanFd),
            2 => Ok(ZCanDataType::Error),
            3 => Ok(ZCanDataType::Gps),
            4 => Ok(ZCanDataType::Lin),
            5 => Ok(ZCanDataType::BusUsage),
            v => Err(CanError::ArgumentError(format!("data type: {} not supported", v))),
        }
    }
}

/// `ZCANDataObj`, the merged record of `ZCAN_TransmitData`/`ZCAN_ReceiveData`.
#[repr(C)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ZCanDataObj {
    pub(crate) data_type: c_uchar,
    pub(crate) chnl: c_uchar,
    pub(crate) flag: c_ushort,
    pub(crate) extra_data: [c_uchar; 4],
    pub(crate) data: [c_uchar; DATA_SIZE],
}

impl Default for ZCanDataObj {
    fn default() -> Self {
        Self {
            data_type: 0,
            chnl: 0,
            flag: 0,
            extra_data: [0; 4],
            data: [0; DATA_SIZE],
        }
    }
}

impl ZCanDataObj {
    #[inline]
    pub fn data_type(&self) -> u8 {
        self.data_type
    }

    #[inline]
    pub fn channel(&self) -> u8 {
        self.chnl
    }

    /// The raw payload union.
    #[inline]
    pub fn payload(&self) -> &[u8; DATA_SIZE] {
        &self.data
    }

    /// Build an error record the way the driver fills it.
    pub fn error(channel: u8, err: &ZCanErrorData) -> Self {
        let mut obj = Self { data_type: ZCanDataType::Error as u8, chnl: channel, ..Default::default() };
        obj.put_u64(0, err.timestamp);
        obj.data[8..14].copy_from_slice(&[
            err.err_type, err.err_sub_type, err.node_state, err.rx_err_count, err.tx_err_count, err.err_data,
        ]);

        obj
    }

    /// Build a bus usage record the way the driver fills it.
    pub fn bus_usage(usage: &ZCanBusUsage) -> Self {
        let mut obj = Self { data_type: ZCanDataType::BusUsage as u8, chnl: usage.channel, ..Default::default() };
        obj.put_u64(0, usage.timestamp_begin);
        obj.put_u64(8, usage.timestamp_end);
        obj.data[16] = usage.channel;
        obj.data[18..20].copy_from_slice(&usage.bus_usage.to_le_bytes());
        obj.data[20..24].copy_from_slice(&usage.frame_count.to_le_bytes());

        obj
    }

    /// Build a raw record of any other kind.
    pub fn other(data_type: u8, channel: u8, payload: &[u8]) -> Self {
        let mut obj = Self { data_type, chnl: channel, ..Default::default() };
        let size = payload.len().min(DATA_SIZE);
        obj.data[..size].copy_from_slice(&payload[..size]);

        obj
    }

    /// Mark a frame record as the driver's echo of a transmitted frame.
    pub fn set_echoed(&mut self) -> &mut Self {
        let flag = self.get_u32(FD_FLAG) | FLAG_TX_ECHOED;
        self.put_u32(FD_FLAG, flag);
        self
    }

    /// The `ZCANCANFDData::flag` word of a frame record.
    #[inline]
    pub fn frame_flag(&self) -> u32 {
        self.get_u32(FD_FLAG)
    }

    #[inline]
    fn get_u32(&self, offset: usize) -> u32 {
        let mut buf = [0; 4];
        buf.copy_from_slice(&self.data[offset..offset + 4]);
        u32::from_le_bytes(buf)
    }

    #[inline]
    fn get_u64(&self, offset: usize) -> u64 {
        let mut buf = [0; 8];
        buf.copy_from_slice(&self.data[offset..offset + 8]);
        u64::from_le_bytes(buf)
    }

    #[inline]
    fn put_u32(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    #[inline]
    fn put_u64(&mut self, offset: usize, value: u64) {
        self.data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }
}

/// `ZCANErrorData`
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Getters)]
pub struct ZCanErrorData {
    #[getter(copy)]
    pub(crate) timestamp: u64,
    #[getter(copy)]
    pub(crate) err_type: u8,
    #[getter(copy)]
    pub(crate) err_sub_type: u8,
    #[getter(copy)]
    pub(crate) node_state: u8,
    #[getter(copy)]
    pub(crate) rx_err_count: u8,
    #[getter(copy)]
    pub(crate) tx_err_count: u8,
    #[getter(copy)]
    pub(crate) err_data: u8,
}

impl ZCanErrorData {
    #[inline]
    pub fn new(timestamp: u64, err_type: u8, err_sub_type: u8, node_state: u8, rx_err_count: u8, tx_err_count: u8, err_data: u8) -> Self {
        Self { timestamp, err_type, err_sub_type, node_state, rx_err_count, tx_err_count, err_data }
    }
}

/// `BusUsage`, `bus_usage` is in hundredths of a percent.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Getters)]
pub struct ZCanBusUsage {
    #[getter(copy)]
    pub(crate) timestamp_begin: u64,
    #[getter(copy)]
    pub(crate) timestamp_end: u64,
    #[getter(copy)]
    pub(crate) channel: u8,
    #[getter(copy)]
    pub(crate) bus_usage: u16,
    #[getter(copy)]
    pub(crate) frame_count: u32,
}

impl ZCanBusUsage {
    #[inline]
    pub fn new(timestamp_begin: u64, timestamp_end: u64, channel: u8, bus_usage: u16, frame_count: u32) -> Self {
        Self { timestamp_begin, timestamp_end, channel, bus_usage, frame_count }
    }
}

/// A decoded [`ZCanDataObj`].
#[derive(Debug, Clone)]
pub enum ZCanData {
    Frame(CanMessage),
    Error { channel: u8, error: ZCanErrorData },
    BusUsage(ZCanBusUsage),
    /// GPS, LIN and every kind not decoded here.
    Other { data_type: u8, channel: u8 },
}

/// CAN or CAN-FD frame to a `ZCAN_DT_ZCAN_CAN_CANFD_DATA` record on `msg.channel()`.
pub fn encode_data(msg: &CanMessage) -> Result<ZCanDataObj, CanError> {
    let max = if msg.is_fd { CANFD_FRAME_MAX_SIZE } else { CAN_FRAME_MAX_SIZE };
    if msg.length > max {
        return Err(CanError::ArgumentError(
            format!("frame length: {} is out of range 0..={}", msg.length, max)
        ));
    }

    let mut obj = ZCanDataObj { data_type: ZCanDataType::CanFd as u8, chnl: msg.channel, ..Default::default() };
    let mut flag = (msg.tx_mode as u32 & FLAG_TRANSMIT_TYPE_MASK) << FLAG_TRANSMIT_TYPE_SHIFT;
    if msg.is_fd {
        flag |= 1;
    }
    if matches!(msg.tx_mode, ZCanTxMode::SelfReception | ZCanTxMode::SelfReceptionOnce) {
        flag |= FLAG_TX_ECHO_REQUEST;
    }
    obj.put_u32(FD_FLAG, flag);
    obj.put_u32(FD_CAN_ID, pack_id(msg));
    obj.data[FD_LEN] = msg.length as u8;
    if msg.is_fd {
        if msg.bitrate_switch {
            obj.data[FD_FLAGS] |= CANFD_BRS;
        }
        if msg.error_state_indicator {
            obj.data[FD_FLAGS] |= CANFD_ESI;
        }
    }
    let size = msg.data.len().min(msg.length);
    obj.data[FD_DATA..FD_DATA + size].copy_from_slice(&msg.data[..size]);

    Ok(obj)
}

/// Decode by `data_type`; frame lengths are clamped to their format.
pub fn decode_data(obj: &ZCanDataObj) -> ZCanData {
    match ZCanDataType::try_from(obj.data_type) {
        Ok(ZCanDataType::CanFd) => ZCanData::Frame(decode_frame(obj)),
        Ok(ZCanDataType::Error) => ZCanData::Error {
            channel: obj.chnl,
            error: ZCanErrorData {
                timestamp: obj.get_u64(0),
                err_type: obj.data[8],
                err_sub_type: obj.data[9],
                node_state: obj.data[10],
                rx_err_count: obj.data[11],
                tx_err_count: obj.data[12],
                err_data: obj.data[13],
            },
        },
        Ok(ZCanDataType::BusUsage) => ZCanData::BusUsage(ZCanBusUsage {
            timestamp_begin: obj.get_u64(0),
            timestamp_end: obj.get_u64(8),
            channel: obj.data[16],
            bus_usage: u16::from_le_bytes([obj.data[18], obj.data[19]]),
            frame_count: obj.get_u32(20),
        }),
        _ => ZCanData::Other { data_type: obj.data_type, channel: obj.chnl },
    }
}

fn decode_frame(obj: &ZCanDataObj) -> CanMessage {
    let flag = obj.get_u32(FD_FLAG);
    let is_fd = flag & FLAG_FRAME_TYPE_MASK == 1;
    let max = if is_fd { CANFD_FRAME_MAX_SIZE } else { CAN_FRAME_MAX_SIZE };
    let length = (obj.data[FD_LEN] as usize).min(max);
    let flags = obj.data[FD_FLAGS];
    let mut msg = CanMessage {
        timestamp: obj.get_u64(FD_TIMESTAMP),
        arbitration_id: 0,
        is_extended_id: false,
        is_remote_frame: false,
        is_error_frame: false,
        channel: obj.chnl,
        length,
        data: obj.data[FD_DATA..FD_DATA + length].to_vec(),
        is_fd,
        direct: if flag & FLAG_TX_ECHOED > 0 { Direct::Transmit } else { Direct::Receive },
        bitrate_switch: is_fd && (flags & CANFD_BRS) > 0,
        error_state_indicator: is_fd && (flags & CANFD_ESI) > 0,
        tx_mode: ZCanTxMode::default(),
    };
    unpack_id(obj.get_u32(FD_CAN_ID), &mut msg);

    msg
}

#[cfg(test)]
mod tests {
    use std::mem::size_of;
    use rs_can::{Direct, Frame, Id};
    use crate::can::{CanMessage, ZCanTxMode, CANFD_BRS};
    use super::{decode_data, encode_data, ZCanBusUsage, ZCanData, ZCanDataObj, ZCanDataType, ZCanErrorData};

    #[test]
    fn layout() {
        assert_eq!(size_of::<ZCanDataObj>(), 100);
    }

    #[test]
    fn encode_fd_frame() -> anyhow::Result<()> {
        let mut msg = CanMessage::new_fd(Id::Extended(0x18DA_F110), &[0xAA; 12]).unwrap();
        msg.set_channel(1)
            .set_bitrate_switch(true);
        msg.set_tx_mode(ZCanTxMode::SelfReception);
        let obj = encode_data(&msg)?;
        assert_eq!(obj.data_type(), ZCanDataType::CanFd as u8);
        assert_eq!(obj.channel(), 1);
        // frameType CANFD, transmitType 2, txEchoRequest
        assert_eq!(obj.frame_flag(), 0x01 | 0x20 | 0x100);
        assert_eq!(&obj.payload()[16..20], &(0x8000_0000u32 | 0x18DA_F110).to_le_bytes());
        assert_eq!(obj.payload()[20], 12);
        assert_eq!(obj.payload()[21], CANFD_BRS);
        assert!(obj.payload()[24..36].iter().all(|&b| b == 0xAA));
        assert!(obj.payload()[36..].iter().all(|&b| b == 0x00));

        Ok(())
    }

    #[test]
    fn encode_classic_frame() -> anyhow::Result<()> {
        let msg = CanMessage::new(0x7DF, &[0x02, 0x10, 0x01]).unwrap();
        let obj = encode_data(&msg)?;
        assert_eq!(obj.frame_flag(), 0);
        assert_eq!(obj.payload()[21], 0);

        let mut msg = CanMessage::new(0x7DF, &[0x00; 12]).unwrap();
        msg.is_fd = false;
        assert!(encode_data(&msg).is_err());

        Ok(())
    }

    #[test]
    fn decode_frame_record() -> anyhow::Result<()> {
        let data: Vec<u8> = (0..64).collect();
        let mut msg = CanMessage::new_fd(0x123, &data).unwrap();
        msg.set_channel(2);
        let mut obj = encode_data(&msg)?;
        obj.set_echoed();

        match decode_data(&obj) {
            ZCanData::Frame(frame) => {
                assert_eq!(frame.id(), Id::Standard(0x123));
                assert_eq!(frame.channel(), 2);
                assert_eq!(frame.data(), data.as_slice());
                assert!(frame.is_can_fd());
                assert_eq!(frame.direct(), Direct::Transmit);
            },
            other => panic!("unexpected {:?}", other),
        }

        Ok(())
    }

    #[test]
    fn decode_clamps_classic_length() -> anyhow::Result<()> {
        let msg = CanMessage::new(0x10, &[0x11; 8]).unwrap();
        let mut obj = encode_data(&msg)?;
        obj.data[20] = 15;

        match decode_data(&obj) {
            ZCanData::Frame(frame) => {
                assert_eq!(frame.data(), &[0x11; 8]);
                assert_eq!(frame.direct(), Direct::Receive);
                assert!(!frame.is_can_fd());
            },
            other => panic!("unexpected {:?}", other),
        }

        Ok(())
    }

    #[test]
    fn decode_error_and_bus_usage() {
        let err = ZCanErrorData::new(1000, 1, 2, 3, 96, 128, 0x55);
        match decode_data(&ZCanDataObj::error(1, &err)) {
            ZCanData::Error { channel, error } => {
                assert_eq!(channel, 1);
                assert_eq!(error, err);
            },
            other => panic!("unexpected {:?}", other),
        }

        let usage = ZCanBusUsage::new(100, 1100, 0, 2550, 321);
        match decode_data(&ZCanDataObj::bus_usage(&usage)) {
            ZCanData::BusUsage(v) => assert_eq!(v, usage),
            other => panic!("unexpected {:?}", other),
        }

        let obj = ZCanDataObj::other(ZCanDataType::Lin as u8, 3, &[0x01; 8]);
        assert!(matches!(decode_data(&obj), ZCanData::Other { data_type: 4, channel: 3 }));
        assert!(matches!(decode_data(&ZCanDataObj::default()), ZCanData::Other { data_type: 0, channel: 0 }));
    }
}
