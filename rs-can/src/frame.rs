use std::fmt::{Display, Formatter, Write};
use crate::constant::{EFF_MASK, SFF_MASK};

/// CAN direct define
#[repr(C)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Direct {
    #[default]
    Transmit,
    Receive,
}

/// CAN-Id define
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Id {
    Standard(u16),
    Extended(u32),
}

impl From<u32> for Id {
    #[inline]
    fn from(value: u32) -> Self {
        Self::from_bits(value, false)
    }
}

impl From<Id> for u32 {
    #[inline]
    fn from(id: Id) -> Self {
        id.into_bits()
    }
}

impl Id {
    #[inline]
    pub fn from_bits(bits: u32, extended: bool) -> Self {
        let bits = bits & EFF_MASK;
        if extended {
            Self::Extended(bits)
        } else if bits & (!SFF_MASK & EFF_MASK) > 0 {
            Self::Extended(bits)
        } else {
            Self::Standard(bits as u16)
        }
    }

    #[inline]
    pub fn into_bits(self) -> u32 {
        match self {
            Self::Standard(v) => v as u32,
            Self::Extended(v) => v,
        }
    }

    /// Returns this CAN Identifier as a raw 32-bit integer.
    #[inline]
    #[must_use]
    pub fn as_raw(self) -> u32 {
        self.into_bits()
    }

    #[inline]
    pub fn is_extended(&self) -> bool {
        matches!(self, Self::Extended(_))
    }
}

pub trait Frame {
    type Channel: Display;

    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self>
    where
        Self: Sized;

    fn new_remote(id: impl Into<Id>, len: usize) -> Option<Self>
    where
        Self: Sized;

    fn timestamp(&self) -> u64;

    fn set_timestamp(&mut self, value: Option<u64>) -> &mut Self
    where
        Self: Sized;

    fn id(&self) -> Id;

    fn is_can_fd(&self) -> bool;

    fn set_can_fd(&mut self, value: bool) -> &mut Self
    where
        Self: Sized;

    fn is_remote(&self) -> bool;

    fn is_extended(&self) -> bool;

    fn direct(&self) -> Direct;

    fn set_direct(&mut self, direct: Direct) -> &mut Self
    where
        Self: Sized;

    fn is_bitrate_switch(&self) -> bool;

    fn set_bitrate_switch(&mut self, value: bool) -> &mut Self
    where
        Self: Sized;

    fn is_error_frame(&self) -> bool;

    fn set_error_frame(&mut self, value: bool) -> &mut Self
    where
        Self: Sized;

    /// Error state indicator
    fn is_esi(&self) -> bool;

    /// Set error state indicator
    fn set_esi(&mut self, value: bool) -> &mut Self
    where
        Self: Sized;

    fn channel(&self) -> Self::Channel;

    fn set_channel(&mut self, value: Self::Channel) -> &mut Self
    where
        Self: Sized;

    /// ensure return the actual length of data.
    fn data(&self) -> &[u8];

    fn dlc(&self) -> Option<usize>;

    fn length(&self) -> usize;
}

impl<T: Display> Display for dyn Frame<Channel = T> {
    /// Output Frame as `asc` String.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let data_str = if self.is_remote() {
            " ".to_owned()
        } else {
            self.data().iter().fold(String::new(), |mut out, &b| {
                let _ = write!(out, "{b:02x} ");
                out
            })
        };

        if self.is_can_fd() {
            let mut flags = 1 << 12;
            if self.is_bitrate_switch() {
                flags |= 1 << 13;
            }
            if self.is_esi() {
                flags |= 1 << 14;
            }
            write!(
                f,
                "{:.3} CANFD {} {} {: >8x} {} {} {: >2} {: >2} {} {: >8} {: <4} {: >8x} {: >8} {: >8} {: >8} {: >8} {: >8}",
                self.timestamp() as f64 / 1000.,
                self.channel(),
                direct(self.direct()),
                self.id().into_bits(),
                if self.is_bitrate_switch() { 1 } else { 0 },
                if self.is_esi() { 1 } else { 0 },
                self.dlc().unwrap_or_default(),
                self.length(),
                data_str,
                0,  // message_duration
                0,  // message_length
                flags,
                0,  // crc
                0,  // bit_timing_conf_arb
                0,  // bit_timing_conf_data
                0,  // bit_timing_conf_ext_arb
                0,  // bit_timing_conf_ext_data
            )
        } else {
            write!(
                f,
                "{:.3} {} {: >8x}{: <4} {} {} {: >2} {}",
                self.timestamp() as f64 / 1000.,
                self.channel(),
                self.id().into_bits(),
                if self.is_extended() { "x" } else { "" },
                direct(self.direct()),
                if self.is_remote() { "r" } else { "d" },
                self.length(),
                data_str,
            )
        }
    }
}

#[inline]
fn direct<'a>(direct: Direct) -> &'a str {
    match direct {
        Direct::Transmit => "Tx",
        Direct::Receive => "Rx",
    }
}
