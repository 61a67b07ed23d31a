pub(crate) const ZCAN_ENV: &str = "zcan.env";
pub(crate) const ZCAN_VAR: &str = "ZCAN_LIBRARY";
pub(crate) const ZCAN_POLL_INTERVAL_VAR: &str = "ZCAN_POLL_INTERVAL";
pub(crate) const ZCAN_POLL_BATCH_VAR: &str = "ZCAN_POLL_BATCH";
pub(crate) const ZCAN_PATH_DEFAULT: &str = "library";

pub(crate) const STATUS_OK: u32 = 1;
pub(crate) const STATUS_ONLINE: u32 = 2;

pub const INVALID_DEVICE_HANDLE: u64 = 0;
pub const INVALID_CHANNEL_HANDLE: u64 = 0;

/// `0x1C` with `timing0 = 0x00` gives 500kbps on SJA1000 style controllers.
pub const DEFAULT_TIMING1: u8 = 0x1C;
pub const DEFAULT_ACC_MASK: u32 = 0xFFFF_FFFF;

pub const CANFD_BRS: u8 = 0x01;  /* bit rate switch (second bitrate for payload data) */
pub const CANFD_ESI: u8 = 0x02;  /* error state indicator of the transmitting node */

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 20;
pub const DEFAULT_POLL_BATCH_SIZE: u32 = 50;
/// Upper bound of `max_count` for one receive call and of the poll batch size.
pub const MAX_RECEIVE_COUNT: u32 = 10_000;
