#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum CanError {
    #[error("RUST-CAN - device configuration error {0}")]
    DeviceConfigError(String),
    #[error("RUST-CAN - device open failed")]
    DeviceOpenFailed,
    #[error("RUST-CAN - device is already opened")]
    DeviceAlreadyOpened,
    #[error("RUST-CAN - device is not opened")]
    DeviceNotOpened,

    #[error("RUST-CAN - invalid handle: {0}")]
    InvalidHandle(String),

    #[error("RUST-CAN - argument error: {0}")]
    ArgumentError(String),
    #[error("RUST-CAN - data length: {0} is too large")]
    DataOutOfRange(usize),

    #[error("RUST-CAN - driver error: {0}")]
    DriverError(String),

    #[error("RUST-CAN - other error: {0}")]
    OtherError(String),
}

impl CanError {
    #[inline]
    pub fn other_error<S: Into<String>>(msg: S) -> Self {
        Self::OtherError(msg.into())
    }

    #[inline]
    pub fn argument_error<S: Into<String>>(msg: S) -> Self {
        Self::ArgumentError(msg.into())
    }

    #[inline]
    pub fn driver_error<S: Into<String>>(msg: S) -> Self {
        Self::DriverError(msg.into())
    }
}
