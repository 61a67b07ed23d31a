use std::ffi::{c_char, CStr, CString};
use rs_can::CanError;

#[inline]
pub fn c_str_to_string(src: *const c_char) -> Result<String, CanError> {
    if src.is_null() {
        Err(CanError::DriverError("null pointer".to_string()))
    } else {
        let c_str = unsafe { CStr::from_ptr(src) };
        let s_slice = c_str.to_str().map_err(|e| CanError::OtherError(e.to_string()))?;
        let value = String::from(s_slice);

        Ok(value)
    }
}

#[inline]
pub fn string_to_c_str(src: &str) -> Result<CString, CanError> {
    CString::new(src).map_err(|e| CanError::ArgumentError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{c_str_to_string, string_to_c_str};

    #[test]
    fn c_strings() -> anyhow::Result<()> {
        let value = string_to_c_str("info/channel/channel_0/baud_rate")?;
        assert_eq!(c_str_to_string(value.as_ptr())?, "info/channel/channel_0/baud_rate");
        assert!(c_str_to_string(std::ptr::null()).is_err());
        assert!(string_to_c_str("a\0b").is_err());

        Ok(())
    }
}
