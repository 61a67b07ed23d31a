//! **`zlgcan_rs`**, ZLG CAN/CAN-FD adapters with threaded frame subscriptions.
//!
//! ```no_run
//! use std::time::Duration;
//! use zlgcan_rs::{can::ChannelConfig, config::DriverConfig, driver::ZCanDriver, sink::EventLoop};
//!
//! # fn main() -> Result<(), rs_can::CanError> {
//! let mut event_loop = EventLoop::new();
//! let mut device = ZCanDriver::load(DriverConfig::from_env()?, event_loop.handle())?;
//! device.open(41, 0, 0)?;
//! let chl = device.init_channel(0, &ChannelConfig::classic(0x00, 0x1C))?;
//! device.start_channel(chl)?;
//! device.subscribe(chl, |frames| frames.iter().for_each(|f| println!("{}", f)))?;
//!
//! event_loop.run_for(Duration::from_secs(1));
//! device.close();
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod can;
pub mod config;
pub mod device;
pub mod driver;
pub mod registry;
pub mod sink;
pub mod utils;
mod worker;
