use std::time::Duration;
use rs_can::Frame;
use zlgcan_rs::{
    can::{CanMessage, ChannelConfig},
    config::DriverConfig,
    device::version_string,
    driver::ZCanDriver,
    sink::EventLoop,
};

/// USBCANFD-200U
const DEVICE_TYPE: u32 = 41;

fn main() -> anyhow::Result<()> {
    let mut event_loop = EventLoop::new();
    let mut device = ZCanDriver::load(DriverConfig::from_env()?, event_loop.handle())?;
    device.open(DEVICE_TYPE, 0, 0)?;

    if let Some(info) = device.device_info()? {
        println!("{} {} firmware: {}", info.hardware_type(), info.serial_number(), version_string(info.firmware_version()));
    }

    let chl = device.init_channel(0, &ChannelConfig::classic(0x00, 0x1C))?;
    device.start_channel(chl)?;

    let data = vec![0x02, 0x10, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00];
    let msg = CanMessage::new(0x7DF, &data)
        .ok_or(anyhow::anyhow!("invalid frame"))?;
    let count = device.transmit(chl, &[msg])?;
    println!("transmitted: {}", count);

    let frames = device.receive(chl, 10, 100)?;
    frames.iter().for_each(|f| println!("{}", f));

    device.subscribe(chl, |frames| frames.iter().for_each(|f| println!("{}", f)))?;
    event_loop.run_for(Duration::from_secs(1));

    device.close();

    Ok(())
}
