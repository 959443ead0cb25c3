//! Implement the Co2 monitor communication for a PC using the `hidapi` crate.
use std::time::Duration;

use hidapi::{HidApi, HidDevice};
use log::{debug, info};

use crate::REPORT_LEN;
use crate::device::{Co2MonitorCommunication, MonitorError};

/// This struct holds the `HidDevice` from hidapi crate, that is needed for communication. `None` once closed.
pub struct HidSession {
    device: Option<HidDevice>,
}

impl Co2MonitorCommunication for HidSession {
    fn open() -> Result<Self, MonitorError> {
        let api = HidApi::new().map_err(|e| MonitorError::DeviceOpen(e.to_string()))?;
        let (vid, pid) = (Self::vid(), Self::pid());

        if !api
            .device_list()
            .any(|info| info.vendor_id() == vid && info.product_id() == pid)
        {
            return Err(MonitorError::DeviceNotFound { vid, pid });
        }

        let device = api
            .open(vid, pid)
            .map_err(|e| MonitorError::DeviceOpen(e.to_string()))?;

        // This tells the monitor to actually start sending data over HID.
        device
            .send_feature_report(Self::feature_report())
            .map_err(|e| MonitorError::DeviceOpen(format!("could not send feature report: {e}")))?;

        match device.get_product_string() {
            Ok(Some(product)) => info!("opened {product} ({vid:04x}:{pid:04x})"),
            _ => info!("opened CO2 monitor {vid:04x}:{pid:04x}"),
        }

        Ok(Self {
            device: Some(device),
        })
    }

    fn read(
        &mut self,
        read_buffer: &mut [u8; REPORT_LEN],
        timeout: Duration,
    ) -> Result<usize, MonitorError> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| MonitorError::ReadFailed("device is closed".to_owned()))?;
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        device
            .read_timeout(read_buffer, timeout_ms)
            .map_err(|e| MonitorError::ReadFailed(e.to_string()))
    }

    fn close(&mut self) {
        // Dropping the HidDevice closes it.
        if self.device.take().is_some() {
            debug!("HID device closed");
        }
    }
}

impl Drop for HidSession {
    fn drop(&mut self) {
        self.close();
    }
}
