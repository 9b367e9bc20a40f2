/// DeviceContext - owns the graphics device and the CPU-side fence counter

use crate::error::{Error, Result};
use crate::graphics_device::{CommandList, GraphicsDevice};
use crate::{engine_debug, engine_error, engine_info};

/// Graphics device plus the last fence value this context signaled
///
/// The fence value starts at 0 and only moves through `flush()`, which
/// increments it by exactly one per call.
pub struct DeviceContext {
    device: Box<dyn GraphicsDevice>,
    fence_value: u64,
}

impl DeviceContext {
    /// Wrap a freshly created device (its command list must be closed)
    pub fn new(device: Box<dyn GraphicsDevice>) -> Self {
        engine_info!("clearframe::DeviceContext", "Using adapter: {}", device.adapter_name());
        Self {
            device,
            fence_value: 0,
        }
    }

    pub fn device(&mut self) -> &mut dyn GraphicsDevice {
        self.device.as_mut()
    }

    pub fn command_list(&mut self) -> &mut dyn CommandList {
        self.device.command_list()
    }

    /// Last value passed to `signal`
    pub fn fence_value(&self) -> u64 {
        self.fence_value
    }

    /// Reset the command allocator and list for a new recording
    ///
    /// Callers flush before resetting, so the allocator is never reset while
    /// the GPU still reads from it.
    pub fn reset_command_list(&mut self) -> Result<()> {
        self.device.command_list().reset()
    }

    /// Close the command list and submit it to the direct queue
    pub fn submit(&mut self) -> Result<()> {
        self.device.command_list().close()?;
        self.device.execute_command_list()
    }

    /// Signal the next fence value and block until the GPU reaches it
    pub fn flush(&mut self) -> Result<()> {
        let value = self.fence_value + 1;
        self.device.signal(value)?;
        self.fence_value = value;

        if self.device.completed_value()? < value {
            self.device.wait_for_value(value)?;
        }

        let completed = self.device.completed_value()?;
        if completed < value {
            engine_error!(
                "clearframe::DeviceContext",
                "Fence wait returned early: completed {} < awaited {}",
                completed, value
            );
            return Err(Error::InvalidState(format!(
                "fence wait returned before value {} was reached (completed {})",
                value, completed
            )));
        }

        engine_debug!("clearframe::DeviceContext", "Flushed to fence value {}", value);
        Ok(())
    }

    /// `submit()` followed by a full `flush()`
    pub fn submit_and_flush(&mut self) -> Result<()> {
        self.submit()?;
        self.flush()
    }
}

#[cfg(test)]
#[path = "device_context_tests.rs"]
mod tests;
