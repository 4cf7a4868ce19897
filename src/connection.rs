use std::time::Duration;

use rusb::{DeviceHandle, UsbContext};

/// Trait used in `crate::protocol` and `crate::sensor` to talk to the USB device. Covers the
/// control writes and interrupt reads of the sensor protocol plus the interface bookkeeping done
/// when claiming and releasing the device. Implemented for `rusb::DeviceHandle` and replaced with
/// `MockConnection` for testing.
pub trait Connection {
    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &[u8],
        timeout: Duration,
    ) -> rusb::Result<usize>;

    fn read_interrupt(&self, endpoint: u8, buf: &mut [u8], timeout: Duration)
        -> rusb::Result<usize>;

    fn kernel_driver_active(&self, iface: u8) -> rusb::Result<bool>;

    fn detach_kernel_driver(&mut self, iface: u8) -> rusb::Result<()>;

    fn attach_kernel_driver(&mut self, iface: u8) -> rusb::Result<()>;

    fn set_active_configuration(&mut self, config: u8) -> rusb::Result<()>;

    fn claim_interface(&mut self, iface: u8) -> rusb::Result<()>;

    fn release_interface(&mut self, iface: u8) -> rusb::Result<()>;
}

// Calls go through the inherent methods by path. rusb takes `&self` where this trait takes
// `&mut self`, so `self.claim_interface(..)` would resolve to the trait method again.
impl<T: UsbContext> Connection for DeviceHandle<T> {
    #[inline]
    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &[u8],
        timeout: Duration,
    ) -> rusb::Result<usize> {
        DeviceHandle::write_control(self, request_type, request, value, index, buf, timeout)
    }

    #[inline]
    fn read_interrupt(
        &self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> rusb::Result<usize> {
        DeviceHandle::read_interrupt(self, endpoint, buf, timeout)
    }

    #[inline]
    fn kernel_driver_active(&self, iface: u8) -> rusb::Result<bool> {
        DeviceHandle::kernel_driver_active(self, iface)
    }

    #[inline]
    fn detach_kernel_driver(&mut self, iface: u8) -> rusb::Result<()> {
        DeviceHandle::detach_kernel_driver(self, iface)
    }

    #[inline]
    fn attach_kernel_driver(&mut self, iface: u8) -> rusb::Result<()> {
        DeviceHandle::attach_kernel_driver(self, iface)
    }

    #[inline]
    fn set_active_configuration(&mut self, config: u8) -> rusb::Result<()> {
        DeviceHandle::set_active_configuration(self, config)
    }

    #[inline]
    fn claim_interface(&mut self, iface: u8) -> rusb::Result<()> {
        DeviceHandle::claim_interface(self, iface)
    }

    #[inline]
    fn release_interface(&mut self, iface: u8) -> rusb::Result<()> {
        DeviceHandle::release_interface(self, iface)
    }
}

#[allow(dead_code)]
const fn assert_impl_connection<C: Connection>() {}
const _: () = assert_impl_connection::<DeviceHandle<rusb::Context>>();
