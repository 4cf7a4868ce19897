use rusb::{Context, Device, DeviceHandle, UsbContext};
use tracing::{debug, warn};

use crate::protocol::{self, CONFIGURATION, ID_PRODUCT, ID_VENDOR, INTERFACES};
use crate::{ClaimErrorKind, Connection, ProtocolError, Reading, Result, TransportError};

/// An opened, claimed and initialized sensor.
///
/// Dropping the sensor releases the claimed interfaces, gives the interfaces back to the kernel
/// driver if it was detached while claiming, and closes the handle. For `DeviceHandle` this also
/// drops the handle's reference to the libusb context.
pub struct Sensor<C: Connection = DeviceHandle<Context>> {
    connection: C,
    driver_detached: bool,
    claimed: Vec<u8>,
}

impl Sensor {
    /// Opens the first attached device with the sensor's vendor and product id, claims it and runs
    /// the handshake.
    pub fn open(verbose: bool) -> Result<Self> {
        let mut context = Context::new().map_err(TransportError::Init)?;
        if verbose {
            context.set_log_level(rusb::LogLevel::Info);
        }
        let handle = find_and_open(&context, ID_VENDOR, ID_PRODUCT)?;
        Sensor::setup(handle)
    }
}

impl<C: Connection> Sensor<C> {
    /// Takes ownership of an opened device, detaches the kernel driver if needed and claims the
    /// interfaces. On failure the partially claimed device is torn down before returning.
    pub fn claim(mut connection: C) -> std::result::Result<Self, TransportError> {
        let driver_detached = match connection.kernel_driver_active(INTERFACES[0]) {
            Ok(true) => {
                debug!("device busy, detaching kernel driver");
                for iface in INTERFACES {
                    if let Err(e) = connection.detach_kernel_driver(iface) {
                        warn!("failed to detach kernel driver from interface {}: {}", iface, e);
                    }
                }
                true
            }
            Ok(false) => {
                debug!("device free from kernel");
                false
            }
            Err(e) => {
                debug!("could not check kernel driver status: {}", e);
                false
            }
        };

        // from here on dropping `sensor` performs the teardown
        let mut sensor = Self {
            connection,
            driver_detached,
            claimed: Vec::with_capacity(INTERFACES.len()),
        };

        sensor
            .connection
            .set_active_configuration(CONFIGURATION)
            .map_err(|e| TransportError::Configure(e.into()))?;

        for iface in INTERFACES {
            sensor
                .connection
                .claim_interface(iface)
                .map_err(|e| TransportError::Claim {
                    interface: iface,
                    kind: e.into(),
                })?;
            debug!("claimed interface {}", iface);
            sensor.claimed.push(iface);
        }

        Ok(sensor)
    }

    /// Claims the device and runs the handshake.
    pub fn setup(connection: C) -> Result<Self> {
        let sensor = Self::claim(connection)?;
        sensor.initialize()?;
        Ok(sensor)
    }

    pub fn initialize(&self) -> std::result::Result<(), ProtocolError> {
        protocol::initialize(&self.connection)
    }

    pub fn measure(&self) -> std::result::Result<Reading, ProtocolError> {
        protocol::measure(&self.connection)
    }

    /// Tears the device down. Equivalent to dropping the sensor.
    pub fn close(self) {}
}

impl<C: Connection> Drop for Sensor<C> {
    fn drop(&mut self) {
        debug!("closing usb device");
        for iface in self.claimed.drain(..) {
            if let Err(e) = self.connection.release_interface(iface) {
                warn!("failed to release interface {}: {}", iface, e);
            }
        }
        if self.driver_detached {
            for iface in INTERFACES {
                if let Err(e) = self.connection.attach_kernel_driver(iface) {
                    warn!("failed to reattach kernel driver to interface {}: {}", iface, e);
                }
            }
        }
        // `connection` is dropped (and the device closed) after this
    }
}

/// Returns the first device matching the ids, in enumeration order. The device list is freed
/// before returning.
pub fn find_device<T: UsbContext>(
    context: &T,
    vendor_id: u16,
    product_id: u16,
) -> std::result::Result<Device<T>, TransportError> {
    let devices = context.devices().map_err(TransportError::Enumerate)?;
    select_first(devices.iter(), vendor_id, product_id, |device| {
        device
            .device_descriptor()
            .map(|d| (d.vendor_id(), d.product_id()))
            .ok()
    })
}

pub fn find_and_open<T: UsbContext>(
    context: &T,
    vendor_id: u16,
    product_id: u16,
) -> std::result::Result<DeviceHandle<T>, TransportError> {
    let device = find_device(context, vendor_id, product_id)?;
    debug!(
        "found {:04x}:{:04x} on bus {:03} device {:03}",
        vendor_id,
        product_id,
        device.bus_number(),
        device.address()
    );
    device
        .open()
        .map_err(|e| TransportError::Open(ClaimErrorKind::from(e)))
}

/// Devices whose descriptor cannot be read are skipped.
fn select_first<D>(
    devices: impl IntoIterator<Item = D>,
    vendor_id: u16,
    product_id: u16,
    ids: impl Fn(&D) -> Option<(u16, u16)>,
) -> std::result::Result<D, TransportError> {
    devices
        .into_iter()
        .find(|device| ids(device) == Some((vendor_id, product_id)))
        .ok_or(TransportError::DeviceNotFound {
            vendor_id,
            product_id,
        })
}
