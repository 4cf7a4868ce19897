use std::time::Duration;

use tracing::debug;

use crate::reading::{Reading, FRAME_LEN};
use crate::{Connection, ProtocolError};

pub const ID_VENDOR: u16 = 0x0c45;
pub const ID_PRODUCT: u16 = 0x7402;

pub(crate) const INTERFACES: [u8; 2] = [0, 1];
pub(crate) const CONFIGURATION: u8 = 1;

mod constants {
    use super::FRAME_LEN;

    // HID class request to an interface, host to device
    pub const REQUEST_TYPE: u8 = 0x21;
    pub const REQUEST_SET_REPORT: u8 = 0x09;

    pub const VALUE_INIT: u16 = 0x0201;
    pub const INDEX_INIT: u16 = 0x00;
    pub const VALUE_COMMAND: u16 = 0x0200;
    pub const INDEX_COMMAND: u16 = 0x01;

    pub const ENDPOINT_IN: u8 = 0x82;

    pub const INIT_QUESTION: [u8; 2] = [0x01, 0x01];
    pub const CMD_TEMPERATURE: [u8; FRAME_LEN] = [0x01, 0x80, 0x33, 0x01, 0x00, 0x00, 0x00, 0x00];
    pub const CMD_INIT1: [u8; FRAME_LEN] = [0x01, 0x82, 0x77, 0x01, 0x00, 0x00, 0x00, 0x00];
    pub const CMD_INIT2: [u8; FRAME_LEN] = [0x01, 0x86, 0xff, 0x01, 0x00, 0x00, 0x00, 0x00];
}
use constants::*;

// applies to both control and interrupt transfers
pub const TIMEOUT: Duration = Duration::from_secs(5);

fn send_init(dev: &impl Connection) -> Result<(), ProtocolError> {
    dev.write_control(
        REQUEST_TYPE,
        REQUEST_SET_REPORT,
        VALUE_INIT,
        INDEX_INIT,
        &INIT_QUESTION,
        TIMEOUT,
    )
    .map_err(|e| ProtocolError::Control(e.into()))?;
    debug!("sent init {:02x?}", INIT_QUESTION);
    Ok(())
}

fn send_command(dev: &impl Connection, command: &[u8; FRAME_LEN]) -> Result<(), ProtocolError> {
    dev.write_control(
        REQUEST_TYPE,
        REQUEST_SET_REPORT,
        VALUE_COMMAND,
        INDEX_COMMAND,
        command,
        TIMEOUT,
    )
    .map_err(|e| ProtocolError::Control(e.into()))?;
    debug!("sent command {:02x?}", command);
    Ok(())
}

/// Reads one interrupt response. Returns the buffer and the number of bytes actually received;
/// bytes beyond that are zero.
fn read_response(dev: &impl Connection) -> Result<([u8; FRAME_LEN], usize), ProtocolError> {
    let mut answer = [0u8; FRAME_LEN];
    let n_read = dev
        .read_interrupt(ENDPOINT_IN, &mut answer, TIMEOUT)
        .map_err(|e| ProtocolError::Interrupt(e.into()))?;
    debug!(
        "read {} bytes from endpoint address {:#x}: {:02x?}",
        n_read, ENDPOINT_IN, answer
    );
    Ok((answer, n_read))
}

/// Puts the sensor into measurement mode. The order of the steps and the exact bytes matter, the
/// sensor silently ignores measurement requests otherwise. All responses are discarded.
pub fn initialize(dev: &impl Connection) -> Result<(), ProtocolError> {
    send_init(dev)?;

    send_command(dev, &CMD_TEMPERATURE)?;
    read_response(dev)?;

    send_command(dev, &CMD_INIT1)?;
    read_response(dev)?;

    send_command(dev, &CMD_INIT2)?;
    read_response(dev)?;

    // settling read
    read_response(dev)?;

    Ok(())
}

/// Requests a single measurement and decodes the response.
pub fn measure(dev: &impl Connection) -> Result<Reading, ProtocolError> {
    send_command(dev, &CMD_TEMPERATURE)?;
    let (answer, n_read) = read_response(dev)?;
    if n_read < FRAME_LEN {
        return Err(ProtocolError::ShortResponse(n_read));
    }

    let reading = Reading::from_response(&answer);
    debug!(
        "fetched temperature {} humidity {}",
        reading.temperature_celsius, reading.relative_humidity_pct
    );
    Ok(reading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::mock::{Call, MockConnection};
    use crate::TransferErrorKind;

    const SAMPLE: [u8; FRAME_LEN] = [0x80, 0x04, 0x19, 0x24, 0x04, 0xca, 0x9c, 0xdc];

    fn command(value: u16, index: u16, data: &[u8]) -> Call {
        Call::WriteControl {
            request_type: 0x21,
            request: 0x09,
            value,
            index,
            data: data.into(),
        }
    }

    fn read() -> Call {
        Call::ReadInterrupt { endpoint: 0x82 }
    }

    fn schedule_handshake(dev: &MockConnection) {
        for _ in 0..4 {
            dev.state.schedule_read(&[0u8; FRAME_LEN]);
        }
    }

    #[test]
    fn test_handshake_sequence() {
        let dev = MockConnection::new();
        schedule_handshake(&dev);
        initialize(&dev).unwrap();

        let expected = vec![
            command(0x0201, 0x00, &[0x01, 0x01]),
            command(0x0200, 0x01, &[0x01, 0x80, 0x33, 0x01, 0x00, 0x00, 0x00, 0x00]),
            read(),
            command(0x0200, 0x01, &[0x01, 0x82, 0x77, 0x01, 0x00, 0x00, 0x00, 0x00]),
            read(),
            command(0x0200, 0x01, &[0x01, 0x86, 0xff, 0x01, 0x00, 0x00, 0x00, 0x00]),
            read(),
            read(),
        ];
        assert_eq!(dev.state.calls(), expected);
    }

    #[test]
    fn test_handshake_stops_at_first_failure() {
        let dev = MockConnection::new();
        schedule_handshake(&dev);
        dev.state.fail_transfer.set(Some((3, rusb::Error::Pipe)));

        let err = initialize(&dev).unwrap_err();
        assert_eq!(err, ProtocolError::Control(TransferErrorKind::Stall));
        // init, temperature, read, init1 (failed)
        assert_eq!(dev.state.calls().len(), 4);
    }

    #[test]
    fn test_handshake_without_answer() {
        let dev = MockConnection::new();
        let err = initialize(&dev).unwrap_err();
        assert_eq!(err, ProtocolError::Interrupt(TransferErrorKind::Timeout));
    }

    #[test]
    fn test_measure() {
        let dev = MockConnection::new();
        dev.state.schedule_read(&SAMPLE);

        let reading = measure(&dev).unwrap();
        assert!((reading.temperature_celsius - 24.66).abs() < 1e-4);
        assert!((reading.relative_humidity_pct - 40.512495).abs() < 1e-4);
        assert_eq!(
            dev.state.calls(),
            vec![
                command(0x0200, 0x01, &[0x01, 0x80, 0x33, 0x01, 0x00, 0x00, 0x00, 0x00]),
                read(),
            ]
        );
    }

    #[test]
    fn test_measure_transfer_errors() {
        for (at, usb_error, expected) in [
            (0, rusb::Error::Timeout, ProtocolError::Control(TransferErrorKind::Timeout)),
            (0, rusb::Error::NoDevice, ProtocolError::Control(TransferErrorKind::NoDevice)),
            (1, rusb::Error::Pipe, ProtocolError::Interrupt(TransferErrorKind::Stall)),
            (1, rusb::Error::Overflow, ProtocolError::Interrupt(TransferErrorKind::Overflow)),
            (
                1,
                rusb::Error::Io,
                ProtocolError::Interrupt(TransferErrorKind::Other(rusb::Error::Io)),
            ),
        ] {
            let dev = MockConnection::new();
            dev.state.schedule_read(&SAMPLE);
            dev.state.fail_transfer.set(Some((at, usb_error)));
            assert_eq!(measure(&dev).unwrap_err(), expected);
        }
    }

    #[test]
    fn test_measure_short_response() {
        for len in [0, 4, 6, 7] {
            let dev = MockConnection::new();
            dev.state.schedule_read(&SAMPLE[..len]);
            assert_eq!(measure(&dev).unwrap_err(), ProtocolError::ShortResponse(len));
        }

        let dev = MockConnection::new();
        dev.state.schedule_read(&SAMPLE);
        assert!(measure(&dev).is_ok());
    }
}
