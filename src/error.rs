use std::path::PathBuf;

/// Why opening, configuring or claiming the device failed.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimErrorKind {
    #[error("not found")]
    NotFound,

    #[error("busy")]
    Busy,

    #[error("no device")]
    NoDevice,

    #[error("other ({0})")]
    Other(rusb::Error),
}

impl From<rusb::Error> for ClaimErrorKind {
    fn from(value: rusb::Error) -> Self {
        match value {
            rusb::Error::NotFound => ClaimErrorKind::NotFound,
            rusb::Error::Busy => ClaimErrorKind::Busy,
            rusb::Error::NoDevice => ClaimErrorKind::NoDevice,
            e => ClaimErrorKind::Other(e),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    #[error("failed to initialize libusb: {0}")]
    Init(rusb::Error),

    #[error("failed to list usb devices: {0}")]
    Enumerate(rusb::Error),

    #[error("usb device {vendor_id:04x}:{product_id:04x} not found")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    #[error("unable to open usb device: {0}")]
    Open(ClaimErrorKind),

    #[error("failed to set the configuration: {0}")]
    Configure(ClaimErrorKind),

    #[error("failed to claim interface {interface}: {kind}")]
    Claim { interface: u8, kind: ClaimErrorKind },
}

/// Why a single control or interrupt transfer failed. The wording of `Stall` depends on the
/// transfer direction so it is rendered by `ProtocolError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferErrorKind {
    Timeout,
    Stall,
    NoDevice,
    Overflow,
    Other(rusb::Error),
}

impl From<rusb::Error> for TransferErrorKind {
    fn from(value: rusb::Error) -> Self {
        match value {
            rusb::Error::Timeout => TransferErrorKind::Timeout,
            rusb::Error::Pipe => TransferErrorKind::Stall,
            rusb::Error::NoDevice => TransferErrorKind::NoDevice,
            rusb::Error::Overflow => TransferErrorKind::Overflow,
            e => TransferErrorKind::Other(e),
        }
    }
}

impl TransferErrorKind {
    fn describe(&self, stall: &'static str) -> String {
        match self {
            TransferErrorKind::Timeout => "timeout".into(),
            TransferErrorKind::Stall => stall.into(),
            TransferErrorKind::NoDevice => "device disconnected".into(),
            TransferErrorKind::Overflow => "device offered more data".into(),
            TransferErrorKind::Other(e) => format!("other ({e})"),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("failed to control transfer: {}", .0.describe("request not supported"))]
    Control(TransferErrorKind),

    #[error("failed to read interrupt transfer: {}", .0.describe("endpoint halted"))]
    Interrupt(TransferErrorKind),

    #[error("short interrupt response: got {0} of 8 bytes")]
    ShortResponse(usize),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("you also need to use the -l option if you want to daemonize the program")]
    DaemonWithoutLogFile,

    #[error("you cannot enable verbose logging if you want to daemonize the program")]
    VerboseWithDaemon,

    #[error("invalid log filter: {0}")]
    LogFilter(String),
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("failed to write {}: {source}", path.display())]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write to standard output: {0}")]
    Stdout(#[source] std::io::Error),

    #[error("fork failed: {0}")]
    Daemonize(#[source] nix::Error),

    #[error("failed to install signal handler: {0}")]
    Signal(#[source] nix::Error),
}

impl Error {
    /// Process exit status for a fatal error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Daemonize(_) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Exit status for `-h` and any malformed or inconsistent command line.
pub const USAGE_EXIT_CODE: u8 = 1;

/// Exit status after a clean shutdown triggered by `signal`, following the shell's `128 + n`.
pub fn signal_exit_code(signal: i32) -> u8 {
    u8::try_from(signal).map_or(1, |s| 128u8.saturating_add(s))
}
