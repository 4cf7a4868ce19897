#![deny(unconditional_recursion)]

mod connection;
mod error;
mod protocol;
mod reading;
mod sensor;

pub mod config;
pub mod daemon;
pub mod logging;
pub mod monitor;
pub mod output;


pub use connection::Connection;
pub use error::*;
pub use protocol::{initialize, measure, ID_PRODUCT, ID_VENDOR, TIMEOUT};
pub use reading::*;
pub use sensor::*;
pub use rusb;
