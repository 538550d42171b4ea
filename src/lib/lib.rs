//! Driver for the LPB40B laser rangefinder serial protocol.
//!
//! Every exchange with the sensor is an 8-byte frame:
//! `0x55 | command | arg[4] | crc8 | 0xAA`. The [`protocol`] module builds and
//! checks those frames, [`Session`] drives request/response exchanges over any
//! [`Channel`].

pub mod channel;
pub mod config;
pub mod error;
pub mod mock;
pub mod port;
pub mod protocol;
pub mod session;

pub use channel::Channel;
pub use config::SessionConfig;
pub use error::{ProtocolError, Result};
pub use protocol::command::{Command, CommandId, DataFormat, MeasurementMode};
pub use protocol::response::{DeviceInfo, FirmwareVersion, MeasurementResult};
pub use protocol::{Frame, Payload};
pub use session::Session;
