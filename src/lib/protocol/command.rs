use std::{fmt::Display, str::FromStr};

use num_derive::{FromPrimitive, ToPrimitive};
use thiserror::Error;

use super::{encode_frame, Frame, Payload};
use crate::error::{ProtocolError, Result};

/// Message type, always the first payload byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum CommandId {
    GetDeviceInfo = 0x01,
    ObtainTemperature = 0x02,
    SetMeasurementFrequency = 0x03,
    SetDataFormat = 0x04,
    StartMeasurement = 0x05,
    StopMeasurement = 0x06,
    MeasurementData = 0x07,
    SaveSettings = 0x08,
    GetSerialNumber = 0x0A,
    SetMeasurementMode = 0x0D,
    HighSpeedData = 0x0E,
    ConfigureAddress = 0x11,
    SetBaudRate = 0x12,
}

/// Highest frequency accepted by [`Command::SetMeasurementFrequency`].
///
/// Taken from the 500 Hz driver variant: above it the sensor switches to
/// high-speed `0x0E` frames, which this driver does not decode.
pub const MAX_MEASUREMENT_FREQUENCY: u32 = 500;
pub const MIN_MEASUREMENT_FREQUENCY: u32 = 1;

/// Baud rate to selector byte. 0 selects automatic baud detection.
pub static BAUD_RATES: &[(u32, u8)] = &[
    (0, 0x00),
    (300, 0x01),
    (600, 0x02),
    (1200, 0x03),
    (2400, 0x04),
    (4800, 0x05),
    (9600, 0x06),
    (14400, 0x07),
    (19200, 0x08),
    (38400, 0x09),
    (56000, 0x0A),
    (57600, 0x0B),
    (115200, 0x0C),
    (230400, 0x0D),
    (256000, 0x0E),
    (460800, 0x0F),
    (921600, 0x10),
];

pub fn baud_rate_code(rate: u32) -> Option<u8> {
    BAUD_RATES
        .iter()
        .find(|(baud, _)| *baud == rate)
        .map(|&(_, code)| code)
}

#[derive(Error, Debug)]
pub enum ParseSettingError {
    #[error("invalid measurement mode '{0}'")]
    BadMode(String),
    #[error("invalid data format '{0}'")]
    BadFormat(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum MeasurementMode {
    /// Measures continuously as soon as the sensor powers up.
    ContinuousPowerOn = 0x00,
    /// One measurement per start command.
    Single = 0x01,
    /// Continuous, but idle until a start command arrives.
    ContinuousStopped = 0x02,
}

impl Display for MeasurementMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeasurementMode::ContinuousPowerOn => "continuous".fmt(f),
            MeasurementMode::Single => "single".fmt(f),
            MeasurementMode::ContinuousStopped => "continuous-stopped".fmt(f),
        }
    }
}

impl FromStr for MeasurementMode {
    type Err = ParseSettingError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "continuous" => Ok(MeasurementMode::ContinuousPowerOn),
            "single" => Ok(MeasurementMode::Single),
            "continuous-stopped" => Ok(MeasurementMode::ContinuousStopped),
            _ => Err(ParseSettingError::BadMode(input.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u8)]
pub enum DataFormat {
    Byte = 0x01,
    Pixhawk = 0x02,
}

impl Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataFormat::Byte => "byte".fmt(f),
            DataFormat::Pixhawk => "pixhawk".fmt(f),
        }
    }
}

impl FromStr for DataFormat {
    type Err = ParseSettingError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "byte" => Ok(DataFormat::Byte),
            "pixhawk" => Ok(DataFormat::Pixhawk),
            _ => Err(ParseSettingError::BadFormat(input.to_string())),
        }
    }
}

/// Host to sensor commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    GetDeviceInfo,
    /// Documented by the manual, but the sensor has never been seen to answer it.
    ObtainTemperature,
    SetMeasurementFrequency(u32),
    SetDataFormat(DataFormat),
    StartMeasurement,
    StopMeasurement,
    SaveSettings,
    SetMeasurementMode(MeasurementMode),
    SetBaudRate(u32),
}

impl Command {
    pub fn id(&self) -> CommandId {
        match self {
            Command::GetDeviceInfo => CommandId::GetDeviceInfo,
            Command::ObtainTemperature => CommandId::ObtainTemperature,
            Command::SetMeasurementFrequency(_) => CommandId::SetMeasurementFrequency,
            Command::SetDataFormat(_) => CommandId::SetDataFormat,
            Command::StartMeasurement => CommandId::StartMeasurement,
            Command::StopMeasurement => CommandId::StopMeasurement,
            Command::SaveSettings => CommandId::SaveSettings,
            Command::SetMeasurementMode(_) => CommandId::SetMeasurementMode,
            Command::SetBaudRate(_) => CommandId::SetBaudRate,
        }
    }

    /// Argument bytes, big-endian. Fails on parameters the sensor can't take.
    pub fn argument(&self) -> Result<[u8; 4]> {
        match *self {
            Command::SetMeasurementFrequency(hz) => {
                if !(MIN_MEASUREMENT_FREQUENCY..=MAX_MEASUREMENT_FREQUENCY).contains(&hz) {
                    return Err(ProtocolError::OutOfRange(hz));
                }
                Ok(hz.to_be_bytes())
            }
            Command::SetDataFormat(format) => Ok([0, 0, 0, format as u8]),
            Command::SetMeasurementMode(mode) => Ok([0, 0, 0, mode as u8]),
            Command::SetBaudRate(rate) => baud_rate_code(rate)
                .map(|code| [0, 0, 0, code])
                .ok_or(ProtocolError::UnsupportedBaudRate(rate)),
            _ => Ok([0; 4]),
        }
    }

    pub fn payload(&self) -> Result<Payload> {
        let arg = self.argument()?;
        Ok([self.id() as u8, arg[0], arg[1], arg[2], arg[3]])
    }

    pub fn frame(&self) -> Result<Frame> {
        Ok(encode_frame(&self.payload()?))
    }

    /// Number of frames the sensor sends back in single measurement mode.
    pub fn response_frames(&self) -> usize {
        match self {
            Command::GetDeviceInfo => 2,
            Command::StartMeasurement => 1,
            _ => 0,
        }
    }

    /// Command id carried by the frames answering this command.
    pub fn response_id(&self) -> CommandId {
        match self {
            Command::StartMeasurement => CommandId::MeasurementData,
            other => other.id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;

    #[test]
    fn mode_and_format_frames() {
        let cases = [
            (
                Command::SetMeasurementMode(MeasurementMode::ContinuousPowerOn),
                [0x55, 0x0D, 0x00, 0x00, 0x00, 0x00, 0xF2, 0xAA],
            ),
            (
                Command::SetMeasurementMode(MeasurementMode::ContinuousStopped),
                [0x55, 0x0D, 0x00, 0x00, 0x00, 0x02, 0x90, 0xAA],
            ),
            (
                Command::SetDataFormat(DataFormat::Byte),
                [0x55, 0x04, 0x00, 0x00, 0x00, 0x01, 0x2E, 0xAA],
            ),
            (
                Command::SetDataFormat(DataFormat::Pixhawk),
                [0x55, 0x04, 0x00, 0x00, 0x00, 0x02, 0x7D, 0xAA],
            ),
        ];
        for (cmd, expected) in cases {
            assert_eq!(cmd.frame().unwrap(), expected, "{:?}", cmd);
        }
    }

    #[test]
    fn frequency_is_big_endian() {
        let payload = Command::SetMeasurementFrequency(500).payload().unwrap();
        assert_eq!(payload, [0x03, 0x00, 0x00, 0x01, 0xF4]);
    }

    #[test]
    fn frequency_bounds() {
        assert!(Command::SetMeasurementFrequency(1).frame().is_ok());
        assert!(Command::SetMeasurementFrequency(500).frame().is_ok());
        assert!(matches!(
            Command::SetMeasurementFrequency(501).frame(),
            Err(ProtocolError::OutOfRange(501))
        ));
    }

    #[test]
    fn baud_table_lookup() {
        assert_eq!(baud_rate_code(0), Some(0x00));
        assert_eq!(baud_rate_code(9600), Some(0x06));
        assert_eq!(baud_rate_code(921600), Some(0x10));
        assert_eq!(baud_rate_code(12345), None);
    }

    #[test]
    fn command_id_from_byte() {
        assert_eq!(CommandId::from_u8(0x07), Some(CommandId::MeasurementData));
        assert_eq!(CommandId::from_u8(0x12), Some(CommandId::SetBaudRate));
        assert_eq!(CommandId::from_u8(0x09), None);
    }

    #[test]
    fn parse_settings() {
        assert_eq!(
            "continuous-stopped".parse::<MeasurementMode>().unwrap(),
            MeasurementMode::ContinuousStopped
        );
        assert_eq!("pixhawk".parse::<DataFormat>().unwrap(), DataFormat::Pixhawk);
        assert!("burst".parse::<MeasurementMode>().is_err());
        assert_eq!(MeasurementMode::Single.to_string(), "single");
    }

    #[test]
    fn only_queries_expect_responses() {
        assert_eq!(Command::GetDeviceInfo.response_frames(), 2);
        assert_eq!(Command::StartMeasurement.response_frames(), 1);
        assert_eq!(Command::SaveSettings.response_frames(), 0);
        assert_eq!(Command::SetBaudRate(9600).response_frames(), 0);
    }

    #[test]
    fn measurement_answers_with_data_id() {
        assert_eq!(
            Command::StartMeasurement.response_id(),
            CommandId::MeasurementData
        );
        assert_eq!(Command::GetDeviceInfo.response_id(), CommandId::GetDeviceInfo);
    }
}
