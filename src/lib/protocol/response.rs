use std::fmt::Display;

use num_traits::FromPrimitive;

use super::command::{CommandId, DataFormat, MeasurementMode};
use super::{decode_frame, Payload};
use crate::error::{ProtocolError, Result};

/// Fails with `UnexpectedResponse` unless the payload carries `expected`.
pub fn check_command(payload: &Payload, expected: CommandId) -> Result<()> {
    if payload[0] != expected as u8 {
        return Err(ProtocolError::UnexpectedResponse {
            expected: expected as u8,
            actual: payload[0],
        });
    }
    Ok(())
}

/// One distance sample: `[0x07, error, dist_hi, dist_mid, dist_lo]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeasurementResult {
    /// Distance in millimeters, 24 bits.
    pub distance_mm: u32,
    /// Nonzero means the sensor could not produce a valid distance.
    pub error_code: u8,
}

impl MeasurementResult {
    pub fn from_payload(payload: &Payload) -> Result<Self> {
        check_command(payload, CommandId::MeasurementData)?;
        Ok(MeasurementResult {
            distance_mm: u32::from_be_bytes([0, payload[2], payload[3], payload[4]]),
            error_code: payload[1],
        })
    }

    pub fn from_frame(frame: &[u8]) -> Result<Self> {
        Self::from_payload(&decode_frame(frame)?)
    }

    pub fn is_valid(&self) -> bool {
        self.error_code == 0
    }
}

impl Display for MeasurementResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "{} mm", self.distance_mm)
        } else {
            write!(f, "{} mm (error {:#04x})", self.distance_mm, self.error_code)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl Display for FirmwareVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Decoded answer to `GetDeviceInfo`.
///
/// The sensor answers with two frames:
/// `[0x01, model, fw_major, fw_minor, fw_patch]` and
/// `[0x01, data_format, mode, freq_hi, freq_lo]`. The manual lists the
/// frequency as one byte, the device actually sends two.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub model: u8,
    pub firmware: FirmwareVersion,
    pub data_format: u8,
    pub measurement_mode: u8,
    pub frequency_hz: u16,
}

impl DeviceInfo {
    pub fn from_frames(first: &[u8], second: &[u8]) -> Result<Self> {
        let first = decode_frame(first)?;
        let second = decode_frame(second)?;
        check_command(&first, CommandId::GetDeviceInfo)?;
        check_command(&second, CommandId::GetDeviceInfo)?;

        Ok(DeviceInfo {
            model: first[1],
            firmware: FirmwareVersion {
                major: first[2],
                minor: first[3],
                patch: first[4],
            },
            data_format: second[1],
            measurement_mode: second[2],
            frequency_hz: u16::from_be_bytes([second[3], second[4]]),
        })
    }

    pub fn format(&self) -> Option<DataFormat> {
        DataFormat::from_u8(self.data_format)
    }

    pub fn mode(&self) -> Option<MeasurementMode> {
        MeasurementMode::from_u8(self.measurement_mode)
    }
}

impl Display for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "model:     {:#04x}", self.model)?;
        writeln!(f, "firmware:  {}", self.firmware)?;
        match self.format() {
            Some(format) => writeln!(f, "format:    {}", format)?,
            None => writeln!(f, "format:    unknown ({:#04x})", self.data_format)?,
        }
        match self.mode() {
            Some(mode) => writeln!(f, "mode:      {}", mode)?,
            None => writeln!(f, "mode:      unknown ({:#04x})", self.measurement_mode)?,
        }
        write!(f, "frequency: {} Hz", self.frequency_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encode_frame;

    #[test]
    fn measurement_from_manual_example() {
        // 0x0005AD = 1453 mm
        let frame = [0x55, 0x07, 0x00, 0x00, 0x05, 0xAD, 0x9C, 0xAA];
        let result = MeasurementResult::from_frame(&frame).unwrap();
        assert_eq!(result.distance_mm, 1453);
        assert!(result.is_valid());
    }

    #[test]
    fn measurement_uses_all_three_distance_bytes() {
        let frame = encode_frame(&[0x07, 0x00, 0xFF, 0xFF, 0xFF]);
        let result = MeasurementResult::from_frame(&frame).unwrap();
        assert_eq!(result.distance_mm, 16_777_215);
    }

    #[test]
    fn measurement_error_code_is_kept() {
        let frame = encode_frame(&[0x07, 0x03, 0x00, 0x00, 0x00]);
        let result = MeasurementResult::from_frame(&frame).unwrap();
        assert_eq!(result.error_code, 0x03);
        assert!(!result.is_valid());
        assert_eq!(result.to_string(), "0 mm (error 0x03)");
    }

    #[test]
    fn measurement_rejects_other_commands() {
        let frame = encode_frame(&[0x01, 0x00, 0x00, 0x00, 0x00]);
        assert!(matches!(
            MeasurementResult::from_frame(&frame),
            Err(ProtocolError::UnexpectedResponse {
                expected: 0x07,
                actual: 0x01
            })
        ));
    }

    #[test]
    fn device_info_decoding() {
        let first = [0x55, 0x01, 0x89, 0x03, 0x01, 0x03, 0xC8, 0xAA];
        let second = [0x55, 0x01, 0x01, 0x01, 0x00, 0x64, 0x71, 0xAA];
        let info = DeviceInfo::from_frames(&first, &second).unwrap();

        assert_eq!(info.model, 0x89);
        assert_eq!(info.firmware.to_string(), "3.1.3");
        assert_eq!(info.format(), Some(DataFormat::Byte));
        assert_eq!(info.mode(), Some(MeasurementMode::Single));
        assert_eq!(info.frequency_hz, 100);
    }

    #[test]
    fn device_info_rejects_corrupted_frame() {
        let first = [0x55, 0x01, 0x89, 0x03, 0x01, 0x03, 0xC9, 0xAA];
        let second = [0x55, 0x01, 0x01, 0x01, 0x00, 0x64, 0x71, 0xAA];
        assert!(matches!(
            DeviceInfo::from_frames(&first, &second),
            Err(ProtocolError::Checksum {
                expected: 0xC8,
                actual: 0xC9
            })
        ));
    }
}
