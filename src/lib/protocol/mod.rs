pub mod command;
pub mod response;

use crc::{Algorithm, Crc};
use itertools::Itertools;

use crate::error::{ProtocolError, Result};

pub const START_BYTE: u8 = 0x55;
pub const STOP_BYTE: u8 = 0xAA;

pub const PAYLOAD_LEN: usize = 5;
pub const FRAME_LEN: usize = PAYLOAD_LEN + 3;

/// Complete wire unit: start, command, 4 argument bytes, crc, stop.
pub type Frame = [u8; FRAME_LEN];
/// Command id followed by its 4 argument bytes.
pub type Payload = [u8; PAYLOAD_LEN];

/// CRC-8 as specified by the LPB40B manual: x^8 + x^5 + x^4 + 1, MSB first,
/// zero init, no final xor.
pub const CRC_8_LPB40B: Algorithm<u8> = Algorithm {
    poly: 0x31,
    init: 0x00,
    refin: false,
    refout: false,
    xorout: 0x00,
    check: 0xa2,
    residue: 0x00,
};

static CRC8: Crc<u8> = Crc::<u8>::new(&CRC_8_LPB40B);

pub fn crc8(bytes: &[u8]) -> u8 {
    CRC8.checksum(bytes)
}

/// Wraps an arbitrary payload as `[START] payload.. [CRC] [STOP]`.
///
/// Command payloads are always 5 bytes, but the framing itself is length
/// agnostic; see [`encode_frame`] for the fixed-size variant.
pub fn wrap_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + 3);
    frame.push(START_BYTE);
    frame.extend_from_slice(payload);
    frame.push(crc8(payload));
    frame.push(STOP_BYTE);
    frame
}

pub fn encode_frame(payload: &Payload) -> Frame {
    let mut frame = [0u8; FRAME_LEN];
    frame[0] = START_BYTE;
    frame[1..1 + PAYLOAD_LEN].copy_from_slice(payload);
    frame[FRAME_LEN - 2] = crc8(payload);
    frame[FRAME_LEN - 1] = STOP_BYTE;
    frame
}

/// Checks delimiters and crc, returns the bytes between start byte and crc.
pub fn unwrap_frame(frame: &[u8]) -> Result<&[u8]> {
    if frame.len() < 3 || frame[0] != START_BYTE || frame[frame.len() - 1] != STOP_BYTE {
        return Err(ProtocolError::Framing(frame.to_vec()));
    }

    let payload = &frame[1..frame.len() - 2];
    let expected = crc8(payload);
    let actual = frame[frame.len() - 2];

    if expected != actual {
        return Err(ProtocolError::Checksum { expected, actual });
    }

    Ok(payload)
}

/// Like [`unwrap_frame`] but insists on a standard 5-byte payload.
pub fn decode_frame(frame: &[u8]) -> Result<Payload> {
    let payload = unwrap_frame(frame)?;
    payload
        .try_into()
        .map_err(|_| ProtocolError::MalformedPayload(payload.len()))
}

/// Formats bytes the way the sensor manual prints frames: `55 01 00 ..`.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).join(" ")
}
