//! In-memory stand-in for the sensor, answering commands byte for byte the way
//! the hardware does.

use std::collections::VecDeque;
use std::io;

use log::debug;
use num_traits::FromPrimitive;

use crate::channel::{not_connected, Channel};
use crate::protocol::command::{CommandId, DataFormat, MeasurementMode};
use crate::protocol::{decode_frame, encode_frame, to_hex, FRAME_LEN};

pub const MOCK_MODEL: u8 = 0x89;
pub const MOCK_FIRMWARE: [u8; 3] = [0x03, 0x01, 0x03];
pub const MOCK_FREQUENCY_HZ: u16 = 100;

pub struct MockSensor {
    distance_mm: u32,
    error_code: u8,
    mode: MeasurementMode,
    data_format: DataFormat,
    frequency_hz: u16,
    streaming: bool,
    open: bool,
    clear_offset: Option<usize>,
    rx: VecDeque<u8>,
    sent: Vec<Vec<u8>>,
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

impl MockSensor {
    pub fn new(distance_mm: u32) -> Self {
        Self {
            distance_mm,
            error_code: 0,
            mode: MeasurementMode::Single,
            data_format: DataFormat::Byte,
            frequency_hz: MOCK_FREQUENCY_HZ,
            streaming: false,
            open: true,
            clear_offset: None,
            rx: VecDeque::new(),
            sent: Vec::new(),
        }
    }

    pub fn set_distance(&mut self, distance_mm: u32) {
        self.distance_mm = distance_mm;
    }

    pub fn set_error_code(&mut self, error_code: u8) {
        self.error_code = error_code;
    }

    /// While streaming, makes `clear` land inside a frame: the measurement in
    /// flight is left queued from byte `offset` on.
    pub fn set_clear_offset(&mut self, offset: Option<usize>) {
        self.clear_offset = offset;
    }

    /// Queues raw bytes ahead of any later responses.
    pub fn inject(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }

    /// Every buffer written so far, in order.
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    pub fn mode(&self) -> MeasurementMode {
        self.mode
    }

    pub fn data_format(&self) -> DataFormat {
        self.data_format
    }

    pub fn frequency_hz(&self) -> u16 {
        self.frequency_hz
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    fn enqueue(&mut self, payload: [u8; 5]) {
        self.rx.extend(encode_frame(&payload));
    }

    fn enqueue_measurement(&mut self) {
        let dist = self.distance_mm.to_be_bytes();
        self.enqueue([
            CommandId::MeasurementData as u8,
            self.error_code,
            dist[1],
            dist[2],
            dist[3],
        ]);
    }

    fn handle(&mut self, payload: [u8; 5]) -> io::Result<()> {
        let arg = &payload[1..];
        let command = CommandId::from_u8(payload[0])
            .ok_or_else(|| invalid(format!("unknown command {:#04x}", payload[0])))?;

        match command {
            CommandId::GetDeviceInfo => {
                let id = CommandId::GetDeviceInfo as u8;
                let freq = self.frequency_hz.to_be_bytes();
                self.enqueue([id, MOCK_MODEL, MOCK_FIRMWARE[0], MOCK_FIRMWARE[1], MOCK_FIRMWARE[2]]);
                self.enqueue([id, self.data_format as u8, self.mode as u8, freq[0], freq[1]]);
            }
            CommandId::SetMeasurementMode => {
                self.mode = MeasurementMode::from_u8(arg[3])
                    .filter(|_| arg[..3] == [0, 0, 0])
                    .ok_or_else(|| invalid(format!("bad measurement mode {:02X?}", arg)))?;
                self.streaming = self.mode == MeasurementMode::ContinuousPowerOn;
            }
            CommandId::SetDataFormat => {
                self.data_format = DataFormat::from_u8(arg[3])
                    .filter(|_| arg[..3] == [0, 0, 0])
                    .ok_or_else(|| invalid(format!("bad data format {:02X?}", arg)))?;
            }
            CommandId::SetMeasurementFrequency => {
                let hz = u32::from_be_bytes([arg[0], arg[1], arg[2], arg[3]]);
                self.frequency_hz = u16::try_from(hz)
                    .map_err(|_| invalid(format!("bad frequency {}", hz)))?;
            }
            CommandId::StartMeasurement => match self.mode {
                MeasurementMode::Single => self.enqueue_measurement(),
                _ => self.streaming = true,
            },
            CommandId::StopMeasurement => self.streaming = false,
            CommandId::SaveSettings | CommandId::SetBaudRate => {}
            other => return Err(invalid(format!("{:?} not supported", other))),
        }
        Ok(())
    }
}

impl Default for MockSensor {
    fn default() -> Self {
        Self::new(1234)
    }
}

impl Channel for MockSensor {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if !self.open {
            return Err(not_connected());
        }
        self.sent.push(data.to_vec());

        if data.len() != FRAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("expected {} bytes, got {}", FRAME_LEN, data.len()),
            ));
        }

        let payload = decode_frame(data).map_err(|e| invalid(e.to_string()))?;
        debug!("mock got {}", to_hex(data));
        self.handle(payload)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.open {
            return Err(not_connected());
        }
        if self.streaming && self.rx.is_empty() {
            self.enqueue_measurement();
        }

        let n = buf.len().min(self.rx.len());
        for (slot, byte) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn is_ready(&self) -> bool {
        self.open
    }

    fn clear(&mut self) -> io::Result<()> {
        self.rx.clear();
        if let Some(offset) = self.clear_offset.filter(|_| self.streaming) {
            self.enqueue_measurement();
            self.rx.drain(..offset.min(FRAME_LEN));
        }
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }
}
