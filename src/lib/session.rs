use core::time::Duration;
use std::thread;
use std::time::Instant;

use log::{debug, trace, warn};

use crate::channel::Channel;
use crate::config::SessionConfig;
use crate::error::{ProtocolError, Result};
use crate::protocol::command::{Command, CommandId, DataFormat, MeasurementMode};
use crate::protocol::response::{check_command, DeviceInfo, MeasurementResult};
use crate::protocol::{decode_frame, to_hex, Frame, Payload, FRAME_LEN, START_BYTE};

/// Pause after the mode change in [`Session::begin`] before the sensor takes
/// further commands.
pub const SETTLE_DELAY: Duration = Duration::from_millis(10);

/// Back-off between empty polls of a channel that returned no data.
const IDLE_POLL: Duration = Duration::from_millis(1);

/// Request/response exchanges with one sensor.
///
/// The session owns its channel; the protocol has no request ids, so nothing
/// else may talk on it while the session is alive.
pub struct Session<C: Channel> {
    channel: C,
    config: SessionConfig,
    last_write: Option<Instant>,
    // start byte found by `resync`, owed to the next frame
    carry: Option<u8>,
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.map_or(false, |d| Instant::now() >= d)
}

impl<C: Channel> Session<C> {
    pub fn open(channel: C) -> Result<Self> {
        Self::with_config(channel, SessionConfig::default())
    }

    pub fn with_config(channel: C, config: SessionConfig) -> Result<Self> {
        if !channel.is_ready() {
            return Err(ProtocolError::ChannelNotReady);
        }
        Ok(Self {
            channel,
            config,
            last_write: None,
            carry: None,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    pub fn into_inner(self) -> C {
        self.channel
    }

    pub fn close(mut self) {
        self.channel.close();
    }

    /// Drops stale bytes and puts the sensor in single measurement mode.
    pub fn begin(&mut self) -> Result<()> {
        self.discard()?;
        self.set_measurement_mode(MeasurementMode::Single)?;
        thread::sleep(SETTLE_DELAY);
        debug!("begin OK");
        Ok(())
    }

    /// Triggers one measurement and waits for its result.
    pub fn get_measurement_mm(&mut self) -> Result<MeasurementResult> {
        self.send(Command::StartMeasurement)?;
        self.read_measurement()
    }

    /// Reads one measurement frame without sending anything, for use in the
    /// continuous modes after [`Session::start_measuring`].
    pub fn read_measurement(&mut self) -> Result<MeasurementResult> {
        let payload = self.read_response(CommandId::MeasurementData)?;
        let result = MeasurementResult::from_payload(&payload)?;
        if !result.is_valid() {
            warn!("measurement error code {:#04x}", result.error_code);
        }
        Ok(result)
    }

    /// Raw info frames: model and firmware first, settings second.
    pub fn get_device_info(&mut self) -> Result<(Frame, Frame)> {
        let frames = self.exchange(Command::GetDeviceInfo)?;
        Ok((frames[0], frames[1]))
    }

    pub fn device_info(&mut self) -> Result<DeviceInfo> {
        let (first, second) = self.get_device_info()?;
        DeviceInfo::from_frames(&first, &second)
    }

    pub fn set_measurement_mode(&mut self, mode: MeasurementMode) -> Result<()> {
        self.send(Command::SetMeasurementMode(mode))
    }

    pub fn set_measurement_frequency(&mut self, hz: u32) -> Result<()> {
        self.send(Command::SetMeasurementFrequency(hz))
    }

    pub fn set_data_format(&mut self, format: DataFormat) -> Result<()> {
        self.send(Command::SetDataFormat(format))
    }

    /// Changes the sensor's baud rate. The host port keeps its own setting;
    /// reopen it at the new rate afterwards.
    pub fn set_baud_rate(&mut self, rate: u32) -> Result<()> {
        self.send(Command::SetBaudRate(rate))
    }

    pub fn start_measuring(&mut self) -> Result<()> {
        self.send(Command::StartMeasurement)
    }

    pub fn stop_measuring(&mut self) -> Result<()> {
        self.send(Command::StopMeasurement)
    }

    /// Persists the current settings in the sensor.
    pub fn save_settings(&mut self) -> Result<()> {
        self.send(Command::SaveSettings)
    }

    /// Encodes and writes a command. Parameters are checked before anything
    /// touches the channel.
    pub fn send(&mut self, cmd: Command) -> Result<()> {
        let frame = cmd.frame()?;
        debug!("{:?}", cmd);
        self.write_raw(&frame)
    }

    /// Sends `cmd` and collects every frame the sensor answers it with. Each
    /// frame is checked for framing, crc and the expected command id.
    pub fn exchange(&mut self, cmd: Command) -> Result<Vec<Frame>> {
        self.send(cmd)?;
        let expected = cmd.response_id();
        (0..cmd.response_frames())
            .map(|_| self.read_checked(expected).map(|(frame, _)| frame))
            .collect()
    }

    /// Writes bytes as-is, keeping the inter-command spacing.
    pub fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        if let Some(last) = self.last_write {
            let elapsed = last.elapsed();
            if elapsed < self.config.command_interval {
                thread::sleep(self.config.command_interval - elapsed);
            }
        }

        debug!("send {}", to_hex(data));
        self.channel.write(data)?;
        self.last_write = Some(Instant::now());
        Ok(())
    }

    /// Collects one frame byte by byte.
    ///
    /// The timeout restarts with every byte received; if it runs out first
    /// the bytes gathered so far are returned inside `FrameTimeout`.
    pub fn read_frame(&mut self) -> Result<Frame> {
        let mut frame = [0u8; FRAME_LEN];
        let mut count = 0;
        if let Some(byte) = self.carry.take() {
            frame[0] = byte;
            count = 1;
        }
        let mut deadline = self.deadline();

        while count < FRAME_LEN {
            let n = self.channel.read(&mut frame[count..count + 1])?;
            if n > 0 {
                trace!("byte {}: {:02X}", count, frame[count]);
                count += n;
                deadline = self.deadline();
                continue;
            }

            if expired(deadline) {
                debug!("recv timeout after {}", to_hex(&frame[..count]));
                return Err(ProtocolError::FrameTimeout {
                    partial: frame[..count].to_vec(),
                });
            }
            thread::sleep(IDLE_POLL);
        }

        debug!("recv {}", to_hex(&frame));
        Ok(frame)
    }

    /// Reads a frame, checks framing and crc, and insists on `expected`.
    pub fn read_response(&mut self, expected: CommandId) -> Result<Payload> {
        self.read_checked(expected).map(|(_, payload)| payload)
    }

    fn read_checked(&mut self, expected: CommandId) -> Result<(Frame, Payload)> {
        let frame = self.read_frame()?;
        let payload = decode_frame(&frame)?;
        check_command(&payload, expected)?;
        Ok((frame, payload))
    }

    /// Realigns the reader on a frame boundary, e.g. after a `Framing` error
    /// left it in the middle of a frame.
    ///
    /// Buffered bytes are dropped, then incoming bytes are skipped until a
    /// start byte shows up; that byte opens the next frame read. A line that
    /// stays quiet for the whole timeout counts as aligned. Noise without any
    /// start byte fails with `Framing` carrying the skipped bytes.
    pub fn resync(&mut self) -> Result<()> {
        warn!("resynchronizing channel");
        self.discard()?;

        let deadline = self.deadline();
        let mut skipped = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            if self.channel.read(&mut byte)? == 0 {
                if expired(deadline) {
                    break;
                }
                thread::sleep(IDLE_POLL);
                continue;
            }

            if byte[0] == START_BYTE {
                debug!("resync skipped {}", to_hex(&skipped));
                self.carry = Some(START_BYTE);
                return Ok(());
            }
            skipped.push(byte[0]);
            if expired(deadline) {
                break;
            }
        }

        if skipped.is_empty() {
            debug!("resync: line quiet");
            Ok(())
        } else {
            Err(ProtocolError::Framing(skipped))
        }
    }

    fn discard(&mut self) -> Result<()> {
        self.carry = None;
        self.channel.clear()?;
        Ok(())
    }

    /// `None` when the timeout is too large to represent, i.e. no deadline.
    fn deadline(&self) -> Option<Instant> {
        Instant::now().checked_add(self.config.timeout)
    }
}
