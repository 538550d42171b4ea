#[cfg(target_os = "linux")]
mod linux;
#[cfg(not(target_os = "linux"))]
mod other;

#[cfg(target_os = "linux")]
use linux::is_port_open;
#[cfg(not(target_os = "linux"))]
use other::is_port_open;

pub use serialport::SerialPort;

use anyhow::Result;
use core::time::Duration;
use log::debug;
use serialport::{self, ClearBuffer, SerialPortType};
use std::io::{self, Read, Write};
use thiserror::Error;

use crate::channel::{not_connected, Channel};

/// Per-call read timeout of the OS port. Kept short so that the session's
/// frame deadline decides how long to wait.
const POLL_TIMEOUT: Duration = Duration::from_millis(10);

#[derive(Error, Debug)]
pub enum OpenPortError {
    #[error("no compatible usb-serial adapter found")]
    NoCompatiblePort,
    #[error("{port_name:?} busy")]
    PortBusy { port_name: String },
}

#[derive(PartialEq)]
struct UsbId(u16, u16);

static COMPATIBLE_IDS: &[UsbId] = &[
    UsbId(0x1a86, 0x7523), // QinHeng Electronics HL-340 USB-Serial adapter
    UsbId(0x10c4, 0xea60), // Silicon Labs CP210x UART Bridge
    UsbId(0x0403, 0x6001), // FTDI FT232R USB UART
];

/// An OS serial port as a [`Channel`].
pub struct SerialChannel {
    name: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialChannel {
    pub fn new(name: &str, port: Box<dyn SerialPort>) -> Self {
        Self {
            name: name.to_string(),
            port: Some(port),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn port(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or_else(not_connected)
    }
}

impl Channel for SerialChannel {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let port = self.port()?;
        Write::write_all(port, data)?;
        Write::flush(port)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match Read::read(self.port()?, buf) {
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            other => other,
        }
    }

    fn is_ready(&self) -> bool {
        self.port.is_some()
    }

    fn clear(&mut self) -> io::Result<()> {
        Ok(SerialPort::clear(&**self.port()?, ClearBuffer::All)?)
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!("closed {}", self.name);
        }
    }
}

pub fn open_port(port_name: &str, baudrate: u32, force: bool) -> Result<SerialChannel> {
    let true_name: String = if port_name == "auto" {
        guess_port()?
    } else {
        port_name.to_string()
    };

    if !force && is_port_open(&true_name) {
        return Err(OpenPortError::PortBusy {
            port_name: true_name,
        }
        .into());
    }

    let port = serialport::new(&true_name, baudrate)
        .timeout(POLL_TIMEOUT)
        .open()?;

    debug!("open_port OK: {} @ {} baud", &true_name, baudrate);
    Ok(SerialChannel::new(&true_name, port))
}

fn guess_port() -> Result<String> {
    serialport::available_ports()?
        .into_iter()
        .filter(|info| match &info.port_type {
            SerialPortType::UsbPort(usb_info) => {
                COMPATIBLE_IDS.contains(&UsbId(usb_info.vid, usb_info.pid))
            }
            _ => false,
        })
        .map(|info| info.port_name)
        .find(|name| !is_port_open(name))
        .ok_or_else(|| OpenPortError::NoCompatiblePort.into())
}
