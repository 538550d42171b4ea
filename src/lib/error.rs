use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("channel is not open")]
    ChannelNotReady,
    #[error("timed out waiting for frame ({} bytes received: {:02X?})", .partial.len(), .partial)]
    FrameTimeout { partial: Vec<u8> },
    #[error("bad frame delimiters {0:02X?}")]
    Framing(Vec<u8>),
    #[error("crc mismatch: expected {expected:#04x}, got {actual:#04x}")]
    Checksum { expected: u8, actual: u8 },
    #[error("unexpected response command {actual:#04x} (expected {expected:#04x})")]
    UnexpectedResponse { expected: u8, actual: u8 },
    #[error("measurement frequency {0} Hz out of range")]
    OutOfRange(u32),
    #[error("unsupported baud rate {0}")]
    UnsupportedBaudRate(u32),
    #[error("malformed payload of {0} bytes")]
    MalformedPayload(usize),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Errors a caller may clear by simply retrying the exchange.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProtocolError::FrameTimeout { .. } | ProtocolError::Checksum { .. }
        )
    }
}

pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;
