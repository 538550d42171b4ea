use anyhow::Result;
use clap::{Parser, Subcommand};
use lazy_static::lazy_static;
use regex::Regex;
use std::ops::Deref;
use std::str::FromStr;
use thiserror::Error;

use lpb40b::{DataFormat, MeasurementMode};

#[derive(Error, Debug)]
pub enum RawBytesError {
    #[error("invalid byte '{0}'")]
    BadByte(String),
}

/// Byte string given as hex, e.g. `55 01 00 00 00 00 D3 AA` or `0x55,0x01,..`.
#[derive(Debug)]
pub struct RawBytes(Vec<u8>);

impl Deref for RawBytes {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromStr for RawBytes {
    type Err = RawBytesError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        lazy_static! {
            static ref RE: Regex = Regex::new(r"^(?:0[xX])?([[:xdigit:]]{1,2})$").unwrap();
        }

        input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(|s| {
                RE.captures(s)
                    .and_then(|c| c.get(1))
                    .and_then(|m| u8::from_str_radix(m.as_str(), 16).ok())
                    .ok_or_else(|| RawBytesError::BadByte(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(RawBytes)
    }
}

fn parse_with_radix<T>(input: &str) -> Result<T, T::FromStrRadixErr>
where
    T: num::Num,
    <T as num::Num>::FromStrRadixErr: std::error::Error + Send + Sync,
{
    if input.starts_with("0x") {
        T::from_str_radix(input.trim_start_matches("0x"), 16)
    } else if input.starts_with("0b") {
        T::from_str_radix(input.trim_start_matches("0b"), 2)
    } else {
        T::from_str_radix(input, 10)
    }
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Open the port even if another process holds it
    #[clap(long, short)]
    pub force: bool,

    /// enable debug output
    #[clap(long, short)]
    pub debug: bool,

    /// UART device or 'auto'
    #[clap(long, short, default_value = "auto")]
    pub port: String,

    /// UART baud rate
    #[clap(long, short, default_value_t = 115200)]
    pub baudrate: u32,

    /// Response timeout in milliseconds
    #[clap(long, short, default_value_t = 1000)]
    pub timeout_ms: u64,

    /// Use json-formatted output
    #[clap(long, short)]
    pub json: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List baud rates the sensor can be switched to
    ListBaudRates,

    /// Query model, firmware and current settings
    Info {
        /// Print the two raw frames instead of decoding them
        #[clap(long)]
        raw: bool,
    },

    /// Take single-mode measurements
    #[clap(visible_alias = "m")]
    Measure {
        #[clap(long, short, default_value_t = 1)]
        count: usize,
        /// Pause between measurements
        #[clap(long, short, default_value_t = 50)]
        interval_ms: u64,
    },

    /// Start continuous measuring and print incoming samples
    Stream {
        #[clap(long, short, default_value_t = 10)]
        count: usize,
    },

    /// Set measurement mode (single, continuous, continuous-stopped)
    SetMode { mode: MeasurementMode },

    /// Set measurement frequency in Hz
    SetFrequency {
        #[clap(parse(try_from_str=parse_with_radix))]
        hz: u32,
    },

    /// Set output data format (byte, pixhawk)
    SetFormat { format: DataFormat },

    /// Switch the sensor to another baud rate
    SetBaudRate {
        #[clap(parse(try_from_str=parse_with_radix))]
        rate: u32,
    },

    /// Start measuring
    Start,

    /// Stop measuring
    Stop,

    /// Save current settings in the sensor
    Save,

    /// Send raw bytes and print the reply frames
    Raw {
        #[clap(required = true)]
        bytes: Vec<RawBytes>,
        /// Number of reply frames to wait for
        #[clap(long, short, default_value_t = 1)]
        frames: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_bytes_accepts_common_spellings() {
        let bytes: RawBytes = "55 01 00 00 00 00 D3 AA".parse().unwrap();
        assert_eq!(*bytes, vec![0x55, 0x01, 0x00, 0x00, 0x00, 0x00, 0xD3, 0xAA]);

        let bytes: RawBytes = "0x55,0x0d,0x1".parse().unwrap();
        assert_eq!(*bytes, vec![0x55, 0x0D, 0x01]);
    }

    #[test]
    fn raw_bytes_rejects_garbage() {
        assert!("55 0G".parse::<RawBytes>().is_err());
        assert!("123".parse::<RawBytes>().is_err());
    }

    #[test]
    fn radix_parsing() {
        assert_eq!(parse_with_radix::<u32>("0x0A").unwrap(), 10);
        assert_eq!(parse_with_radix::<u32>("0b101").unwrap(), 5);
        assert_eq!(parse_with_radix::<u32>("115200").unwrap(), 115200);
    }

    #[test]
    fn cli_parses() {
        let cli = Cli::try_parse_from(["lpb40b-tool", "-p", "/dev/ttyUSB0", "set-mode", "single"])
            .unwrap();
        assert_eq!(cli.port, "/dev/ttyUSB0");
        assert!(matches!(
            cli.command,
            Commands::SetMode {
                mode: MeasurementMode::Single
            }
        ));
    }
}
