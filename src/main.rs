mod cli;

use std::io;
use std::{thread, time::Duration};

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::{generate, shells::Bash};
use itertools::Itertools;
use log::{error, info};

use lpb40b::port::{self, SerialChannel};
use lpb40b::protocol::command::BAUD_RATES;
use lpb40b::protocol::to_hex;
use lpb40b::{DeviceInfo, MeasurementMode, MeasurementResult, Session, SessionConfig};

use cli::{Cli, Commands};

enum OutputFormat {
    Plain,
    Json,
}

type Lpb40b = Session<SerialChannel>;

fn measurement_to_json(m: &MeasurementResult) -> json::JsonValue {
    let mut obj = json::JsonValue::new_object();
    obj["distance_mm"] = m.distance_mm.into();
    obj["error_code"] = m.error_code.into();
    obj["valid"] = m.is_valid().into();
    obj
}

fn info_to_json(info: &DeviceInfo) -> json::JsonValue {
    let mut obj = json::JsonValue::new_object();
    obj["model"] = info.model.into();
    obj["firmware"] = info.firmware.to_string().into();
    obj["data_format"] = info.data_format.into();
    obj["measurement_mode"] = info.measurement_mode.into();
    obj["frequency_hz"] = info.frequency_hz.into();
    obj
}

fn cmd_list_baud_rates(fmt: OutputFormat) -> Result<String> {
    let rates = BAUD_RATES.iter().map(|&(rate, _)| rate).collect::<Vec<_>>();
    Ok(match fmt {
        OutputFormat::Plain => rates.iter().join("\n"),
        OutputFormat::Json => json::stringify(rates),
    })
}

fn cmd_info(dev: &mut Lpb40b, raw: bool, fmt: OutputFormat) -> Result<String> {
    if raw {
        let (first, second) = dev.get_device_info().context("Failed to query device info")?;
        return Ok(match fmt {
            OutputFormat::Plain => format!("{}\n{}", to_hex(&first), to_hex(&second)),
            OutputFormat::Json => json::stringify(vec![first.to_vec(), second.to_vec()]),
        });
    }

    let info = dev.device_info().context("Failed to query device info")?;
    Ok(match fmt {
        OutputFormat::Plain => info.to_string(),
        OutputFormat::Json => json::stringify(info_to_json(&info)),
    })
}

fn cmd_measure(
    dev: &mut Lpb40b,
    count: usize,
    interval: Duration,
    fmt: OutputFormat,
) -> Result<String> {
    dev.begin()?;

    let mut results = Vec::with_capacity(count);
    for i in 0..count {
        if i > 0 {
            thread::sleep(interval);
        }
        let m = dev
            .get_measurement_mm()
            .with_context(|| format!("Measurement {} failed", i + 1))?;
        info!("{}", m);
        results.push(m);
    }

    Ok(match fmt {
        OutputFormat::Plain => results.iter().map(|m| m.distance_mm).join("\n"),
        OutputFormat::Json => json::stringify(
            results
                .iter()
                .map(measurement_to_json)
                .collect::<Vec<_>>(),
        ),
    })
}

fn cmd_stream(dev: &mut Lpb40b, count: usize, fmt: OutputFormat) -> Result<String> {
    dev.set_measurement_mode(MeasurementMode::ContinuousStopped)?;
    dev.start_measuring()?;

    let results = (0..count)
        .map(|_| dev.read_measurement())
        .collect::<Result<Vec<_>, _>>();

    // stop even if a sample was lost, the sensor keeps streaming otherwise
    dev.stop_measuring()?;
    let results = results.context("Streaming failed")?;

    Ok(match fmt {
        OutputFormat::Plain => results.iter().map(|m| m.distance_mm).join("\n"),
        OutputFormat::Json => json::stringify(
            results
                .iter()
                .map(measurement_to_json)
                .collect::<Vec<_>>(),
        ),
    })
}

fn cmd_raw(dev: &mut Lpb40b, bytes: &[u8], frames: usize, fmt: OutputFormat) -> Result<String> {
    dev.write_raw(bytes)?;

    let replies = (0..frames)
        .map(|_| dev.read_frame().map(|f| f.to_vec()))
        .collect::<Result<Vec<_>, _>>()
        .context("No reply")?;

    Ok(match fmt {
        OutputFormat::Plain => replies.iter().map(|f| to_hex(f)).join("\n"),
        OutputFormat::Json => json::stringify(replies),
    })
}

fn do_main() -> Result<String> {
    if std::env::var("GENERATE_COMPLETION").is_ok() {
        generate(Bash, &mut Cli::command(), "lpb40b-tool", &mut io::stdout());

        return Ok(String::default());
    }

    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if cli.debug {
        "debug"
    } else {
        "info"
    }))
    .format_timestamp(None)
    .format_target(false)
    .init();

    let fmt = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Plain
    };

    if let Commands::ListBaudRates = cli.command {
        return cmd_list_baud_rates(fmt);
    }

    let port = port::open_port(&cli.port, cli.baudrate, cli.force)
        .with_context(|| format!("Can't open port '{}'", cli.port))?;
    let config = SessionConfig::default().timeout(Duration::from_millis(cli.timeout_ms));
    let mut dev = Session::with_config(port, config)?;

    let res = match cli.command {
        Commands::Info { raw } => cmd_info(&mut dev, raw, fmt),
        Commands::Measure { count, interval_ms } => {
            cmd_measure(&mut dev, count, Duration::from_millis(interval_ms), fmt)
        }
        Commands::Stream { count } => cmd_stream(&mut dev, count, fmt),
        Commands::SetMode { mode } => dev
            .set_measurement_mode(mode)
            .map(|_| String::new())
            .context("Failed to set measurement mode"),
        Commands::SetFrequency { hz } => dev
            .set_measurement_frequency(hz)
            .map(|_| String::new())
            .context("Failed to set measurement frequency"),
        Commands::SetFormat { format } => dev
            .set_data_format(format)
            .map(|_| String::new())
            .context("Failed to set data format"),
        Commands::SetBaudRate { rate } => dev
            .set_baud_rate(rate)
            .map(|_| format!("sensor now at {} baud, reopen the port at that rate", rate))
            .context("Failed to set baud rate"),
        Commands::Start => dev
            .start_measuring()
            .map(|_| String::new())
            .context("Failed to start"),
        Commands::Stop => dev
            .stop_measuring()
            .map(|_| String::new())
            .context("Failed to stop"),
        Commands::Save => dev
            .save_settings()
            .map(|_| String::new())
            .context("Failed to save settings"),
        Commands::Raw { bytes, frames } => {
            let bytes = bytes.iter().flat_map(|b| b.iter().copied()).collect::<Vec<_>>();
            cmd_raw(&mut dev, &bytes, frames, fmt)
        }
        _ => Err(anyhow!("unexpected command (this is a bug!)")),
    };

    dev.close();
    res
}

fn main() {
    match do_main() {
        Ok(s) => println!("{}", s),
        Err(e) => error!("{:#}", e),
    }
}
