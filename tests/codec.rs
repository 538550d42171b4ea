use lpb40b::protocol::{crc8, unwrap_frame, wrap_frame, START_BYTE, STOP_BYTE};
use lpb40b::{Command, DataFormat, MeasurementMode, ProtocolError};

#[test]
fn crc_known_values() {
    assert_eq!(crc8(&[]), 0x00);
    assert_eq!(crc8(&[0x06, 0x00, 0x00, 0x00, 0x00]), 0x88);
    assert_eq!(crc8(&[0x08, 0x00, 0x00, 0x00, 0x00]), 0x3E);
    assert_eq!(crc8(&[0x07, 0x00, 0x00, 0x05, 0xAD]), 0x9C);
}

#[test]
fn crc_depends_on_length() {
    assert_eq!(crc8(&[0x08, 0x00, 0x00, 0x00]), 0x1C);
    assert_ne!(crc8(&[0x08, 0x00, 0x00, 0x00]), crc8(&[0x08, 0x00, 0x00, 0x00, 0x00]));
}

#[test]
fn wrap_known_frames() {
    assert_eq!(
        wrap_frame(&[0x08, 0x00, 0x00, 0x00, 0x00]),
        [0x55, 0x08, 0x00, 0x00, 0x00, 0x00, 0x3E, 0xAA]
    );
    assert_eq!(
        wrap_frame(&[0x06, 0x00, 0x00, 0x00, 0x00]),
        [0x55, 0x06, 0x00, 0x00, 0x00, 0x00, 0x88, 0xAA]
    );
    assert_eq!(
        wrap_frame(&[0x0D, 0x00, 0x00, 0x00, 0x01]),
        [0x55, 0x0D, 0x00, 0x00, 0x00, 0x01, 0xC3, 0xAA]
    );
}

#[test]
fn wrap_any_length() {
    let empty = wrap_frame(&[]);
    assert_eq!(empty, [START_BYTE, 0x00, STOP_BYTE]);

    let payload = [0x10, 0x20, 0x30];
    let wrapped = wrap_frame(&payload);
    assert_eq!(wrapped.len(), payload.len() + 3);
    assert_eq!(wrapped[0], START_BYTE);
    assert_eq!(wrapped[wrapped.len() - 1], STOP_BYTE);
    assert_eq!(&wrapped[1..4], &payload);
    assert_eq!(wrapped[4], crc8(&payload));
}

#[test]
fn unwrap_returns_payload() {
    for payload in [&[][..], &[0x10, 0x20, 0x30], &[0x07, 0x00, 0x00, 0x05, 0xAD]] {
        let frame = wrap_frame(payload);
        assert_eq!(unwrap_frame(&frame).unwrap(), payload);
    }
}

#[test]
fn unwrap_bad_delimiters() {
    let mut frame = wrap_frame(&[0x05, 0x00, 0x00, 0x00, 0x00]);
    frame[0] = 0x56;
    assert!(matches!(unwrap_frame(&frame), Err(ProtocolError::Framing(_))));

    let mut frame = wrap_frame(&[0x05, 0x00, 0x00, 0x00, 0x00]);
    frame[7] = 0xAB;
    assert!(matches!(unwrap_frame(&frame), Err(ProtocolError::Framing(_))));
}

#[test]
fn unwrap_bad_crc() {
    let mut frame = wrap_frame(&[0x05, 0x00, 0x00, 0x00, 0x00]);
    frame[3] ^= 0x40;
    assert!(matches!(
        unwrap_frame(&frame),
        Err(ProtocolError::Checksum { .. })
    ));
}

#[test]
fn command_frames_from_manual() {
    let cases = [
        (
            Command::GetDeviceInfo,
            [0x55, 0x01, 0x00, 0x00, 0x00, 0x00, 0xD3, 0xAA],
        ),
        (
            Command::ObtainTemperature,
            [0x55, 0x02, 0x00, 0x00, 0x00, 0x00, 0x97, 0xAA],
        ),
        (
            Command::SetMeasurementMode(MeasurementMode::Single),
            [0x55, 0x0D, 0x00, 0x00, 0x00, 0x01, 0xC3, 0xAA],
        ),
        (
            Command::StartMeasurement,
            [0x55, 0x05, 0x00, 0x00, 0x00, 0x00, 0xCC, 0xAA],
        ),
        (
            Command::StopMeasurement,
            [0x55, 0x06, 0x00, 0x00, 0x00, 0x00, 0x88, 0xAA],
        ),
        (
            Command::SaveSettings,
            [0x55, 0x08, 0x00, 0x00, 0x00, 0x00, 0x3E, 0xAA],
        ),
        (
            Command::SetDataFormat(DataFormat::Byte),
            [0x55, 0x04, 0x00, 0x00, 0x00, 0x01, 0x2E, 0xAA],
        ),
        (
            Command::SetMeasurementFrequency(10),
            [0x55, 0x03, 0x00, 0x00, 0x00, 0x0A, 0x9F, 0xAA],
        ),
        (
            Command::SetBaudRate(115200),
            [0x55, 0x12, 0x00, 0x00, 0x00, 0x0C, 0x96, 0xAA],
        ),
    ];

    for (cmd, expected) in cases {
        assert_eq!(cmd.frame().unwrap(), expected, "{:?}", cmd);
    }
}

#[test]
fn invalid_parameters() {
    assert!(matches!(
        Command::SetMeasurementFrequency(0).frame(),
        Err(ProtocolError::OutOfRange(0))
    ));
    assert!(matches!(
        Command::SetMeasurementFrequency(3000).frame(),
        Err(ProtocolError::OutOfRange(3000))
    ));
    assert!(matches!(
        Command::SetBaudRate(12345).frame(),
        Err(ProtocolError::UnsupportedBaudRate(12345))
    ));
}
