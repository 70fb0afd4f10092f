//! Unit tests for the FE-C frame codec

use ergsim::sensors::ant::fec::{
    decode_trainer_data, encode_target_power, encode_track_resistance, TrainerData,
    PAGE_TARGET_POWER, PAGE_TRACK_RESISTANCE,
};
use ergsim::sensors::ant::{checksum, AntFrame, FrameError, DEFAULT_CHANNEL, SYNC_BYTE};

#[test]
fn test_target_power_200w() {
    let frame = encode_target_power(200.0);
    let bytes = frame.as_bytes();

    assert_eq!(&bytes[..4], &[SYNC_BYTE, 0x09, 0x4F, DEFAULT_CHANNEL]);
    assert_eq!(bytes[4], PAGE_TARGET_POWER);
    // 200 W / 0.25 = 800 = 0x0320
    assert_eq!(bytes[10], 0x20);
    assert_eq!(bytes[11], 0x03);
    assert_eq!(bytes[12], checksum(&bytes[..12]));
    assert_eq!(AntFrame::parse(bytes).unwrap(), frame);
}

#[test]
fn test_flat_grade_is_20000() {
    let frame = encode_track_resistance(0.0);
    let bytes = frame.as_bytes();
    assert_eq!(bytes[4], PAGE_TRACK_RESISTANCE);
    assert_eq!(u16::from_le_bytes([bytes[9], bytes[10]]), 20000);
}

#[test]
fn test_every_frame_checksums() {
    for frame in [
        encode_target_power(0.0),
        encode_target_power(1234.5),
        encode_track_resistance(-12.3),
        encode_track_resistance(25.0),
    ] {
        let bytes = frame.as_bytes();
        assert_eq!(bytes.len(), 13);
        assert_eq!(bytes[12], checksum(&bytes[..12]));
    }
}

#[test]
fn test_decode_foreign_frame() {
    // Page 25 from another sender: cadence 90, power 250, checksum not ours
    let frame = [
        0xA4, 0x09, 0x4E, 0x05, 0x19, 0x10, 90, 0x00, 0x00, 0xFA, 0x00, 0x20, 0x00,
    ];
    assert_eq!(
        decode_trainer_data(&frame),
        TrainerData {
            power: 250,
            cadence: 90
        }
    );
    assert!(matches!(
        AntFrame::parse(&frame),
        Err(FrameError::BadChecksum { .. })
    ));
}

#[test]
fn test_decode_sentinels() {
    assert_eq!(decode_trainer_data(&[0xA4, 0x09]), TrainerData::NO_DATA);
    assert_eq!(decode_trainer_data(&[0u8; 13]), TrainerData::NO_DATA);
    // Our own command frame carries no trainer data
    assert_eq!(
        decode_trainer_data(encode_target_power(100.0).as_bytes()),
        TrainerData::NO_DATA
    );
    assert!(!TrainerData::NO_DATA.is_update());
}
