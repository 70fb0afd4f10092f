//! Unit tests for BLE characteristic parsing

use ergsim::sensors::gatt::{
    parse_cycling_power_measurement, parse_heart_rate_measurement, CrankCadence,
};

#[test]
fn test_cycling_power_with_crank_data() {
    // Flags: crank revolution data present
    let data = [0x20, 0x00, 0x2C, 0x01, 0x0A, 0x00, 0x00, 0x04];
    let parsed = parse_cycling_power_measurement(&data).unwrap();
    assert_eq!(parsed.power_watts, 300);
    assert_eq!(parsed.crank_revolutions, Some(10));
    assert_eq!(parsed.last_crank_event_time, Some(1024));
}

#[test]
fn test_cycling_power_truncated_crank_data() {
    let data = [0x20, 0x00, 0xC8, 0x00, 0x0A];
    let parsed = parse_cycling_power_measurement(&data).unwrap();
    assert_eq!(parsed.power_watts, 200);
    assert_eq!(parsed.crank_revolutions, None);
}

#[test]
fn test_heart_rate_8_and_16_bit() {
    assert_eq!(parse_heart_rate_measurement(&[0x00, 142]), Some(142));
    assert_eq!(parse_heart_rate_measurement(&[0x01, 0x9B, 0x00]), Some(155));
    assert_eq!(parse_heart_rate_measurement(&[0x01, 0x9B]), None);
    assert_eq!(parse_heart_rate_measurement(&[]), None);
}

#[test]
fn test_cadence_from_crank_events() {
    let mut cadence = CrankCadence::default();
    assert_eq!(cadence.update(100, 0), 0);
    // 1.5 revolutions per second
    assert_eq!(cadence.update(103, 2048), 90);
    // Implausible jump is rejected
    assert_eq!(cadence.update(150, 3072), 0);
}
