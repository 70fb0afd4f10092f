//! GATT services, characteristics and notification parsers.
//!
//! Trainers are found by any of FE-C over BLE, FTMS or Cycling Power;
//! heart rate straps by the Heart Rate service.

use uuid::Uuid;

/// FE-C over BLE service
pub const FEC_SERVICE_UUID: Uuid = Uuid::from_u128(0x6e40_fec1_b5a3_f393_e0a9_e50e_24dc_ca9e);
/// FE-C notifications from the trainer (FEC2)
pub const FEC_READ_UUID: Uuid = Uuid::from_u128(0x6e40_fec2_b5a3_f393_e0a9_e50e_24dc_ca9e);
/// FE-C writes to the trainer (FEC3)
pub const FEC_WRITE_UUID: Uuid = Uuid::from_u128(0x6e40_fec3_b5a3_f393_e0a9_e50e_24dc_ca9e);

/// FTMS Service UUID (0x1826)
pub const FTMS_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_1826_0000_1000_8000_0080_5f9b_34fb);

/// Cycling Power Service UUID (0x1818)
pub const CYCLING_POWER_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x0000_1818_0000_1000_8000_0080_5f9b_34fb);

/// Cycling Power Measurement UUID (0x2A63)
pub const CYCLING_POWER_MEASUREMENT_UUID: Uuid =
    Uuid::from_u128(0x0000_2a63_0000_1000_8000_0080_5f9b_34fb);

/// Heart Rate Service UUID (0x180D)
pub const HEART_RATE_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x0000_180d_0000_1000_8000_0080_5f9b_34fb);

/// Heart Rate Measurement UUID (0x2A37)
pub const HEART_RATE_MEASUREMENT_UUID: Uuid =
    Uuid::from_u128(0x0000_2a37_0000_1000_8000_0080_5f9b_34fb);

/// Services that identify a trainer
pub const TRAINER_SERVICES: [Uuid; 3] = [
    FEC_SERVICE_UUID,
    FTMS_SERVICE_UUID,
    CYCLING_POWER_SERVICE_UUID,
];

/// Crank revolutions above this are treated as noise
pub const MAX_CADENCE_RPM: f64 = 200.0;

/// Parsed Cycling Power Measurement notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CyclingPowerData {
    /// Instantaneous power in watts
    pub power_watts: i16,
    /// Cumulative crank revolutions
    pub crank_revolutions: Option<u16>,
    /// Last crank event time (1/1024 s)
    pub last_crank_event_time: Option<u16>,
}

/// Parse Cycling Power Measurement notification.
pub fn parse_cycling_power_measurement(data: &[u8]) -> Option<CyclingPowerData> {
    if data.len() < 4 {
        return None;
    }

    let flags = u16::from_le_bytes([data[0], data[1]]);
    let mut result = CyclingPowerData {
        power_watts: i16::from_le_bytes([data[2], data[3]]),
        ..Default::default()
    };

    let mut offset = 4usize;
    // Pedal power balance (bit 0)
    if flags & 0x0001 != 0 {
        offset += 1;
    }
    // Accumulated torque (bit 2)
    if flags & 0x0004 != 0 {
        offset += 2;
    }
    // Wheel revolution data (bit 4)
    if flags & 0x0010 != 0 {
        offset += 6;
    }
    // Crank revolution data (bit 5)
    if flags & 0x0020 != 0 && data.len() >= offset + 4 {
        result.crank_revolutions = Some(u16::from_le_bytes([data[offset], data[offset + 1]]));
        result.last_crank_event_time =
            Some(u16::from_le_bytes([data[offset + 2], data[offset + 3]]));
    }

    Some(result)
}

/// Parse Heart Rate Measurement notification into bpm.
///
/// 16-bit values are saturated to 255.
pub fn parse_heart_rate_measurement(data: &[u8]) -> Option<u8> {
    let flags = *data.first()?;
    if flags & 0x01 != 0 {
        let bytes = data.get(1..3)?;
        let bpm = u16::from_le_bytes([bytes[0], bytes[1]]);
        Some(bpm.min(u8::MAX as u16) as u8)
    } else {
        data.get(1).copied()
    }
}

/// Cadence from successive cumulative crank readings.
#[derive(Debug, Clone, Default)]
pub struct CrankCadence {
    last: Option<(u16, u16)>,
}

impl CrankCadence {
    /// Feed a reading and get the cadence since the previous one.
    ///
    /// The first reading, a stalled clock and implausible values yield 0.
    pub fn update(&mut self, revolutions: u16, event_time: u16) -> u8 {
        let previous = self.last.replace((revolutions, event_time));
        let Some((last_revs, last_time)) = previous else {
            return 0;
        };

        // Both counters roll over at 16 bits
        let revs = revolutions.wrapping_sub(last_revs);
        let ticks = event_time.wrapping_sub(last_time);
        if ticks == 0 {
            return 0;
        }

        let rpm = revs as f64 * 1024.0 * 60.0 / ticks as f64;
        if rpm > MAX_CADENCE_RPM {
            0
        } else {
            rpm as u8
        }
    }

    /// Forget the previous reading (new connection)
    pub fn reset(&mut self) {
        self.last = None;
    }
}
