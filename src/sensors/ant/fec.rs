//! ANT+ FE-C (Fitness Equipment Control) Profile
//!
//! Control pages sent to the trainer and the trainer data page read back.
//! Device Type: 17

use super::{AntFrame, FRAME_LEN, SYNC_BYTE};

/// Basic resistance (Page 48 / 0x30)
pub const PAGE_BASIC_RESISTANCE: u8 = 0x30;
/// Target power, ERG mode (Page 49 / 0x31)
pub const PAGE_TARGET_POWER: u8 = 0x31;
/// Wind resistance (Page 50 / 0x32)
pub const PAGE_WIND_RESISTANCE: u8 = 0x32;
/// Track resistance, simulation mode (Page 51 / 0x33)
pub const PAGE_TRACK_RESISTANCE: u8 = 0x33;
/// User configuration (Page 55 / 0x37)
pub const PAGE_USER_CONFIG: u8 = 0x37;
/// Specific trainer data (Page 25 / 0x19)
pub const PAGE_TRAINER_DATA: u8 = 0x19;

/// Rolling resistance sent with every track resistance page
pub const TRACK_CRR: f64 = 0.004;
/// Wheel diameter reported in the user configuration page (m)
pub const WHEEL_DIAMETER_M: f64 = 0.7;

/// FE-C control data pages (page number first, 8 bytes)
pub mod commands {
    use super::*;

    /// Basic resistance control, 0.5% resolution
    pub fn set_basic_resistance(resistance_percent: f64) -> [u8; 8] {
        let percent = if resistance_percent.is_finite() {
            resistance_percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        let resistance = (percent / 0.5).round() as u8;
        [PAGE_BASIC_RESISTANCE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, resistance]
    }

    /// Target power control, 0.25 W resolution
    pub fn set_target_power(power_watts: f64) -> [u8; 8] {
        // Float-to-int casts saturate: negatives and NaN become 0
        let raw = (power_watts / 0.25).round() as u16;
        let bytes = raw.to_le_bytes();
        [PAGE_TARGET_POWER, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, bytes[0], bytes[1]]
    }

    /// Wind resistance: 0.51 kg/m coefficient, no wind, no drafting
    pub fn set_wind_resistance() -> [u8; 8] {
        let coefficient = 51; // 0.51 kg/m in 0.01 units
        let wind_speed = 127; // 0 km/h, offset by 127
        let drafting = 100; // 1.00 in 0.01 units
        [PAGE_WIND_RESISTANCE, 0, 0, 0, 0, coefficient, wind_speed, drafting]
    }

    /// Track resistance (grade/slope) simulation
    pub fn set_track_resistance(grade_percent: f64) -> [u8; 8] {
        let grade = if grade_percent.is_finite() {
            grade_percent
        } else {
            0.0
        };
        // -200% to +200% with 0.01% resolution (0x4E20 = 20000 = 0%)
        let grade_bytes = (((grade + 200.0) / 0.01).round() as u16).to_le_bytes();
        let crr = (TRACK_CRR / 0.00005).round() as u8;

        [
            PAGE_TRACK_RESISTANCE,
            0xFF,
            0xFF,
            0xFF,
            0xFF,
            grade_bytes[0],
            grade_bytes[1],
            crr,
        ]
    }

    /// User configuration: rider and bike weight
    pub fn set_user_config(user_weight_kg: f64, bike_weight_kg: f64) -> [u8; 8] {
        let user_weight = ((user_weight_kg / 0.01).round() as u16).to_le_bytes();
        // 12-bit field, 0.05 kg resolution
        let bike_weight = ((bike_weight_kg / 0.05).round() as u16) & 0x0FFF;
        let wheel_diameter = (WHEEL_DIAMETER_M / 0.01).round() as u8;

        [
            PAGE_USER_CONFIG,
            user_weight[0],
            user_weight[1],
            0xFF, // Reserved
            (((bike_weight & 0x0F) << 4) as u8) | 0x0F,
            (bike_weight >> 4) as u8,
            wheel_diameter,
            0x00, // Gear ratio not set
        ]
    }
}

/// Page 48 frame
pub fn encode_basic_resistance(resistance_percent: f64) -> AntFrame {
    AntFrame::from_page(commands::set_basic_resistance(resistance_percent))
}

/// Page 49 frame
pub fn encode_target_power(power_watts: f64) -> AntFrame {
    AntFrame::from_page(commands::set_target_power(power_watts))
}

/// Page 50 frame
pub fn encode_wind_resistance() -> AntFrame {
    AntFrame::from_page(commands::set_wind_resistance())
}

/// Page 51 frame
pub fn encode_track_resistance(grade_percent: f64) -> AntFrame {
    AntFrame::from_page(commands::set_track_resistance(grade_percent))
}

/// Page 55 frame
pub fn encode_user_config(user_weight_kg: f64, bike_weight_kg: f64) -> AntFrame {
    AntFrame::from_page(commands::set_user_config(user_weight_kg, bike_weight_kg))
}

/// Trainer data page (Page 25 / 0x19)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainerDataPage {
    /// Update event count
    pub event_count: u8,
    /// Instantaneous cadence (rpm)
    pub cadence: u8,
    /// Accumulated power in watts
    pub accumulated_power: u16,
    /// Instantaneous power in watts (12 bits)
    pub instantaneous_power: u16,
    /// Trainer status bits (upper nibble of the power field)
    pub trainer_status: u8,
}

impl TrainerDataPage {
    /// Parse an 8-byte data page
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < 8 || data[0] != PAGE_TRAINER_DATA {
            return None;
        }

        // Power is 12 bits, status in upper 4 bits of byte 6
        let power_and_status = u16::from_le_bytes([data[5], data[6]]);

        Some(Self {
            event_count: data[1],
            cadence: data[2],
            accumulated_power: u16::from_le_bytes([data[3], data[4]]),
            instantaneous_power: power_and_status & 0x0FFF,
            trainer_status: (power_and_status >> 12) as u8,
        })
    }
}

/// Power and cadence read from a trainer notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrainerData {
    /// Watts, or -1 when the message carried no power
    pub power: i16,
    pub cadence: u8,
}

impl TrainerData {
    /// Value returned for messages that carry no trainer data
    pub const NO_DATA: TrainerData = TrainerData {
        power: -1,
        cadence: 0,
    };

    /// Whether this carries a real reading
    pub fn is_update(&self) -> bool {
        self.power >= 0
    }
}

/// Decode a trainer notification.
///
/// Frames that are short, lack the sync byte or carry any page other than
/// 25 yield [`TrainerData::NO_DATA`]. The checksum is not verified: some
/// trainers send frames that fail it but carry valid data.
pub fn decode_trainer_data(bytes: &[u8]) -> TrainerData {
    if bytes.len() < FRAME_LEN || bytes[0] != SYNC_BYTE {
        return TrainerData::NO_DATA;
    }

    match TrainerDataPage::parse(&bytes[4..12]) {
        Some(page) => TrainerData {
            power: page.instantaneous_power as i16,
            cadence: page.cadence,
        },
        None => TrainerData::NO_DATA,
    }
}
