//! Advertisement-data (AD structure) parsing.
//!
//! Legacy advertising payloads are a sequence of `{len, type, data}`
//! structures. We care about two things: whether a peripheral
//! advertises the heart-rate service, and what it calls itself.

use crate::ble::{DeviceName, Uuid};

// AD types from the Core Specification Supplement.
const AD_UUID16_INCOMPLETE: u8 = 0x02;
const AD_UUID16_COMPLETE: u8 = 0x03;
const AD_UUID128_INCOMPLETE: u8 = 0x06;
const AD_UUID128_COMPLETE: u8 = 0x07;
const AD_NAME_SHORTENED: u8 = 0x08;
const AD_NAME_COMPLETE: u8 = 0x09;

/// Check whether raw advertisement data lists the given service UUID.
///
/// Both the incomplete and complete UUID list types are checked; short
/// and long UUIDs travel in separate AD structures.
pub fn advertises_service(data: &[u8], service: Uuid) -> bool {
    let mut i = 0;
    while i < data.len() {
        let len = data[i] as usize;
        if len == 0 || i + len >= data.len() {
            break;
        }
        let ad_type = data[i + 1];
        let payload = &data[i + 2..i + 1 + len];

        match service {
            Uuid::Short(v) if ad_type == AD_UUID16_INCOMPLETE || ad_type == AD_UUID16_COMPLETE => {
                let le = v.to_le_bytes();
                if payload.chunks_exact(2).any(|chunk| chunk == le) {
                    return true;
                }
            }
            Uuid::Long(v) if ad_type == AD_UUID128_INCOMPLETE || ad_type == AD_UUID128_COMPLETE => {
                // 128-bit UUIDs are advertised least-significant byte
                // first, i.e. reversed relative to the canonical form.
                for chunk in payload.chunks_exact(16) {
                    let mut bytes = [0u8; 16];
                    bytes.copy_from_slice(chunk);
                    if u128::from_le_bytes(bytes) == v {
                        return true;
                    }
                }
            }
            _ => {}
        }
        i += len + 1;
    }
    false
}

/// Extract the complete/shortened local name from advertisement data.
pub fn extract_device_name(data: &[u8]) -> DeviceName {
    let mut i = 0;
    while i < data.len() {
        let len = data[i] as usize;
        if len == 0 || i + len >= data.len() {
            break;
        }
        let ad_type = data[i + 1];
        if ad_type == AD_NAME_SHORTENED || ad_type == AD_NAME_COMPLETE {
            let name_bytes = &data[i + 2..i + 1 + len];
            let mut name = DeviceName::new();
            for &b in name_bytes {
                if name.push(b as char).is_err() {
                    break;
                }
            }
            return name;
        }
        i += len + 1;
    }

    let mut s = DeviceName::new();
    let _ = s.push_str("Unknown");
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HEART_RATE_SERVICE;

    /// The vendor service UUID, reversed into advertising byte order.
    fn hrs_uuid_le() -> [u8; 16] {
        match HEART_RATE_SERVICE {
            Uuid::Long(v) => v.to_le_bytes(),
            Uuid::Short(_) => unreachable!(),
        }
    }

    #[test]
    fn detects_128bit_service_uuid() {
        let mut ad = [0u8; 18];
        ad[0] = 17; // len
        ad[1] = AD_UUID128_COMPLETE;
        ad[2..18].copy_from_slice(&hrs_uuid_le());
        assert!(advertises_service(&ad, HEART_RATE_SERVICE));
    }

    #[test]
    fn detects_128bit_service_uuid_in_incomplete_list() {
        let mut ad = [0u8; 18];
        ad[0] = 17;
        ad[1] = AD_UUID128_INCOMPLETE;
        ad[2..18].copy_from_slice(&hrs_uuid_le());
        assert!(advertises_service(&ad, HEART_RATE_SERVICE));
    }

    #[test]
    fn rejects_different_128bit_uuid() {
        let mut ad = [0u8; 18];
        ad[0] = 17;
        ad[1] = AD_UUID128_COMPLETE;
        ad[2..18].copy_from_slice(&0xdeadbeef_u128.to_le_bytes());
        assert!(!advertises_service(&ad, HEART_RATE_SERVICE));
    }

    #[test]
    fn detects_16bit_service_uuid() {
        // Standard heart-rate service assigned number, little-endian.
        let ad = [0x03, AD_UUID16_COMPLETE, 0x0D, 0x18];
        assert!(advertises_service(&ad, Uuid::Short(0x180D)));
    }

    #[test]
    fn detects_16bit_uuid_among_multiple() {
        let ad = [
            0x07,
            AD_UUID16_COMPLETE,
            0x0F,
            0x18, // Battery
            0x0D,
            0x18, // Heart Rate
            0x01,
            0x18, // GATT
        ];
        assert!(advertises_service(&ad, Uuid::Short(0x180D)));
    }

    #[test]
    fn short_uuid_not_matched_against_long_lists() {
        let mut ad = [0u8; 18];
        ad[0] = 17;
        ad[1] = AD_UUID128_COMPLETE;
        ad[2..18].copy_from_slice(&hrs_uuid_le());
        assert!(!advertises_service(&ad, Uuid::Short(0x180D)));
    }

    #[test]
    fn empty_advertisement() {
        assert!(!advertises_service(&[], HEART_RATE_SERVICE));
    }

    #[test]
    fn malformed_zero_length_structure() {
        assert!(!advertises_service(&[0x00], HEART_RATE_SERVICE));
    }

    #[test]
    fn truncated_structure_does_not_panic() {
        // Declared length runs past the end of the payload.
        let ad = [0x11, AD_UUID128_COMPLETE, 0x01, 0x02];
        assert!(!advertises_service(&ad, HEART_RATE_SERVICE));
    }

    #[test]
    fn extracts_complete_local_name() {
        let ad = [
            0x09,
            AD_NAME_COMPLETE,
            b'P',
            b'o',
            b'l',
            b'a',
            b'r',
            b' ',
            b'H',
            b'9',
        ];
        assert_eq!(extract_device_name(&ad).as_str(), "Polar H9");
    }

    #[test]
    fn extracts_shortened_local_name() {
        let ad = [0x05, AD_NAME_SHORTENED, b'H', b'R', b'M', b'x'];
        assert_eq!(extract_device_name(&ad).as_str(), "HRMx");
    }

    #[test]
    fn name_defaults_to_unknown() {
        let ad = [0x02, 0x01, 0x06]; // Flags only
        assert_eq!(extract_device_name(&ad).as_str(), "Unknown");
    }

    #[test]
    fn name_truncated_to_capacity() {
        let mut ad = [0u8; 40];
        ad[0] = 35;
        ad[1] = AD_NAME_COMPLETE;
        for b in ad.iter_mut().skip(2).take(34) {
            *b = b'X';
        }
        let name = extract_device_name(&ad);
        assert_eq!(name.len(), crate::config::MAX_DEVICE_NAME_LEN);
    }
}
