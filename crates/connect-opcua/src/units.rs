// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Engineering unit mapping.
//!
//! OPC UA servers describe units with `EUInformation`, whose `unitId` is a
//! UNECE Recommendation 20 common code packed into an `i32`: each ASCII
//! character occupies one byte, most significant first. `"CEL"` becomes
//! `0x43454C` = `4408652`.

/// Unit id meaning "no unit".
pub const NO_UNIT: i32 = 0;

const QUDT_PREFIX: &str = "http://qudt.org/vocab/unit#";
const UNECE_PREFIX: &str = "urn:unece:rec20:";

/// UNECE common code to QUDT unit name.
const KNOWN_UNITS: &[(&str, &str)] = &[
    // temperature
    ("CEL", "DegreeCelsius"),
    ("FAH", "DegreeFahrenheit"),
    ("KEL", "Kelvin"),
    // pressure
    ("PAL", "Pascal"),
    ("KPA", "KiloPascal"),
    ("MPA", "MegaPascal"),
    ("BAR", "Bar"),
    ("MBR", "MilliBar"),
    ("PS", "PoundForcePerSquareInch"),
    // length
    ("MTR", "Meter"),
    ("CMT", "Centimeter"),
    ("MMT", "Millimeter"),
    ("KMT", "Kilometer"),
    // mass
    ("KGM", "Kilogram"),
    ("GRM", "Gram"),
    ("TNE", "MetricTon"),
    // time
    ("SEC", "SecondTime"),
    ("MIN", "MinuteTime"),
    ("HUR", "Hour"),
    // electrical
    ("VLT", "Volt"),
    ("AMP", "Ampere"),
    ("OHM", "Ohm"),
    ("WTT", "Watt"),
    ("KWT", "Kilowatt"),
    ("KWH", "KilowattHour"),
    ("HTZ", "Hertz"),
    // flow and speed
    ("MQH", "CubicMeterPerHour"),
    ("LTR", "Liter"),
    ("MTS", "MeterPerSecond"),
    ("KMH", "KilometerPerHour"),
    ("RPM", "RevolutionPerMinute"),
    // dimensionless
    ("P1", "Percent"),
];

/// Packs a UNECE common code into a unit id.
///
/// ```
/// use connect_opcua::units::encode_unit_code;
///
/// assert_eq!(encode_unit_code("CEL"), 4408652);
/// ```
pub fn encode_unit_code(code: &str) -> i32 {
    code.bytes().fold(0i32, |id, b| (id << 8) | i32::from(b))
}

/// Unpacks a unit id into its UNECE common code.
///
/// Returns `None` when the id does not decode to printable ASCII.
pub fn decode_unit_code(unit_id: i32) -> Option<String> {
    if unit_id <= 0 {
        return None;
    }
    let code: String = unit_id
        .to_be_bytes()
        .iter()
        .skip_while(|b| **b == 0)
        .map(|b| *b as char)
        .collect();
    let printable = code.chars().all(|c| c.is_ascii_alphanumeric());
    (!code.is_empty() && printable).then_some(code)
}

/// Maps a unit id to a measurement unit URI.
///
/// Returns `None` for [`NO_UNIT`]; callers omit the unit entirely.
///
/// ```
/// use connect_opcua::units::{encode_unit_code, unit_label};
///
/// assert_eq!(
///     unit_label(encode_unit_code("CEL")).as_deref(),
///     Some("http://qudt.org/vocab/unit#DegreeCelsius")
/// );
/// assert_eq!(unit_label(0), None);
/// ```
pub fn unit_label(unit_id: i32) -> Option<String> {
    if unit_id == NO_UNIT {
        return None;
    }
    let uri = match decode_unit_code(unit_id) {
        Some(code) => match KNOWN_UNITS.iter().find(|(c, _)| *c == code) {
            Some((_, name)) => format!("{}{}", QUDT_PREFIX, name),
            None => format!("{}{}", UNECE_PREFIX, code),
        },
        None => format!("{}unit:{}", UNECE_PREFIX, unit_id),
    };
    Some(uri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        assert_eq!(encode_unit_code("CEL"), 0x43454C);
        assert_eq!(decode_unit_code(encode_unit_code("KWH")).as_deref(), Some("KWH"));
        assert_eq!(decode_unit_code(encode_unit_code("P1")).as_deref(), Some("P1"));
        assert_eq!(decode_unit_code(0), None);
        assert_eq!(decode_unit_code(-1), None);
    }

    #[test]
    fn test_known_units() {
        assert_eq!(
            unit_label(encode_unit_code("BAR")).as_deref(),
            Some("http://qudt.org/vocab/unit#Bar")
        );
        assert_eq!(
            unit_label(encode_unit_code("RPM")).as_deref(),
            Some("http://qudt.org/vocab/unit#RevolutionPerMinute")
        );
    }

    #[test]
    fn test_unknown_units() {
        assert_eq!(
            unit_label(encode_unit_code("XYZ")).as_deref(),
            Some("urn:unece:rec20:XYZ")
        );
        assert_eq!(unit_label(7).as_deref(), Some("urn:unece:rec20:unit:7"));
    }

    #[test]
    fn test_no_unit() {
        assert_eq!(unit_label(NO_UNIT), None);
    }
}
