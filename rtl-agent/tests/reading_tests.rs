//! # Reading parser tests
//!
//! Lines come straight off `rtl_433 -F json`; anything that is not a complete
//! JSON object with the five persisted fields must be rejected.

use rtl_agent::comms::{Reading, ReadingError};

const GOOD: &str = r#"{"time" : "@0.000000s", "model" : "WG-PB12V1", "id" : 8, "temperature_C" : 20.900, "io" : "111111110011001001100001011010001111111101001100"}"#;

#[test]
fn parses_wg_pb12v1_packet() {
    let r = Reading::parse(GOOD.as_bytes()).unwrap();
    assert_eq!(r.timestamp(), "@0.000000s");
    assert_eq!(r.model(), "WG-PB12V1");
    assert_eq!(r.sensor_id(), 8);
    assert_eq!(r.temperature_c(), 20.9);
    assert_eq!(r.io(), "111111110011001001100001011010001111111101001100");
}

#[test]
fn extra_decoder_fields_are_ignored() {
    let line = r#"{"time":"@1.5s","model":"WG-PB12V1","id":3,"temperature_C":-4.2,"io":"0101","mic":"CRC","rssi":-12.1}"#;
    let r: Reading = line.parse().unwrap();
    assert_eq!(r.sensor_id(), 3);
    assert_eq!(r.temperature_c(), -4.2);
}

#[test]
fn empty_and_truncated_lines_are_rejected() {
    let positional = r#"["@0s","WG-PB12V1",8,20.9,"0101"]"#;
    for bad in ["", "   ", "{", &GOOD[..GOOD.len() - 10], "not json at all", "null", positional] {
        assert!(
            matches!(Reading::parse(bad.as_bytes()), Err(ReadingError::Json(_))),
            "accepted {bad:?}"
        );
    }
}

#[test]
fn missing_required_field_is_rejected() {
    let no_io = r#"{"time":"@0s","model":"WG-PB12V1","id":8,"temperature_C":20.9}"#;
    let no_temp = r#"{"time":"@0s","model":"WG-PB12V1","id":8,"io":"01"}"#;
    assert!(Reading::parse(no_io.as_bytes()).is_err());
    assert!(Reading::parse(no_temp.as_bytes()).is_err());
}

#[test]
fn wrong_field_type_is_rejected() {
    let line = r#"{"time":"@0s","model":"WG-PB12V1","id":"eight","temperature_C":20.9,"io":"01"}"#;
    assert!(Reading::parse(line.as_bytes()).is_err());
}

#[test]
fn invalid_utf8_is_rejected() {
    let mut raw = GOOD.as_bytes().to_vec();
    raw[2] = 0xFF;
    assert!(matches!(Reading::parse(&raw), Err(ReadingError::Utf8(_))));
}
