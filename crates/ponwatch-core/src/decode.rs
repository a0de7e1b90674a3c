// ── Field decoders ──
//
// Pure functions from raw agent values to domain values. None of these
// panic; every failure is a `DecodeError` the caller absorbs by leaving the
// field empty.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use ponwatch_snmp::RawValue;

use crate::error::DecodeError;
use crate::model::{DeviceTimestamp, PhaseState, TerminalStatus, TimeSpan};

/// Readings at or above this are an unpopulated or faulty port.
pub const POWER_CEILING_DBM: f64 = 100.0;

const POWER_SCALE: f64 = 0.002;
const POWER_OFFSET: f64 = 30.0;

/// Phase code the OLT reports for a working ONU.
const WORKING_PHASE: i64 = 4;

fn kind(value: &RawValue) -> &'static str {
    match value {
        RawValue::Integer(_) => "integer",
        RawValue::Unsigned(_) => "unsigned",
        RawValue::OctetString(_) => "octet string",
        RawValue::Text(_) => "text",
        RawValue::Missing => "no such object",
    }
}

fn integer(value: &RawValue) -> Result<i64, DecodeError> {
    value.as_i64().ok_or(DecodeError::WrongType {
        expected: "integer",
        got: kind(value),
    })
}

/// Trailing numeric component of an OID: the ONU id in every per-ONU table.
pub fn terminal_id_from_oid(oid: &str) -> Result<u32, DecodeError> {
    let last = oid.trim().rsplit('.').next().unwrap_or_default();
    if last.is_empty() {
        return Err(DecodeError::Empty);
    }
    last.parse()
        .map_err(|_| DecodeError::Malformed(format!("OID {oid} does not end in an id")))
}

/// A string-typed value with control bytes and padding removed.
pub fn display_string(value: &RawValue) -> Result<String, DecodeError> {
    let bytes = value.as_bytes().ok_or(DecodeError::WrongType {
        expected: "octet string",
        got: kind(value),
    })?;
    let text: String = String::from_utf8_lossy(bytes)
        .chars()
        .filter(|c| !c.is_control() && *c != '\u{fffd}')
        .collect();
    let text = text.trim();
    if text.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(text.to_owned())
}

/// Vendor serial: `1,` prefixes are dropped; an 8-octet value is four ASCII
/// vendor characters followed by four binary octets rendered as hex.
pub fn serial_number(value: &RawValue) -> Result<String, DecodeError> {
    let bytes = value.as_bytes().ok_or(DecodeError::WrongType {
        expected: "octet string",
        got: kind(value),
    })?;
    let bytes = bytes.strip_prefix(b"1,").unwrap_or(bytes);

    if let [v0, v1, v2, v3, rest @ ..] = bytes {
        let vendor = [*v0, *v1, *v2, *v3];
        let printable_rest = rest.iter().all(|b| b.is_ascii_graphic());
        if rest.len() == 4 && vendor.iter().all(u8::is_ascii_alphanumeric) && !printable_rest {
            let mut serial: String = vendor.iter().map(|b| char::from(*b)).collect();
            for b in rest {
                serial.push_str(&format!("{b:02X}"));
            }
            return Ok(serial);
        }
    }

    display_string(&RawValue::OctetString(bytes.to_vec()))
}

/// Online for the working phase code, Offline for anything else.
pub fn status(value: &RawValue) -> Result<TerminalStatus, DecodeError> {
    let code = integer(value)?;
    Ok(if code == WORKING_PHASE {
        TerminalStatus::Online
    } else {
        TerminalStatus::Offline
    })
}

pub fn phase_state(value: &RawValue) -> Result<PhaseState, DecodeError> {
    integer(value).map(PhaseState::from_code)
}

/// Optical power in dBm, two decimals. Numeric readings are raw agent units
/// (`raw * 0.002 - 30`); text readings are already in dBm. Either way a
/// result at or above the sanity ceiling is rejected.
pub fn optical_power(value: &RawValue) -> Result<f64, DecodeError> {
    let dbm = match value {
        RawValue::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| DecodeError::Malformed(e.to_string()))?,
        other => {
            let raw = integer(other)?;
            let raw = i32::try_from(raw).map_err(|_| DecodeError::OutOfRange(raw.to_string()))?;
            f64::from(raw) * POWER_SCALE - POWER_OFFSET
        }
    };
    let dbm = (dbm * 100.0).round() / 100.0;
    if !dbm.is_finite() || dbm >= POWER_CEILING_DBM {
        return Err(DecodeError::OutOfRange(format!("{dbm:.2} dBm")));
    }
    Ok(dbm)
}

/// SNMP DateAndTime (8 or 11 octets) to a device timestamp. Text values in
/// `YYYY-MM-DD HH:MM:SS` form are accepted as-is.
pub fn device_timestamp(value: &RawValue) -> Result<DeviceTimestamp, DecodeError> {
    let bytes = match value {
        RawValue::Text(s) => {
            return s
                .parse()
                .map_err(|e: chrono::ParseError| DecodeError::Malformed(e.to_string()));
        }
        RawValue::OctetString(b) => b.as_slice(),
        other => {
            return Err(DecodeError::WrongType {
                expected: "DateAndTime",
                got: kind(other),
            });
        }
    };

    if bytes.len() != 8 && bytes.len() != 11 {
        return Err(DecodeError::Malformed(format!(
            "DateAndTime must be 8 or 11 octets, got {}",
            bytes.len()
        )));
    }
    let &[y0, y1, month, day, hour, minute, second, ..] = bytes else {
        return Err(DecodeError::Empty);
    };
    let year = i32::from(u16::from_be_bytes([y0, y1]));
    NaiveDate::from_ymd_opt(year, u32::from(month), u32::from(day))
        .and_then(|date| date.and_hms_opt(u32::from(hour), u32::from(minute), u32::from(second)))
        .map(DeviceTimestamp)
        .ok_or_else(|| {
            DecodeError::Malformed(format!(
                "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02} is not a valid time"
            ))
        })
}

/// `"D days H hours M minutes S seconds"`.
pub fn format_duration(span: TimeDelta) -> String {
    let total = span.num_seconds();
    let days = total / 86_400;
    let hours = (total / 3_600) % 24;
    let minutes = (total / 60) % 60;
    let seconds = total % 60;
    format!("{days} days {hours} hours {minutes} minutes {seconds} seconds")
}

/// Offline reason code to its vendor name; string values pass through.
pub fn offline_reason(value: &RawValue) -> Result<String, DecodeError> {
    match value {
        RawValue::OctetString(_) | RawValue::Text(_) => display_string(value),
        other => {
            let name = match integer(other)? {
                2 => "LOS",
                3 => "LOSi",
                4 => "LOFi",
                5 => "sfi",
                6 => "loai",
                7 => "loami",
                8 => "AuthFail",
                9 => "PowerOff",
                10 => "deactiveSucc",
                11 => "deactiveFail",
                12 => "Reboot",
                13 => "Shutdown",
                _ => "Unknown",
            };
            Ok(name.to_owned())
        }
    }
}

/// Fibre distance in metres.
pub fn optical_distance(value: &RawValue) -> Result<i64, DecodeError> {
    match value {
        RawValue::OctetString(_) => display_string(value)?
            .parse()
            .map_err(|e: std::num::ParseIntError| DecodeError::Malformed(e.to_string())),
        other => {
            let metres = integer(other)?;
            if metres < 0 {
                return Err(DecodeError::OutOfRange(metres.to_string()));
            }
            Ok(metres)
        }
    }
}

// ── Derived fields ──────────────────────────────────────────────────

/// Time since the ONU last came online. `clock_offset` corrects for the
/// device clock running in a different zone than the poller.
pub fn uptime(last_online: DeviceTimestamp, now: NaiveDateTime, clock_offset: TimeDelta) -> TimeSpan {
    TimeSpan(now - last_online.0 + clock_offset)
}

/// How long the ONU was down before its last return. Absent when the last
/// offline instant is after the last online instant.
pub fn last_down_duration(
    last_online: DeviceTimestamp,
    last_offline: DeviceTimestamp,
) -> Option<TimeSpan> {
    let span = TimeSpan(last_online.0 - last_offline.0);
    (!span.is_negative()).then_some(span)
}
