use chrono::{DateTime, NaiveDateTime, Utc};
use exif::{Exif, Field, In, Tag, Value};

use crate::geo::Coordinates;

/// Timestamp tags in order of preference: original capture first.
const TIMESTAMP_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

pub(super) fn read_gps(exif: &Exif) -> Option<Coordinates> {
    let lat = read_gps_axis(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, 'S')?;
    let lon = read_gps_axis(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, 'W')?;

    let coords = Coordinates::new(lat, lon);
    if !coords.is_valid() {
        tracing::debug!("Discarding out-of-range GPS {:?}", coords);
        return None;
    }
    Some(coords)
}

fn read_gps_axis(exif: &Exif, value_tag: Tag, ref_tag: Tag, negative: char) -> Option<f64> {
    let field = exif.get_field(value_tag, In::PRIMARY)?;
    let dms = match field.value {
        Value::Rational(ref v) if v.len() >= 3 => v,
        _ => return None,
    };

    let mut parts = [0.0; 3];
    for (part, r) in parts.iter_mut().zip(dms.iter()) {
        if r.denom == 0 {
            return None;
        }
        *part = r.num as f64 / r.denom as f64;
    }
    let value = dms_to_decimal(parts[0], parts[1], parts[2]);

    // A missing hemisphere ref is read as N/E
    let is_negative = exif
        .get_field(ref_tag, In::PRIMARY)
        .and_then(ascii_value)
        .map(|r| r.contains(negative))
        .unwrap_or(false);

    Some(if is_negative { -value } else { value })
}

fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}

pub(super) fn read_timestamp(exif: &Exif) -> Option<DateTime<Utc>> {
    TIMESTAMP_TAGS.iter().find_map(|tag| {
        exif.get_field(*tag, In::PRIMARY)
            .and_then(ascii_value)
            .and_then(|s| parse_exif_datetime(&s))
    })
}

/// Parse an EXIF datetime ("2024:01:15 10:30:45"). EXIF carries no zone, so
/// the value is taken as UTC.
pub(super) fn parse_exif_datetime(s: &str) -> Option<DateTime<Utc>> {
    let cleaned = s.trim().trim_matches('"').replace(['-', '/'], ":");

    // Cameras with no clock set write all-zero or blank dates
    if cleaned.is_empty() || cleaned.starts_with("0000") {
        return None;
    }

    NaiveDateTime::parse_from_str(&cleaned, "%Y:%m:%d %H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc())
}

pub(super) fn read_device(exif: &Exif) -> Option<String> {
    let make = exif.get_field(Tag::Make, In::PRIMARY).and_then(ascii_value);
    let model = exif.get_field(Tag::Model, In::PRIMARY).and_then(ascii_value);

    match (make, model) {
        (Some(make), Some(model)) => Some(format!("{} {}", make, model)),
        (Some(one), None) | (None, Some(one)) => Some(one),
        (None, None) => None,
    }
}

fn ascii_value(field: &Field) -> Option<String> {
    let text = match field.value {
        Value::Ascii(ref parts) => parts
            .iter()
            .map(|p| String::from_utf8_lossy(p).to_string())
            .collect::<Vec<_>>()
            .join(" "),
        _ => field.display_value().to_string(),
    };

    let text = text.trim_matches(|c: char| c == '"' || c == '\0' || c.is_whitespace());
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
