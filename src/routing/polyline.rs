//! Encoded polyline decoding.
//!
//! Google returns route geometry in the compact encoded polyline format; it is
//! decoded here, at the provider boundary, into plain points.

use crate::geometry::Point;
use crate::{Result, TrackError};

/// Coordinate precision used by the Directions API (5 decimal places)
pub const DEFAULT_PRECISION: i32 = 5;

/// Decode an encoded polyline into points
pub fn decode(encoded: &str, precision: i32) -> Result<Vec<Point>> {
    let factor = 10_f64.powi(precision);
    let bytes = encoded.as_bytes();

    let mut points = Vec::new();
    let mut index = 0;
    let mut lat = 0_i64;
    let mut lng = 0_i64;

    while index < bytes.len() {
        let (delta_lat, next) = decode_value(bytes, index)?;
        let (delta_lng, next) = decode_value(bytes, next)?;
        index = next;

        lat += delta_lat;
        lng += delta_lng;
        points.push(Point::new(lat as f64 / factor, lng as f64 / factor));
    }

    Ok(points)
}

fn decode_value(bytes: &[u8], mut index: usize) -> Result<(i64, usize)> {
    let mut result = 0_i64;
    let mut shift = 0;

    loop {
        let byte = *bytes
            .get(index)
            .ok_or_else(|| TrackError::parse("truncated polyline"))?;
        if !(63..=126).contains(&byte) {
            return Err(TrackError::parse(format!(
                "invalid polyline character {:?} at {index}",
                byte as char
            )));
        }
        index += 1;

        let chunk = i64::from(byte - 63);
        result |= (chunk & 0x1f) << shift;
        shift += 5;

        if chunk < 0x20 {
            break;
        }
        if shift > 60 {
            return Err(TrackError::parse("polyline value overflow"));
        }
    }

    let value = if result & 1 == 0 {
        result >> 1
    } else {
        !(result >> 1)
    };
    Ok((value, index))
}
