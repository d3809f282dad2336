//! geo.rs — Distances, bearings and unit helpers for AIS positions
//!
//! Bearings use a planar approximation that is good enough for the short
//! segments between AIS reports. It breaks down near the poles and across
//! the antimeridian.

use chrono::Duration;

use crate::error::{Error, Result};

/// Mean earth radius in meters.
pub const EARTH_RADIUS: f64 = 6_370_986.0;

pub const METERS_PER_NM: f64 = 1852.0;

/// Haversine distance in meters.
pub fn great_circle_distance(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let (lon1, lat1, lon2, lat2) = (lon1.to_radians(), lat1.to_radians(), lon2.to_radians(), lat2.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let d = (dlat * 0.5).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon * 0.5).sin().powi(2);
    2.0 * EARTH_RADIUS * d.sqrt().atan2((1.0 - d).sqrt())
}

/// Bearing from the first to the second position, degrees in [0, 360).
pub fn bearing(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    ((lon2 - lon1).atan2(lat2 - lat1).to_degrees() + 360.0) % 360.0
}

/// Circular mean of two bearings.
pub fn average_bearing(b1: f64, b2: f64) -> f64 {
    let (mut b1, mut b2) = (b1, b2);
    if (b1 - b2).abs() > 180.0 {
        if b1 < b2 {
            b1 += 360.0;
        } else {
            b2 += 360.0;
        }
    }
    ((b1 + b2) / 2.0) % 360.0
}

pub fn m_to_nm(meters: f64) -> f64 {
    meters / METERS_PER_NM
}

/// Fractional hours, at microsecond precision.
pub fn hours(duration: Duration) -> f64 {
    match duration.num_microseconds() {
        Some(us) => us as f64 / 3_600_000_000.0,
        None => duration.num_seconds() as f64 / 3600.0,
    }
}

/// Walks `items` yielding `(past, current, future)`, where `past` holds up to
/// `past_size` immediately preceding items and `future` up to `future_size`
/// following ones.
pub fn surrounding_context<T>(
    items: &[T],
    past_size: usize,
    future_size: usize,
) -> Result<impl Iterator<Item = (&[T], &T, &[T])>> {
    if past_size == 0 {
        return Err(Error::InvalidInput("past context size must be at least 1".into()));
    }
    Ok(items.iter().enumerate().map(move |(i, current)| {
        let past = &items[i.saturating_sub(past_size)..i];
        let future = &items[i + 1..(i + 1 + future_size).min(items.len())];
        (past, current, future)
    }))
}
