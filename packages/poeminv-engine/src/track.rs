//! track.rs — AIS positions, the segments between them, and track sanitization
//!
//! Speeds are in knots, bearings in degrees from north. `tide_bearing` is the
//! direction the water flows towards: 0 means it flows from south to north.

use std::cell::Cell;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::geo::{self, average_bearing, bearing, great_circle_distance, m_to_nm};

/// Upper bound for speeds derived from position reports.
pub const MAX_CALCULATED_SPEED: f64 = 16.0;

// ── Position ──────────────────────────────────────────────────────────────────

/// One validated position report.
///
/// Speed through water is derived from sog, cog and the tide unless it was
/// given with [`Position::with_stw`]. It is computed on first read and
/// recomputed after either tide setter runs, which also drops a given value.
#[derive(Debug, Clone)]
pub struct Position {
    ts: DateTime<Utc>,
    lon: f64,
    lat: f64,
    sog: f64,
    cog: f64,
    heading: f64,
    tide_flow: f64,
    tide_bearing: f64,
    stw: Cell<Option<f64>>,
}

impl Position {
    /// A position in still water.
    pub fn new(ts: DateTime<Utc>, lon: f64, lat: f64, sog: f64, cog: f64, heading: f64) -> Result<Self> {
        Ok(Self {
            ts,
            lon: longitude(lon)?,
            lat: latitude(lat)?,
            sog: speed("sog", sog)?,
            cog: bearing_value("cog", cog)?,
            heading: bearing_value("heading", heading)?,
            tide_flow: 0.0,
            tide_bearing: 0.0,
            stw: Cell::new(None),
        })
    }

    pub fn with_tide(mut self, tide_flow: f64, tide_bearing: f64) -> Result<Self> {
        self.set_tide_flow(tide_flow)?;
        self.set_tide_bearing(tide_bearing)?;
        Ok(self)
    }

    /// Uses a known speed through water instead of deriving it.
    pub fn with_stw(self, stw: f64) -> Result<Self> {
        self.stw.set(Some(speed("stw", stw)?));
        Ok(self)
    }

    pub fn ts(&self) -> DateTime<Utc> {
        self.ts
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn sog(&self) -> f64 {
        self.sog
    }

    pub fn cog(&self) -> f64 {
        self.cog
    }

    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn tide_flow(&self) -> f64 {
        self.tide_flow
    }

    pub fn tide_bearing(&self) -> f64 {
        self.tide_bearing
    }

    pub fn set_tide_flow(&mut self, tide_flow: f64) -> Result<()> {
        self.tide_flow = speed("tide_flow", tide_flow)?;
        self.stw.set(None);
        Ok(())
    }

    pub fn set_tide_bearing(&mut self, tide_bearing: f64) -> Result<()> {
        self.tide_bearing = bearing_value("tide_bearing", tide_bearing)?;
        self.stw.set(None);
        Ok(())
    }

    /// Speed through water in knots.
    pub fn stw(&self) -> f64 {
        if let Some(stw) = self.stw.get() {
            return stw;
        }
        let stw = speed_through_water(self.sog, self.cog, self.tide_flow, self.tide_bearing);
        self.stw.set(Some(stw));
        stw
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.ts == other.ts
            && self.lon == other.lon
            && self.lat == other.lat
            && self.sog == other.sog
            && self.cog == other.cog
            && self.heading == other.heading
            && self.tide_flow == other.tide_flow
            && self.tide_bearing == other.tide_bearing
    }
}

/// Law of cosines over the ground and tide vectors.
fn speed_through_water(sog: f64, cog: f64, tide_flow: f64, tide_bearing: f64) -> f64 {
    if tide_flow == 0.0 {
        return sog;
    }
    let cos_angle = (cog - tide_bearing).to_radians().cos();
    (sog.powi(2) + tide_flow.powi(2) - 2.0 * sog * tide_flow * cos_angle)
        .max(0.0)
        .sqrt()
}

fn longitude(lon: f64) -> Result<f64> {
    if (-180.0..180.0).contains(&lon) {
        Ok(lon)
    } else {
        Err(Error::InvalidValue(format!("longitude must be in [-180, 180), got {lon}")))
    }
}

fn latitude(lat: f64) -> Result<f64> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(lat)
    } else {
        Err(Error::InvalidValue(format!("latitude must be in [-90, 90], got {lat}")))
    }
}

fn speed(name: &str, value: f64) -> Result<f64> {
    if value >= 0.0 {
        Ok(value)
    } else {
        Err(Error::InvalidValue(format!("{name} must be non-negative, got {value}")))
    }
}

fn bearing_value(name: &str, value: f64) -> Result<f64> {
    if (0.0..360.0).contains(&value) {
        Ok(value)
    } else {
        Err(Error::InvalidValue(format!("{name} must be in [0, 360), got {value}")))
    }
}

/// Converts epoch seconds, at millisecond precision.
pub fn timestamp(epoch_seconds: f64) -> Result<DateTime<Utc>> {
    if !epoch_seconds.is_finite() {
        return Err(Error::InvalidValue(format!("timestamp must be finite, got {epoch_seconds}")));
    }
    DateTime::from_timestamp_millis((epoch_seconds * 1000.0).round() as i64)
        .ok_or_else(|| Error::InvalidValue(format!("timestamp out of range: {epoch_seconds}")))
}

// ── Segment ───────────────────────────────────────────────────────────────────

/// The connection between two consecutive positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment<'a> {
    start: &'a Position,
    end: &'a Position,
    /// meters
    distance: f64,
}

impl<'a> Segment<'a> {
    /// Distance is the great-circle distance between the positions.
    pub fn new(start: &'a Position, end: &'a Position) -> Result<Self> {
        let distance = great_circle_distance(start.lon, start.lat, end.lon, end.lat);
        Self::with_distance(start, end, distance)
    }

    /// Uses an already known distance in meters.
    pub fn with_distance(start: &'a Position, end: &'a Position, distance: f64) -> Result<Self> {
        if start.ts > end.ts {
            return Err(Error::InvalidValue("segment start must not be after its end".into()));
        }
        Ok(Self { start, end, distance: non_negative_distance(distance)? })
    }

    pub fn start(&self) -> &'a Position {
        self.start
    }

    pub fn end(&self) -> &'a Position {
        self.end
    }

    /// Meters.
    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn duration(&self) -> Duration {
        self.end.ts - self.start.ts
    }

    pub fn hours(&self) -> f64 {
        geo::hours(self.duration())
    }
}

fn non_negative_distance(distance: f64) -> Result<f64> {
    if distance >= 0.0 {
        Ok(distance)
    } else {
        Err(Error::InvalidValue(format!("distance must be non-negative, got {distance}")))
    }
}

// ── Position records ──────────────────────────────────────────────────────────

/// An unsanitized position report, as received from an AIS feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    /// Epoch seconds
    pub ts: f64,
    pub lon: f64,
    pub lat: f64,
    #[serde(default)]
    pub sog: Option<f64>,
    #[serde(default)]
    pub cog: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub tide_flow: Option<f64>,
    #[serde(default)]
    pub tide_bearing: Option<f64>,
}

impl PositionRecord {
    pub fn new(ts: f64, lon: f64, lat: f64, sog: Option<f64>, cog: Option<f64>, heading: Option<f64>) -> Self {
        Self { ts, lon, lat, sog, cog, heading, tide_flow: None, tide_bearing: None }
    }

    pub fn with_tide(self, tide_flow: Option<f64>, tide_bearing: Option<f64>) -> Self {
        Self { tide_flow, tide_bearing, ..self }
    }

    /// Both tide values if they are present and valid, else still water.
    fn tide(&self) -> (f64, f64) {
        match (self.tide_flow, self.tide_bearing) {
            (Some(flow), Some(bearing)) if flow >= 0.0 && (0.0..360.0).contains(&bearing) => (flow, bearing),
            _ => (0.0, 0.0),
        }
    }
}

/// Default sog predicate for [`Track::sanitized_from_positions`].
pub fn always_plausible_sog(_sog: f64) -> bool {
    true
}

/// Default distance predicate for [`Track::sanitized_from_positions`].
pub fn always_plausible_distance(_ts1: f64, _lon1: f64, _lat1: f64, _ts2: f64, _lon2: f64, _lat2: f64) -> bool {
    true
}

// ── Track ─────────────────────────────────────────────────────────────────────

/// Positions in time order plus one segment per consecutive pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    positions: Vec<Position>,
    /// Known segment distances in meters, `None` where derived from coordinates.
    distances: Vec<Option<f64>>,
}

#[derive(Debug, Default)]
struct Sanitizations {
    discarded: usize,
    sogs: usize,
    replaced_sogs: Vec<Option<f64>>,
    cogs: usize,
    headings: usize,
}

impl Sanitizations {
    fn any(&self) -> bool {
        self.discarded + self.sogs + self.cogs + self.headings > 0
    }
}

impl Track {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a track from raw records, checking them against each other.
    ///
    /// - A record is discarded when `distance_covered_is_plausible` rejects
    ///   the move from the mean time and place of the up to 3 preceding
    ///   records to this one. Predicate arguments are
    ///   `(ts1, lon1, lat1, ts2, lon2, lat2)` with epoch-second timestamps.
    /// - Missing sogs, and sogs rejected by `sog_is_plausible`, are replaced by
    ///   the mean speed over the adjacent segments, capped at
    ///   [`MAX_CALCULATED_SPEED`].
    /// - Missing cogs are replaced by the mean bearing of the adjacent segments.
    /// - Missing headings default to the cog.
    /// - Tide values are only used if both are present and valid.
    ///
    /// Fails if a record holds invalid coordinates, speeds or bearings, or is
    /// older than the record before it.
    pub fn sanitized_from_positions<S, D>(
        records: &[PositionRecord],
        sog_is_plausible: S,
        distance_covered_is_plausible: D,
    ) -> Result<Self>
    where
        S: Fn(f64) -> bool,
        D: Fn(f64, f64, f64, f64, f64, f64) -> bool,
    {
        let mut stats = Sanitizations::default();
        let mut track = Self::new();
        for (past, current, future) in geo::surrounding_context(records, 3, 1)? {
            if is_outlier(current, past, &distance_covered_is_plausible) {
                stats.discarded += 1;
                continue;
            }
            let sog = match current.sog {
                Some(sog) if sog_is_plausible(sog) => sog,
                reported => {
                    stats.sogs += 1;
                    stats.replaced_sogs.push(reported);
                    calculated_sog(current, past, future)
                }
            };
            let cog = current.cog.unwrap_or_else(|| {
                stats.cogs += 1;
                calculated_cog(current, past, future)
            });
            let heading = current.heading.unwrap_or_else(|| {
                stats.headings += 1;
                cog
            });
            let (tide_flow, tide_bearing) = current.tide();
            let position = Position::new(timestamp(current.ts)?, current.lon, current.lat, sog, cog, heading)?
                .with_tide(tide_flow, tide_bearing)?;
            track.append_position(position)?;
        }
        if stats.any() {
            debug!(
                "Sanitization during track creation: {} outliers, {} sogs ({:?}), {} cogs, {} headings",
                stats.discarded, stats.sogs, stats.replaced_sogs, stats.cogs, stats.headings
            );
        }
        Ok(track)
    }

    /// Appends a position and the segment leading to it.
    pub fn append_position(&mut self, position: Position) -> Result<()> {
        if let Some(last) = self.positions.last() {
            if last.ts > position.ts {
                return Err(Error::InvalidValue(format!(
                    "position at {} is older than the last one at {}",
                    position.ts, last.ts
                )));
            }
            self.distances.push(None);
        }
        self.positions.push(position);
        Ok(())
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Mutable access, e.g. to fill in tide data after construction.
    pub fn position_mut(&mut self, index: usize) -> Option<&mut Position> {
        self.positions.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn segments(&self) -> impl ExactSizeIterator<Item = Segment<'_>> + '_ {
        self.positions
            .windows(2)
            .zip(&self.distances)
            .map(|(pair, known)| Segment {
                start: &pair[0],
                end: &pair[1],
                distance: known.unwrap_or_else(|| {
                    great_circle_distance(pair[0].lon, pair[0].lat, pair[1].lon, pair[1].lat)
                }),
            })
    }

    /// Overrides the distance of segment `index` with a known value in meters.
    pub fn set_segment_distance(&mut self, index: usize, distance: f64) -> Result<()> {
        let distance = non_negative_distance(distance)?;
        let slot = self.distances.get_mut(index).ok_or_else(|| {
            Error::InvalidInput(format!("no segment {index} in a track of {} positions", self.positions.len()))
        })?;
        *slot = Some(distance);
        Ok(())
    }

    /// Total distance in meters.
    pub fn distance(&self) -> f64 {
        self.segments().map(|s| s.distance()).sum()
    }

    pub fn duration(&self) -> Duration {
        self.segments().fold(Duration::zero(), |acc, s| acc + s.duration())
    }

    pub fn hours(&self) -> f64 {
        geo::hours(self.duration())
    }

    /// A copy limited to positions with `start <= ts <= end`.
    pub fn partial_track(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidInput("start must not be after end".into()));
        }
        let Some(start_idx) = self.positions.iter().position(|p| p.ts >= start) else {
            return Ok(Self::new());
        };
        let positions: Vec<Position> = self.positions[start_idx..]
            .iter()
            .take_while(|p| p.ts <= end)
            .cloned()
            .collect();
        let distances = self.distances[start_idx..]
            .iter()
            .take(positions.len().saturating_sub(1))
            .copied()
            .collect();
        Ok(Self { positions, distances })
    }
}

fn is_outlier<D>(current: &PositionRecord, past: &[PositionRecord], distance_covered_is_plausible: &D) -> bool
where
    D: Fn(f64, f64, f64, f64, f64, f64) -> bool,
{
    if past.is_empty() {
        return false;
    }
    let n = past.len() as f64;
    let ts = past.iter().map(|p| p.ts).sum::<f64>() / n;
    let lon = past.iter().map(|p| p.lon).sum::<f64>() / n;
    let lat = past.iter().map(|p| p.lat).sum::<f64>() / n;
    !distance_covered_is_plausible(ts, lon, lat, current.ts, current.lon, current.lat)
}

fn adjacent_pairs<'a>(
    current: &'a PositionRecord,
    past: &'a [PositionRecord],
    future: &'a [PositionRecord],
) -> Vec<(&'a PositionRecord, &'a PositionRecord)> {
    past.last()
        .map(|prev| (prev, current))
        .into_iter()
        .chain(future.first().map(|next| (current, next)))
        .collect()
}

fn calculated_sog(current: &PositionRecord, past: &[PositionRecord], future: &[PositionRecord]) -> f64 {
    let pairs = adjacent_pairs(current, past, future);
    if pairs.is_empty() {
        return 0.0;
    }
    let total: f64 = pairs
        .iter()
        .map(|(left, right)| {
            let hours = (right.ts - left.ts) / 3600.0;
            if hours == 0.0 {
                return 0.0;
            }
            m_to_nm(great_circle_distance(left.lon, left.lat, right.lon, right.lat) / hours)
        })
        .sum();
    (total / pairs.len() as f64).min(MAX_CALCULATED_SPEED)
}

fn calculated_cog(current: &PositionRecord, past: &[PositionRecord], future: &[PositionRecord]) -> f64 {
    let cogs: Vec<f64> = adjacent_pairs(current, past, future)
        .iter()
        .map(|(left, right)| bearing(left.lon, left.lat, right.lon, right.lat))
        .collect();
    match cogs[..] {
        [cog] => cog,
        [c1, c2] => average_bearing(c1, c2),
        _ => 0.0,
    }
}
