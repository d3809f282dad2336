//! emission.rs — Pollutant emissions along tracks and while moored
//!
//! Propulsion load follows the propeller law relative to the vessel's design
//! speed. Auxiliary engines and boilers run at the default power configured
//! for the operating mode.

use poeminv_types::{merge_add_into, merge_mul, EngineGroup, Mode, PollutantMap};
use serde::Deserialize;
use tracing::warn;

use crate::config::Config;
use crate::emission_config::EmissionConfig;
use crate::error::{Error, Result};
use crate::geo::{self, m_to_nm};
use crate::track::{Segment, Track};
use crate::vessel::VesselInfo;

// ── Seams ─────────────────────────────────────────────────────────────────────

/// Where a calculator looks up emission configs.
pub trait EmissionConfigSource {
    fn sea_margin_adjustment_factor(&self) -> f64;
    fn emission_config_for(&self, vessel_info: &VesselInfo, mode: Mode) -> Result<EmissionConfig>;
}

impl EmissionConfigSource for Config {
    fn sea_margin_adjustment_factor(&self) -> f64 {
        Config::sea_margin_adjustment_factor(self)
    }

    fn emission_config_for(&self, vessel_info: &VesselInfo, mode: Mode) -> Result<EmissionConfig> {
        Config::emission_config_for(self, vessel_info, mode)
    }
}

/// Hours of engine operation to bill for a segment.
pub trait SegmentHoursEstimator {
    fn adjusted_segment_hours(&self, segment: &Segment<'_>) -> f64;
}

// ── SegmentDurationSanitizer ──────────────────────────────────────────────────

/// Stretches or shrinks segment durations whose reported speeds do not fit the
/// distance actually covered.
///
/// A segment's reported distance is its duration times the mean sog at its
/// ends. If that deviates from the great-circle distance by more than
/// `max_fuel_calc_distance_deviation`, the duration is scaled until it is back
/// within bounds, but never by more than
/// `max_fuel_calc_duration_increase_factor`. Segments with a mean sog of 0
/// are left as they are.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SegmentDurationSanitizer {
    pub max_fuel_calc_distance_deviation: f64,
    pub max_fuel_calc_duration_increase_factor: f64,
}

impl Default for SegmentDurationSanitizer {
    fn default() -> Self {
        Self {
            max_fuel_calc_distance_deviation: 0.25,
            max_fuel_calc_duration_increase_factor: 10.0,
        }
    }
}

impl SegmentDurationSanitizer {
    pub fn new(max_fuel_calc_distance_deviation: f64, max_fuel_calc_duration_increase_factor: f64) -> Self {
        Self { max_fuel_calc_distance_deviation, max_fuel_calc_duration_increase_factor }
    }
}

impl SegmentHoursEstimator for SegmentDurationSanitizer {
    fn adjusted_segment_hours(&self, segment: &Segment<'_>) -> f64 {
        let segment_hours = segment.hours();
        let average_sog = (segment.start().sog() + segment.end().sog()) / 2.0;
        let assumed_distance = segment_hours * average_sog;
        let actual_distance = m_to_nm(segment.distance());
        let min_distance = actual_distance * (1.0 - self.max_fuel_calc_distance_deviation);
        let max_distance = actual_distance * (1.0 + self.max_fuel_calc_distance_deviation);
        let factor = if assumed_distance == 0.0 {
            1.0
        } else if assumed_distance < min_distance {
            min_distance / assumed_distance
        } else if assumed_distance > max_distance {
            max_distance / assumed_distance
        } else {
            1.0
        };
        segment_hours * factor.min(self.max_fuel_calc_duration_increase_factor)
    }
}

// ── EmissionCalculator ────────────────────────────────────────────────────────

/// Emission calculations for one vessel.
#[derive(Debug, Clone)]
pub struct EmissionCalculator<'a, C = Config, S = SegmentDurationSanitizer> {
    config: &'a C,
    vessel_info: VesselInfo,
    sanitizer: S,
}

impl<'a, C: EmissionConfigSource> EmissionCalculator<'a, C> {
    pub fn new(config: &'a C, vessel_info: VesselInfo) -> Self {
        Self::with_sanitizer(config, vessel_info, SegmentDurationSanitizer::default())
    }
}

impl<'a, C: EmissionConfigSource, S: SegmentHoursEstimator> EmissionCalculator<'a, C, S> {
    pub fn with_sanitizer(config: &'a C, vessel_info: VesselInfo, sanitizer: S) -> Self {
        Self { config, vessel_info, sanitizer }
    }

    pub fn vessel_info(&self) -> &VesselInfo {
        &self.vessel_info
    }

    /// Fraction of installed power needed at `stw`, capped at 1.
    pub fn propulsion_load_at_stw(&self, stw: f64) -> f64 {
        let load = (stw / self.vessel_info.max_speed()).powi(3) * self.config.sea_margin_adjustment_factor();
        load.min(1.0)
    }

    /// Propulsion emissions in grams along one segment.
    ///
    /// The load is the mean of the loads at both ends. The first low-load
    /// range containing it scales the result.
    pub fn segment_propulsion_emissions(&self, segment: &Segment<'_>, emission_config: &EmissionConfig) -> PollutantMap {
        let hours = self.sanitizer.adjusted_segment_hours(segment);
        let load = (self.propulsion_load_at_stw(segment.start().stw())
            + self.propulsion_load_at_stw(segment.end().stw()))
            / 2.0;
        let kwh = self.vessel_info.engine_kw() * hours * load;
        let base = emission_config.emissions_from_energy(EngineGroup::Propulsion, kwh);
        match emission_config
            .low_load_adjustment_factors()
            .iter()
            .find(|(range, _)| range.contains(load))
        {
            Some((_, factors)) => merge_mul(&base, factors),
            None => base,
        }
    }

    /// Emissions in grams of all engines along `track`.
    ///
    /// `mode` must be transit or maneuvering.
    pub fn calculate_track_emissions(&self, track: &Track, mode: Mode) -> Result<PollutantMap> {
        if !mode.is_moving() {
            return Err(Error::InvalidMode(format!("invalid mode {mode} for track emissions")));
        }
        let emission_config = self.config.emission_config_for(&self.vessel_info, mode)?;
        let mut total = PollutantMap::new();
        for segment in track.segments() {
            merge_add_into(&mut total, &self.segment_propulsion_emissions(&segment, &emission_config));
        }
        if total.is_empty() {
            warn!("No propulsion emissions calculated for {:?} along a track of {} positions", self.vessel_info, track.len());
        }
        let hours = track.hours();
        for group in EngineGroup::NON_PROPULSION {
            merge_add_into(&mut total, &self.non_propulsion_emissions(&emission_config, *group, hours)?);
        }
        Ok(total)
    }

    /// Emissions in grams of auxiliary engines and boilers while moored.
    ///
    /// `mode` must be hotelling or anchorage.
    pub fn calculate_mooring_emissions(&self, duration: chrono::Duration, mode: Mode) -> Result<PollutantMap> {
        if mode.is_moving() {
            return Err(Error::InvalidMode(format!("invalid mode {mode} for mooring emissions")));
        }
        let emission_config = self.config.emission_config_for(&self.vessel_info, mode)?;
        let hours = geo::hours(duration);
        let mut total = PollutantMap::new();
        for group in EngineGroup::NON_PROPULSION {
            merge_add_into(&mut total, &self.non_propulsion_emissions(&emission_config, *group, hours)?);
        }
        Ok(total)
    }

    fn non_propulsion_emissions(&self, emission_config: &EmissionConfig, group: EngineGroup, hours: f64) -> Result<PollutantMap> {
        let kwh = emission_config.engine_power(group)? * hours;
        let emissions = emission_config.emissions_from_energy(group, kwh);
        if emissions.is_empty() {
            warn!("No {group} emissions calculated for {:?}", self.vessel_info);
        }
        Ok(emissions)
    }
}
