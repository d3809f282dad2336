//! # poeminv-engine
//!
//! Estimates ship exhaust emissions for port emission inventories.
//!
//! - [`Config`]: rule-based configuration. Resolves emission factors for a
//!   vessel and mode, and guesses vessel attributes that are not known.
//! - [`Track`]: sanitized AIS positions and the segments between them.
//! - [`EmissionCalculator`]: grams of each pollutant along a track or while
//!   moored.
//!
//! Rules are [`MatchConfig`]s: a conjunction of [`Criterion`]s on named
//! attributes plus a payload. Wherever rules are looked up, the first
//! matching rule wins.

pub mod config;
pub mod criterion;
pub mod emission;
pub mod emission_config;
pub mod error;
pub mod geo;
pub mod guesser;
pub mod match_config;
pub mod range;
pub mod track;
pub mod vessel;

pub use config::Config;
pub use criterion::{register_name, register_name_with, Criterion};
pub use emission::{EmissionCalculator, EmissionConfigSource, SegmentDurationSanitizer, SegmentHoursEstimator};
pub use emission_config::{EmissionConfig, EmissionConfigs};
pub use error::{Error, Result};
pub use guesser::VesselInfoGuesser;
pub use match_config::MatchConfig;
pub use range::Range;
pub use track::{always_plausible_distance, always_plausible_sog, Position, PositionRecord, Segment, Track};
pub use vessel::VesselInfo;
