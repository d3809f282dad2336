//! config.rs — Overall configuration: emission rules plus vessel inference
//!
//! The configuration document has these top-level keys, all required:
//!
//! - `sea_margin_adjustment_factor`: number
//! - `base_values`: map of base value name to rules with `g_per_kwh`
//! - `pollutants`: map of pollutant name to rules with `base_value_name`,
//!   optional `multiplier` and `offset_g_per_kwh`
//! - `default_engine_powers`: rules with kW per mode
//! - `vessel_info_guess_data`: rules with vessel attributes
//! - `average_vessel_build_times`: rules with `build_time_years`
//! - `low_load_adjustment_factors`: rules with `range_factors`

use std::collections::BTreeMap;
use std::path::Path;

use poeminv_types::{Mode, Values};
use serde_json::Value as Json;
use tracing::info;

use crate::emission_config::{EmissionConfig, EmissionConfigs};
use crate::error::{Error, Result};
use crate::guesser::VesselInfoGuesser;
use crate::match_config::MatchConfig;
use crate::vessel::VesselInfo;

/// Everything needed to resolve emission factors and guess vessel info.
#[derive(Debug, Clone)]
pub struct Config {
    sea_margin_adjustment_factor: f64,
    emission_configs: EmissionConfigs,
    vessel_info_guesser: VesselInfoGuesser,
}

impl Config {
    pub fn from_document(doc: &Json) -> Result<Self> {
        let part = |key: &str| {
            doc.get(key)
                .ok_or_else(|| Error::InvalidConfiguration(format!("missing config part {key}")))
        };
        let sea_margin_adjustment_factor = part("sea_margin_adjustment_factor")?
            .as_f64()
            .ok_or_else(|| {
                Error::InvalidConfiguration("sea_margin_adjustment_factor must be a number".into())
            })?;
        let base_values = named_rules(part("base_values")?)?;
        let pollutants = named_rules(part("pollutants")?)?;
        let engine_powers = MatchConfig::list_from_json(part("default_engine_powers")?)?;
        let guess_data = MatchConfig::list_from_json(part("vessel_info_guess_data")?)?;
        let build_times = MatchConfig::list_from_json(part("average_vessel_build_times")?)?;
        let low_load = MatchConfig::list_from_json(part("low_load_adjustment_factors")?)?;

        let emission_configs = EmissionConfigs::new(&base_values, &pollutants, &engine_powers, &low_load)?;
        let vessel_info_guesser = VesselInfoGuesser::new(&guess_data, &build_times)?;
        info!(
            "Loaded config: {} base values, {} pollutants, {} engine power rules, {} vessel guess rules",
            base_values.len(),
            pollutants.len(),
            engine_powers.len(),
            guess_data.len()
        );
        Ok(Self { sea_margin_adjustment_factor, emission_configs, vessel_info_guesser })
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Self::from_document(&serde_json::from_str(s)?)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        Self::from_document(&toml::from_str::<Json>(s)?)
    }

    /// Loads a `.json` or `.toml` file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("toml") => Self::from_toml_str(&content),
            _ => Err(Error::InvalidConfiguration(format!(
                "unsupported config format: {}",
                path.display()
            ))),
        }
    }

    pub fn sea_margin_adjustment_factor(&self) -> f64 {
        self.sea_margin_adjustment_factor
    }

    /// What would be guessed if nothing is known about a vessel.
    pub fn default_vessel_info(&self) -> &VesselInfo {
        self.vessel_info_guesser.default_vessel_info()
    }

    pub fn emission_config_for(&self, vessel_info: &VesselInfo, mode: Mode) -> Result<EmissionConfig> {
        self.emission_configs.config_for(vessel_info, mode)
    }

    /// See [`VesselInfoGuesser::guess_missing_vessel_info`].
    pub fn guess_missing_vessel_info(&self, values: &Values) -> Result<Values> {
        self.vessel_info_guesser.guess_missing_vessel_info(values)
    }

    /// Guesses missing attributes and builds the vessel info from the result.
    pub fn vessel_info_from(&self, values: &Values) -> Result<VesselInfo> {
        VesselInfo::try_from(&self.guess_missing_vessel_info(values)?)
    }
}

fn named_rules(spec: &Json) -> Result<BTreeMap<String, Vec<MatchConfig>>> {
    spec.as_object()
        .ok_or_else(|| Error::InvalidConfiguration(format!("expected a mapping of rule lists: {spec}")))?
        .iter()
        .map(|(name, rules)| Ok((name.clone(), MatchConfig::list_from_json(rules)?)))
        .collect()
}
