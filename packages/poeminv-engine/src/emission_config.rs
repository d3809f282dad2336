//! emission_config.rs — Emission factors and engine powers per vessel and mode
//!
//! [`EmissionConfigs`] holds every rule from the configuration document and
//! resolves them, first match wins, into an [`EmissionConfig`] for one vessel
//! operating in one mode.

use std::collections::BTreeMap;

use poeminv_types::{EngineGroup, Mode, PollutantMap, Value, Values};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::match_config::{first_match, MatchConfig};
use crate::range::Range;
use crate::vessel::VesselInfo;

// ── EmissionConfig ────────────────────────────────────────────────────────────

/// Factors needed to turn energy into pollutant mass for one vessel and mode.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionConfig {
    /// g/kWh per pollutant, for every engine group
    emission_factors: BTreeMap<EngineGroup, PollutantMap>,
    /// kW for the auxiliary engines and the boiler
    engine_powers: BTreeMap<EngineGroup, f64>,
    /// Multipliers applied to propulsion emissions at low engine load
    low_load_adjustment_factors: Vec<(Range, PollutantMap)>,
}

impl EmissionConfig {
    /// `emission_factors` must cover exactly propulsion, auxiliary and boiler;
    /// `engine_powers` exactly auxiliary and boiler.
    pub fn new(
        emission_factors: BTreeMap<EngineGroup, PollutantMap>,
        engine_powers: BTreeMap<EngineGroup, f64>,
        low_load_adjustment_factors: Vec<(Range, PollutantMap)>,
    ) -> Result<Self> {
        if !emission_factors.keys().eq(EngineGroup::ALL.iter()) {
            return Err(Error::InvalidConfiguration(
                "missing or invalid emission factor engine groups".into(),
            ));
        }
        if !engine_powers.keys().eq(EngineGroup::NON_PROPULSION.iter()) {
            return Err(Error::InvalidConfiguration(
                "missing or invalid engine power engine groups".into(),
            ));
        }
        Ok(Self { emission_factors, engine_powers, low_load_adjustment_factors })
    }

    /// Grams of each pollutant emitted by `engine_group` while producing `kwh`.
    pub fn emissions_from_energy(&self, engine_group: EngineGroup, kwh: f64) -> PollutantMap {
        self.emission_factors
            .get(&engine_group)
            .map(|factors| poeminv_types::scale(factors, kwh))
            .unwrap_or_default()
    }

    /// Estimated power in kW. Only auxiliary engines and boilers have one.
    pub fn engine_power(&self, engine_group: EngineGroup) -> Result<f64> {
        self.engine_powers.get(&engine_group).copied().ok_or_else(|| {
            Error::InvalidEngineGroup(format!("no engine power for {engine_group}"))
        })
    }

    pub fn emission_factors(&self, engine_group: EngineGroup) -> Option<&PollutantMap> {
        self.emission_factors.get(&engine_group)
    }

    pub fn low_load_adjustment_factors(&self) -> &[(Range, PollutantMap)] {
        &self.low_load_adjustment_factors
    }
}

// ── Rule payloads ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct BaseValue {
    g_per_kwh: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct PollutantDefinition {
    base_value_name: String,
    #[serde(default = "one")]
    multiplier: f64,
    #[serde(default)]
    offset_g_per_kwh: f64,
}

fn one() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct EnginePowers {
    transit: f64,
    maneuvering: f64,
    hotelling: f64,
    anchorage: f64,
}

impl EnginePowers {
    fn for_mode(&self, mode: Mode) -> f64 {
        match mode {
            Mode::Transit => self.transit,
            Mode::Maneuvering => self.maneuvering,
            Mode::Hotelling => self.hotelling,
            Mode::Anchorage => self.anchorage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct RangeFactors {
    range: Range,
    factors: PollutantMap,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct LowLoadAdjustment {
    range_factors: Vec<RangeFactors>,
}

fn typed_rules<T: serde::de::DeserializeOwned>(rules: &[MatchConfig]) -> Result<Vec<MatchConfig<T>>> {
    rules.iter().map(|r| r.typed()).collect()
}

// ── EmissionConfigs ───────────────────────────────────────────────────────────

/// All emission rules, validated at construction.
#[derive(Debug, Clone)]
pub struct EmissionConfigs {
    base_values: BTreeMap<String, Vec<MatchConfig<BaseValue>>>,
    pollutants: BTreeMap<String, Vec<MatchConfig<PollutantDefinition>>>,
    engine_powers: Vec<MatchConfig<EnginePowers>>,
    low_load_adjustment_factors: Vec<MatchConfig<LowLoadAdjustment>>,
}

impl EmissionConfigs {
    /// Validates the four rule collections and parses their payloads.
    ///
    /// Fails with [`Error::InvalidConfiguration`] if a base value is not a
    /// number, a pollutant references an unknown base value or has a
    /// non-numeric multiplier or offset, an engine power rule lacks a number
    /// for some mode, auxiliary engines or boilers have no default engine
    /// power rule, or a low-load rule has no well-formed range factors.
    pub fn new(
        base_values: &BTreeMap<String, Vec<MatchConfig>>,
        pollutants: &BTreeMap<String, Vec<MatchConfig>>,
        engine_powers: &[MatchConfig],
        low_load_adjustment_factors: &[MatchConfig],
    ) -> Result<Self> {
        let base_values = base_values
            .iter()
            .map(|(name, rules)| Ok((name.clone(), typed_rules(rules)?)))
            .collect::<Result<BTreeMap<String, Vec<MatchConfig<BaseValue>>>>>()?;
        let pollutants = pollutants
            .iter()
            .map(|(name, rules)| Ok((name.clone(), typed_rules(rules)?)))
            .collect::<Result<BTreeMap<String, Vec<MatchConfig<PollutantDefinition>>>>>()?;
        for rule in pollutants.values().flatten() {
            if !base_values.contains_key(&rule.data.base_value_name) {
                return Err(Error::InvalidConfiguration(format!(
                    "no existing base_value_name {}",
                    rule.data.base_value_name
                )));
            }
        }
        let engine_powers = typed_rules::<EnginePowers>(engine_powers)?;
        let missing: Vec<EngineGroup> = EngineGroup::NON_PROPULSION
            .iter()
            .copied()
            .filter(|group| !engine_powers.iter().any(|rule| is_default_for(rule, *group)))
            .collect();
        if !missing.is_empty() {
            return Err(Error::InvalidConfiguration(format!(
                "no criteria-less engine powers for engine groups {missing:?}"
            )));
        }
        let low_load_adjustment_factors = typed_rules::<LowLoadAdjustment>(low_load_adjustment_factors)?;
        if low_load_adjustment_factors.iter().any(|r| r.data.range_factors.is_empty()) {
            return Err(Error::InvalidConfiguration("no low-load adjustment defined in rule".into()));
        }
        Ok(Self { base_values, pollutants, engine_powers, low_load_adjustment_factors })
    }

    /// Resolves the emission config for `vessel_info` operating in `mode`.
    pub fn config_for(&self, vessel_info: &VesselInfo, mode: Mode) -> Result<EmissionConfig> {
        let vessel_values = vessel_info.to_values();
        let emission_factors = EngineGroup::ALL
            .iter()
            .map(|group| (*group, self.emission_factors_for(&vessel_values, *group)))
            .collect();
        let engine_powers = EngineGroup::NON_PROPULSION
            .iter()
            .map(|group| Ok((*group, self.engine_power_for(&vessel_values, *group, mode)?)))
            .collect::<Result<_>>()?;
        let low_load = self.low_load_adjustment_factors_for(&vessel_values);
        EmissionConfig::new(emission_factors, engine_powers, low_load)
    }

    fn emission_factors_for(&self, vessel_values: &Values, group: EngineGroup) -> PollutantMap {
        let values = with_engine_group(vessel_values, group);
        let mut factors = PollutantMap::new();
        for (pollutant, rules) in &self.pollutants {
            let Some(definition) = first_match(rules, &values) else {
                debug!("No {pollutant} definition for {group} engines");
                continue;
            };
            let base = self
                .base_values
                .get(&definition.base_value_name)
                .and_then(|rules| first_match(rules, &values));
            let Some(base) = base else {
                warn!(
                    "Unable to calculate {pollutant} emissions for {group} engines of {vessel_values:?} because no matching base value exists"
                );
                continue;
            };
            factors.insert(
                pollutant.clone(),
                definition.offset_g_per_kwh + base.g_per_kwh * definition.multiplier,
            );
        }
        factors
    }

    fn engine_power_for(&self, vessel_values: &Values, group: EngineGroup, mode: Mode) -> Result<f64> {
        let values = with_engine_group(vessel_values, group);
        let powers = match first_match(&self.engine_powers, &values) {
            Some(powers) => powers,
            // construction guarantees a default per group, so only rules
            // built without `new` get here
            None => {
                warn!("No {group} engine powers matching {vessel_values:?}, using the last one");
                self.engine_powers
                    .last()
                    .map(|rule| &rule.data)
                    .ok_or_else(|| Error::InvalidConfiguration("no engine power rules".into()))?
            }
        };
        Ok(powers.for_mode(mode))
    }

    fn low_load_adjustment_factors_for(&self, vessel_values: &Values) -> Vec<(Range, PollutantMap)> {
        first_match(&self.low_load_adjustment_factors, vessel_values)
            .map(|adjustment| {
                adjustment
                    .range_factors
                    .iter()
                    .map(|rf| (rf.range, rf.factors.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn with_engine_group(vessel_values: &Values, group: EngineGroup) -> Values {
    let mut values = vessel_values.clone();
    values.insert("engine_group".into(), Value::from(group));
    values
}

/// Criteria-less rules apply to every group; engine-group-only rules to the
/// groups they match.
fn is_default_for<D>(rule: &MatchConfig<D>, group: EngineGroup) -> bool {
    rule.is_criteria_less()
        || (rule.has_only_criterion("engine_group")
            && rule.matches(&poeminv_types::values! { "engine_group" => group }))
}
