//! guesser.rs — Completes partial vessel attributes from prioritized rules
//!
//! Rules are tried in order and earlier rules win: a rule only contributes
//! attributes that are still missing. Rules match on the caller's values plus
//! everything guessed so far, so a rule can key on an attribute an earlier
//! rule supplied.
//!
//! `ship_type`, `size` and `size_unit` travel together. A rule's size is only
//! taken if the rule is about the vessel's ship type.
//!
//! The NOx tier gets a second pass for C3 engines: when the keel laying year is
//! unknown but the build year is, the keel laying year is estimated from an
//! average build time and the rules are matched again.

use std::collections::BTreeSet;

use poeminv_types::{EngineCategory, ShipType, Value, Values};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::match_config::{first_match, MatchConfig};
use crate::vessel::VesselInfo;

const TYPE_AND_SIZE: [&str; 3] = ["ship_type", "size", "size_unit"];

#[derive(Debug, Clone, Deserialize)]
struct BuildTime {
    build_time_years: f64,
}

/// Infers missing vessel attributes.
#[derive(Debug, Clone)]
pub struct VesselInfoGuesser {
    guess_data: Vec<MatchConfig<Values>>,
    build_times: Vec<MatchConfig<BuildTime>>,
    default_vessel_info: VesselInfo,
}

impl VesselInfoGuesser {
    /// Validates the rules and computes the default vessel info.
    pub fn new(guess_data: &[MatchConfig], average_vessel_build_times: &[MatchConfig]) -> Result<Self> {
        let guess_data = guess_data
            .iter()
            .map(scalar_rule)
            .collect::<Result<Vec<_>>>()?;
        validate_guess_data(&guess_data)?;
        let build_times = average_vessel_build_times
            .iter()
            .map(|r| r.typed::<BuildTime>())
            .collect::<Result<Vec<_>>>()?;
        if !build_times.iter().any(|r| r.is_criteria_less()) {
            return Err(Error::InvalidConfiguration(
                "no criteria-less average vessel build time exists".into(),
            ));
        }

        let mut guesser = Self {
            guess_data,
            build_times,
            // placeholder until the real default has been guessed below
            default_vessel_info: placeholder_vessel_info()?,
        };
        let attrs = guesser.guess_missing_vessel_info(&Values::new())?;
        guesser.default_vessel_info = VesselInfo::try_from(&attrs)?;
        debug!("Default vessel info: {:?}", guesser.default_vessel_info);
        Ok(guesser)
    }

    /// The vessel info guessed when nothing at all is known.
    pub fn default_vessel_info(&self) -> &VesselInfo {
        &self.default_vessel_info
    }

    /// Completes `values` into the attributes of a [`VesselInfo`].
    ///
    /// Vessel attributes present and non-null in `values` are kept as they
    /// are. Any other entries (`length`, `width`, `ais_type`,
    /// `keel_laid_year`, `year_of_build`, ...) only serve as matching context.
    /// The NOx tier second pass only runs when `engine_nox_tier` is absent
    /// from `values`, not when it is present but null.
    ///
    /// Fails with [`Error::InvalidInput`] if a size or size unit is given
    /// without a ship type.
    pub fn guess_missing_vessel_info(&self, values: &Values) -> Result<Values> {
        if !is_present(values, "ship_type") && (is_present(values, "size") || is_present(values, "size_unit")) {
            return Err(Error::InvalidInput(format!(
                "size specified without a ship type in {values:?}"
            )));
        }
        let attrs: Values = values
            .iter()
            .filter(|(k, v)| VesselInfo::is_field_name(k) && !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let attrs = self.guess_missing_attrs(attrs, values);
        // an explicit null tier counts as supplied
        if values.contains_key("engine_nox_tier") {
            return Ok(attrs);
        }
        self.maybe_improve_nox_tier_guess(attrs, values)
    }

    fn guess_missing_attrs(&self, mut attrs: Values, context: &Values) -> Values {
        for rule in &self.guess_data {
            if rule.matches(&overlay(context, &attrs)) {
                merge_rule_data(&mut attrs, &rule.data);
            }
            if attrs.len() == VesselInfo::FIELD_NAMES.len() {
                break;
            }
        }
        attrs
    }

    fn maybe_improve_nox_tier_guess(&self, mut attrs: Values, values: &Values) -> Result<Values> {
        let is_c3 = attrs
            .get("engine_category")
            .and_then(|v| v.parse::<EngineCategory>().ok())
            == Some(EngineCategory::C3);
        let Some(year_of_build) = values.get("year_of_build").filter(|v| !v.is_null()) else {
            return Ok(attrs);
        };
        if !is_c3 || is_present(values, "keel_laid_year") {
            return Ok(attrs);
        }
        let year_of_build = year_of_build
            .as_f64()
            .ok_or_else(|| Error::InvalidInput(format!("year_of_build must be a number, got {year_of_build}")))?;

        attrs.remove("engine_nox_tier");
        let mut context = values.clone();
        context.remove("keel_laid_year");
        let build_time = first_match(&self.build_times, &overlay(&context, &attrs))
            .map(|b| b.build_time_years)
            .ok_or_else(|| Error::InvalidConfiguration("no matching average vessel build time".into()))?;
        let keel_laid_year = year_of_build - build_time;
        debug!("Derived keel_laid_year {keel_laid_year} from year_of_build {year_of_build}");
        context.insert("keel_laid_year".into(), Value::from(keel_laid_year));
        Ok(self.guess_missing_attrs(attrs, &context))
    }
}

fn is_present(values: &Values, name: &str) -> bool {
    values.get(name).is_some_and(|v| !v.is_null())
}

/// `base` with `top`'s entries taking precedence.
fn overlay(base: &Values, top: &Values) -> Values {
    let mut merged = base.clone();
    merged.extend(top.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

fn merge_rule_data(attrs: &mut Values, data: &Values) {
    for (k, v) in data.iter().filter(|(k, _)| !matches!(k.as_str(), "size" | "size_unit")) {
        attrs.entry(k.clone()).or_insert_with(|| v.clone());
    }
    let Some(new_ship_type) = data.get("ship_type").filter(|v| !v.is_null()) else {
        return;
    };
    if attrs.get("ship_type").map_or(true, |t| t.is_null() || t == new_ship_type) {
        for key in ["size", "size_unit"] {
            if let Some(v) = data.get(key) {
                attrs.entry(key.to_string()).or_insert_with(|| v.clone());
            }
        }
    }
}

fn scalar_rule(rule: &MatchConfig) -> Result<MatchConfig<Values>> {
    let data = rule
        .data
        .iter()
        .map(|(k, v)| {
            let value = Value::try_from(v).map_err(|e| {
                Error::InvalidConfiguration(format!("invalid vessel info guess data for {k}: {e}"))
            })?;
            Ok((k.clone(), value))
        })
        .collect::<Result<Values>>()?;
    Ok(MatchConfig { criteria: rule.criteria.clone(), data })
}

/// Safe values that guess data is merged onto for validation.
fn validation_defaults() -> Values {
    poeminv_types::values! {
        "max_speed" => 1,
        "engine_kw" => 1,
        "engine_rpm" => 1,
        "engine_category" => "c1",
        "engine_nox_tier" => 1,
        "ship_type" => "misc",
        "size" => 0,
        "size_unit" => "n/a",
    }
}

fn placeholder_vessel_info() -> Result<VesselInfo> {
    VesselInfo::try_from(&validation_defaults())
}

fn validate_guess_data(guess_data: &[MatchConfig<Values>]) -> Result<()> {
    let mut default_fields_seen = BTreeSet::new();
    let mut ship_types_with_size = BTreeSet::new();
    for rule in guess_data {
        VesselInfo::try_from(&overlay(&validation_defaults(), &rule.data)).map_err(|e| {
            Error::InvalidConfiguration(format!("unable to build vessel info from {:?}: {e}", rule.data))
        })?;
        if TYPE_AND_SIZE.iter().any(|a| rule.data.contains_key(*a)) {
            if !TYPE_AND_SIZE.iter().all(|a| rule.data.contains_key(*a)) {
                return Err(Error::InvalidConfiguration(format!(
                    "attributes {TYPE_AND_SIZE:?} must always be specified together, not the case with {:?}",
                    rule.data
                )));
            }
            // the unit itself was checked against the type by VesselInfo above
        }
        if rule.is_criteria_less() {
            default_fields_seen.extend(rule.data.keys().cloned());
        }
        if rule.has_only_criterion("ship_type") && rule.data.contains_key("size") {
            for ship_type in ShipType::ALL {
                if rule.matches(&poeminv_types::values! { "ship_type" => *ship_type }) {
                    ship_types_with_size.insert(*ship_type);
                }
            }
        }
    }
    let missing_defaults: Vec<&str> = VesselInfo::FIELD_NAMES
        .iter()
        .copied()
        .filter(|f| !default_fields_seen.contains(*f))
        .collect();
    if !missing_defaults.is_empty() {
        return Err(Error::InvalidConfiguration(format!(
            "attributes {missing_defaults:?} are not present in a criteria-less config"
        )));
    }
    let missing_sizes: Vec<&str> = ShipType::ALL
        .iter()
        .filter(|t| !ship_types_with_size.contains(*t))
        .map(|t| t.as_str())
        .collect();
    if !missing_sizes.is_empty() {
        return Err(Error::InvalidConfiguration(format!(
            "no sizes and units specified for ship types {missing_sizes:?}"
        )));
    }
    Ok(())
}
