//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use poeminv_engine::{MatchConfig, Result, VesselInfo, VesselInfoGuesser};
use poeminv_types::{EngineCategory, EngineNOxTier, ShipType, Value, Values};
use serde_json::{json, Map, Value as Json};

/// Produces vessel attributes that differ from call to call: numbers count
/// up, enums cycle through their variants.
#[derive(Debug, Default)]
pub struct AttrFactory {
    counter: u32,
    category: usize,
    ship_type: usize,
    nox_tier: usize,
}

impl AttrFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// All eight attributes, with `overrides` applied on top.
    pub fn attrs(&mut self, overrides: Values) -> Values {
        self.build(None, overrides)
    }

    /// Only the named attributes, with `overrides` applied on top.
    pub fn only(&mut self, names: &[&str], overrides: Values) -> Values {
        self.build(Some(names), overrides)
    }

    fn build(&mut self, only: Option<&[&str]>, overrides: Values) -> Values {
        let wanted = |name: &str| only.map_or(true, |names| names.contains(&name));
        let mut attrs = Values::new();
        for name in VesselInfo::FIELD_NAMES {
            if !wanted(name) || name == "size_unit" {
                continue;
            }
            let value = match name {
                "engine_category" => {
                    let category = EngineCategory::ALL[self.category % EngineCategory::ALL.len()];
                    self.category += 1;
                    Value::from(category)
                }
                "engine_nox_tier" => {
                    let tier = EngineNOxTier::ALL[self.nox_tier % EngineNOxTier::ALL.len()];
                    self.nox_tier += 1;
                    Value::from(tier)
                }
                "ship_type" => {
                    let ship_type = match overrides.get("ship_type").and_then(|v| v.parse::<ShipType>().ok()) {
                        Some(ship_type) => ship_type,
                        None => {
                            let ship_type = ShipType::ALL[self.ship_type % ShipType::ALL.len()];
                            self.ship_type += 1;
                            ship_type
                        }
                    };
                    if !overrides.contains_key("size_unit") && wanted("size_unit") {
                        attrs.insert("size_unit".into(), Value::from(ship_type.valid_size_units()[0]));
                    }
                    Value::from(ship_type)
                }
                _ => {
                    self.counter += 1;
                    Value::from(self.counter)
                }
            };
            attrs.insert(name.to_string(), value);
        }
        attrs.extend(overrides);
        attrs
    }
}

/// A rule document with `data` next to the criteria.
pub fn rule(criteria: Json, data: &Values) -> Json {
    let mut obj = Map::new();
    obj.insert("match_criteria".into(), criteria);
    for (k, v) in data {
        obj.insert(k.clone(), Json::from(v));
    }
    Json::Object(obj)
}

/// Rules the guesser insists on, appended after the ones under test.
#[derive(Debug, Clone, Copy)]
pub struct Required {
    /// A ship-type-only rule with a size for every ship type.
    pub ship_type_sizes: bool,
    /// A complete criteria-less rule and a criteria-less build time of 1 year.
    pub defaults: bool,
}

impl Required {
    pub const ALL: Required = Required { ship_type_sizes: true, defaults: true };
}

pub fn make_guesser(
    factory: &mut AttrFactory,
    guess_data: Vec<(Json, Values)>,
    build_times: Vec<(Json, Json)>,
    required: Required,
) -> Result<VesselInfoGuesser> {
    let mut guess_data: Vec<Json> = guess_data.iter().map(|(c, d)| rule(c.clone(), d)).collect();
    let mut build_times: Vec<Json> = build_times
        .into_iter()
        .map(|(c, years)| json!({"match_criteria": c, "build_time_years": years}))
        .collect();
    if required.ship_type_sizes {
        for ship_type in ShipType::ALL {
            let data = factory.attrs(poeminv_types::values! { "ship_type" => *ship_type });
            guess_data.push(rule(json!({"ship_type": ship_type.as_str()}), &data));
        }
    }
    if required.defaults {
        guess_data.push(rule(json!({}), &factory.attrs(Values::new())));
        build_times.push(json!({"match_criteria": {}, "build_time_years": 1}));
    }
    VesselInfoGuesser::new(
        &MatchConfig::list_from_json(&Json::Array(guess_data))?,
        &MatchConfig::list_from_json(&Json::Array(build_times))?,
    )
}

/// Asserts every entry of `expected` is in `actual`.
pub fn assert_has_entries(actual: &Values, expected: &Values) {
    for (k, v) in expected {
        assert_eq!(actual.get(k), Some(v), "entry {k} in {actual:?}");
    }
}

/// A complete configuration document with simple, predictable numbers.
///
/// - propulsion: nox 10 g/kWh, co2 600 g/kWh (c3 engines: nox 12)
/// - auxiliary: nox 5 g/kWh, co2 700 g/kWh
/// - boiler: co2 900 g/kWh, no nox
/// - engine powers: auxiliary 200/300/400/100 kW, boiler 50/60/70/80 kW
///   for transit/maneuvering/hotelling/anchorage
/// - below 20% load, propulsion nox is doubled
pub fn config_document() -> Json {
    let mut guess_data: Vec<Json> = vec![
        json!({"match_criteria": {"ais_type": {"ge": 70, "lt": 80}, "length": {"ge": 150, "lt": 9999}},
               "ship_type": "container_ship", "size": 4000, "size_unit": "teu"}),
        json!({"match_criteria": {"ais_type": {"ge": 70, "lt": 80}},
               "ship_type": "general_cargo", "size": 5000, "size_unit": "dwt"}),
        json!({"match_criteria": {"ship_type": "container_ship"},
               "max_speed": 20, "engine_kw": 20000, "engine_category": "c3"}),
        json!({"match_criteria": {"engine_category": "c3", "keel_laid_year": {"ge": 2000, "lt": 2011}},
               "engine_nox_tier": 1}),
        json!({"match_criteria": {"engine_category": "c3", "keel_laid_year": {"ge": 2011, "lt": 2016}},
               "engine_nox_tier": 2}),
    ];
    for ship_type in ShipType::ALL {
        guess_data.push(json!({
            "match_criteria": {"ship_type": ship_type.as_str()},
            "ship_type": ship_type.as_str(),
            "size": 0,
            "size_unit": ship_type.valid_size_units()[0].as_str(),
        }));
    }
    guess_data.push(json!({
        "match_criteria": {},
        "max_speed": 10, "engine_kw": 1000, "engine_rpm": 500,
        "engine_category": "c2", "engine_nox_tier": 0,
        "ship_type": "misc", "size": 0, "size_unit": "n/a",
    }));

    json!({
        "sea_margin_adjustment_factor": 1.0,
        "base_values": {
            "nox_slow": [
                {"match_criteria": {"engine_category": "c3"}, "g_per_kwh": 12},
                {"match_criteria": {}, "g_per_kwh": 10},
            ],
            "co2_fuel": [{"match_criteria": {}, "g_per_kwh": 600}],
        },
        "pollutants": {
            "nox": [
                {"match_criteria": {"engine_group": "propulsion"}, "base_value_name": "nox_slow"},
                {"match_criteria": {"engine_group": "auxiliary"}, "base_value_name": "nox_slow",
                 "multiplier": 0.5},
            ],
            "co2": [
                {"match_criteria": {"engine_group": "auxiliary"}, "base_value_name": "co2_fuel",
                 "offset_g_per_kwh": 100},
                {"match_criteria": {"engine_group": "boiler"}, "base_value_name": "co2_fuel",
                 "multiplier": 1.5},
                {"match_criteria": {}, "base_value_name": "co2_fuel"},
            ],
        },
        "default_engine_powers": [
            {"match_criteria": {"engine_group": "auxiliary"},
             "transit": 200, "maneuvering": 300, "hotelling": 400, "anchorage": 100},
            {"match_criteria": {"engine_group": "boiler"},
             "transit": 50, "maneuvering": 60, "hotelling": 70, "anchorage": 80},
        ],
        "vessel_info_guess_data": guess_data,
        "average_vessel_build_times": [
            {"match_criteria": {"ship_type": "container_ship"}, "build_time_years": 2},
            {"match_criteria": {}, "build_time_years": 1},
        ],
        "low_load_adjustment_factors": [
            {"match_criteria": {},
             "range_factors": [{"range": {"ge": 0, "lt": 0.2}, "factors": {"nox": 2}}]},
        ],
    })
}
