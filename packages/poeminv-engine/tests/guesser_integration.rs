//! Integration tests for vessel info guessing.
//!
//! Covers rule priority, the ship type / size guard, the NOx tier second
//! pass, and the validation done when a guesser is constructed.
//!
//! Run with: `cargo test --test guesser_integration`

mod common;

use common::{assert_has_entries, make_guesser, AttrFactory, Required};
use poeminv_engine::{Error, VesselInfo};
use poeminv_types::{values, EngineCategory, EngineNOxTier, ShipType, Value, Values};
use serde_json::json;

const TYPE_AND_SIZE: [&str; 3] = ["ship_type", "size", "size_unit"];

// ============================================================================
// Guessing
// ============================================================================

#[test]
fn complete_info_is_returned_unchanged() {
    let mut f = AttrFactory::new();
    let guesser = make_guesser(&mut f, vec![], vec![], Required::ALL).unwrap();
    let attrs = f.attrs(Values::new());
    assert_eq!(guesser.guess_missing_vessel_info(&attrs).unwrap(), attrs);
}

#[test]
fn guesses_each_missing_attribute() {
    for missing in VesselInfo::FIELD_NAMES {
        for as_null in [true, false] {
            let mut f = AttrFactory::new();
            let mut existing = f.attrs(Values::new());
            let missing: Vec<&str> = if TYPE_AND_SIZE.contains(&missing) {
                TYPE_AND_SIZE.to_vec()
            } else {
                vec![missing]
            };
            let attrs = if missing.len() == 1 {
                let ship_type = existing["ship_type"].clone();
                f.attrs(values! { "ship_type" => ship_type })
            } else {
                f.attrs(Values::new())
            };
            let guess_data = vec![
                (json!({"length": {"ge": 0, "lt": 100}, "width": 3.14159}), f.attrs(Values::new())),
                (json!({"length": {"ge": 100, "lt": 200}, "width": 2.71828}), f.attrs(Values::new())),
                (json!({"length": {"ge": 100, "lt": 200}, "width": 3.14159}), attrs.clone()),
                (json!({}), f.attrs(Values::new())),
            ];
            let guesser = make_guesser(&mut f, guess_data, vec![], Required::ALL).unwrap();
            for name in &missing {
                if as_null {
                    existing.insert(name.to_string(), Value::Null);
                } else {
                    existing.remove(*name);
                }
            }
            let mut input = existing.clone();
            input.insert("length".into(), Value::from(150));
            input.insert("width".into(), Value::from(3.14159));

            let guess = guesser.guess_missing_vessel_info(&input).unwrap();
            let kept: Values = existing
                .into_iter()
                .filter(|(k, _)| !missing.contains(&k.as_str()))
                .collect();
            assert_has_entries(&guess, &kept);
            for name in &missing {
                assert_eq!(guess.get(*name), attrs.get(*name), "guessing {name}");
            }
        }
    }
}

#[test]
fn guesses_all_missing_attributes() {
    for as_null in [true, false] {
        let mut f = AttrFactory::new();
        let attrs = f.attrs(Values::new());
        let guesser = make_guesser(&mut f, vec![(json!({"length": 150}), attrs.clone())], vec![], Required::ALL).unwrap();
        let mut input: Values = if as_null {
            VesselInfo::FIELD_NAMES.iter().map(|n| (n.to_string(), Value::Null)).collect()
        } else {
            Values::new()
        };
        input.insert("length".into(), Value::from(150));
        assert_has_entries(&guesser.guess_missing_vessel_info(&input).unwrap(), &attrs);
    }
}

#[test]
fn collects_attributes_from_multiple_rules() {
    let mut f = AttrFactory::new();
    let attrs1 = f.only(&["max_speed"], Values::new());
    let attrs2 = f.only(&["engine_kw"], Values::new());
    let rest: Vec<&str> = VesselInfo::FIELD_NAMES
        .iter()
        .copied()
        .filter(|n| !matches!(*n, "max_speed" | "engine_kw"))
        .collect();
    let attrs3 = f.only(&rest, Values::new());
    let guess_data = vec![
        (json!({"length": 150}), attrs1.clone()),
        (json!({"length": 150, "width": 31}), f.attrs(Values::new())),
        (json!({}), attrs2.clone()),
        (json!({"length": 150, "width": 30}), attrs3.clone()),
        (json!({"width": 30}), f.only(&["max_speed"], Values::new())),
    ];
    let guesser = make_guesser(&mut f, guess_data, vec![], Required::ALL).unwrap();
    let guess = guesser
        .guess_missing_vessel_info(&values! { "length" => 150, "width" => 30 })
        .unwrap();
    let mut expected = attrs3;
    expected.extend(attrs2);
    expected.extend(attrs1);
    assert_eq!(guess, expected);
}

#[test]
fn matches_on_attributes_guessed_by_earlier_rules() {
    let mut f = AttrFactory::new();
    let attrs1 = f.only(&["engine_rpm"], values! { "engine_rpm" => 123 });
    let attrs2 = f.attrs(Values::new());
    let guess_data = vec![
        (json!({"length": 150}), attrs1.clone()),
        (json!({"engine_rpm": 123}), attrs2.clone()),
        (json!({}), f.attrs(Values::new())),
    ];
    let guesser = make_guesser(&mut f, guess_data, vec![], Required::ALL).unwrap();
    let guess = guesser
        .guess_missing_vessel_info(&values! { "length" => 150, "width" => 30 })
        .unwrap();
    let mut expected = attrs2;
    expected.extend(attrs1);
    assert_eq!(guess, expected);
}

fn typed_vessel(f: &mut AttrFactory, engine_kw: u32, ship_type: &str, size: u32, size_unit: &str) -> Values {
    f.attrs(values! {
        "engine_kw" => engine_kw,
        "ship_type" => ship_type,
        "size" => size,
        "size_unit" => size_unit,
    })
}

#[test]
fn ignores_size_of_other_ship_types() {
    let mut f = AttrFactory::new();
    let guess_data = vec![
        (json!({}), typed_vessel(&mut f, 1000, "container_ship", 5000, "teu")),
        (json!({}), typed_vessel(&mut f, 2000, "bulk_carrier", 1000, "dwt")),
    ];
    let guesser = make_guesser(&mut f, guess_data, vec![], Required::ALL).unwrap();
    let guess = guesser
        .guess_missing_vessel_info(&values! { "ship_type" => "bulk_carrier" })
        .unwrap();
    assert_has_entries(&guess, &values! { "engine_kw" => 1000, "size" => 1000, "size_unit" => "dwt" });
}

#[test]
fn ignores_size_of_other_ship_types_with_same_unit() {
    let mut f = AttrFactory::new();
    let guess_data = vec![
        (json!({}), typed_vessel(&mut f, 1000, "oil_tanker", 5000, "dwt")),
        (json!({}), typed_vessel(&mut f, 2000, "bulk_carrier", 1000, "dwt")),
    ];
    let guesser = make_guesser(&mut f, guess_data, vec![], Required::ALL).unwrap();
    let guess = guesser
        .guess_missing_vessel_info(&values! { "ship_type" => "bulk_carrier" })
        .unwrap();
    assert_has_entries(&guess, &values! { "engine_kw" => 1000, "size" => 1000, "size_unit" => "dwt" });
}

#[test]
fn uses_size_of_same_ship_type() {
    let mut f = AttrFactory::new();
    let guess_data = vec![
        (json!({}), typed_vessel(&mut f, 1000, "bulk_carrier", 5000, "dwt")),
        (json!({}), typed_vessel(&mut f, 2000, "bulk_carrier", 1000, "dwt")),
    ];
    let guesser = make_guesser(&mut f, guess_data, vec![], Required::ALL).unwrap();
    let guess = guesser
        .guess_missing_vessel_info(&values! { "ship_type" => "bulk_carrier" })
        .unwrap();
    assert_has_entries(&guess, &values! { "engine_kw" => 1000, "size" => 5000, "size_unit" => "dwt" });
}

#[test]
fn rejects_size_without_ship_type() {
    let mut f = AttrFactory::new();
    let guesser = make_guesser(&mut f, vec![], vec![], Required::ALL).unwrap();
    for input in [values! { "size" => 5000 }, values! { "size_unit" => "dwt" }, values! { "ship_type" => Value::Null, "size" => 1 }] {
        assert!(matches!(guesser.guess_missing_vessel_info(&input), Err(Error::InvalidInput(_))));
    }
}

// ============================================================================
// NOx tier
// ============================================================================

fn tier(f: &mut AttrFactory, tier: EngineNOxTier) -> Values {
    f.only(&["engine_nox_tier"], values! { "engine_nox_tier" => tier })
}

fn guessed_tier(guess: &Values) -> Option<EngineNOxTier> {
    guess.get("engine_nox_tier").and_then(Value::as_nox_tier)
}

#[test]
fn nox_tier_for_given_keel_laid_year() {
    let mut f = AttrFactory::new();
    let guess_data = vec![
        (json!({"keel_laid_year": 2000}), tier(&mut f, EngineNOxTier::Tier1)),
        (json!({"keel_laid_year": 2002}), tier(&mut f, EngineNOxTier::Tier2)),
        (json!({"keel_laid_year": {"ge": 2003, "lt": 9999}}), tier(&mut f, EngineNOxTier::Tier3)),
    ];
    let guesser = make_guesser(&mut f, guess_data, vec![], Required::ALL).unwrap();
    let guess = guesser
        .guess_missing_vessel_info(&values! {
            "engine_category" => EngineCategory::C3,
            "keel_laid_year" => 2002,
            "year_of_build" => 2004,
        })
        .unwrap();
    assert_eq!(guessed_tier(&guess), Some(EngineNOxTier::Tier2));
}

fn keel_rules(f: &mut AttrFactory) -> Vec<(serde_json::Value, Values)> {
    vec![
        (json!({"keel_laid_year": 2002}), tier(f, EngineNOxTier::Tier2)),
        (json!({}), tier(f, EngineNOxTier::Tier3)),
    ]
}

fn build_times() -> Vec<(serde_json::Value, serde_json::Value)> {
    vec![
        (json!({"ship_type": "bulk_carrier"}), json!(2)),
        (json!({"ship_type": "container_ship"}), json!(3)),
        (json!({}), json!(4)),
    ]
}

#[test]
fn nox_tier_for_keel_laid_year_derived_from_given_info() {
    let mut f = AttrFactory::new();
    let guess_data = keel_rules(&mut f);
    let guesser = make_guesser(&mut f, guess_data, build_times(), Required::ALL).unwrap();
    let guess = guesser
        .guess_missing_vessel_info(&values! {
            "engine_category" => EngineCategory::C3,
            "ship_type" => ShipType::ContainerShip,
            "keel_laid_year" => Value::Null,
            "year_of_build" => 2005,
        })
        .unwrap();
    assert_eq!(guessed_tier(&guess), Some(EngineNOxTier::Tier2));
}

#[test]
fn nox_tier_for_keel_laid_year_derived_from_guessed_info() {
    let mut f = AttrFactory::new();
    let mut guess_data = vec![
        (
            json!({"ais_type": 70, "length": 100}),
            f.only(&TYPE_AND_SIZE, values! { "ship_type" => "bulk_carrier" }),
        ),
        (
            json!({"ais_type": 70, "length": 200}),
            f.only(&TYPE_AND_SIZE, values! { "ship_type" => "container_ship" }),
        ),
    ];
    guess_data.extend(keel_rules(&mut f));
    let guesser = make_guesser(&mut f, guess_data, build_times(), Required::ALL).unwrap();
    let guess = guesser
        .guess_missing_vessel_info(&values! {
            "engine_category" => EngineCategory::C3,
            "ais_type" => 70,
            "length" => 200,
            "keel_laid_year" => Value::Null,
            "year_of_build" => 2005,
        })
        .unwrap();
    assert_eq!(guess["ship_type"], Value::from(ShipType::ContainerShip));
    assert_eq!(guessed_tier(&guess), Some(EngineNOxTier::Tier2));
}

#[test]
fn nox_tier_left_alone_for_c1_and_c2() {
    for category in [EngineCategory::C1, EngineCategory::C2] {
        let mut f = AttrFactory::new();
        let guess_data = keel_rules(&mut f);
        let guesser = make_guesser(
            &mut f,
            guess_data,
            vec![(json!({"ship_type": "container_ship"}), json!(3))],
            Required::ALL,
        )
        .unwrap();
        let guess = guesser
            .guess_missing_vessel_info(&values! {
                "engine_category" => category,
                "ship_type" => "container_ship",
                "keel_laid_year" => Value::Null,
                "year_of_build" => 2005,
            })
            .unwrap();
        assert_eq!(guessed_tier(&guess), Some(EngineNOxTier::Tier3));
    }
}

#[test]
fn given_nox_tier_wins_over_keel_laid_year() {
    let mut f = AttrFactory::new();
    let guess_data = vec![(json!({"keel_laid_year": 2000}), tier(&mut f, EngineNOxTier::Tier1))];
    let guesser = make_guesser(&mut f, guess_data, vec![], Required::ALL).unwrap();
    let guess = guesser
        .guess_missing_vessel_info(&values! {
            "engine_category" => EngineCategory::C3,
            "keel_laid_year" => 2000,
            "engine_nox_tier" => EngineNOxTier::Tier3,
        })
        .unwrap();
    assert_eq!(guessed_tier(&guess), Some(EngineNOxTier::Tier3));
}

#[test]
fn given_nox_tier_wins_over_year_of_build() {
    let mut f = AttrFactory::new();
    let guess_data = vec![(json!({"keel_laid_year": 2002}), tier(&mut f, EngineNOxTier::Tier1))];
    let guesser = make_guesser(&mut f, guess_data, vec![(json!({}), json!(3))], Required::ALL).unwrap();
    let guess = guesser
        .guess_missing_vessel_info(&values! {
            "engine_category" => EngineCategory::C3,
            "ship_type" => "container_ship",
            "keel_laid_year" => Value::Null,
            "year_of_build" => 2005,
            "engine_nox_tier" => EngineNOxTier::Tier3,
        })
        .unwrap();
    assert_eq!(guessed_tier(&guess), Some(EngineNOxTier::Tier3));
}

#[test]
fn null_nox_tier_skips_keel_laid_year_estimate() {
    let mut f = AttrFactory::new();
    let guess_data = keel_rules(&mut f);
    let guesser = make_guesser(&mut f, guess_data, build_times(), Required::ALL).unwrap();
    let guess = guesser
        .guess_missing_vessel_info(&values! {
            "engine_category" => EngineCategory::C3,
            "ship_type" => ShipType::ContainerShip,
            "keel_laid_year" => Value::Null,
            "year_of_build" => 2005,
            "engine_nox_tier" => Value::Null,
        })
        .unwrap();
    // the keel year estimate would give tier 2, the criteria-less rule gives tier 3
    assert_eq!(guessed_tier(&guess), Some(EngineNOxTier::Tier3));
}

// ============================================================================
// Construction
// ============================================================================

fn assert_invalid_configuration<T: std::fmt::Debug>(result: poeminv_engine::Result<T>) {
    assert!(matches!(result, Err(Error::InvalidConfiguration(_))), "got {result:?}");
}

#[test]
fn rejects_unknown_attribute() {
    let mut f = AttrFactory::new();
    let data = f.attrs(values! { "not_a_vessel_info_attr" => 123 });
    assert_invalid_configuration(make_guesser(&mut f, vec![(json!({}), data)], vec![], Required::ALL));
}

#[test]
fn rejects_invalid_attribute_type() {
    let mut f = AttrFactory::new();
    let data = f.attrs(values! { "engine_rpm" => "not a number" });
    assert_invalid_configuration(make_guesser(&mut f, vec![(json!({}), data)], vec![], Required::ALL));
}

#[test]
fn rejects_incomplete_defaults() {
    let mut f = AttrFactory::new();
    let names: Vec<&str> = VesselInfo::FIELD_NAMES.iter().copied().filter(|n| *n != "max_speed").collect();
    let data = f.only(&names, Values::new());
    let required = Required { ship_type_sizes: true, defaults: false };
    assert_invalid_configuration(make_guesser(&mut f, vec![(json!({}), data)], vec![(json!({}), json!(1))], required));
}

#[test]
fn accepts_defaults_spread_over_rules() {
    let mut f = AttrFactory::new();
    let names: Vec<&str> = VesselInfo::FIELD_NAMES.iter().copied().filter(|n| *n != "max_speed").collect();
    let guess_data = vec![
        (json!({}), f.only(&names, Values::new())),
        (json!({}), f.only(&["max_speed"], Values::new())),
    ];
    let required = Required { ship_type_sizes: true, defaults: false };
    assert!(make_guesser(&mut f, guess_data, vec![(json!({}), json!(1))], required).is_ok());
}

#[test]
fn rejects_size_unit_of_other_ship_type() {
    let mut f = AttrFactory::new();
    let data = f.attrs(values! { "ship_type" => "oil_tanker", "size_unit" => "teu" });
    assert_invalid_configuration(make_guesser(&mut f, vec![(json!({}), data)], vec![], Required::ALL));
}

#[test]
fn rejects_ship_type_and_size_given_separately() {
    let subsets: [&[&str]; 6] = [
        &["ship_type"],
        &["size"],
        &["size_unit"],
        &["ship_type", "size"],
        &["ship_type", "size_unit"],
        &["size", "size_unit"],
    ];
    for subset in subsets {
        let mut f = AttrFactory::new();
        let full = f.attrs(values! { "ship_type" => "tug" });
        let data: Values = full.into_iter().filter(|(k, _)| subset.contains(&k.as_str())).collect();
        let result = make_guesser(&mut f, vec![(json!({}), data)], vec![], Required::ALL);
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))), "{subset:?} should be rejected");
    }
}

#[test]
fn rejects_ship_type_without_size_rule() {
    for missing in ShipType::ALL {
        let mut f = AttrFactory::new();
        let guess_data: Vec<_> = ShipType::ALL
            .iter()
            .filter(|t| *t != missing)
            .map(|t| (json!({"ship_type": t.as_str()}), f.attrs(values! { "ship_type" => *t })))
            .collect();
        let required = Required { ship_type_sizes: false, defaults: true };
        assert_invalid_configuration(make_guesser(&mut f, guess_data, vec![], required));
    }
}

#[test]
fn rejects_invalid_build_time() {
    let mut f = AttrFactory::new();
    assert_invalid_configuration(make_guesser(&mut f, vec![], vec![(json!({}), json!("not a number"))], Required::ALL));
}

#[test]
fn rejects_missing_default_build_time() {
    let mut f = AttrFactory::new();
    let data = f.attrs(Values::new());
    let required = Required { ship_type_sizes: true, defaults: false };
    assert_invalid_configuration(make_guesser(&mut f, vec![(json!({}), data)], vec![], required));
}

#[test]
fn default_vessel_info_comes_from_first_criteria_less_rule() {
    let mut f = AttrFactory::new();
    let attrs = f.attrs(Values::new());
    let guess_data = vec![
        (json!({"length": 30}), f.attrs(Values::new())),
        (json!({}), attrs.clone()),
        (json!({"width": 150}), f.attrs(Values::new())),
        (json!({}), f.attrs(Values::new())),
    ];
    let required = Required { ship_type_sizes: true, defaults: false };
    let guesser = make_guesser(&mut f, guess_data, vec![(json!({}), json!(1))], required).unwrap();
    assert_eq!(guesser.default_vessel_info(), &VesselInfo::try_from(&attrs).unwrap());
}
