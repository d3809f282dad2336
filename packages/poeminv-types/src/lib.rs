//! # poeminv-types
//!
//! Shared vessel, engine and pollutant types for the poeminv port emission
//! inventory.
//!
//! These types are used by:
//! - `poeminv-engine`: rule matching, vessel inference and emission calculation
//! - `cli-rust`: parsing command-line and file input into engine calls
//!
//! ## Conventions
//!
//! - Speeds are in knots, distances in meters unless suffixed `_nm`
//! - Bearings are degrees clockwise from north, in `[0, 360)`
//! - Pollutant masses are in grams, emission factors in g/kWh

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── Errors ────────────────────────────────────────────────────────────────────

/// Failure to turn a raw value into one of the domain enums.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("expected a scalar value, got {0}")]
    NotScalar(String),
}

// ── String Enums ──────────────────────────────────────────────────────────────

/// Declares a closed enum whose variants map 1:1 onto configuration strings.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant, )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok($name::$variant), )+
                    other => Err(ParseError::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl From<$name> for Value {
            fn from(v: $name) -> Self {
                Value::Text(v.as_str().to_string())
            }
        }
    };
}

string_enum! {
    /// Operating regime of a vessel during an emission event.
    Mode, "mode" {
        Transit => "transit",
        Maneuvering => "maneuvering",
        Hotelling => "hotelling",
        Anchorage => "anchorage",
    }
}

impl Mode {
    /// Whether the vessel is under way (propulsion engines running).
    pub fn is_moving(&self) -> bool {
        matches!(self, Mode::Transit | Mode::Maneuvering)
    }
}

string_enum! {
    /// Engine group an emission factor or power rating belongs to.
    EngineGroup, "engine group" {
        Propulsion => "propulsion",
        Auxiliary => "auxiliary",
        Boiler => "boiler",
    }
}

impl EngineGroup {
    /// Groups whose power is not derived from speed.
    pub const NON_PROPULSION: &'static [EngineGroup] =
        &[EngineGroup::Auxiliary, EngineGroup::Boiler];
}

string_enum! {
    /// IMO engine category by displacement per cylinder.
    EngineCategory, "engine category" {
        C1 => "c1",
        C2 => "c2",
        C3 => "c3",
    }
}

string_enum! {
    /// Unit in which the size of a ship type is measured.
    ShipSizeUnit, "ship size unit" {
        NotApplicable => "n/a",
        Dwt => "dwt",
        Teu => "teu",
        Gt => "gt",
        NumberVehicles => "number_vehicles",
    }
}

string_enum! {
    /// Fixed ship type categories used by the emission rules.
    ShipType, "ship type" {
        Barge => "barge",
        CrewSupply => "crew_supply",
        Excursion => "excursion",
        Fishing => "fishing",
        TowboatPushboat => "towboat_pushboat",
        Dredging => "dredging",
        Sailing => "sailing",
        Recreational => "recreational",
        Pilot => "pilot",
        Tug => "tug",
        Workboat => "workboat",
        Government => "government",
        BulkCarrier => "bulk_carrier",
        ChemicalTanker => "chemical_tanker",
        ContainerShip => "container_ship",
        Cruise => "cruise",
        FerryPassenger => "ferry_passenger",
        FerryRoroPassenger => "ferry_roro_passenger",
        GeneralCargo => "general_cargo",
        LiquifiedGasTanker => "liquified_gas_tanker",
        /// Spelling kept as used in existing configuration files.
        OffshoreSupportDrillship => "offshort_support_drillship",
        OilTanker => "oil_tanker",
        OtherService => "other_service",
        OtherTanker => "other_tanker",
        Reefer => "reefer",
        Roro => "roro",
        VehicleCarrier => "vehicle_carrier",
        Misc => "misc",
    }
}

impl ShipType {
    /// Size units that may be paired with this ship type.
    pub fn valid_size_units(&self) -> &'static [ShipSizeUnit] {
        use ShipSizeUnit::*;
        match self {
            ShipType::BulkCarrier
            | ShipType::ChemicalTanker
            | ShipType::GeneralCargo
            | ShipType::LiquifiedGasTanker
            | ShipType::OilTanker => &[Dwt],
            ShipType::ContainerShip => &[Teu],
            ShipType::Cruise | ShipType::FerryRoroPassenger | ShipType::Roro => &[Gt],
            ShipType::FerryPassenger => &[Gt, NotApplicable],
            ShipType::VehicleCarrier => &[NumberVehicles],
            _ => &[NotApplicable],
        }
    }

    pub fn accepts_size_unit(&self, unit: ShipSizeUnit) -> bool {
        self.valid_size_units().contains(&unit)
    }
}

// ── NOx Tier ──────────────────────────────────────────────────────────────────

/// IMO NOx emission tier. Serialized as its integer level.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum EngineNOxTier {
    Unclassified = 0,
    Tier1 = 1,
    Tier2 = 2,
    Tier3 = 3,
}

impl EngineNOxTier {
    pub const ALL: &'static [EngineNOxTier] = &[
        EngineNOxTier::Unclassified,
        EngineNOxTier::Tier1,
        EngineNOxTier::Tier2,
        EngineNOxTier::Tier3,
    ];

    pub fn level(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for EngineNOxTier {
    type Error = ParseError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(Self::Unclassified),
            1 => Ok(Self::Tier1),
            2 => Ok(Self::Tier2),
            3 => Ok(Self::Tier3),
            other => Err(ParseError::UnknownVariant {
                kind: "engine NOx tier",
                value: other.to_string(),
            }),
        }
    }
}

impl From<EngineNOxTier> for u8 {
    fn from(t: EngineNOxTier) -> Self {
        t.level()
    }
}

impl fmt::Display for EngineNOxTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

impl From<EngineNOxTier> for Value {
    fn from(t: EngineNOxTier) -> Self {
        Value::Number(f64::from(t.level()))
    }
}

// ── Dynamic Values ────────────────────────────────────────────────────────────

/// A loosely typed attribute value as it appears in rule criteria and in the
/// attribute bags matched against them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Parses the value as one of the string enums above.
    pub fn parse<T: FromStr<Err = ParseError>>(&self) -> Result<T, ParseError> {
        match self {
            Value::Text(s) => s.parse(),
            other => Err(ParseError::UnknownVariant {
                kind: std::any::type_name::<T>(),
                value: other.to_string(),
            }),
        }
    }

    /// Interprets the value as a NOx tier level.
    pub fn as_nox_tier(&self) -> Option<EngineNOxTier> {
        let n = self.as_f64()?;
        if n.fract() != 0.0 || !(0.0..=255.0).contains(&n) {
            return None;
        }
        EngineNOxTier::try_from(n as u8).ok()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Number(f64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Number(f64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl TryFrom<&serde_json::Value> for Value {
    type Error = ParseError;

    fn try_from(v: &serde_json::Value) -> Result<Self, Self::Error> {
        match v {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(Value::Number)
                .ok_or_else(|| ParseError::NotScalar(n.to_string())),
            serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
            other => Err(ParseError::NotScalar(other.to_string())),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Value::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

/// Named attribute bag matched against rule criteria.
pub type Values = BTreeMap<String, Value>;

/// Builds a [`Values`] bag from `name => value` pairs.
///
/// ```
/// use poeminv_types::{values, Value};
/// let v = values! { "length" => 120.0, "ship_type" => "tug" };
/// assert_eq!(v["ship_type"], Value::from("tug"));
/// ```
#[macro_export]
macro_rules! values {
    () => { $crate::Values::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut v = $crate::Values::new();
        $( v.insert(::std::string::String::from($name), $crate::Value::from($value)); )+
        v
    }};
}

// ── Pollutant Maps ────────────────────────────────────────────────────────────

/// Pollutant name to amount (grams, or g/kWh, or a unitless factor).
pub type PollutantMap = BTreeMap<String, f64>;

/// Union of both maps; amounts present in both are summed.
pub fn merge_add(a: &PollutantMap, b: &PollutantMap) -> PollutantMap {
    let mut out = a.clone();
    merge_add_into(&mut out, b);
    out
}

/// In-place variant of [`merge_add`].
pub fn merge_add_into(acc: &mut PollutantMap, other: &PollutantMap) {
    for (k, v) in other {
        *acc.entry(k.clone()).or_insert(0.0) += v;
    }
}

/// Keys of `base` only; values also present in `factors` are multiplied.
pub fn merge_mul(base: &PollutantMap, factors: &PollutantMap) -> PollutantMap {
    base.iter()
        .map(|(k, v)| (k.clone(), factors.get(k).map_or(*v, |f| v * f)))
        .collect()
}

/// Every amount multiplied by `factor`.
pub fn scale(map: &PollutantMap, factor: f64) -> PollutantMap {
    map.iter().map(|(k, v)| (k.clone(), v * factor)).collect()
}
