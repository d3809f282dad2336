//! vessel.rs — Validated vessel characteristics

use poeminv_types::{
    EngineCategory, EngineNOxTier, ShipSizeUnit, ShipType, Value, Values,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Complete, validated description of a vessel.
///
/// Built once and never mutated. Re-guessing attributes produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawVesselInfo")]
pub struct VesselInfo {
    /// Design speed in knots, > 0
    max_speed: f64,
    /// Installed main engine power in kW, > 0
    engine_kw: f64,
    /// Main engine rpm, > 0
    engine_rpm: f64,
    engine_category: EngineCategory,
    engine_nox_tier: EngineNOxTier,
    ship_type: ShipType,
    /// Size in `size_unit`, >= 0
    size: f64,
    /// Must be one of the ship type's valid size units
    size_unit: ShipSizeUnit,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawVesselInfo {
    max_speed: f64,
    engine_kw: f64,
    engine_rpm: f64,
    engine_category: EngineCategory,
    engine_nox_tier: EngineNOxTier,
    ship_type: ShipType,
    size: f64,
    size_unit: ShipSizeUnit,
}

impl TryFrom<RawVesselInfo> for VesselInfo {
    type Error = Error;

    fn try_from(r: RawVesselInfo) -> Result<Self> {
        VesselInfo::new(
            r.max_speed,
            r.engine_kw,
            r.engine_rpm,
            r.engine_category,
            r.engine_nox_tier,
            r.ship_type,
            r.size,
            r.size_unit,
        )
    }
}

impl VesselInfo {
    /// Attribute names, in the order they appear in attribute bags.
    pub const FIELD_NAMES: [&'static str; 8] = [
        "max_speed",
        "engine_kw",
        "engine_rpm",
        "engine_category",
        "engine_nox_tier",
        "ship_type",
        "size",
        "size_unit",
    ];

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        max_speed: f64,
        engine_kw: f64,
        engine_rpm: f64,
        engine_category: EngineCategory,
        engine_nox_tier: EngineNOxTier,
        ship_type: ShipType,
        size: f64,
        size_unit: ShipSizeUnit,
    ) -> Result<Self> {
        let info = Self {
            max_speed,
            engine_kw,
            engine_rpm,
            engine_category,
            engine_nox_tier,
            ship_type,
            size,
            size_unit,
        };
        let valid = max_speed > 0.0
            && engine_kw > 0.0
            && engine_rpm > 0.0
            && size >= 0.0
            && ship_type.accepts_size_unit(size_unit);
        if !valid {
            return Err(Error::InvalidValue(format!("invalid vessel info {info:?}")));
        }
        Ok(info)
    }

    pub fn is_field_name(name: &str) -> bool {
        Self::FIELD_NAMES.contains(&name)
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    pub fn engine_kw(&self) -> f64 {
        self.engine_kw
    }

    pub fn engine_rpm(&self) -> f64 {
        self.engine_rpm
    }

    pub fn engine_category(&self) -> EngineCategory {
        self.engine_category
    }

    pub fn engine_nox_tier(&self) -> EngineNOxTier {
        self.engine_nox_tier
    }

    pub fn ship_type(&self) -> ShipType {
        self.ship_type
    }

    pub fn size(&self) -> f64 {
        self.size
    }

    pub fn size_unit(&self) -> ShipSizeUnit {
        self.size_unit
    }

    /// All attributes as a bag, for matching against rule criteria.
    pub fn to_values(&self) -> Values {
        poeminv_types::values! {
            "max_speed" => self.max_speed,
            "engine_kw" => self.engine_kw,
            "engine_rpm" => self.engine_rpm,
            "engine_category" => self.engine_category,
            "engine_nox_tier" => self.engine_nox_tier,
            "ship_type" => self.ship_type,
            "size" => self.size,
            "size_unit" => self.size_unit,
        }
    }
}

impl TryFrom<&Values> for VesselInfo {
    type Error = Error;

    /// Builds from a bag holding exactly the eight vessel attributes.
    fn try_from(values: &Values) -> Result<Self> {
        if let Some(unknown) = values.keys().find(|k| !Self::is_field_name(k)) {
            return Err(Error::InvalidValue(format!("{unknown} is not a vessel attribute")));
        }
        let nox_tier = attr(values, "engine_nox_tier")?;
        VesselInfo::new(
            number_attr(values, "max_speed")?,
            number_attr(values, "engine_kw")?,
            number_attr(values, "engine_rpm")?,
            attr(values, "engine_category")?.parse()?,
            nox_tier
                .as_nox_tier()
                .ok_or_else(|| Error::InvalidValue(format!("invalid engine_nox_tier {nox_tier}")))?,
            attr(values, "ship_type")?.parse()?,
            number_attr(values, "size")?,
            attr(values, "size_unit")?.parse()?,
        )
    }
}

fn attr<'a>(values: &'a Values, name: &str) -> Result<&'a Value> {
    values
        .get(name)
        .filter(|v| !v.is_null())
        .ok_or_else(|| Error::InvalidValue(format!("missing vessel attribute {name}")))
}

fn number_attr(values: &Values, name: &str) -> Result<f64> {
    let v = attr(values, name)?;
    v.as_f64()
        .ok_or_else(|| Error::InvalidValue(format!("{name} must be a number, got {v}")))
}
