//! criterion.rs — Named predicates over attribute bags
//!
//! A criterion is bound to one attribute name and checks the value found under
//! that name in a [`Values`] bag. Names must be registered before use; the
//! built-in names cover the vessel attributes plus a few matching-only context
//! attributes (`length`, `width`, `ais_type`, `keel_laid_year`, `year_of_build`).
//! A name may carry a validator that constant values in criteria must satisfy.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use poeminv_types::{
    EngineCategory, EngineGroup, ShipSizeUnit, ShipType, Value, Values,
};

use crate::error::{Error, Result};
use crate::range::Range;

/// Predicate a constant criterion value must satisfy.
pub type Validator = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Process-wide name registry, seeded with the built-in names on first use.
static NAME_REGISTRY: OnceLock<RwLock<HashMap<String, Option<Validator>>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<String, Option<Validator>>> {
    NAME_REGISTRY.get_or_init(|| RwLock::new(builtin_names()))
}

fn non_negative(v: &Value) -> bool {
    v.as_f64().is_some_and(|n| n >= 0.0)
}

fn parses_as<T: std::str::FromStr>(v: &Value) -> bool {
    v.as_str().is_some_and(|s| s.parse::<T>().is_ok())
}

fn validator<F>(f: F) -> Option<Validator>
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    Some(Arc::new(f))
}

fn builtin_names() -> HashMap<String, Option<Validator>> {
    [
        ("max_speed", validator(non_negative)),
        ("engine_kw", validator(non_negative)),
        ("engine_rpm", validator(non_negative)),
        ("engine_category", validator(parses_as::<EngineCategory>)),
        ("engine_nox_tier", validator(|v: &Value| v.as_nox_tier().is_some())),
        ("ship_type", validator(parses_as::<ShipType>)),
        ("size", validator(non_negative)),
        ("size_unit", validator(parses_as::<ShipSizeUnit>)),
        ("engine_group", validator(parses_as::<EngineGroup>)),
        ("length", validator(non_negative)),
        ("width", validator(non_negative)),
        ("ais_type", None),
        ("keel_laid_year", None),
        ("year_of_build", None),
    ]
    .into_iter()
    .map(|(name, v)| (name.to_string(), v))
    .collect()
}

/// Registers a criterion name without a value validator.
///
/// Fails if the name is already registered.
pub fn register_name(name: &str) -> Result<()> {
    insert_name(name, None)
}

/// Registers a criterion name whose constant values must satisfy `validator`.
pub fn register_name_with<F>(name: &str, validator: F) -> Result<()>
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    insert_name(name, Some(Arc::new(validator)))
}

fn insert_name(name: &str, validator: Option<Validator>) -> Result<()> {
    let mut names = registry().write().unwrap_or_else(PoisonError::into_inner);
    if names.contains_key(name) {
        return Err(Error::InvalidConfiguration(format!("{name} was already registered")));
    }
    names.insert(name.to_string(), validator);
    Ok(())
}

pub fn is_registered(name: &str) -> bool {
    registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains_key(name)
}

// ── Criterion ─────────────────────────────────────────────────────────────────

/// Predicate over the value attached to `name` in an attribute bag.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    /// Value must equal a constant.
    Equals { name: String, value: Value },
    /// Value must be a number inside a range.
    Range { name: String, range: Range },
    /// Any of the sub-criteria (all bound to the same name) must match.
    Disjunction { name: String, criteria: Vec<Criterion> },
}

impl Criterion {
    pub fn equals(name: &str, value: impl Into<Value>) -> Result<Self> {
        let c = Criterion::Equals { name: name.to_string(), value: value.into() };
        c.validate()?;
        Ok(c)
    }

    pub fn range(name: &str, ge: f64, lt: f64) -> Result<Self> {
        let c = Criterion::Range { name: name.to_string(), range: Range::new(ge, lt)? };
        c.validate()?;
        Ok(c)
    }

    pub fn any_of(name: &str, criteria: Vec<Criterion>) -> Result<Self> {
        if criteria.iter().any(|c| c.name() != name) {
            return Err(Error::InvalidConfiguration(format!(
                "attribute names in criteria don't match {name}"
            )));
        }
        let c = Criterion::Disjunction { name: name.to_string(), criteria };
        c.validate()?;
        Ok(c)
    }

    pub fn name(&self) -> &str {
        match self {
            Criterion::Equals { name, .. }
            | Criterion::Range { name, .. }
            | Criterion::Disjunction { name, .. } => name,
        }
    }

    pub fn matches(&self, values: &Values) -> bool {
        match self {
            Criterion::Equals { name, value } => values.get(name) == Some(value),
            Criterion::Range { name, range } => values
                .get(name)
                .and_then(Value::as_f64)
                .is_some_and(|v| range.contains(v)),
            Criterion::Disjunction { criteria, .. } => criteria.iter().any(|c| c.matches(values)),
        }
    }

    fn validate(&self) -> Result<()> {
        let names = registry().read().unwrap_or_else(PoisonError::into_inner);
        let validator = names.get(self.name()).ok_or_else(|| {
            Error::InvalidConfiguration(format!("invalid criterion name {}", self.name()))
        })?;
        match validator {
            Some(v) if !self.value_fulfills(v.as_ref()) => {
                Err(Error::InvalidConfiguration(format!("invalid {} in {self:?}", self.name())))
            }
            _ => Ok(()),
        }
    }

    // Range bounds are not checked against the name's validator.
    fn value_fulfills(&self, validator: &(dyn Fn(&Value) -> bool + Send + Sync)) -> bool {
        match self {
            Criterion::Equals { value, .. } => validator(value),
            Criterion::Range { .. } => true,
            Criterion::Disjunction { criteria, .. } => {
                criteria.iter().all(|c| c.value_fulfills(validator))
            }
        }
    }
}
