//! match_config.rs — Rules: a conjunction of criteria plus a data payload
//!
//! Rules are parsed from documents shaped like
//!
//! ```text
//! { "match_criteria": { "ship_type": "tug",
//!                       "length": { "ge": 5, "lt": 25 },
//!                       "width": { "any_of": [1, { "ge": 3, "lt": 6 }] } },
//!   "g_per_kwh": 12.5 }
//! ```
//!
//! Every key besides `match_criteria` is kept as the rule's data.

use std::collections::BTreeMap;

use poeminv_types::{Value, Values};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as Json};

use crate::criterion::Criterion;
use crate::error::{Error, Result};

const CRITERIA_KEY: &str = "match_criteria";

/// Untyped rule payload, as found in the configuration document.
pub type Data = Map<String, Json>;

/// A rule whose data applies wherever all of its criteria hold.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig<D = Data> {
    /// Criteria by attribute name. All must match.
    pub criteria: BTreeMap<String, Criterion>,
    /// Payload, interpreted by the rule collection owning this rule.
    pub data: D,
}

impl<D> MatchConfig<D> {
    /// True iff every criterion matches. A rule without criteria matches anything.
    pub fn matches(&self, values: &Values) -> bool {
        self.criteria.values().all(|c| c.matches(values))
    }

    pub fn is_criteria_less(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Whether the criteria are keyed on exactly `name` and nothing else.
    pub fn has_only_criterion(&self, name: &str) -> bool {
        self.criteria.len() == 1 && self.criteria.contains_key(name)
    }
}

/// Data of the first rule in `rules` matching `values`.
pub fn first_match<'a, D>(rules: &'a [MatchConfig<D>], values: &Values) -> Option<&'a D> {
    rules.iter().find(|r| r.matches(values)).map(|r| &r.data)
}

impl MatchConfig<Data> {
    pub fn from_json(spec: &Json) -> Result<Self> {
        let obj = spec
            .as_object()
            .ok_or_else(|| Error::InvalidConfiguration(format!("rule must be a mapping: {spec}")))?;
        let raw_criteria = obj
            .get(CRITERIA_KEY)
            .and_then(Json::as_object)
            .ok_or_else(|| Error::InvalidConfiguration(format!("missing criteria in {spec}")))?;
        let criteria = raw_criteria
            .iter()
            .map(|(name, c)| Ok((name.clone(), criterion_from_spec(name, c)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;
        let data = obj
            .iter()
            .filter(|(k, _)| k.as_str() != CRITERIA_KEY)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(Self { criteria, data })
    }

    /// Parses a list of rules, keeping their order.
    pub fn list_from_json(spec: &Json) -> Result<Vec<Self>> {
        spec.as_array()
            .ok_or_else(|| Error::InvalidConfiguration(format!("expected a list of rules: {spec}")))?
            .iter()
            .map(Self::from_json)
            .collect()
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(Json::as_f64)
    }

    /// Data entry as a scalar [`Value`]. Missing and structured entries are `None`.
    pub fn value(&self, key: &str) -> Option<Value> {
        self.data.get(key).and_then(|v| Value::try_from(v).ok())
    }

    /// The same rule with its payload deserialized into `T`.
    pub fn typed<T: DeserializeOwned>(&self) -> Result<MatchConfig<T>> {
        let raw = Json::Object(self.data.clone());
        let data = serde_json::from_value(raw.clone())
            .map_err(|e| Error::InvalidConfiguration(format!("invalid rule data {raw}: {e}")))?;
        Ok(MatchConfig { criteria: self.criteria.clone(), data })
    }
}

fn criterion_from_spec(name: &str, spec: &Json) -> Result<Criterion> {
    let Some(obj) = spec.as_object() else {
        let value = Value::try_from(spec)
            .map_err(|e| Error::InvalidConfiguration(format!("invalid criterion for {name}: {e}")))?;
        return Criterion::equals(name, value);
    };
    if let (Some(ge), Some(lt)) = (obj.get("ge"), obj.get("lt")) {
        return match (ge.as_f64(), lt.as_f64()) {
            (Some(ge), Some(lt)) => Criterion::range(name, ge, lt),
            _ => Err(Error::InvalidConfiguration(format!(
                "range bounds for {name} must be numbers: {spec}"
            ))),
        };
    }
    match obj.get("any_of").and_then(Json::as_array) {
        Some(subs) => {
            let criteria = subs
                .iter()
                .map(|s| criterion_from_spec(name, s))
                .collect::<Result<Vec<_>>>()?;
            Criterion::any_of(name, criteria)
        }
        None => Err(Error::InvalidConfiguration(format!("invalid criterion for {name}: {spec}"))),
    }
}
