//! Declarative JSON form of a sweep.
//!
//! ```text
//! {
//!   "magnet_depth": [1, 3, 5],                 range: start, end, count
//!   "halbach_side": {"values": ["A", "B"]},    explicit list
//!   "ratio": [[0.1, 0.3, 3], [0.5, 0.9, 5]],   concatenated ranges
//!   "fixed": {"rpm": 1000},                    group, merged as-is
//!   "pos": {                                   nested
//!     "parameters": {"deg": [0, 90, 4]},
//!     "mode": "create",
//!     "func": {"degel": {"source": "deg", "scale": 4},
//!              "degmech": {"source": "deg", "offset": 45}}
//!   }
//! }
//! ```
//!
//! `select` functions map keys to `{"min": .., "max": ..}` bounds or to a
//! literal that must match. `"select": {..}` and `"create": {..}` are accepted
//! as shorthand for `mode` plus `func`.

use serde_json::{Map, Number, Value as Json};

use crate::error::SweepError;
use crate::sweep::{NestedSweep, SweepSpec, SweepValue, MAX_COMBOS};
use crate::value::{Params, Value};

pub fn spec_from_str(raw: &str) -> Result<SweepSpec, SweepError> {
    let json: Json = serde_json::from_str(raw).map_err(|e| invalid("<root>", e.to_string()))?;
    spec_from_json(&json)
}

pub fn spec_from_json(json: &Json) -> Result<SweepSpec, SweepError> {
    let Json::Object(map) = json else {
        return Err(invalid("<root>", "sweep must be a JSON object"));
    };
    let mut spec = SweepSpec::new();
    for (key, value) in map {
        spec.insert(key, lower(key, value)?);
    }
    Ok(spec)
}

fn lower(key: &str, json: &Json) -> Result<SweepValue, SweepError> {
    match json {
        Json::Null => Err(invalid(key, "null is not a sweep value")),
        Json::Array(items) => lower_array(key, items),
        Json::Object(map) => lower_object(key, map),
        scalar => Ok(SweepValue::Scalar(scalar_value(key, scalar)?)),
    }
}

fn lower_array(key: &str, items: &[Json]) -> Result<SweepValue, SweepError> {
    if items.len() == 3 && items.iter().all(Json::is_number) {
        let start = number(key, &items[0])?;
        let end = number(key, &items[1])?;
        let count = number(key, &items[2])?;
        if count < 0.0 || count.fract() != 0.0 {
            return Err(invalid(key, format!("range count must be a non-negative integer, got {count}")));
        }
        if count > MAX_COMBOS as f64 {
            return Err(invalid(key, format!("range count {count} exceeds the limit of {MAX_COMBOS}")));
        }
        return Ok(SweepValue::range(start, end, count as usize));
    }
    let parts = items
        .iter()
        .map(|item| lower(key, item))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SweepValue::Concat(parts))
}

fn lower_object(key: &str, map: &Map<String, Json>) -> Result<SweepValue, SweepError> {
    if let Some(values) = map.get("values") {
        let Json::Array(items) = values else {
            return Err(invalid(key, "'values' must be an array"));
        };
        let values = items
            .iter()
            .map(|item| scalar_value(key, item))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(SweepValue::List(values));
    }

    if let Some(parameters) = map.get("parameters") {
        let parameters = spec_from_json(parameters)?;
        let (mode, func) = nested_mode(key, map)?;
        return match mode {
            "select" => {
                let rules = select_rules(key, func)?;
                Ok(NestedSweep::select(parameters, move |combo| rules.iter().all(|r| r.accepts(combo))).into())
            }
            "create" => {
                let rules = create_rules(key, func)?;
                Ok(NestedSweep::create(parameters, move |combo| derive(&rules, combo)).into())
            }
            other => Err(SweepError::UnknownMode(other.to_string())),
        };
    }

    let mut group = Params::new();
    for (name, value) in map {
        group.insert(name, scalar_value(key, value)?);
    }
    Ok(SweepValue::Group(group))
}

fn nested_mode<'a>(key: &str, map: &'a Map<String, Json>) -> Result<(&'a str, &'a Json), SweepError> {
    for shorthand in ["select", "create"] {
        if let Some(func) = map.get(shorthand) {
            return Ok((shorthand, func));
        }
    }
    let mode = match map.get("mode") {
        None => "select",
        Some(Json::String(mode)) => mode.as_str(),
        Some(other) => return Err(SweepError::UnknownMode(other.to_string())),
    };
    let func = map
        .get("func")
        .ok_or_else(|| invalid(key, "nested sweep needs a 'func'"))?;
    Ok((mode, func))
}

enum SelectRule {
    Within { key: String, min: f64, max: f64 },
    Equals { key: String, value: Value },
}

impl SelectRule {
    fn accepts(&self, combo: &Params) -> bool {
        match self {
            SelectRule::Within { key, min, max } => combo
                .get_f64(key)
                .is_some_and(|v| v >= *min && v <= *max),
            SelectRule::Equals { key, value } => combo.get(key).is_some_and(|v| v.loosely_eq(value)),
        }
    }
}

fn select_rules(key: &str, func: &Json) -> Result<Vec<SelectRule>, SweepError> {
    let Json::Object(map) = func else {
        return Err(invalid(key, "select func must be an object"));
    };
    let mut rules = Vec::new();
    for (name, rule) in map {
        match rule {
            Json::Object(bounds) => {
                let min = bounds.get("min").map(|v| number(key, v)).transpose()?;
                let max = bounds.get("max").map(|v| number(key, v)).transpose()?;
                rules.push(SelectRule::Within {
                    key: name.clone(),
                    min: min.unwrap_or(f64::NEG_INFINITY),
                    max: max.unwrap_or(f64::INFINITY),
                });
            }
            other => rules.push(SelectRule::Equals {
                key: name.clone(),
                value: scalar_value(key, other)?,
            }),
        }
    }
    Ok(rules)
}

enum CreateRule {
    Affine {
        out: String,
        source: String,
        scale: f64,
        offset: f64,
    },
    Constant {
        out: String,
        value: Value,
    },
}

fn create_rules(key: &str, func: &Json) -> Result<Vec<CreateRule>, SweepError> {
    let Json::Object(map) = func else {
        return Err(invalid(key, "create func must be an object"));
    };
    let mut rules = Vec::new();
    for (out, rule) in map {
        match rule {
            Json::Object(affine) => {
                let source = match affine.get("source") {
                    Some(Json::String(source)) => source.clone(),
                    _ => return Err(invalid(key, format!("derivation of '{out}' needs a 'source' key"))),
                };
                let scale = affine.get("scale").map(|v| number(key, v)).transpose()?;
                let offset = affine.get("offset").map(|v| number(key, v)).transpose()?;
                rules.push(CreateRule::Affine {
                    out: out.clone(),
                    source,
                    scale: scale.unwrap_or(1.0),
                    offset: offset.unwrap_or(0.0),
                });
            }
            other => rules.push(CreateRule::Constant {
                out: out.clone(),
                value: scalar_value(key, other)?,
            }),
        }
    }
    Ok(rules)
}

fn derive(rules: &[CreateRule], combo: &Params) -> Option<Params> {
    let mut out = Params::new();
    for rule in rules {
        match rule {
            CreateRule::Affine {
                out: name,
                source,
                scale,
                offset,
            } => out.insert(name, scale * combo.get_f64(source)? + offset),
            CreateRule::Constant { out: name, value } => out.insert(name, value.clone()),
        }
    }
    Some(out)
}

fn scalar_value(key: &str, json: &Json) -> Result<Value, SweepError> {
    match json {
        Json::Bool(v) => Ok(Value::Bool(*v)),
        Json::String(v) => Ok(Value::Text(v.clone())),
        Json::Number(n) => Ok(number_value(n)),
        _ => Err(invalid(key, format!("expected a scalar, got {json}"))),
    }
}

fn number_value(n: &Number) -> Value {
    match n.as_i64() {
        Some(v) => Value::Int(v),
        None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
    }
}

fn number(key: &str, json: &Json) -> Result<f64, SweepError> {
    json.as_f64()
        .ok_or_else(|| invalid(key, format!("expected a number, got {json}")))
}

fn invalid(key: &str, message: impl Into<String>) -> SweepError {
    SweepError::InvalidSpec {
        key: key.to_string(),
        message: message.into(),
    }
}
