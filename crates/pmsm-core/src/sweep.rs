//! Parameter-sweep expansion.
//!
//! A [`SweepSpec`] maps each key to a [`SweepValue`]. Every key is resolved on
//! its own into a list of [`Entry`] values (nested `select`/`create` filtering
//! happens here), then the lists are combined as a Cartesian product in key
//! order with the last key varying fastest. Group entries are merged into the
//! combo under their own keys, so one nested key may yield several columns.

use std::fmt;
use std::sync::Arc;

use crate::error::SweepError;
use crate::value::{Params, Value};

/// Upper bound on the entries of one range and on the combos of one spec.
pub const MAX_COMBOS: usize = 1_000_000;

pub type SelectFn = Arc<dyn Fn(&Params) -> bool + Send + Sync>;
pub type CreateFn = Arc<dyn Fn(&Params) -> Option<Params> + Send + Sync>;

#[derive(Clone)]
pub enum NestedMode {
    /// Keep sub-combos for which the predicate holds.
    Select(SelectFn),
    /// Map sub-combos through the function, dropping `None`.
    Create(CreateFn),
}

impl fmt::Debug for NestedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NestedMode::Select(_) => f.write_str("Select(..)"),
            NestedMode::Create(_) => f.write_str("Create(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NestedSweep {
    pub parameters: SweepSpec,
    pub mode: NestedMode,
}

impl NestedSweep {
    pub fn select(parameters: SweepSpec, predicate: impl Fn(&Params) -> bool + Send + Sync + 'static) -> Self {
        Self {
            parameters,
            mode: NestedMode::Select(Arc::new(predicate)),
        }
    }

    pub fn create(
        parameters: SweepSpec,
        derive: impl Fn(&Params) -> Option<Params> + Send + Sync + 'static,
    ) -> Self {
        Self {
            parameters,
            mode: NestedMode::Create(Arc::new(derive)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SweepValue {
    Scalar(Value),
    /// `count` evenly spaced samples from `start` to `end`, both included.
    Range { start: f64, end: f64, count: usize },
    List(Vec<Value>),
    /// Concatenation of the expansions of each part.
    Concat(Vec<SweepValue>),
    /// Fixed map merged into every combo.
    Group(Params),
    Nested(NestedSweep),
}

impl SweepValue {
    pub fn range(start: f64, end: f64, count: usize) -> Self {
        SweepValue::Range { start, end, count }
    }

    pub fn list<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        SweepValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<f64> for SweepValue {
    fn from(v: f64) -> Self {
        SweepValue::Scalar(Value::Float(v))
    }
}

impl From<Value> for SweepValue {
    fn from(v: Value) -> Self {
        SweepValue::Scalar(v)
    }
}

impl From<&str> for SweepValue {
    fn from(v: &str) -> Self {
        SweepValue::Scalar(Value::from(v))
    }
}

impl From<NestedSweep> for SweepValue {
    fn from(v: NestedSweep) -> Self {
        SweepValue::Nested(v)
    }
}

/// Ordered sweep description.
#[derive(Debug, Clone, Default)]
pub struct SweepSpec {
    entries: Vec<(String, SweepValue)>,
}

impl SweepSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<SweepValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<SweepValue>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    /// Every entry of `params` as a scalar key.
    pub fn from_params(params: &Params) -> Self {
        let mut spec = Self::new();
        for (key, value) in params.iter() {
            spec.insert(key, value.clone());
        }
        spec
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SweepValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One resolved value of a key: either a plain value stored under the key, or
/// a map whose keys are promoted into the combo.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Leaf(Value),
    Group(Params),
}

pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count)
                .map(|i| if i == count - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Resolves one key's value into its entry list.
pub fn resolve(key: &str, value: &SweepValue) -> Result<Vec<Entry>, SweepError> {
    match value {
        SweepValue::Scalar(v) => Ok(vec![Entry::Leaf(v.clone())]),
        SweepValue::Range { start, end, count } => {
            if !start.is_finite() || !end.is_finite() {
                return Err(SweepError::InvalidSpec {
                    key: key.to_string(),
                    message: format!("range bounds must be finite, got {start}..{end}"),
                });
            }
            if *count > MAX_COMBOS {
                return Err(SweepError::InvalidSpec {
                    key: key.to_string(),
                    message: format!("range count {count} exceeds the limit of {MAX_COMBOS}"),
                });
            }
            Ok(linspace(*start, *end, *count)
                .into_iter()
                .map(|v| Entry::Leaf(Value::Float(v)))
                .collect())
        }
        SweepValue::List(values) => Ok(values.iter().cloned().map(Entry::Leaf).collect()),
        SweepValue::Concat(parts) => {
            let mut out = Vec::new();
            for part in parts {
                out.extend(resolve(key, part)?);
            }
            Ok(out)
        }
        SweepValue::Group(params) => Ok(vec![Entry::Group(params.clone())]),
        SweepValue::Nested(nested) => {
            let combos = expand(&nested.parameters)?;
            let kept: Vec<Params> = match &nested.mode {
                NestedMode::Select(predicate) => combos.into_iter().filter(|c| predicate(c)).collect(),
                NestedMode::Create(derive) => combos.iter().filter_map(|c| derive(c)).collect(),
            };
            Ok(kept.into_iter().map(Entry::Group).collect())
        }
    }
}

/// Expands a spec into its combos. An empty spec yields one empty combo.
pub fn expand(spec: &SweepSpec) -> Result<Vec<Params>, SweepError> {
    let mut resolved = Vec::with_capacity(spec.len());
    for (key, value) in spec.iter() {
        resolved.push((key, resolve(key, value)?));
    }

    let mut product: Vec<Vec<(&str, &Entry)>> = vec![Vec::new()];
    for (key, entries) in &resolved {
        let size = product
            .len()
            .checked_mul(entries.len())
            .filter(|size| *size <= MAX_COMBOS)
            .ok_or_else(|| SweepError::InvalidSpec {
                key: key.to_string(),
                message: format!("sweep expands to more than {MAX_COMBOS} combos"),
            })?;
        let mut next = Vec::with_capacity(size);
        for prefix in &product {
            for entry in entries {
                let mut row = prefix.clone();
                row.push((*key, entry));
                next.push(row);
            }
        }
        product = next;
    }

    Ok(product.into_iter().map(flatten).collect())
}

fn flatten(row: Vec<(&str, &Entry)>) -> Params {
    let mut params = Params::new();
    for (key, entry) in row {
        match entry {
            Entry::Leaf(value) => params.insert(key, value.clone()),
            Entry::Group(group) => params.merge(group),
        }
    }
    params
}

pub fn debug_dump_combos(combos: &[Params]) {
    let keys: Vec<&str> = combos.first().map(|c| c.keys().collect()).unwrap_or_default();
    println!("sweep: combos={} keys={:?}", combos.len(), keys);
}
