use std::cmp::Ordering;
use std::str::FromStr;

use serde_json::Value;

use crate::error::StoreError;

/// Query options for [`crate::MemoryDataSource::find`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub limit: Option<usize>,
    pub skip: usize,
    pub order: Option<Order>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    /// Sort, then skip, then limit. Records arrive sorted by id.
    pub(crate) fn apply(&self, mut records: Vec<Value>) -> Vec<Value> {
        if let Some(order) = &self.order {
            // Stable sort keeps id order among equal keys.
            records.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.field), b.get(&order.field));
                match order.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }

        let page = records.into_iter().skip(self.skip);
        match self.limit {
            Some(limit) => page.take(limit).collect(),
            None => page.collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Sort key parsed from `"<field> [ASC|DESC]"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub direction: Direction,
}

impl FromStr for Order {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let field = parts
            .next()
            .ok_or_else(|| StoreError::InvalidOrder(s.to_string()))?;
        let direction = match parts.next() {
            None => Direction::Asc,
            Some(dir) if dir.eq_ignore_ascii_case("asc") => Direction::Asc,
            Some(dir) if dir.eq_ignore_ascii_case("desc") => Direction::Desc,
            Some(_) => return Err(StoreError::InvalidOrder(s.to_string())),
        };
        if parts.next().is_some() {
            return Err(StoreError::InvalidOrder(s.to_string()));
        }

        Ok(Order {
            field: field.to_string(),
            direction,
        })
    }
}

/// Missing and null sort first, then booleans, numbers, strings.
/// Arrays and objects compare equal to each other.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) | Some(Value::Object(_)) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
