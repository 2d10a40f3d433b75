use super::{FieldRef, Filter, MeasuredField, Query, SortDirection, TopFilter};
use log::{debug, warn};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;

/// Pre-VDS request shape: `columns`, `aggregation`, `groupBy`, `orderBy`, `limit`
///
/// Every key is optional and an explicit `null` is treated like an absent key.
/// Values inside the containers are read leniently: a non-string aggregation
/// function, an unusable `limit` or an unknown sort direction is ignored
/// rather than rejected.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub columns: Vec<ColumnDescriptor>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub aggregation: HashMap<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub group_by: Vec<ColumnDescriptor>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub order_by: Vec<OrderBy>,
    #[serde(default)]
    pub limit: Option<Value>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Loosely-shaped column reference, e.g. `{"fieldCaption": "Sales"}` or
/// `{"column": {"fieldCaption": "Sales"}}`
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(transparent)]
pub struct ColumnDescriptor(pub Value);

const CAPTION_KEYS: [&str; 3] = ["fieldCaption", "caption", "name"];

impl ColumnDescriptor {
    /// First non-empty string among `fieldCaption`, `caption` and `name`,
    /// looked up in the nested `column` object before the descriptor itself.
    pub fn caption(&self) -> Option<&str> {
        let nested = self
            .0
            .get("column")
            .and_then(|column| CAPTION_KEYS.iter().find_map(|key| non_empty(column.get(*key))));

        nested.or_else(|| {
            CAPTION_KEYS
                .iter()
                .find_map(|key| non_empty(self.0.get(*key)))
        })
    }
}

fn non_empty(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

#[derive(Debug, Deserialize, Clone)]
pub struct OrderBy {
    #[serde(flatten)]
    pub column: ColumnDescriptor,
    #[serde(default)]
    pub direction: Option<Value>,
}

impl OrderBy {
    /// `ASC`/`DESC` in any case; anything else falls back to `DESC`
    pub fn direction(&self) -> SortDirection {
        match self.direction.as_ref() {
            None | Some(Value::Null) => SortDirection::default(),
            Some(value) => match value.as_str().map(str::to_ascii_uppercase).as_deref() {
                Some("ASC") => SortDirection::Asc,
                Some("DESC") => SortDirection::Desc,
                _ => {
                    warn!("Unknown sort direction {}, using DESC", value);
                    SortDirection::default()
                }
            },
        }
    }
}

impl LegacyRequest {
    /// Grouping dimensions: the resolvable `groupBy` captions, or else the
    /// caption of the first resolvable column alone.
    pub fn dimension_captions(&self) -> Vec<&str> {
        let grouped: Vec<&str> = self
            .group_by
            .iter()
            .filter_map(ColumnDescriptor::caption)
            .collect();
        if !grouped.is_empty() {
            return grouped;
        }

        self.columns
            .iter()
            .find_map(ColumnDescriptor::caption)
            .into_iter()
            .collect()
    }

    /// Aggregation function for a caption; null, empty and non-string entries
    /// count as absent.
    pub fn function_for(&self, caption: &str) -> Option<&str> {
        non_empty(self.aggregation.get(caption))
    }

    /// Positive integral `limit`, accepting `10`, `10.0` and `"10"`
    pub fn top_n(&self) -> Option<u64> {
        let limit = self.limit.as_ref()?;
        let parsed = match limit {
            Value::Null => return None,
            Value::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                    .map(|f| f as u64)
            }),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };

        match parsed {
            Some(0) => None,
            Some(n) => Some(n),
            None => {
                warn!("Ignoring limit {}: not a positive integer", limit);
                None
            }
        }
    }
}

/// Convert a legacy request into the canonical query shape.
///
/// Only the first `orderBy` entry is honoured. A `limit` becomes a TOP filter
/// on the first dimension ranked by the sorted, aggregated field; when no
/// such field exists the limit is dropped.
pub fn adapt_legacy(request: &LegacyRequest) -> Query {
    let dimensions = request.dimension_captions();

    let mut fields: Vec<FieldRef> = request
        .columns
        .iter()
        .filter_map(ColumnDescriptor::caption)
        .map(|caption| {
            if dimensions.contains(&caption) {
                FieldRef::dimension(caption)
            } else {
                match request.function_for(caption) {
                    Some(function) => FieldRef::measure(caption, function),
                    None => FieldRef::dimension(caption),
                }
            }
        })
        .collect();

    if let Some(order) = request.order_by.first() {
        let direction = order.direction();
        match order.column.caption() {
            Some(sort_caption) => {
                match fields.iter_mut().find(|f| f.field_caption == sort_caption) {
                    Some(field) => {
                        field.sort_priority = Some(1);
                        field.sort_direction = Some(direction);
                    }
                    None => debug!("Sort field {} is not among the columns", sort_caption),
                }
            }
            None => debug!("Sort entry has no resolvable caption"),
        }
    }

    let mut filters = Vec::new();
    if let (Some(limit), Some(dimension)) = (request.top_n(), dimensions.first()) {
        let ranked = fields
            .iter()
            .find(|f| f.sort_priority == Some(1) && f.is_aggregated());

        match ranked {
            Some(measure) => filters.push(Filter::Top(TopFilter::new(
                *dimension,
                limit,
                MeasuredField::new(
                    measure.field_caption.as_str(),
                    measure.function.as_deref().unwrap_or("SUM"),
                ),
            ))),
            None => warn!(
                "Dropping limit {}: no sorted aggregated field to rank {} by",
                limit, dimension
            ),
        }
    }

    let query = Query::new(fields);
    if filters.is_empty() {
        query
    } else {
        query.with_filters(filters)
    }
}
