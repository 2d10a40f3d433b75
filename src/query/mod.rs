pub mod legacy;

use legacy::LegacyRequest;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Top-level keys that mark an object as a legacy request
pub const LEGACY_KEYS: [&str; 5] = ["columns", "aggregation", "groupBy", "orderBy", "limit"];

/// Canonical VizQL Data Service query
///
/// Field order is significant: it drives the result column order.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Query {
    pub fields: Vec<FieldRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Vec<Filter>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Query {
    pub fn new(fields: Vec<FieldRef>) -> Self {
        Query {
            fields,
            filters: None,
            extra: Map::new(),
        }
    }

    pub fn with_filters(mut self, filters: Vec<Filter>) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn get_field(&self, caption: &str) -> Option<&FieldRef> {
        self.fields.iter().find(|f| f.field_caption == caption)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldRef {
    pub field_caption: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_priority: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_direction: Option<SortDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_decimal_places: Option<u32>,
    /// Keys this crate does not model (aliases, calculations, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldRef {
    /// A plain, unaggregated field (a dimension by convention)
    pub fn dimension(caption: impl Into<String>) -> Self {
        FieldRef {
            field_caption: caption.into(),
            function: None,
            sort_priority: None,
            sort_direction: None,
            max_decimal_places: None,
            extra: Map::new(),
        }
    }

    pub fn measure(caption: impl Into<String>, function: impl Into<String>) -> Self {
        FieldRef {
            function: Some(function.into()),
            ..FieldRef::dimension(caption)
        }
    }

    pub fn sorted(mut self, priority: u32, direction: SortDirection) -> Self {
        self.sort_priority = Some(priority);
        self.sort_direction = Some(direction);
        self
    }

    pub fn is_aggregated(&self) -> bool {
        self.function.is_some()
    }
}

/// Wire values are exactly `ASC` and `DESC`
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    #[default]
    Desc,
}

/// Query filter
///
/// Only TOP filters are modelled; any other filter type is carried as-is.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Filter {
    Top(TopFilter),
    Other(Map<String, Value>),
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopFilter {
    pub field: FilterField,
    pub filter_type: TopFilterType,
    pub how_many: u64,
    pub field_to_measure: MeasuredField,
    pub direction: TopDirection,
    /// Keys such as `context` that are carried but not interpreted
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TopFilter {
    pub fn new(dimension: impl Into<String>, how_many: u64, measure: MeasuredField) -> Self {
        TopFilter {
            field: FilterField {
                field_caption: dimension.into(),
                extra: Map::new(),
            },
            filter_type: TopFilterType::Top,
            how_many,
            field_to_measure: measure,
            direction: TopDirection::Top,
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilterField {
    pub field_caption: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeasuredField {
    pub field_caption: String,
    pub function: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MeasuredField {
    pub fn new(caption: impl Into<String>, function: impl Into<String>) -> Self {
        MeasuredField {
            field_caption: caption.into(),
            function: function.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum TopFilterType {
    #[serde(rename = "TOP")]
    Top,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum TopDirection {
    #[serde(rename = "TOP")]
    Top,
    #[serde(rename = "BOTTOM")]
    Bottom,
}

/// A request as handed in by a caller, before normalisation
#[derive(Debug, Clone)]
pub enum QueryRequest {
    Canonical(Query),
    Legacy(LegacyRequest),
}

impl QueryRequest {
    /// Classify a JSON object as canonical (has `fields`) or legacy (has any
    /// of [`LEGACY_KEYS`]); anything else is rejected with its key set.
    pub fn from_value(value: Value) -> Result<Self, AdapterError> {
        let object = match value {
            Value::Object(object) => object,
            _ => return Err(AdapterError::InvalidRequestShape { keys: Vec::new() }),
        };

        if object.contains_key("fields") {
            let query = serde_json::from_value(Value::Object(object))
                .map_err(|e| AdapterError::MalformedQuery(e.to_string()))?;
            return Ok(QueryRequest::Canonical(query));
        }

        if LEGACY_KEYS.iter().any(|k| object.contains_key(*k)) {
            let request = serde_json::from_value(Value::Object(object))
                .map_err(|e| AdapterError::MalformedLegacyRequest(e.to_string()))?;
            return Ok(QueryRequest::Legacy(request));
        }

        Err(AdapterError::InvalidRequestShape {
            keys: object.keys().cloned().collect(),
        })
    }

    /// Normalise into the canonical shape
    pub fn adapt(self) -> Query {
        match self {
            QueryRequest::Canonical(query) => query,
            QueryRequest::Legacy(request) => legacy::adapt_legacy(&request),
        }
    }
}

impl From<Query> for QueryRequest {
    fn from(query: Query) -> Self {
        QueryRequest::Canonical(query)
    }
}

impl From<LegacyRequest> for QueryRequest {
    fn from(request: LegacyRequest) -> Self {
        QueryRequest::Legacy(request)
    }
}

/// Classify and normalise a raw request in one step
pub fn adapt(value: Value) -> Result<Query, AdapterError> {
    Ok(QueryRequest::from_value(value)?.adapt())
}

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("VDS query must include a 'fields' array. Got keys: {keys:?}")]
    InvalidRequestShape { keys: Vec<String> },

    #[error("Malformed legacy request: {0}")]
    MalformedLegacyRequest(String),

    #[error("Malformed query: {0}")]
    MalformedQuery(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use serde_json::json;

    #[rstest]
    #[case::fields_only(json!({"fields": [{"fieldCaption": "Region"}]}))]
    #[case::sorted_and_rounded(json!({
        "fields": [
            {"fieldCaption": "Region", "sortPriority": 1},
            {"fieldCaption": "Discount", "function": "AVG", "maxDecimalPlaces": 2},
            {"fieldCaption": "Profit", "function": "SUM", "sortDirection": "DESC", "sortPriority": 2}
        ]
    }))]
    #[case::top_filter(json!({
        "fields": [
            {"fieldCaption": "State/Province"},
            {"fieldCaption": "Profit", "function": "SUM", "sortPriority": 1, "sortDirection": "DESC"}
        ],
        "filters": [{
            "field": {"fieldCaption": "State/Province"},
            "filterType": "TOP",
            "howMany": 10,
            "fieldToMeasure": {"fieldCaption": "Profit", "function": "SUM"},
            "direction": "TOP"
        }]
    }))]
    #[case::unmodelled_keys(json!({
        "fields": [{"fieldCaption": "Order Date", "function": "YEAR", "fieldAlias": "Year"}],
        "filters": [{"field": {"fieldCaption": "Region"}, "filterType": "SET", "values": ["East"], "exclude": false}]
    }))]
    #[case::top_filter_context(json!({
        "fields": [
            {"fieldCaption": "State"},
            {"fieldCaption": "Sales", "function": "SUM", "sortPriority": 1, "sortDirection": "DESC"}
        ],
        "filters": [{
            "field": {"fieldCaption": "State"},
            "filterType": "TOP",
            "howMany": 5,
            "fieldToMeasure": {"fieldCaption": "Sales", "function": "SUM"},
            "direction": "TOP",
            "context": true
        }]
    }))]
    #[case::top_filter_on_function(json!({
        "fields": [
            {"fieldCaption": "Order Date", "function": "YEAR"},
            {"fieldCaption": "Sales", "function": "SUM"}
        ],
        "filters": [{
            "field": {"fieldCaption": "Order Date", "function": "YEAR"},
            "filterType": "TOP",
            "howMany": 3,
            "fieldToMeasure": {"fieldCaption": "Sales", "function": "SUM", "maxDecimalPlaces": 0},
            "direction": "BOTTOM"
        }]
    }))]
    fn test_canonical_passes_through_unchanged(#[case] input: Value) {
        let query = adapt(input.clone()).unwrap();
        assert_eq!(input, serde_json::to_value(&query).unwrap());
    }

    #[test]
    fn test_top_filter_is_typed() {
        let query = adapt(json!({
            "fields": [{"fieldCaption": "State"}],
            "filters": [{
                "field": {"fieldCaption": "State"},
                "filterType": "TOP",
                "howMany": 3,
                "fieldToMeasure": {"fieldCaption": "Sales", "function": "SUM"},
                "direction": "BOTTOM"
            }]
        }))
        .unwrap();

        let filters = query.filters.unwrap();
        match &filters[0] {
            Filter::Top(top) => {
                assert_eq!(top.how_many, 3);
                assert_eq!(top.direction, TopDirection::Bottom);
            }
            Filter::Other(other) => panic!("expected a TOP filter, got {:?}", other),
        }
    }

    #[rstest]
    #[case::empty_object(json!({}), vec![])]
    #[case::unknown_keys(json!({"select": ["Sales"], "from": "orders"}), vec!["select", "from"])]
    #[case::not_an_object(json!(["fields"]), vec![])]
    fn test_unrecognised_shape_is_rejected(#[case] input: Value, #[case] expected: Vec<&str>) {
        match adapt(input) {
            Err(AdapterError::InvalidRequestShape { keys }) => assert_eq!(keys, expected),
            other => panic!("expected InvalidRequestShape, got {:?}", other),
        }
    }

    #[test]
    fn test_rejection_message_lists_keys() {
        let err = adapt(json!({"select": 1})).unwrap_err();
        assert!(err.to_string().contains("select"));
    }

    #[rstest]
    #[case::columns(json!({"columns": []}))]
    #[case::aggregation(json!({"aggregation": {}}))]
    #[case::group_by(json!({"groupBy": []}))]
    #[case::order_by(json!({"orderBy": []}))]
    #[case::limit(json!({"limit": 5}))]
    fn test_any_legacy_key_selects_legacy(#[case] input: Value) {
        let request = QueryRequest::from_value(input).unwrap();
        assert!(matches!(request, QueryRequest::Legacy(_)));
    }

    #[test]
    fn test_fields_wins_over_legacy_keys() {
        let request = QueryRequest::from_value(json!({
            "fields": [{"fieldCaption": "Sales", "function": "SUM"}],
            "limit": 5
        }))
        .unwrap();
        assert!(matches!(request, QueryRequest::Canonical(_)));
    }

    #[rstest]
    #[case::fields_not_a_list(json!({"fields": "Sales"}))]
    #[case::lowercase_sort_direction(json!({
        "fields": [{"fieldCaption": "Sales", "function": "SUM", "sortPriority": 1, "sortDirection": "desc"}]
    }))]
    fn test_malformed_canonical_is_reported(#[case] input: Value) {
        let err = adapt(input).unwrap_err();
        assert!(matches!(err, AdapterError::MalformedQuery(_)));
    }

    #[test]
    fn test_top_filter_keeps_uninterpreted_keys() {
        let query = adapt(json!({
            "fields": [{"fieldCaption": "State"}],
            "filters": [{
                "field": {"fieldCaption": "State"},
                "filterType": "TOP",
                "howMany": 5,
                "fieldToMeasure": {"fieldCaption": "Sales", "function": "SUM"},
                "direction": "TOP",
                "context": true
            }]
        }))
        .unwrap();

        match query.filters.as_deref() {
            Some([Filter::Top(top)]) => assert_eq!(top.extra.get("context"), Some(&json!(true))),
            other => panic!("expected one TOP filter, got {:?}", other),
        }
    }

    #[test]
    fn test_sort_direction_defaults_to_desc() {
        assert_eq!(SortDirection::default(), SortDirection::Desc);
    }

    #[test]
    fn test_builders_serialize_to_wire_shape() {
        let query = Query::new(vec![
            FieldRef::dimension("State"),
            FieldRef::measure("Sales", "SUM").sorted(1, SortDirection::Desc),
        ])
        .with_filters(vec![Filter::Top(TopFilter::new(
            "State",
            10,
            MeasuredField::new("Sales", "SUM"),
        ))]);

        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({
                "fields": [
                    {"fieldCaption": "State"},
                    {"fieldCaption": "Sales", "function": "SUM", "sortPriority": 1, "sortDirection": "DESC"}
                ],
                "filters": [{
                    "field": {"fieldCaption": "State"},
                    "filterType": "TOP",
                    "howMany": 10,
                    "fieldToMeasure": {"fieldCaption": "Sales", "function": "SUM"},
                    "direction": "TOP"
                }]
            })
        );
        assert!(query.get_field("Sales").unwrap().is_aggregated());
    }
}
