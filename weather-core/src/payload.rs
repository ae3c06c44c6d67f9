//! Dialogflow ES webhook request and the slots this service reads from it.

use serde_json::{Map, Value};

use crate::{
    date_range::RawTimeParameter,
    error::FulfillmentError,
    model::{AttributeFilter, FilterKind},
};

pub const CITY_PARAM: &str = "geo-city";
pub const DATE_TIME_PARAM: &str = "date-time";
pub const CONDITION_PARAM: &str = "weather-condition";
pub const TEMPERATURE_PARAM: &str = "temperature";
pub const WIND_SPEED_PARAM: &str = "wind-speed";

/// The envelope of one agent turn.
///
/// Fields are read leniently: a mistyped field the service never looks at
/// must not turn a valid turn into an error.
#[derive(Debug, Clone, Default)]
pub struct WebhookRequest {
    pub response_id: Option<String>,
    pub session: Option<String>,
    pub query_result: Option<QueryResult>,
}

impl WebhookRequest {
    pub fn from_value(value: Value) -> Result<Self, FulfillmentError> {
        let Value::Object(mut request) = value else {
            return Err(FulfillmentError::MalformedInput(
                "webhook request is not a JSON object".to_string(),
            ));
        };

        let query_result = match request.remove("queryResult") {
            Some(Value::Object(query)) => Some(QueryResult::from_map(query)),
            None | Some(Value::Null) => None,
            Some(_) => {
                return Err(FulfillmentError::MalformedInput(
                    "queryResult is not an object".to_string(),
                ));
            }
        };

        Ok(Self {
            response_id: text_field(&request, "responseId"),
            session: text_field(&request, "session"),
            query_result,
        })
    }

    /// Parse the raw body and return its `queryResult`.
    pub fn query_result_from(value: Value) -> Result<QueryResult, FulfillmentError> {
        Self::from_value(value)?
            .query_result
            .ok_or_else(|| FulfillmentError::MalformedInput("missing queryResult".to_string()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub query_text: Option<String>,
    pub action: Option<String>,
    pub parameters: Option<Map<String, Value>>,
    pub output_contexts: Option<Vec<OutputContext>>,
}

#[derive(Debug, Clone, Default)]
pub struct OutputContext {
    pub name: Option<String>,
    pub parameters: Option<Map<String, Value>>,
}

impl OutputContext {
    fn from_value(mut value: Value) -> Self {
        match value.as_object_mut() {
            Some(context) => Self {
                name: text_field(context, "name"),
                parameters: object_field(context, "parameters"),
            },
            None => Self::default(),
        }
    }
}

impl QueryResult {
    fn from_map(mut query: Map<String, Value>) -> Self {
        let output_contexts = match query.remove("outputContexts") {
            Some(Value::Array(items)) => {
                Some(items.into_iter().map(OutputContext::from_value).collect())
            }
            _ => None,
        };

        Self {
            query_text: text_field(&query, "queryText"),
            action: text_field(&query, "action"),
            parameters: object_field(&mut query, "parameters"),
            output_contexts,
        }
    }

    /// Requested city, from this turn or else the first output context.
    /// A blank current-turn value does not hide the context.
    pub fn city(&self) -> Option<String> {
        self.current(CITY_PARAM)
            .and_then(city_name)
            .or_else(|| self.from_context(CITY_PARAM).and_then(city_name))
    }

    /// The `date-time` slot, from this turn or else the first output context.
    pub fn time_parameter(&self) -> RawTimeParameter {
        RawTimeParameter::from(self.slot(DATE_TIME_PARAM))
    }

    /// Attribute the user asked about in this turn. Condition wins over
    /// temperature, temperature over wind speed.
    pub fn attribute_filter(&self) -> Option<AttributeFilter> {
        [
            (CONDITION_PARAM, FilterKind::Condition),
            (TEMPERATURE_PARAM, FilterKind::Temperature),
            (WIND_SPEED_PARAM, FilterKind::WindSpeed),
        ]
        .into_iter()
        .find_map(|(key, kind)| {
            let values = string_values(self.current(key)?);
            (!values.is_empty()).then(|| AttributeFilter::new(kind, values))
        })
    }

    fn current(&self, key: &str) -> Option<&Value> {
        self.parameters.as_ref()?.get(key).filter(|v| is_provided(v))
    }

    fn from_context(&self, key: &str) -> Option<&Value> {
        self.output_contexts
            .as_ref()?
            .first()?
            .parameters
            .as_ref()?
            .get(key)
            .filter(|v| is_provided(v))
    }

    fn slot(&self, key: &str) -> Option<&Value> {
        self.current(key).or_else(|| self.from_context(key))
    }
}

fn is_provided(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(_) => true,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

fn object_field(map: &mut Map<String, Value>, key: &str) -> Option<Map<String, Value>> {
    match map.remove(key) {
        Some(Value::Object(inner)) => Some(inner),
        _ => None,
    }
}

fn city_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_blank(s),
        Value::Array(items) => items.iter().find_map(|item| item.as_str().and_then(non_blank)),
        _ => None,
    }
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn string_values(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => non_blank(s).into_iter().collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().and_then(non_blank))
            .collect(),
        _ => Vec::new(),
    }
}
