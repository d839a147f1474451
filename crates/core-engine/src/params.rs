// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde_json::{Map, Value};

/// A normalized set of query parameters, assembled from one request entry.
///
/// Construction merges a body-derived entry with URL query-string fields:
/// the body value wins for each field when it is present and non-empty,
/// otherwise the URL value is used. `id` comes from the body entry only.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphQLParams {
    pub query: Option<String>,
    pub variables: Option<Map<String, Value>>,
    pub operation_name: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("Variables are invalid JSON.")]
    InvalidVariables,
}

impl GraphQLParams {
    pub fn from_entry(
        entry: &Map<String, Value>,
        url_params: Option<&Map<String, Value>>,
    ) -> Result<Self, ParamsError> {
        let query = string_field(entry, url_params, "query");
        let operation_name = string_field(entry, url_params, "operationName");
        let variables = decode_variables(pick(entry, url_params, "variables"))?;
        let id = entry.get("id").and_then(|id| match id {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

        Ok(GraphQLParams {
            query,
            variables,
            operation_name,
            id,
        })
    }
}

/// Picks the body value unless it is absent or empty (null, `""`, `{}`).
fn pick<'a>(
    entry: &'a Map<String, Value>,
    url_params: Option<&'a Map<String, Value>>,
    key: &str,
) -> Option<&'a Value> {
    let from_url = || url_params.and_then(|params| params.get(key));

    match entry.get(key) {
        None | Some(Value::Null) => from_url(),
        Some(Value::String(s)) if s.is_empty() => from_url(),
        Some(Value::Object(m)) if m.is_empty() => from_url(),
        Some(value) => Some(value),
    }
}

fn string_field(
    entry: &Map<String, Value>,
    url_params: Option<&Map<String, Value>>,
    key: &str,
) -> Option<String> {
    pick(entry, url_params, key)
        .and_then(Value::as_str)
        .map(str::to_owned)
}

/// Variables may arrive as a JSON object or as a JSON-encoded string. A string
/// must decode to an object or null; anything else is a terminal error, never
/// silently dropped.
fn decode_variables(value: Option<&Value>) -> Result<Option<Map<String, Value>>, ParamsError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map.clone())),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(Value::Null) => Ok(None),
            _ => Err(ParamsError::InvalidVariables),
        },
        Some(_) => Err(ParamsError::InvalidVariables),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    #[test]
    fn body_wins_over_url() {
        let entry = object(json!({"query": "{ a }", "operationName": "A"}));
        let url = object(json!({"query": "{ b }", "operationName": "B", "id": "ignored"}));

        let params = GraphQLParams::from_entry(&entry, Some(&url)).unwrap();
        assert_eq!(params.query.as_deref(), Some("{ a }"));
        assert_eq!(params.operation_name.as_deref(), Some("A"));
        // id is never taken from the URL
        assert_eq!(params.id, None);
    }

    #[test]
    fn url_fills_missing_and_empty_fields() {
        let entry = object(json!({"query": ""}));
        let url = object(json!({"query": "{ b }", "variables": "{\"who\": \"Dolly\"}"}));

        let params = GraphQLParams::from_entry(&entry, Some(&url)).unwrap();
        assert_eq!(params.query.as_deref(), Some("{ b }"));
        assert_eq!(
            params.variables,
            Some(object(json!({"who": "Dolly"})))
        );
    }

    #[test]
    fn variables_accept_objects_and_encoded_strings() {
        let entry = object(json!({"variables": {"who": "Dolly"}}));
        let params = GraphQLParams::from_entry(&entry, None).unwrap();
        assert_eq!(params.variables, Some(object(json!({"who": "Dolly"}))));

        let entry = object(json!({"variables": "null"}));
        let params = GraphQLParams::from_entry(&entry, None).unwrap();
        assert_eq!(params.variables, None);
    }

    #[test]
    fn malformed_variables_are_a_terminal_error() {
        for variables in [json!("who:You"), json!("[1, 2]"), json!(42)] {
            let entry = object(json!({"query": "{ test }", "variables": variables}));
            assert!(matches!(
                GraphQLParams::from_entry(&entry, None),
                Err(ParamsError::InvalidVariables)
            ));
        }
    }

    #[test]
    fn parsing_is_idempotent() {
        let entry = object(json!({
            "query": "query helloWho($who: String){ test(who: $who) }",
            "variables": "{\"who\": \"Dolly\"}",
            "id": 7
        }));

        let first = GraphQLParams::from_entry(&entry, None).unwrap();
        let second = GraphQLParams::from_entry(&entry, None).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.id.as_deref(), Some("7"));
    }
}
