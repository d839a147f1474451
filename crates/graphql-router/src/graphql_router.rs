// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use async_graphql_parser::parse_query;
use async_graphql_parser::types::{DocumentOperations, ExecutableDocument, OperationType};
use async_graphql_value::Name;
use async_trait::async_trait;
use futures::future::join_all;
use http::{Method, StatusCode};
use serde_json::{Map, Value};
use tracing::instrument;

use common::http::{Headers, RequestHead, RequestPayload, ResponseBody, ResponsePayload};
use common::router::Router;
use core_engine::{
    ContextFn, EngineRequest, ExecutionResult, GraphQLError, GraphQLParams, QueryEngine,
    RootValueFn, Uploads,
};
use playground::Playground;

use crate::accept::prefers_html;
use crate::body::{ParsedBody, parse_body};
use crate::error::HttpQueryError;
use crate::response::{FormattedResponse, encode_execution_responses, format_execution_result};

/// Process-wide deployment configuration. Built once at startup and shared
/// read-only across requests.
pub struct GraphQLRouterConfig {
    pub engine: Arc<dyn QueryEngine>,
    pub root_value: Option<RootValueFn>,
    pub context_factory: Option<ContextFn>,
    pub pretty: bool,
    pub batch_enabled: bool,
    pub playground: Option<Playground>,
    pub endpoint_path: String,
}

/// Routes HTTP requests on the GraphQL endpoint path: parses the body,
/// normalizes parameters, enforces the protocol rules, executes each entry
/// through the engine, and encodes the response (JSON, or the playground page
/// when content negotiation asks for it).
pub struct GraphQLRouter {
    config: GraphQLRouterConfig,
}

impl GraphQLRouter {
    pub fn new(config: GraphQLRouterConfig) -> Self {
        Self { config }
    }

    fn suitable(&self, request_head: &(dyn RequestHead + Send + Sync)) -> bool {
        request_head.get_path() == self.config.endpoint_path
    }

    async fn handle(
        &self,
        request: &(dyn RequestPayload + Send + Sync),
    ) -> Result<ResponsePayload, HttpQueryError> {
        let head = request.get_head();

        let method = head.get_method();
        if method != Method::GET && method != Method::POST {
            return Err(HttpQueryError::MethodNotAllowed);
        }

        let url_params = url_params(head);
        let content_type = head.get_header("content-type");
        let ParsedBody { data, uploads } =
            parse_body(content_type.as_deref(), request.take_body()).await?;

        let is_batch = data.is_array();
        let entries = classify(data, self.config.batch_enabled)?;

        let playground = self.offered_playground(head, &method, is_batch, &url_params, &entries);
        let console = playground.is_some();

        let pretty = self.config.pretty
            || console
            || truthy(url_params.get("pretty"))
            || (!is_batch && truthy(entries[0].get("pretty")));

        // Batch entries never consume URL parameters; a single entry merges
        // with them field by field, body value first.
        let merge_source = (!is_batch).then_some(&url_params);
        let all_params = entries
            .iter()
            .map(|entry| GraphQLParams::from_entry(entry, merge_source))
            .collect::<Result<Vec<_>, _>>()?;

        let root_value = self.config.root_value.as_ref().map(|produce| produce());
        let context = self
            .config
            .context_factory
            .as_ref()
            .map(|produce| produce(head));
        let allow_only_query = method == Method::GET;

        let executions = all_params.iter().map(|params| {
            self.execute_entry(
                params,
                allow_only_query,
                console,
                root_value.as_ref(),
                context.as_ref(),
                &uploads,
            )
        });
        let results: Vec<Option<ExecutionResult>> = join_all(executions)
            .await
            .into_iter()
            .collect::<Result<_, _>>()?;

        let responses: Vec<FormattedResponse> = results
            .into_iter()
            .zip(&all_params)
            .map(|(result, params)| {
                let id = if is_batch { params.id.clone() } else { None };
                format_execution_result(result, id)
            })
            .collect();

        let (encoded, status_code) = encode_execution_responses(responses, is_batch, pretty);

        if let Some(playground) = playground {
            let html = playground.render(&all_params[0], Some(&encoded));

            return Ok(ResponsePayload {
                body: ResponseBody::Bytes(html.into_bytes()),
                headers: Headers::from_vec(vec![(
                    "content-type".into(),
                    "text/html; charset=utf-8".into(),
                )]),
                status_code: StatusCode::OK,
            });
        }

        Ok(ResponsePayload {
            body: ResponseBody::Bytes(encoded.into_bytes()),
            headers: Headers::from_vec(vec![("content-type".into(), "application/json".into())]),
            status_code,
        })
    }

    /// The playground is offered only for a non-batch GET without the `raw`
    /// flag, and only when the client prefers HTML strictly over JSON.
    fn offered_playground(
        &self,
        head: &(dyn RequestHead + Send + Sync),
        method: &Method,
        is_batch: bool,
        url_params: &Map<String, Value>,
        entries: &[Map<String, Value>],
    ) -> Option<&Playground> {
        let playground = self.config.playground.as_ref()?;

        if *method != Method::GET || is_batch {
            return None;
        }
        if url_params.contains_key("raw") || entries[0].contains_key("raw") {
            return None;
        }
        if !prefers_html(&head.get_headers("accept")) {
            return None;
        }

        Some(playground)
    }

    /// Runs one normalized entry through parse, validation, the GET-only-query
    /// policy, and the engine. `Ok(None)` marks an entry suppressed for the
    /// console (missing query, or a non-query operation on GET).
    async fn execute_entry(
        &self,
        params: &GraphQLParams,
        allow_only_query: bool,
        console: bool,
        root_value: Option<&Value>,
        context: Option<&Value>,
        uploads: &Uploads,
    ) -> Result<Option<ExecutionResult>, HttpQueryError> {
        let query = match params.query.as_deref().filter(|query| !query.is_empty()) {
            Some(query) => query,
            None if console => return Ok(None),
            None => return Err(HttpQueryError::MissingQuery),
        };

        let document = match parse_query(query) {
            Ok(document) => document,
            Err(error) => {
                return Ok(Some(ExecutionResult::from_errors(vec![error.into()])));
            }
        };

        let validation_errors = self.config.engine.validate(&document);
        if !validation_errors.is_empty() {
            return Ok(Some(ExecutionResult::from_errors(validation_errors)));
        }

        if allow_only_query
            && let Some(kind) =
                disallowed_operation_kind(&document, params.operation_name.as_deref())
        {
            if console {
                return Ok(None);
            }
            return Err(HttpQueryError::NotAllowedOperation(kind));
        }

        let result = self
            .config
            .engine
            .execute(EngineRequest {
                document: &document,
                operation_name: params.operation_name.as_deref(),
                variables: params.variables.as_ref(),
                root_value,
                context,
                uploads,
            })
            .await;

        Ok(Some(match result {
            Ok(result) => result,
            Err(error) => ExecutionResult::from_errors(vec![GraphQLError::new(error.to_string())]),
        }))
    }
}

#[async_trait]
impl Router for GraphQLRouter {
    #[instrument(name = "graphql_router::route", skip(self, request))]
    async fn route(
        &self,
        request: &(dyn RequestPayload + Send + Sync),
    ) -> Option<ResponsePayload> {
        if !self.suitable(request.get_head()) {
            return None;
        }

        match self.handle(request).await {
            Ok(response) => Some(response),
            Err(error) => {
                tracing::error!("Error while handling GraphQL request: {error}");
                Some(error.into_response())
            }
        }
    }
}

fn url_params(head: &(dyn RequestHead + Send + Sync)) -> Map<String, Value> {
    match head.get_query() {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Splits the parsed body into its entries: one object for a single request,
/// every element of the array for a batch (subject to the batch policy).
fn classify(data: Value, batch_enabled: bool) -> Result<Vec<Map<String, Value>>, HttpQueryError> {
    match data {
        Value::Array(items) => {
            if !batch_enabled {
                return Err(HttpQueryError::BatchNotEnabled);
            }
            if items.is_empty() {
                return Err(HttpQueryError::EmptyBatch);
            }
            items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => Ok(map),
                    other => Err(HttpQueryError::ParamsNotAnObject(other.to_string())),
                })
                .collect()
        }
        Value::Object(map) => Ok(vec![map]),
        other => Err(HttpQueryError::ParamsNotAnObject(other.to_string())),
    }
}

/// The target operation's kind when it is not a plain query: the operation
/// named by `operation_name`, or the sole operation when unambiguous.
fn disallowed_operation_kind(
    document: &ExecutableDocument,
    operation_name: Option<&str>,
) -> Option<&'static str> {
    let operation = match (&document.operations, operation_name) {
        (DocumentOperations::Single(operation), _) => Some(&operation.node),
        (DocumentOperations::Multiple(operations), Some(name)) => {
            operations.get(&Name::new(name)).map(|op| &op.node)
        }
        (DocumentOperations::Multiple(operations), None) if operations.len() == 1 => {
            operations.values().next().map(|op| &op.node)
        }
        _ => None,
    };

    match operation.map(|operation| operation.ty) {
        Some(OperationType::Mutation) => Some("mutation"),
        Some(OperationType::Subscription) => Some("subscription"),
        _ => None,
    }
}

/// Flag parameters (`pretty`) count when present with a non-empty value.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(text)) => !text.is_empty(),
        Some(Value::Bool(flag)) => *flag,
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_operation_kind_is_inspected() {
        let document = parse_query("mutation { writeTest { test } }").unwrap();
        assert_eq!(disallowed_operation_kind(&document, None), Some("mutation"));

        let document = parse_query("subscription S { test }").unwrap();
        assert_eq!(
            disallowed_operation_kind(&document, None),
            Some("subscription")
        );

        let document = parse_query("{ test }").unwrap();
        assert_eq!(disallowed_operation_kind(&document, None), None);
    }

    #[test]
    fn named_operation_selects_the_target() {
        let document = parse_query("query Q { test } mutation M { writeTest { test } }").unwrap();
        assert_eq!(disallowed_operation_kind(&document, Some("Q")), None);
        assert_eq!(
            disallowed_operation_kind(&document, Some("M")),
            Some("mutation")
        );
        // ambiguous without a name: no restriction applies here (the engine
        // reports the missing operation name)
        assert_eq!(disallowed_operation_kind(&document, None), None);
    }

    #[test]
    fn classify_enforces_the_batch_policy() {
        assert!(matches!(
            classify(serde_json::json!([]), true),
            Err(HttpQueryError::EmptyBatch)
        ));
        assert!(matches!(
            classify(serde_json::json!([{"query": "{test}"}]), false),
            Err(HttpQueryError::BatchNotEnabled)
        ));
        assert!(matches!(
            classify(serde_json::json!("a string"), true),
            Err(HttpQueryError::ParamsNotAnObject(_))
        ));
        assert_eq!(
            classify(serde_json::json!([{"id": 1}, {"id": 2}]), true)
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn flag_parameters_require_a_value() {
        assert!(!truthy(None));
        assert!(!truthy(Some(&Value::String(String::new()))));
        assert!(truthy(Some(&Value::String("1".to_string()))));
        assert!(!truthy(Some(&Value::Bool(false))));
        assert!(truthy(Some(&Value::Bool(true))));
    }
}
