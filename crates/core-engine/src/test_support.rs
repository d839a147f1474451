// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

#![cfg(any(feature = "test-support", test))]

//! A small hand-rolled engine for exercising the protocol layer in tests.
//!
//! The schema mirrors the classic hello-world test schema:
//!
//! ```graphql
//! type QueryRoot {
//!   test(who: String): String
//!   thrower: String!     # always raises "Throws!"
//!   request: String      # echoes the "q" value from the execution context
//! }
//! type MutationRoot {
//!   writeTest: QueryRoot
//! }
//! ```

use std::sync::Mutex;

use async_graphql_parser::Positioned;
use async_graphql_parser::types::{
    DocumentOperations, ExecutableDocument, Field, OperationDefinition, OperationType, Selection,
    SelectionSet,
};
use async_graphql_value::{Name, Value as GqlValue};
use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crate::engine::{EngineError, EngineRequest, QueryEngine};
use crate::error::GraphQLError;
use crate::execution::ExecutionResult;

const QUERY_FIELDS: &[&str] = &["test", "thrower", "request"];
const MUTATION_FIELDS: &[&str] = &["writeTest"];

/// What the engine saw on its last execution; lets tests assert on the
/// boundary contract (variables, uploads, hooks) without a real engine.
#[derive(Debug, Clone, Default)]
pub struct CapturedRequest {
    pub operation_name: Option<String>,
    pub variables: Option<Map<String, Value>>,
    pub root_value: Option<Value>,
    pub context: Option<Value>,
    pub upload_contents: Vec<(String, Vec<u8>)>,
}

#[derive(Default)]
pub struct TestEngine {
    captured: Mutex<Option<CapturedRequest>>,
}

impl TestEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn captured(&self) -> Option<CapturedRequest> {
        self.captured.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryEngine for TestEngine {
    fn validate(&self, document: &ExecutableDocument) -> Vec<GraphQLError> {
        let mut errors = vec![];

        let mut check = |operation: &Positioned<OperationDefinition>| {
            let (fields, root) = match operation.node.ty {
                OperationType::Mutation => (MUTATION_FIELDS, "MutationRoot"),
                _ => (QUERY_FIELDS, "QueryRoot"),
            };
            validate_selection_set(
                document,
                &operation.node.selection_set.node,
                fields,
                root,
                &mut errors,
            );
        };

        match &document.operations {
            DocumentOperations::Single(operation) => check(operation),
            DocumentOperations::Multiple(operations) => {
                for operation in operations.values() {
                    check(operation);
                }
            }
        }

        errors
    }

    async fn execute(&self, request: EngineRequest<'_>) -> Result<ExecutionResult, EngineError> {
        *self.captured.lock().unwrap() = Some(CapturedRequest {
            operation_name: request.operation_name.map(str::to_owned),
            variables: request.variables.cloned(),
            root_value: request.root_value.cloned(),
            context: request.context.cloned(),
            upload_contents: request
                .uploads
                .iter()
                .map(|file| (file.field_name.clone(), file.content.to_vec()))
                .collect(),
        });

        let operation = match select_operation(request.document, request.operation_name) {
            Ok(operation) => operation,
            Err(message) => return Ok(ExecutionResult::from_errors(vec![GraphQLError::new(message)])),
        };

        if operation.node.ty == OperationType::Subscription {
            return Ok(ExecutionResult::from_errors(vec![GraphQLError::new(
                "Subscriptions are not supported.",
            )]));
        }

        let mut resolver = Resolver {
            document: request.document,
            variables: request.variables,
            context: request.context,
            errors: vec![],
            threw: false,
        };
        let data = resolver.resolve_root(&operation.node);

        if resolver.threw {
            Ok(ExecutionResult::partial(None, resolver.errors))
        } else {
            Ok(ExecutionResult::partial(Some(data), resolver.errors))
        }
    }
}

fn select_operation<'d>(
    document: &'d ExecutableDocument,
    operation_name: Option<&str>,
) -> Result<&'d Positioned<OperationDefinition>, String> {
    match &document.operations {
        DocumentOperations::Single(operation) => Ok(operation),
        DocumentOperations::Multiple(operations) => match operation_name {
            Some(name) => operations
                .get(&Name::new(name))
                .ok_or_else(|| format!("Unknown operation named \"{name}\".")),
            None if operations.len() == 1 => Ok(operations.values().next().unwrap()),
            None => {
                Err("Must provide operation name if query contains multiple operations.".to_string())
            }
        },
    }
}

fn validate_selection_set(
    document: &ExecutableDocument,
    selection_set: &SelectionSet,
    fields: &[&str],
    root: &str,
    errors: &mut Vec<GraphQLError>,
) {
    for selection in &selection_set.items {
        match &selection.node {
            Selection::Field(field) => {
                let name = field.node.name.node.as_str();
                if !fields.contains(&name) {
                    errors.push(GraphQLError::at(
                        format!("Cannot query field \"{name}\" on type \"{root}\"."),
                        vec![field.pos],
                    ));
                }
            }
            Selection::FragmentSpread(spread) => {
                if let Some(fragment) = document.fragments.get(&spread.node.fragment_name.node) {
                    validate_selection_set(
                        document,
                        &fragment.node.selection_set.node,
                        fields,
                        root,
                        errors,
                    );
                }
            }
            Selection::InlineFragment(fragment) => {
                validate_selection_set(
                    document,
                    &fragment.node.selection_set.node,
                    fields,
                    root,
                    errors,
                );
            }
        }
    }
}

struct Resolver<'r> {
    document: &'r ExecutableDocument,
    variables: Option<&'r Map<String, Value>>,
    context: Option<&'r Value>,
    errors: Vec<GraphQLError>,
    threw: bool,
}

impl Resolver<'_> {
    fn resolve_root(&mut self, operation: &OperationDefinition) -> Value {
        match operation.ty {
            OperationType::Mutation => {
                self.resolve_selection_set(&operation.selection_set.node, Root::Mutation)
            }
            _ => self.resolve_selection_set(&operation.selection_set.node, Root::Query),
        }
    }

    fn resolve_selection_set(&mut self, selection_set: &SelectionSet, root: Root) -> Value {
        let mut output = Map::new();

        for selection in &selection_set.items {
            match &selection.node {
                Selection::Field(field) => {
                    let key = field
                        .node
                        .alias
                        .as_ref()
                        .map(|alias| alias.node.to_string())
                        .unwrap_or_else(|| field.node.name.node.to_string());
                    let value = self.resolve_field(field, root);
                    output.insert(key, value);
                }
                Selection::FragmentSpread(spread) => {
                    if let Some(fragment) =
                        self.document.fragments.get(&spread.node.fragment_name.node)
                        && let Value::Object(fields) = self
                            .resolve_selection_set(&fragment.node.selection_set.node, root)
                    {
                        output.extend(fields);
                    }
                }
                Selection::InlineFragment(fragment) => {
                    if let Value::Object(fields) =
                        self.resolve_selection_set(&fragment.node.selection_set.node, root)
                    {
                        output.extend(fields);
                    }
                }
            }
        }

        Value::Object(output)
    }

    fn resolve_field(&mut self, field: &Positioned<Field>, root: Root) -> Value {
        match (root, field.node.name.node.as_str()) {
            (Root::Query, "test") => {
                let who = self
                    .argument(&field.node, "who")
                    .and_then(|value| value.as_str().map(str::to_owned))
                    .unwrap_or_else(|| "World".to_string());
                Value::String(format!("Hello {who}"))
            }
            (Root::Query, "thrower") => {
                self.threw = true;
                self.errors
                    .push(GraphQLError::at("Throws!".to_string(), vec![field.pos]));
                Value::Null
            }
            (Root::Query, "request") => self
                .context
                .and_then(|context| context.get("q"))
                .cloned()
                .unwrap_or(Value::Null),
            (Root::Mutation, "writeTest") => {
                self.resolve_selection_set(&field.node.selection_set.node, Root::Query)
            }
            _ => Value::Null,
        }
    }

    fn argument(&self, field: &Field, name: &str) -> Option<Value> {
        field
            .arguments
            .iter()
            .find(|(arg_name, _)| arg_name.node.as_str() == name)
            .and_then(|(_, value)| match &value.node {
                GqlValue::Variable(variable) => self
                    .variables
                    .and_then(|variables| variables.get(variable.as_str()))
                    .cloned(),
                value => value
                    .clone()
                    .into_const()
                    .and_then(|constant| constant.into_json().ok()),
            })
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Root {
    Query,
    Mutation,
}

/// Convenience for tests: the canonical hello-world response.
pub fn hello_world() -> Value {
    json!({"test": "Hello World"})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::Uploads;
    use async_graphql_parser::parse_query;

    async fn execute(
        query: &str,
        operation_name: Option<&str>,
        variables: Option<Value>,
    ) -> ExecutionResult {
        let engine = TestEngine::new();
        let document = parse_query(query).unwrap();
        let variables = variables.and_then(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        });
        let uploads = Uploads::default();

        engine
            .execute(EngineRequest {
                document: &document,
                operation_name,
                variables: variables.as_ref(),
                root_value: None,
                context: None,
                uploads: &uploads,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn resolves_hello_world() {
        let result = execute("{test}", None, None).await;
        assert_eq!(result.data, Some(hello_world()));
        assert!(result.errors.is_empty());
        assert!(!result.invalid);
    }

    #[tokio::test]
    async fn resolves_variables_and_fragments() {
        let result = execute(
            r#"
            query helloWho($who: String){ test(who: $who), ...shared }
            fragment shared on QueryRoot { shared: test(who: "Everyone") }
            "#,
            None,
            Some(json!({"who": "Dolly"})),
        )
        .await;
        assert_eq!(
            result.data,
            Some(json!({"test": "Hello Dolly", "shared": "Hello Everyone"}))
        );
    }

    #[tokio::test]
    async fn thrower_nulls_data_but_stays_valid() {
        let result = execute("{thrower}", None, None).await;
        assert_eq!(result.data, None);
        assert!(!result.invalid);
        assert_eq!(result.errors[0].message, "Throws!");
        assert!(!result.errors[0].locations.is_empty());
    }

    #[tokio::test]
    async fn multiple_operations_require_a_name() {
        let query = "query A { test } query B { thrower }";
        let result = execute(query, None, None).await;
        assert!(result.invalid);
        assert_eq!(
            result.errors[0].message,
            "Must provide operation name if query contains multiple operations."
        );

        let result = execute(query, Some("A"), None).await;
        assert_eq!(result.data, Some(hello_world()));
    }

    #[test]
    fn validation_flags_unknown_fields() {
        let engine = TestEngine::new();
        let document = parse_query("{ test, unknownOne, unknownTwo }").unwrap();
        let errors = engine.validate(&document);
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors[0].message,
            "Cannot query field \"unknownOne\" on type \"QueryRoot\"."
        );
    }
}
