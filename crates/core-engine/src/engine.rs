// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use async_graphql_parser::types::ExecutableDocument;
use async_trait::async_trait;
use serde_json::{Map, Value};

use common::http::RequestHead;

use crate::error::GraphQLError;
use crate::execution::ExecutionResult;
use crate::upload::Uploads;

/// Everything the engine needs for one execution. The document has already
/// been parsed by the protocol layer; variables are normalized; uploaded
/// files are reachable through `uploads` via the placeholders injected into
/// the variables tree.
pub struct EngineRequest<'r> {
    pub document: &'r ExecutableDocument,
    pub operation_name: Option<&'r str>,
    pub variables: Option<&'r Map<String, Value>>,
    pub root_value: Option<&'r Value>,
    pub context: Option<&'r Value>,
    pub uploads: &'r Uploads,
}

/// An engine-side failure that escaped the engine's own error reporting.
/// The protocol layer converts it into an invalid [`ExecutionResult`]; it
/// never surfaces as a transport error.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct EngineError(pub String);

/// The external query-execution engine. Implementations wrap the schema and
/// whatever middleware/executor machinery they were constructed with; this
/// layer only parses, validates through it, and executes through it.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Static validation of a parsed document against the schema.
    fn validate(&self, document: &ExecutableDocument) -> Vec<GraphQLError>;

    async fn execute(&self, request: EngineRequest<'_>) -> Result<ExecutionResult, EngineError>;
}

/// Produces the per-request root value.
pub type RootValueFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// Produces the per-request execution context from the request head.
pub type ContextFn = Arc<dyn Fn(&(dyn RequestHead + Send + Sync)) -> Value + Send + Sync>;
