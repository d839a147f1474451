// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde_json::Value;

use crate::error::GraphQLError;

/// The outcome of executing (or failing to execute) a single query.
///
/// `invalid` distinguishes requests that never reached field resolution
/// (parse/validation failures) from successful executions that may still
/// carry field-level errors. An invalid result never contributes `data` to
/// the response; a valid result always does, even when `data` is null.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub data: Option<Value>,
    pub errors: Vec<GraphQLError>,
    pub invalid: bool,
}

impl ExecutionResult {
    pub fn from_data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: vec![],
            invalid: false,
        }
    }

    /// A per-entry terminal failure (parse error, validation error, engine
    /// exception). Recoverable at the request level: sibling batch entries
    /// still execute.
    pub fn from_errors(errors: Vec<GraphQLError>) -> Self {
        Self {
            data: None,
            errors,
            invalid: true,
        }
    }

    /// A completed execution with field-level errors (`data` may be null).
    pub fn partial(data: Option<Value>, errors: Vec<GraphQLError>) -> Self {
        Self {
            data,
            errors,
            invalid: false,
        }
    }
}
