// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use common::http::{Headers, ResponseBody, ResponsePayload};
use core_engine::{GraphQLError, ParamsError};
use http::StatusCode;

/// A transport-level failure: the request itself violates the protocol.
///
/// Terminates the whole request with its status code and headers. Distinct
/// from query errors (`ExecutionResult::errors`), which are reported per
/// entry and never abort sibling batch entries.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum HttpQueryError {
    #[error("GraphQL only supports GET and POST requests.")]
    MethodNotAllowed,

    #[error("POST body sent invalid JSON.")]
    InvalidBodyJson,

    #[error("POST body sent invalid form data.")]
    InvalidBodyForm,

    #[error("Invalid multipart request: {0}")]
    InvalidMultipart(String),

    #[error("Invalid file map: {0}")]
    InvalidFileMap(String),

    #[error("GraphQL params should be a dict. Received {0}.")]
    ParamsNotAnObject(String),

    #[error("Batch GraphQL requests are not enabled.")]
    BatchNotEnabled,

    #[error("Received an empty list in the batch request.")]
    EmptyBatch,

    #[error("Variables are invalid JSON.")]
    InvalidVariables,

    #[error("Must provide query string.")]
    MissingQuery,

    #[error("Can only perform a {0} operation from a POST request.")]
    NotAllowedOperation(&'static str),
}

impl HttpQueryError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            HttpQueryError::MethodNotAllowed | HttpQueryError::NotAllowedOperation(_) => {
                StatusCode::METHOD_NOT_ALLOWED
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn allow_header(&self) -> Option<&'static str> {
        match self {
            HttpQueryError::MethodNotAllowed => Some("GET, POST"),
            HttpQueryError::NotAllowedOperation(_) => Some("POST"),
            _ => None,
        }
    }

    /// The terminal response for this error: `{"errors":[{"message"}]}` with
    /// the matching status code and (for method violations) an `Allow` header.
    pub fn into_response(self) -> ResponsePayload {
        let body = serde_json::json!({"errors": [GraphQLError::new(self.to_string())]});

        let mut headers = Headers::new();
        headers.insert("content-type".into(), "application/json".into());
        if let Some(allow) = self.allow_header() {
            headers.insert("allow".into(), allow.into());
        }

        ResponsePayload {
            body: ResponseBody::Bytes(
                serde_json::to_string(&body)
                    .expect("error responses always serialize")
                    .into_bytes(),
            ),
            headers,
            status_code: self.status_code(),
        }
    }
}

impl From<ParamsError> for HttpQueryError {
    fn from(error: ParamsError) -> Self {
        match error {
            ParamsError::InvalidVariables => HttpQueryError::InvalidVariables,
        }
    }
}
