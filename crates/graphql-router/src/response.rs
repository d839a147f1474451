// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use core_engine::{ExecutionResult, GraphQLError};

/// One entry's slice of the response. `data` is present only for valid
/// results (serialized as `null` when execution produced no data), `errors`
/// only when non-empty, `id` only in batch mode.
#[derive(Debug, Serialize, PartialEq)]
pub struct ResponseEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// A formatted entry: its envelope (absent when the console fallback
/// suppressed the entry) and its contribution to the overall status.
#[derive(Debug)]
pub struct FormattedResponse {
    pub envelope: Option<ResponseEnvelope>,
    pub status_code: StatusCode,
}

/// Builds the envelope for one entry. An invalid result reports 400 and
/// carries no `data` key; a valid one reports 200 and always carries `data`,
/// even when null. `None` marks a console-suppressed entry.
pub fn format_execution_result(
    result: Option<ExecutionResult>,
    id: Option<String>,
) -> FormattedResponse {
    match result {
        None => FormattedResponse {
            envelope: None,
            status_code: StatusCode::OK,
        },
        Some(result) => {
            let status_code = if result.invalid {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::OK
            };
            let data = (!result.invalid).then(|| result.data.unwrap_or(Value::Null));

            FormattedResponse {
                envelope: Some(ResponseEnvelope {
                    data,
                    errors: result.errors,
                    id,
                }),
                status_code,
            }
        }
    }
}

/// Serializes the formatted entries: the lone envelope for a single request,
/// the envelope array (input order) for a batch. The overall status is the
/// maximum of the per-entry statuses.
pub fn encode_execution_responses(
    responses: Vec<FormattedResponse>,
    is_batch: bool,
    pretty: bool,
) -> (String, StatusCode) {
    let status_code = responses
        .iter()
        .map(|response| response.status_code)
        .max()
        .unwrap_or(StatusCode::OK);

    let encoded = if is_batch {
        let envelopes: Vec<Option<ResponseEnvelope>> = responses
            .into_iter()
            .map(|response| response.envelope)
            .collect();
        encode(&envelopes, pretty)
    } else {
        let envelope = responses
            .into_iter()
            .next()
            .and_then(|response| response.envelope);
        encode(&envelope, pretty)
    };

    (encoded, status_code)
}

fn encode<T: Serialize>(value: &T, pretty: bool) -> String {
    let encoded = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    encoded.expect("response envelopes always serialize")
}
