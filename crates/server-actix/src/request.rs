// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use actix_web::{HttpRequest, http::header::HeaderMap};
use common::http::RequestHead;
use serde_json::{Map, Value};

pub struct ActixRequestHead {
    // we cannot refer to HttpRequest directly, as it holds an Rc (and therefore does
    // not impl Send or Sync)
    //
    // request: &'a actix_web::HttpRequest,
    headers: HeaderMap,
    method: actix_web::http::Method,
    path: String,
    query: serde_json::Value,
}

impl ActixRequestHead {
    pub fn from_request(req: &HttpRequest) -> ActixRequestHead {
        ActixRequestHead {
            headers: req.headers().clone(),
            method: req.method().clone(),
            path: req.path().to_string(),
            query: decode_query_string(req.query_string()),
        }
    }
}

/// Decodes the URL query string once, into an object of string-valued fields.
fn decode_query_string(query_string: &str) -> Value {
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_str(query_string).unwrap_or_default();

    Value::Object(
        pairs
            .into_iter()
            .map(|(name, value)| (name, Value::String(value)))
            .collect::<Map<_, _>>(),
    )
}

impl RequestHead for ActixRequestHead {
    fn get_headers(&self, key: &str) -> Vec<String> {
        self.headers
            .get_all(key.to_lowercase())
            .filter_map(|value| value.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    fn get_method(&self) -> http::Method {
        // Actix uses http-0.2. However, the rest of the system uses
        // http-1.x, so we need to convert between the two.
        // Once Actix 5.x is released (which uses http-1.x), we can remove this mapping.
        match self.method {
            actix_web::http::Method::CONNECT => http::Method::CONNECT,
            actix_web::http::Method::GET => http::Method::GET,
            actix_web::http::Method::HEAD => http::Method::HEAD,
            actix_web::http::Method::OPTIONS => http::Method::OPTIONS,
            actix_web::http::Method::POST => http::Method::POST,
            actix_web::http::Method::PUT => http::Method::PUT,
            actix_web::http::Method::DELETE => http::Method::DELETE,
            actix_web::http::Method::PATCH => http::Method::PATCH,
            actix_web::http::Method::TRACE => http::Method::TRACE,
            _ => {
                tracing::error!("Unsupported method: {}", self.method);
                panic!("Unsupported method: {}", self.method);
            }
        }
    }

    fn get_path(&self) -> String {
        self.path.clone()
    }

    fn get_query(&self) -> serde_json::Value {
        self.query.clone()
    }
}
