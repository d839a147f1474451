// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use bytes::Bytes;
use indexmap::IndexMap;
use mediatype::{MediaType, ReadParams, names};
use serde_json::{Map, Value};

use core_engine::{UploadFile, Uploads};

use crate::error::HttpQueryError;
use crate::upload::place_files_in_operations;

/// The declared shape of a request body. Closed set; anything unrecognized
/// (including no body at all, the GET case) contributes no parameters.
#[derive(Debug, Clone, PartialEq)]
enum BodyKind {
    GraphQL,
    Json,
    Form,
    Multipart { boundary: String },
    Unknown,
}

/// One request body, decoded: the parameter structure (a JSON object, or an
/// array of objects for a batch candidate) plus any uploaded files.
pub struct ParsedBody {
    pub data: Value,
    pub uploads: Uploads,
}

impl ParsedBody {
    fn without_uploads(data: Value) -> Self {
        Self {
            data,
            uploads: Uploads::default(),
        }
    }
}

pub async fn parse_body(
    content_type: Option<&str>,
    body: Bytes,
) -> Result<ParsedBody, HttpQueryError> {
    match classify(content_type)? {
        BodyKind::GraphQL => Ok(parse_graphql(&body)),
        BodyKind::Json => parse_json(&body),
        BodyKind::Form => parse_form(&body),
        BodyKind::Multipart { boundary } => parse_multipart(body, boundary).await,
        BodyKind::Unknown => Ok(ParsedBody::without_uploads(Value::Object(Map::new()))),
    }
}

fn classify(content_type: Option<&str>) -> Result<BodyKind, HttpQueryError> {
    let Some(content_type) = content_type else {
        return Ok(BodyKind::Unknown);
    };
    let Ok(media) = MediaType::parse(content_type) else {
        return Ok(BodyKind::Unknown);
    };

    Ok(
        if media.ty == names::APPLICATION && media.subty.as_str() == "graphql" {
            BodyKind::GraphQL
        } else if media.ty == names::APPLICATION && media.subty == names::JSON {
            BodyKind::Json
        } else if media.ty == names::APPLICATION
            && media.subty.as_str() == "x-www-form-urlencoded"
        {
            BodyKind::Form
        } else if media.ty == names::MULTIPART && media.subty == names::FORM_DATA {
            let boundary = media
                .get_param(names::BOUNDARY)
                .ok_or_else(|| {
                    HttpQueryError::InvalidMultipart("missing boundary parameter".to_string())
                })?
                .to_string();
            BodyKind::Multipart { boundary }
        } else {
            BodyKind::Unknown
        },
    )
}

/// `application/graphql`: the body is the query text itself.
fn parse_graphql(body: &Bytes) -> ParsedBody {
    let query = String::from_utf8_lossy(body).into_owned();

    let mut data = Map::new();
    data.insert("query".to_string(), Value::String(query));
    ParsedBody::without_uploads(Value::Object(data))
}

/// `application/json`: a parameter object, or an array of them. Shape is
/// checked by the dispatcher; only well-formedness is enforced here.
fn parse_json(body: &Bytes) -> Result<ParsedBody, HttpQueryError> {
    serde_json::from_slice(body)
        .map(ParsedBody::without_uploads)
        .map_err(|_| HttpQueryError::InvalidBodyJson)
}

/// `application/x-www-form-urlencoded`: `query`/`variables`/`operationName`/
/// `id` as form fields.
fn parse_form(body: &Bytes) -> Result<ParsedBody, HttpQueryError> {
    let fields: Vec<(String, String)> =
        serde_urlencoded::from_bytes(body).map_err(|_| HttpQueryError::InvalidBodyForm)?;

    let data = fields
        .into_iter()
        .map(|(name, value)| (name, Value::String(value)))
        .collect();
    Ok(ParsedBody::without_uploads(Value::Object(data)))
}

/// `multipart/form-data`: plain form fields, or the GraphQL multipart request
/// convention (`operations` + `map` + file parts), in which case the uploaded
/// files are injected into the operations tree.
async fn parse_multipart(body: Bytes, boundary: String) -> Result<ParsedBody, HttpQueryError> {
    let stream = futures::stream::once(async move { Ok::<Bytes, std::convert::Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut fields: Map<String, Value> = Map::new();
    let mut uploads = Uploads::default();

    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        let Some(field_name) = field.name().map(str::to_owned) else {
            continue;
        };
        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(|mime| mime.to_string());

        if file_name.is_some() {
            let content = field.bytes().await.map_err(invalid_multipart)?;
            uploads.insert(UploadFile {
                field_name,
                file_name,
                content_type,
                content,
            });
        } else {
            let text = field.text().await.map_err(invalid_multipart)?;
            fields.insert(field_name, Value::String(text));
        }
    }

    let data = match (fields.remove("operations"), fields.remove("map")) {
        (Some(Value::String(operations)), Some(Value::String(map))) => {
            let operations: Value = serde_json::from_str(&operations)
                .map_err(|_| HttpQueryError::InvalidBodyJson)?;
            let map: IndexMap<String, Vec<String>> = serde_json::from_str(&map)
                .map_err(|error| HttpQueryError::InvalidFileMap(error.to_string()))?;

            place_files_in_operations(&operations, &map, &uploads)
                .map_err(|error| HttpQueryError::InvalidFileMap(error.to_string()))?
        }
        _ => Value::Object(fields),
    };

    Ok(ParsedBody { data, uploads })
}

fn invalid_multipart(error: multer::Error) -> HttpQueryError {
    HttpQueryError::InvalidMultipart(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn multipart_body(boundary: &str, parts: &[(&str, Option<&str>, &str)]) -> Bytes {
        let mut body = String::new();
        for (name, file_name, content) in parts {
            body.push_str(&format!("--{boundary}\r\n"));
            match file_name {
                Some(file_name) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                     Content-Type: text/plain\r\n\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            body.push_str(content);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{boundary}--\r\n"));
        Bytes::from(body)
    }

    #[tokio::test]
    async fn raw_graphql_body_becomes_the_query() {
        let parsed = parse_body(Some("application/graphql"), Bytes::from_static(b"{test}"))
            .await
            .unwrap();
        assert_eq!(parsed.data, json!({"query": "{test}"}));
    }

    #[tokio::test]
    async fn json_objects_and_arrays_pass_through() {
        let parsed = parse_body(
            Some("application/json; charset=utf-8"),
            Bytes::from_static(br#"{"query": "{test}"}"#),
        )
        .await
        .unwrap();
        assert_eq!(parsed.data, json!({"query": "{test}"}));

        let parsed = parse_body(
            Some("application/json"),
            Bytes::from_static(br#"[{"id": 1, "query": "{test}"}]"#),
        )
        .await
        .unwrap();
        assert!(parsed.data.is_array());
    }

    #[tokio::test]
    async fn malformed_json_is_a_terminal_error() {
        let result = parse_body(
            Some("application/json"),
            Bytes::from_static(br#"[oh no"#),
        )
        .await;
        assert!(matches!(result, Err(HttpQueryError::InvalidBodyJson)));
    }

    #[tokio::test]
    async fn form_fields_become_string_parameters() {
        let parsed = parse_body(
            Some("application/x-www-form-urlencoded"),
            Bytes::from_static(b"query=%7Btest%7D&operationName=op"),
        )
        .await
        .unwrap();
        assert_eq!(parsed.data, json!({"query": "{test}", "operationName": "op"}));
    }

    #[tokio::test]
    async fn unknown_content_types_contribute_nothing() {
        for content_type in [None, Some("text/plain"), Some("not a media type")] {
            let parsed = parse_body(content_type, Bytes::from_static(b"ignored"))
                .await
                .unwrap();
            assert_eq!(parsed.data, json!({}));
            assert!(parsed.uploads.is_empty());
        }
    }

    #[tokio::test]
    async fn multipart_form_without_operations_is_a_plain_form() {
        let body = multipart_body("XX", &[("query", None, "{test}")]);
        let parsed = parse_body(Some("multipart/form-data; boundary=XX"), body)
            .await
            .unwrap();
        assert_eq!(parsed.data, json!({"query": "{test}"}));
    }

    #[tokio::test]
    async fn multipart_operations_receive_injected_files() {
        let body = multipart_body(
            "XX",
            &[
                (
                    "operations",
                    None,
                    r#"{"query": "mutation($file: Upload!) { upload(file: $file) }", "variables": {"file": null}}"#,
                ),
                ("map", None, r#"{"file": ["variables.file"]}"#),
                ("file", Some("text1.txt"), "file contents"),
            ],
        );

        let parsed = parse_body(Some("multipart/form-data; boundary=XX"), body)
            .await
            .unwrap();

        let injected = &parsed.data["variables"]["file"];
        let file = parsed.uploads.resolve(injected).unwrap();
        assert_eq!(file.file_name.as_deref(), Some("text1.txt"));
        assert_eq!(file.content, Bytes::from_static(b"file contents"));
    }

    #[tokio::test]
    async fn multipart_with_bad_map_fails() {
        let body = multipart_body(
            "XX",
            &[
                ("operations", None, r#"{"variables": {}}"#),
                ("map", None, r#"{"file": ["variables.file"]}"#),
            ],
        );

        let result = parse_body(Some("multipart/form-data; boundary=XX"), body).await;
        assert!(matches!(result, Err(HttpQueryError::InvalidFileMap(_))));
    }

    #[tokio::test]
    async fn multipart_without_boundary_fails() {
        let result = parse_body(Some("multipart/form-data"), Bytes::new()).await;
        assert!(matches!(result, Err(HttpQueryError::InvalidMultipart(_))));
    }
}
