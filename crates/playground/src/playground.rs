// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::Serialize;

use core_engine::GraphQLParams;

const CONFIG_MARKER: &str = "window.quillPlayground = {};";
const TITLE_MARKER: &str = "%%TITLE%%";
const VERSION_MARKER: &str = "%%GRAPHIQL_VERSION%%";

const DEFAULT_TEMPLATE: &str = include_str!("../templates/graphiql.html");
const DEFAULT_TITLE: &str = "GraphiQL";
const DEFAULT_VERSION: &str = "3.0.6";

/// The interactive console: an HTML page that round-trips the request's
/// query, variables, operation name, and result into an editor backed by the
/// same endpoint.
pub struct Playground {
    title: String,
    version: String,
    template: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PlaygroundError {
    #[error("playground template is missing the \"{CONFIG_MARKER}\" marker")]
    MissingConfigMarker,
}

/// What the rendered page reads back out of `window.quillPlayground`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaygroundConfig<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    query: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    operation_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a str>,
}

impl Playground {
    /// A playground with per-deployment overrides. A custom template must
    /// carry the config marker so the editor state can be substituted in.
    pub fn new(
        title: Option<String>,
        version: Option<String>,
        template: Option<String>,
    ) -> Result<Self, PlaygroundError> {
        let template = template.unwrap_or_else(|| DEFAULT_TEMPLATE.to_string());
        if !template.contains(CONFIG_MARKER) {
            return Err(PlaygroundError::MissingConfigMarker);
        }

        Ok(Self {
            title: title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            version: version.unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            template,
        })
    }

    /// Renders the page with the given request state embedded. `result` is
    /// the already-encoded response JSON text, if any entry produced one.
    pub fn render(&self, params: &GraphQLParams, result: Option<&str>) -> String {
        let config = PlaygroundConfig {
            query: params.query.as_deref(),
            variables: params.variables.as_ref().map(|variables| {
                serde_json::to_string_pretty(variables)
                    .expect("variable maps always serialize")
            }),
            operation_name: params.operation_name.as_deref(),
            result,
        };
        let config_json =
            serde_json::to_string(&config).expect("playground config always serializes");

        self.template
            .replace(
                CONFIG_MARKER,
                &format!("window.quillPlayground = {config_json};"),
            )
            .replace(TITLE_MARKER, &self.title)
            .replace(VERSION_MARKER, &self.version)
    }
}

impl Default for Playground {
    fn default() -> Self {
        Self::new(None, None, None).expect("the bundled template carries the marker")
    }
}
