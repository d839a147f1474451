// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_graphql_parser::Pos;
use serde::Serialize;

/// A single query-level error, serialized on the wire as
/// `{"message", "locations"?, "path"?}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GraphQLError {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<SourceLocation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<PathSegment>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl GraphQLError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: vec![],
            path: vec![],
        }
    }

    pub fn at(message: impl Into<String>, positions: Vec<Pos>) -> Self {
        Self {
            message: message.into(),
            locations: positions.into_iter().map(SourceLocation::from).collect(),
            path: vec![],
        }
    }
}

impl From<Pos> for SourceLocation {
    fn from(pos: Pos) -> Self {
        Self {
            line: pos.line,
            column: pos.column,
        }
    }
}

impl From<async_graphql_parser::Error> for GraphQLError {
    fn from(error: async_graphql_parser::Error) -> Self {
        let positions: Vec<Pos> = error.positions().collect();
        GraphQLError::at(error.to_string(), positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_locations_and_path_are_omitted() {
        let error = GraphQLError::new("Throws!");
        assert_eq!(
            serde_json::to_string(&error).unwrap(),
            r#"{"message":"Throws!"}"#
        );
    }

    #[test]
    fn locations_and_path_serialize_in_wire_form() {
        let error = GraphQLError {
            message: "boom".to_string(),
            locations: vec![SourceLocation { line: 1, column: 2 }],
            path: vec![
                PathSegment::Key("friends".to_string()),
                PathSegment::Index(0),
            ],
        };
        assert_eq!(
            serde_json::to_string(&error).unwrap(),
            r#"{"message":"boom","locations":[{"line":1,"column":2}],"path":["friends",0]}"#
        );
    }

    #[test]
    fn parse_errors_carry_positions() {
        let parse_error = async_graphql_parser::parse_query("syntaxerror").unwrap_err();
        let error = GraphQLError::from(parse_error);
        assert!(!error.message.is_empty());
        assert!(!error.locations.is_empty());
    }
}
