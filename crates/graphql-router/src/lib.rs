// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The GraphQL-over-HTTP protocol engine, independent of any web framework.
//!
//! [`GraphQLRouter`] adapts an incoming request (query string, JSON body,
//! urlencoded or multipart form, raw query text, or a batch array) into
//! normalized parameters, enforces the protocol rules, executes each entry
//! through the configured engine, and encodes the response.

mod accept;
mod body;
mod error;
mod graphql_router;
mod response;
mod upload;

pub use error::HttpQueryError;
pub use graphql_router::{GraphQLRouter, GraphQLRouterConfig};
pub use response::{FormattedResponse, ResponseEnvelope};
pub use upload::{FileMapError, place_files_in_operations};
