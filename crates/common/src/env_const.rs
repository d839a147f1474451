// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::env::{EnvError, Environment};

pub const QUILL_GRAPHQL_HTTP_PATH: &str = "QUILL_GRAPHQL_HTTP_PATH";

pub const QUILL_PRETTY: &str = "QUILL_PRETTY";
pub const QUILL_BATCH: &str = "QUILL_BATCH";

pub const QUILL_PLAYGROUND: &str = "QUILL_PLAYGROUND";
pub const QUILL_PLAYGROUND_TITLE: &str = "QUILL_PLAYGROUND_TITLE";
pub const QUILL_PLAYGROUND_VERSION: &str = "QUILL_PLAYGROUND_VERSION";

pub const QUILL_SERVER_HOST: &str = "QUILL_SERVER_HOST";
pub const QUILL_SERVER_PORT: &str = "QUILL_SERVER_PORT";

pub fn get_graphql_http_path(env: &dyn Environment) -> String {
    env.get_or_else(QUILL_GRAPHQL_HTTP_PATH, "/graphql")
}

pub fn get_pretty(env: &dyn Environment) -> Result<bool, EnvError> {
    env.enabled(QUILL_PRETTY, false)
}

pub fn get_batch_enabled(env: &dyn Environment) -> Result<bool, EnvError> {
    env.enabled(QUILL_BATCH, false)
}

pub fn get_playground_enabled(env: &dyn Environment) -> Result<bool, EnvError> {
    env.enabled(QUILL_PLAYGROUND, true)
}
