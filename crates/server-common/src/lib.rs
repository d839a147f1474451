// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Server startup shared by the server binding crates: initialize tracing,
//! read the deployment configuration from the environment, and build the
//! [`SystemRouter`] around the supplied engine.

use std::sync::Arc;

use common::env::Environment;
use common::env_const::{
    QUILL_PLAYGROUND_TITLE, QUILL_PLAYGROUND_VERSION, get_batch_enabled, get_graphql_http_path,
    get_playground_enabled, get_pretty,
};
use common::logging_tracing;
use core_engine::{ContextFn, QueryEngine, RootValueFn};
use graphql_router::{GraphQLRouter, GraphQLRouterConfig};
use playground::Playground;
use system_router::SystemRouter;

#[derive(Debug, thiserror::Error)]
pub enum ServerInitError {
    #[error("{0}")]
    Env(#[from] common::env::EnvError),
    #[error("{0}")]
    Playground(#[from] playground::PlaygroundError),
}

/// Per-deployment behavior hooks, supplied by the embedding application.
#[derive(Default)]
pub struct DeploymentHooks {
    /// Produces the per-request root value handed to the engine.
    pub root_value: Option<RootValueFn>,
    /// Produces the per-request execution context from the request head.
    pub context_factory: Option<ContextFn>,
    /// Overrides the bundled playground page.
    pub playground_template: Option<String>,
}

/// Builds the system router: tracing first, then the GraphQL router from the
/// environment-derived configuration. Called once at startup; the resulting
/// router is immutable and shared across requests.
pub fn init(
    env: &dyn Environment,
    engine: Arc<dyn QueryEngine>,
    hooks: DeploymentHooks,
) -> Result<SystemRouter, ServerInitError> {
    logging_tracing::init();

    let playground = if get_playground_enabled(env)? {
        Some(Playground::new(
            env.get(QUILL_PLAYGROUND_TITLE),
            env.get(QUILL_PLAYGROUND_VERSION),
            hooks.playground_template,
        )?)
    } else {
        None
    };

    let config = GraphQLRouterConfig {
        engine,
        root_value: hooks.root_value,
        context_factory: hooks.context_factory,
        pretty: get_pretty(env)?,
        batch_enabled: get_batch_enabled(env)?,
        playground,
        endpoint_path: get_graphql_http_path(env),
    };

    Ok(SystemRouter::new(vec![Box::new(GraphQLRouter::new(
        config,
    ))]))
}
