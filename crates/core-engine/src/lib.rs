// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The contract between the HTTP protocol layer and a query-execution engine.
//!
//! The engine itself (schema, resolution, any middleware or executor choice)
//! lives behind the [`QueryEngine`] trait; this crate defines the data that
//! crosses that boundary: normalized request parameters, execution results,
//! error values, and uploaded files.

mod engine;
mod error;
mod execution;
mod params;
mod upload;

pub mod test_support;

pub use engine::{ContextFn, EngineError, EngineRequest, QueryEngine, RootValueFn};
pub use error::{GraphQLError, PathSegment, SourceLocation};
pub use execution::ExecutionResult;
pub use params::{GraphQLParams, ParamsError};
pub use upload::{UploadFile, Uploads};
