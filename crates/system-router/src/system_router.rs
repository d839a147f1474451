// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use common::http::{RequestPayload, ResponsePayload};
use common::router::{CompositeRouter, Router};

/// The single unit a server binary hosts: every endpoint router composed
/// behind one facade, with a 404 fallback for unmatched paths.
pub struct SystemRouter {
    underlying: CompositeRouter,
}

impl SystemRouter {
    pub fn new(routers: Vec<Box<dyn Router + Send + Sync>>) -> Self {
        Self {
            underlying: CompositeRouter::new(routers),
        }
    }

    pub async fn route(
        &self,
        request: &(dyn RequestPayload + Send + Sync),
    ) -> Option<ResponsePayload> {
        self.underlying.route(request).await
    }
}
