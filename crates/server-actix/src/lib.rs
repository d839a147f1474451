// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! actix-web binding: adapts actix requests onto the [`SystemRouter`] and
//! hosts it in an `HttpServer`. The embedding application supplies the engine
//! and deployment hooks and calls [`run`].

mod request;

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time;

use actix_web::{
    App, HttpRequest, HttpResponse, HttpServer, Responder, middleware,
    web::{self, ServiceConfig},
};
use bytes::Bytes;
use tracing_actix_web::TracingLogger;

use common::env::Environment;
use common::env_const::{QUILL_SERVER_HOST, QUILL_SERVER_PORT, get_graphql_http_path};
use common::http::{RequestHead, RequestPayload, ResponseBody, ResponsePayload};
use core_engine::QueryEngine;
use server_common::DeploymentHooks;
use system_router::SystemRouter;

use request::ActixRequestHead;

macro_rules! error_msg {
    ($msg:literal) => {
        concat!("{\"errors\": [{\"message\":\"", $msg, "\"}]}").as_bytes()
    };
}

#[derive(thiserror::Error)]
pub enum ServerError {
    #[error("Port {0} is already in use. Check if there is another process running at that port.")]
    PortInUse(u16),
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Env(#[from] common::env::EnvError),
    #[error("{0}")]
    ServerInit(#[from] server_common::ServerInitError),
}

// A custom `Debug` implementation for `ServerError` (that delegates to the `Display` impl), so that
// we don't print the default `Debug` implementation's message when the server exits.
impl std::fmt::Debug for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

struct ActixRequestPayload {
    head: ActixRequestHead,
    body: Mutex<Bytes>,
}

impl RequestPayload for ActixRequestPayload {
    fn get_head(&self) -> &(dyn RequestHead + Send + Sync) {
        &self.head
    }

    fn take_body(&self) -> Bytes {
        std::mem::take(&mut *self.body.lock().unwrap())
    }
}

pub fn configure_router(system_router: web::Data<SystemRouter>) -> impl FnOnce(&mut ServiceConfig) {
    move |app| {
        app.app_data(system_router).default_service(web::to(resolve));
    }
}

/// Resolves one request through the system router.
async fn resolve(
    http_request: HttpRequest,
    body: web::Bytes,
    system_router: web::Data<SystemRouter>,
) -> impl Responder {
    let request = ActixRequestPayload {
        head: ActixRequestHead::from_request(&http_request),
        body: Mutex::new(body),
    };

    let response = system_router.route(&request).await;

    match response {
        Some(ResponsePayload {
            body,
            headers,
            status_code,
        }) => {
            let actix_status_code = match to_actix_status_code(status_code) {
                Ok(status_code) => status_code,
                Err(err) => {
                    tracing::error!("Invalid status code: {}", err);
                    return HttpResponse::build(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR)
                        .body(error_msg!("Invalid status code"));
                }
            };

            let mut builder = HttpResponse::build(actix_status_code);

            for header in headers.into_iter() {
                builder.append_header(header);
            }

            match body {
                ResponseBody::Bytes(bytes) => builder.body(bytes),
                ResponseBody::None => builder.body(""),
            }
        }
        None => HttpResponse::build(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR)
            .body(error_msg!("Error resolving request")),
    }
}

fn to_actix_status_code(status_code: http::StatusCode) -> Result<actix_web::http::StatusCode, String> {
    actix_web::http::StatusCode::from_u16(status_code.as_u16())
        .map_err(|_| "Invalid status code".to_string())
}

/// Hosts the system router until the server shuts down. Host and port come
/// from `QUILL_SERVER_HOST`/`QUILL_SERVER_PORT` (localhost:8080 by default).
pub async fn run(
    env: Arc<dyn Environment>,
    engine: Arc<dyn QueryEngine>,
    hooks: DeploymentHooks,
) -> Result<(), ServerError> {
    let start_time = time::SystemTime::now();

    let system_router = web::Data::new(server_common::init(env.as_ref(), engine, hooks)?);

    let server_port = env
        .get(QUILL_SERVER_PORT)
        .map(|port_str| {
            port_str
                .parse::<u16>()
                .expect("Failed to parse QUILL_SERVER_PORT")
        })
        .unwrap_or(8080);
    let server_host = env.get_or_else(QUILL_SERVER_HOST, "localhost");

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .wrap(middleware::NormalizePath::new(
                middleware::TrailingSlash::Trim,
            ))
            .configure(configure_router(system_router.clone()))
    })
    .bind((server_host.as_str(), server_port));

    match server {
        Ok(server) => {
            let pretty_addr = pretty_addr(&server.addrs());

            println!(
                "Started server on {} in {:.2} ms",
                pretty_addr,
                start_time.elapsed().unwrap().as_micros() as f64 / 1000.0
            );
            println!("- GraphQL endpoint hosted at:");
            println!(
                "\thttp://{pretty_addr}{}",
                get_graphql_http_path(env.as_ref())
            );

            Ok(server.run().await?)
        }
        Err(e) => Err(if e.kind() == ErrorKind::AddrInUse {
            ServerError::PortInUse(server_port)
        } else {
            ServerError::Io(e)
        }),
    }
}

fn pretty_addr(addrs: &[SocketAddr]) -> String {
    let loopback_addr = addrs.iter().find(|addr| addr.ip().is_loopback());

    match loopback_addr {
        Some(addr) => format!("localhost:{}", addr.port()),
        None => match addrs {
            // Print single address without square brackets
            [addr] => format!("{addr}"),
            _ => {
                format!("{addrs:?}")
            }
        },
    }
}
