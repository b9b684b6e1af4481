// =============================================================================
//  MARS Build Processor - Service Entrypoint
//  File: server.rs
//
//  Description:
//  Loads credentials, configuration and validation schemas, then runs the
//  HTTP and/or AMQP front ends according to the server configuration.
//  Ported from `build_processor.py`'s `main()`.
//
//  Author:      Alex Roussinov
//  Created:     2025-12-25
//  Updated:     2026-07-26
//
//  This file is dual licensed under the MIT and Apache 2.0 licenses.
// =============================================================================

use actix_web::{App, HttpServer};
use async_trait::async_trait;
use log::{error, info};
use mars_build_processor::amqp::{self, AmqpFrontEnd};
use mars_build_processor::config::{
    db_credentials, load_yaml, mars_config_path, server_config_path, validation_schema_dir, MarsConfig, ServerConfig,
};
use mars_build_processor::data::{DataUnit, GraphClient};
use mars_build_processor::error::PlannerError;
use mars_build_processor::http::{self, AppState};
use mars_build_processor::sequence::SequenceUnit;
use mars_build_processor::validation::load_validation_schemas;
use serde_json::Value;
use std::sync::Arc;

/// The real graph database driver is out of scope for this planner
/// (spec §1/§6 - "the driver that executes them is out of scope").
/// This client stands in for it so the binary links and starts, and fails
/// loudly and legibly the first time a query actually has to run.
struct UnwiredGraphClient {
    uri: String,
}

#[async_trait]
impl GraphClient for UnwiredGraphClient {
    async fn run(&self, _query: &str) -> Result<Vec<Value>, PlannerError> {
        Err(PlannerError::DbNotReachable {
            origin: vec!["DB", "DRIVER"],
            message: format!(
                "no graph database driver is wired to {}; plug in a concrete GraphClient implementation",
                self.uri
            ),
        })
    }
}

#[actix_web::main]
async fn main() {
    env_logger::init();
    info!("run build_processor service");

    if let Err(error) = run().await {
        error!("{error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), PlannerError> {
    let (_username, _password) = db_credentials()?;

    let schema_dir = validation_schema_dir();
    let request_validator = load_validation_schemas(&schema_dir)?;

    let mars_config: MarsConfig = load_yaml(&mars_config_path())?;
    let situation_defaults = mars_config.default_parameters.situations;
    let goals_defaults = mars_config.default_parameters.goals;

    let database_uri = mars_config.database.uri;
    let sequence_unit = SequenceUnit::new(DataUnit::new(UnwiredGraphClient {
        uri: database_uri.clone(),
    }));

    let server_config: ServerConfig = load_yaml(&server_config_path())?;

    let http_config = server_config.http.filter(|c| c.activate);
    let amqp_config = server_config.amqp.filter(|c| c.activate);

    if http_config.is_none() && amqp_config.is_none() {
        return Err(PlannerError::ConfigNotConform {
            origin: vec!["CONFIG", "SERVER"],
            message: "no server activated, check the configuration".to_string(),
        });
    }

    // Running the AMQP consumer and the HTTP server concurrently on the same
    // actix-web/tokio runtime, instead of the original's pick-one "current
    // thread" model (its own TODO: "implement multithreading if two
    // activated server").
    match (http_config, amqp_config) {
        (Some(http_config), Some(amqp_config)) => {
            let state = Arc::new(AppState {
                sequence_unit,
                situation_defaults: situation_defaults.clone(),
                goals_defaults: goals_defaults.clone(),
                validator: request_validator,
            });
            let amqp_front_end = Arc::new(AmqpFrontEnd {
                sequence_unit: SequenceUnit::new(DataUnit::new(UnwiredGraphClient { uri: database_uri })),
                situation_defaults,
                goals_defaults,
            });

            info!("build http server");
            let http = run_http(http_config.host, http_config.port, state);
            info!("build amqp server");
            let queue = amqp::run(&amqp_config, amqp_front_end);

            let (http_result, amqp_result) = tokio::join!(http, queue);
            http_result?;
            amqp_result?;
        }
        (Some(http_config), None) => {
            let state = Arc::new(AppState {
                sequence_unit,
                situation_defaults,
                goals_defaults,
                validator: request_validator,
            });
            info!("build http server");
            run_http(http_config.host, http_config.port, state).await?;
        }
        (None, Some(amqp_config)) => {
            let front_end = Arc::new(AmqpFrontEnd {
                sequence_unit,
                situation_defaults,
                goals_defaults,
            });
            info!("build amqp server");
            amqp::run(&amqp_config, front_end).await?;
        }
        (None, None) => unreachable!("checked above"),
    }

    Ok(())
}

async fn run_http(host: String, port: u16, state: Arc<AppState<UnwiredGraphClient>>) -> Result<(), PlannerError> {
    info!("configure http server");
    HttpServer::new(move || App::new().configure(|cfg| http::configure(cfg, state.clone())))
        .bind((host.as_str(), port))
        .map_err(|e| PlannerError::ConfigNotConform {
            origin: vec!["SERVER", "HTTP"],
            message: format!("could not bind {host}:{port}: {e}"),
        })?
        .run()
        .await
        .map_err(|e| PlannerError::DbNotReachable {
            origin: vec!["SERVER", "HTTP"],
            message: e.to_string(),
        })
}
