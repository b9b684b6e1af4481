// ============================================================================
//                       MARS BUILD PROCESSOR • HTTP FRONT END
//        Three GET Routes, Shared Validation, Shared Handler
// ----------------------------------------------------------------------------
//   Architectural Role:
//       Thin `actix-web` wiring around the one pipeline function both front
//       ends share (`build_sequence`): validate, merge request overrides onto
//       configured defaults, run the sequence unit, render the envelope.
//       Ported from `server/http_server.py`'s `HttpServer` and
//       `build_processor.py`'s `build_sequence`.
//
//   File:        /src/http.rs
//   License:
//       Dual-licensed under the MIT and Apache 2.0 licenses.
//       See LICENSE-MIT and LICENSE-APACHE in the repository root for details.
// ============================================================================

use crate::config::{GoalsDefaults, SituationDefaults};
use crate::data::GraphClient;
use crate::error::PlannerError;
use crate::request::{build_goals_definition, build_situation_definition, BuildRequestBody, BuildResponseBody, Envelope, ErrorBody};
use crate::sequence::{SequenceKind, SequenceUnit};
use crate::validation::RequestValidator;
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::Value;
use std::sync::Arc;

/// Shared state every route handler closes over: the sequence unit (generic
/// over the graph client), the configured defaults it overlays requests
/// onto, and the compiled validation schemas keyed by URL path.
pub struct AppState<C: GraphClient> {
    pub sequence_unit: SequenceUnit<C>,
    pub situation_defaults: SituationDefaults,
    pub goals_defaults: GoalsDefaults,
    pub validator: RequestValidator,
}

fn target_from_path(path: &str) -> Option<&str> {
    path.rsplit('/').next().filter(|s| !s.is_empty())
}

fn error_status(error: &PlannerError) -> actix_web::http::StatusCode {
    use actix_web::http::StatusCode;
    match error {
        PlannerError::BodyInvalid { .. } => StatusCode::BAD_REQUEST,
        PlannerError::UrlInvalid { .. } => StatusCode::BAD_REQUEST,
        PlannerError::ConfigMissing { .. } | PlannerError::ConfigNotConform { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        PlannerError::DbNotReachable { .. } => StatusCode::BAD_GATEWAY,
        PlannerError::ModelParseError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        PlannerError::SolverInfiniteResolution { .. } | PlannerError::SolverNoRepairAction { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn error_response(error: PlannerError) -> HttpResponse {
    let status = error_status(&error);
    log::warn!("request failed: {error}");
    HttpResponse::build(status).json(Envelope::<()>::Fail {
        status: "FAIL",
        error: ErrorBody::from(&error),
    })
}

/// Shared handler body for all three `/sequence/{target}` routes: rejects
/// stray query parameters, merges the body onto configured defaults, and runs
/// the sequence pipeline.
async fn build_sequence<C: GraphClient + 'static>(
    req: HttpRequest,
    body: Option<web::Json<Value>>,
    state: web::Data<AppState<C>>,
) -> HttpResponse {
    if !req.query_string().is_empty() {
        return error_response(PlannerError::UrlInvalid { origin: vec!["REQUEST", "VALIDATION"] });
    }

    let Some(target) = target_from_path(req.path()) else {
        return error_response(PlannerError::UrlInvalid { origin: vec!["REQUEST", "VALIDATION"] });
    };

    let raw_body = body.map(|b| b.into_inner()).unwrap_or(Value::Object(serde_json::Map::new()));

    if let Err(e) = state.validator.validate(req.path(), &raw_body) {
        return error_response(e);
    }

    let request_body: BuildRequestBody = match serde_json::from_value(raw_body) {
        Ok(b) => b,
        Err(e) => {
            return error_response(PlannerError::BodyInvalid {
                origin: vec!["REQUEST", "VALIDATION"],
                message: e.to_string(),
            })
        }
    };

    let (robot_situation, work_situation) = match build_situation_definition(&state.situation_defaults, &request_body) {
        Ok(s) => s,
        Err(e) => return error_response(e),
    };
    let (definition_type, area_definition) = match build_goals_definition(&state.goals_defaults, &request_body) {
        Ok(g) => g,
        Err(e) => return error_response(e),
    };

    let kind = match SequenceKind::from_parts(target, &definition_type) {
        Ok(k) => k,
        Err(e) => return error_response(e),
    };

    match state
        .sequence_unit
        .build(kind, &area_definition, robot_situation, work_situation)
        .await
    {
        Ok(actions) => HttpResponse::Ok().json(Envelope::Success(BuildResponseBody {
            build_process: actions.iter().map(|a| a.to_dto()).collect(),
        })),
        Err(e) => error_response(e),
    }
}

/// Registers the three `/sequence/{target}` GET routes onto an actix-web app
/// configuration, sharing `state` across them.
pub fn configure<C: GraphClient + 'static>(cfg: &mut web::ServiceConfig, state: Arc<AppState<C>>) {
    cfg.app_data(web::Data::from(state))
        .route("/sequence/approach", web::get().to(build_sequence::<C>))
        .route("/sequence/station", web::get().to(build_sequence::<C>))
        .route("/sequence/work", web::get().to(build_sequence::<C>));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_from_path_reads_trailing_segment() {
        assert_eq!(target_from_path("/sequence/work"), Some("work"));
        assert_eq!(target_from_path("/sequence/"), None);
    }

    #[test]
    fn db_not_reachable_maps_to_bad_gateway() {
        let error = PlannerError::DbNotReachable {
            origin: vec!["DB", "DRIVER"],
            message: "timeout".into(),
        };
        assert_eq!(error_status(&error), actix_web::http::StatusCode::BAD_GATEWAY);
    }
}
