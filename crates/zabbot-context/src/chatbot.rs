//! Chat facade: classify, gather, generate.

use crate::aggregator::{ContextAggregator, GatherResult};
use crate::bundle::ContextBundle;
use crate::error::GenerateError;
use crate::intent::{IntentClassifier, IntentSet};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn, Instrument};
use zabbot_core::{FetchLatency, Metrics};

const UNAVAILABLE_REPLY: &str =
    "Sorry, the AI service is not available right now. Please try again later.";

/// Language-generation collaborator.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce an answer for the query grounded in the bundle.
    async fn generate(&self, query: &str, bundle: &ContextBundle)
        -> Result<String, GenerateError>;

    /// Check the generator is reachable.
    async fn ping(&self) -> Result<(), GenerateError> {
        Ok(())
    }
}

/// Reply to one chat message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub response: String,
    /// Bundle keys the response was grounded on
    pub data_sources: Vec<String>,
    pub query_time_secs: f64,
    pub operations: Vec<String>,
    pub intents: Vec<String>,
    pub session_id: Option<String>,
    pub error: Option<String>,
}

/// Component health report.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub chatbot: String,
    pub data_source: String,
    pub generator: String,
    pub cache_size: usize,
    pub cache_hit_rate: f64,
    pub requests_total: u64,
    pub avg_latency_ms: f64,
    pub uptime_secs: u64,
    pub fetch_latency: Vec<OperationLatency>,
    pub timestamp: String,
}

/// Recent latency of one fetch operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationLatency {
    pub operation: String,
    pub samples: usize,
    pub p50_ms: f64,
    pub p99_ms: f64,
}

impl From<FetchLatency> for OperationLatency {
    fn from(latency: FetchLatency) -> Self {
        Self {
            operation: latency.operation.to_string(),
            samples: latency.samples,
            p50_ms: latency.p50.as_secs_f64() * 1000.0,
            p99_ms: latency.p99.as_secs_f64() * 1000.0,
        }
    }
}

/// Result of a cache flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheClearReport {
    pub cleared: usize,
}

/// Entry point for operator questions.
pub struct Chatbot {
    classifier: IntentClassifier,
    aggregator: ContextAggregator,
    generator: Option<Arc<dyn Generator>>,
}

impl Chatbot {
    /// Create a chatbot. Without a generator every message gets an
    /// unavailability reply, but `gather` still works.
    pub fn new(aggregator: ContextAggregator, generator: Option<Arc<dyn Generator>>) -> Self {
        Self {
            classifier: IntentClassifier::new(),
            aggregator,
            generator,
        }
    }

    pub fn classify(&self, text: &str) -> IntentSet {
        self.classifier.classify(text)
    }

    /// Classify and gather context without generating a response.
    pub async fn gather(&self, text: &str, session_id: Option<&str>) -> (IntentSet, GatherResult) {
        let span = request_span(session_id);
        async {
            let intents = self.classifier.classify(text);
            let result = self.aggregator.gather(&intents, text).await;
            (intents, result)
        }
        .instrument(span)
        .await
    }

    /// Process one message end to end.
    pub async fn process_message(&self, message: &str, session_id: Option<&str>) -> ChatReply {
        let started = Instant::now();
        let span = request_span(session_id);
        let session = session_id.map(str::to_string);

        let reply = async {
            info!(chars = message.chars().count(), "Processing message");

            let Some(generator) = &self.generator else {
                let e = GenerateError::Unavailable("generator not configured".to_string());
                warn!(error = %e, "Cannot answer message");
                return ChatReply {
                    response: UNAVAILABLE_REPLY.to_string(),
                    data_sources: vec![],
                    query_time_secs: started.elapsed().as_secs_f64(),
                    operations: vec![],
                    intents: vec![],
                    session_id: session.clone(),
                    error: Some(e.to_string()),
                };
            };

            let intents = self.classifier.classify(message);
            let gathered = self.aggregator.gather(&intents, message).await;
            let intent_names = intents.names().into_iter().map(String::from).collect();
            let data_sources = gathered
                .bundle
                .keys()
                .into_iter()
                .map(String::from)
                .collect();

            match generator.generate(message, &gathered.bundle).await {
                Ok(response) => ChatReply {
                    response,
                    data_sources,
                    query_time_secs: started.elapsed().as_secs_f64(),
                    operations: gathered.operations.into_vec(),
                    intents: intent_names,
                    session_id: session.clone(),
                    error: None,
                },
                Err(e) => {
                    error!(error = %e, "Generation failed");
                    ChatReply {
                        response: format!("Sorry, an error occurred processing your query: {}", e),
                        data_sources: vec![],
                        query_time_secs: started.elapsed().as_secs_f64(),
                        operations: gathered.operations.into_vec(),
                        intents: intent_names,
                        session_id: session.clone(),
                        error: Some(e.to_string()),
                    }
                }
            }
        }
        .instrument(span)
        .await;

        self.metrics().record_request(started.elapsed());
        info!(secs = reply.query_time_secs, ok = reply.error.is_none(), "Message processed");
        reply
    }

    /// Report the health of every collaborator.
    pub async fn health(&self) -> HealthStatus {
        let data_source = match self.aggregator.source().ping().await {
            Ok(()) => "connected".to_string(),
            Err(e) => format!("error: {}", e),
        };

        let generator = match &self.generator {
            None => "not configured".to_string(),
            Some(generator) => match generator.ping().await {
                Ok(()) => "connected".to_string(),
                Err(e) => format!("error: {}", e),
            },
        };

        let metrics = self.metrics();
        HealthStatus {
            chatbot: "ok".to_string(),
            data_source,
            generator,
            cache_size: self.aggregator.cache_size(),
            cache_hit_rate: metrics.cache_hit_rate(),
            requests_total: metrics.requests(),
            avg_latency_ms: metrics.avg_latency().as_secs_f64() * 1000.0,
            uptime_secs: metrics.uptime_secs(),
            fetch_latency: metrics
                .fetch_latencies()
                .into_iter()
                .map(OperationLatency::from)
                .collect(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Flush the shared cache.
    pub fn clear_cache(&self) -> CacheClearReport {
        CacheClearReport {
            cleared: self.aggregator.clear_cache(),
        }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        self.aggregator.metrics()
    }
}

fn request_span(session_id: Option<&str>) -> tracing::Span {
    tracing::info_span!(
        "chat",
        request_id = %uuid::Uuid::new_v4(),
        session = session_id.unwrap_or("-")
    )
}
