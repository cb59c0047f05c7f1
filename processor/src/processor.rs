use crate::chance::{Decision, FailureSource, ThreadRngSource, decide};
use crate::config::ProcessorConfig;
use crate::transaction::transaction_id;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessResponse {
    pub message: String,
    #[serde(rename = "transactionId", skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Processed(ProcessResponse),
    Failed(ProcessResponse),
}

impl Outcome {
    pub fn response(&self) -> &ProcessResponse {
        match self {
            Outcome::Processed(r) | Outcome::Failed(r) => r,
        }
    }
}

pub struct Processor {
    config: ProcessorConfig,
    source: Arc<dyn FailureSource>,
}

impl Processor {
    pub fn new(config: ProcessorConfig) -> Self {
        Self::with_source(config, Arc::new(ThreadRngSource))
    }

    pub fn with_source(config: ProcessorConfig, source: Arc<dyn FailureSource>) -> Self {
        Self { config, source }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.processor_name
    }

    pub fn process(&self, payload: &Value) -> Outcome {
        self.process_at(payload, OffsetDateTime::now_utc())
    }

    pub fn process_at(&self, payload: &Value, now: OffsetDateTime) -> Outcome {
        let name = self.name();

        match decide(self.config.failure_rate, self.source.draw()) {
            Decision::Fail => Outcome::Failed(ProcessResponse {
                message: format!("{} failed to process payment.", name),
                transaction_id: None,
            }),
            Decision::Approve => {
                tracing::info!("[{}] Processing payment for: {}", name, payload);
                Outcome::Processed(ProcessResponse {
                    message: format!("{} processed payment successfully.", name),
                    transaction_id: Some(transaction_id(name, now)),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chance::{FixedSource, SeededSource};
    use serde_json::json;
    use std::sync::Mutex;
    use time::Duration;

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn logs_during(f: impl FnOnce()) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    fn processor(name: &str, failure_rate: f64, source: Arc<dyn FailureSource>) -> Processor {
        let config = ProcessorConfig {
            processor_name: name.to_string(),
            failure_rate,
            ..ProcessorConfig::default()
        };
        Processor::with_source(config, source)
    }

    #[test]
    fn approves_with_transaction_id() {
        let p = processor("Stripe", 0.0, Arc::new(FixedSource(0.0)));
        let at = OffsetDateTime::UNIX_EPOCH + Duration::milliseconds(42);

        let outcome = p.process_at(&json!({"amount": 10}), at);

        assert_eq!(
            outcome,
            Outcome::Processed(ProcessResponse {
                message: "Stripe processed payment successfully.".to_string(),
                transaction_id: Some("txn_stripe_42".to_string()),
            })
        );
    }

    #[test]
    fn fails_when_draw_is_below_rate() {
        let p = processor("Adyen", 0.5, Arc::new(FixedSource(0.49)));
        let outcome = p.process(&json!({}));

        assert!(matches!(outcome, Outcome::Failed(_)));
        assert_eq!(outcome.response().message, "Adyen failed to process payment.");
        assert_eq!(outcome.response().transaction_id, None);
    }

    #[test]
    fn rate_one_always_fails() {
        let p = processor("Processor", 1.0, Arc::new(SeededSource::new(9)));
        for _ in 0..500 {
            assert!(matches!(p.process(&Value::Null), Outcome::Failed(_)));
        }
    }

    #[test]
    fn rate_zero_never_fails() {
        let p = processor("Processor", 0.0, Arc::new(SeededSource::new(9)));
        for _ in 0..500 {
            assert!(matches!(p.process(&json!([1, 2, 3])), Outcome::Processed(_)));
        }
    }

    #[test]
    fn failure_body_has_no_transaction_id() {
        let response = ProcessResponse {
            message: "X failed to process payment.".to_string(),
            transaction_id: None,
        };
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"message": "X failed to process payment."})
        );
    }

    #[test]
    fn only_the_success_path_logs() {
        let approved = processor("Stripe", 0.0, Arc::new(FixedSource(0.5)));
        let logs = logs_during(|| {
            approved.process(&json!({"amount": 10}));
        });
        assert!(logs.contains("[Stripe] Processing payment for:"), "logs: {}", logs);
        assert!(logs.contains(r#"{"amount":10}"#), "logs: {}", logs);

        let failed = processor("Stripe", 1.0, Arc::new(FixedSource(0.5)));
        let logs = logs_during(|| {
            failed.process(&json!({"amount": 10}));
        });
        assert!(logs.is_empty(), "unexpected logs: {}", logs);
    }
}
