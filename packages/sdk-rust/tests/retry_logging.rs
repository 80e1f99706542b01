use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use swapkit_sdk::retry::{RetryPolicy, Submitter};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;

/// One event emitted by the submitter.
#[derive(Debug, Clone)]
struct Logged {
    level:  Level,
    fields: HashMap<String, String>,
}

impl Logged {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    fn message(&self) -> &str {
        self.field("message").unwrap_or_default()
    }
}

#[derive(Default)]
struct Fields(HashMap<String, String>);

impl Visit for Fields {
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

/// Records every `swapkit_sdk` event it sees.
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<Logged>>>);

impl Capture {
    fn events(&self) -> Vec<Logged> {
        self.0.lock().unwrap().clone()
    }

    fn at(&self, level: Level) -> Vec<Logged> {
        self.events().into_iter().filter(|e| e.level == level).collect()
    }
}

impl<S: Subscriber> Layer<S> for Capture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if !event.metadata().target().starts_with("swapkit_sdk") {
            return;
        }
        let mut fields = Fields::default();
        event.record(&mut fields);
        self.0.lock().unwrap().push(Logged { level: *event.metadata().level(), fields: fields.0 });
    }
}

fn tolerances(events: &[Logged]) -> Vec<&str> {
    events.iter().filter_map(|e| e.field("tolerance_bps")).collect()
}

// The default dispatcher is thread-local; #[tokio::test] polls on the test thread.

#[tokio::test(start_paused = true)]
async fn two_failures_then_success_logs_two_warnings() {
    let capture = Capture::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(capture.clone()));

    let calls = Arc::new(Mutex::new(0u32));
    let result = Submitter::new(RetryPolicy::default())
        .submit_with("swap", |_| {
            let calls = calls.clone();
            async move {
                let n = {
                    let mut count = calls.lock().unwrap();
                    *count += 1;
                    *count
                };
                if n < 3 {
                    Err(format!("slippage exceeded on attempt {n}"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
    assert_eq!(result.unwrap(), 3);

    let submitting: Vec<Logged> = capture
        .at(Level::INFO)
        .into_iter()
        .filter(|e| e.message().starts_with("submitting swap"))
        .collect();
    assert_eq!(submitting.len(), 3);
    let attempts: Vec<&str> = submitting.iter().filter_map(|e| e.field("attempt")).collect();
    assert_eq!(attempts, vec!["1", "2", "3"]);
    assert_eq!(tolerances(&submitting), vec!["50", "100", "150"]);
    assert!(submitting[1].message().contains("tolerance 1.00%"), "{}", submitting[1].message());

    let warnings = capture.at(Level::WARN);
    assert_eq!(warnings.len(), 2);
    assert_eq!(tolerances(&warnings), vec!["50", "100"]);
    assert!(warnings[0].message().contains("slippage exceeded on attempt 1"));
    assert!(warnings[1].message().contains("slippage exceeded on attempt 2"));

    assert!(capture.at(Level::ERROR).is_empty());
}

#[tokio::test(start_paused = true)]
async fn exhaustion_logs_one_error_with_the_last_failure() {
    let capture = Capture::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(capture.clone()));

    let result: Result<(), _> = Submitter::new(RetryPolicy::default())
        .submit_with("swap", |attempt| async move { Err(format!("rejected at {}", attempt.number)) })
        .await;
    assert!(result.is_err());

    let warnings = capture.at(Level::WARN);
    assert_eq!(warnings.len(), 2);
    assert_eq!(tolerances(&warnings), vec!["50", "100"]);

    let errors = capture.at(Level::ERROR);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field("attempts"), Some("3"));
    assert_eq!(errors[0].field("tolerance_bps"), Some("150"));
    assert!(errors[0].message().contains("rejected at 3"), "{}", errors[0].message());
}

#[tokio::test(start_paused = true)]
async fn first_try_success_logs_no_warnings() {
    let capture = Capture::default();
    let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(capture.clone()));

    let result = Submitter::new(RetryPolicy::default())
        .submit_with("provide_liquidity", |_| async { Ok::<_, String>(()) })
        .await;
    assert!(result.is_ok());

    let info = capture.at(Level::INFO);
    assert_eq!(info.len(), 1);
    assert_eq!(info[0].field("operation"), Some("provide_liquidity"));
    assert_eq!(info[0].field("tolerance_bps"), Some("50"));
    assert!(capture.at(Level::WARN).is_empty());
    assert!(capture.at(Level::ERROR).is_empty());
}
