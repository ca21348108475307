//! Orchestrator lifecycle tests
//!
//! Journaling resources record every lifecycle call into a shared journal;
//! their behavior (failing, hanging, stubborn) comes from their configuration.

use async_trait::async_trait;
use harness_core::{DynamicMessage, Schema, Value};
use harness_runtime::{
    Closer, InputManifest, Inputs, Orchestrator, OutputManifest, Outputs, Resource, RunError,
    SIGINT, SIGTERM, Service, Signals,
};
use serde_json::{Value as Json, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SCHEMA: &str = r#"
messages:
  - name: svc.Config
    fields:
      - { name: a, type: { message: svc.Slot } }
      - { name: b, type: { message: svc.Slot } }
      - { name: c, type: { message: svc.Slot } }
      - { name: d, type: { message: svc.Slot } }
      - { name: e, type: { message: svc.Slot } }
  - name: svc.Slot
    fields:
      - name: label
        type: string
        rules: { string: { max_len: 8 } }
      - { name: fail_enter, type: bool }
      - { name: hang_enter, type: bool }
      - { name: fail_close, type: bool }
      - { name: fail_exit, type: bool }
      - { name: stubborn, type: bool }
      - { name: oneshot, type: bool }
"#;

#[derive(Clone, Default)]
struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Default)]
struct Flags {
    fail_enter: bool,
    hang_enter: bool,
    fail_close: bool,
    fail_exit: bool,
    stubborn: bool,
    oneshot: bool,
}

struct Recorder {
    name: &'static str,
    journal: Journal,
    flags: Flags,
    closer: Closer,
}

impl Recorder {
    fn new(name: &'static str, journal: &Journal) -> Self {
        Self {
            name,
            journal: journal.clone(),
            flags: Flags::default(),
            closer: Closer::new(),
        }
    }
}

fn flag(config: &DynamicMessage, name: &str) -> bool {
    matches!(config.get(name), Some(Value::Bool(true)))
}

#[async_trait]
impl Resource for Recorder {
    fn configure(&mut self, config: &DynamicMessage) -> anyhow::Result<()> {
        self.flags = Flags {
            fail_enter: flag(config, "fail_enter"),
            hang_enter: flag(config, "hang_enter"),
            fail_close: flag(config, "fail_close"),
            fail_exit: flag(config, "fail_exit"),
            stubborn: flag(config, "stubborn"),
            oneshot: flag(config, "oneshot"),
        };
        Ok(())
    }

    async fn enter(&mut self) -> anyhow::Result<()> {
        if self.flags.fail_enter {
            anyhow::bail!("{} refused to start", self.name);
        }
        if self.flags.hang_enter {
            std::future::pending::<()>().await;
        }
        self.journal.push(format!("enter {}", self.name));
        if self.flags.oneshot {
            self.closer.close();
        }
        Ok(())
    }

    fn close(&self) -> anyhow::Result<()> {
        if self.flags.fail_close {
            anyhow::bail!("{} is not started", self.name);
        }
        self.journal.push(format!("close {}", self.name));
        if !self.flags.stubborn {
            self.closer.close();
        }
        Ok(())
    }

    async fn wait_closed(&self) -> anyhow::Result<()> {
        self.closer.wait().await;
        Ok(())
    }

    async fn exit(&mut self) -> anyhow::Result<()> {
        self.journal.push(format!("exit {}", self.name));
        if self.flags.fail_exit {
            anyhow::bail!("{} leaked", self.name);
        }
        self.closer.close();
        Ok(())
    }
}

/// Business function producing recorders for the listed output slots
struct Pipeline {
    journal: Journal,
    produce: Vec<&'static str>,
    fail: bool,
    hang: bool,
}

impl Pipeline {
    fn new(journal: &Journal, produce: &[&'static str]) -> Self {
        Self {
            journal: journal.clone(),
            produce: produce.to_vec(),
            fail: false,
            hang: false,
        }
    }
}

#[async_trait]
impl Service for Pipeline {
    async fn start(&self, _config: &DynamicMessage, inputs: &Inputs<'_>) -> anyhow::Result<Outputs> {
        let mut entered: Vec<&str> = ["a", "b", "c"]
            .into_iter()
            .filter(|n| inputs.contains(n))
            .collect();
        entered.sort();
        self.journal.push(format!("start {}", entered.join(",")));

        if self.fail {
            anyhow::bail!("business logic exploded");
        }
        if self.hang {
            std::future::pending::<()>().await;
        }
        let mut outputs = Outputs::new();
        for name in &self.produce {
            outputs.insert(*name, Box::new(Recorder::new(*name, &self.journal)));
        }
        Ok(outputs)
    }
}

/// Inputs [a required, b optional, c required], outputs [d, e]
fn orchestrator(journal: &Journal) -> Orchestrator {
    let recorder = |name: &'static str| {
        let journal = journal.clone();
        move || Recorder::new(name, &journal)
    };
    Orchestrator::new(Schema::from_yaml(SCHEMA).unwrap(), "svc.Config")
        .inputs(
            InputManifest::new()
                .required("a", recorder("a"))
                .optional("b", recorder("b"))
                .required("c", recorder("c")),
        )
        .outputs(OutputManifest::new().required("d").optional("e"))
}

fn config() -> Json {
    json!({ "a": {}, "c": {}, "d": {}, "e": {} })
}

async fn session(
    orchestrator: &Orchestrator,
    service: &Pipeline,
    raw: &Json,
    signals: Signals,
) -> Result<(), RunError> {
    tokio::time::timeout(
        Duration::from_secs(5),
        orchestrator.session(service, raw, signals),
    )
    .await
    .expect("session did not finish")
}

#[tokio::test]
async fn test_resources_enter_in_order_and_exit_in_reverse() {
    let journal = Journal::default();
    let orchestrator = orchestrator(&journal);
    let service = Pipeline::new(&journal, &["d", "e"]);
    let (tx, signals) = Signals::channel();
    tx.send(SIGTERM);

    let code = orchestrator.run(&service, &config(), signals).await;

    assert_eq!(code, 0);
    assert_eq!(
        journal.entries(),
        vec![
            "enter a", "enter c", "start a,c", "enter d", "enter e", "close d", "close e",
            "exit e", "exit d", "exit c", "exit a",
        ]
    );
}

#[tokio::test]
async fn test_output_completion_ends_session() {
    let journal = Journal::default();
    let orchestrator = orchestrator(&journal);
    let service = Pipeline::new(&journal, &["d", "e"]);
    let raw = json!({ "a": {}, "b": {}, "c": {}, "d": {}, "e": { "oneshot": true } });

    session(&orchestrator, &service, &raw, Signals::never())
        .await
        .unwrap();

    assert_eq!(
        journal.entries(),
        vec![
            "enter a", "enter b", "enter c", "start a,b,c", "enter d", "enter e", "exit e",
            "exit d", "exit c", "exit b", "exit a",
        ]
    );
}

#[tokio::test]
async fn test_input_failure_skips_business_function() {
    let journal = Journal::default();
    let orchestrator = orchestrator(&journal);
    let service = Pipeline::new(&journal, &["d", "e"]);
    let raw = json!({ "a": {}, "b": {}, "c": { "fail_enter": true }, "d": {} });

    let err = session(&orchestrator, &service, &raw, Signals::never())
        .await
        .unwrap_err();

    assert!(matches!(&err, RunError::Acquisition { slot, .. } if slot == "c"));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(
        journal.entries(),
        vec!["enter a", "enter b", "exit b", "exit a"]
    );
}

#[tokio::test]
async fn test_output_failure_releases_in_reverse() {
    let journal = Journal::default();
    let orchestrator = orchestrator(&journal);
    let service = Pipeline::new(&journal, &["d", "e"]);
    let raw = json!({ "a": {}, "c": {}, "d": {}, "e": { "fail_enter": true } });

    let err = session(&orchestrator, &service, &raw, Signals::never())
        .await
        .unwrap_err();

    assert!(matches!(&err, RunError::Acquisition { slot, .. } if slot == "e"));
    assert_eq!(
        journal.entries(),
        vec!["enter a", "enter c", "start a,c", "enter d", "exit d", "exit c", "exit a"]
    );
}

#[tokio::test]
async fn test_business_failure_releases_inputs() {
    let journal = Journal::default();
    let orchestrator = orchestrator(&journal);
    let mut service = Pipeline::new(&journal, &[]);
    service.fail = true;

    let err = session(&orchestrator, &service, &config(), Signals::never())
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Business(_)));
    assert_eq!(
        journal.entries(),
        vec!["enter a", "enter c", "start a,c", "exit c", "exit a"]
    );
}

#[tokio::test]
async fn test_missing_required_slot_constructs_nothing() {
    let journal = Journal::default();
    let orchestrator = orchestrator(&journal);
    let service = Pipeline::new(&journal, &["d", "e"]);

    // required output "d" is absent; detected before input "a" is built
    let raw = json!({ "a": {}, "c": {} });
    let err = session(&orchestrator, &service, &raw, Signals::never())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "missing configuration for required resource d");
    assert!(journal.entries().is_empty());
}

#[tokio::test]
async fn test_validation_failure_acquires_nothing() {
    let journal = Journal::default();
    let orchestrator = orchestrator(&journal);
    let service = Pipeline::new(&journal, &["d", "e"]);
    let raw = json!({ "a": { "label": "far too long" }, "c": {}, "d": {} });

    let err = session(&orchestrator, &service, &raw, Signals::never())
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Validation(_)));
    assert_eq!(err.to_string(), "label length is more than 8");
    assert!(journal.entries().is_empty());
}

#[tokio::test]
async fn test_decode_failure() {
    let journal = Journal::default();
    let orchestrator = orchestrator(&journal);
    let service = Pipeline::new(&journal, &[]);
    let raw = json!({ "a": {}, "c": {}, "d": {}, "unknown": 1 });

    let err = session(&orchestrator, &service, &raw, Signals::never())
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Decode(_)));
}

#[tokio::test]
async fn test_undeclared_output_is_a_mismatch() {
    let journal = Journal::default();
    let orchestrator = orchestrator(&journal)
        .outputs(OutputManifest::new().optional("d"));
    let service = Pipeline::new(&journal, &["d", "e"]);
    let raw = json!({ "a": {}, "c": {}, "d": {} });

    let err = session(&orchestrator, &service, &raw, Signals::never())
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::OutputMismatch { .. }));
    assert_eq!(
        journal.entries(),
        vec!["enter a", "enter c", "start a,c", "exit c", "exit a"]
    );
}

#[tokio::test]
async fn test_missing_configured_output_is_a_mismatch() {
    let journal = Journal::default();
    let orchestrator = orchestrator(&journal);
    let service = Pipeline::new(&journal, &["d"]);

    let err = session(&orchestrator, &service, &config(), Signals::never())
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::OutputMismatch { .. }));
}

#[tokio::test]
async fn test_second_signal_escalates() {
    let journal = Journal::default();
    let orchestrator = orchestrator(&journal);
    let service = Pipeline::new(&journal, &["d"]);
    let raw = json!({ "a": {}, "c": {}, "d": { "stubborn": true } });
    let (tx, signals) = Signals::channel();
    tx.send(SIGTERM);
    tx.send(SIGINT);

    let err = session(&orchestrator, &service, &raw, signals)
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Escalated { signal: SIGINT }));
    assert_eq!(err.exit_code(), 130);
    assert!(!journal.entries().iter().any(|e| e.starts_with("exit")));
}

#[tokio::test]
async fn test_failed_close_escalates() {
    let journal = Journal::default();
    let orchestrator = orchestrator(&journal);
    let service = Pipeline::new(&journal, &["d", "e"]);
    let raw = json!({ "a": {}, "c": {}, "d": { "fail_close": true }, "e": {} });
    let (tx, signals) = Signals::channel();
    tx.send(SIGTERM);

    let code = orchestrator.run(&service, &raw, signals).await;

    assert_eq!(code, 143);
    // the remaining outputs are still asked to close
    assert!(journal.entries().contains(&"close e".to_string()));
}

#[tokio::test]
async fn test_release_failure_does_not_stop_release() {
    let journal = Journal::default();
    let orchestrator = orchestrator(&journal);
    let service = Pipeline::new(&journal, &["d"]);
    let raw = json!({ "a": {}, "c": { "fail_exit": true }, "d": { "oneshot": true } });

    let err = session(&orchestrator, &service, &raw, Signals::never())
        .await
        .unwrap_err();

    assert!(matches!(&err, RunError::Release { failures } if failures.len() == 1));
    assert_eq!(err.to_string(), "failed to release 1: c: c leaked");
    assert!(journal.entries().ends_with(&[
        "exit d".to_string(),
        "exit c".to_string(),
        "exit a".to_string(),
    ]));
}

#[tokio::test]
async fn test_release_failure_does_not_mask_original_error() {
    let journal = Journal::default();
    let orchestrator = orchestrator(&journal);
    let mut service = Pipeline::new(&journal, &[]);
    service.fail = true;
    let raw = json!({ "a": { "fail_exit": true }, "c": {}, "d": {} });

    let err = session(&orchestrator, &service, &raw, Signals::never())
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Business(_)));
}

#[tokio::test]
async fn test_no_outputs_returns_after_release() {
    let journal = Journal::default();
    let orchestrator = orchestrator(&journal).outputs(OutputManifest::new());
    let service = Pipeline::new(&journal, &[]);
    let raw = json!({ "a": {}, "c": {} });

    let code = orchestrator.run(&service, &raw, Signals::never()).await;
    assert_eq!(code, 0);
    assert_eq!(
        journal.entries(),
        vec!["enter a", "enter c", "start a,c", "exit c", "exit a"]
    );
}

#[tokio::test]
async fn test_signal_during_input_acquisition_aborts_startup() {
    let journal = Journal::default();
    let orchestrator = orchestrator(&journal);
    let service = Pipeline::new(&journal, &["d"]);
    let raw = json!({ "a": {}, "b": {}, "c": { "hang_enter": true }, "d": {} });
    let (tx, signals) = Signals::channel();
    tx.send(SIGTERM);

    let err = session(&orchestrator, &service, &raw, signals)
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Interrupted { signal: SIGTERM }));
    assert_eq!(err.exit_code(), 143);
    assert_eq!(
        journal.entries(),
        vec!["enter a", "enter b", "exit b", "exit a"]
    );
}

#[tokio::test]
async fn test_repeated_signals_while_first_input_hangs() {
    let journal = Journal::default();
    let orchestrator = orchestrator(&journal);
    let service = Pipeline::new(&journal, &["d"]);
    let raw = json!({ "a": { "hang_enter": true }, "c": {}, "d": {} });
    let (tx, signals) = Signals::channel();
    tx.send(SIGTERM);
    tx.send(SIGINT);

    let code = tokio::time::timeout(
        Duration::from_secs(2),
        orchestrator.run(&service, &raw, signals),
    )
    .await
    .expect("signals were ignored while acquiring inputs");

    assert_eq!(code, 143);
    assert!(journal.entries().is_empty());
}

#[tokio::test]
async fn test_signal_during_business_function_releases_inputs() {
    let journal = Journal::default();
    let orchestrator = orchestrator(&journal);
    let mut service = Pipeline::new(&journal, &["d"]);
    service.hang = true;
    let (tx, signals) = Signals::channel();
    tx.send(SIGINT);

    let err = session(&orchestrator, &service, &config(), signals)
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Interrupted { signal: SIGINT }));
    assert_eq!(err.exit_code(), 130);
    assert_eq!(
        journal.entries(),
        vec!["enter a", "enter c", "start a,c", "exit c", "exit a"]
    );
}

#[tokio::test]
async fn test_signal_during_output_acquisition_releases_in_reverse() {
    let journal = Journal::default();
    let orchestrator = orchestrator(&journal);
    let service = Pipeline::new(&journal, &["d", "e"]);
    let raw = json!({ "a": {}, "c": {}, "d": {}, "e": { "hang_enter": true } });
    let (tx, signals) = Signals::channel();
    tx.send(SIGTERM);

    let err = session(&orchestrator, &service, &raw, signals)
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Interrupted { signal: SIGTERM }));
    assert_eq!(
        journal.entries(),
        vec!["enter a", "enter c", "start a,c", "enter d", "exit d", "exit c", "exit a"]
    );
}
