//! Resource lifecycle orchestrator
//!
//! One session drives a service from raw configuration to shutdown:
//!
//! ```text
//! Loading ─▶ Validating ─▶ AcquiringInputs ─▶ RunningService ─▶ AcquiringOutputs
//!                                                                   │
//!            Terminated ◀─ ReleasingAll ◀─ AwaitingTermination ◀────┘
//! ```
//!
//! Every pending step from AcquiringInputs on is raced against termination
//! signals. A signal before AwaitingTermination aborts startup.
//!
//! Any failure after acquisition started still releases what was entered,
//! in reverse order. Release failures are logged and collected; they never
//! replace the failure that ended the session.

use async_trait::async_trait;
use futures::future::select_all;
use harness_core::{DynamicMessage, Schema, Value, decode};
use serde_json::Value as Json;
use std::future::Future;

use crate::error::{Result, RunError};
use crate::manifest::{Cardinality, InputManifest, Inputs, OutputManifest, Outputs};
use crate::resource::Resource;
use crate::signals::Signals;

/// The business function of a service
///
/// Receives the validated configuration and the entered inputs, and
/// returns the output resources keyed by slot name.
#[async_trait]
pub trait Service: Send + Sync {
    /// Wire inputs into outputs
    async fn start(&self, config: &DynamicMessage, inputs: &Inputs<'_>) -> anyhow::Result<Outputs>;
}

/// Drives sessions for one root configuration type
#[derive(Debug)]
pub struct Orchestrator {
    schema: Schema,
    root_type: String,
    inputs: InputManifest,
    outputs: OutputManifest,
}

impl Orchestrator {
    /// Create an orchestrator without resource slots
    pub fn new(schema: Schema, root_type: impl Into<String>) -> Self {
        Self {
            schema,
            root_type: root_type.into(),
            inputs: InputManifest::new(),
            outputs: OutputManifest::new(),
        }
    }

    /// Set the input manifest
    pub fn inputs(mut self, inputs: InputManifest) -> Self {
        self.inputs = inputs;
        self
    }

    /// Set the output manifest
    pub fn outputs(mut self, outputs: OutputManifest) -> Self {
        self.outputs = outputs;
        self
    }

    /// Schema the configuration is decoded with
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Run one session and map its outcome to a process exit code
    pub async fn run<S>(&self, service: &S, raw: &Json, signals: Signals) -> i32
    where
        S: Service + ?Sized,
    {
        match self.session(service, raw, signals).await {
            Ok(()) => {
                tracing::info!("Service stopped");
                0
            }
            Err(err) => {
                tracing::error!("{}", err);
                err.exit_code()
            }
        }
    }

    /// Run one session
    pub async fn session<S>(&self, service: &S, raw: &Json, signals: Signals) -> Result<()>
    where
        S: Service + ?Sized,
    {
        tracing::debug!(root_type = %self.root_type, "Decoding configuration");
        let config = decode(&self.schema, &self.root_type, raw).map_err(RunError::Decode)?;

        tracing::debug!("Validating configuration");
        harness_validate::validate(&self.schema, &config).map_err(RunError::Validation)?;
        self.check_required(&config)?;

        let mut session = Session {
            handles: Vec::new(),
            draining: false,
            signals,
        };
        let outcome = self.drive(service, &config, &mut session).await;
        match outcome {
            Err(RunError::Escalated { .. }) => return outcome,
            Err(RunError::Interrupted { .. }) => session.draining = true,
            _ => {}
        }

        match (outcome, session.release().await) {
            (_, Err(escalated @ RunError::Escalated { .. })) => Err(escalated),
            (Err(err), _) => Err(err),
            (Ok(()), released) => released,
        }
    }

    /// Every required slot, inputs then outputs, must have configuration
    fn check_required(&self, config: &DynamicMessage) -> Result<()> {
        let inputs = self
            .inputs
            .slots()
            .iter()
            .map(|s| (s.name.as_str(), s.cardinality));
        let outputs = self
            .outputs
            .slots()
            .iter()
            .map(|s| (s.name.as_str(), s.cardinality));

        for (name, cardinality) in inputs.chain(outputs) {
            if cardinality == Cardinality::Required && !config.has(name) {
                return Err(RunError::ConfigurationMissing {
                    slot: name.to_string(),
                });
            }
        }
        Ok(())
    }

    async fn drive<S>(&self, service: &S, config: &DynamicMessage, session: &mut Session) -> Result<()>
    where
        S: Service + ?Sized,
    {
        for slot in self.inputs.slots() {
            let Some(sub) = slot_config(config, &slot.name)? else {
                tracing::debug!(slot = %slot.name, "Optional input not configured");
                continue;
            };
            session.acquire(&slot.name, slot.create(), sub, false).await?;
        }

        let outputs = {
            let inputs = entered_inputs(&session.handles);
            tracing::info!("Starting service");
            until_signal(&mut session.signals, service.start(config, &inputs))
                .await?
                .map_err(RunError::Business)?
        };

        for (slot, resource, sub) in self.match_outputs(config, outputs)? {
            session.acquire(&slot, resource, sub, true).await?;
        }

        session.await_termination().await
    }

    /// Pair returned outputs with their configured slots, in manifest order
    fn match_outputs<'c>(
        &self,
        config: &'c DynamicMessage,
        mut outputs: Outputs,
    ) -> Result<Vec<(String, Box<dyn Resource>, &'c DynamicMessage)>> {
        if let Some(unknown) = outputs.names().find(|n| !self.outputs.contains(n)) {
            return Err(RunError::OutputMismatch {
                message: format!("service returned undeclared output {}", unknown),
            });
        }

        let mut matched = Vec::new();
        for slot in self.outputs.slots() {
            match (slot_config(config, &slot.name)?, outputs.take(&slot.name)) {
                (Some(sub), Some(resource)) => matched.push((slot.name.clone(), resource, sub)),
                (Some(_), None) => {
                    return Err(RunError::OutputMismatch {
                        message: format!("service did not return output {}", slot.name),
                    });
                }
                (None, Some(_)) => {
                    tracing::debug!(slot = %slot.name, "Dropping output without configuration");
                }
                (None, None) => {}
            }
        }
        Ok(matched)
    }
}

/// The configuration sub-message of slot `name`, if set
fn slot_config<'c>(config: &'c DynamicMessage, name: &str) -> Result<Option<&'c DynamicMessage>> {
    match config.get(name) {
        None => Ok(None),
        Some(Value::Message(sub)) => Ok(Some(&**sub)),
        Some(other) => Err(RunError::Acquisition {
            slot: name.to_string(),
            error: anyhow::anyhow!("configuration is not a message: {}", other),
        }),
    }
}

/// Run `work` unless a termination signal arrives first
///
/// Ready work wins over a queued signal.
async fn until_signal<T>(signals: &mut Signals, work: impl Future<Output = T>) -> Result<T> {
    tokio::select! {
        biased;
        value = work => Ok(value),
        signal = signals.recv() => {
            tracing::warn!(signal, "Interrupted during startup");
            Err(RunError::Interrupted { signal })
        }
    }
}

fn entered_inputs(handles: &[Handle]) -> Inputs<'_> {
    let mut inputs = Inputs::default();
    for handle in handles.iter().filter(|h| !h.output) {
        inputs.insert(&handle.slot, handle.resource.as_ref());
    }
    inputs
}

struct Handle {
    slot: String,
    resource: Box<dyn Resource>,
    output: bool,
}

/// Resources entered by one session, in acquisition order
struct Session {
    handles: Vec<Handle>,
    draining: bool,
    signals: Signals,
}

impl Session {
    async fn acquire(
        &mut self,
        slot: &str,
        mut resource: Box<dyn Resource>,
        config: &DynamicMessage,
        output: bool,
    ) -> Result<()> {
        let failed = |error| RunError::Acquisition {
            slot: slot.to_string(),
            error,
        };
        resource.configure(config).map_err(failed)?;
        until_signal(&mut self.signals, resource.enter())
            .await?
            .map_err(failed)?;

        tracing::info!(slot, "Entered resource");
        self.handles.push(Handle {
            slot: slot.to_string(),
            resource,
            output,
        });
        Ok(())
    }

    /// Race output completions against termination signals
    ///
    /// The first signal closes every output; a failed close or a second
    /// signal escalates.
    async fn await_termination(&mut self) -> Result<()> {
        let outputs: Vec<&Handle> = self.handles.iter().filter(|h| h.output).collect();
        if outputs.is_empty() {
            return Ok(());
        }

        tracing::info!(outputs = outputs.len(), "Service running");
        let mut waiters = select_all(outputs.iter().map(|h| h.resource.wait_closed()));
        loop {
            tokio::select! {
                (result, index, _) = &mut waiters => {
                    let slot = &outputs[index].slot;
                    return match result {
                        Ok(()) => {
                            tracing::info!(slot = %slot, "Resource closed");
                            Ok(())
                        }
                        Err(error) => Err(RunError::Output {
                            slot: slot.clone(),
                            error,
                        }),
                    };
                }
                signal = self.signals.recv() => {
                    if self.draining {
                        return Err(RunError::Escalated { signal });
                    }
                    self.draining = true;

                    let mut failed = false;
                    for handle in &outputs {
                        if let Err(error) = handle.resource.close() {
                            tracing::warn!(slot = %handle.slot, "Failed to close resource: {:#}", error);
                            failed = true;
                        }
                    }
                    if failed {
                        return Err(RunError::Escalated { signal });
                    }
                }
            }
        }
    }

    /// Exit every handle in reverse acquisition order
    async fn release(&mut self) -> Result<()> {
        let mut failures = Vec::new();
        while let Some(mut handle) = self.handles.pop() {
            let mut exit = handle.resource.exit();
            let outcome = loop {
                tokio::select! {
                    outcome = &mut exit => break outcome,
                    signal = self.signals.recv() => {
                        if self.draining {
                            return Err(RunError::Escalated { signal });
                        }
                        self.draining = true;
                    }
                }
            };
            drop(exit);

            match outcome {
                Ok(()) => tracing::info!(slot = %handle.slot, "Exited resource"),
                Err(error) => {
                    tracing::warn!(slot = %handle.slot, "Failed to exit resource: {:#}", error);
                    failures.push(format!("{}: {:#}", handle.slot, error));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(RunError::Release { failures })
        }
    }
}
