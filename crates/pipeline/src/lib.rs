//! Freight Pipeline - The source-to-destination driver
//!
//! Wires sources to destinations and supervises the whole assembly as
//! independent legs:
//!
//! ```text
//! [Source.run]──┐
//! [pump loop]───┼── JoinSet ── first failure cancels the rest
//! [Dest.run]────┘
//! ```
//!
//! The pump loop receives `(message, ack)` pairs from a source and hands
//! each message to every destination. The source's ack is wrapped in a
//! shared countdown [`Ack`] so it fires only once every destination has
//! confirmed delivery.
//!
//! A leg that dies fatally never disappears silently: the failure is
//! logged at error level and becomes [`run`](Pipeline::run)'s return
//! value, so it reaches the process supervisor.

mod error;

pub use error::{PipelineError, Result};

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use freight_protocol::{is_cancelled, Ack, AckFn, BoxError, Destination, MsgAck, Source};

/// A named source
type SourceLeg<T> = (String, Arc<dyn Source<T>>);

/// A named destination
type DestinationLeg<T> = (String, Arc<dyn Destination<T>>);

/// One or more sources fanned out to one or more destinations
pub struct Pipeline<T> {
    sources: Vec<SourceLeg<T>>,
    destinations: Vec<DestinationLeg<T>>,
}

impl<T> std::fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("sources", &self.sources.len())
            .field("destinations", &self.destinations.len())
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> Pipeline<T> {
    /// Start building a pipeline
    pub fn builder() -> PipelineBuilder<T> {
        PipelineBuilder {
            sources: Vec::new(),
            destinations: Vec::new(),
        }
    }

    /// Run every leg until cancellation or the first fatal failure
    ///
    /// Returns `Ok(())` on clean shutdown. The first leg failure cancels
    /// the remaining legs and is returned once they have wound down.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let leg_cancel = cancel.child_token();
        let mut legs: JoinSet<(String, std::result::Result<(), BoxError>)> = JoinSet::new();

        for (name, destination) in &self.destinations {
            let leg = format!("destination:{name}");
            let destination = destination.clone();
            let token = leg_cancel.clone();
            legs.spawn(async move {
                let result = destination.run(token).await;
                (leg, result)
            });
        }

        for (name, source) in &self.sources {
            let leg = format!("source:{name}");
            let source_run = source.clone();
            let token = leg_cancel.clone();
            legs.spawn(async move {
                let result = source_run.run(token).await;
                (leg, result)
            });

            let leg = format!("pump:{name}");
            let source = source.clone();
            let destinations = self.destinations.clone();
            let token = leg_cancel.clone();
            legs.spawn(async move {
                let result = pump(source, destinations, token).await;
                (leg, result)
            });
        }

        let mut first_failure: Option<PipelineError> = None;
        while let Some(joined) = legs.join_next().await {
            let (leg, result) = match joined {
                Ok(finished) => finished,
                Err(join_err) => (
                    "task".to_string(),
                    Err(format!("pipeline leg panicked: {join_err}").into()),
                ),
            };
            match result {
                Ok(()) => debug!(leg, "pipeline leg finished"),
                Err(err) if leg_cancel.is_cancelled() || is_cancelled(&err) => {
                    debug!(leg, "pipeline leg stopped on cancellation");
                }
                Err(err) => {
                    error!(leg, error = %err, "pipeline leg failed");
                    if first_failure.is_none() {
                        first_failure = Some(PipelineError::leg(leg, err));
                    }
                    leg_cancel.cancel();
                }
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Receive from one source and fan each message out to every destination
async fn pump<T: Clone + Send + Sync + 'static>(
    source: Arc<dyn Source<T>>,
    destinations: Vec<DestinationLeg<T>>,
    cancel: CancellationToken,
) -> std::result::Result<(), BoxError> {
    loop {
        let MsgAck { msg, ack } = match source.recv(&cancel).await {
            Ok(pair) => pair,
            Err(err) if cancel.is_cancelled() || is_cancelled(&err) => return Ok(()),
            Err(err) => return Err(err),
        };

        // The upstream ack fires only once every destination confirms.
        let shared = Ack::shared(ack, destinations.len());
        for (_, destination) in &destinations {
            let handle = shared.clone();
            let confirm: AckFn = Box::new(move || handle.complete_one());
            match destination
                .send(&cancel, Some(confirm), vec![msg.clone()])
                .await
            {
                Ok(()) => {}
                Err(err) if cancel.is_cancelled() || is_cancelled(&err) => return Ok(()),
                Err(err) => return Err(err),
            }
        }
    }
}

/// Builder for [`Pipeline`]
pub struct PipelineBuilder<T> {
    sources: Vec<SourceLeg<T>>,
    destinations: Vec<DestinationLeg<T>>,
}

impl<T: Clone + Send + Sync + 'static> PipelineBuilder<T> {
    /// Add a named source
    #[must_use]
    pub fn source(mut self, name: impl Into<String>, source: Arc<dyn Source<T>>) -> Self {
        self.sources.push((name.into(), source));
        self
    }

    /// Add a named destination
    #[must_use]
    pub fn destination(
        mut self,
        name: impl Into<String>,
        destination: Arc<dyn Destination<T>>,
    ) -> Self {
        self.destinations.push((name.into(), destination));
        self
    }

    /// Validate and build
    pub fn build(self) -> Result<Pipeline<T>> {
        if self.sources.is_empty() {
            return Err(PipelineError::NoSources);
        }
        if self.destinations.is_empty() {
            return Err(PipelineError::NoDestinations);
        }
        Ok(Pipeline {
            sources: self.sources,
            destinations: self.destinations,
        })
    }
}

#[cfg(test)]
mod pipeline_test;
