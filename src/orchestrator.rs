//! # Orchestrator Module
//!
//! Drives one research request from query to terminal event:
//!
//! 1. resolve the strategy for the query's mode
//! 2. emit a `searching` event naming the source class
//! 3. build the strategy with the request's progress emitter and run it
//! 4. emit `research` + `complete` on success, or `error` on failure
//!
//! The orchestrator never retries. Strategy errors are turned into the
//! terminal event here and go no further.

use std::sync::Arc;

use tracing::{info, warn};

use crate::artifact::ResearchQuery;
use crate::progress::{EventReceiver, ProgressChannel, ProgressEvent, Stage};
use crate::strategy::StrategyTable;

pub struct Orchestrator {
    strategies: StrategyTable,
}

impl Orchestrator {
    pub fn new(strategies: StrategyTable) -> Self {
        Self { strategies }
    }

    /// Run one request to completion, terminating `channel` exactly once.
    pub async fn run(&self, query: ResearchQuery, channel: ProgressChannel) {
        let factory = self.strategies.resolve(query.mode);
        info!(mode = query.mode.as_str(), strategy = factory.name(), "Dispatching research");

        channel.emit(ProgressEvent::new(
            Stage::Searching,
            format!("Searching {} for \"{}\"", query.mode.source_label(), query.text),
        ));

        let strategy = factory.build(channel.emitter());
        let outcome = strategy.research(&query.text).await;
        drop(strategy);

        match outcome {
            Ok(artifact) => {
                info!(mode = query.mode.as_str(), "Research succeeded");
                channel.complete(artifact);
            }
            Err(e) => {
                warn!(mode = query.mode.as_str(), error = %e, "Research failed");
                channel.fail(e.to_string());
            }
        }
    }

    /// Start a request on its own task and return the event stream.
    ///
    /// The task is not cancelled if the receiver is dropped; the strategy
    /// runs to completion and its events are discarded.
    pub fn spawn(self: Arc<Self>, query: ResearchQuery) -> EventReceiver {
        let (channel, receiver) = ProgressChannel::open();
        tokio::spawn(async move {
            self.run(query, channel).await;
        });
        receiver
    }
}
