use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::TabellError;
use crate::extraction::TableStrategy;
use crate::model::{AttemptOutcome, RawTable, StrategyAttempt};

/// Ordered extraction strategies; the first non-empty result wins.
pub struct StrategyChain {
    strategies: Vec<Box<dyn TableStrategy>>,
}

/// Result of running a chain over one document.
#[derive(Debug, Clone, Default)]
pub struct ChainOutcome {
    pub tables: Vec<RawTable>,
    /// Label of the strategy that produced `tables`, if any did.
    pub extractor: Option<String>,
    pub attempts: Vec<StrategyAttempt>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn TableStrategy>>) -> Self {
        StrategyChain { strategies }
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn labels(&self) -> Vec<String> {
        self.strategies.iter().map(|s| s.label()).collect()
    }

    /// Try each strategy in order and stop at the first that finds tables.
    ///
    /// Strategy errors and panics are logged and recorded as failed attempts;
    /// they never end the chain. Unavailable strategies are skipped.
    pub fn run(&self, pdf_path: &Path) -> ChainOutcome {
        self.run_filtered(pdf_path, |_| true)
    }

    /// Like [`run`](Self::run), but only tables passing `accept` count. A
    /// strategy whose tables are all rejected is an empty attempt.
    pub fn run_filtered(&self, pdf_path: &Path, accept: impl Fn(&RawTable) -> bool) -> ChainOutcome {
        debug!(strategies = self.len(), "running extraction chain");
        let mut attempts = Vec::new();

        for strategy in &self.strategies {
            let label = strategy.label();

            if !strategy.is_available() {
                debug!(strategy = %label, "strategy unavailable, skipping");
                attempts.push(StrategyAttempt {
                    strategy: label,
                    outcome: AttemptOutcome::Unavailable,
                });
                continue;
            }

            let result = panic::catch_unwind(AssertUnwindSafe(|| strategy.extract(pdf_path)))
                .unwrap_or_else(|payload| {
                    Err(TabellError::Extraction(format!(
                        "strategy panicked: {}",
                        panic_message(payload.as_ref())
                    )))
                });

            match result {
                Ok(tables) => {
                    let found = tables.len();
                    let tables: Vec<RawTable> = tables.into_iter().filter(|t| accept(t)).collect();
                    if tables.is_empty() {
                        debug!(strategy = %label, rejected = found, "strategy found no tables");
                        attempts.push(StrategyAttempt {
                            strategy: label,
                            outcome: AttemptOutcome::Empty,
                        });
                        continue;
                    }
                    debug!(strategy = %label, tables = tables.len(), "strategy found tables");
                    attempts.push(StrategyAttempt {
                        strategy: label.clone(),
                        outcome: AttemptOutcome::Tables {
                            count: tables.len(),
                        },
                    });
                    return ChainOutcome {
                        tables,
                        extractor: Some(label),
                        attempts,
                    };
                }
                Err(e) => {
                    warn!(strategy = %label, error = %e, "strategy failed, trying next");
                    attempts.push(StrategyAttempt {
                        strategy: label,
                        outcome: AttemptOutcome::Failed {
                            reason: e.to_string(),
                        },
                    });
                }
            }
        }

        ChainOutcome {
            tables: Vec::new(),
            extractor: None,
            attempts,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
