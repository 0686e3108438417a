//! Sequential multi-path writes with compensation
//!
//! The store has no multi-path transaction. A saga runs its steps in order;
//! when one fails, the compensations of the steps that already committed
//! run in reverse before the original error is returned. Steps without a
//! compensation are left in place.

use crate::error::ServiceResult;
use crate::metrics::FeedMetrics;
use futures::future::BoxFuture;
use std::future::Future;
use tracing::{debug, error, warn};

type Action = Box<dyn FnOnce() -> BoxFuture<'static, ServiceResult<()>> + Send>;

fn boxed<A, Fut>(action: A) -> Action
where
    A: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ServiceResult<()>> + Send + 'static,
{
    Box::new(move || Box::pin(action()) as BoxFuture<'static, ServiceResult<()>>)
}

struct SagaStep {
    name: &'static str,
    action: Action,
    compensation: Option<Action>,
}

pub struct Saga {
    name: &'static str,
    steps: Vec<SagaStep>,
}

impl Saga {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    /// Add a step that is never undone
    pub fn step<A, Fut>(mut self, name: &'static str, action: A) -> Self
    where
        A: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ServiceResult<()>> + Send + 'static,
    {
        self.steps.push(SagaStep {
            name,
            action: boxed(action),
            compensation: None,
        });
        self
    }

    /// Add a step whose effect `compensation` reverses
    pub fn step_with_compensation<A, Fut, C, CFut>(
        mut self,
        name: &'static str,
        action: A,
        compensation: C,
    ) -> Self
    where
        A: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ServiceResult<()>> + Send + 'static,
        C: FnOnce() -> CFut + Send + 'static,
        CFut: Future<Output = ServiceResult<()>> + Send + 'static,
    {
        self.steps.push(SagaStep {
            name,
            action: boxed(action),
            compensation: Some(boxed(compensation)),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step. Returns the number of steps committed.
    pub async fn run(self) -> ServiceResult<usize> {
        let saga = self.name;
        let mut committed: Vec<(&'static str, Option<Action>)> = Vec::new();

        for step in self.steps {
            match (step.action)().await {
                Ok(()) => {
                    debug!(saga, step = step.name, "Saga step committed");
                    committed.push((step.name, step.compensation));
                }
                Err(e) => {
                    warn!(saga, step = step.name, error = %e, "Saga step failed, compensating");
                    compensate(saga, committed).await;
                    return Err(e);
                }
            }
        }

        Ok(committed.len())
    }
}

async fn compensate(saga: &'static str, committed: Vec<(&'static str, Option<Action>)>) {
    let metrics = FeedMetrics::new();
    for (step, compensation) in committed.into_iter().rev() {
        let Some(compensation) = compensation else {
            continue;
        };
        metrics.record_compensation(saga);
        match compensation().await {
            Ok(()) => debug!(saga, step, "Compensation applied"),
            // Nothing left to try; the store keeps the partial write.
            Err(e) => error!(saga, step, error = %e, "Compensation failed"),
        }
    }
}
