//! Concurrent batch execution with per-item isolation.
//!
//! One task per item, supervised by a detached task owning the join set.
//! Outcomes stream back over a channel in completion order, each tagged with
//! its input index; one item failing never affects its siblings. Dropping
//! the receiver aborts every outstanding task, so nothing leaks.

use crate::{entity::Entity, error::Error, row::Row, table::Table};
use std::{collections::HashMap, future::Future};
use tokio::{sync::mpsc, task::JoinSet};

///
/// TaskOutcome
///
/// One item's result, tagged with its position in the input batch.
///

#[derive(Debug)]
pub struct TaskOutcome<R> {
    pub index: usize,
    pub result: Result<R, Error>,
}

/// Run `op` over every item concurrently.
///
/// The returned receiver yields outcomes in completion order. A panicking
/// or cancelled task surfaces as `Error::Task` for its index only.
pub fn batch_apply<T, R, F, Fut>(items: Vec<T>, op: F) -> mpsc::Receiver<TaskOutcome<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(items.len().max(1));

    tokio::spawn(async move {
        let mut set = JoinSet::new();
        let mut indexes = HashMap::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let handle = set.spawn(op(item));
            indexes.insert(handle.id(), index);
        }

        while let Some(joined) = set.join_next_with_id().await {
            let outcome = match joined {
                Ok((id, result)) => TaskOutcome {
                    index: indexes.get(&id).copied().unwrap_or_default(),
                    result,
                },
                Err(err) => TaskOutcome {
                    index: indexes.get(&err.id()).copied().unwrap_or_default(),
                    result: Err(Error::Task(err.to_string())),
                },
            };
            if tx.send(outcome).await.is_err() {
                // Receiver gone; dropping the set aborts the remainder.
                break;
            }
        }
    });

    rx
}

/// Drain a batch channel into input order.
async fn collect_ordered<R>(
    mut rx: mpsc::Receiver<TaskOutcome<R>>,
    len: usize,
) -> Vec<Result<R, Error>> {
    let mut slots: Vec<Option<Result<R, Error>>> = (0..len).map(|_| None).collect();
    while let Some(outcome) = rx.recv().await {
        if let Some(slot) = slots.get_mut(outcome.index) {
            *slot = Some(outcome.result);
        }
    }
    slots
        .into_iter()
        .map(|slot| slot.unwrap_or_else(|| Err(Error::Task("task produced no result".to_string()))))
        .collect()
}

impl Table {
    /// Fetch every object concurrently, in place of its input.
    ///
    /// Results come back in input order; each element is independently a
    /// loaded object or that item's own error.
    pub async fn batch_get<T: Entity + 'static>(&self, objects: Vec<T>) -> Vec<Result<T, Error>> {
        let len = objects.len();
        let table = self.clone();
        let rx = batch_apply(objects, move |mut object| {
            let table = table.clone();
            async move {
                table.get_entity(&mut object).await?;
                Ok(object)
            }
        });
        collect_ordered(rx, len).await
    }

    /// Write every object concurrently. Each element of the result is the
    /// previously stored object for that key, if any.
    pub async fn batch_put<T: Entity + 'static>(
        &self,
        objects: Vec<T>,
    ) -> Vec<Result<Option<T>, Error>> {
        let len = objects.len();
        let table = self.clone();
        let rx = batch_apply(objects, move |object| {
            let table = table.clone();
            async move { table.put(&mut Row::new(object)).await }
        });
        collect_ordered(rx, len).await
    }

    /// Delete every object concurrently, returning the removed objects.
    pub async fn batch_delete<T: Entity + 'static>(
        &self,
        objects: Vec<T>,
    ) -> Vec<Result<Option<T>, Error>> {
        let len = objects.len();
        let table = self.clone();
        let rx = batch_apply(objects, move |object| {
            let table = table.clone();
            async move { table.delete(&mut Row::new(object)).await }
        });
        collect_ordered(rx, len).await
    }
}

///
/// TESTS
///
