//! Splitting of oversized writes into sequential batches.
//!
//! A write is split when its estimated wire size exceeds the working
//! threshold, or when it carries more records than one request may hold.
//! Size-based batches that still hold too many records are split again into
//! sub-batches. Requests go out one at a time, in order, and the decoded
//! records of each are appended to the result.

use std::fmt;

use serde_json::Value;

use crate::config::Limits;
use crate::dispatch::Dispatcher;
use crate::endpoint::Endpoint;
use crate::split::{split_by_chunk_size, split_into_n_parts};
use crate::types::{Method, Params};
use crate::Error;

/// Position of one request within a split write. Used for logging and error
/// reporting only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchDescriptor {
    /// 1-indexed batch number.
    pub batch_no: usize,
    pub batch_count: usize,
    /// 1-indexed sub-batch number and count, when the batch was split again.
    pub sub_batch: Option<(usize, usize)>,
}

impl fmt::Display for BatchDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch {}/{}", self.batch_no, self.batch_count)?;
        if let Some((no, count)) = self.sub_batch {
            write!(f, " (sub-batch {}/{})", no, count)?;
        }
        Ok(())
    }
}

/// How a write will be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPlan {
    /// One request carrying the whole body.
    Single,
    /// Fixed-size chunks of `max_elements_per_request` records.
    ByCount,
    /// `batch_count` near-equal parts, each chunked further if still too long.
    BySize { batch_count: usize },
}

/// Size the service is expected to account for, given the local encoding.
pub fn estimate_bytes(encoded_len: usize, limits: &Limits) -> f64 {
    encoded_len as f64 * limits.size_inflation_factor
}

/// Chooses how to send `record_count` records whose estimated size is
/// `estimated_bytes`.
pub fn plan_batches(record_count: usize, estimated_bytes: f64, limits: &Limits) -> BatchPlan {
    let threshold = limits.payload_threshold_bytes as f64;
    if estimated_bytes > threshold {
        let batch_count = (estimated_bytes / threshold).ceil() as usize;
        BatchPlan::BySize {
            batch_count: batch_count.clamp(1, record_count.max(1)),
        }
    } else if record_count > limits.max_elements_per_request {
        BatchPlan::ByCount
    } else {
        BatchPlan::Single
    }
}

/// One request's share of a split write.
#[derive(Debug, PartialEq)]
pub struct Partition<'a, T> {
    pub descriptor: BatchDescriptor,
    pub records: &'a [T],
}

/// Lays `records` out into the requests described by `plan`, in send order.
pub fn partition<'a, T>(
    records: &'a [T],
    plan: BatchPlan,
    limits: &Limits,
) -> Vec<Partition<'a, T>> {
    let max = limits.max_elements_per_request;
    match plan {
        BatchPlan::Single => vec![Partition {
            descriptor: BatchDescriptor {
                batch_no: 1,
                batch_count: 1,
                sub_batch: None,
            },
            records,
        }],
        BatchPlan::ByCount => {
            let chunks = split_by_chunk_size(records, max);
            let batch_count = chunks.len();
            chunks
                .into_iter()
                .enumerate()
                .map(|(i, records)| Partition {
                    descriptor: BatchDescriptor {
                        batch_no: i + 1,
                        batch_count,
                        sub_batch: None,
                    },
                    records,
                })
                .collect()
        }
        BatchPlan::BySize { batch_count } => {
            let parts = split_into_n_parts(records, batch_count);
            let batch_count = parts.len();
            let mut out = Vec::new();
            for (i, part) in parts.into_iter().enumerate() {
                if part.len() <= max {
                    out.push(Partition {
                        descriptor: BatchDescriptor {
                            batch_no: i + 1,
                            batch_count,
                            sub_batch: None,
                        },
                        records: part,
                    });
                    continue;
                }
                let subs = split_by_chunk_size(part, max);
                let sub_count = subs.len();
                for (j, records) in subs.into_iter().enumerate() {
                    out.push(Partition {
                        descriptor: BatchDescriptor {
                            batch_no: i + 1,
                            batch_count,
                            sub_batch: Some((j + 1, sub_count)),
                        },
                        records,
                    });
                }
            }
            out
        }
    }
}

/// Sends writes, splitting them when they exceed the service budgets.
pub(crate) struct BatchPlanner<'a> {
    dispatcher: &'a Dispatcher,
    limits: &'a Limits,
}

impl<'a> BatchPlanner<'a> {
    pub(crate) fn new(dispatcher: &'a Dispatcher, limits: &'a Limits) -> Self {
        Self { dispatcher, limits }
    }

    /// Writes `records` and returns the records the service echoed back,
    /// concatenated in request order.
    ///
    /// Requests already accepted when a later one fails stay committed on the
    /// remote side; the failure is reported as
    /// [`Error::PartialBatchFailure`] whenever more than one request was planned.
    pub(crate) async fn send(
        &self,
        method: Method,
        endpoint: &Endpoint,
        records: &[Value],
        params: Option<&Params>,
    ) -> Result<Vec<Value>, Error> {
        let resource = endpoint.resource();
        let url = endpoint.url(params, None);
        let encoded = self.dispatcher.codec().encode(resource, records)?;
        let estimated = estimate_bytes(encoded.len(), self.limits);
        let plan = plan_batches(records.len(), estimated, self.limits);

        if plan == BatchPlan::Single {
            let payload = self
                .dispatcher
                .dispatch(method, url, Some(encoded), None)
                .await?;
            return Ok(payload.into_records(resource));
        }
        drop(encoded);

        let partitions = partition(records, plan, self.limits);
        let total = partitions.len();
        tracing::info!(
            "Splitting {} {} records (~{:.0} bytes estimated) into {} requests",
            records.len(),
            resource,
            estimated,
            total
        );

        let mut aggregate = Vec::with_capacity(records.len());
        for (completed, part) in partitions.into_iter().enumerate() {
            match self.send_one(method, endpoint, &url, &part).await {
                Ok(echoed) => aggregate.extend(echoed),
                Err(e) if total == 1 => return Err(e),
                Err(e) => {
                    tracing::error!(
                        "{} {} failed after {}/{} requests succeeded (not rolled back): {}",
                        resource,
                        part.descriptor,
                        completed,
                        total,
                        e
                    );
                    return Err(Error::PartialBatchFailure {
                        completed,
                        total,
                        failed: part.descriptor,
                        source: Box::new(e),
                    });
                }
            }
        }
        Ok(aggregate)
    }

    async fn send_one(
        &self,
        method: Method,
        endpoint: &Endpoint,
        url: &url::Url,
        part: &Partition<'_, Value>,
    ) -> Result<Vec<Value>, Error> {
        let body = self
            .dispatcher
            .codec()
            .encode(endpoint.resource(), part.records)?;
        let payload = self
            .dispatcher
            .dispatch(method, url.clone(), Some(body), Some(&part.descriptor))
            .await?;
        Ok(payload.into_records(endpoint.resource()))
    }
}
