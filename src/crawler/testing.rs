//! Scripted collaborators for driving the crawl loop without a network
//!
//! [`ScriptedSource`] serves fixed pages whose items have a set latency and a
//! set number of failures before they succeed. The publishers record or
//! reject checkpoints.

use crate::checkpoint::{CheckpointError, CheckpointPublisher, CommitStatus};
use crate::crawler::source::{FetchError, ItemDetail, ItemRef, ListingSource, RawPage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One listed item
#[derive(Debug, Clone)]
pub struct ScriptedItem {
    pub key: String,
    pub delay: Duration,
    /// Failed detail attempts before success; `u32::MAX` never succeeds
    pub failures: u32,
}

impl ScriptedItem {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            delay: Duration::ZERO,
            failures: 0,
        }
    }

    pub fn delayed(mut self, millis: u64) -> Self {
        self.delay = Duration::from_millis(millis);
        self
    }

    pub fn failing(mut self, failures: u32) -> Self {
        self.failures = failures;
        self
    }
}

#[derive(Debug, Clone, Default)]
struct ScriptedPage {
    items: Vec<ScriptedItem>,
    /// Failed page fetches before success; `u32::MAX` never succeeds
    failures: u32,
}

/// In-memory listing source
#[derive(Default)]
pub struct ScriptedSource {
    pages: HashMap<u32, ScriptedPage>,
    page_calls: Mutex<Vec<u32>>,
    detail_calls: Mutex<HashMap<String, u32>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: u32, items: Vec<ScriptedItem>) -> Self {
        self.pages.insert(
            page,
            ScriptedPage {
                items,
                failures: 0,
            },
        );
        self
    }

    pub fn with_failing_page(mut self, page: u32, failures: u32, items: Vec<ScriptedItem>) -> Self {
        self.pages.insert(page, ScriptedPage { items, failures });
        self
    }

    /// Every page fetch, in call order
    pub fn page_calls(&self) -> Vec<u32> {
        lock(&self.page_calls).clone()
    }

    /// Detail fetch attempts made for `key`
    pub fn detail_calls(&self, key: &str) -> u32 {
        lock(&self.detail_calls).get(key).copied().unwrap_or(0)
    }

    /// Highest number of detail fetches seen running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn locator(page: u32, key: &str) -> String {
        format!("scripted://{}/{}", page, key)
    }
}

#[async_trait]
impl ListingSource for ScriptedSource {
    async fn fetch_page(&self, page_number: u32) -> Result<RawPage, FetchError> {
        let attempt = {
            let mut calls = lock(&self.page_calls);
            calls.push(page_number);
            calls.iter().filter(|p| **p == page_number).count() as u32
        };

        let failures = self.pages.get(&page_number).map_or(0, |p| p.failures);
        if attempt <= failures {
            return Err(FetchError::Unavailable {
                locator: format!("page {}", page_number),
                reason: format!("scripted failure {}", attempt),
            });
        }

        Ok(RawPage {
            page_number,
            url: format!("scripted://{}", page_number),
            body: String::new(),
        })
    }

    fn extract(&self, page: &RawPage) -> Vec<ItemRef> {
        self.pages
            .get(&page.page_number)
            .map(|script| {
                script
                    .items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| ItemRef {
                        locator: Self::locator(page.page_number, &item.key),
                        page_number: page.page_number,
                        original_index: index,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn fetch_detail(&self, item: &ItemRef) -> Result<ItemDetail, FetchError> {
        let script = self
            .pages
            .get(&item.page_number)
            .and_then(|page| page.items.get(item.original_index))
            .cloned()
            .ok_or_else(|| FetchError::Unavailable {
                locator: item.locator.clone(),
                reason: "not scripted".to_string(),
            })?;

        let attempt = {
            let mut calls = lock(&self.detail_calls);
            let count = calls.entry(script.key.clone()).or_insert(0);
            *count += 1;
            *count
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(script.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if attempt <= script.failures {
            return Err(FetchError::Unavailable {
                locator: item.locator.clone(),
                reason: format!("scripted failure {}", attempt),
            });
        }

        Ok(ItemDetail {
            item_key: script.key.clone(),
            title: Some(format!("Item {}", script.key)),
            size_label: Some("1 GB".to_string()),
            category: None,
            magnet_link: Some(format!("magnet:?xt=urn:btih:{}", script.key)),
        })
    }
}

/// Checkpoint publisher that records every label it commits
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    labels: Arc<Mutex<Vec<String>>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<String> {
        lock(&self.labels).clone()
    }
}

#[async_trait]
impl CheckpointPublisher for RecordingPublisher {
    async fn sync(&self) -> Result<(), CheckpointError> {
        Ok(())
    }

    async fn commit(
        &self,
        _artifacts: &[PathBuf],
        label: &str,
    ) -> Result<CommitStatus, CheckpointError> {
        lock(&self.labels).push(label.to_string());
        Ok(CommitStatus::Committed)
    }

    async fn publish(&self) -> Result<(), CheckpointError> {
        Ok(())
    }
}

/// Checkpoint publisher whose commit always fails
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectingPublisher;

#[async_trait]
impl CheckpointPublisher for RejectingPublisher {
    async fn sync(&self) -> Result<(), CheckpointError> {
        Ok(())
    }

    async fn commit(
        &self,
        _artifacts: &[PathBuf],
        _label: &str,
    ) -> Result<CommitStatus, CheckpointError> {
        Err(CheckpointError::CommandFailed {
            command: "git commit".to_string(),
            status: 128,
            stderr: "fatal: unable to auto-detect email address".to_string(),
        })
    }

    async fn publish(&self) -> Result<(), CheckpointError> {
        Ok(())
    }
}
