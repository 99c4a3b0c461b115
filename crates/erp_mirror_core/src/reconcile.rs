//! Upstream-to-local reconciliation ("seeding").
//!
//! For each collection: page through the upstream endpoint in increasing
//! `$skip` order and upsert every record by its natural key. One bad record
//! never stops the page; one failed page fetch stops only its collection.
//! Documents missing from the upstream are never deleted.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::catalog::CollectionDescriptor;
use crate::error::Result;
use crate::ports::{
    DocumentStore, SessionCredential, SessionProvider, UpsertOutcome, UpstreamCredentials,
    UpstreamFetcher,
};
use crate::record::{NaturalKey, Record};
use crate::schema::ValidationMode;

pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_MAX_PAGES: u64 = 10_000;

#[derive(Debug, Clone, Copy)]
pub struct ReconcileOptions {
    /// Records per upstream request, unless the collection overrides it.
    pub page_size: u32,
    /// Upper bound on non-empty pages per collection.
    pub max_pages: u64,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CollectionOutcome {
    /// An empty page was reached.
    Completed,
    /// A page fetch failed; remaining pages were not attempted.
    Aborted { error: String },
    PageLimitReached,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionReport {
    pub collection: &'static str,
    pub pages: u64,
    pub fetched: u64,
    pub inserted: u64,
    pub updated: u64,
    pub failed: u64,
    pub outcome: CollectionOutcome,
}

impl CollectionReport {
    fn new(collection: &'static str) -> Self {
        Self {
            collection,
            pages: 0,
            fetched: 0,
            inserted: 0,
            updated: 0,
            failed: 0,
            outcome: CollectionOutcome::Completed,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub collections: Vec<CollectionReport>,
}

impl RunReport {
    /// True when every collection completed and no record failed.
    pub fn is_clean(&self) -> bool {
        self.collections
            .iter()
            .all(|c| c.outcome == CollectionOutcome::Completed && c.failed == 0)
    }

    pub fn report_for(&self, collection: &str) -> Option<&CollectionReport> {
        self.collections.iter().find(|c| c.collection == collection)
    }
}

pub struct Reconciler {
    sessions: Arc<dyn SessionProvider>,
    fetcher: Arc<dyn UpstreamFetcher>,
    store: Arc<dyn DocumentStore>,
    options: ReconcileOptions,
    cancel: CancellationToken,
}

impl Reconciler {
    pub fn new(
        sessions: Arc<dyn SessionProvider>,
        fetcher: Arc<dyn UpstreamFetcher>,
        store: Arc<dyn DocumentStore>,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            sessions,
            fetcher,
            store,
            options,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run one reconciliation over `collections`, in the given order.
    ///
    /// Fails only if the initial login fails. Everything after that is
    /// reported per collection.
    pub async fn run(
        &self,
        credentials: &UpstreamCredentials,
        collections: &[&'static CollectionDescriptor],
    ) -> Result<RunReport> {
        let mut session = self.sessions.authenticate(credentials).await?;
        tracing::info!(collections = collections.len(), "upstream session acquired");

        let mut report = RunReport::default();
        for &desc in collections {
            let collection_report = if self.cancel.is_cancelled() {
                let mut skipped = CollectionReport::new(desc.name);
                skipped.outcome = CollectionOutcome::Cancelled;
                skipped
            } else {
                self.reconcile_collection(desc, credentials, &mut session)
                    .await
            };

            tracing::info!(
                collection = desc.name,
                pages = collection_report.pages,
                fetched = collection_report.fetched,
                inserted = collection_report.inserted,
                updated = collection_report.updated,
                failed = collection_report.failed,
                outcome = ?collection_report.outcome,
                "{} sync finished",
                desc.label
            );
            report.collections.push(collection_report);
        }
        Ok(report)
    }

    async fn reconcile_collection(
        &self,
        desc: &'static CollectionDescriptor,
        credentials: &UpstreamCredentials,
        session: &mut SessionCredential,
    ) -> CollectionReport {
        let mut report = CollectionReport::new(desc.name);
        let page_size = desc
            .upstream
            .page_size
            .unwrap_or(self.options.page_size)
            .max(1);
        let mut skip: u64 = 0;

        loop {
            if self.cancel.is_cancelled() {
                report.outcome = CollectionOutcome::Cancelled;
                break;
            }
            if report.pages >= self.options.max_pages {
                tracing::warn!(
                    collection = desc.name,
                    max_pages = self.options.max_pages,
                    "page limit reached, stopping"
                );
                report.outcome = CollectionOutcome::PageLimitReached;
                break;
            }

            let endpoint = desc.upstream.page_path(skip, page_size);
            let page = match self.fetch_page(&endpoint, credentials, session).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(collection = desc.name, %endpoint, error = %e, "page fetch failed, aborting collection");
                    report.outcome = CollectionOutcome::Aborted {
                        error: e.to_string(),
                    };
                    break;
                }
            };

            if page.is_empty() {
                report.outcome = CollectionOutcome::Completed;
                break;
            }
            report.pages += 1;
            tracing::debug!(collection = desc.name, skip, records = page.len(), "page fetched");

            for record in extract_records(desc, page) {
                report.fetched += 1;
                let key = record
                    .get(desc.natural_key)
                    .and_then(NaturalKey::from_value)
                    .map(|k| k.to_string())
                    .unwrap_or_else(|| "<missing>".to_string());
                match self.upsert_record(desc, record).await {
                    Ok(UpsertOutcome::Inserted(_)) => report.inserted += 1,
                    Ok(UpsertOutcome::Updated(_)) => report.updated += 1,
                    Err(e) => {
                        tracing::warn!(collection = desc.name, %key, error = %e, "record upsert failed");
                        report.failed += 1;
                    }
                }
            }

            skip += u64::from(page_size);
        }

        report
    }

    /// Fetch one page. An upstream 401 triggers one re-login and one retry.
    async fn fetch_page(
        &self,
        endpoint: &str,
        credentials: &UpstreamCredentials,
        session: &mut SessionCredential,
    ) -> Result<Vec<Record>> {
        match self.fetcher.fetch(session, endpoint).await {
            Err(e) if e.is_upstream_unauthorized() => {
                tracing::warn!(%endpoint, "upstream session rejected, re-authenticating");
                *session = self.sessions.authenticate(credentials).await?;
                self.fetcher.fetch(session, endpoint).await
            }
            other => other,
        }
    }

    async fn upsert_record(
        &self,
        desc: &'static CollectionDescriptor,
        raw: Record,
    ) -> Result<UpsertOutcome> {
        let fields = desc.schema.validate(&Value::Object(raw), ValidationMode::Upsert)?;
        let key = NaturalKey::from_record(&fields, desc.natural_key)?;
        self.store.upsert_by_key(desc, &key, fields).await
    }
}

/// Records to upsert from one upstream page. For nested collections each
/// parent contributes the elements of its nested array.
fn extract_records(desc: &CollectionDescriptor, page: Vec<Record>) -> Vec<Record> {
    let Some(nested) = desc.upstream.nested else {
        return page;
    };
    page.into_iter()
        .filter_map(|mut parent| parent.remove(nested))
        .flat_map(|children| match children {
            Value::Array(items) => items,
            _ => Vec::new(),
        })
        .filter_map(|child| match child {
            Value::Object(record) => Some(record),
            _ => None,
        })
        .collect()
}
