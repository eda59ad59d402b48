//! CouchDB-backed record store.
//!
//! Documents are keyed `record::<game id>` and written whole; partial updates
//! are merged client-side against the freshest read and pushed back under the
//! document's `_rev`, so CouchDB's optimistic concurrency turns every merge
//! into a bounded retry loop and every conditional write into a real
//! compare-and-set. Subscriptions longpoll the `_changes` feed.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde_json::{from_value, json};
use tokio::{sync::watch, time::sleep};
use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::{StorageError, StorageResult},
    dao::record_store::{ConditionalWrite, RecordPredicate, RecordStore},
    state::record::{GameRecord, GameStatus, RecordPatch},
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, ChangesResponse, CouchRecordDocument, END_SUFFIX, RECORD_PREFIX,
        record_doc_id, sequence_token,
    },
};

/// Give up a contended merge after this many optimistic retries.
const MAX_WRITE_ATTEMPTS: u32 = 5;
/// Server-side longpoll timeout for `_changes` subscriptions.
const CHANGES_TIMEOUT_MS: u64 = 30_000;
/// Pause before re-polling `_changes` after a transport error.
const CHANGES_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Record store backed by a CouchDB database.
#[derive(Clone)]
pub struct CouchRecordStore {
    client: Client,
    base_url: Arc<str>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchRecordStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let base_url = Arc::<str>::from(config.base_url.trim_end_matches('/'));
        let database = Arc::<str>::from(config.database);
        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        let store = Self {
            client,
            base_url,
            database,
            auth,
        };

        store.ensure_database().await?;
        Ok(store)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, self.database, path);
        let builder = self.client.request(method, url);
        if let Some((ref user, ref pass)) = self.auth {
            builder.basic_auth(user.as_ref(), Some(pass.as_ref()))
        } else {
            builder
        }
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = format!("{}/{}", self.base_url, self.database);
        let mut builder = self.client.get(&url);
        if let Some((ref user, ref pass)) = self.auth {
            builder = builder.basic_auth(user.as_ref(), Some(pass.as_ref()));
        }

        let response = builder
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let mut builder = self.client.put(&url);
                if let Some((ref user, ref pass)) = self.auth {
                    builder = builder.basic_auth(user.as_ref(), Some(pass.as_ref()));
                }
                let create =
                    builder
                        .send()
                        .await
                        .map_err(|source| CouchDaoError::DatabaseQuery {
                            database: database.clone(),
                            source,
                        })?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document(&self, doc_id: &str) -> CouchResult<Option<CouchRecordDocument>> {
        let response = self.request(Method::GET, doc_id).send().await.map_err(
            |source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            },
        )?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<CouchRecordDocument>()
                .await
                .map(Some)
                .map_err(|source| CouchDaoError::DecodeResponse {
                    path: doc_id.to_string(),
                    source,
                }),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    /// Write a document; `Ok(false)` signals a `_rev` conflict the caller may
    /// retry against a fresh read.
    async fn put_document(&self, doc: &CouchRecordDocument) -> CouchResult<bool> {
        let response = self
            .request(Method::PUT, &doc.id)
            .json(doc)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc.id.clone(),
                source,
            })?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::CONFLICT => Ok(false),
            other => Err(CouchDaoError::RequestStatus {
                path: doc.id.clone(),
                status: other,
            }),
        }
    }

    async fn list_records(&self) -> CouchResult<Vec<GameRecord>> {
        const ALL_DOCS: &str = "_all_docs";
        let query = [
            ("include_docs", "true".to_string()),
            ("startkey", format!("\"{RECORD_PREFIX}\"")),
            ("endkey", format!("\"{RECORD_PREFIX}{END_SUFFIX}\"")),
        ];

        let response = self
            .request(Method::GET, ALL_DOCS)
            .query(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: ALL_DOCS.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: ALL_DOCS.to_string(),
                status: response.status(),
            });
        }

        let payload = response.json::<AllDocsResponse>().await.map_err(|source| {
            CouchDaoError::DecodeResponse {
                path: ALL_DOCS.to_string(),
                source,
            }
        })?;

        let mut records = Vec::new();
        for row in payload.rows {
            if let Some(doc) = row.doc {
                let parsed: CouchRecordDocument =
                    from_value(doc).map_err(|source| CouchDaoError::DeserializeValue {
                        path: ALL_DOCS.to_string(),
                        source,
                    })?;
                records.push(parsed.record);
            }
        }

        Ok(records)
    }

    /// Optimistic merge loop shared by `update` and `update_if`.
    async fn merge_document(
        &self,
        id: Uuid,
        predicate: Option<RecordPredicate>,
        patch: RecordPatch,
    ) -> StorageResult<ConditionalWrite> {
        let doc_id = record_doc_id(id);

        for _ in 0..MAX_WRITE_ATTEMPTS {
            let Some(mut doc) = self
                .get_document(&doc_id)
                .await
                .map_err(couch_unavailable)?
            else {
                return Ok(ConditionalWrite::Missing);
            };

            if let Some(predicate) = &predicate {
                if !predicate(&doc.record) {
                    return Ok(ConditionalWrite::Rejected);
                }
            }

            doc.record.apply(patch.clone());
            if self.put_document(&doc).await.map_err(couch_unavailable)? {
                return Ok(ConditionalWrite::Applied);
            }
            // Lost the revision race; re-read and try again.
        }

        Err(StorageError::Contention {
            path: doc_id,
            attempts: MAX_WRITE_ATTEMPTS,
        })
    }

    async fn poll_changes(
        &self,
        doc_id: &str,
        since: &str,
    ) -> CouchResult<(Vec<GameRecord>, String)> {
        let path = format!(
            "_changes?feed=longpoll&include_docs=true&filter=_doc_ids&since={since}&timeout={CHANGES_TIMEOUT_MS}"
        );

        let response = self
            .request(Method::POST, &path)
            .json(&json!({ "doc_ids": [doc_id] }))
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: path.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path,
                status: response.status(),
            });
        }

        let payload = response.json::<ChangesResponse>().await.map_err(|source| {
            CouchDaoError::DecodeResponse {
                path: path.clone(),
                source,
            }
        })?;

        let mut records = Vec::new();
        for row in payload.results {
            if let Some(doc) = row.doc {
                let parsed: CouchRecordDocument =
                    from_value(doc).map_err(|source| CouchDaoError::DeserializeValue {
                        path: path.clone(),
                        source,
                    })?;
                records.push(parsed.record);
            }
        }

        Ok((records, sequence_token(&payload.last_seq)))
    }

    /// Forward `_changes` rows into the subscription channel until every
    /// receiver is gone.
    async fn follow_changes(self, doc_id: String, publisher: watch::Sender<GameRecord>) {
        let mut since = "now".to_string();

        loop {
            if publisher.is_closed() {
                break;
            }

            match self.poll_changes(&doc_id, &since).await {
                Ok((records, last_seq)) => {
                    since = last_seq;
                    for record in records {
                        if publisher.send(record).is_err() {
                            return;
                        }
                    }
                }
                Err(err) => {
                    warn!(doc_id, error = %err, "changes poll failed; retrying");
                    sleep(CHANGES_RETRY_DELAY).await;
                }
            }
        }
    }
}

fn couch_unavailable(err: CouchDaoError) -> StorageError {
    StorageError::unavailable("CouchDB request failed".into(), err)
}

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        couch_unavailable(err)
    }
}

impl RecordStore for CouchRecordStore {
    fn create(&self, record: GameRecord) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = CouchRecordDocument::new(record, None);
            if store.put_document(&doc).await.map_err(couch_unavailable)? {
                Ok(())
            } else {
                // A fresh UUID colliding means a duplicate create; surface it.
                Err(StorageError::Contention {
                    path: doc.id,
                    attempts: 1,
                })
            }
        })
    }

    fn read(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameRecord>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc = store.get_document(&record_doc_id(id)).await?;
            Ok(doc.map(|doc| doc.record))
        })
    }

    fn find_by_code(&self, code: String) -> BoxFuture<'static, StorageResult<Option<GameRecord>>> {
        let store = self.clone();
        Box::pin(async move {
            let records = store.list_records().await?;
            Ok(records
                .into_iter()
                .find(|record| record.code == code && record.status != GameStatus::Finished))
        })
    }

    fn update(&self, id: Uuid, patch: RecordPatch) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let outcome = store.merge_document(id, None, patch).await?;
            Ok(outcome == ConditionalWrite::Applied)
        })
    }

    fn update_if(
        &self,
        id: Uuid,
        predicate: RecordPredicate,
        patch: RecordPatch,
    ) -> BoxFuture<'static, StorageResult<ConditionalWrite>> {
        let store = self.clone();
        Box::pin(async move { store.merge_document(id, Some(predicate), patch).await })
    }

    fn subscribe(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<watch::Receiver<GameRecord>>>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = record_doc_id(id);
            let Some(doc) = store.get_document(&doc_id).await? else {
                return Ok(None);
            };

            let (publisher, receiver) = watch::channel(doc.record);
            tokio::spawn(store.follow_changes(doc_id, publisher));
            Ok(Some(receiver))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = format!("{}/{}", store.base_url, store.database);
            let mut builder = store.client.get(&url);
            if let Some((ref user, ref pass)) = store.auth {
                builder = builder.basic_auth(user.as_ref(), Some(pass.as_ref()));
            }

            let response = builder
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: url.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path: url,
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
