//! Product entitlement checks.

use std::sync::Arc;
use std::time::Duration;

use account_sdk_core::EntitlementRecord;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::cache::TtlCache;
use crate::config::{SdkConfig, Transports};
use crate::error::{AccessFetchError, Result, SdkError};
use crate::events::{EventEmitter, ListenerId, MonetizationEvent, MonetizationPayload};
use crate::platform::Platform;
use crate::transport::{QueryParams, Transport};
use crate::urls::UrlBuilder;

/// Entitlement client.
#[derive(Clone)]
pub struct Monetization {
    inner: Arc<MonetizationInner>,
}

struct MonetizationInner {
    entitlements: Option<Arc<dyn Transport>>,
    urls: UrlBuilder,
    cache: TtlCache,
    events: EventEmitter<MonetizationEvent, MonetizationPayload>,
}

impl Monetization {
    /// Create a client over the given transports.
    ///
    /// Without an entitlement transport, [`has_access`](Self::has_access)
    /// fails with `SdkError::NotConfigured`.
    #[must_use]
    pub fn new(config: &SdkConfig, transports: &Transports, platform: &Platform) -> Self {
        let urls = UrlBuilder::new(
            Arc::clone(&transports.identity),
            Arc::clone(&transports.oauth),
            config.redirect_uri.clone(),
        );
        let cache = platform
            .storage
            .clone()
            .map_or_else(TtlCache::detached, TtlCache::new)
            .with_clock(Arc::clone(&platform.clock));

        Self {
            inner: Arc::new(MonetizationInner {
                entitlements: transports.entitlements.clone(),
                urls,
                cache,
                events: EventEmitter::new(),
            }),
        }
    }

    /// Check whether `user_id` is entitled to any of `product_ids`.
    ///
    /// Returns `None` when the user is not entitled. Results are cached for
    /// the `ttl` the service reports, keyed by the sorted ids and the user, so
    /// the order of `product_ids` does not matter.
    ///
    /// # Errors
    ///
    /// - `SdkError::NotConfigured` without a session domain
    /// - `SdkError::InvalidArgument` for an empty `user_id`
    /// - `SdkError::AccessFetchFailed` when the service cannot be reached or
    ///   answers with an error payload
    #[instrument(skip(self, product_ids), fields(products = product_ids.len()))]
    pub async fn has_access<S: AsRef<str>>(
        &self,
        product_ids: &[S],
        user_id: &str,
    ) -> Result<Option<EntitlementRecord>> {
        let inner = &self.inner;
        let Some(entitlements) = &inner.entitlements else {
            return Err(SdkError::NotConfigured(
                "has_access requires a session domain".to_string(),
            ));
        };
        if user_id.is_empty() {
            return Err(SdkError::InvalidArgument(
                "'userId' must be specified".to_string(),
            ));
        }

        let ids = sorted_ids(product_ids);
        let key = access_cache_key(&ids, user_id);

        let record = if let Some(cached) = inner.cache.get::<EntitlementRecord>(&key) {
            debug!(key = %key, "Access cache hit");
            cached
        } else {
            let path = format!("hasAccess/{}", ids.join(","));
            let record = match fetch_record(&**entitlements, &path).await {
                Ok(record) => record,
                Err(e) => return Err(self.fail(SdkError::AccessFetchFailed(e))),
            };
            inner
                .cache
                .set(&key, &record, Duration::from_secs(record.ttl));
            record
        };

        if !record.entitled {
            debug!(key = %key, "Not entitled");
            return Ok(None);
        }

        inner.events.emit(
            MonetizationEvent::HasAccess,
            &MonetizationPayload::Access {
                ids,
                data: record.clone(),
            },
        );
        Ok(Some(record))
    }

    /// Forget the cached result for `product_ids` and `user_id`.
    pub fn clear_cached_access_result<S: AsRef<str>>(&self, product_ids: &[S], user_id: &str) {
        let key = access_cache_key(&sorted_ids(product_ids), user_id);
        self.inner.cache.delete(&key);
    }

    /// # Errors
    ///
    /// Returns `SdkError::InvalidArgument` for a malformed redirect URI.
    pub fn subscriptions_url(&self, redirect_uri: Option<&str>) -> Result<Url> {
        self.inner.urls.subscriptions_url(redirect_uri)
    }

    /// # Errors
    ///
    /// Returns `SdkError::InvalidArgument` for a malformed redirect URI.
    pub fn products_url(&self, redirect_uri: Option<&str>) -> Result<Url> {
        self.inner.urls.products_url(redirect_uri)
    }

    pub fn on<F>(&self, event: MonetizationEvent, listener: F) -> ListenerId
    where
        F: Fn(&MonetizationPayload) + Send + Sync + 'static,
    {
        self.inner.events.on(event, listener)
    }

    pub fn off(&self, event: MonetizationEvent, id: ListenerId) -> bool {
        self.inner.events.off(event, id)
    }

    fn fail(&self, err: SdkError) -> SdkError {
        warn!(error = %err, "Access check failed");
        self.inner.events.emit(
            MonetizationEvent::Error,
            &MonetizationPayload::Error(err.to_string()),
        );
        err
    }
}

fn sorted_ids<S: AsRef<str>>(product_ids: &[S]) -> Vec<String> {
    let mut ids: Vec<String> = product_ids.iter().map(|id| id.as_ref().to_string()).collect();
    ids.sort();
    ids
}

/// Percent-encoding leaves neither `,` nor `/` in a component, so distinct
/// `(ids, user)` pairs never share a key.
fn access_cache_key(sorted_ids: &[String], user_id: &str) -> String {
    let ids: Vec<_> = sorted_ids.iter().map(|id| urlencoding::encode(id)).collect();
    format!("prd_{}/{}", ids.join(","), urlencoding::encode(user_id))
}

async fn fetch_record(
    transport: &dyn Transport,
    path: &str,
) -> std::result::Result<EntitlementRecord, AccessFetchError> {
    let mut value = transport.get(path, &QueryParams::new()).await?;
    if let Some(error) = value.as_object_mut().and_then(|body| body.remove("error")) {
        return Err(AccessFetchError::Backend(serde_json::from_value(error)?));
    }
    Ok(serde_json::from_value(value)?)
}
