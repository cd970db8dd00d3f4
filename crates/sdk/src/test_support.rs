//! Doubles shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use url::Url;

use crate::cache::Clock;
use crate::transport::{QueryParams, Transport, TransportError, build_url};

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock(AtomicI64);

impl ManualClock {
    pub fn at(millis: i64) -> Self {
        Self(AtomicI64::new(millis))
    }

    pub fn advance(&self, millis: i64) {
        self.0.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct Script {
    failures: VecDeque<TransportError>,
    reply: Option<serde_json::Value>,
}

/// A transport answering from a per-path script.
///
/// Queued failures are delivered once each, in order. After that the most
/// recent JSON reply repeats. Unscripted paths answer with HTTP 404.
pub struct ScriptedTransport {
    base: Url,
    script: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<(String, QueryParams)>>,
}

#[allow(clippy::unwrap_used)]
impl ScriptedTransport {
    pub fn new(base: &str) -> Self {
        Self {
            base: Url::parse(base).unwrap(),
            script: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer `path` with `value` from now on.
    pub fn respond(&self, path: &str, value: serde_json::Value) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.to_string())
            .or_default()
            .reply = Some(value);
    }

    /// Fail the next unanswered call to `path`.
    pub fn fail(&self, path: &str, error: TransportError) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.to_string())
            .or_default()
            .failures
            .push_back(error);
    }

    pub fn calls(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(p, _)| p == path)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn last_params(&self, path: &str) -> Option<QueryParams> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, params)| params.clone())
    }

    fn next_reply(&self, path: &str) -> Result<serde_json::Value, TransportError> {
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = script.entry(path.to_string()).or_default();

        if let Some(error) = entry.failures.pop_front() {
            return Err(error);
        }
        entry.reply.clone().ok_or_else(|| TransportError::Status {
            status: 404,
            body: format!("no script for {path}"),
        })
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(
        &self,
        path: &str,
        params: &QueryParams,
    ) -> Result<serde_json::Value, TransportError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((path.to_string(), params.clone()));
        self.next_reply(path)
    }

    fn make_url(&self, path: &str, params: &QueryParams) -> Result<Url, TransportError> {
        build_url(&self.base, path, params)
    }
}
