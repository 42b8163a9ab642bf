use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use url::Url;

use pollqt_core::{HttpResponse, PollError, Transport};

/// Instruction for how one request to a route should behave.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return the provided response immediately.
    Return(HttpResponse),
    /// Fail immediately with the provided error.
    Fail(PollError),
    /// Return the provided response after sleeping (simulate a slow upstream).
    Delay(Duration, HttpResponse),
    /// Hang indefinitely (simulate a stalled connection).
    Hang,
}

/// One request as seen by the scripted transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Full request URL, query included.
    pub url: Url,
    /// Headers passed by the caller, in order.
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    /// Value of the first header named `name`, ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Value of the query parameter `name`.
    #[must_use]
    pub fn query(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }
}

#[derive(Default)]
struct InternalState {
    // Keyed by URL path. The last behavior in a queue is sticky.
    rules: HashMap<String, VecDeque<MockBehavior>>,
    requests: Vec<RecordedRequest>,
}

/// Controller handle used by tests to drive the scripted transport from the outside.
#[derive(Clone)]
pub struct TransportController {
    state: Arc<Mutex<InternalState>>,
}

impl TransportController {
    /// Replace every scripted behavior for `path` with a single sticky one.
    pub async fn set(&self, path: &str, behavior: MockBehavior) {
        let mut guard = self.state.lock().await;
        guard
            .rules
            .insert(path.to_string(), VecDeque::from([behavior]));
    }

    /// Append a behavior to the queue for `path`.
    ///
    /// Queued behaviors are consumed one request at a time; the final one repeats.
    pub async fn push(&self, path: &str, behavior: MockBehavior) {
        let mut guard = self.state.lock().await;
        guard
            .rules
            .entry(path.to_string())
            .or_default()
            .push_back(behavior);
    }

    /// Shorthand for a sticky `200 OK` with `body`.
    pub async fn respond(&self, path: &str, body: impl Into<String>) {
        self.set(path, MockBehavior::Return(HttpResponse::ok(body)))
            .await;
    }

    /// Copy of every request seen so far, oldest first.
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().await.requests.clone()
    }

    /// Number of requests seen for `path`.
    pub async fn count(&self, path: &str) -> usize {
        let guard = self.state.lock().await;
        guard
            .requests
            .iter()
            .filter(|r| r.url.path() == path)
            .count()
    }

    /// Paths of every request seen so far, oldest first.
    pub async fn paths(&self) -> Vec<String> {
        let guard = self.state.lock().await;
        guard
            .requests
            .iter()
            .map(|r| r.url.path().to_string())
            .collect()
    }

    /// Clear all scripted behaviors and the request log.
    pub async fn clear_all(&self) {
        let mut guard = self.state.lock().await;
        guard.rules.clear();
        guard.requests.clear();
    }
}

/// A transport that defers all behavior to an external controller.
///
/// Requests to a path with no scripted behavior answer `404 Not Found`.
pub struct ScriptedTransport {
    name: &'static str,
    state: Arc<Mutex<InternalState>>,
}

impl ScriptedTransport {
    /// Create a new scripted transport and its controller.
    #[must_use]
    pub fn new_with_controller(name: &'static str) -> (Arc<dyn Transport>, TransportController) {
        let state = Arc::new(Mutex::new(InternalState::default()));
        let controller = TransportController {
            state: Arc::clone(&state),
        };
        let me = Arc::new(Self { name, state });
        (me as Arc<dyn Transport>, controller)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn get(
        &self,
        url: &Url,
        headers: &[(String, String)],
    ) -> Result<HttpResponse, PollError> {
        // Log and pick the behavior without holding the lock across await points
        let behavior = {
            let mut guard = self.state.lock().await;
            guard.requests.push(RecordedRequest {
                url: url.clone(),
                headers: headers.to_vec(),
            });
            guard.rules.get_mut(url.path()).and_then(|queue| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            })
        };

        match behavior {
            Some(MockBehavior::Return(resp)) => Ok(resp),
            Some(MockBehavior::Fail(e)) => Err(e),
            Some(MockBehavior::Delay(d, resp)) => {
                tokio::time::sleep(d).await;
                Ok(resp)
            }
            Some(MockBehavior::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            None => Ok(HttpResponse::new(404, "")),
        }
    }
}
