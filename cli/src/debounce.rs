use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Quiet period before a typed query is sent.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Results of one completed search.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub generation: u64,
    pub query: String,
    pub result: Result<T, String>,
}

/// Debounced, cancellable search.
///
/// Every input bumps a generation counter and aborts the task serving the
/// previous input. A task only publishes when its generation is still the
/// latest, so stale results never overwrite newer ones.
pub struct Debouncer<F, T> {
    delay: Duration,
    search: Arc<F>,
    generation: Arc<AtomicU64>,
    in_flight: Option<JoinHandle<()>>,
    results: Arc<watch::Sender<Option<Outcome<T>>>>,
}

impl<F, Fut, T> Debouncer<F, T>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Default + Send + Sync + 'static,
{
    pub fn new(delay: Duration, search: F) -> (Self, watch::Receiver<Option<Outcome<T>>>) {
        let (tx, rx) = watch::channel(None);
        let debouncer = Self {
            delay,
            search: Arc::new(search),
            generation: Arc::new(AtomicU64::new(0)),
            in_flight: None,
            results: Arc::new(tx),
        };
        (debouncer, rx)
    }

    /// Feed the current input. A blank query clears the results at once.
    pub fn input(&mut self, query: &str) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = self.in_flight.take() {
            previous.abort();
        }

        let query = query.trim().to_string();
        if query.is_empty() {
            publish(
                &self.results,
                &self.generation,
                Outcome {
                    generation,
                    query,
                    result: Ok(T::default()),
                },
            );
            return;
        }

        let delay = self.delay;
        let search = Arc::clone(&self.search);
        let latest = Arc::clone(&self.generation);
        let results = Arc::clone(&self.results);

        self.in_flight = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if latest.load(Ordering::SeqCst) != generation {
                return;
            }
            let result = (*search)(query.clone()).await.map_err(|e| format!("{e:#}"));
            publish(
                &results,
                &latest,
                Outcome {
                    generation,
                    query,
                    result,
                },
            );
        }));
    }
}

/// Publish `outcome` unless a newer input has arrived. The generation is
/// checked while holding the channel's write lock, so an outcome can never
/// land after a newer one.
fn publish<T>(
    results: &watch::Sender<Option<Outcome<T>>>,
    latest: &AtomicU64,
    outcome: Outcome<T>,
) -> bool {
    results.send_if_modified(|slot| {
        if latest.load(Ordering::SeqCst) != outcome.generation {
            return false;
        }
        *slot = Some(outcome);
        true
    })
}

impl<F, T> Drop for Debouncer<F, T> {
    fn drop(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}
