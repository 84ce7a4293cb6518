//! Classifier adapter: pretrained models as opaque probability sources.
//!
//! Models are registered by name in a [`ClassifierRegistry`], either as ready
//! scorers or as loader closures. Loaders run exactly once, on first use, under
//! a single-initialization guard; concurrent first callers wait for that one
//! load. A loader that fails leaves its model absent, which is never an error.
//!
//! [`ClassifierAdapter`] dispatches every registered scorer on a thread of its
//! own and waits at most the configured timeout. A scorer that errors, panics,
//! returns a non-probability or misses the deadline only loses its own signal
//! for this round. A call that missed its deadline keeps running in the
//! background; until it returns, later rounds report that model as busy
//! instead of stacking more calls on it.
//!
//! ```no_run
//! use std::sync::Arc;
//! use imagecheckr::core::{ClassifierAdapter, ClassifierRegistry, ImageArray};
//!
//! let registry = ClassifierRegistry::builder()
//!     .with_fn("constant", |_: &ImageArray| Ok(0.7))
//!     .build();
//! let adapter = ClassifierAdapter::new(std::time::Duration::from_secs(5));
//! let image = Arc::new(ImageArray::grayscale(2, 2, vec![0.5; 4])?);
//! let outcomes = adapter.score_all(&registry, &image);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use super::decoder::ImageArray;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScorerError {
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("model returned {0}, expected a probability in [0, 1]")]
    InvalidOutput(f64),

    #[error("scorer panicked")]
    Panicked,

    #[error("no answer within {0:?}")]
    Timeout(Duration),

    #[error("previous call has not returned yet")]
    Busy,

    #[error("failed to load model: {0}")]
    Load(String),
}

/// A loaded model that maps an image to a probability of synthetic origin
pub trait Scorer: Send + Sync {
    fn score(&self, image: &ImageArray) -> Result<f64, ScorerError>;
}

impl<F> Scorer for F
where
    F: Fn(&ImageArray) -> Result<f64, ScorerError> + Send + Sync,
{
    fn score(&self, image: &ImageArray) -> Result<f64, ScorerError> {
        self(image)
    }
}

pub type SharedScorer = Arc<dyn Scorer>;

type ModelLoader = Box<dyn Fn() -> Result<SharedScorer, ScorerError> + Send + Sync>;

/// Name → scorer mapping, populated once and read-only afterwards
pub struct ClassifierRegistry {
    loaders: Vec<(String, ModelLoader)>,
    models: OnceLock<BTreeMap<String, SharedScorer>>,
}

impl ClassifierRegistry {
    /// Registry with no models; yields zero classifier signals
    pub fn empty() -> Self {
        Self {
            loaders: Vec::new(),
            models: OnceLock::new(),
        }
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Loaded models, running the loaders on first call
    pub fn models(&self) -> &BTreeMap<String, SharedScorer> {
        self.models.get_or_init(|| self.load_all())
    }

    pub fn get(&self, name: &str) -> Option<&SharedScorer> {
        self.models().get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.models().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.models().len()
    }

    pub fn is_empty(&self) -> bool {
        self.models().is_empty()
    }

    pub fn is_initialized(&self) -> bool {
        self.models.get().is_some()
    }

    fn load_all(&self) -> BTreeMap<String, SharedScorer> {
        let mut models = BTreeMap::new();
        for (name, loader) in &self.loaders {
            match loader() {
                Ok(scorer) => {
                    log::info!("Loaded classifier '{}'", name);
                    models.insert(name.clone(), scorer);
                }
                Err(e) => log::warn!("Classifier '{}' unavailable: {}", name, e),
            }
        }
        models
    }
}

impl Default for ClassifierRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for ClassifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registered: Vec<&str> = self.loaders.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("ClassifierRegistry")
            .field("registered", &registered)
            .field("loaded", &self.models.get().map(|m| m.keys().collect::<Vec<_>>()))
            .finish()
    }
}

/// Builder for a [`ClassifierRegistry`]
pub struct RegistryBuilder {
    loaders: Vec<(String, ModelLoader)>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            loaders: Vec::new(),
        }
    }

    /// Register an already-loaded scorer
    pub fn with_scorer(self, name: impl Into<String>, scorer: impl Scorer + 'static) -> Self {
        self.with_shared(name, Arc::new(scorer))
    }

    /// Register a plain function or closure as a scorer
    pub fn with_fn<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&ImageArray) -> Result<f64, ScorerError> + Send + Sync + 'static,
    {
        self.with_shared(name, Arc::new(f))
    }

    pub fn with_shared(self, name: impl Into<String>, scorer: SharedScorer) -> Self {
        self.with_loader(name, move || Ok(Arc::clone(&scorer)))
    }

    /// Register a loader that runs once, on first use of the registry.
    /// Later registrations under the same name replace earlier ones.
    pub fn with_loader<F>(mut self, name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Result<SharedScorer, ScorerError> + Send + Sync + 'static,
    {
        let name = name.into();
        self.loaders.retain(|(n, _)| *n != name);
        self.loaders.push((name, Box::new(loader)));
        self
    }

    pub fn build(self) -> ClassifierRegistry {
        ClassifierRegistry {
            loaders: self.loaders,
            models: OnceLock::new(),
        }
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one scorer call in one round
#[derive(Debug, Clone, PartialEq)]
pub struct ScorerOutcome {
    pub model: String,
    pub result: Result<f64, ScorerError>,
}

type InFlightSet = Arc<Mutex<HashSet<String>>>;

fn lock_in_flight(set: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    // The set stays consistent even if a holder panicked
    set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Marks one model as running; the mark is cleared on drop
struct InFlight {
    set: InFlightSet,
    model: String,
}

impl InFlight {
    fn acquire(set: &InFlightSet, model: &str) -> Option<Self> {
        if !lock_in_flight(set).insert(model.to_string()) {
            return None;
        }
        Some(Self {
            set: Arc::clone(set),
            model: model.to_string(),
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        lock_in_flight(&self.set).remove(&self.model);
    }
}

/// Parallel, deadline-bounded dispatch over a registry.
///
/// Each model has at most one call outstanding per adapter. Calls run on
/// dedicated threads, so a stuck model never holds up another one.
pub struct ClassifierAdapter {
    timeout: Duration,
    in_flight: InFlightSet,
}

impl ClassifierAdapter {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Models whose last call is still running, sorted by name
    pub fn in_flight(&self) -> Vec<String> {
        let mut models: Vec<String> = lock_in_flight(&self.in_flight).iter().cloned().collect();
        models.sort();
        models
    }

    /// Run every registered scorer once. Outcomes are sorted by model name.
    pub fn score_all(&self, registry: &ClassifierRegistry, image: &Arc<ImageArray>) -> Vec<ScorerOutcome> {
        let models = registry.models();
        if models.is_empty() {
            return Vec::new();
        }

        let (tx, rx) = mpsc::channel();
        let mut pending: BTreeSet<&String> = BTreeSet::new();
        let mut outcomes = Vec::with_capacity(models.len());

        for (name, scorer) in models {
            match self.dispatch(name, scorer, image, tx.clone()) {
                Ok(()) => {
                    pending.insert(name);
                }
                Err(e) => outcomes.push(ScorerOutcome {
                    model: name.clone(),
                    result: Err(e),
                }),
            }
        }
        drop(tx);

        // No deadline when the timeout is too large to represent
        let deadline = Instant::now().checked_add(self.timeout);
        while !pending.is_empty() {
            let received = match deadline {
                Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
                None => rx.recv().map_err(RecvTimeoutError::from),
            };
            match received {
                Ok(outcome) => {
                    pending.remove(&outcome.model);
                    outcomes.push(outcome);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        for model in pending {
            log::debug!("Classifier '{}' still running after {:?}", model, self.timeout);
            outcomes.push(ScorerOutcome {
                model: model.clone(),
                result: Err(ScorerError::Timeout(self.timeout)),
            });
        }

        outcomes.sort_by(|a, b| a.model.cmp(&b.model));
        outcomes
    }

    fn dispatch(
        &self,
        name: &str,
        scorer: &SharedScorer,
        image: &Arc<ImageArray>,
        tx: Sender<ScorerOutcome>,
    ) -> Result<(), ScorerError> {
        let guard = InFlight::acquire(&self.in_flight, name).ok_or(ScorerError::Busy)?;
        let scorer = Arc::clone(scorer);
        let image = Arc::clone(image);
        let model = name.to_string();

        thread::Builder::new()
            .name(format!("scorer-{}", name))
            .spawn(move || {
                let result = run_scorer(scorer.as_ref(), &image);
                drop(guard);
                // Receiver is gone if this scorer already timed out
                let _ = tx.send(ScorerOutcome { model, result });
            })
            .map(|_| ())
            .map_err(|e| ScorerError::Backend(format!("failed to start scorer thread: {}", e)))
    }
}

impl fmt::Debug for ClassifierAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierAdapter")
            .field("timeout", &self.timeout)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

/// Call a scorer, turning panics and non-probabilities into errors
fn run_scorer(scorer: &dyn Scorer, image: &ImageArray) -> Result<f64, ScorerError> {
    match panic::catch_unwind(AssertUnwindSafe(|| scorer.score(image))) {
        Ok(Ok(p)) if p.is_finite() && (0.0..=1.0).contains(&p) => Ok(p),
        Ok(Ok(p)) => Err(ScorerError::InvalidOutput(p)),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(ScorerError::Panicked),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn image() -> Arc<ImageArray> {
        Arc::new(ImageArray::grayscale(4, 4, vec![0.5; 16]).unwrap())
    }

    fn constant(p: f64) -> SharedScorer {
        Arc::new(move |_: &ImageArray| -> Result<f64, ScorerError> { Ok(p) })
    }

    fn adapter(timeout_ms: u64) -> ClassifierAdapter {
        ClassifierAdapter::new(Duration::from_millis(timeout_ms))
    }

    #[test]
    fn test_empty_registry_yields_nothing() {
        let registry = ClassifierRegistry::empty();
        assert!(registry.is_empty());
        assert!(adapter(100).score_all(&registry, &image()).is_empty());
    }

    #[test]
    fn test_failures_are_isolated() {
        let registry = ClassifierRegistry::builder()
            .with_fn("good", |_: &ImageArray| Ok(0.8))
            .with_fn("broken", |_: &ImageArray| Err(ScorerError::Backend("oom".into())))
            .with_fn("out_of_range", |_: &ImageArray| Ok(1.5))
            .with_fn("nan", |_: &ImageArray| Ok(f64::NAN))
            .with_fn("panics", |_: &ImageArray| panic!("scorer blew up"))
            .build();

        let outcomes = adapter(2_000).score_all(&registry, &image());
        let by_name: BTreeMap<_, _> = outcomes.into_iter().map(|o| (o.model, o.result)).collect();

        assert_eq!(by_name["good"], Ok(0.8));
        assert_eq!(by_name["broken"], Err(ScorerError::Backend("oom".into())));
        assert_eq!(by_name["out_of_range"], Err(ScorerError::InvalidOutput(1.5)));
        assert!(matches!(by_name["nan"], Err(ScorerError::InvalidOutput(_))));
        assert_eq!(by_name["panics"], Err(ScorerError::Panicked));
    }

    #[test]
    fn test_slow_scorer_times_out() {
        let registry = ClassifierRegistry::builder()
            .with_fn("fast", |_: &ImageArray| Ok(0.3))
            .with_fn("slow", |_: &ImageArray| {
                std::thread::sleep(Duration::from_millis(500));
                Ok(0.9)
            })
            .build();

        let started = Instant::now();
        let outcomes = adapter(50).score_all(&registry, &image());

        assert!(started.elapsed() < Duration::from_millis(400));
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].model, "fast");
        assert_eq!(outcomes[0].result, Ok(0.3));
        assert_eq!(outcomes[1].model, "slow");
        assert!(matches!(outcomes[1].result, Err(ScorerError::Timeout(_))));
    }

    #[test]
    fn test_loaders_run_once_under_contention() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);

        let registry = Arc::new(
            ClassifierRegistry::builder()
                .with_loader("lazy", move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    Ok(constant(0.5))
                })
                .build(),
        );
        assert!(!registry.is_initialized());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.len())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(registry.is_initialized());
    }

    #[test]
    fn test_failed_loader_means_absent_model() {
        let registry = ClassifierRegistry::builder()
            .with_loader("missing", || Err(ScorerError::Load("weights not found".into())))
            .with_fn("present", |_: &ImageArray| Ok(0.2))
            .build();

        assert_eq!(registry.names(), vec!["present".to_string()]);
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_no_state_carries_between_rounds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let registry = ClassifierRegistry::builder()
            .with_fn("flaky", move |_: &ImageArray| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ScorerError::Backend("first call fails".into()))
                } else {
                    Ok(0.6)
                }
            })
            .build();

        let adapter = adapter(1_000);
        assert!(adapter.score_all(&registry, &image())[0].result.is_err());
        assert_eq!(adapter.score_all(&registry, &image())[0].result, Ok(0.6));
    }

    #[test]
    fn test_hung_scorer_does_not_starve_healthy_ones() {
        let registry = ClassifierRegistry::builder()
            .with_fn("hung", |_: &ImageArray| {
                std::thread::sleep(Duration::from_secs(2));
                Ok(0.1)
            })
            .with_fn("quick", |_: &ImageArray| Ok(0.7))
            .build();

        let adapter = adapter(100);
        let image = image();

        for round in 0..6 {
            let outcomes = adapter.score_all(&registry, &image);
            assert_eq!(outcomes[0].model, "hung");
            assert_eq!(outcomes[1].model, "quick");
            assert_eq!(outcomes[1].result, Ok(0.7), "round {}", round);

            if round == 0 {
                assert_eq!(outcomes[0].result, Err(ScorerError::Timeout(Duration::from_millis(100))));
            } else {
                assert_eq!(outcomes[0].result, Err(ScorerError::Busy), "round {}", round);
            }
        }
        assert_eq!(adapter.in_flight(), vec!["hung".to_string()]);
    }

    #[test]
    fn test_many_slow_scorers_in_one_round() {
        let builder = (0..8).fold(ClassifierRegistry::builder(), |builder, i| {
            builder.with_fn(format!("slow{}", i), |_: &ImageArray| {
                std::thread::sleep(Duration::from_millis(800));
                Ok(0.9)
            })
        });
        let registry = builder.with_fn("quick", |_: &ImageArray| Ok(0.4)).build();

        let outcomes = adapter(100).score_all(&registry, &image());
        let by_name: BTreeMap<_, _> = outcomes.into_iter().map(|o| (o.model, o.result)).collect();

        assert_eq!(by_name.len(), 9);
        assert_eq!(by_name["quick"], Ok(0.4));
        assert!(matches!(by_name["slow0"], Err(ScorerError::Timeout(_))));
    }

    #[test]
    fn test_model_is_released_after_late_return() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let registry = ClassifierRegistry::builder()
            .with_fn("late", move |_: &ImageArray| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    std::thread::sleep(Duration::from_millis(150));
                }
                Ok(0.5)
            })
            .build();
        let adapter = adapter(50);

        assert!(matches!(
            adapter.score_all(&registry, &image())[0].result,
            Err(ScorerError::Timeout(_))
        ));
        std::thread::sleep(Duration::from_millis(400));
        assert!(adapter.in_flight().is_empty());

        assert_eq!(adapter.score_all(&registry, &image())[0].result, Ok(0.5));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unbounded_timeout_waits_for_answer() {
        let registry = ClassifierRegistry::builder()
            .with_fn("steady", |_: &ImageArray| Ok(0.25))
            .build();

        let adapter = ClassifierAdapter::new(Duration::MAX);
        assert_eq!(adapter.score_all(&registry, &image())[0].result, Ok(0.25));
    }
}
