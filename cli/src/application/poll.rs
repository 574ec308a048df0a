//! Convergence polling ("eventually").
//!
//! A probe samples live cluster state and either returns a value or explains
//! why the state is not there yet. [`poll`] keeps asking until the probe
//! succeeds or the deadline passes, and on timeout hands back the probe's
//! last explanation rather than a bare "timed out".
//!
//! Imports only from `crate::domain`.

use std::future::Future;
use std::time::Duration;

use anyhow::{Result, anyhow};
use regex::Regex;
use tokio::time::Instant;

use crate::domain::PollBudget;

/// Invoke `probe` now, then every `interval`, until it returns `Ok` or more
/// than `timeout` has elapsed.
///
/// Probe errors of any kind (transport, parse, mismatch) count as "not yet
/// converged". Successive invocations are at least `interval` apart, so the
/// call returns within `timeout + interval` plus the duration of one probe.
///
/// # Errors
///
/// Returns the last probe error, annotated with the elapsed time and number
/// of attempts.
pub async fn poll<T, F, Fut>(mut probe: F, timeout: Duration, interval: Duration) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let start = Instant::now();
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let err = match probe().await {
            Ok(value) => {
                tracing::debug!(attempt, elapsed = ?start.elapsed(), "converged");
                return Ok(value);
            }
            Err(err) => err,
        };
        let elapsed = start.elapsed();
        tracing::debug!(attempt, ?elapsed, error = %format!("{err:#}"), "not converged");
        if elapsed >= timeout {
            return Err(err.context(format!(
                "did not converge within {}s ({attempt} attempts)",
                timeout.as_secs()
            )));
        }
        tokio::time::sleep(interval).await;
    }
}

/// [`poll`] with a configured budget.
///
/// # Errors
///
/// See [`poll`].
pub async fn eventually<T, F, Fut>(budget: PollBudget, probe: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    poll(probe, budget.timeout(), budget.interval()).await
}

/// Check `predicate` against every element, collecting every mismatch.
///
/// # Errors
///
/// Returns one error listing every element that failed.
pub fn all_satisfy<T>(items: &[T], predicate: impl Fn(&T) -> Result<(), String>) -> Result<()> {
    let mismatches: Vec<String> = items.iter().filter_map(|i| predicate(i).err()).collect();
    if mismatches.is_empty() {
        Ok(())
    } else {
        Err(anyhow!(mismatches.join("; ")))
    }
}

/// Poll a freshly fetched sequence until every element satisfies
/// `predicate`, and return the converged snapshot.
///
/// # Errors
///
/// See [`poll`].
pub async fn eventually_all<T, F, Fut, P>(
    budget: PollBudget,
    mut fetch: F,
    predicate: P,
) -> Result<Vec<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
    P: Fn(&T) -> Result<(), String>,
{
    let predicate = &predicate;
    eventually(budget, || {
        let snapshot = fetch();
        async move {
            let items = snapshot.await?;
            all_satisfy(&items, predicate)?;
            Ok(items)
        }
    })
    .await
}

/// Expectation on the text output of a probe command.
#[derive(Debug, Clone)]
pub enum Expect {
    Contains(String),
    Matches(Regex),
}

impl Expect {
    #[must_use]
    pub fn contains(needle: impl Into<String>) -> Self {
        Self::Contains(needle.into())
    }

    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regular expression.
    pub fn matches(pattern: &str) -> Result<Self> {
        Ok(Self::Matches(Regex::new(pattern)?))
    }

    /// # Errors
    ///
    /// Returns a mismatch error quoting the observed output.
    pub fn check(&self, output: &str) -> Result<()> {
        let ok = match self {
            Self::Contains(needle) => output.contains(needle.as_str()),
            Self::Matches(re) => re.is_match(output),
        };
        if ok {
            Ok(())
        } else {
            Err(anyhow!("expected output to {self}, got {:?}", output.trim()))
        }
    }
}

impl std::fmt::Display for Expect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contains(needle) => write!(f, "contain {needle:?}"),
            Self::Matches(re) => write!(f, "match /{}/", re.as_str()),
        }
    }
}

/// Poll a command until its output meets `expect`, returning that output.
///
/// # Errors
///
/// See [`poll`].
pub async fn eventually_output<F, Fut>(budget: PollBudget, mut fetch: F, expect: &Expect) -> Result<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    eventually(budget, || {
        let output = fetch();
        async move {
            let output = output.await?;
            expect.check(&output)?;
            Ok(output)
        }
    })
    .await
}
