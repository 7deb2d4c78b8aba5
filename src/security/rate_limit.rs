//! Rate limiting with nested fixed-window budgets.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use thiserror::Error;

use crate::config::schema::RateLimitConfig;
use crate::http::failure::RequestFailure;
use crate::observability::metrics;

/// Error produced when a budget string cannot be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid rate limit '{input}': {reason}")]
pub struct BudgetParseError {
    pub input: String,
    pub reason: &'static str,
}

/// A maximum request count permitted within a fixed time window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Budget {
    pub limit: u32,
    pub period: Duration,
    unit: &'static str,
}

impl Budget {
    pub fn per_minute(limit: u32) -> Self {
        Self { limit, period: Duration::from_secs(60), unit: "minute" }
    }

    pub fn per_hour(limit: u32) -> Self {
        Self { limit, period: Duration::from_secs(3600), unit: "hour" }
    }

    pub fn per_day(limit: u32) -> Self {
        Self { limit, period: Duration::from_secs(86_400), unit: "day" }
    }
}

impl fmt::Display for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} per {}", self.limit, self.unit)
    }
}

/// Parses "10 per minute", "50/hour", "200 per day" and similar.
impl FromStr for Budget {
    type Err = BudgetParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| BudgetParseError { input: s.to_string(), reason };
        let normalized = s.trim().to_ascii_lowercase();
        let (count, unit) = normalized
            .split_once(" per ")
            .or_else(|| normalized.split_once('/'))
            .ok_or_else(|| err("expected '<count> per <unit>'"))?;

        let limit: u32 = count.trim().parse().map_err(|_| err("count is not a number"))?;
        if limit == 0 {
            return Err(err("count must be greater than zero"));
        }

        let budget = match unit.trim().trim_end_matches('s') {
            "second" => Self { limit, period: Duration::from_secs(1), unit: "second" },
            "minute" => Self::per_minute(limit),
            "hour" => Self::per_hour(limit),
            "day" => Self::per_day(limit),
            _ => return Err(err("unit must be second, minute, hour or day")),
        };
        Ok(budget)
    }
}

/// Parse a list of budget strings, stopping at the first bad one.
pub fn parse_budgets(specs: &[String]) -> Result<Vec<Budget>, BudgetParseError> {
    specs.iter().map(|s| s.parse()).collect()
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Denied {
        /// The budget that would have been exceeded.
        budget: String,
        /// Time until that budget's window resets.
        retry_after: Duration,
    },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed)
    }
}

#[derive(Debug)]
struct WindowCounter {
    started: Instant,
    count: u32,
}

/// Per-client counters, one per budget, in budget order.
#[derive(Debug)]
struct ClientWindows {
    counters: Vec<WindowCounter>,
}

impl ClientWindows {
    fn new(budgets: usize, now: Instant) -> Self {
        Self {
            counters: (0..budgets)
                .map(|_| WindowCounter { started: now, count: 0 })
                .collect(),
        }
    }

    fn all_elapsed(&self, budgets: &[Budget], now: Instant) -> bool {
        self.counters
            .iter()
            .zip(budgets)
            .all(|(c, b)| now.saturating_duration_since(c.started) >= b.period)
    }
}

/// Process-wide rate limiter keyed by client identity.
///
/// Every budget is checked and consumed under the client's map entry lock, so
/// concurrent requests from one client cannot both pass a budget with room
/// for only one. Different clients only contend when they hash to the same
/// shard, and the lock is never held across I/O.
pub struct RateLimiter {
    budgets: Vec<Budget>,
    clients: DashMap<String, ClientWindows>,
}

impl RateLimiter {
    pub fn new(budgets: Vec<Budget>) -> Self {
        Self {
            budgets,
            clients: DashMap::new(),
        }
    }

    /// Limiter for the upload route: default budgets plus the upload budgets.
    /// Disabled limiting yields a limiter with no budgets.
    pub fn for_upload_route(config: &RateLimitConfig) -> Result<Self, BudgetParseError> {
        if !config.enabled {
            return Ok(Self::new(Vec::new()));
        }
        let mut budgets = parse_budgets(&config.default_limits)?;
        budgets.extend(parse_budgets(&config.upload_limits)?);
        Ok(Self::new(budgets))
    }

    pub fn budgets(&self) -> &[Budget] {
        &self.budgets
    }

    pub fn check_and_consume(&self, key: &str) -> RateDecision {
        self.check_and_consume_at(key, Instant::now())
    }

    /// Check every budget for `key` at `now` and consume one unit from each
    /// only if all of them have room.
    pub fn check_and_consume_at(&self, key: &str, now: Instant) -> RateDecision {
        if self.budgets.is_empty() {
            return RateDecision::Allowed;
        }

        let mut windows = self
            .clients
            .entry(key.to_string())
            .or_insert_with(|| ClientWindows::new(self.budgets.len(), now));

        for (counter, budget) in windows.counters.iter_mut().zip(&self.budgets) {
            if now.saturating_duration_since(counter.started) >= budget.period {
                counter.started = now;
                counter.count = 0;
            }
        }

        // Of the exhausted budgets, report the one that frees up last.
        let exceeded = windows
            .counters
            .iter()
            .zip(&self.budgets)
            .filter(|(counter, budget)| counter.count >= budget.limit)
            .map(|(counter, budget)| {
                let elapsed = now.saturating_duration_since(counter.started);
                (budget, budget.period.saturating_sub(elapsed))
            })
            .max_by_key(|(_, retry_after)| *retry_after);

        if let Some((budget, retry_after)) = exceeded {
            return RateDecision::Denied {
                budget: budget.to_string(),
                retry_after,
            };
        }

        for counter in windows.counters.iter_mut() {
            counter.count += 1;
        }
        RateDecision::Allowed
    }

    /// Drop clients whose windows have all elapsed. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.clients.len();
        self.clients
            .retain(|_, windows| !windows.all_elapsed(&self.budgets, now));
        before.saturating_sub(self.clients.len())
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }

    /// Forget all client state.
    pub fn reset(&self) {
        self.clients.clear();
    }
}

/// Periodically purge idle clients until shutdown.
pub async fn run_sweeper(
    limiter: Arc<RateLimiter>,
    interval: Duration,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = limiter.purge_expired();
                if removed > 0 {
                    tracing::debug!(removed, remaining = limiter.tracked_clients(), "Purged idle rate limit windows");
                }
            }
            _ = shutdown.recv() => {
                tracing::debug!("Rate limit sweeper stopping");
                break;
            }
        }
    }
}

/// Middleware gating a route on the client's remaining budget.
pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = addr.ip().to_string();

    match limiter.check_and_consume(&key) {
        RateDecision::Allowed => next.run(request).await,
        RateDecision::Denied { budget, retry_after } => {
            tracing::warn!(client = %key, budget = %budget, "Rate limit exceeded");
            metrics::record_rate_limited(&budget);
            RequestFailure::RateLimited { retry_after }.into_response()
        }
    }
}
