use dashmap::DashMap;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::{sync::Arc, time::Duration};

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// One query per `interval` for each WHOIS server, no burst.
pub struct ServerRateLimiters {
    limiters: DashMap<String, Arc<Limiter>>,
    quota: Option<Quota>,
}

impl ServerRateLimiters {
    /// A zero interval disables limiting.
    pub fn new(interval: Duration) -> Self {
        Self {
            limiters: DashMap::new(),
            quota: Quota::with_period(interval),
        }
    }

    pub async fn acquire(&self, server: &str) {
        if let Some(limiter) = self.get_or_create(server) {
            limiter.until_ready().await;
        }
    }

    fn get_or_create(&self, server: &str) -> Option<Arc<Limiter>> {
        let quota = self.quota?;
        let limiter = self
            .limiters
            .entry(server.to_string())
            .or_insert_with(|| Arc::new(RateLimiter::direct(quota)))
            .clone();
        Some(limiter)
    }
}
