use super::FilterResult;
use crate::counter_store::CounterStoreError;
use crate::proxy::context::{detail_response, RequestContext};
use crate::rate_limiter::{Decision, RateLimiter};
use http::StatusCode;

fn header_value(v: impl std::fmt::Display) -> http::HeaderValue {
    http::HeaderValue::from_str(&v.to_string()).expect("numeric header value is always valid ascii")
}

/// Both-phase rule: pre-process runs the atomic evict/insert/count/expire
/// pipeline and either lets the request through or short-circuits with 429;
/// post-process attaches `X-RateLimit-*` usage headers to the eventual
/// response, re-querying the store so the header reflects state as of the
/// response rather than the decision that was made on the way in.
pub async fn pre_process(
    prefix: &str,
    limiter: &RateLimiter,
    limit: u32,
    window_secs: u64,
    ctx: &mut RequestContext,
) -> FilterResult {
    if limit == 0 {
        return FilterResult::Continue;
    }

    match limiter.check(prefix, &ctx.client_id, limit, window_secs).await {
        Ok(Decision::Allowed(count)) => {
            ctx.rate_limit_count = Some(count);
            FilterResult::Continue
        }
        Ok(Decision::Denied { retry_after_secs }) => {
            let mut resp = detail_response(StatusCode::TOO_MANY_REQUESTS, "Too many requests");
            let headers = resp.headers_mut();
            headers.insert("retry-after", header_value(retry_after_secs));
            headers.insert("x-ratelimit-limit", header_value(limit));
            headers.insert("x-ratelimit-reset", header_value(RateLimiter::reset_secs(window_secs)));
            FilterResult::Reject(resp)
        }
        Err(CounterStoreError::Unavailable(msg)) => {
            tracing::warn!(
                "rate_limit: counter store unavailable, failing open, prefix={}, error={}",
                prefix,
                msg
            );
            FilterResult::Continue
        }
        Err(CounterStoreError::Other(msg)) => {
            tracing::error!("rate_limit: pipeline error, prefix={}, error={}", prefix, msg);
            FilterResult::Reject(detail_response(StatusCode::INTERNAL_SERVER_ERROR, "Rate limiting error"))
        }
    }
}

pub async fn post_process(
    prefix: &str,
    limiter: &RateLimiter,
    limit: u32,
    window_secs: u64,
    ctx: &RequestContext,
    resp: &mut hyper::Response<crate::proxy::context::BoxBody>,
) {
    if limit == 0 || resp.status().as_u16() == 429 {
        return;
    }

    let remaining = limiter.remaining(prefix, &ctx.client_id, limit, window_secs).await;
    let reset = RateLimiter::reset_secs(window_secs);
    let headers = resp.headers_mut();
    headers.insert("x-ratelimit-limit", header_value(limit));
    headers.insert("x-ratelimit-remaining", header_value(remaining));
    headers.insert("x-ratelimit-reset", header_value(reset));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter_store::memory::InMemoryCounterStore;
    use std::sync::Arc;

    fn ctx() -> RequestContext {
        RequestContext::new("GET".into(), "/api".into(), None, "c1".into())
    }

    #[tokio::test]
    async fn test_allows_then_denies_on_third_request() {
        let limiter = RateLimiter::new(Arc::new(InMemoryCounterStore::new()));
        let mut c = ctx();
        assert!(matches!(
            pre_process("/api", &limiter, 2, 60, &mut c).await,
            FilterResult::Continue
        ));
        assert!(matches!(
            pre_process("/api", &limiter, 2, 60, &mut c).await,
            FilterResult::Continue
        ));
        match pre_process("/api", &limiter, 2, 60, &mut c).await {
            FilterResult::Reject(resp) => {
                assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
                assert!(resp.headers().contains_key("retry-after"));
                assert_eq!(resp.headers().get("x-ratelimit-limit").unwrap(), "2");
            }
            FilterResult::Continue => panic!("expected rejection on third request"),
        }
    }

    #[tokio::test]
    async fn test_limit_zero_skips_pipeline_entirely() {
        let limiter = RateLimiter::new(Arc::new(InMemoryCounterStore::new()));
        let mut c = ctx();
        for _ in 0..10 {
            assert!(matches!(
                pre_process("/api", &limiter, 0, 60, &mut c).await,
                FilterResult::Continue
            ));
        }
        assert!(c.rate_limit_count.is_none());
    }

    #[tokio::test]
    async fn test_post_process_skips_denied_response() {
        let limiter = RateLimiter::new(Arc::new(InMemoryCounterStore::new()));
        let c = ctx();
        let mut resp = detail_response(StatusCode::TOO_MANY_REQUESTS, "Too many requests");
        post_process("/api", &limiter, 2, 60, &c, &mut resp).await;
        assert!(!resp.headers().contains_key("x-ratelimit-remaining"));
    }

    #[tokio::test]
    async fn test_post_process_adds_headers_on_success() {
        let limiter = RateLimiter::new(Arc::new(InMemoryCounterStore::new()));
        let mut c = ctx();
        pre_process("/api", &limiter, 2, 60, &mut c).await;
        let mut resp = detail_response(StatusCode::OK, "ok");
        post_process("/api", &limiter, 2, 60, &c, &mut resp).await;
        assert_eq!(resp.headers().get("x-ratelimit-limit").unwrap(), "2");
        assert_eq!(resp.headers().get("x-ratelimit-remaining").unwrap(), "1");
    }
}
