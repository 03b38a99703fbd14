pub mod rate_limit;
pub mod url_rewrite;

use crate::config::RouteConfig;
use crate::proxy::context::{BoxBody, RequestContext};
use crate::rate_limiter::RateLimiter;
use std::sync::Arc;

/// Result of a filter's pre-process phase.
pub enum FilterResult {
    /// Continue to the next filter / phase.
    Continue,
    /// Short-circuit: return this response immediately, skip forwarding.
    Reject(hyper::Response<BoxBody>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pre,
    Post,
    Both,
}

impl Phase {
    pub fn runs_pre(self) -> bool {
        matches!(self, Phase::Pre | Phase::Both)
    }

    pub fn runs_post(self) -> bool {
        matches!(self, Phase::Post | Phase::Both)
    }
}

/// Enum-based rule — static dispatch, exhaustive match, zero heap allocation
/// per dispatch. Each variant holds the config/state it needs; filters are
/// pre-built once when the route is compiled (route-table rebuild), never
/// per-request.
///
/// Adding a new filter:
/// 1. Add a module under `filter/`.
/// 2. Add a variant here.
/// 3. Implement the match arms in `phase`, `pre_process`, `post_process`.
/// 4. Add construction logic in `build_route_filters`.
pub enum Filter {
    UrlRewrite {
        rules: Vec<(String, String)>,
    },
    RateLimit {
        prefix: String,
        limiter: Arc<RateLimiter>,
        limit: u32,
        window_secs: u64,
    },
}

impl Filter {
    pub fn phase(&self) -> Phase {
        match self {
            Filter::UrlRewrite { .. } => Phase::Pre,
            Filter::RateLimit { .. } => Phase::Both,
        }
    }

    pub async fn pre_process(&self, ctx: &mut RequestContext) -> FilterResult {
        match self {
            Filter::UrlRewrite { rules } => url_rewrite::pre_process(rules, ctx),
            Filter::RateLimit {
                prefix,
                limiter,
                limit,
                window_secs,
            } => rate_limit::pre_process(prefix, limiter, *limit, *window_secs, ctx).await,
        }
    }

    pub async fn post_process(&self, ctx: &RequestContext, resp: &mut hyper::Response<BoxBody>) {
        match self {
            Filter::UrlRewrite { .. } => {}
            Filter::RateLimit {
                prefix,
                limiter,
                limit,
                window_secs,
            } => rate_limit::post_process(prefix, limiter, *limit, *window_secs, ctx, resp).await,
        }
    }
}

/// Build the filter chain for a route at compile time (route-table rebuild),
/// not per request. Order matters: the reference configuration is
/// `[UrlRewrite (PRE), RateLimit (BOTH)]`.
pub fn build_route_filters(route: &RouteConfig, limiter: Arc<RateLimiter>, window_secs: u64) -> Vec<Filter> {
    let mut filters = Vec::new();

    if !route.url_rewrite.is_empty() {
        filters.push(Filter::UrlRewrite {
            rules: route.url_rewrite.clone(),
        });
    }

    filters.push(Filter::RateLimit {
        prefix: route.prefix.clone(),
        limiter,
        limit: route.rate_limit,
        window_secs,
    });

    filters
}
