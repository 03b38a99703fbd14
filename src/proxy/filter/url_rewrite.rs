use super::FilterResult;
use crate::proxy::context::RequestContext;

/// Pre-rule: first-match leading-prefix substitution against the route's
/// `url_rewrite` table. Only `ctx.outbound_path` is touched — the original
/// inbound path stays in `ctx.original_path` for metrics and further rule
/// lookups.
pub fn pre_process(rules: &[(String, String)], ctx: &mut RequestContext) -> FilterResult {
    for (from, to) in rules {
        if let Some(rest) = ctx.outbound_path.strip_prefix(from.as_str()) {
            ctx.outbound_path = format!("{to}{rest}");
            break;
        }
    }
    FilterResult::Continue
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(path: &str) -> RequestContext {
        RequestContext::new("GET".into(), path.into(), None, "c".into())
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let rules = vec![
            ("/api/svc".to_string(), "/internal".to_string()),
            ("/api".to_string(), "/other".to_string()),
        ];
        let mut ctx = ctx("/api/svc/users");
        pre_process(&rules, &mut ctx);
        assert_eq!(ctx.outbound_path, "/internal/users");
        assert_eq!(ctx.original_path, "/api/svc/users");
    }

    #[test]
    fn test_no_match_leaves_path_unchanged() {
        let rules = vec![("/other".to_string(), "/x".to_string())];
        let mut ctx = ctx("/api/users");
        pre_process(&rules, &mut ctx);
        assert_eq!(ctx.outbound_path, "/api/users");
    }

    #[test]
    fn test_rewrite_is_idempotent_when_result_matches_nothing() {
        let rules = vec![("/api".to_string(), "/internal".to_string())];
        let mut ctx = ctx("/api/users");
        pre_process(&rules, &mut ctx);
        assert_eq!(ctx.outbound_path, "/internal/users");
        let before = ctx.outbound_path.clone();
        pre_process(&rules, &mut ctx);
        assert_eq!(ctx.outbound_path, before);
    }

    #[test]
    fn test_only_leading_occurrence_is_replaced() {
        let rules = vec![("/api".to_string(), "/x".to_string())];
        let mut ctx = ctx("/api/api");
        pre_process(&rules, &mut ctx);
        assert_eq!(ctx.outbound_path, "/x/api");
    }
}
