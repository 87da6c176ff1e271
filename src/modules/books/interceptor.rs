//! Date gate in front of book writes.
//!
//! `create` carries the book payload as its first argument and `updateById`
//! as its second. The payload's `createdDate` must be a number, or a string
//! holding one, that names a calendar date when read as epoch milliseconds.
//! A valid date is rewritten in place as integer epoch milliseconds before
//! the call continues. Every other operation name is rejected.

use async_trait::async_trait;
use bookstore_kernel::{Interceptor, InvocationContext, InvocationError, InvocationResult, Next};
use serde_json::Value;
use time::OffsetDateTime;

use super::models::{from_epoch_millis, to_epoch_millis, MAX_EPOCH_MILLIS};

pub const CREATED_DATE: &str = "createdDate";
pub const INVALID_DATE: &str = "Date is invalid";

#[derive(Debug, Default, Clone, Copy)]
pub struct ValidateDateInterceptor;

impl ValidateDateInterceptor {
    pub fn new() -> Self {
        Self
    }

    /// Position of the date-bearing payload for `method_name`
    fn payload_index(method_name: &str) -> Option<usize> {
        match method_name {
            "create" => Some(0),
            "updateById" => Some(1),
            _ => None,
        }
    }
}

#[async_trait]
impl Interceptor for ValidateDateInterceptor {
    fn name(&self) -> &'static str {
        "validate-date"
    }

    async fn intercept(&self, ctx: &mut InvocationContext, next: Next<'_>) -> InvocationResult {
        let index = Self::payload_index(ctx.method_name());
        let date = index
            .and_then(|i| ctx.args().get(i))
            .and_then(|payload| payload.get(CREATED_DATE))
            .and_then(parse_created_date);

        let (Some(index), Some(date)) = (index, date) else {
            tracing::debug!(
                method = ctx.method_name(),
                "rejecting invocation without a valid {CREATED_DATE}"
            );
            return Err(InvocationError::validation(INVALID_DATE));
        };

        if let Some(payload) = ctx.args_mut().get_mut(index).and_then(Value::as_object_mut) {
            payload.insert(CREATED_DATE.to_string(), Value::from(to_epoch_millis(date)));
        }

        next.run(ctx).await
    }
}

/// Read a `createdDate` value as epoch milliseconds.
///
/// Strings are coerced to numbers first; fractional milliseconds are
/// truncated. Returns `None` for anything that does not land on a calendar
/// date.
pub fn parse_created_date(value: &Value) -> Option<OffsetDateTime> {
    let millis = match value {
        Value::String(s) => coerce_number(s)?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };

    if !millis.is_finite() || millis.abs() > MAX_EPOCH_MILLIS as f64 {
        return None;
    }
    from_epoch_millis(millis.trunc() as i64)
}

/// Numeric value of `s`: decimal, exponent or `0x`/`0o`/`0b` integer forms,
/// surrounding whitespace ignored. Blank strings are not numbers.
fn coerce_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let radix = match s.get(..2) {
        Some("0x") | Some("0X") => Some(16),
        Some("0o") | Some("0O") => Some(8),
        Some("0b") | Some("0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        // from_str_radix alone would also take a leading sign
        let digits = &s[2..];
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        return u64::from_str_radix(digits, radix).ok().map(|n| n as f64);
    }

    // Rust also accepts "inf" and "nan"; both fail the finiteness check later.
    s.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookstore_kernel::{InterceptorChain, InvocationTarget};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use time::macros::datetime;

    /// Counts calls and replies with a fixed value or error
    struct Downstream {
        calls: AtomicUsize,
        fail: bool,
    }

    impl Downstream {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl InvocationTarget for Downstream {
        async fn invoke(&self, _ctx: &mut InvocationContext) -> InvocationResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(InvocationError::not_found("Entity not found: Book with id 9"))
            } else {
                Ok(json!({"stored": true}))
            }
        }
    }

    fn chain() -> InterceptorChain {
        InterceptorChain::new().with(Arc::new(ValidateDateInterceptor::new()))
    }

    async fn run(
        method: &str,
        args: Vec<Value>,
        target: &Downstream,
    ) -> (InvocationContext, InvocationResult) {
        let mut ctx = InvocationContext::new(method, args);
        let result = chain().invoke(&mut ctx, target).await;
        (ctx, result)
    }

    fn assert_invalid_date(result: &InvocationResult) {
        match result {
            Err(InvocationError::Validation {
                message,
                status_code,
            }) => {
                assert_eq!(message, INVALID_DATE);
                assert_eq!(*status_code, 400);
            }
            other => panic!("Expected invalid date rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_normalizes_timestamp_and_returns_downstream_result() {
        let target = Downstream::ok();
        let (ctx, result) = run(
            "create",
            vec![json!({"title": "Dune", "createdDate": "1700000000000"})],
            &target,
        )
        .await;

        assert_eq!(result.unwrap(), json!({"stored": true}));
        assert_eq!(target.calls(), 1);
        assert_eq!(
            ctx.args()[0],
            json!({"title": "Dune", "createdDate": 1_700_000_000_000_i64})
        );
        assert_eq!(
            parse_created_date(&ctx.args()[0]["createdDate"]),
            Some(datetime!(2023-11-14 22:13:20 UTC))
        );
    }

    #[tokio::test]
    async fn update_by_id_accepts_the_epoch() {
        let target = Downstream::ok();
        let (ctx, result) = run(
            "updateById",
            vec![json!(7), json!({"createdDate": "0"})],
            &target,
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(ctx.args()[0], json!(7));
        assert_eq!(ctx.args()[1], json!({"createdDate": 0}));
    }

    #[tokio::test]
    async fn numeric_zero_is_not_treated_as_absent() {
        let target = Downstream::ok();
        let (_, result) = run("create", vec![json!({"createdDate": 0})], &target).await;
        assert!(result.is_ok());
        assert_eq!(target.calls(), 1);
    }

    #[tokio::test]
    async fn invalid_dates_never_reach_the_target() {
        let target = Downstream::ok();
        let rejected = [
            json!({"createdDate": "abc"}),
            json!({"createdDate": "not-a-date"}),
            json!({"createdDate": ""}),
            json!({"createdDate": "   "}),
            json!({"createdDate": null}),
            json!({"createdDate": true}),
            json!({"createdDate": "Infinity"}),
            json!({"createdDate": "1e300"}),
            json!({"createdDate": "8640000000000001"}),
            json!({}),
            json!(null),
            json!("1700000000000"),
        ];

        for payload in rejected {
            let (ctx, result) = run("create", vec![payload.clone()], &target).await;
            assert_invalid_date(&result);
            // Rejected payloads are left untouched.
            assert_eq!(ctx.args()[0], payload);
        }
        assert_eq!(target.calls(), 0);
    }

    #[tokio::test]
    async fn missing_payload_is_rejected() {
        let target = Downstream::ok();

        let (_, result) = run("create", vec![], &target).await;
        assert_invalid_date(&result);

        // updateById reads the second argument, not the first
        let (_, result) = run("updateById", vec![json!({"createdDate": "0"})], &target).await;
        assert_invalid_date(&result);

        assert_eq!(target.calls(), 0);
    }

    #[tokio::test]
    async fn other_operations_are_always_rejected() {
        let target = Downstream::ok();
        let valid = json!({"createdDate": "1700000000000"});

        for method in ["find", "findById", "deleteById", "replaceById", "count", "Create", ""] {
            let (_, result) = run(method, vec![valid.clone(), valid.clone()], &target).await;
            assert_invalid_date(&result);
        }
        assert_eq!(target.calls(), 0);
    }

    #[tokio::test]
    async fn downstream_errors_pass_through_unchanged() {
        let target = Downstream::failing();
        let (_, result) = run(
            "updateById",
            vec![json!(9), json!({"createdDate": "1700000000000"})],
            &target,
        )
        .await;

        match result {
            Err(InvocationError::NotFound { message }) => {
                assert_eq!(message, "Entity not found: Book with id 9");
            }
            other => panic!("Expected downstream NotFound, got {other:?}"),
        }
        assert_eq!(target.calls(), 1);
    }

    #[tokio::test]
    async fn normalizing_twice_is_idempotent() {
        let target = Downstream::ok();
        let (first, _) = run("create", vec![json!({"createdDate": "1700000000000"})], &target).await;

        let restringified = json!({
            "createdDate": first.args()[0]["createdDate"].to_string()
        });
        let (second, _) = run("create", vec![restringified], &target).await;

        assert_eq!(first.args(), second.args());
        assert_eq!(target.calls(), 2);
    }

    #[test]
    fn coercion_follows_numeric_string_rules() {
        assert_eq!(coerce_number(" 42 "), Some(42.0));
        assert_eq!(coerce_number("1.7e12"), Some(1.7e12));
        assert_eq!(coerce_number("-1000"), Some(-1000.0));
        assert_eq!(coerce_number("0x10"), Some(16.0));
        assert_eq!(coerce_number("0b101"), Some(5.0));
        assert_eq!(coerce_number("0o17"), Some(15.0));
        assert_eq!(coerce_number("0xZZ"), None);
        assert_eq!(coerce_number("12px"), None);
        assert_eq!(coerce_number(""), None);
    }

    #[test]
    fn signed_prefixed_literals_are_not_numbers() {
        for input in ["0x+5", "0b+1", "0o+7", "0x-1", "0x", "0b"] {
            assert_eq!(coerce_number(input), None, "{input}");
            assert_eq!(parse_created_date(&json!(input)), None, "{input}");
        }
    }

    #[test]
    fn fractional_and_negative_millis_are_truncated_dates() {
        assert_eq!(
            parse_created_date(&json!("1.9")),
            Some(datetime!(1970-01-01 00:00:00.001 UTC))
        );
        assert_eq!(
            parse_created_date(&json!(-86_400_000)),
            Some(datetime!(1969-12-31 00:00:00 UTC))
        );
    }
}
