use super::*;
use time::macros::datetime;

// =============================================================================
// generate_api_key / is_well_formed_key
// =============================================================================

#[test]
fn generated_key_has_prefix_and_body() {
    let key = generate_api_key();
    assert!(key.starts_with("mapi_"));
    assert_eq!(key.len(), KEY_PREFIX.len() + 32);
    assert!(is_well_formed_key(&key));
}

#[test]
fn generated_keys_differ() {
    assert_ne!(generate_api_key(), generate_api_key());
}

#[test]
fn malformed_keys_are_rejected() {
    assert!(!is_well_formed_key(""));
    assert!(!is_well_formed_key("mapi_"));
    assert!(!is_well_formed_key("mapi_short"));
    assert!(!is_well_formed_key("xapi_1234567890abcdef1234567890abcdef"));
    assert!(!is_well_formed_key("mapi_1234567890abcdef1234567890abcde!"));
    assert!(is_well_formed_key("mapi_1234567890abcdef1234567890abcdef"));
}

// =============================================================================
// should_reset_monthly_usage
// =============================================================================

#[test]
fn same_month_does_not_reset() {
    let last = datetime!(2026-03-01 00:00 UTC);
    let now = datetime!(2026-03-31 23:59 UTC);
    assert!(!should_reset_monthly_usage(last, now));
}

#[test]
fn new_month_resets() {
    let last = datetime!(2026-03-31 23:59 UTC);
    let now = datetime!(2026-04-01 00:00 UTC);
    assert!(should_reset_monthly_usage(last, now));
}

#[test]
fn same_month_different_year_resets() {
    let last = datetime!(2025-04-15 12:00 UTC);
    let now = datetime!(2026-04-15 12:00 UTC);
    assert!(should_reset_monthly_usage(last, now));
}

#[test]
fn reset_compares_in_utc() {
    // 2026-03-31 22:00 -05:00 is 2026-04-01 03:00 UTC.
    let last = datetime!(2026-03-31 22:00 -5);
    let now = datetime!(2026-04-02 00:00 UTC);
    assert!(!should_reset_monthly_usage(last, now));
}

// =============================================================================
// usage_percentage
// =============================================================================

#[test]
fn usage_percentage_matches_dashboard_sample() {
    assert!((usage_percentage(247, 1000) - 24.7).abs() < f64::EPSILON);
}

#[test]
fn usage_percentage_rounds_to_two_decimals() {
    assert!((usage_percentage(1, 3) - 33.33).abs() < 1e-9);
}

#[test]
fn usage_percentage_zero_limit_is_zero() {
    assert!(usage_percentage(10, 0).abs() < f64::EPSILON);
}

// =============================================================================
// Plan
// =============================================================================

#[test]
fn plan_parse_round_trips() {
    for plan in [Plan::Free, Plan::Basic, Plan::Pro, Plan::Enterprise] {
        assert_eq!(Plan::parse(plan.as_str()), Some(plan));
    }
    assert_eq!(Plan::parse(" PRO "), Some(Plan::Pro));
    assert_eq!(Plan::parse("platinum"), None);
}

#[test]
fn plan_serializes_lowercase() {
    assert_eq!(serde_json::to_value(Plan::Enterprise).unwrap(), "enterprise");
}

// =============================================================================
// placeholder_email / error text
// =============================================================================

#[test]
fn placeholder_email_from_owner_name() {
    assert_eq!(placeholder_email("John Smith"), "john.smith@example.com");
    assert_eq!(placeholder_email("  "), "owner@example.com");
}

#[test]
fn quota_error_message_names_limit() {
    let err = ApiKeyError::QuotaExceeded { limit: 1000 };
    assert_eq!(err.to_string(), "Monthly usage limit (1000) exceeded. Please upgrade your plan.");
}
