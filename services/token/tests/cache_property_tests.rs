//! Property-based tests for token cache freshness.
//!
//! Property 4: Freshness follows `obtained_at + expires_in * 1000 > now + skew`
//! Property 5: The skew boundary itself is stale

use coze_token::storage::{is_fresh, CacheKey, CachedToken, TokenCache, DEFAULT_REFRESH_SKEW_MS};
use coze_token::{ManualClock, ModuleIdentity};
use proptest::prelude::*;
use std::sync::Arc;

/// Generate arbitrary obtain instants (epoch ms, 2020 to 2040).
fn arb_obtained_at() -> impl Strategy<Value = i64> {
    1_577_836_800_000i64..2_208_988_800_000i64
}

/// Generate arbitrary lifetimes (1 second to 1 day).
fn arb_expires_in() -> impl Strategy<Value = i64> {
    1i64..86_400i64
}

/// Generate arbitrary skews (0 to 5 minutes).
fn arb_skew() -> impl Strategy<Value = i64> {
    0i64..300_000i64
}

fn token(obtained_at_ms: i64, expires_in_seconds: i64) -> CachedToken {
    CachedToken {
        access_token: "czs_cached_access_token".to_string(),
        expires_in_seconds,
        obtained_at_ms,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property 4: Freshness matches the expiry inequality
    #[test]
    fn prop_freshness_matches_inequality(
        obtained_at in arb_obtained_at(),
        expires_in in arb_expires_in(),
        skew in arb_skew(),
        offset in -100_000i64..100_000_000i64,
    ) {
        let entry = token(obtained_at, expires_in);
        let now = obtained_at + offset;
        prop_assert_eq!(
            is_fresh(&entry, now, skew),
            obtained_at + expires_in * 1000 > now + skew
        );
    }

    /// Property 5: The boundary is stale, one millisecond earlier is fresh
    #[test]
    fn prop_boundary_is_stale(
        obtained_at in arb_obtained_at(),
        expires_in in arb_expires_in(),
        skew in arb_skew(),
    ) {
        let entry = token(obtained_at, expires_in);
        let boundary = entry.expires_at_ms() - skew;

        prop_assert!(!is_fresh(&entry, boundary, skew));
        prop_assert!(!is_fresh(&entry, boundary + 1, skew));
        prop_assert!(is_fresh(&entry, boundary - 1, skew));
    }

    /// Remaining lifetime never exceeds the declared lifetime.
    #[test]
    fn prop_remaining_seconds_bounded(
        obtained_at in arb_obtained_at(),
        expires_in in arb_expires_in(),
        elapsed in 0i64..86_400_000i64,
    ) {
        let entry = token(obtained_at, expires_in);
        let remaining = entry.remaining_seconds(obtained_at + elapsed);
        prop_assert!(remaining <= expires_in);
        prop_assert_eq!(remaining, (expires_in * 1000 - elapsed).div_euclid(1000));
    }
}

#[test]
fn test_default_skew_boundary() {
    let now = 1_700_000_000_000;
    let skew = DEFAULT_REFRESH_SKEW_MS;

    // Expiry 60001 ms ahead: still fresh.
    assert!(is_fresh(&token(now - 839_999, 900), now, skew));
    // Expiry exactly 60000 ms ahead: stale.
    assert!(!is_fresh(&token(now - 840_000, 900), now, skew));
    // Expiry 59999 ms ahead: stale.
    assert!(!is_fresh(&token(now - 840_001, 900), now, skew));
}

#[test]
fn test_cache_serves_only_fresh_entries() {
    let clock = Arc::new(ManualClock::at_millis(1_700_000_000_000));
    let cache = TokenCache::new(clock.clone(), DEFAULT_REFRESH_SKEW_MS);
    let key = CacheKey::new(ModuleIdentity::Camera, Some("room-1"));

    assert!(cache.get_fresh(&key).is_none());
    cache.put(key.clone(), token(1_700_000_000_000, 900));

    clock.set_millis(1_700_000_839_999);
    assert!(cache.get_fresh(&key).is_some());
    clock.set_millis(1_700_000_840_000);
    assert!(cache.get_fresh(&key).is_none());
    assert!(cache.get(&key).is_some());
}
