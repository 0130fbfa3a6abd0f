use proptest::prelude::*;

use idv_types::{Feature, Timestamp, UserId, VerificationProvider};

proptest! {
    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }

    /// Timestamp elapsed_since: elapsed_since(now) = now - self (saturating).
    #[test]
    fn timestamp_elapsed_since(base in 0u64..1_000_000, offset in 0u64..1_000_000) {
        let t = Timestamp::new(base);
        let now = Timestamp::new(base + offset);
        prop_assert_eq!(t.elapsed_since(now), offset);
    }

    /// Timestamp has_expired agrees with manual arithmetic.
    #[test]
    fn timestamp_has_expired_correct(
        start in 0u64..500_000,
        duration in 1u64..500_000,
        offset in 0u64..1_000_000,
    ) {
        let t = Timestamp::new(start);
        let now = Timestamp::new(start.saturating_add(offset));
        prop_assert_eq!(t.has_expired(duration, now), offset >= duration);
    }

    /// Well-formed ids are accepted and preserved verbatim.
    #[test]
    fn user_id_accepts_safe_charset(raw in "[A-Za-z0-9_|.@-]{1,128}") {
        let id = UserId::new(raw.clone()).unwrap();
        prop_assert_eq!(id.as_str(), raw.as_str());
    }

    /// Anything containing a slash or whitespace is rejected.
    #[test]
    fn user_id_rejects_separators(prefix in "[a-z]{0,8}", sep in "[/ \t\n]", suffix in "[a-z]{0,8}") {
        let raw = format!("{prefix}{sep}{suffix}");
        prop_assert!(UserId::new(raw).is_err());
    }

    /// Provider parsing never panics and only accepts the two known names.
    #[test]
    fn provider_parse_is_closed(raw in "\\PC{0,16}") {
        match raw.parse::<VerificationProvider>() {
            Ok(p) => prop_assert_eq!(raw.trim().to_ascii_lowercase(), p.as_str()),
            Err(_) => prop_assert!(!["plaid", "persona"].contains(&raw.trim().to_ascii_lowercase().as_str())),
        }
    }
}

#[test]
fn feature_and_provider_names_round_trip() {
    for feature in Feature::ALL {
        assert_eq!(feature.as_str().parse::<Feature>(), Ok(feature));
    }
    for provider in VerificationProvider::ALL {
        assert_eq!(provider.as_str().parse::<VerificationProvider>(), Ok(provider));
    }
}
