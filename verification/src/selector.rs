//! Region-to-provider selection.
//!
//! A user's provider is chosen once and stored. Until then it is derived
//! from the calling code of their phone number. The stored value always
//! wins: switching providers would orphan a verification already running
//! or completed under the other one.

use idv_store::{RecordStore, StoreError};
use idv_types::{Region, Timestamp, UserId, VerificationProvider};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Calling-code prefixes (without `+`) and their routing region.
///
/// ITU calling codes are prefix-free within this set except for `52` vs
/// `50x`, which never overlap; lookup still takes the longest match.
const CALLING_CODES: &[(&str, Region)] = &[
    ("1", Region::NorthAmerica),
    ("52", Region::CentralAmerica),
    ("502", Region::CentralAmerica),
    ("503", Region::CentralAmerica),
    ("504", Region::CentralAmerica),
    ("505", Region::CentralAmerica),
    ("506", Region::CentralAmerica),
    ("507", Region::CentralAmerica),
    ("51", Region::SouthAmerica),
    ("54", Region::SouthAmerica),
    ("55", Region::SouthAmerica),
    ("56", Region::SouthAmerica),
    ("57", Region::SouthAmerica),
    ("58", Region::SouthAmerica),
    ("591", Region::SouthAmerica),
    ("593", Region::SouthAmerica),
    ("34", Region::Spain),
];

/// What the selector needs to know about a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    /// E.164-ish phone number, e.g. `+54 9 11 1234-5678`.
    pub phone_number: Option<String>,
}

impl UserProfile {
    pub fn new(user_id: UserId, phone_number: Option<String>) -> Self {
        Self {
            user_id,
            phone_number,
        }
    }
}

/// Strip formatting and return the digits after the international prefix.
///
/// Returns `None` unless the number is in international form (`+` or `00`).
fn international_digits(phone: &str) -> Option<String> {
    let compact: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();
    let digits = compact
        .strip_prefix('+')
        .or_else(|| compact.strip_prefix("00"))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(digits.to_string())
}

/// Routing region for a phone number. Unparseable numbers are [`Region::Other`].
pub fn region_for_phone(phone: &str) -> Region {
    let Some(digits) = international_digits(phone) else {
        return Region::Other;
    };
    CALLING_CODES
        .iter()
        .filter(|(code, _)| digits.starts_with(code))
        .max_by_key(|(code, _)| code.len())
        .map(|(_, region)| *region)
        .unwrap_or(Region::Other)
}

/// Provider for a user with no stored preference.
pub fn derive_provider(phone: Option<&str>) -> VerificationProvider {
    phone.map(region_for_phone).unwrap_or(Region::Other).provider()
}

/// Picks and persists the verification provider for a user.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProviderSelector;

impl ProviderSelector {
    /// Return the user's provider, deriving and storing it on first use.
    ///
    /// The write goes through [`RecordStore::assign_provider_if_unset`], so
    /// concurrent first calls still converge on a single stored provider and
    /// later calls never write.
    pub fn select(
        &self,
        records: &dyn RecordStore,
        profile: &UserProfile,
        now: Timestamp,
    ) -> Result<VerificationProvider, StoreError> {
        if let Some(provider) = records
            .get_record(&profile.user_id)?
            .and_then(|record| record.provider)
        {
            debug!(user = %profile.user_id, %provider, "using stored verification provider");
            return Ok(provider);
        }

        let region = profile
            .phone_number
            .as_deref()
            .map(region_for_phone)
            .unwrap_or(Region::Other);
        let derived = region.provider();
        let stored = records.assign_provider_if_unset(&profile.user_id, derived, now)?;

        info!(
            user = %profile.user_id,
            region = region.as_str(),
            provider = %stored,
            "assigned verification provider"
        );
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use idv_store::UserVerificationRecord;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingStore {
        records: Mutex<HashMap<UserId, UserVerificationRecord>>,
        writes: Mutex<u32>,
    }

    impl RecordStore for CountingStore {
        fn get_record(&self, user: &UserId) -> Result<Option<UserVerificationRecord>, StoreError> {
            Ok(self.records.lock().unwrap().get(user).cloned())
        }

        fn put_record(&self, record: &UserVerificationRecord) -> Result<(), StoreError> {
            *self.writes.lock().unwrap() += 1;
            self.records
                .lock()
                .unwrap()
                .insert(record.user_id.clone(), record.clone());
            Ok(())
        }

        fn assign_provider_if_unset(
            &self,
            user: &UserId,
            provider: VerificationProvider,
            now: Timestamp,
        ) -> Result<VerificationProvider, StoreError> {
            let mut records = self.records.lock().unwrap();
            let record = records
                .entry(user.clone())
                .or_insert_with(|| UserVerificationRecord::new(user.clone(), now));
            if let Some(existing) = record.provider {
                return Ok(existing);
            }
            record.provider = Some(provider);
            *self.writes.lock().unwrap() += 1;
            Ok(provider)
        }
    }

    fn profile(phone: Option<&str>) -> UserProfile {
        UserProfile::new(UserId::new("user-1").unwrap(), phone.map(str::to_string))
    }

    #[test]
    fn calling_code_regions() {
        assert_eq!(region_for_phone("+1 415 555 0100"), Region::NorthAmerica);
        assert_eq!(region_for_phone("+52 55 1234 5678"), Region::CentralAmerica);
        assert_eq!(region_for_phone("+502 2345 6789"), Region::CentralAmerica);
        assert_eq!(region_for_phone("+507-6000-0000"), Region::CentralAmerica);
        assert_eq!(region_for_phone("+54 9 11 1234-5678"), Region::SouthAmerica);
        assert_eq!(region_for_phone("+593 99 123 4567"), Region::SouthAmerica);
        assert_eq!(region_for_phone("+591 7 1234567"), Region::SouthAmerica);
        assert_eq!(region_for_phone("+34 612 34 56 78"), Region::Spain);
        assert_eq!(region_for_phone("+44 20 7946 0958"), Region::Other);
        assert_eq!(region_for_phone("+508 41 23 45"), Region::Other);
    }

    #[test]
    fn double_zero_prefix_counts_as_international() {
        assert_eq!(region_for_phone("0052 55 1234 5678"), Region::CentralAmerica);
    }

    #[test]
    fn national_or_garbage_numbers_default_to_other() {
        assert_eq!(region_for_phone("5551234"), Region::Other);
        assert_eq!(region_for_phone("+"), Region::Other);
        assert_eq!(region_for_phone("+52abc"), Region::Other);
        assert_eq!(derive_provider(None), VerificationProvider::Plaid);
    }

    #[test]
    fn mexico_routes_to_persona_and_us_to_plaid() {
        let store = CountingStore::default();
        let p = ProviderSelector
            .select(&store, &profile(Some("+5215512345678")), Timestamp::new(1))
            .unwrap();
        assert_eq!(p, VerificationProvider::Persona);

        let store = CountingStore::default();
        let p = ProviderSelector
            .select(&store, &profile(Some("+14155550100")), Timestamp::new(1))
            .unwrap();
        assert_eq!(p, VerificationProvider::Plaid);
    }

    #[test]
    fn second_call_short_circuits_without_writing() {
        let store = CountingStore::default();
        let user = profile(Some("+5491112345678"));
        let first = ProviderSelector.select(&store, &user, Timestamp::new(1)).unwrap();
        let second = ProviderSelector.select(&store, &user, Timestamp::new(2)).unwrap();
        assert_eq!(first, second);
        assert_eq!(*store.writes.lock().unwrap(), 1);
    }

    #[test]
    fn stored_preference_beats_phone_number() {
        let store = CountingStore::default();
        let mut record = UserVerificationRecord::new(UserId::new("user-1").unwrap(), Timestamp::new(0));
        record.provider = Some(VerificationProvider::Plaid);
        store.put_record(&record).unwrap();
        *store.writes.lock().unwrap() = 0;

        let p = ProviderSelector
            .select(&store, &profile(Some("+56 9 1234 5678")), Timestamp::new(1))
            .unwrap();
        assert_eq!(p, VerificationProvider::Plaid);
        assert_eq!(*store.writes.lock().unwrap(), 0);
    }
}
