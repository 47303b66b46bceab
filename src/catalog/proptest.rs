//! Property-Based Tests for the Catalog Engine
//!
//! # Test Properties
//!
//! 1. **Paging Completeness**: walking every page yields each key exactly once, in order
//! 2. **Past the End**: pages after the last one are empty
//! 3. **Absence Is False**: a path that does not resolve never matches and never errors
//! 4. **Reconciliation Bounds**: reconciled devices carry only the given resources

#![cfg(test)]

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;
use serde_json::json;

use super::paging::{page_count, window_of};
use super::pathfilter::PathQuery;
use super::DeviceStore;
use crate::adapters::ManualClock;
use crate::domain::{CatalogStorage, Device, Resource, ResourceStorage};

// =============================================================================
// Property Strategies
// =============================================================================

fn keys_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("[a-z]{1,6}/[a-z0-9]{1,6}", 0..120)
        .prop_map(|set| set.into_iter().collect())
}

fn op_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("equals"), Just("prefix"), Just("suffix"), Just("contains")]
}

/// Devices `d0..dN` under one host, each with up to four resources.
fn layout_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0usize..=4, 1..12)
}

fn populate(layout: &[usize]) -> DeviceStore {
    let store = DeviceStore::new(Arc::new(ManualClock::default()));
    for (i, count) in layout.iter().enumerate() {
        let id = format!("host/d{:02}", i);
        let mut device = Device::new(&id, -1);
        device.resources = (0..*count)
            .map(|r| Resource {
                id: format!("{}/r{}", id, r),
                name: format!("r{}", r),
                ..Default::default()
            })
            .collect();
        store.add(device).unwrap();
    }
    store
}

// =============================================================================
// Pagination Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_pages_cover_keys_once(keys in keys_strategy(), per_page in 1usize..=20) {
        let pages = page_count(keys.len(), per_page, 100);
        let mut walked: Vec<String> = Vec::new();
        for page in 1..=pages.max(1) {
            let window = window_of(&keys, page, per_page, 100);
            prop_assert!(window.len() <= per_page);
            walked.extend(window.iter().cloned());
        }
        prop_assert_eq!(walked, keys);
    }

    #[test]
    fn prop_pages_past_end_are_empty(keys in keys_strategy(), per_page in 1usize..=20, extra in 1usize..10) {
        let pages = page_count(keys.len(), per_page, 100);
        prop_assert!(window_of(&keys, pages.max(1) + extra, per_page, 100).is_empty());
    }

    #[test]
    fn prop_store_pages_total_is_unit_count(layout in layout_strategy(), per_page in 1usize..=7) {
        let store = populate(&layout);
        let units: usize = layout.iter().map(|&n| n.max(1)).sum();

        let mut seen_resources = BTreeSet::new();
        let mut seen_devices = BTreeSet::new();
        for page in 1..=page_count(units, per_page, 100) {
            let result = store.get_many(page, per_page).unwrap();
            prop_assert_eq!(result.total, units);
            for device in &result.items {
                seen_devices.insert(device.id.clone());
                for res in &device.resources {
                    prop_assert!(seen_resources.insert(res.id.clone()));
                }
            }
        }
        prop_assert_eq!(seen_devices.len(), layout.len());
        prop_assert_eq!(seen_resources.len(), store.resource_count());
    }
}

// =============================================================================
// Path Query Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_absent_path_is_false(
        missing in "[a-z]{1,8}",
        depth in 0usize..3,
        op in op_strategy(),
        value in ".{0,8}",
    ) {
        let record = json!({
            "id": "host/d1",
            "meta": { "k": "v" },
            "resources": [{ "name": "r" }]
        });
        prop_assume!(!["id", "meta", "resources", "k", "name"].contains(&missing.as_str()));

        let mut path = vec!["meta"; depth];
        path.push(missing.as_str());
        let query = PathQuery::parse(&path.join("."), op, &value).unwrap();
        prop_assert!(!query.matches_value(&record).unwrap());
    }

    #[test]
    fn prop_contains_accepts_substrings(s in "[a-z]{0,12}", start in 0usize..12, len in 0usize..12) {
        let start = start.min(s.len());
        let end = (start + len).min(s.len());
        let record = json!({ "name": s });
        let query = PathQuery::parse("name", "contains", &s[start..end]).unwrap();
        prop_assert!(query.matches_value(&record).unwrap());
    }
}

// =============================================================================
// Reconciliation Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_reconciliation_is_bounded(layout in layout_strategy(), picks in prop::collection::vec(any::<prop::sample::Index>(), 0..10)) {
        let store = populate(&layout);
        let all = store
            .path_filter_resource_many("name", "prefix", "r", 1, 100)
            .unwrap()
            .items;
        prop_assume!(!all.is_empty());

        let mut chosen: Vec<Resource> = picks.iter().map(|i| all[i.index(all.len())].clone()).collect();
        chosen.sort_by(|a, b| a.id.cmp(&b.id));
        chosen.dedup_by(|a, b| a.id == b.id);

        let devices = store.devices_from_resources(&chosen).unwrap();
        let owners: BTreeSet<_> = chosen.iter().map(|r| r.device.clone()).collect();
        prop_assert_eq!(devices.len(), owners.len());

        let returned: usize = devices.iter().map(|d| d.resources.len()).sum();
        prop_assert_eq!(returned, chosen.len());
        for device in &devices {
            for res in &device.resources {
                prop_assert_eq!(&res.device, &device.id);
                prop_assert!(chosen.iter().any(|c| c.id == res.id));
            }
        }
    }
}
