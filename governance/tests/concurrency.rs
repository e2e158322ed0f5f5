//! Concurrent access to shared state.

use std::sync::Arc;
use std::thread;

use governance::{AuditLog, AuditQuery, AuditRecord, GovernanceConfig, Subsystem, WeightKey, WeightTable};

#[test]
fn same_key_updates_are_serialized() {
    let audit = Arc::new(AuditLog::new());
    let table = Arc::new(WeightTable::new(GovernanceConfig::default().weights, audit.clone()));
    let key = WeightKey::new("p1", "t1");

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let table = table.clone();
            let key = key.clone();
            thread::spawn(move || {
                let delta = if i % 2 == 0 { 7.0 } else { -3.0 };
                for _ in 0..200 {
                    let score = table.review_adjust(&key, delta, "load-test");
                    assert!((0.0..=100.0).contains(&score));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let final_score = table.get_score("p1", "t1");
    assert!((0.0..=100.0).contains(&final_score));

    // Audit history for the key chains: each entry starts where the previous ended
    let entries = audit.entries_for(&key.to_string());
    assert!(!entries.is_empty());
    assert_eq!(entries[0].before.as_f64(), Some(50.0));
    for pair in entries.windows(2) {
        assert_eq!(pair[0].after, pair[1].before);
    }
    assert_eq!(entries.last().unwrap().after.as_f64(), Some(final_score));
}

#[test]
fn different_keys_proceed_independently() {
    let audit = Arc::new(AuditLog::new());
    let table = Arc::new(WeightTable::new(GovernanceConfig::default().weights, audit.clone()));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let table = table.clone();
            thread::spawn(move || {
                let key = WeightKey::new("p1", format!("t{}", i));
                table.review_adjust(&key, 1.0, "load-test");
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(table.len(), 16);
    assert!(table.snapshot().iter().all(|e| e.score == 51.0));
    assert_eq!(audit.len(), 16);
}

#[test]
fn audit_order_per_subsystem_under_contention() {
    let audit = Arc::new(AuditLog::new());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let audit = audit.clone();
            thread::spawn(move || {
                let subsystem = if i % 2 == 0 { Subsystem::Compliance } else { Subsystem::Routing };
                for n in 0..100 {
                    audit.append(AuditRecord::new(subsystem, format!("s{}", n % 5), "test", "load"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(audit.len(), 800);
    for subsystem in [Subsystem::Compliance, Subsystem::Routing] {
        let entries = audit.query(&AuditQuery::default().subsystem(subsystem));
        assert_eq!(entries.len(), 400);
        assert!(entries.windows(2).all(|w| w[0].sequence < w[1].sequence));
        assert!(entries.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }
}
