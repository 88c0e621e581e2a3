//! Matching scenarios for the Matching Engine
//!
//! Tests include:
//! - Buy with no prior flow, then an opposing sell (stored results frozen)
//! - Conservation: Σ matched ≤ min(Σ buy, Σ sell) for any order sequence
//! - Concurrent submissions from many threads on one metal
//! - Concurrent resubmission of one order id nets it once

use std::sync::{Arc, Barrier};
use std::thread;

use ledger_store::InMemoryLedgerStore;
use matching_engine::MatchingEngine;
use proptest::prelude::*;
use rust_decimal::Decimal;
use types::errors::{CoreError, StoreError};
use types::ids::ClientId;
use types::matching::{MatchResult, MatchType};
use types::metal::Metal;
use types::numeric::{Grams, Price};
use types::order::{Order, Side};

fn engine() -> MatchingEngine {
    let engine = MatchingEngine::new(Arc::new(InMemoryLedgerStore::new()));
    engine.bootstrap(Metal::XAU).unwrap();
    engine
}

fn submit(engine: &MatchingEngine, side: Side, grams: u64) -> MatchResult {
    engine
        .submit_for_matching(
            side,
            Metal::XAU,
            Grams::from_u64(grams),
            Price::from_u64(80),
            ClientId::new(format!("client-{}", side.as_str())),
            "EUR",
        )
        .unwrap()
}

#[test]
fn test_buy_then_opposing_sell() {
    let engine = engine();

    let a = submit(&engine, Side::BUY, 10);
    assert!(!a.matched);
    assert_eq!(a.matched_grams, Grams::zero());
    assert_eq!(a.match_type, MatchType::NONE);
    assert!(a.requires_lp);
    assert_eq!(a.lp_grams, Grams::from_u64(10));
    assert_eq!(
        engine.pending_flow(Metal::XAU).unwrap().pending_buy_grams,
        Grams::from_u64(10)
    );

    let b = submit(&engine, Side::SELL, 6);
    assert!(b.matched);
    assert_eq!(b.matched_grams, Grams::from_u64(6));
    assert_eq!(b.match_type, MatchType::FULL);
    assert!(!b.requires_lp);
    assert_eq!(b.lp_grams, Grams::zero());
    assert_eq!(
        engine.pending_flow(Metal::XAU).unwrap().pending_buy_grams,
        Grams::from_u64(4)
    );

    // A's result was fixed at submission
    let stored_a = engine.match_result(a.order_id).unwrap().unwrap();
    assert_eq!(stored_a.lp_grams, Grams::from_u64(10));
    assert!(!stored_a.matched);
}

#[test]
fn test_metals_are_independent() {
    let engine = engine();
    engine.bootstrap(Metal::XAG).unwrap();

    submit(&engine, Side::BUY, 5);
    let silver = engine
        .submit_for_matching(
            Side::SELL,
            Metal::XAG,
            Grams::from_u64(5),
            Price::from_u64(1),
            ClientId::new("c"),
            "EUR",
        )
        .unwrap();
    assert_eq!(silver.match_type, MatchType::NONE);
}

proptest! {
    #[test]
    fn prop_matched_never_exceeds_either_side(
        orders in prop::collection::vec((any::<bool>(), 1u64..100), 1..50),
    ) {
        let engine = engine();
        let mut total_buy = Decimal::ZERO;
        let mut total_sell = Decimal::ZERO;
        let mut total_matched = Decimal::ZERO;

        for (is_buy, grams) in &orders {
            let side = if *is_buy { Side::BUY } else { Side::SELL };
            let result = submit(&engine, side, *grams);
            prop_assert!(result.check_invariant());

            match side {
                Side::BUY => total_buy += Decimal::from(*grams),
                Side::SELL => total_sell += Decimal::from(*grams),
            }
            total_matched += result.matched_grams.as_decimal();
            prop_assert!(total_matched <= total_buy.min(total_sell));
        }

        // Whatever was not matched on either side is still pending
        let flow = engine.pending_flow(Metal::XAU).unwrap();
        prop_assert_eq!(flow.pending_buy_grams.as_decimal(), total_buy - total_matched);
        prop_assert_eq!(flow.pending_sell_grams.as_decimal(), total_sell - total_matched);
    }
}

#[test]
fn test_concurrent_submissions_conserve_grams() {
    let engine = Arc::new(engine());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let side = if i % 2 == 0 { Side::BUY } else { Side::SELL };
            thread::spawn(move || {
                let mut matched = Decimal::ZERO;
                for _ in 0..25 {
                    // Contention is surfaced, not hidden; retry like a caller would
                    let result = loop {
                        match engine.submit_for_matching(
                            side,
                            Metal::XAU,
                            Grams::from_u64(2),
                            Price::from_u64(80),
                            ClientId::new("c"),
                            "EUR",
                        ) {
                            Ok(r) => break r,
                            Err(e) if e.is_transient() => continue,
                            Err(e) => panic!("unexpected error: {e}"),
                        }
                    };
                    matched += result.matched_grams.as_decimal();
                }
                matched
            })
        })
        .collect();

    let total_matched: Decimal = handles.into_iter().map(|h| h.join().unwrap()).sum();
    let flow = engine.pending_flow(Metal::XAU).unwrap();

    // 4 threads × 25 × 2g per side
    let per_side = Decimal::from(200);
    assert_eq!(flow.pending_buy_grams.as_decimal(), per_side - total_matched);
    assert_eq!(flow.pending_sell_grams.as_decimal(), per_side - total_matched);
}

#[test]
fn test_concurrent_resubmission_nets_once() {
    for _ in 0..200 {
        let engine = Arc::new(engine());
        let order = Order::new(
            ClientId::new("client-1"),
            Metal::XAU,
            Side::BUY,
            Grams::from_u64(5),
            Price::from_u64(80),
            "EUR",
            1708123456789000000,
        );
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let barrier = Arc::clone(&barrier);
                let order = order.clone();
                thread::spawn(move || {
                    barrier.wait();
                    engine.submit_order(&order)
                })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            match handle.join().unwrap() {
                Ok(result) => results.push(result),
                Err(CoreError::TransientStore(StoreError::InFlight { .. })) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(
            engine.pending_flow(Metal::XAU).unwrap().pending_buy_grams,
            Grams::from_u64(5)
        );
        assert!(!results.is_empty());
        let stored = engine.match_result(order.order_id).unwrap().unwrap();
        assert!(results.iter().all(|r| *r == stored));
    }
}
