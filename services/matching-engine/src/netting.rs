//! Netting math
//!
//! An incoming order consumes pending flow on the opposite side first; the
//! remainder is what a liquidity provider would have to fill, and it joins
//! the pending flow on the order's own side.

use rust_decimal::Decimal;
use types::errors::ValidationError;
use types::ledger::PendingFlow;
use types::matching::MatchType;
use types::numeric::Grams;
use types::order::Side;

/// How an order splits between internal netting and the LP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Netting {
    pub matched_grams: Grams,
    pub lp_grams: Grams,
    pub match_type: MatchType,
}

/// Split `grams` against the opposite side's pending flow
pub fn net(flow: &PendingFlow, side: Side, grams: Grams) -> Netting {
    let opposite = flow.pending(side.opposite());
    let matched_grams = grams.min(opposite);
    let lp_grams = grams.saturating_sub(matched_grams);

    let match_type = if matched_grams.is_zero() {
        MatchType::NONE
    } else if matched_grams == grams {
        MatchType::FULL
    } else {
        MatchType::PARTIAL
    };

    Netting {
        matched_grams,
        lp_grams,
        match_type,
    }
}

/// Consume matched opposite flow and add the remainder to own-side flow.
///
/// On error the flow is left untouched.
pub fn apply(flow: &mut PendingFlow, side: Side, netting: &Netting) -> Result<(), ValidationError> {
    let own = flow
        .pending(side)
        .checked_add(netting.lp_grams)
        .ok_or_else(|| ValidationError::overflow("pending flow"))?;
    *flow.pending_mut(side) = own;

    let opposite = flow.pending_mut(side.opposite());
    *opposite = opposite.saturating_sub(netting.matched_grams);
    Ok(())
}

/// `matched_grams × structural_spread`
pub fn spread_captured(matched_grams: Grams, structural_spread: Decimal) -> Result<Decimal, ValidationError> {
    matched_grams
        .checked_mul(structural_spread)
        .ok_or_else(|| ValidationError::overflow("spread captured"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::metal::Metal;

    fn flow(buy: u64, sell: u64) -> PendingFlow {
        let mut f = PendingFlow::new(Metal::XAU);
        f.pending_buy_grams = Grams::from_u64(buy);
        f.pending_sell_grams = Grams::from_u64(sell);
        f
    }

    #[test]
    fn test_no_opposite_flow() {
        let n = net(&flow(0, 0), Side::BUY, Grams::from_u64(10));
        assert_eq!(n.match_type, MatchType::NONE);
        assert_eq!(n.matched_grams, Grams::zero());
        assert_eq!(n.lp_grams, Grams::from_u64(10));
    }

    #[test]
    fn test_full_match() {
        let n = net(&flow(10, 0), Side::SELL, Grams::from_u64(6));
        assert_eq!(n.match_type, MatchType::FULL);
        assert_eq!(n.matched_grams, Grams::from_u64(6));
        assert_eq!(n.lp_grams, Grams::zero());
    }

    #[test]
    fn test_exact_match_is_full() {
        let n = net(&flow(0, 7), Side::BUY, Grams::from_u64(7));
        assert_eq!(n.match_type, MatchType::FULL);
    }

    #[test]
    fn test_partial_match() {
        let n = net(&flow(0, 4), Side::BUY, Grams::from_u64(10));
        assert_eq!(n.match_type, MatchType::PARTIAL);
        assert_eq!(n.matched_grams, Grams::from_u64(4));
        assert_eq!(n.lp_grams, Grams::from_u64(6));
    }

    #[test]
    fn test_same_side_flow_is_ignored() {
        let n = net(&flow(50, 0), Side::BUY, Grams::from_u64(5));
        assert_eq!(n.match_type, MatchType::NONE);
    }

    #[test]
    fn test_apply_moves_flow() {
        let mut f = flow(0, 4);
        let n = net(&f, Side::BUY, Grams::from_u64(10));
        apply(&mut f, Side::BUY, &n).unwrap();
        assert_eq!(f.pending_sell_grams, Grams::zero());
        assert_eq!(f.pending_buy_grams, Grams::from_u64(6));
    }

    #[test]
    fn test_spread_captured() {
        let spread = Decimal::from_str_exact("0.25").unwrap();
        assert_eq!(
            spread_captured(Grams::from_u64(6), spread).unwrap(),
            Decimal::from_str_exact("1.50").unwrap()
        );
        assert_eq!(spread_captured(Grams::zero(), spread).unwrap(), Decimal::ZERO);
        assert!(spread_captured(Grams::new(Decimal::MAX), Decimal::TEN).is_err());
    }

    #[test]
    fn test_apply_overflow_leaves_flow_untouched() {
        let mut f = flow(0, 0);
        f.pending_buy_grams = Grams::new(Decimal::MAX);
        let before = f.clone();
        let n = net(&f, Side::BUY, Grams::from_u64(1));
        assert!(apply(&mut f, Side::BUY, &n).is_err());
        assert_eq!(f, before);
    }
}
