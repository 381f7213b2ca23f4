//! Bracket placement state machine.
//!
//! Drives the click-to-place flow: arm the tool, drop an entry with
//! symmetric protective exits, drag any of the three lines, flip the
//! side, then submit one bracket order per active account. A draft
//! survives failed submits so the user can retry or adjust.

use crate::dispatcher::bracket_request;
use crate::error::{ExecError, ExecResult};
use crate::router::DynOrderRouter;
use futures_util::future::join_all;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use tape_core::{AccountId, ActiveAccount, Price, Side, SymbolProfile};
use tracing::{info, warn};

/// Default protective distance, in ticks, on each side of the entry.
pub const BRACKET_TICK_OFFSET: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementPhase {
    Idle,
    /// Armed; waiting for the entry click.
    Active,
    /// Draft exists and is being adjusted.
    Placed,
    /// Fan-out in flight.
    Submitting,
}

/// The three draft lines plus the signed offsets that keep the exits
/// rigid when the entry moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BracketDraft {
    pub side: Side,
    pub entry: Price,
    pub tp: Price,
    pub sl: Price,
    /// `tp - entry`, preserved across entry drags.
    pub tp_offset: Decimal,
    /// `sl - entry`, preserved across entry drags.
    pub sl_offset: Decimal,
}

/// Result of fanning a submit across accounts.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub succeeded: usize,
    pub failed: usize,
    /// Broker details per failed account, verbatim.
    pub failures: Vec<(AccountId, String)>,
}

impl SubmitOutcome {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn is_full_success(&self) -> bool {
        self.failed == 0 && self.succeeded > 0
    }

    /// "k of n" summary for the user report.
    pub fn summary(&self) -> String {
        format!("{} of {} accounts", self.succeeded, self.total())
    }

    fn from_results(results: Vec<(AccountId, ExecResult<()>)>) -> Self {
        let mut outcome = Self {
            succeeded: 0,
            failed: 0,
            failures: Vec::new(),
        };
        for (account, result) in results {
            match result {
                Ok(()) => outcome.succeeded += 1,
                Err(e) => {
                    outcome.failed += 1;
                    outcome.failures.push((account, e.detail()));
                }
            }
        }
        outcome
    }
}

pub struct BracketPlacement {
    profile: SymbolProfile,
    router: DynOrderRouter,
    phase: PlacementPhase,
    draft: Option<BracketDraft>,
    /// Out-of-band escape request, honored on the next operation.
    cancel_requested: AtomicBool,
}

impl BracketPlacement {
    pub fn new(profile: SymbolProfile, router: DynOrderRouter) -> Self {
        Self {
            profile,
            router,
            phase: PlacementPhase::Idle,
            draft: None,
            cancel_requested: AtomicBool::new(false),
        }
    }

    pub fn phase(&self) -> PlacementPhase {
        self.phase
    }

    pub fn draft(&self) -> Option<&BracketDraft> {
        self.draft.as_ref()
    }

    /// Arm the placement tool, clearing any previous draft.
    pub fn activate(&mut self) {
        self.draft = None;
        self.cancel_requested.store(false, Ordering::SeqCst);
        self.phase = PlacementPhase::Active;
    }

    /// Full reset. Reachable from every phase.
    pub fn deactivate(&mut self) {
        self.draft = None;
        self.cancel_requested.store(false, Ordering::SeqCst);
        self.phase = PlacementPhase::Idle;
    }

    /// Request deactivation from outside the placement flow (escape
    /// key). Takes effect on the next operation.
    pub fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
    }

    fn honor_cancel(&mut self) -> bool {
        if self.cancel_requested.swap(false, Ordering::SeqCst) {
            self.deactivate();
            true
        } else {
            false
        }
    }

    /// Drop the entry line at a clicked price.
    ///
    /// Side is inferred from the market: clicking below it means a
    /// buy, at or above means a sell. Exits start symmetric at
    /// [`BRACKET_TICK_OFFSET`] ticks, oriented by side.
    pub fn place_entry(&mut self, clicked: Price, market: Price) -> ExecResult<()> {
        if self.honor_cancel() {
            return Ok(());
        }
        if self.phase != PlacementPhase::Active {
            return Err(ExecError::InvalidState(format!(
                "place_entry requires Active, was {:?}",
                self.phase
            )));
        }

        let entry = self.profile.round_to_tick(clicked);
        let side = if entry < market { Side::Buy } else { Side::Sell };
        let offset = self.profile.tick_offset(BRACKET_TICK_OFFSET).inner();
        let (tp_offset, sl_offset) = match side {
            Side::Buy => (offset, -offset),
            Side::Sell => (-offset, offset),
        };

        self.draft = Some(BracketDraft {
            side,
            entry,
            tp: Price::new(entry.inner() + tp_offset),
            sl: Price::new(entry.inner() + sl_offset),
            tp_offset,
            sl_offset,
        });
        self.phase = PlacementPhase::Placed;
        Ok(())
    }

    /// Drag the entry line. Exits shift rigidly by the stored offsets.
    pub fn update_entry(&mut self, price: Price) -> ExecResult<()> {
        if self.honor_cancel() {
            return Ok(());
        }
        let profile = self.profile.clone();
        let draft = self.draft_mut()?;
        let entry = profile.round_to_tick(price);
        draft.entry = entry;
        draft.tp = Price::new(entry.inner() + draft.tp_offset);
        draft.sl = Price::new(entry.inner() + draft.sl_offset);
        Ok(())
    }

    /// Drag the take-profit line; recomputes only its offset.
    pub fn update_tp(&mut self, price: Price) -> ExecResult<()> {
        if self.honor_cancel() {
            return Ok(());
        }
        let profile = self.profile.clone();
        let draft = self.draft_mut()?;
        draft.tp = profile.round_to_tick(price);
        draft.tp_offset = draft.tp.inner() - draft.entry.inner();
        Ok(())
    }

    /// Drag the stop-loss line; recomputes only its offset.
    pub fn update_sl(&mut self, price: Price) -> ExecResult<()> {
        if self.honor_cancel() {
            return Ok(());
        }
        let profile = self.profile.clone();
        let draft = self.draft_mut()?;
        draft.sl = profile.round_to_tick(price);
        draft.sl_offset = draft.sl.inner() - draft.entry.inner();
        Ok(())
    }

    /// Flip the draft's side, exchanging the exit roles. Applying it
    /// twice restores the original draft.
    pub fn toggle_side(&mut self) -> ExecResult<()> {
        if self.honor_cancel() {
            return Ok(());
        }
        let draft = self.draft_mut()?;
        draft.side = draft.side.opposite();
        std::mem::swap(&mut draft.tp, &mut draft.sl);
        std::mem::swap(&mut draft.tp_offset, &mut draft.sl_offset);
        Ok(())
    }

    /// Submit the draft as one bracket order per active account.
    ///
    /// `side_override` replaces the draft's inferred side at submit
    /// time (a hotkey submit can force the direction); `None` keeps
    /// the draft's side. All requests run concurrently and every one
    /// settles; a single rejection never aborts the rest. Any success
    /// completes the placement (partial results are not retryable,
    /// the filled accounts already have orders). Total failure keeps
    /// the draft.
    pub async fn submit(
        &mut self,
        symbol: &str,
        side_override: Option<Side>,
        accounts: &[ActiveAccount],
    ) -> ExecResult<SubmitOutcome> {
        if self.honor_cancel() {
            return Err(ExecError::InvalidState("placement cancelled".into()));
        }
        let draft = *self
            .draft
            .as_ref()
            .ok_or_else(|| ExecError::InvalidState("no draft to submit".into()))?;
        if accounts.is_empty() {
            return Err(ExecError::NoActiveAccounts);
        }

        self.phase = PlacementPhase::Submitting;
        let side = side_override.unwrap_or(draft.side);

        let futures = accounts.iter().map(|account| {
            let request = bracket_request(
                account.account_id.clone(),
                symbol.to_string(),
                side,
                draft.entry,
                draft.tp,
                draft.sl,
                account.quantity,
                account.time_in_force,
            );
            let router = self.router.clone();
            let account_id = account.account_id.clone();
            async move {
                let result = router.place_bracket(request).await;
                (account_id, result)
            }
        });

        let outcome = SubmitOutcome::from_results(join_all(futures).await);

        if outcome.succeeded > 0 {
            info!(summary = %outcome.summary(), symbol, "bracket submitted");
            self.deactivate();
        } else {
            warn!(summary = %outcome.summary(), symbol, "bracket submit failed on all accounts");
            self.phase = PlacementPhase::Placed;
        }
        Ok(outcome)
    }

    fn draft_mut(&mut self) -> ExecResult<&mut BracketDraft> {
        if self.phase != PlacementPhase::Placed {
            return Err(ExecError::InvalidState(format!(
                "draft operation requires Placed, was {:?}",
                self.phase
            )));
        }
        self.draft
            .as_mut()
            .ok_or_else(|| ExecError::InvalidState("placed without draft".into()))
    }
}

/// Fan a single plain order out across active accounts.
///
/// Same settle-all semantics as the bracket submit: every request
/// runs, per-account failures are collected, nothing is thrown.
pub async fn place_multi_order(
    router: &DynOrderRouter,
    accounts: &[ActiveAccount],
    request_for: impl Fn(&ActiveAccount) -> crate::router::OrderRequest,
) -> ExecResult<SubmitOutcome> {
    if accounts.is_empty() {
        return Err(ExecError::NoActiveAccounts);
    }

    let futures = accounts.iter().map(|account| {
        let request = request_for(account);
        let router = router.clone();
        let account_id = account.account_id.clone();
        async move {
            let result = router.place_order(request).await;
            (account_id, result)
        }
    });

    Ok(SubmitOutcome::from_results(join_all(futures).await))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{MockOrderRouter, RouterCall};
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tape_core::Qty;

    fn nq_profile() -> SymbolProfile {
        SymbolProfile::new("NQ", dec!(0.25), dec!(20))
    }

    fn placement() -> (Arc<MockOrderRouter>, BracketPlacement) {
        let router = Arc::new(MockOrderRouter::new());
        let placement = BracketPlacement::new(nq_profile(), router.clone());
        (router, placement)
    }

    fn accounts(n: usize) -> Vec<ActiveAccount> {
        (1..=n)
            .map(|i| ActiveAccount::new(format!("ACC-{i}"), format!("Sim {i}"), Qty::new(dec!(1))))
            .collect()
    }

    #[test]
    fn test_entry_below_market_is_buy() {
        let (_, mut placement) = placement();
        placement.activate();
        placement
            .place_entry(Price::new(dec!(20990)), Price::new(dec!(21000)))
            .unwrap();

        let draft = placement.draft().unwrap();
        assert_eq!(draft.side, Side::Buy);
        // 20 ticks of 0.25 = 5 points each way
        assert_eq!(draft.tp.inner(), dec!(20995));
        assert_eq!(draft.sl.inner(), dec!(20985));
        assert_eq!(placement.phase(), PlacementPhase::Placed);
    }

    #[test]
    fn test_entry_above_market_is_sell() {
        let (_, mut placement) = placement();
        placement.activate();
        placement
            .place_entry(Price::new(dec!(21010)), Price::new(dec!(21000)))
            .unwrap();

        let draft = placement.draft().unwrap();
        assert_eq!(draft.side, Side::Sell);
        // Short: TP below, SL above
        assert_eq!(draft.tp.inner(), dec!(21005));
        assert_eq!(draft.sl.inner(), dec!(21015));
    }

    #[test]
    fn test_entry_snaps_to_tick() {
        let (_, mut placement) = placement();
        placement.activate();
        placement
            .place_entry(Price::new(dec!(20990.37)), Price::new(dec!(21000)))
            .unwrap();
        assert_eq!(placement.draft().unwrap().entry.inner(), dec!(20990.25));
    }

    #[test]
    fn test_entry_drag_shifts_exits_rigidly() {
        let (_, mut placement) = placement();
        placement.activate();
        placement
            .place_entry(Price::new(dec!(20990)), Price::new(dec!(21000)))
            .unwrap();
        // Widen the stop to 10 points before dragging
        placement.update_sl(Price::new(dec!(20980))).unwrap();

        placement.update_entry(Price::new(dec!(20900))).unwrap();
        let draft = placement.draft().unwrap();
        // Offsets preserved: +5 and -10
        assert_eq!(draft.tp.inner(), dec!(20905));
        assert_eq!(draft.sl.inner(), dec!(20890));
    }

    #[test]
    fn test_exit_drag_recomputes_only_its_offset() {
        let (_, mut placement) = placement();
        placement.activate();
        placement
            .place_entry(Price::new(dec!(20990)), Price::new(dec!(21000)))
            .unwrap();
        placement.update_tp(Price::new(dec!(21000))).unwrap();

        let draft = placement.draft().unwrap();
        assert_eq!(draft.tp_offset, dec!(10));
        assert_eq!(draft.sl_offset, dec!(-5));
    }

    #[test]
    fn test_toggle_side_is_involutive() {
        let (_, mut placement) = placement();
        placement.activate();
        placement
            .place_entry(Price::new(dec!(20990)), Price::new(dec!(21000)))
            .unwrap();
        let before = *placement.draft().unwrap();

        placement.toggle_side().unwrap();
        let flipped = *placement.draft().unwrap();
        assert_eq!(flipped.side, Side::Sell);
        assert_eq!(flipped.tp, before.sl);
        assert_eq!(flipped.sl, before.tp);

        placement.toggle_side().unwrap();
        assert_eq!(*placement.draft().unwrap(), before);
    }

    #[test]
    fn test_place_entry_requires_active() {
        let (_, mut placement) = placement();
        let err = placement
            .place_entry(Price::new(dec!(20990)), Price::new(dec!(21000)))
            .unwrap_err();
        assert!(matches!(err, ExecError::InvalidState(_)));
    }

    #[test]
    fn test_escape_cancels_on_next_operation() {
        let (_, mut placement) = placement();
        placement.activate();
        placement.request_cancel();

        placement
            .place_entry(Price::new(dec!(20990)), Price::new(dec!(21000)))
            .unwrap();
        assert_eq!(placement.phase(), PlacementPhase::Idle);
        assert!(placement.draft().is_none());
    }

    #[tokio::test]
    async fn test_submit_full_success_deactivates() {
        let (router, mut placement) = placement();
        placement.activate();
        placement
            .place_entry(Price::new(dec!(20990)), Price::new(dec!(21000)))
            .unwrap();

        let outcome = placement.submit("NQ", None, &accounts(3)).await.unwrap();
        assert!(outcome.is_full_success());
        assert_eq!(outcome.summary(), "3 of 3 accounts");
        assert_eq!(router.calls().len(), 3);
        assert_eq!(placement.phase(), PlacementPhase::Idle);
    }

    #[tokio::test]
    async fn test_submit_partial_success_completes() {
        let (router, mut placement) = placement();
        router.fail_account("ACC-2");
        placement.activate();
        placement
            .place_entry(Price::new(dec!(20990)), Price::new(dec!(21000)))
            .unwrap();

        let outcome = placement.submit("NQ", None, &accounts(3)).await.unwrap();
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.summary(), "2 of 3 accounts");
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].0, AccountId::new("ACC-2"));
        // Partial success is completed, not retryable
        assert_eq!(placement.phase(), PlacementPhase::Idle);
        assert!(placement.draft().is_none());
    }

    #[tokio::test]
    async fn test_submit_total_failure_keeps_draft() {
        let (router, mut placement) = placement();
        router.fail_account("ACC-1");
        placement.activate();
        placement
            .place_entry(Price::new(dec!(20990)), Price::new(dec!(21000)))
            .unwrap();

        let outcome = placement.submit("NQ", None, &accounts(1)).await.unwrap();
        assert_eq!(outcome.succeeded, 0);
        assert_eq!(placement.phase(), PlacementPhase::Placed);
        assert!(placement.draft().is_some());
    }

    #[tokio::test]
    async fn test_submit_without_accounts_is_reported() {
        let (router, mut placement) = placement();
        placement.activate();
        placement
            .place_entry(Price::new(dec!(20990)), Price::new(dec!(21000)))
            .unwrap();

        let err = placement.submit("NQ", None, &[]).await.unwrap_err();
        assert!(matches!(err, ExecError::NoActiveAccounts));
        // No transition, no requests
        assert_eq!(placement.phase(), PlacementPhase::Placed);
        assert!(router.calls().is_empty());
    }

    #[tokio::test]
    async fn test_submit_uses_per_account_quantity() {
        let (router, mut placement) = placement();
        let mut accounts = accounts(2);
        accounts[1].quantity = Qty::new(dec!(5));
        placement.activate();
        placement
            .place_entry(Price::new(dec!(20990)), Price::new(dec!(21000)))
            .unwrap();

        placement.submit("NQ", None, &accounts).await.unwrap();
        let quantities: Vec<_> = router
            .calls()
            .into_iter()
            .map(|c| match c {
                RouterCall::Bracket(b) => (b.account_id, b.quantity),
                other => panic!("unexpected call {other:?}"),
            })
            .collect();
        assert!(quantities.contains(&(AccountId::new("ACC-1"), Qty::new(dec!(1)))));
        assert!(quantities.contains(&(AccountId::new("ACC-2"), Qty::new(dec!(5)))));
    }

    #[tokio::test]
    async fn test_submit_side_override_replaces_draft_side() {
        let (router, mut placement) = placement();
        placement.activate();
        // Below market infers Buy
        placement
            .place_entry(Price::new(dec!(20990)), Price::new(dec!(21000)))
            .unwrap();
        assert_eq!(placement.draft().unwrap().side, Side::Buy);

        placement
            .submit("NQ", Some(Side::Sell), &accounts(1))
            .await
            .unwrap();
        match &router.calls()[0] {
            RouterCall::Bracket(b) => assert_eq!(b.side, Side::Sell),
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_place_multi_order_fan_out() {
        use tape_core::{OrderType, TimeInForce};
        use uuid::Uuid;

        let router: DynOrderRouter = Arc::new(MockOrderRouter::new());
        let accounts = accounts(2);
        let outcome = place_multi_order(&router, &accounts, |account| crate::router::OrderRequest {
            account_id: account.account_id.clone(),
            symbol: "NQ".into(),
            side: Side::Buy,
            order_type: OrderType::Market,
            quantity: account.quantity,
            limit_price: None,
            stop_price: None,
            time_in_force: TimeInForce::GoodTilCancelled,
            client_id: Uuid::new_v4(),
        })
        .await
        .unwrap();

        assert_eq!(outcome.summary(), "2 of 2 accounts");
    }
}
