//! Pure transform from broker state to renderable overlay lines.
//!
//! Recomputed on every input change; holds no state of its own. Each
//! line carries everything the renderer needs plus intent
//! constructors so a click maps straight to a `TradeIntent`.

use crate::records::{OrderRecord, PositionRecord};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tape_core::{
    is_working_status, matches_chart, AccountId, OrderType, PositionSide, Price, Qty, Side,
    SymbolProfile, SymbolTable,
};
use tape_exec::TradeIntent;

/// Transport P&L or price samples older than this are ignored.
pub const PNL_FRESHNESS: Duration = Duration::seconds(10);

/// Protective distance, in ticks, each side of the live price.
pub const PROTECT_TICK_OFFSET: u32 = 20;

/// A live price with its arrival time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceSample {
    pub price: Price,
    pub received_at: DateTime<Utc>,
}

/// Live price inputs available to the builder.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LivePrices {
    /// Latest transport tick for the chart symbol.
    pub transport: Option<PriceSample>,
    /// Last bar close sampled from the chart itself.
    pub chart_close: Option<Price>,
}

/// One position line on the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionLine {
    /// Stable render key: `account:position`.
    pub key: String,
    pub side: PositionSide,
    pub quantity: Qty,
    pub avg_price: Price,
    /// Best available current price (falls back to avg).
    pub live_price: Price,
    pub unrealized_pnl: Decimal,
    pub account_id: AccountId,
    pub account_label: String,
    pub symbol: String,
    position_id: String,
}

impl PositionLine {
    pub fn close_intent(&self) -> TradeIntent {
        TradeIntent::ClosePosition {
            account_id: self.account_id.clone(),
            position_id: self.position_id.clone(),
            symbol: self.symbol.clone(),
        }
    }

    pub fn reverse_intent(&self) -> TradeIntent {
        TradeIntent::ReversePosition {
            account_id: self.account_id.clone(),
            position_id: self.position_id.clone(),
            symbol: self.symbol.clone(),
        }
    }

    /// Symmetric protective exits around the live price, oriented by
    /// side and snapped to tick.
    pub fn protect_intent(&self, profile: &SymbolProfile) -> TradeIntent {
        let offset = profile.tick_offset(PROTECT_TICK_OFFSET);
        let (tp, sl) = match self.side {
            PositionSide::Long => (self.live_price + offset, self.live_price - offset),
            PositionSide::Short => (self.live_price - offset, self.live_price + offset),
        };
        TradeIntent::Bracket {
            account_id: self.account_id.clone(),
            symbol: self.symbol.clone(),
            side: match self.side {
                PositionSide::Long => Side::Buy,
                PositionSide::Short => Side::Sell,
            },
            tp_price: Some(profile.round_to_tick(tp)),
            sl_price: Some(profile.round_to_tick(sl)),
            quantity: self.quantity,
        }
    }
}

/// One working-order line on the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    /// Stable render key: `account:order`.
    pub key: String,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Price,
    pub quantity: Qty,
    pub account_id: AccountId,
    pub order_id: String,
    order_type_raw: String,
}

impl OrderLine {
    pub fn cancel_intent(&self) -> TradeIntent {
        TradeIntent::CancelOrder {
            account_id: self.account_id.clone(),
            order_id: self.order_id.clone(),
        }
    }

    pub fn modify_intent(&self, new_price: Price) -> TradeIntent {
        TradeIntent::ModifyOrder {
            account_id: self.account_id.clone(),
            order_id: self.order_id.clone(),
            order_type_raw: self.order_type_raw.clone(),
            quantity: self.quantity,
            new_price,
        }
    }
}

/// The full overlay for one chart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayLines {
    pub position_lines: Vec<PositionLine>,
    pub order_lines: Vec<OrderLine>,
}

/// Build the overlay for `chart_symbol` from raw broker state.
pub fn build_overlay(
    positions: &[PositionRecord],
    orders: &[OrderRecord],
    chart_symbol: &str,
    prices: &LivePrices,
    symbols: &SymbolTable,
    now: DateTime<Utc>,
) -> OverlayLines {
    let position_lines = positions
        .iter()
        .filter(|p| p.is_open() && matches_chart(&p.symbol, chart_symbol))
        .map(|p| build_position_line(p, prices, symbols, now))
        .collect();

    let order_lines = orders
        .iter()
        .filter(|o| is_working_status(&o.status) && matches_chart(&o.symbol, chart_symbol))
        .map(build_order_line)
        .collect();

    OverlayLines {
        position_lines,
        order_lines,
    }
}

fn build_position_line(
    record: &PositionRecord,
    prices: &LivePrices,
    symbols: &SymbolTable,
    now: DateTime<Utc>,
) -> PositionLine {
    let side = record.effective_side();
    let profile = symbols.profile(&record.symbol);

    // Best current price: fresh transport tick, then the chart's own
    // close, then the record's last price, then entry.
    let market_price = prices
        .transport
        .filter(|s| now - s.received_at <= PNL_FRESHNESS)
        .map(|s| s.price)
        .or(prices.chart_close)
        .or(record.last_price);
    let live_price = market_price.unwrap_or(record.avg_price);

    let unrealized_pnl = compute_pnl(record, side, market_price, &profile, now);

    PositionLine {
        key: format!("{}:{}", record.account_id, record.position_id),
        side,
        quantity: record.quantity,
        avg_price: record.avg_price,
        live_price,
        unrealized_pnl,
        account_id: record.account_id.clone(),
        account_label: record.account_label.clone(),
        symbol: record.symbol.clone(),
        position_id: record.position_id.clone(),
    }
}

/// Layered P&L: a fresh server-computed value wins, then a client
/// computation against a real market price, then whatever the record
/// arrived with.
fn compute_pnl(
    record: &PositionRecord,
    side: PositionSide,
    market_price: Option<Price>,
    profile: &SymbolProfile,
    now: DateTime<Utc>,
) -> Decimal {
    if let Some(update) = &record.pnl_update {
        if now - update.received_at <= PNL_FRESHNESS {
            return update.value;
        }
    }

    if let Some(live) = market_price {
        let diff = (live.inner() - record.avg_price.inner()) * Decimal::from(side.sign());
        return diff * record.quantity.inner() * profile.point_value;
    }

    record.unrealized_pnl.unwrap_or(Decimal::ZERO)
}

fn build_order_line(record: &OrderRecord) -> OrderLine {
    OrderLine {
        key: format!("{}:{}", record.account_id, record.order_id),
        side: record.side,
        order_type: OrderType::parse(&record.order_type),
        price: record.display_price(),
        quantity: record.quantity,
        account_id: record.account_id.clone(),
        order_id: record.order_id.clone(),
        order_type_raw: record.order_type.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::PnlUpdate;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    fn nq_position() -> PositionRecord {
        PositionRecord {
            position_id: "P-1".into(),
            account_id: "ACC-1".into(),
            account_label: "Sim 1".into(),
            symbol: "NQH6".into(),
            side: None,
            net_qty: dec!(2),
            quantity: Qty::new(dec!(2)),
            avg_price: Price::new(dec!(21000)),
            last_price: None,
            unrealized_pnl: None,
            pnl_update: None,
        }
    }

    fn working_order(id: &str, symbol: &str, status: &str) -> OrderRecord {
        OrderRecord {
            order_id: id.into(),
            account_id: "ACC-1".into(),
            symbol: symbol.into(),
            side: Side::Buy,
            order_type: "Limit".into(),
            status: status.into(),
            limit_price: Some(Price::new(dec!(20990))),
            stop_price: None,
            quantity: Qty::new(dec!(1)),
        }
    }

    fn no_prices() -> LivePrices {
        LivePrices::default()
    }

    #[test]
    fn test_filters_other_symbols_and_flat_positions() {
        let mut flat = nq_position();
        flat.position_id = "P-flat".into();
        flat.net_qty = dec!(0);
        flat.quantity = Qty::new(dec!(0));

        let mut es = nq_position();
        es.position_id = "P-es".into();
        es.symbol = "ESZ25".into();

        let overlay = build_overlay(
            &[nq_position(), flat, es],
            &[],
            "NQ",
            &no_prices(),
            &SymbolTable::default(),
            now(),
        );
        assert_eq!(overlay.position_lines.len(), 1);
        assert_eq!(overlay.position_lines[0].key, "ACC-1:P-1");
    }

    #[test]
    fn test_fresh_server_pnl_wins() {
        let now = now();
        let mut position = nq_position();
        position.pnl_update = Some(PnlUpdate {
            value: dec!(123.45),
            price: None,
            received_at: now - Duration::seconds(3),
        });
        // A transport price that would compute differently
        let prices = LivePrices {
            transport: Some(PriceSample {
                price: Price::new(dec!(21010)),
                received_at: now,
            }),
            chart_close: None,
        };

        let overlay = build_overlay(
            &[position],
            &[],
            "NQ",
            &prices,
            &SymbolTable::default(),
            now,
        );
        assert_eq!(overlay.position_lines[0].unrealized_pnl, dec!(123.45));
    }

    #[test]
    fn test_stale_server_pnl_falls_back_to_client_computation() {
        let now = now();
        let mut position = nq_position();
        position.pnl_update = Some(PnlUpdate {
            value: dec!(999),
            price: None,
            received_at: now - Duration::seconds(11),
        });
        let prices = LivePrices {
            transport: Some(PriceSample {
                price: Price::new(dec!(21010)),
                received_at: now,
            }),
            chart_close: None,
        };

        let overlay = build_overlay(
            &[position],
            &[],
            "NQ",
            &prices,
            &SymbolTable::default(),
            now,
        );
        // Long 2 NQ, +10 points at $20/point: 10 * 2 * 20 = 400
        assert_eq!(overlay.position_lines[0].unrealized_pnl, dec!(400));
    }

    #[test]
    fn test_short_position_pnl_sign() {
        let now = now();
        let mut position = nq_position();
        position.net_qty = dec!(-2);
        let prices = LivePrices {
            transport: Some(PriceSample {
                price: Price::new(dec!(21010)),
                received_at: now,
            }),
            chart_close: None,
        };

        let overlay = build_overlay(
            &[position],
            &[],
            "NQ",
            &prices,
            &SymbolTable::default(),
            now,
        );
        let line = &overlay.position_lines[0];
        assert_eq!(line.side, PositionSide::Short);
        assert_eq!(line.unrealized_pnl, dec!(-400));
    }

    #[test]
    fn test_price_chain_falls_through_to_chart_and_record() {
        let now = now();
        // Stale transport price is skipped
        let prices = LivePrices {
            transport: Some(PriceSample {
                price: Price::new(dec!(30000)),
                received_at: now - Duration::seconds(30),
            }),
            chart_close: Some(Price::new(dec!(21005))),
        };
        let overlay = build_overlay(
            &[nq_position()],
            &[],
            "NQ",
            &prices,
            &SymbolTable::default(),
            now,
        );
        assert_eq!(overlay.position_lines[0].live_price.inner(), dec!(21005));

        // No chart close either: record's own last price
        let mut position = nq_position();
        position.last_price = Some(Price::new(dec!(21002)));
        let overlay = build_overlay(
            &[position],
            &[],
            "NQ",
            &no_prices(),
            &SymbolTable::default(),
            now,
        );
        assert_eq!(overlay.position_lines[0].live_price.inner(), dec!(21002));
    }

    #[test]
    fn test_no_market_price_uses_carried_pnl() {
        let mut position = nq_position();
        position.unrealized_pnl = Some(dec!(-75));

        let overlay = build_overlay(
            &[position],
            &[],
            "NQ",
            &no_prices(),
            &SymbolTable::default(),
            now(),
        );
        let line = &overlay.position_lines[0];
        assert_eq!(line.unrealized_pnl, dec!(-75));
        // Display price falls back to entry
        assert_eq!(line.live_price, line.avg_price);
    }

    #[test]
    fn test_order_filtering_and_type_normalization() {
        let mut stop = working_order("O-2", "NQH6", "6");
        stop.order_type = "STP LMT".into();
        let orders = vec![
            working_order("O-1", "NQ", "Working"),
            stop,
            working_order("O-3", "NQ", "Filled"),
            working_order("O-4", "ES", "Working"),
        ];

        let overlay = build_overlay(
            &[],
            &orders,
            "NQ",
            &no_prices(),
            &SymbolTable::default(),
            now(),
        );
        assert_eq!(overlay.order_lines.len(), 2);
        assert_eq!(overlay.order_lines[0].order_type, OrderType::Limit);
        assert_eq!(overlay.order_lines[1].order_type, OrderType::StopLimit);
    }

    #[test]
    fn test_order_price_fallback() {
        let mut order = working_order("O-1", "NQ", "Working");
        order.limit_price = None;
        order.stop_price = Some(Price::new(dec!(20985)));

        let overlay = build_overlay(
            &[],
            &[order],
            "NQ",
            &no_prices(),
            &SymbolTable::default(),
            now(),
        );
        assert_eq!(overlay.order_lines[0].price.inner(), dec!(20985));
    }

    #[test]
    fn test_protect_intent_long() {
        let now = now();
        let prices = LivePrices {
            transport: Some(PriceSample {
                price: Price::new(dec!(21010)),
                received_at: now,
            }),
            chart_close: None,
        };
        let overlay = build_overlay(
            &[nq_position()],
            &[],
            "NQ",
            &prices,
            &SymbolTable::default(),
            now,
        );

        let table = SymbolTable::default();
        let profile = table.profile("NQ");
        match overlay.position_lines[0].protect_intent(&profile) {
            TradeIntent::Bracket {
                side,
                tp_price,
                sl_price,
                quantity,
                ..
            } => {
                assert_eq!(side, Side::Buy);
                // 20 ticks of 0.25 = 5 points around 21010
                assert_eq!(tp_price, Some(Price::new(dec!(21015))));
                assert_eq!(sl_price, Some(Price::new(dec!(21005))));
                assert_eq!(quantity, Qty::new(dec!(2)));
            }
            other => panic!("expected bracket, got {other:?}"),
        }
    }

    #[test]
    fn test_protect_intent_short_inverts() {
        let now = now();
        let mut position = nq_position();
        position.net_qty = dec!(-2);
        let prices = LivePrices {
            transport: Some(PriceSample {
                price: Price::new(dec!(21010)),
                received_at: now,
            }),
            chart_close: None,
        };
        let overlay = build_overlay(
            &[position],
            &[],
            "NQ",
            &prices,
            &SymbolTable::default(),
            now,
        );

        let table = SymbolTable::default();
        let profile = table.profile("NQ");
        match overlay.position_lines[0].protect_intent(&profile) {
            TradeIntent::Bracket {
                side,
                tp_price,
                sl_price,
                ..
            } => {
                assert_eq!(side, Side::Sell);
                assert_eq!(tp_price, Some(Price::new(dec!(21005))));
                assert_eq!(sl_price, Some(Price::new(dec!(21015))));
            }
            other => panic!("expected bracket, got {other:?}"),
        }
    }

    #[test]
    fn test_modify_intent_carries_raw_type_and_quantity() {
        let mut order = working_order("O-1", "NQ", "Working");
        order.order_type = "STP".into();
        order.quantity = Qty::new(dec!(3));

        let overlay = build_overlay(
            &[],
            &[order],
            "NQ",
            &no_prices(),
            &SymbolTable::default(),
            now(),
        );
        match overlay.order_lines[0].modify_intent(Price::new(dec!(20980))) {
            TradeIntent::ModifyOrder {
                order_type_raw,
                quantity,
                new_price,
                ..
            } => {
                assert_eq!(order_type_raw, "STP");
                assert_eq!(quantity, Qty::new(dec!(3)));
                assert_eq!(new_price, Price::new(dec!(20980)));
            }
            other => panic!("expected modify, got {other:?}"),
        }
    }
}
