use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::CommodityDef;
use crate::error::{EconomyError, Result};
use crate::types::{Priority, SocialClass, UnitId};

/// Lowest price any commodity can reach.
pub const PRICE_FLOOR: Decimal = dec!(0.1);
/// Highest price any commodity can reach. Commodities with buyers and no
/// sellers drift up to here and stop.
pub const PRICE_CEILING: Decimal = dec!(1000000);
/// A price can rise to at most this multiple of its previous value in one tick.
pub const MAX_PRICE_RISE: Decimal = dec!(1.5);
/// Relative drift applied when a commodity had orders but no trade.
pub const PRICE_DRIFT: Decimal = dec!(0.05);
const OLD_PRICE_WEIGHT: Decimal = dec!(0.7);
const TRADE_PRICE_WEIGHT: Decimal = dec!(0.3);
const PRICE_DECIMALS: u32 = 6;

// --- Data Structures ---

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Who placed an order, used to route the goods and money after clearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Originator {
    Stockpile,
    Building(UnitId),
    Segment(SocialClass),
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub commodity: String,
    pub side: OrderSide,
    pub original_amount: u64,
    pub remaining: u64,
    /// Maximum price for a buy, minimum price for a sell.
    pub limit_price: Decimal,
    pub originator: Originator,
    pub priority: Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketEntry {
    pub amount: u64,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fill {
    pub commodity: String,
    pub buy_order: OrderId,
    pub sell_order: OrderId,
    pub buyer: Originator,
    pub seller: Originator,
    pub amount: u64,
    pub price: Decimal,
}

impl Fill {
    pub fn value(&self) -> Decimal {
        Decimal::from(self.amount).saturating_mul(self.price)
    }
}

/// Outcome of clearing one commodity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommodityClearing {
    pub buy_orders: usize,
    pub sell_orders: usize,
    pub traded_volume: u64,
    pub average_price: Option<Decimal>,
    pub old_price: Decimal,
    pub new_price: Decimal,
    pub unmatched_buy: u64,
    pub unmatched_sell: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClearingReport {
    pub fills: Vec<Fill>,
    pub commodities: BTreeMap<String, CommodityClearing>,
}

impl ClearingReport {
    pub fn filled_for(&self, originator: Originator) -> impl Iterator<Item = &Fill> {
        self.fills
            .iter()
            .filter(move |f| f.buyer == originator || f.seller == originator)
    }
}

// --- Market ---

/// A province's commodity market: a stockpile with prices plus the orders
/// submitted since the last clearing.
#[derive(Debug, Clone, Default)]
pub struct Market {
    entries: BTreeMap<String, MarketEntry>,
    pending: Vec<Order>,
    next_order_id: usize,
}

impl Market {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_catalog(commodities: &[CommodityDef]) -> Result<Self> {
        let mut market = Market::new();
        for commodity in commodities {
            market.add_commodity(&commodity.id, commodity.initial_stock, commodity.base_price)?;
        }
        Ok(market)
    }

    pub fn add_commodity(&mut self, commodity: &str, amount: u64, price: Decimal) -> Result<()> {
        if price < PRICE_FLOOR || price > PRICE_CEILING {
            return Err(EconomyError::InvalidQuantity(format!(
                "Price {} for {} is outside [{}, {}]",
                price, commodity, PRICE_FLOOR, PRICE_CEILING
            )));
        }
        self.entries
            .insert(commodity.to_string(), MarketEntry { amount, price });
        Ok(())
    }

    pub fn price(&self, commodity: &str) -> Option<Decimal> {
        self.entries.get(commodity).map(|e| e.price)
    }

    pub fn amount(&self, commodity: &str) -> Option<u64> {
        self.entries.get(commodity).map(|e| e.amount)
    }

    pub fn prices(&self) -> BTreeMap<String, Decimal> {
        self.entries
            .iter()
            .map(|(commodity, entry)| (commodity.clone(), entry.price))
            .collect()
    }

    /// Total units held in the stockpile across commodities.
    pub fn total_stock(&self) -> u64 {
        self.entries.values().map(|e| e.amount).sum()
    }

    pub fn pending_orders(&self) -> &[Order] {
        &self.pending
    }

    /// Per-commodity stock and price.
    pub fn statistics(&self) -> BTreeMap<String, MarketEntry> {
        self.entries.clone()
    }

    /// Adds goods to the stockpile.
    pub fn deposit(&mut self, commodity: &str, amount: u64) -> Result<()> {
        let entry = self
            .entries
            .get_mut(commodity)
            .ok_or_else(|| EconomyError::UnknownCommodity(commodity.to_string()))?;
        entry.amount += amount;
        Ok(())
    }

    fn pending_stockpile_sells(&self, commodity: &str) -> u64 {
        self.pending
            .iter()
            .filter(|o| {
                o.commodity == commodity
                    && o.side == OrderSide::Sell
                    && o.originator == Originator::Stockpile
            })
            .map(|o| o.remaining)
            .sum()
    }

    pub fn submit(
        &mut self,
        commodity: &str,
        side: OrderSide,
        amount: u64,
        limit_price: Decimal,
        originator: Originator,
        priority: Priority,
    ) -> Result<OrderId> {
        let stock = self
            .amount(commodity)
            .ok_or_else(|| EconomyError::UnknownCommodity(commodity.to_string()))?;
        if amount == 0 {
            return Err(EconomyError::InvalidQuantity(format!(
                "Order for {} has zero amount",
                commodity
            )));
        }
        if limit_price <= Decimal::ZERO {
            return Err(EconomyError::InvalidQuantity(format!(
                "Order for {} has non-positive limit price {}",
                commodity, limit_price
            )));
        }
        if side == OrderSide::Sell && originator == Originator::Stockpile {
            let available = stock.saturating_sub(self.pending_stockpile_sells(commodity));
            if amount > available {
                return Err(EconomyError::InsufficientStock {
                    commodity: commodity.to_string(),
                    requested: amount,
                    available,
                });
            }
        }

        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        self.pending.push(Order {
            id,
            commodity: commodity.to_string(),
            side,
            original_amount: amount,
            remaining: amount,
            limit_price,
            originator,
            priority,
        });
        Ok(id)
    }

    pub fn add_buy_order_from_building(
        &mut self,
        unit: UnitId,
        commodity: &str,
        amount: u64,
        max_price: Decimal,
    ) -> Result<OrderId> {
        self.submit(
            commodity,
            OrderSide::Buy,
            amount,
            max_price,
            Originator::Building(unit),
            Priority::High,
        )
    }

    pub fn add_buy_order_from_population(
        &mut self,
        class: SocialClass,
        commodity: &str,
        amount: u64,
        max_price: Decimal,
    ) -> Result<OrderId> {
        self.submit(
            commodity,
            OrderSide::Buy,
            amount,
            max_price,
            Originator::Segment(class),
            class.order_priority(),
        )
    }

    pub fn add_stockpile_sell_order(
        &mut self,
        commodity: &str,
        amount: u64,
        min_price: Decimal,
    ) -> Result<OrderId> {
        self.submit(
            commodity,
            OrderSide::Sell,
            amount,
            min_price,
            Originator::Stockpile,
            Priority::Medium,
        )
    }

    /// Matches every pending order, moves stockpile goods, updates prices and
    /// drops whatever did not match.
    pub fn process_daily_transactions(&mut self) -> ClearingReport {
        let mut by_commodity: BTreeMap<String, Vec<Order>> = BTreeMap::new();
        for order in std::mem::take(&mut self.pending) {
            by_commodity
                .entry(order.commodity.clone())
                .or_default()
                .push(order);
        }

        let mut report = ClearingReport::default();
        for (commodity, orders) in by_commodity {
            let Some(entry) = self.entries.get_mut(&commodity) else {
                continue;
            };
            let buy_orders = orders.iter().filter(|o| o.side == OrderSide::Buy).count();
            let sell_orders = orders.len() - buy_orders;

            let matched = match_orders(&commodity, orders);

            for fill in &matched.fills {
                if fill.seller == Originator::Stockpile {
                    entry.amount = entry.amount.saturating_sub(fill.amount);
                }
                if fill.buyer == Originator::Stockpile {
                    entry.amount += fill.amount;
                }
            }

            let traded_volume: u64 = matched.fills.iter().map(|f| f.amount).sum();
            let average_price = if traded_volume > 0 {
                let total_value = matched
                    .fills
                    .iter()
                    .fold(Decimal::ZERO, |acc, f| acc.saturating_add(f.value()));
                Some(total_value / Decimal::from(traded_volume))
            } else {
                None
            };

            let old_price = entry.price;
            let new_price = next_price(old_price, average_price, buy_orders, sell_orders);
            entry.price = new_price;
            if new_price != old_price {
                log::trace!("{} price {} -> {}", commodity, old_price, new_price);
            }

            report.commodities.insert(
                commodity,
                CommodityClearing {
                    buy_orders,
                    sell_orders,
                    traded_volume,
                    average_price,
                    old_price,
                    new_price,
                    unmatched_buy: matched.unmatched_buy,
                    unmatched_sell: matched.unmatched_sell,
                },
            );
            report.fills.extend(matched.fills);
        }

        report
    }
}

struct MatchResult {
    fills: Vec<Fill>,
    unmatched_buy: u64,
    unmatched_sell: u64,
}

/// Double auction for a single commodity: cheapest seller against the most
/// eager buyer until the best remaining pair no longer crosses.
fn match_orders(commodity: &str, orders: Vec<Order>) -> MatchResult {
    let (mut buys, mut sells): (Vec<Order>, Vec<Order>) =
        orders.into_iter().partition(|o| o.side == OrderSide::Buy);

    // Sells: ascending price, then submission order
    sells.sort_by(|a, b| a.limit_price.cmp(&b.limit_price).then_with(|| a.id.cmp(&b.id)));
    // Buys: descending price, then higher priority, then submission order
    buys.sort_by(|a, b| {
        b.limit_price
            .cmp(&a.limit_price)
            .then_with(|| b.priority.cmp(&a.priority))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut fills = Vec::new();
    let (mut s, mut b) = (0, 0);
    while s < sells.len() && b < buys.len() {
        let (sell, buy) = (&sells[s], &buys[b]);
        if sell.limit_price > buy.limit_price {
            break;
        }

        let amount = sell.remaining.min(buy.remaining);
        fills.push(Fill {
            commodity: commodity.to_string(),
            buy_order: buy.id,
            sell_order: sell.id,
            buyer: buy.originator,
            seller: sell.originator,
            amount,
            price: sell.limit_price.saturating_add(buy.limit_price) / dec!(2),
        });

        sells[s].remaining -= amount;
        buys[b].remaining -= amount;
        if sells[s].remaining == 0 {
            s += 1;
        }
        if buys[b].remaining == 0 {
            b += 1;
        }
    }

    MatchResult {
        fills,
        unmatched_buy: buys.iter().map(|o| o.remaining).sum(),
        unmatched_sell: sells.iter().map(|o| o.remaining).sum(),
    }
}

/// Blends toward the traded price, or drifts toward scarcity when nothing
/// traded, then bounds the move.
fn next_price(
    old: Decimal,
    average_trade_price: Option<Decimal>,
    buy_orders: usize,
    sell_orders: usize,
) -> Decimal {
    let candidate = match average_trade_price {
        Some(avg) => old * OLD_PRICE_WEIGHT + avg * TRADE_PRICE_WEIGHT,
        None if buy_orders > sell_orders => old.saturating_mul(Decimal::ONE + PRICE_DRIFT),
        None if buy_orders < sell_orders => old * (Decimal::ONE - PRICE_DRIFT),
        None => old,
    };
    candidate
        .round_dp(PRICE_DECIMALS)
        .min(old.saturating_mul(MAX_PRICE_RISE))
        .min(PRICE_CEILING)
        .max(PRICE_FLOOR)
}
