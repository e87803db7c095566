//! Population segments and the feedback between consumption, satisfaction and
//! social mobility.

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::{PopulationParams, ProvinceSeed};
use crate::types::{Need, SocialClass};

const PROMOTION_THRESHOLD: f64 = 0.8;
const DEGRADATION_THRESHOLD: f64 = 0.3;
const LOWER_TO_MIDDLE_RATE: f64 = 0.01;
const MIDDLE_TO_UPPER_RATE: f64 = 0.005;
const MIDDLE_TO_LOWER_RATE: f64 = 0.02;
const UPPER_TO_MIDDLE_RATE: f64 = 0.01;

/// Per-capita consumption of one commodity and the need it serves.
#[derive(Debug, Clone, Copy)]
pub struct ConsumptionRule {
    pub commodity: &'static str,
    pub need: Need,
    pub factor: f64,
}

const fn rule(commodity: &'static str, need: Need, factor: f64) -> ConsumptionRule {
    ConsumptionRule {
        commodity,
        need,
        factor,
    }
}

const LOWER_RULES: [ConsumptionRule; 5] = [
    rule("wheat", Need::Food, 0.1),
    rule("rice", Need::Food, 0.05),
    rule("maize", Need::Food, 0.03),
    rule("cloth", Need::Clothing, 0.05),
    rule("furniture", Need::Furniture, 0.01),
];

const MIDDLE_RULES: [ConsumptionRule; 6] = [
    rule("wheat", Need::Food, 0.15),
    rule("rice", Need::Food, 0.075),
    rule("maize", Need::Food, 0.045),
    rule("cloth", Need::Clothing, 0.1),
    rule("furniture", Need::Furniture, 0.02),
    rule("glass", Need::Luxury, 0.02),
];

const UPPER_RULES: [ConsumptionRule; 7] = [
    rule("wheat", Need::Food, 0.2),
    rule("rice", Need::Food, 0.1),
    rule("maize", Need::Food, 0.06),
    rule("cloth", Need::Clothing, 0.15),
    rule("furniture", Need::Furniture, 0.05),
    rule("glass", Need::Luxury, 0.02),
    rule("tool", Need::Luxury, 0.05),
];

pub fn consumption_rules(class: SocialClass) -> &'static [ConsumptionRule] {
    match class {
        SocialClass::Lower => &LOWER_RULES,
        SocialClass::Middle => &MIDDLE_RULES,
        SocialClass::Upper => &UPPER_RULES,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NeedState {
    /// Share of the last tick's demand that was met, in [0, 1].
    pub satisfaction: f64,
    /// Higher priorities get the segment's money first.
    pub priority: f64,
}

/// An order the segment wants to place: affordable in full at `max_price`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPurchase {
    pub commodity: String,
    pub need: Need,
    pub amount: u64,
    pub max_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub class: SocialClass,
    pub amount: u64,
    pub money: Decimal,
    pub needs: BTreeMap<Need, NeedState>,
}

impl Segment {
    pub fn new(class: SocialClass, amount: u64, money: Decimal) -> Self {
        let state = |satisfaction, priority| NeedState {
            satisfaction,
            priority,
        };
        let mut needs = BTreeMap::new();
        needs.insert(Need::Food, state(0.5, 1.0));
        needs.insert(Need::Clothing, state(0.5, 0.8));
        needs.insert(Need::Furniture, state(0.5, 0.6));
        match class {
            SocialClass::Lower => {}
            SocialClass::Middle => {
                needs.insert(Need::Luxury, state(0.3, 0.5));
            }
            SocialClass::Upper => {
                needs.insert(Need::Luxury, state(0.6, 0.7));
                // No commodity serves art, so it holds its initial level.
                needs.insert(Need::Art, state(0.4, 0.6));
            }
        }
        Self {
            class,
            amount,
            money,
            needs,
        }
    }

    pub fn satisfaction(&self, need: Need) -> Option<f64> {
        self.needs.get(&need).map(|n| n.satisfaction)
    }

    /// Quantities the segment wants this tick. Fractions are truncated and
    /// empty entries dropped.
    pub fn calculate_segment_consumption(&self) -> BTreeMap<String, u64> {
        consumption_rules(self.class)
            .iter()
            .filter_map(|rule| {
                let quantity = (self.amount as f64 * rule.factor) as u64;
                (quantity > 0).then(|| (rule.commodity.to_string(), quantity))
            })
            .collect()
    }

    /// Mean satisfaction over the needs this segment tracks.
    pub fn life_quality_index(&self) -> f64 {
        if self.needs.is_empty() {
            return 0.0;
        }
        self.needs.values().map(|n| n.satisfaction).sum::<f64>() / self.needs.len() as f64
    }

    fn need_for(&self, commodity: &str) -> Option<Need> {
        consumption_rules(self.class)
            .iter()
            .find(|rule| rule.commodity == commodity)
            .map(|rule| rule.need)
    }

    /// Turns `consumption` into orders the segment can pay for in full.
    ///
    /// Limit prices are `price * (1 + urgency)` where urgency is the unmet share
    /// of the need. Money is committed need by need in descending priority, so
    /// food is bought before luxuries when the budget is short.
    pub fn plan_purchases(
        &self,
        consumption: &BTreeMap<String, u64>,
        prices: &BTreeMap<String, Decimal>,
    ) -> Vec<PlannedPurchase> {
        let mut needs: Vec<(Need, NeedState)> = self.needs.iter().map(|(n, s)| (*n, *s)).collect();
        needs.sort_by(|a, b| b.1.priority.total_cmp(&a.1.priority).then(a.0.cmp(&b.0)));

        let mut budget = self.money;
        let mut planned = Vec::new();
        for (need, state) in needs {
            let urgency = Decimal::from_f64(1.0 - state.satisfaction.clamp(0.0, 1.0))
                .unwrap_or(Decimal::ZERO)
                .round_dp(4);
            for rule in consumption_rules(self.class).iter().filter(|r| r.need == need) {
                let (Some(&wanted), Some(&price)) =
                    (consumption.get(rule.commodity), prices.get(rule.commodity))
                else {
                    continue;
                };
                let max_price = price.saturating_mul(Decimal::ONE + urgency);
                if max_price <= Decimal::ZERO {
                    continue;
                }
                let affordable = (budget / max_price).floor();
                let amount = affordable.to_u64().unwrap_or(0).min(wanted);
                if amount == 0 {
                    continue;
                }
                budget -= max_price * Decimal::from(amount);
                planned.push(PlannedPurchase {
                    commodity: rule.commodity.to_string(),
                    need,
                    amount,
                    max_price,
                });
            }
        }
        planned
    }

    /// Sets each need with demand this tick to the share of it that was bought.
    pub fn update_satisfaction(
        &mut self,
        consumption: &BTreeMap<String, u64>,
        bought: &BTreeMap<String, u64>,
    ) {
        let mut wanted: BTreeMap<Need, u64> = BTreeMap::new();
        let mut fulfilled: BTreeMap<Need, u64> = BTreeMap::new();
        for (commodity, quantity) in consumption {
            let Some(need) = self.need_for(commodity) else {
                continue;
            };
            *wanted.entry(need).or_insert(0) += quantity;
            let got = bought.get(commodity).copied().unwrap_or(0).min(*quantity);
            *fulfilled.entry(need).or_insert(0) += got;
        }

        for (need, wanted) in wanted {
            if wanted == 0 {
                continue;
            }
            if let Some(state) = self.needs.get_mut(&need) {
                let got = fulfilled.get(&need).copied().unwrap_or(0);
                state.satisfaction = (got as f64 / wanted as f64).min(1.0);
            }
        }
    }

    pub fn spend(&mut self, amount: Decimal) {
        self.money = (self.money - amount).max(Decimal::ZERO);
    }

    pub fn earn(&mut self, amount: Decimal) {
        self.money += amount;
    }
}

/// People moved between classes in one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MobilityFlows {
    pub lower_to_middle: u64,
    pub middle_to_upper: u64,
    pub middle_to_lower: u64,
    pub upper_to_middle: u64,
}

impl MobilityFlows {
    pub fn is_empty(&self) -> bool {
        *self == MobilityFlows::default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WagePayout {
    pub lower: Decimal,
    pub middle: Decimal,
    pub upper: Decimal,
}

impl WagePayout {
    pub fn total(&self) -> Decimal {
        self.lower + self.middle + self.upper
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Population {
    segments: [Segment; 3],
}

impl Population {
    pub fn new(lower: Segment, middle: Segment, upper: Segment) -> Self {
        Self {
            segments: [lower, middle, upper],
        }
    }

    /// Splits a province's population by the seed's class shares and endows
    /// each segment with its per-capita wealth.
    pub fn from_seed(seed: &ProvinceSeed, params: &PopulationParams) -> Self {
        let middle = (seed.population as f64 * seed.middle_share) as u64;
        let upper = (seed.population as f64 * seed.upper_share) as u64;
        let lower = seed.population.saturating_sub(middle + upper);
        let segment = |class, amount: u64, wealth: Decimal| {
            Segment::new(class, amount, wealth * Decimal::from(amount))
        };
        Self::new(
            segment(SocialClass::Lower, lower, params.lower_wealth_per_capita),
            segment(SocialClass::Middle, middle, params.middle_wealth_per_capita),
            segment(SocialClass::Upper, upper, params.upper_wealth_per_capita),
        )
    }

    pub fn segment(&self, class: SocialClass) -> &Segment {
        &self.segments[class.index()]
    }

    pub fn segment_mut(&mut self, class: SocialClass) -> &mut Segment {
        &mut self.segments[class.index()]
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    pub fn total(&self) -> u64 {
        self.segments.iter().map(|s| s.amount).sum()
    }

    pub fn total_money(&self) -> Decimal {
        self.segments.iter().map(|s| s.money).sum()
    }

    /// Moves people between classes according to each class's life quality.
    ///
    /// Flows are computed from the amounts at the start of the call and applied
    /// as transfers, so the total is unchanged.
    pub fn update_social_mobility(&mut self) -> MobilityFlows {
        let lower = self.segment(SocialClass::Lower);
        let middle = self.segment(SocialClass::Middle);
        let upper = self.segment(SocialClass::Upper);

        let promotion = |segment: &Segment, rate: f64| {
            let pressure = ((segment.life_quality_index() - PROMOTION_THRESHOLD)
                / (1.0 - PROMOTION_THRESHOLD))
                .max(0.0);
            flow(pressure, rate, segment.amount)
        };
        let degradation = |segment: &Segment, rate: f64| {
            let pressure = ((DEGRADATION_THRESHOLD - segment.life_quality_index())
                / DEGRADATION_THRESHOLD)
                .max(0.0);
            flow(pressure, rate, segment.amount)
        };

        let flows = MobilityFlows {
            lower_to_middle: promotion(lower, LOWER_TO_MIDDLE_RATE),
            middle_to_upper: promotion(middle, MIDDLE_TO_UPPER_RATE),
            middle_to_lower: degradation(middle, MIDDLE_TO_LOWER_RATE),
            upper_to_middle: degradation(upper, UPPER_TO_MIDDLE_RATE),
        };

        let [lower, middle, upper] = &mut self.segments;
        lower.amount = lower.amount - flows.lower_to_middle + flows.middle_to_lower;
        middle.amount = middle.amount + flows.lower_to_middle + flows.upper_to_middle
            - flows.middle_to_upper
            - flows.middle_to_lower;
        upper.amount = upper.amount + flows.middle_to_upper - flows.upper_to_middle;

        flows
    }

    /// Pays out a wage pool: the owner share to the upper class if anyone is
    /// in it, the rest to workers by the class they were drawn from.
    pub fn distribute_wages(
        &mut self,
        pool: Decimal,
        from_lower: u64,
        from_middle: u64,
        owner_share: Decimal,
    ) -> WagePayout {
        if pool <= Decimal::ZERO {
            return WagePayout::default();
        }

        let upper = if self.segment(SocialClass::Upper).amount > 0 {
            (pool * owner_share).round_dp(6)
        } else {
            Decimal::ZERO
        };
        let workers = pool - upper;
        let employed = from_lower + from_middle;
        let middle = if employed == 0 {
            Decimal::ZERO
        } else {
            (workers * Decimal::from(from_middle) / Decimal::from(employed)).round_dp(6)
        };
        let payout = WagePayout {
            lower: workers - middle,
            middle,
            upper,
        };

        self.segment_mut(SocialClass::Lower).earn(payout.lower);
        self.segment_mut(SocialClass::Middle).earn(payout.middle);
        self.segment_mut(SocialClass::Upper).earn(payout.upper);
        payout
    }
}

/// Truncated migration out of a segment; never more than the segment holds.
fn flow(pressure: f64, rate: f64, amount: u64) -> u64 {
    ((pressure.min(1.0) * rate * amount as f64) as u64).min(amount)
}
