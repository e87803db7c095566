use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::events::{Event, EventType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvinceMetrics {
    pub province_id: String,

    pub initial_population: u64,
    pub final_population: u64,
    pub peak_population: u64,
    pub days_observed: u64,
    /// Lower, middle and upper share of the population at the last snapshot.
    pub final_class_shares: [f64; 3],
    /// Largest change in any class's share between the first and last snapshot.
    pub class_share_drift: f64,

    pub goods_produced: BTreeMap<String, u64>,

    pub trades_executed: usize,
    pub trade_volume: u64,
    pub trade_value: Decimal,
    pub price_changes: usize,
    /// Largest single-tick price move relative to the previous price.
    pub largest_price_move: f64,

    pub mean_employment_rate: f64,
    pub promotions: u64,
    pub demotions: u64,

    pub buildings_constructed: usize,
    pub buildings_demolished: usize,
    pub final_buildings: usize,
    pub final_money: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetrics {
    pub total_days: u64,
    pub provinces: BTreeMap<String, ProvinceMetrics>,
    pub total_population: u64,
    pub total_trade_volume: u64,
    pub total_trade_value: Decimal,
    /// Gini coefficient of final population across provinces.
    pub population_inequality: f64,
}

pub struct MetricsCalculator;

impl MetricsCalculator {
    pub fn calculate_province_metrics(
        province_id: &str,
        events: &[Event],
        initial_population: u64,
    ) -> ProvinceMetrics {
        let mut metrics = ProvinceMetrics {
            province_id: province_id.to_string(),
            initial_population,
            final_population: initial_population,
            peak_population: initial_population,
            days_observed: 0,
            final_class_shares: [0.0; 3],
            class_share_drift: 0.0,
            goods_produced: BTreeMap::new(),
            trades_executed: 0,
            trade_volume: 0,
            trade_value: Decimal::ZERO,
            price_changes: 0,
            largest_price_move: 0.0,
            mean_employment_rate: 0.0,
            promotions: 0,
            demotions: 0,
            buildings_constructed: 0,
            buildings_demolished: 0,
            final_buildings: 0,
            final_money: Decimal::ZERO,
        };

        let mut first_shares: Option<[f64; 3]> = None;
        let mut employment_rates = Vec::new();

        for event in events.iter().filter(|e| e.province_id == province_id) {
            match &event.event_type {
                EventType::GoodsProduced {
                    commodity, amount, ..
                } => {
                    *metrics.goods_produced.entry(commodity.clone()).or_insert(0) += amount;
                }
                EventType::TradeExecuted { amount, price, .. } => {
                    metrics.trades_executed += 1;
                    metrics.trade_volume += amount;
                    metrics.trade_value = metrics
                        .trade_value
                        .saturating_add(Decimal::from(*amount).saturating_mul(*price));
                }
                EventType::PriceChanged {
                    old_price,
                    new_price,
                    ..
                } => {
                    metrics.price_changes += 1;
                    if *old_price > Decimal::ZERO {
                        let relative = ((new_price - old_price) / old_price).abs();
                        let relative = relative.to_f64().unwrap_or(0.0);
                        if relative > metrics.largest_price_move {
                            metrics.largest_price_move = relative;
                        }
                    }
                }
                EventType::WorkersAllocated {
                    available,
                    employed,
                    ..
                } => {
                    if *available > 0 {
                        employment_rates.push(*employed as f64 / *available as f64);
                    }
                }
                EventType::SocialMobility {
                    lower_to_middle,
                    middle_to_upper,
                    middle_to_lower,
                    upper_to_middle,
                } => {
                    metrics.promotions += lower_to_middle + middle_to_upper;
                    metrics.demotions += middle_to_lower + upper_to_middle;
                }
                EventType::BuildingConstructed { .. } => metrics.buildings_constructed += 1,
                EventType::BuildingDemolished { .. } => metrics.buildings_demolished += 1,
                EventType::BuildingUpgraded { .. } => {}
                EventType::ProvinceSnapshot {
                    lower,
                    middle,
                    upper,
                    money,
                    buildings,
                    ..
                } => {
                    let population = lower + middle + upper;
                    metrics.final_population = population;
                    metrics.peak_population = metrics.peak_population.max(population);
                    metrics.final_buildings = *buildings;
                    metrics.final_money = *money;
                    metrics.days_observed = metrics.days_observed.max(event.tick);
                    if population > 0 {
                        let shares = [*lower, *middle, *upper].map(|n| n as f64 / population as f64);
                        first_shares.get_or_insert(shares);
                        metrics.final_class_shares = shares;
                    }
                }
            }
        }

        if !employment_rates.is_empty() {
            metrics.mean_employment_rate =
                employment_rates.iter().sum::<f64>() / employment_rates.len() as f64;
        }

        if let Some(first) = first_shares {
            metrics.class_share_drift = first
                .iter()
                .zip(&metrics.final_class_shares)
                .map(|(a, b)| (b - a).abs())
                .fold(0.0, f64::max);
        }

        metrics
    }

    pub fn calculate_run_metrics(
        events: &[Event],
        provinces: &[(String, u64)], // (province_id, initial_population)
        total_days: u64,
    ) -> RunMetrics {
        let mut metrics = BTreeMap::new();
        for (province_id, initial_population) in provinces {
            metrics.insert(
                province_id.clone(),
                Self::calculate_province_metrics(province_id, events, *initial_population),
            );
        }

        let final_populations: Vec<f64> = metrics
            .values()
            .map(|m: &ProvinceMetrics| m.final_population as f64)
            .collect();

        RunMetrics {
            total_days,
            total_population: metrics.values().map(|m| m.final_population).sum(),
            total_trade_volume: metrics.values().map(|m| m.trade_volume).sum(),
            total_trade_value: metrics.values().map(|m| m.trade_value).sum(),
            population_inequality: Self::calculate_gini_coefficient(&final_populations),
            provinces: metrics,
        }
    }

    /// Metrics for a saved log, taking each province's first snapshot as its
    /// starting population.
    pub fn calculate_from_log(events: &[Event]) -> RunMetrics {
        let mut initial: BTreeMap<&str, u64> = BTreeMap::new();
        let mut total_days = 0;
        for event in events {
            total_days = total_days.max(event.tick);
            let population = match &event.event_type {
                EventType::ProvinceSnapshot {
                    lower,
                    middle,
                    upper,
                    ..
                } => Some(lower + middle + upper),
                _ => None,
            };
            let entry = initial.entry(event.province_id.as_str()).or_insert(0);
            if *entry == 0 {
                if let Some(population) = population {
                    *entry = population;
                }
            }
        }

        let provinces: Vec<(String, u64)> = initial
            .into_iter()
            .map(|(id, p)| (id.to_string(), p))
            .collect();
        Self::calculate_run_metrics(events, &provinces, total_days)
    }

    pub fn calculate_gini_coefficient(values: &[f64]) -> f64 {
        if values.is_empty() || values.iter().all(|&v| v == 0.0) {
            return 0.0;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let n = sorted.len() as f64;
        let total: f64 = sorted.iter().sum();

        if total == 0.0 {
            return 0.0;
        }

        let mut sum = 0.0;

        for (i, &value) in sorted.iter().enumerate() {
            sum += (i as f64 + 1.0) * value;
        }

        2.0 * sum / (n * total) - (n + 1.0) / n
    }
}

impl std::fmt::Display for ProvinceMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Province {} Metrics:", self.province_id)?;
        writeln!(
            f,
            "  - Population: {}→{} (peak {})",
            self.initial_population, self.final_population, self.peak_population
        )?;
        let [lower, middle, upper] = self.final_class_shares;
        writeln!(
            f,
            "  - Classes: {:.1}% lower, {:.1}% middle, {:.1}% upper (drift {:.2} pts)",
            lower * 100.0,
            middle * 100.0,
            upper * 100.0,
            self.class_share_drift * 100.0
        )?;
        writeln!(
            f,
            "  - Mobility: {} promoted, {} demoted",
            self.promotions, self.demotions
        )?;
        writeln!(
            f,
            "  - Employment: {:.1}% of available workers",
            self.mean_employment_rate * 100.0
        )?;
        writeln!(
            f,
            "  - Trade: {} fills, {} units, value {}",
            self.trades_executed,
            self.trade_volume,
            self.trade_value.round_dp(2)
        )?;
        writeln!(
            f,
            "  - Prices: {} moves, largest {:.1}%",
            self.price_changes,
            self.largest_price_move * 100.0
        )?;
        let produced: Vec<String> = self
            .goods_produced
            .iter()
            .map(|(commodity, amount)| format!("{} {}", amount, commodity))
            .collect();
        writeln!(f, "  - Produced: {}", produced.join(", "))?;
        writeln!(
            f,
            "  - Buildings: {} (+{} / -{}), money {}",
            self.final_buildings,
            self.buildings_constructed,
            self.buildings_demolished,
            self.final_money.round_dp(2)
        )?;
        Ok(())
    }
}

impl std::fmt::Display for RunMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Run Metrics ({} days):", self.total_days)?;
        writeln!(f, "  Total Population: {}", self.total_population)?;
        writeln!(
            f,
            "  Total Trade: {} units, value {}",
            self.total_trade_volume,
            self.total_trade_value.round_dp(2)
        )?;
        writeln!(
            f,
            "  Population Inequality (Gini): {:.3}",
            self.population_inequality
        )?;
        for metrics in self.provinces.values() {
            writeln!(f)?;
            write!(f, "{}", metrics)?;
        }
        Ok(())
    }
}
