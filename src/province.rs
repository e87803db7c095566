//! A province owns its population, market and production units and advances
//! them one day at a time.
//!
//! Each tick runs the same sequence: population consumption, buy and sell
//! orders, market clearing and settlement, production, labor reallocation with
//! wages, and finally social mobility. Later steps read what earlier ones wrote,
//! so the order is fixed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{BuildingTemplate, GameConfig, MarketParams, ProvinceSeed};
use crate::error::{EconomyError, Result};
use crate::events::{EventLogger, EventType};
use crate::labor::{EmploymentTally, allocate_workers};
use crate::market::{ClearingReport, Market, MarketEntry, Originator};
use crate::population::{MobilityFlows, Population, WagePayout};
use crate::production::ProductionUnit;
use crate::types::{SocialClass, UnitId, UnitIdGenerator};

/// Template instantiated for each block of people in a new province.
pub const SUBSISTENCE_FARM: &str = "subsistenceFarm";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingSummary {
    pub id: UnitId,
    pub kind: String,
    pub level: u32,
    pub current_employees: u32,
    pub max_employees: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSummary {
    pub class: SocialClass,
    pub amount: u64,
    pub money: Decimal,
    pub life_quality: f64,
}

/// Read-only view of a province for presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvinceSnapshot {
    pub id: String,
    pub population: u64,
    pub segments: Vec<SegmentSummary>,
    pub buildings: Vec<BuildingSummary>,
    pub market: BTreeMap<String, MarketEntry>,
}

/// Everything one tick did, for callers that want more than the event log.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub clearing: ClearingReport,
    pub produced: BTreeMap<String, u64>,
    pub employment: EmploymentTally,
    pub wages: WagePayout,
    pub mobility: MobilityFlows,
    pub rejected_orders: usize,
}

#[derive(Debug, Clone)]
pub struct Province {
    pub id: String,
    pub population: Population,
    pub market: Market,
    units: Vec<ProductionUnit>,
    ids: UnitIdGenerator,
    market_params: MarketParams,
    owner_share: Decimal,
    employment: EmploymentTally,
}

impl Province {
    /// Builds a province from explicit parts and staffs nothing yet.
    pub fn from_parts(
        id: impl Into<String>,
        population: Population,
        market: Market,
        market_params: MarketParams,
        owner_share: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            population,
            market,
            units: Vec::new(),
            ids: UnitIdGenerator::new(),
            market_params,
            owner_share,
            employment: EmploymentTally::default(),
        }
    }

    /// Seeds a province from configuration: class split, stockpile, and one
    /// subsistence farm per `subsistence_divisor` people when the template exists.
    /// Workers are allocated once so production starts on the first tick.
    pub fn new(seed: &ProvinceSeed, config: &GameConfig) -> Result<Self> {
        let mut province = Self::from_parts(
            seed.id.clone(),
            Population::from_seed(seed, &config.population),
            Market::from_catalog(&config.commodities)?,
            config.market.clone(),
            config.population.owner_share,
        );

        if let Some(template) = config.template(SUBSISTENCE_FARM) {
            let farms = seed.population / config.population.subsistence_divisor.max(1);
            for _ in 0..farms {
                province.construct(template)?;
            }
        }

        province.allocate_workers();
        log::debug!(
            "Province {} founded: population {}, {} units",
            province.id,
            province.population.total(),
            province.units.len()
        );
        Ok(province)
    }

    pub fn units(&self) -> &[ProductionUnit] {
        &self.units
    }

    pub fn unit(&self, id: UnitId) -> Option<&ProductionUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut ProductionUnit> {
        self.units.iter_mut().find(|u| u.id == id)
    }

    /// Staffing computed by the most recent allocation.
    pub fn employment(&self) -> &EmploymentTally {
        &self.employment
    }

    /// Adds a level-1, unstaffed unit built from the template's first method
    /// and first production type.
    pub fn construct(&mut self, template: &BuildingTemplate) -> Result<UnitId> {
        let unit = ProductionUnit::from_template(self.ids.next_id(), template)?;
        let id = unit.id;
        self.units.push(unit);
        Ok(id)
    }

    /// Raises a unit's level by one and returns the new level.
    pub fn upgrade_building(&mut self, id: UnitId) -> Result<u32> {
        let unit = self.unit_mut(id).ok_or(EconomyError::BuildingNotFound(id))?;
        unit.upgrade();
        Ok(unit.level)
    }

    /// Removes a unit. Whatever it held in storage is lost with it.
    pub fn demolish_building(&mut self, id: UnitId) -> Result<ProductionUnit> {
        let index = self
            .units
            .iter()
            .position(|u| u.id == id)
            .ok_or(EconomyError::BuildingNotFound(id))?;
        Ok(self.units.remove(index))
    }

    pub fn allocate_workers(&mut self) -> &EmploymentTally {
        let lower = self.population.segment(SocialClass::Lower).amount;
        let middle = self.population.segment(SocialClass::Middle).amount;
        self.employment = allocate_workers(&mut self.units, lower, middle);
        &self.employment
    }

    pub fn snapshot(&self) -> ProvinceSnapshot {
        ProvinceSnapshot {
            id: self.id.clone(),
            population: self.population.total(),
            segments: self
                .population
                .segments()
                .map(|s| SegmentSummary {
                    class: s.class,
                    amount: s.amount,
                    money: s.money,
                    life_quality: s.life_quality_index(),
                })
                .collect(),
            buildings: self
                .units
                .iter()
                .map(|u| BuildingSummary {
                    id: u.id,
                    kind: u.kind.clone(),
                    level: u.level,
                    current_employees: u.current_employees(),
                    max_employees: u.max_employees(),
                })
                .collect(),
            market: self.market.statistics(),
        }
    }

    /// Advances the province by one day.
    pub fn tick(&mut self, day: u64, logger: &mut EventLogger) -> Result<TickReport> {
        let mut report = TickReport::default();

        // Consumption
        let consumption: Vec<(SocialClass, BTreeMap<String, u64>)> = self
            .population
            .segments()
            .map(|s| (s.class, s.calculate_segment_consumption()))
            .collect();

        // Orders
        self.post_stockpile_orders()?;
        report.rejected_orders += self.post_building_orders();
        report.rejected_orders += self.post_population_orders(&consumption);

        // Clearing and settlement
        let clearing = self.market.process_daily_transactions();
        let wage_pool = self.settle(&clearing, &consumption);
        for fill in &clearing.fills {
            logger.log(
                day,
                &self.id,
                EventType::TradeExecuted {
                    commodity: fill.commodity.clone(),
                    amount: fill.amount,
                    price: fill.price,
                    buyer: fill.buyer,
                    seller: fill.seller,
                },
            );
        }
        for (commodity, outcome) in &clearing.commodities {
            if outcome.new_price != outcome.old_price {
                logger.log(
                    day,
                    &self.id,
                    EventType::PriceChanged {
                        commodity: commodity.clone(),
                        old_price: outcome.old_price,
                        new_price: outcome.new_price,
                        traded_volume: outcome.traded_volume,
                    },
                );
            }
        }
        report.clearing = clearing;

        // Production
        report.produced = self.produce(day, logger);

        // Labor and wages
        let tally = self.allocate_workers().clone();
        logger.log(
            day,
            &self.id,
            EventType::WorkersAllocated {
                available: tally.available_workers,
                employed: tally.employed,
                unemployed: tally.unemployed,
                by_kind: tally.by_kind.clone(),
            },
        );
        report.wages = self.population.distribute_wages(
            wage_pool,
            tally.from_lower,
            tally.from_middle,
            self.owner_share,
        );
        report.employment = tally;

        // Social mobility
        let flows = self.population.update_social_mobility();
        if !flows.is_empty() {
            log::debug!("Province {} mobility on day {}: {:?}", self.id, day, flows);
            logger.log(
                day,
                &self.id,
                EventType::SocialMobility {
                    lower_to_middle: flows.lower_to_middle,
                    middle_to_upper: flows.middle_to_upper,
                    middle_to_lower: flows.middle_to_lower,
                    upper_to_middle: flows.upper_to_middle,
                },
            );
        }
        report.mobility = flows;

        logger.log(
            day,
            &self.id,
            EventType::ProvinceSnapshot {
                lower: self.population.segment(SocialClass::Lower).amount,
                middle: self.population.segment(SocialClass::Middle).amount,
                upper: self.population.segment(SocialClass::Upper).amount,
                money: self.population.total_money(),
                buildings: self.units.len(),
                stockpile: self.market.total_stock(),
            },
        );
        log::debug!(
            "Province {} day {}: population {}, traded {} units, {} employed",
            self.id,
            day,
            self.population.total(),
            report.clearing.fills.iter().map(|f| f.amount).sum::<u64>(),
            report.employment.employed
        );

        Ok(report)
    }

    fn post_stockpile_orders(&mut self) -> Result<()> {
        let stock: Vec<(String, MarketEntry)> = self.market.statistics().into_iter().collect();
        for (commodity, entry) in stock {
            if entry.amount == 0 {
                continue;
            }
            let min_price = entry.price.saturating_mul(self.market_params.sell_discount);
            self.market
                .add_stockpile_sell_order(&commodity, entry.amount, min_price)?;
        }
        Ok(())
    }

    fn post_building_orders(&mut self) -> usize {
        let mut rejected = 0;
        for unit in &self.units {
            for (commodity, amount) in unit.calculate_needs() {
                let Some(price) = self.market.price(&commodity) else {
                    log::warn!("{} {} needs unknown commodity {}", unit.kind, unit.id, commodity);
                    rejected += 1;
                    continue;
                };
                let max_price = price.saturating_mul(self.market_params.building_markup);
                if let Err(e) =
                    self.market
                        .add_buy_order_from_building(unit.id, &commodity, amount, max_price)
                {
                    log::warn!("Rejected order from {} {}: {}", unit.kind, unit.id, e);
                    rejected += 1;
                }
            }
        }
        rejected
    }

    fn post_population_orders(&mut self, consumption: &[(SocialClass, BTreeMap<String, u64>)]) -> usize {
        let prices = self.market.prices();
        let mut rejected = 0;
        for (class, wanted) in consumption {
            let segment = self.population.segment(*class);
            for purchase in segment.plan_purchases(wanted, &prices) {
                if let Err(e) = self.market.add_buy_order_from_population(
                    *class,
                    &purchase.commodity,
                    purchase.amount,
                    purchase.max_price,
                ) {
                    log::warn!("Rejected order from {} class: {}", class, e);
                    rejected += 1;
                }
            }
        }
        rejected
    }

    /// Routes cleared goods and money to their owners and returns the wage pool
    /// collected from population purchases.
    fn settle(
        &mut self,
        clearing: &ClearingReport,
        consumption: &[(SocialClass, BTreeMap<String, u64>)],
    ) -> Decimal {
        let mut bought: BTreeMap<SocialClass, BTreeMap<String, u64>> = BTreeMap::new();
        let mut paid: BTreeMap<SocialClass, Decimal> = BTreeMap::new();
        let mut wage_pool = Decimal::ZERO;

        for fill in &clearing.fills {
            match fill.buyer {
                Originator::Building(id) => match self.unit_mut(id) {
                    Some(unit) => unit.input_storage.add(&fill.commodity, fill.amount),
                    None => log::warn!("Fill for missing building {}", id),
                },
                Originator::Segment(class) => {
                    *bought
                        .entry(class)
                        .or_default()
                        .entry(fill.commodity.clone())
                        .or_insert(0) += fill.amount;
                    *paid.entry(class).or_insert(Decimal::ZERO) += fill.value();
                    match fill.seller {
                        Originator::Segment(seller) => {
                            self.population.segment_mut(seller).earn(fill.value())
                        }
                        Originator::Stockpile | Originator::Building(_) => {
                            wage_pool += fill.value()
                        }
                    }
                }
                // Goods are already back in the stockpile
                Originator::Stockpile => {}
            }
        }

        let nothing = BTreeMap::new();
        for (class, wanted) in consumption {
            let segment = self.population.segment_mut(*class);
            if let Some(amount) = paid.get(class) {
                segment.spend(*amount);
            }
            segment.update_satisfaction(wanted, bought.get(class).unwrap_or(&nothing));
        }

        wage_pool
    }

    /// Runs every unit and moves its output into the stockpile.
    fn produce(&mut self, day: u64, logger: &mut EventLogger) -> BTreeMap<String, u64> {
        let mut by_kind: BTreeMap<(String, String), (u64, usize)> = BTreeMap::new();
        let mut produced: BTreeMap<String, u64> = BTreeMap::new();

        for unit in &mut self.units {
            let outcome = unit.work();
            if !outcome.shortfalls.is_empty() {
                log::debug!(
                    "{} {} short of {:?} on day {}",
                    unit.kind,
                    unit.id,
                    outcome.shortfalls,
                    day
                );
            }
            for (commodity, amount) in &outcome.produced {
                let entry = by_kind
                    .entry((unit.kind.clone(), commodity.clone()))
                    .or_insert((0, 0));
                entry.0 += amount;
                entry.1 += 1;
            }

            for (commodity, amount) in unit.output_storage.drain() {
                if let Err(e) = self.market.deposit(&commodity, amount) {
                    log::warn!("{} {} cannot deliver output: {}", unit.kind, unit.id, e);
                    unit.output_storage.add(&commodity, amount);
                    continue;
                }
                *produced.entry(commodity).or_insert(0) += amount;
            }
        }

        for ((kind, commodity), (amount, units)) in by_kind {
            logger.log(
                day,
                &self.id,
                EventType::GoodsProduced {
                    kind,
                    commodity,
                    amount,
                    units,
                },
            );
        }
        produced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::Segment;
    use rust_decimal_macros::dec;

    fn requirement(items: &[(&str, u64)]) -> crate::production::Requirement {
        items.iter().map(|(c, a)| (c.to_string(), *a)).collect()
    }

    fn bare_province(lower: u64, money: Decimal) -> Province {
        let mut market = Market::new();
        market.add_commodity("wheat", 0, dec!(2)).unwrap();
        market.add_commodity("wood", 0, dec!(4)).unwrap();
        market.add_commodity("plank", 0, dec!(7)).unwrap();
        let population = Population::new(
            Segment::new(SocialClass::Lower, lower, money),
            Segment::new(SocialClass::Middle, 0, dec!(0)),
            Segment::new(SocialClass::Upper, 0, dec!(0)),
        );
        Province::from_parts("test", population, market, MarketParams::default(), dec!(0.2))
    }

    #[test]
    fn test_new_province_gets_subsistence_farms() {
        let config = GameConfig::standard();
        let seed = &config.countries[0].provinces[0];
        let province = Province::new(seed, &config).unwrap();

        assert_eq!(province.units().len(), 100);
        assert!(province.units().iter().all(|u| u.kind == SUBSISTENCE_FARM));
        // 1000 lower-class workers fill all 100 single-worker farms
        assert!(province.units().iter().all(|u| u.current_employees() == 1));
        assert_eq!(province.employment().employed, 100);
    }

    #[test]
    fn test_production_reaches_the_stockpile() {
        let mut province = bare_province(20, dec!(0));
        let id = province
            .construct(&crate::config::BuildingTemplate {
                id: "WheatFarm".to_string(),
                production_methods: vec![crate::config::ProductionMethod {
                    id: "basic".to_string(),
                    input: requirement(&[]),
                    require_tech: vec![],
                    employees_needed: 10,
                    output_multiplier: 30,
                }],
                production_types: vec![crate::config::ProductionType {
                    id: "wheat".to_string(),
                    input: requirement(&[]),
                    output: requirement(&[("wheat", 1)]),
                    require_tech: vec![],
                }],
            })
            .unwrap();
        province.allocate_workers();
        assert_eq!(province.unit(id).unwrap().current_employees(), 10);

        let mut logger = EventLogger::new();
        let report = province.tick(1, &mut logger).unwrap();

        assert_eq!(report.produced["wheat"], 30);
        assert_eq!(province.market.amount("wheat"), Some(30));
        assert!(logger.get_events().iter().any(|e| matches!(
            &e.event_type,
            EventType::GoodsProduced { commodity, amount: 30, .. } if commodity == "wheat"
        )));
    }

    #[test]
    fn test_buildings_buy_inputs_from_stockpile() {
        let mut province = bare_province(10, dec!(0));
        province.market.deposit("wood", 100).unwrap();
        let unit = ProductionUnit::new(
            UnitId(99),
            "LumberMill",
            10,
            2,
            vec![requirement(&[("wood", 5)])],
            vec![requirement(&[("plank", 1)])],
        );
        province.units.push(unit);
        province.allocate_workers();

        let mut logger = EventLogger::new();
        province.tick(1, &mut logger).unwrap();

        // wanted 5 * 2 = 10 wood, consumed ceil(5 * 2 / 2) = 5 producing 2 planks
        let mill = province.unit(UnitId(99)).unwrap();
        assert_eq!(mill.input_storage.get("wood"), 5);
        assert_eq!(province.market.amount("wood"), Some(90));
        assert_eq!(province.market.amount("plank"), Some(2));
    }

    #[test]
    fn test_population_purchases_pay_wages() {
        let mut province = bare_province(100, dec!(100));
        province.market.deposit("wheat", 50).unwrap();

        let mut logger = EventLogger::new();
        let report = province.tick(1, &mut logger).unwrap();

        // 10 wheat wanted, bought from the stockpile at (1.8 + 3) / 2
        assert_eq!(report.clearing.fills.len(), 1);
        assert_eq!(report.clearing.fills[0].amount, 10);
        assert_eq!(report.clearing.fills[0].price, dec!(2.4));
        assert_eq!(province.market.amount("wheat"), Some(40));
        assert_eq!(report.wages.total(), dec!(24));
        // nobody employed and no upper class: wages return to the buyers
        assert_eq!(province.population.total_money(), dec!(100));
        // 10 of the 18 food units wanted; rice and maize are not traded here
        assert_eq!(
            province.population.segment(SocialClass::Lower).satisfaction(crate::types::Need::Food),
            Some(10.0 / 18.0)
        );
    }

    #[test]
    fn test_upgrade_and_demolish() {
        let config = GameConfig::standard();
        let mut province = bare_province(10, dec!(0));
        let template = config.template("Workshop").unwrap();
        let id = province.construct(template).unwrap();

        assert_eq!(province.upgrade_building(id).unwrap(), 2);
        assert_eq!(province.unit(id).unwrap().max_employees(), 20);

        let removed = province.demolish_building(id).unwrap();
        assert_eq!(removed.kind, "Workshop");
        assert!(province.units().is_empty());
        assert!(matches!(
            province.upgrade_building(id),
            Err(EconomyError::BuildingNotFound(_))
        ));
        assert!(matches!(
            province.demolish_building(UnitId(42)),
            Err(EconomyError::BuildingNotFound(_))
        ));
    }

    #[test]
    fn test_unit_ids_are_sequential() {
        let config = GameConfig::standard();
        let mut province = bare_province(0, dec!(0));
        let template = config.template("WheatFarm").unwrap();
        let first = province.construct(template).unwrap();
        let second = province.construct(template).unwrap();
        province.demolish_building(first).unwrap();
        let third = province.construct(template).unwrap();

        assert_eq!((first, second, third), (UnitId(0), UnitId(1), UnitId(2)));
    }

    #[test]
    fn test_snapshot_reports_buildings_and_market() {
        let config = GameConfig::standard();
        let seed = &config.countries[0].provinces[1];
        let province = Province::new(seed, &config).unwrap();
        let snapshot = province.snapshot();

        assert_eq!(snapshot.id, "southvale");
        assert_eq!(snapshot.population, 800);
        assert_eq!(snapshot.buildings.len(), 80);
        assert_eq!(snapshot.buildings[0].max_employees, 1);
        assert_eq!(snapshot.market["wheat"].amount, 400);
        assert_eq!(snapshot.segments.len(), 3);
    }
}
