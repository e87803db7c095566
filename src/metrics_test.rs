#[cfg(test)]
mod tests {
    use super::super::events::*;
    use super::super::metrics::*;
    use crate::market::Originator;
    use crate::types::{SocialClass, UnitId};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn event(tick: u64, province_id: &str, event_type: EventType) -> Event {
        Event {
            timestamp: Utc::now(),
            tick,
            province_id: province_id.to_string(),
            event_type,
        }
    }

    fn snapshot(lower: u64, middle: u64, upper: u64) -> EventType {
        EventType::ProvinceSnapshot {
            lower,
            middle,
            upper,
            money: dec!(500),
            buildings: 3,
            stockpile: 100,
        }
    }

    fn create_test_events() -> Vec<Event> {
        vec![
            event(
                1,
                "north",
                EventType::GoodsProduced {
                    kind: "WheatFarm".to_string(),
                    commodity: "wheat".to_string(),
                    amount: 40,
                    units: 1,
                },
            ),
            event(
                1,
                "north",
                EventType::TradeExecuted {
                    commodity: "wheat".to_string(),
                    amount: 10,
                    price: dec!(2.5),
                    buyer: Originator::Segment(SocialClass::Lower),
                    seller: Originator::Stockpile,
                },
            ),
            event(
                1,
                "north",
                EventType::PriceChanged {
                    commodity: "wheat".to_string(),
                    old_price: dec!(2),
                    new_price: dec!(2.15),
                    traded_volume: 10,
                },
            ),
            event(
                1,
                "north",
                EventType::WorkersAllocated {
                    available: 100,
                    employed: 50,
                    unemployed: 50,
                    by_kind: BTreeMap::new(),
                },
            ),
            event(1, "north", snapshot(90, 10, 0)),
            event(
                2,
                "north",
                EventType::GoodsProduced {
                    kind: "WheatFarm".to_string(),
                    commodity: "wheat".to_string(),
                    amount: 20,
                    units: 1,
                },
            ),
            event(
                2,
                "north",
                EventType::WorkersAllocated {
                    available: 100,
                    employed: 100,
                    unemployed: 0,
                    by_kind: BTreeMap::new(),
                },
            ),
            event(
                2,
                "north",
                EventType::SocialMobility {
                    lower_to_middle: 2,
                    middle_to_upper: 1,
                    middle_to_lower: 0,
                    upper_to_middle: 0,
                },
            ),
            event(
                2,
                "north",
                EventType::BuildingConstructed {
                    unit_id: UnitId(4),
                    kind: "IronMine".to_string(),
                },
            ),
            event(2, "north", snapshot(88, 11, 1)),
            event(2, "south", snapshot(30, 0, 0)),
        ]
    }

    #[test]
    fn test_province_metrics_calculation() {
        let events = create_test_events();
        let metrics = MetricsCalculator::calculate_province_metrics("north", &events, 100);

        assert_eq!(metrics.province_id, "north");
        assert_eq!(metrics.final_population, 100);
        assert_eq!(metrics.peak_population, 100);
        assert_eq!(metrics.days_observed, 2);
        assert_eq!(metrics.goods_produced["wheat"], 60);
        assert_eq!(metrics.trades_executed, 1);
        assert_eq!(metrics.trade_volume, 10);
        assert_eq!(metrics.trade_value, dec!(25));
        assert_eq!(metrics.price_changes, 1);
        assert!((metrics.largest_price_move - 0.075).abs() < 1e-9);
        assert!((metrics.mean_employment_rate - 0.75).abs() < 1e-9);
        assert_eq!(metrics.promotions, 3);
        assert_eq!(metrics.demotions, 0);
        assert_eq!(metrics.buildings_constructed, 1);
        assert_eq!(metrics.final_buildings, 3);
        let [lower, middle, upper] = metrics.final_class_shares;
        assert!((lower - 0.88).abs() < 1e-9);
        assert!((middle - 0.11).abs() < 1e-9);
        assert!((upper - 0.01).abs() < 1e-9);
        // lower share fell from 0.90 to 0.88
        assert!((metrics.class_share_drift - 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_province_with_no_events_keeps_initial_state() {
        let metrics = MetricsCalculator::calculate_province_metrics("nowhere", &[], 40);
        assert_eq!(metrics.final_population, 40);
        assert_eq!(metrics.trades_executed, 0);
        assert_eq!(metrics.mean_employment_rate, 0.0);
        assert_eq!(metrics.class_share_drift, 0.0);
    }

    #[test]
    fn test_run_metrics_from_log() {
        let events = create_test_events();
        let run = MetricsCalculator::calculate_from_log(&events);

        assert_eq!(run.total_days, 2);
        assert_eq!(run.provinces.len(), 2);
        assert_eq!(run.provinces["north"].initial_population, 100);
        assert_eq!(run.provinces["south"].initial_population, 30);
        assert_eq!(run.total_population, 130);
        assert_eq!(run.total_trade_volume, 10);
        assert!(run.population_inequality > 0.0);

        let display = format!("{}", run);
        assert!(display.contains("Run Metrics (2 days)"));
        assert!(display.contains("Province north Metrics"));
    }

    #[test]
    fn test_gini_coefficient() {
        let equal = vec![10.0, 10.0, 10.0, 10.0];
        assert!((MetricsCalculator::calculate_gini_coefficient(&equal) - 0.0).abs() < 0.001);

        let unequal = vec![0.0, 0.0, 0.0, 100.0];
        assert!((MetricsCalculator::calculate_gini_coefficient(&unequal) - 0.75).abs() < 0.001);

        assert_eq!(MetricsCalculator::calculate_gini_coefficient(&[]), 0.0);
    }
}
