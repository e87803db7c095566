use serde::Serialize;
use std::collections::BTreeMap;

use crate::production::ProductionUnit;

/// Priority for unit kinds missing from the table.
pub const DEFAULT_LABOR_PRIORITY: u32 = 10;

/// Share of the middle class that takes jobs, in tenths.
const MIDDLE_CLASS_WORKFORCE_TENTHS: u64 = 7;

/// Static staffing order: food first, then raw extraction, intermediate
/// materials and finally consumer goods.
pub fn labor_priority(kind: &str) -> u32 {
    match kind {
        "WheatFarm" => 100,
        "RiceFarm" => 95,
        "MaizeFarm" => 90,
        "LoggingCamp" => 85,
        "IronMine" => 80,
        "CoalMine" => 75,
        "TextileMill" => 70,
        "LumberMill" => 65,
        "FurnitureFactory" => 60,
        "Glassworks" => 55,
        "Workshop" => 50,
        "subsistenceFarm" => 40,
        _ => DEFAULT_LABOR_PRIORITY,
    }
}

/// Workers the lower and middle classes can supply. The upper class never works.
pub fn available_workers(lower: u64, middle: u64) -> u64 {
    lower + middle * MIDDLE_CLASS_WORKFORCE_TENTHS / 10
}

/// Result of one allocation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmploymentTally {
    pub available_workers: u64,
    pub total_demand: u64,
    pub employed: u64,
    /// Workers left without a job after every unit was staffed.
    pub unemployed: u64,
    /// Employed workers drawn from the lower class.
    pub from_lower: u64,
    /// Employed workers drawn from the middle class.
    pub from_middle: u64,
    pub by_kind: BTreeMap<String, u64>,
}

impl EmploymentTally {
    pub fn employment_rate(&self) -> f64 {
        if self.available_workers == 0 {
            0.0
        } else {
            self.employed as f64 / self.available_workers as f64
        }
    }
}

/// Resets every unit's staffing and redistributes the available workforce.
///
/// Each unit receives its capacity scaled by `min(1, available / demand)`,
/// visited in descending [`labor_priority`] with ties kept in list order.
/// Scaling is done in integers so the result is exact.
pub fn allocate_workers(units: &mut [ProductionUnit], lower: u64, middle: u64) -> EmploymentTally {
    for unit in units.iter_mut() {
        unit.set_employees(0);
    }

    let available = available_workers(lower, middle);
    let total_demand: u64 = units.iter().map(|u| u.max_employees() as u64).sum();
    let denominator = total_demand.max(1);

    let mut order: Vec<usize> = (0..units.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(labor_priority(&units[i].kind)));

    let mut remaining = available;
    let mut by_kind: BTreeMap<String, u64> = BTreeMap::new();
    for index in order {
        if remaining == 0 {
            break;
        }
        let unit = &mut units[index];
        let desired = unit.max_employees() as u64;
        let scaled = if available >= total_demand {
            desired
        } else {
            desired * available / denominator
        };
        let assigned = scaled.min(remaining);
        if assigned == 0 {
            continue;
        }

        // assigned <= desired, which came from a u32
        unit.set_employees(assigned as u32);
        remaining -= assigned;
        *by_kind.entry(unit.kind.clone()).or_insert(0) += assigned;
    }

    let employed = available - remaining;
    let from_lower = employed.min(lower);
    EmploymentTally {
        available_workers: available,
        total_demand,
        employed,
        unemployed: remaining,
        from_lower,
        from_middle: employed - from_lower,
        by_kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnitId;

    fn unit(id: u64, kind: &str, capacity: u32) -> ProductionUnit {
        ProductionUnit::new(UnitId(id), kind, capacity, 10, vec![], vec![])
    }

    #[test]
    fn test_priority_table() {
        assert!(labor_priority("WheatFarm") > labor_priority("IronMine"));
        assert!(labor_priority("IronMine") > labor_priority("LumberMill"));
        assert!(labor_priority("LumberMill") > labor_priority("Workshop"));
        assert_eq!(labor_priority("observatory"), DEFAULT_LABOR_PRIORITY);
    }

    #[test]
    fn test_full_employment_when_workers_exceed_demand() {
        let mut units = vec![unit(0, "WheatFarm", 10), unit(1, "Workshop", 5)];
        let tally = allocate_workers(&mut units, 100, 0);

        assert_eq!(units[0].current_employees(), 10);
        assert_eq!(units[1].current_employees(), 5);
        assert_eq!(tally.employed, 15);
        assert_eq!(tally.unemployed, 85);
        assert_eq!(tally.by_kind["WheatFarm"], 10);
    }

    #[test]
    fn test_scarce_workers_scale_every_unit() {
        let mut units = vec![unit(0, "Workshop", 10), unit(1, "WheatFarm", 30)];
        // 10 lower + floor(0.7 * 3) = 12 workers for 40 slots
        let tally = allocate_workers(&mut units, 10, 3);

        assert_eq!(tally.available_workers, 12);
        assert_eq!(tally.total_demand, 40);
        assert_eq!(units[1].current_employees(), 9);
        assert_eq!(units[0].current_employees(), 3);
        assert_eq!(tally.employed, 12);
        assert_eq!(tally.unemployed, 0);
        assert_eq!((tally.from_lower, tally.from_middle), (10, 2));
    }

    #[test]
    fn test_rounding_remainder_stays_unemployed() {
        let mut units = vec![unit(0, "WheatFarm", 3), unit(1, "WheatFarm", 3), unit(2, "IronMine", 3)];
        let tally = allocate_workers(&mut units, 4, 0);

        // floor(3 * 4 / 9) = 1 each
        assert!(units.iter().all(|u| u.current_employees() == 1));
        assert_eq!(tally.employed, 3);
        assert_eq!(tally.unemployed, 1);
    }

    #[test]
    fn test_reallocation_resets_previous_staffing() {
        let mut units = vec![unit(0, "CoalMine", 20)];
        allocate_workers(&mut units, 20, 0);
        assert_eq!(units[0].current_employees(), 20);

        let tally = allocate_workers(&mut units, 0, 0);
        assert_eq!(units[0].current_employees(), 0);
        assert_eq!(tally.employed, 0);
        assert!(tally.by_kind.is_empty());
    }

    #[test]
    fn test_no_units_leaves_everyone_unemployed() {
        let tally = allocate_workers(&mut [], 50, 10);
        assert_eq!(tally.total_demand, 0);
        assert_eq!(tally.unemployed, 57);
        assert_eq!(tally.employment_rate(), 0.0);
    }

    #[test]
    fn test_employment_never_exceeds_available_workers() {
        for lower in [0u64, 1, 7, 33, 250] {
            for middle in [0u64, 5, 41] {
                let mut units = vec![
                    unit(0, "WheatFarm", 17),
                    unit(1, "TextileMill", 9),
                    unit(2, "Glassworks", 23),
                    unit(3, "observatory", 4),
                ];
                let tally = allocate_workers(&mut units, lower, middle);
                let staffed: u64 = units.iter().map(|u| u.current_employees() as u64).sum();
                assert_eq!(staffed, tally.employed);
                assert!(staffed <= available_workers(lower, middle));
                assert!(units.iter().all(|u| u.current_employees() <= u.max_employees()));
            }
        }
    }
}
