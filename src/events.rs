use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::Result;
use crate::market::Originator;
use crate::types::UnitId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub tick: u64,
    pub province_id: String,
    pub event_type: EventType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventType {
    /// Output of every unit of one kind, summed per commodity.
    GoodsProduced {
        kind: String,
        commodity: String,
        amount: u64,
        units: usize,
    },
    TradeExecuted {
        commodity: String,
        amount: u64,
        price: Decimal,
        buyer: Originator,
        seller: Originator,
    },
    PriceChanged {
        commodity: String,
        old_price: Decimal,
        new_price: Decimal,
        traded_volume: u64,
    },
    WorkersAllocated {
        available: u64,
        employed: u64,
        unemployed: u64,
        by_kind: BTreeMap<String, u64>,
    },
    SocialMobility {
        lower_to_middle: u64,
        middle_to_upper: u64,
        middle_to_lower: u64,
        upper_to_middle: u64,
    },
    BuildingConstructed {
        unit_id: UnitId,
        kind: String,
    },
    BuildingUpgraded {
        unit_id: UnitId,
        kind: String,
        level: u32,
    },
    BuildingDemolished {
        unit_id: UnitId,
        kind: String,
    },
    ProvinceSnapshot {
        lower: u64,
        middle: u64,
        upper: u64,
        money: Decimal,
        buildings: usize,
        stockpile: u64,
    },
}

impl fmt::Display for Originator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Originator::Stockpile => write!(f, "stockpile"),
            Originator::Building(id) => write!(f, "building {}", id),
            Originator::Segment(class) => write!(f, "{} class", class),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] Province {}: ", self.tick, self.province_id)?;

        match &self.event_type {
            EventType::GoodsProduced {
                kind,
                commodity,
                amount,
                units,
            } => {
                write!(f, "{} x{} produced {} {}", kind, units, amount, commodity)
            }
            EventType::TradeExecuted {
                commodity,
                amount,
                price,
                buyer,
                seller,
            } => {
                write!(
                    f,
                    "{} {} at {} from {} to {}",
                    amount, commodity, price, seller, buyer
                )
            }
            EventType::PriceChanged {
                commodity,
                old_price,
                new_price,
                traded_volume,
            } => {
                write!(
                    f,
                    "{} price {} -> {} (volume {})",
                    commodity, old_price, new_price, traded_volume
                )
            }
            EventType::WorkersAllocated {
                available,
                employed,
                unemployed,
                ..
            } => {
                write!(
                    f,
                    "Allocated {} of {} workers ({} unemployed)",
                    employed, available, unemployed
                )
            }
            EventType::SocialMobility {
                lower_to_middle,
                middle_to_upper,
                middle_to_lower,
                upper_to_middle,
            } => {
                write!(
                    f,
                    "Mobility L->M:{} M->U:{} M->L:{} U->M:{}",
                    lower_to_middle, middle_to_upper, middle_to_lower, upper_to_middle
                )
            }
            EventType::BuildingConstructed { unit_id, kind } => {
                write!(f, "Constructed {} {}", kind, unit_id)
            }
            EventType::BuildingUpgraded {
                unit_id,
                kind,
                level,
            } => {
                write!(f, "Upgraded {} {} to level {}", kind, unit_id, level)
            }
            EventType::BuildingDemolished { unit_id, kind } => {
                write!(f, "Demolished {} {}", kind, unit_id)
            }
            EventType::ProvinceSnapshot {
                lower,
                middle,
                upper,
                money,
                buildings,
                stockpile,
            } => {
                write!(
                    f,
                    "State - Pop:{}/{}/{} Money:{} Buildings:{} Stock:{}",
                    lower, middle, upper, money, buildings, stockpile
                )
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct EventLogger {
    events: Vec<Event>,
}

impl EventLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&mut self, tick: u64, province_id: &str, event_type: EventType) {
        self.events.push(Event {
            timestamp: Utc::now(),
            tick,
            province_id: province_id.to_string(),
            event_type,
        });
    }

    pub fn get_events(&self) -> &[Event] {
        &self.events
    }

    pub fn events_for<'a>(&'a self, province_id: &'a str) -> impl Iterator<Item = &'a Event> {
        self.events.iter().filter(move |e| e.province_id == province_id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.events)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let events: Vec<Event> = serde_json::from_str(&json)?;
        Ok(Self { events })
    }
}
