use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one production unit, unique within its province.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic id source owned by a province.
#[derive(Debug, Clone, Default)]
pub struct UnitIdGenerator {
    next: u64,
}

impl UnitIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> UnitId {
        let id = UnitId(self.next);
        self.next += 1;
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Material,
    Goods,
    Construction,
}

/// Social class of a population segment, ordered by prestige.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SocialClass {
    Lower,
    Middle,
    Upper,
}

impl SocialClass {
    pub fn index(self) -> usize {
        match self {
            SocialClass::Lower => 0,
            SocialClass::Middle => 1,
            SocialClass::Upper => 2,
        }
    }

    /// Market priority of orders placed by this class.
    pub fn order_priority(self) -> Priority {
        match self {
            SocialClass::Lower => Priority::Low,
            SocialClass::Middle => Priority::Medium,
            SocialClass::Upper => Priority::High,
        }
    }
}

impl fmt::Display for SocialClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SocialClass::Lower => "lower",
            SocialClass::Middle => "middle",
            SocialClass::Upper => "upper",
        };
        write!(f, "{}", name)
    }
}

/// Tie-break class for buy orders with equal limit prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Kind of need a population segment tracks satisfaction for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Need {
    Food,
    Clothing,
    Furniture,
    Luxury,
    Art,
}

impl fmt::Display for Need {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Need::Food => "food",
            Need::Clothing => "clothing",
            Need::Furniture => "furniture",
            Need::Luxury => "luxury",
            Need::Art => "art",
        };
        write!(f, "{}", name)
    }
}
