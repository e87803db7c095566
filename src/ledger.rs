use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-entity quantity store keyed by commodity id.
///
/// Quantities are unsigned, so a ledger can never go negative. Writes are
/// additive deltas; removals only succeed when the full amount is on hand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    items: BTreeMap<String, u64>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, commodity: &str) -> u64 {
        self.items.get(commodity).copied().unwrap_or(0)
    }

    pub fn add(&mut self, commodity: &str, amount: u64) {
        if amount == 0 {
            return;
        }
        *self.items.entry(commodity.to_string()).or_insert(0) += amount;
    }

    /// Removes `amount` if the full quantity is stocked. Returns whether it did.
    pub fn take(&mut self, commodity: &str, amount: u64) -> bool {
        match self.items.get_mut(commodity) {
            Some(stock) if *stock >= amount => {
                *stock -= amount;
                true
            }
            None if amount == 0 => true,
            _ => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.items.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn is_empty(&self) -> bool {
        self.items.values().all(|v| *v == 0)
    }

    pub fn total(&self) -> u64 {
        self.items.values().sum()
    }

    /// Empties the ledger, returning the non-zero entries.
    pub fn drain(&mut self) -> Vec<(String, u64)> {
        std::mem::take(&mut self.items)
            .into_iter()
            .filter(|(_, v)| *v > 0)
            .collect()
    }
}

impl FromIterator<(String, u64)> for Ledger {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        let mut ledger = Ledger::new();
        for (commodity, amount) in iter {
            ledger.add(&commodity, amount);
        }
        ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_accumulates() {
        let mut ledger = Ledger::new();
        ledger.add("wood", 5);
        ledger.add("wood", 7);
        assert_eq!(ledger.get("wood"), 12);
        assert_eq!(ledger.get("iron"), 0);
    }

    #[test]
    fn test_take_requires_full_amount() {
        let mut ledger = Ledger::new();
        ledger.add("coal", 4);
        assert!(!ledger.take("coal", 5));
        assert_eq!(ledger.get("coal"), 4);
        assert!(ledger.take("coal", 4));
        assert_eq!(ledger.get("coal"), 0);
        assert!(!ledger.take("glass", 1));
    }

    #[test]
    fn test_drain_skips_emptied_entries() {
        let mut ledger: Ledger = vec![("cloth".to_string(), 3), ("tool".to_string(), 2)]
            .into_iter()
            .collect();
        assert!(ledger.take("cloth", 3));
        assert_eq!(ledger.total(), 2);

        let drained = ledger.drain();
        assert_eq!(drained, vec![("tool".to_string(), 2)]);
        assert!(ledger.is_empty());
    }
}
