//! Production units: one building instance with its own input and output storage.
//!
//! Output scales with the lower of two efficiencies. Staffing efficiency is the
//! share of the unit's employee capacity that is filled; resource efficiency is
//! the mean, over every required input, of how much of the full-rate amount is
//! stocked. Building kinds differ only in their coefficients, so a farm, a mine
//! and a factory are all the same type here.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::BuildingTemplate;
use crate::error::{EconomyError, Result};
use crate::ledger::Ledger;
use crate::types::UnitId;

/// Commodity id to per-level base amount.
pub type Requirement = BTreeMap<String, u64>;

/// At or below this staffing share a unit neither orders inputs nor works.
pub const MIN_STAFFING_EFFICIENCY: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct ProductionUnit {
    pub id: UnitId,
    /// Template id; also the key into the labor priority table.
    pub kind: String,
    pub level: u32,
    pub output_multiplier: u64,
    pub capacity_per_level: u32,
    current_employees: u32,
    pub inputs: Vec<Requirement>,
    pub outputs: Vec<Requirement>,
    pub input_storage: Ledger,
    pub output_storage: Ledger,
}

/// What one call to [`ProductionUnit::work`] did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkOutcome {
    pub output: u64,
    pub consumed: Vec<(String, u64)>,
    pub produced: Vec<(String, u64)>,
    /// Inputs whose deduction was skipped because the stock fell short.
    pub shortfalls: Vec<String>,
}

impl WorkOutcome {
    pub fn is_idle(&self) -> bool {
        self.output == 0
    }
}

impl ProductionUnit {
    pub fn new(
        id: UnitId,
        kind: impl Into<String>,
        capacity_per_level: u32,
        output_multiplier: u64,
        inputs: Vec<Requirement>,
        outputs: Vec<Requirement>,
    ) -> Self {
        Self {
            id,
            kind: kind.into(),
            level: 1,
            output_multiplier,
            capacity_per_level,
            current_employees: 0,
            inputs,
            outputs,
            input_storage: Ledger::new(),
            output_storage: Ledger::new(),
        }
    }

    /// Level-1 unit with no employees, using the template's first production
    /// method and first production type.
    pub fn from_template(id: UnitId, template: &BuildingTemplate) -> Result<Self> {
        let method = template.production_methods.first().ok_or_else(|| {
            EconomyError::Config(format!("Template {} has no production method", template.id))
        })?;

        let mut inputs = vec![method.input.clone()];
        let mut outputs = Vec::new();
        if let Some(production_type) = template.production_types.first() {
            inputs.push(production_type.input.clone());
            outputs.push(production_type.output.clone());
        }
        inputs.retain(|requirement| !requirement.is_empty());

        Ok(Self::new(
            id,
            template.id.clone(),
            method.employees_needed,
            method.output_multiplier,
            inputs,
            outputs,
        ))
    }

    pub fn max_employees(&self) -> u32 {
        self.capacity_per_level.saturating_mul(self.level)
    }

    pub fn current_employees(&self) -> u32 {
        self.current_employees
    }

    /// Sets staffing, clamped to the unit's capacity.
    pub fn set_employees(&mut self, employees: u32) {
        self.current_employees = employees.min(self.max_employees());
    }

    pub fn upgrade(&mut self) {
        self.level += 1;
    }

    pub fn employee_efficiency(&self) -> f64 {
        let capacity = self.max_employees().max(1);
        (self.current_employees as f64 / capacity as f64).min(1.0)
    }

    fn requirement_pairs(&self) -> impl Iterator<Item = (&str, u64)> {
        self.inputs
            .iter()
            .flat_map(|requirement| requirement.iter().map(|(c, a)| (c.as_str(), *a)))
    }

    /// Mean stocked share of what a full cycle at the current level consumes of
    /// each input; 1.0 with no requirements.
    pub fn resource_efficiency(&self) -> f64 {
        let mut total = 0.0;
        let mut count = 0usize;
        for (commodity, base) in self.requirement_pairs() {
            let required = base.saturating_mul(self.level as u64);
            let share = if required == 0 {
                1.0
            } else {
                (self.input_storage.get(commodity) as f64 / required as f64).min(1.0)
            };
            total += share;
            count += 1;
        }
        if count == 0 { 1.0 } else { total / count as f64 }
    }

    /// Units of output the next `work` call would produce.
    pub fn actual_output(&self) -> u64 {
        let employee_efficiency = self.employee_efficiency();
        if employee_efficiency <= MIN_STAFFING_EFFICIENCY {
            return 0;
        }
        let total_efficiency = employee_efficiency.min(self.resource_efficiency());
        if total_efficiency <= 0.0 {
            return 0;
        }
        let potential = self.level as f64 * self.output_multiplier as f64;
        (potential * total_efficiency).floor() as u64
    }

    /// Additional input quantities the unit wants to buy this tick.
    pub fn calculate_needs(&self) -> BTreeMap<String, u64> {
        let mut needs = BTreeMap::new();
        if self.current_employees == 0 || self.inputs.is_empty() {
            return needs;
        }

        let employee_efficiency = self.employee_efficiency();
        if employee_efficiency <= MIN_STAFFING_EFFICIENCY {
            return needs;
        }

        for (commodity, base) in self.requirement_pairs() {
            let max_needed = base
                .saturating_mul(self.level as u64)
                .saturating_mul(self.output_multiplier);
            let actual_needed = (max_needed as f64 * employee_efficiency).floor() as u64;
            let needed = actual_needed.saturating_sub(self.input_storage.get(commodity));
            if needed > 0 {
                *needs.entry(commodity.to_string()).or_insert(0) += needed;
            }
        }

        needs
    }

    /// Runs one production cycle against the unit's own storage.
    ///
    /// Each input is consumed in proportion to the output actually made. An input
    /// whose stock cannot cover its share is left untouched while the rest of the
    /// cycle proceeds.
    pub fn work(&mut self) -> WorkOutcome {
        let output = self.actual_output();
        if output == 0 {
            return WorkOutcome::default();
        }

        let mut outcome = WorkOutcome {
            output,
            ..WorkOutcome::default()
        };

        let multiplier = self.output_multiplier.max(1);
        let pairs: Vec<(String, u64)> = self
            .requirement_pairs()
            .map(|(c, a)| (c.to_string(), a))
            .collect();
        for (commodity, base) in pairs {
            let amount = base.saturating_mul(output).div_ceil(multiplier);
            if self.input_storage.take(&commodity, amount) {
                outcome.consumed.push((commodity, amount));
            } else {
                outcome.shortfalls.push(commodity);
            }
        }

        for requirement in &self.outputs {
            for (commodity, amount) in requirement {
                let produced = amount.saturating_mul(output);
                self.output_storage.add(commodity, produced);
                outcome.produced.push((commodity.clone(), produced));
            }
        }

        outcome
    }
}
