//! Static game data: commodity catalog, building templates and province seeds.
//!
//! Configuration files are JSON or YAML and use the camelCase field names of the
//! template format (`productionMethods`, `employeesNeeded`, ...).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::error::{EconomyError, Result};
use crate::market::{PRICE_CEILING, PRICE_FLOOR};
use crate::production::Requirement;
use crate::types::Category;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommodityDef {
    pub id: String,
    pub category: Category,
    #[serde(default = "default_base_price")]
    pub base_price: Decimal,
    #[serde(default)]
    pub initial_stock: u64,
}

fn default_base_price() -> Decimal {
    dec!(20)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionMethod {
    pub id: String,
    #[serde(default)]
    pub input: Requirement,
    #[serde(default)]
    pub require_tech: Vec<String>,
    pub employees_needed: u32,
    pub output_multiplier: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionType {
    pub id: String,
    #[serde(default)]
    pub input: Requirement,
    #[serde(default)]
    pub output: Requirement,
    #[serde(default)]
    pub require_tech: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingTemplate {
    pub id: String,
    pub production_methods: Vec<ProductionMethod>,
    #[serde(default)]
    pub production_types: Vec<ProductionType>,
}

impl BuildingTemplate {
    fn commodity_refs(&self) -> impl Iterator<Item = &String> {
        self.production_methods
            .iter()
            .flat_map(|m| m.input.keys())
            .chain(
                self.production_types
                    .iter()
                    .flat_map(|t| t.input.keys().chain(t.output.keys())),
            )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvinceSeed {
    pub id: String,
    pub population: u64,
    /// Share of the initial population placed in the middle class.
    #[serde(default)]
    pub middle_share: f64,
    #[serde(default)]
    pub upper_share: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryConfig {
    pub id: String,
    pub provinces: Vec<ProvinceSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketParams {
    /// Stockpile sell orders ask at least this fraction of the current price.
    pub sell_discount: Decimal,
    /// Production units bid up to this multiple of the current price.
    pub building_markup: Decimal,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self {
            sell_discount: dec!(0.9),
            building_markup: dec!(1.5),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PopulationParams {
    pub lower_wealth_per_capita: Decimal,
    pub middle_wealth_per_capita: Decimal,
    pub upper_wealth_per_capita: Decimal,
    /// Share of the wage pool paid to the upper class.
    pub owner_share: Decimal,
    /// One subsistence farm is created per this many inhabitants.
    pub subsistence_divisor: u64,
}

impl Default for PopulationParams {
    fn default() -> Self {
        Self {
            lower_wealth_per_capita: dec!(10),
            middle_wealth_per_capita: dec!(50),
            upper_wealth_per_capita: dec!(200),
            owner_share: dec!(0.2),
            subsistence_divisor: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub commodities: Vec<CommodityDef>,
    #[serde(default)]
    pub buildings: Vec<BuildingTemplate>,
    #[serde(default)]
    pub countries: Vec<CountryConfig>,
    #[serde(default)]
    pub market: MarketParams,
    #[serde(default)]
    pub population: PopulationParams,
}

impl GameConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            commodities: Vec::new(),
            buildings: Vec::new(),
            countries: Vec::new(),
            market: MarketParams::default(),
            population: PopulationParams::default(),
        }
    }

    pub fn commodity(&self, id: &str) -> Option<&CommodityDef> {
        self.commodities.iter().find(|c| c.id == id)
    }

    pub fn template(&self, id: &str) -> Option<&BuildingTemplate> {
        self.buildings.iter().find(|b| b.id == id)
    }

    pub fn provinces(&self) -> impl Iterator<Item = &ProvinceSeed> {
        self.countries.iter().flat_map(|c| c.provinces.iter())
    }

    /// Loads a configuration; `.yaml`/`.yml` files are read as YAML, anything
    /// else as JSON.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let config: Self = if is_yaml {
            serde_yaml::from_str(&contents)?
        } else {
            serde_json::from_str(&contents)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.commodities.is_empty() {
            return Err(EconomyError::Config(
                "Configuration must define at least one commodity".to_string(),
            ));
        }

        let mut commodity_ids = HashSet::new();
        for commodity in &self.commodities {
            if !commodity_ids.insert(commodity.id.as_str()) {
                return Err(EconomyError::Config(format!(
                    "Duplicate commodity {}",
                    commodity.id
                )));
            }
            if commodity.base_price < PRICE_FLOOR || commodity.base_price > PRICE_CEILING {
                return Err(EconomyError::InvalidQuantity(format!(
                    "Commodity {} has base price {} outside [{}, {}]",
                    commodity.id, commodity.base_price, PRICE_FLOOR, PRICE_CEILING
                )));
            }
        }

        let mut template_ids = HashSet::new();
        for template in &self.buildings {
            if !template_ids.insert(template.id.as_str()) {
                return Err(EconomyError::Config(format!(
                    "Duplicate building template {}",
                    template.id
                )));
            }
            if template.production_methods.is_empty() {
                return Err(EconomyError::Config(format!(
                    "Building template {} has no production method",
                    template.id
                )));
            }
            if let Some(unknown) = template
                .commodity_refs()
                .find(|c| !commodity_ids.contains(c.as_str()))
            {
                return Err(EconomyError::UnknownCommodity(format!(
                    "{} (referenced by template {})",
                    unknown, template.id
                )));
            }
        }

        let mut province_ids = HashSet::new();
        for seed in self.provinces() {
            if !province_ids.insert(seed.id.as_str()) {
                return Err(EconomyError::Config(format!("Duplicate province {}", seed.id)));
            }
            let shares_valid = seed.middle_share.is_finite()
                && seed.upper_share.is_finite()
                && seed.middle_share >= 0.0
                && seed.upper_share >= 0.0
                && seed.middle_share + seed.upper_share <= 1.0;
            if !shares_valid {
                return Err(EconomyError::InvalidQuantity(format!(
                    "Province {} has invalid class shares",
                    seed.id
                )));
            }
        }

        if self.market.sell_discount <= Decimal::ZERO || self.market.building_markup <= Decimal::ZERO {
            return Err(EconomyError::InvalidQuantity(
                "Market price factors must be positive".to_string(),
            ));
        }
        if self.population.owner_share < Decimal::ZERO || self.population.owner_share > Decimal::ONE {
            return Err(EconomyError::InvalidQuantity(
                "Owner share must lie in [0, 1]".to_string(),
            ));
        }
        let wealth = [
            self.population.lower_wealth_per_capita,
            self.population.middle_wealth_per_capita,
            self.population.upper_wealth_per_capita,
        ];
        if wealth.iter().any(|w| *w < Decimal::ZERO) {
            return Err(EconomyError::InvalidQuantity(
                "Wealth per capita must not be negative".to_string(),
            ));
        }

        Ok(())
    }

    /// Built-in catalog with one country and two provinces.
    pub fn standard() -> Self {
        let mut config = GameConfig::new("standard");
        config.description = "Two provinces with the full building catalog".to_string();

        config.commodities = vec![
            commodity("wheat", Category::Material, dec!(2), 400),
            commodity("rice", Category::Material, dec!(3), 200),
            commodity("maize", Category::Material, dec!(2), 150),
            commodity("wood", Category::Material, dec!(4), 300),
            commodity("iron", Category::Material, dec!(8), 100),
            commodity("coal", Category::Material, dec!(6), 100),
            commodity("cloth", Category::Goods, dec!(6), 150),
            commodity("plank", Category::Construction, dec!(7), 50),
            commodity("furniture", Category::Goods, dec!(20), 50),
            commodity("glass", Category::Goods, dec!(15), 20),
            commodity("tool", Category::Goods, dec!(25), 20),
        ];

        config.buildings = vec![
            template("WheatFarm", 20, 40, &[], &[], &[("wheat", 1)]),
            template("RiceFarm", 20, 25, &[], &[], &[("rice", 1)]),
            template("MaizeFarm", 20, 20, &[], &[], &[("maize", 1)]),
            template("LoggingCamp", 15, 20, &[], &[], &[("wood", 1)]),
            template("IronMine", 20, 10, &[("tool", 1)], &[("wood", 5)], &[("iron", 1)]),
            template("CoalMine", 20, 10, &[("tool", 1)], &[("wood", 5)], &[("coal", 1)]),
            template("TextileMill", 15, 20, &[], &[("coal", 5)], &[("cloth", 1)]),
            template("LumberMill", 10, 20, &[], &[("wood", 20)], &[("plank", 1)]),
            template("FurnitureFactory", 15, 5, &[], &[("plank", 10)], &[("furniture", 1)]),
            template("Glassworks", 10, 5, &[], &[("coal", 5)], &[("glass", 1)]),
            template("Workshop", 10, 5, &[("coal", 2)], &[("iron", 5)], &[("tool", 1)]),
            template(
                "subsistenceFarm",
                1,
                1,
                &[],
                &[],
                &[("wheat", 5), ("cloth", 1), ("furniture", 1), ("wood", 2)],
            ),
        ];

        config.countries = vec![CountryConfig {
            id: "kingdom".to_string(),
            provinces: vec![
                ProvinceSeed {
                    id: "northmarch".to_string(),
                    population: 1000,
                    middle_share: 0.0,
                    upper_share: 0.0,
                },
                ProvinceSeed {
                    id: "southvale".to_string(),
                    population: 800,
                    middle_share: 0.15,
                    upper_share: 0.02,
                },
            ],
        }];

        config
    }
}

fn commodity(id: &str, category: Category, base_price: Decimal, initial_stock: u64) -> CommodityDef {
    CommodityDef {
        id: id.to_string(),
        category,
        base_price,
        initial_stock,
    }
}

fn requirement(items: &[(&str, u64)]) -> Requirement {
    items.iter().map(|(c, a)| (c.to_string(), *a)).collect()
}

fn template(
    id: &str,
    employees_needed: u32,
    output_multiplier: u64,
    method_input: &[(&str, u64)],
    type_input: &[(&str, u64)],
    output: &[(&str, u64)],
) -> BuildingTemplate {
    BuildingTemplate {
        id: id.to_string(),
        production_methods: vec![ProductionMethod {
            id: format!("{}_basic", id),
            input: requirement(method_input),
            require_tech: Vec::new(),
            employees_needed,
            output_multiplier,
        }],
        production_types: vec![ProductionType {
            id: format!("{}_default", id),
            input: requirement(type_input),
            output: requirement(output),
            require_tech: Vec::new(),
        }],
    }
}

impl fmt::Display for GameConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Configuration: {}", self.name)?;
        if !self.description.is_empty() {
            writeln!(f, "Description: {}", self.description)?;
        }
        writeln!(f, "\nCommodities:")?;
        for commodity in &self.commodities {
            writeln!(
                f,
                "  {} ({:?}) price {} stock {}",
                commodity.id, commodity.category, commodity.base_price, commodity.initial_stock
            )?;
        }
        writeln!(f, "\nBuildings: {}", self.buildings.len())?;
        for country in &self.countries {
            writeln!(f, "\nCountry: {}", country.id)?;
            for province in &country.provinces {
                writeln!(
                    f,
                    "  Province {}: population {}",
                    province.id, province.population
                )?;
            }
        }
        Ok(())
    }
}
