use crate::config::GameConfig;
use crate::error::{EconomyError, Result};
use crate::events::{EventLogger, EventType};
use crate::province::{Province, ProvinceSnapshot};
use crate::types::UnitId;

#[derive(Debug, Clone)]
pub struct Country {
    pub id: String,
    pub province_ids: Vec<String>,
}

/// Outcome of one world tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldTick {
    pub day: u64,
    pub advanced: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Every country and province plus the static catalog they were built from.
///
/// Provinces are advanced in configuration order. A province whose tick fails
/// is logged and skipped for that day; the others still advance.
pub struct World {
    config: GameConfig,
    countries: Vec<Country>,
    provinces: Vec<Province>,
    day: u64,
    logger: EventLogger,
}

impl World {
    pub fn new(config: GameConfig) -> Result<Self> {
        config.validate()?;

        let mut countries = Vec::new();
        let mut provinces = Vec::new();
        for country in &config.countries {
            let mut province_ids = Vec::new();
            for seed in &country.provinces {
                provinces.push(Province::new(seed, &config)?);
                province_ids.push(seed.id.clone());
            }
            countries.push(Country {
                id: country.id.clone(),
                province_ids,
            });
        }

        log::info!(
            "World {} created: {} countries, {} provinces",
            config.name,
            countries.len(),
            provinces.len()
        );

        Ok(Self {
            config,
            countries,
            provinces,
            day: 0,
            logger: EventLogger::new(),
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn countries(&self) -> &[Country] {
        &self.countries
    }

    pub fn current_day(&self) -> u64 {
        self.day
    }

    pub fn provinces(&self) -> &[Province] {
        &self.provinces
    }

    pub fn province(&self, id: &str) -> Option<&Province> {
        self.provinces.iter().find(|p| p.id == id)
    }

    pub fn province_mut(&mut self, id: &str) -> Option<&mut Province> {
        self.provinces.iter_mut().find(|p| p.id == id)
    }

    fn require_province(&mut self, id: &str) -> Result<&mut Province> {
        self.provinces
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| EconomyError::ProvinceNotFound(id.to_string()))
    }

    pub fn logger(&self) -> &EventLogger {
        &self.logger
    }

    pub fn logger_mut(&mut self) -> &mut EventLogger {
        &mut self.logger
    }

    /// Advances every province by one day.
    pub fn tick(&mut self) -> WorldTick {
        self.day += 1;
        let mut result = WorldTick {
            day: self.day,
            ..WorldTick::default()
        };

        for province in &mut self.provinces {
            match province.tick(self.day, &mut self.logger) {
                Ok(_) => result.advanced.push(province.id.clone()),
                Err(e) => {
                    log::warn!("Province {} failed on day {}: {}", province.id, self.day, e);
                    result.failed.push((province.id.clone(), e.to_string()));
                }
            }
        }
        result
    }

    pub fn run(&mut self, days: u64) {
        for _ in 0..days {
            let result = self.tick();
            if result.day % 30 == 0 {
                log::info!(
                    "Day {}: total population {}",
                    result.day,
                    self.provinces.iter().map(|p| p.population.total()).sum::<u64>()
                );
            }
        }
    }

    /// Instantiates a level-1 unit of `template_id` in `province_id`.
    pub fn construct_building(&mut self, province_id: &str, template_id: &str) -> Result<UnitId> {
        let template = self
            .config
            .template(template_id)
            .ok_or_else(|| EconomyError::TemplateNotFound(template_id.to_string()))?
            .clone();
        let day = self.day;
        let province = self.require_province(province_id)?;
        let unit_id = province.construct(&template)?;

        log::info!("Constructed {} {} in {}", template.id, unit_id, province_id);
        self.logger.log(
            day,
            province_id,
            EventType::BuildingConstructed {
                unit_id,
                kind: template.id,
            },
        );
        Ok(unit_id)
    }

    pub fn upgrade_building(&mut self, province_id: &str, unit_id: UnitId) -> Result<u32> {
        let day = self.day;
        let province = self.require_province(province_id)?;
        let level = province.upgrade_building(unit_id)?;
        let kind = province
            .unit(unit_id)
            .map(|u| u.kind.clone())
            .unwrap_or_default();

        self.logger.log(
            day,
            province_id,
            EventType::BuildingUpgraded {
                unit_id,
                kind,
                level,
            },
        );
        Ok(level)
    }

    pub fn demolish_building(&mut self, province_id: &str, unit_id: UnitId) -> Result<()> {
        let day = self.day;
        let province = self.require_province(province_id)?;
        let unit = province.demolish_building(unit_id)?;

        self.logger.log(
            day,
            province_id,
            EventType::BuildingDemolished {
                unit_id,
                kind: unit.kind,
            },
        );
        Ok(())
    }

    pub fn snapshot(&self) -> Vec<ProvinceSnapshot> {
        self.provinces.iter().map(Province::snapshot).collect()
    }
}
