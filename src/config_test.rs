#[cfg(test)]
mod tests {
    use super::super::config::*;
    use crate::error::EconomyError;
    use crate::types::Category;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn minimal_config() -> GameConfig {
        let mut config = GameConfig::new("minimal");
        config.commodities.push(CommodityDef {
            id: "wheat".to_string(),
            category: Category::Material,
            base_price: dec!(2),
            initial_stock: 10,
        });
        config.countries.push(CountryConfig {
            id: "realm".to_string(),
            provinces: vec![ProvinceSeed {
                id: "valley".to_string(),
                population: 50,
                middle_share: 0.1,
                upper_share: 0.0,
            }],
        });
        config
    }

    #[test]
    fn test_standard_config_is_valid() {
        let config = GameConfig::standard();
        assert!(config.validate().is_ok());
        assert_eq!(config.provinces().count(), 2);
        assert!(config.template("subsistenceFarm").is_some());
        assert_eq!(config.commodity("glass").map(|c| c.base_price), Some(dec!(15)));
    }

    #[test]
    fn test_config_validation() {
        let mut config = GameConfig::new("empty");
        assert!(config.validate().is_err());

        config = minimal_config();
        assert!(config.validate().is_ok());

        config.commodities[0].base_price = dec!(0.01);
        assert!(matches!(config.validate(), Err(EconomyError::InvalidQuantity(_))));

        config = minimal_config();
        let dup = config.countries[0].provinces[0].clone();
        config.countries[0].provinces.push(dup);
        assert!(matches!(config.validate(), Err(EconomyError::Config(_))));

        config = minimal_config();
        config.countries[0].provinces[0].upper_share = 0.95;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_templates_must_reference_known_commodities() {
        let mut config = minimal_config();
        let mut output = BTreeMap::new();
        output.insert("marble".to_string(), 1);
        config.buildings.push(BuildingTemplate {
            id: "Quarry".to_string(),
            production_methods: vec![ProductionMethod {
                id: "basic".to_string(),
                input: BTreeMap::new(),
                require_tech: vec!["masonry".to_string()],
                employees_needed: 5,
                output_multiplier: 3,
            }],
            production_types: vec![ProductionType {
                id: "marble".to_string(),
                input: BTreeMap::new(),
                output,
                require_tech: Vec::new(),
            }],
        });

        assert!(matches!(config.validate(), Err(EconomyError::UnknownCommodity(_))));

        config.buildings[0].production_methods.clear();
        assert!(matches!(config.validate(), Err(EconomyError::Config(_))));
    }

    #[test]
    fn test_json_template_format() {
        let json = r#"{
            "name": "from-json",
            "commodities": [
                { "id": "wood", "category": "material" },
                { "id": "plank", "category": "construction", "basePrice": "7", "initialStock": 5 }
            ],
            "buildings": [{
                "id": "LumberMill",
                "productionMethods": [{
                    "id": "saw",
                    "input": {},
                    "requireTech": [],
                    "employeesNeeded": 10,
                    "outputMultiplier": 20
                }],
                "productionTypes": [{
                    "id": "planks",
                    "input": { "wood": 20 },
                    "output": { "plank": 1 },
                    "requireTech": []
                }]
            }],
            "countries": [{ "id": "c", "provinces": [{ "id": "p", "population": 100 }] }]
        }"#;

        let config: GameConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.commodity("wood").unwrap().base_price, dec!(20));
        assert_eq!(config.commodity("plank").unwrap().initial_stock, 5);
        let template = config.template("LumberMill").unwrap();
        assert_eq!(template.production_methods[0].employees_needed, 10);
        assert_eq!(template.production_types[0].input["wood"], 20);
        assert_eq!(config.market.sell_discount, dec!(0.9));
    }

    #[test]
    fn test_yaml_file_round_trip() {
        let yaml = "
name: from-yaml
commodities:
  - id: wheat
    category: material
    basePrice: '2'
countries:
  - id: realm
    provinces:
      - id: valley
        population: 200
        middleShare: 0.1
population:
  ownerShare: '0.3'
";
        let path = std::env::temp_dir().join("province_economy_config_test.yaml");
        std::fs::write(&path, yaml).unwrap();

        let config = GameConfig::load_from_file(&path).unwrap();
        assert_eq!(config.name, "from-yaml");
        assert_eq!(config.provinces().next().unwrap().middle_share, 0.1);
        assert_eq!(config.population.owner_share, dec!(0.3));
        assert_eq!(config.population.lower_wealth_per_capita, dec!(10));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_config_display() {
        let display = format!("{}", minimal_config());
        assert!(display.contains("Configuration: minimal"));
        assert!(display.contains("Province valley: population 50"));
    }
}
