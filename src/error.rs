use std::error::Error;
use std::fmt;

use crate::types::UnitId;

/// Failures surfaced by the simulation core.
///
/// Ordinary "nothing happened" outcomes (an idle unit, a commodity that did not
/// trade) are never reported through this type.
#[derive(Debug)]
pub enum EconomyError {
    ProvinceNotFound(String),
    TemplateNotFound(String),
    BuildingNotFound(UnitId),
    UnknownCommodity(String),
    InvalidQuantity(String),
    InsufficientStock {
        commodity: String,
        requested: u64,
        available: u64,
    },
    Config(String),
    Io(std::io::Error),
}

impl fmt::Display for EconomyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EconomyError::ProvinceNotFound(id) => write!(f, "Province not found: {}", id),
            EconomyError::TemplateNotFound(id) => write!(f, "Building template not found: {}", id),
            EconomyError::BuildingNotFound(id) => write!(f, "Building not found: {}", id),
            EconomyError::UnknownCommodity(id) => write!(f, "Unknown commodity: {}", id),
            EconomyError::InvalidQuantity(msg) => write!(f, "Invalid quantity: {}", msg),
            EconomyError::InsufficientStock {
                commodity,
                requested,
                available,
            } => write!(
                f,
                "Insufficient stock of {}: requested {}, available {}",
                commodity, requested, available
            ),
            EconomyError::Config(msg) => write!(f, "Configuration error: {}", msg),
            EconomyError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for EconomyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EconomyError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EconomyError {
    fn from(e: std::io::Error) -> Self {
        EconomyError::Io(e)
    }
}

impl From<serde_json::Error> for EconomyError {
    fn from(e: serde_json::Error) -> Self {
        EconomyError::Config(format!("Failed to parse JSON: {}", e))
    }
}

impl From<serde_yaml::Error> for EconomyError {
    fn from(e: serde_yaml::Error) -> Self {
        EconomyError::Config(format!("Failed to parse YAML: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, EconomyError>;
