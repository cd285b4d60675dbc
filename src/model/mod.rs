//! Core stock data structures

mod attributes;
mod stock;

pub use attributes::{NewPlasmid, NewStrain, PlasmidUpdate, StrainUpdate};
pub use stock::{
    PlasmidProperties, StockId, StockKind, StockProperties, StockRecord, StrainProperties,
};
