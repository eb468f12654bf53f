// Domain layer: models, ports, and the sector label catalog. No store or UI specifics.

pub mod catalog;
pub mod model;
pub mod ports;
