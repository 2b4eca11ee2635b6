// Domain layer: models and ports (interfaces) for the stats API, the sheet store and the chat platform.

pub mod model;
pub mod ports;
