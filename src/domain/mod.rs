// Domain layer: data model and ports (traits). No registry logic lives here.

pub mod model;
pub mod ports;
