// Domain layer: core models, the response envelope and ports (interfaces).

pub mod model;
pub mod ports;
pub mod response;
