// Domain layer: core models and ports (interfaces). Depends only on std, serde and async-trait.

pub mod model;
pub mod ports;
