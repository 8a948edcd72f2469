// Domain layer: snapshot models and the browser port. No browser types leak in here.

pub mod model;
pub mod ports;
