// Adapters layer: concrete page drivers behind the PageDriver port.

pub mod fixture;
pub mod webdriver;
