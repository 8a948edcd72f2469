pub mod engine;
pub mod report;
pub mod rules;
pub mod validator;

pub use crate::domain::model::{Card, CardCollection, CollectionLocator, Selector, ViewportProfile};
pub use crate::domain::ports::PageDriver;
pub use crate::utils::error::Result;
