pub mod category_defaults;

pub use category_defaults::{defaults_for, CategoryDefaults};
