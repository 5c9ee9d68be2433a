pub mod assembler;
pub mod fields;
pub mod locator;
pub mod patterns;

pub use fields::Extraction;
pub use locator::Locator;
pub use patterns::TokenRules;
