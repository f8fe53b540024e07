//! Filter engine: two-layer swap admission.

pub mod layer1;
pub mod layer2;
pub mod usd;

pub use layer1::{Layer1Outcome, evaluate as evaluate_layer1};
pub use layer2::{Layer2Outcome, evaluate as evaluate_layer2};
pub use usd::{WBNB_FALLBACK_USD, usd_value};
