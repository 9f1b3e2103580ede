mod microusd;

pub mod op;
mod secret;

pub mod helpers;

pub use microusd::{MicroUsd, MicroUsdConversionError, USDC_CURRENCY_CODE, USDC_CURRENCY_CODE_LOWER};
pub use secret::Secret;
