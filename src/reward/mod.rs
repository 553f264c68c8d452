pub mod adapter;
pub mod sdk;
pub mod verification;
