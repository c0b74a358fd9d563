// Services module - Business logic

pub mod geo;
pub mod notifier;
pub mod paystack;
pub mod promotion;
pub mod reputation;
pub mod wallet_ledger;
