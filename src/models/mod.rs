// Models module - Database entity representations

pub mod manager_profile;
pub mod payment_intent;
pub mod price_report;
pub mod promotion;
pub mod review;
pub mod station;
pub mod wallet;

pub use manager_profile::ManagerProfile;
pub use payment_intent::PaymentIntent;
pub use price_report::PriceReport;
pub use promotion::{PromotionTier, StationPromotion};
pub use review::Review;
pub use station::{FuelType, Station};
pub use wallet::{Wallet, WalletTransaction};
