pub mod chatmodels;
pub mod offermodels;
pub mod paymentmodels;
pub mod walletmodels;
