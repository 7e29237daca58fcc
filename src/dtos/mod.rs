pub mod offerdtos;
pub mod paymentdtos;
pub mod walletdtos;

pub use offerdtos::ApiResponse;
