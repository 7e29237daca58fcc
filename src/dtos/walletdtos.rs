// dtos/walletdtos.rs
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::walletmodels::WalletTransaction;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct WalletHistoryQuery {
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: Option<u32>,

    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<u32>,
}

impl WalletHistoryQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(20)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WalletHistoryResponse {
    pub status: String,
    pub data: Vec<WalletTransaction>,
    pub page: u32,
    pub limit: u32,
}
