// dtos/offerdtos.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::offermodels::JobOffer;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_create_dates", skip_on_field_errors = false))]
pub struct CreateOfferRequest {
    pub product_id: Option<i64>,

    #[validate(range(min = 1, max = 1000000000000, message = "Price must be between 1 and 1000000000000"))]
    pub price: i64,

    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    #[serde(default)]
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: String,

    #[serde(default)]
    #[validate(range(min = 0, max = 20, message = "Revision count must be between 0 and 20"))]
    pub revision_count: i32,

    pub start_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,

    #[serde(default)]
    pub delivery_format: String,

    #[serde(default)]
    pub notes: String,
}

fn validate_create_dates(req: &CreateOfferRequest) -> Result<(), ValidationError> {
    check_dates(req.start_date, req.delivery_date)
}

fn check_dates(start: Option<NaiveDate>, delivery: Option<NaiveDate>) -> Result<(), ValidationError> {
    if let (Some(start), Some(delivery)) = (start, delivery) {
        if delivery < start {
            let mut err = ValidationError::new("delivery_before_start");
            err.message = Some("Delivery date cannot be before the start date".into());
            return Err(err);
        }
    }
    Ok(())
}

/// Partial update of a pending offer; absent fields keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_update_dates", skip_on_field_errors = false))]
pub struct UpdateOfferRequest {
    #[validate(range(min = 1, max = 1000000000000, message = "Price must be between 1 and 1000000000000"))]
    pub price: Option<i64>,

    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[validate(range(min = 0, max = 20, message = "Revision count must be between 0 and 20"))]
    pub revision_count: Option<i32>,

    pub start_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_format: Option<String>,
    pub notes: Option<String>,
}

fn validate_update_dates(req: &UpdateOfferRequest) -> Result<(), ValidationError> {
    check_dates(req.start_date, req.delivery_date)
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateStatusRequest {
    #[validate(length(min = 1, message = "Status is required"))]
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct DeliverWorkRequest {
    #[validate(url(message = "Work URL must be a valid URL"))]
    pub work_url: Option<String>,

    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RevisionRequest {
    #[validate(length(min = 1, max = 2000, message = "Revision reason is required"))]
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OfferResponseDto {
    pub id: Uuid,
    pub order_code: String,
    pub conversation_id: Uuid,
    pub freelancer_id: Uuid,
    pub client_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<i64>,
    pub price: i64,
    pub platform_fee: i64,
    pub net_amount: i64,
    pub title: String,
    pub description: String,
    pub revision_count: i32,
    pub used_revision_count: i32,
    pub revisions_left: i32,
    pub start_date: NaiveDate,
    pub delivery_date: NaiveDate,
    pub delivery_format: String,
    pub notes: String,
    pub work_delivery_link: Option<String>,
    pub work_delivery_files: Vec<String>,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<JobOffer> for OfferResponseDto {
    fn from(offer: JobOffer) -> Self {
        let revisions_left = offer.revisions_left();
        Self {
            id: offer.id,
            order_code: offer.order_code,
            conversation_id: offer.conversation_id,
            freelancer_id: offer.freelancer_id,
            client_id: offer.client_id,
            product_id: offer.product_id,
            price: offer.price,
            platform_fee: offer.platform_fee,
            net_amount: offer.net_amount,
            title: offer.title,
            description: offer.description,
            revision_count: offer.revision_count,
            used_revision_count: offer.used_revision_count,
            revisions_left,
            start_date: offer.start_date,
            delivery_date: offer.delivery_date,
            delivery_format: offer.delivery_format,
            notes: offer.notes,
            work_delivery_link: offer.work_delivery_link,
            work_delivery_files: offer.work_delivery_files,
            status: offer.status.to_string(),
            created_at: offer.created_at,
            updated_at: offer.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct FreelancerOrdersQuery {
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: Option<u32>,

    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<u32>,

    pub status: Option<String>,
}

impl FreelancerOrdersQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(20)
    }

    /// Empty `?status=` means no filter.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref().filter(|status| !status.is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total_items: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FreelancerOrdersResponse {
    pub status: String,
    pub data: Vec<OfferResponseDto>,
    pub meta: PageMeta,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data: Some(data),
        }
    }
}
