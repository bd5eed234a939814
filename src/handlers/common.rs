use crate::{ApiResponse, PaginatedResponse};
use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

const MAX_PAGE_SIZE: u64 = 100;

/// Standard success response
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}

/// Standard created response
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

/// Pagination parameters for list operations
#[derive(Debug, Deserialize, Serialize, IntoParams)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    20
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PaginationParams {
    pub fn page(&self) -> u64 {
        self.page.max(1)
    }

    pub fn limit(&self) -> u64 {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }

    pub fn into_response<T>(&self, items: Vec<T>, total: u64) -> PaginatedResponse<T> {
        let limit = self.limit();
        PaginatedResponse {
            items,
            total,
            page: self.page(),
            limit,
            total_pages: total.div_ceil(limit),
        }
    }
}

/// `?limit=` for endpoints that return the newest N rows
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LimitParams {
    pub limit: Option<u64>,
}

impl LimitParams {
    pub fn limit_or(&self, default: u64) -> u64 {
        self.limit.unwrap_or(default).clamp(1, MAX_PAGE_SIZE)
    }
}
