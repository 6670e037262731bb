use axum::extract::{Path, Query, State, rejection::QueryRejection};
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use coursegate_db::models::{AccessCode, AccessGrant, GrantSource};
use coursegate_services::access::{AccessCodeView, AccessGrantView, AccessStatus, GenerateCodes};
use coursegate_services::dao::access_code::CodeFilter;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::parse_object_id;
use crate::{
    error::ApiError,
    extractors::auth::{AdminUser, AuthUser},
    extractors::json::ValidatedJson,
    response::ApiResponse,
    state::AppState,
};

// -- Requests --

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCodesRequest {
    #[validate(length(min = 1, message = "courseId is required"))]
    pub course_id: String,
    pub access_start_at: DateTime<Utc>,
    pub access_end_at: DateTime<Utc>,
    pub quantity: Option<u32>,
    pub code_expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCodesQuery {
    pub course_id: Option<String>,
    pub is_used: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    #[validate(length(min = 1, max = 64, message = "code is required"))]
    pub code: String,
    #[validate(length(min = 1, message = "courseId is required"))]
    pub course_id: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GrantAccessRequest {
    #[validate(length(min = 1, message = "userId is required"))]
    pub user_id: String,
    #[validate(length(min = 1, message = "courseId is required"))]
    pub course_id: String,
    pub access_start_at: DateTime<Utc>,
    pub access_end_at: DateTime<Utc>,
}

// -- Responses --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCodeResponse {
    pub id: String,
    pub code: String,
    pub course_id: String,
    pub access_start_at: DateTime<Utc>,
    pub access_end_at: DateTime<Utc>,
    pub code_expires_at: Option<DateTime<Utc>>,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<AccessCode> for AccessCodeResponse {
    fn from(code: AccessCode) -> Self {
        Self {
            id: hex(code.id),
            code: code.code,
            course_id: code.course_id.to_hex(),
            access_start_at: code.access_start_at.to_chrono(),
            access_end_at: code.access_end_at.to_chrono(),
            code_expires_at: code.code_expires_at.map(|d| d.to_chrono()),
            is_used: code.is_used,
            used_at: code.used_at.map(|d| d.to_chrono()),
            created_at: code.created_at.to_chrono(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemerResponse {
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCodeListItem {
    #[serde(flatten)]
    pub code: AccessCodeResponse,
    pub course_title: Option<String>,
    pub used_by: Option<RedeemerResponse>,
}

impl From<AccessCodeView> for AccessCodeListItem {
    fn from(view: AccessCodeView) -> Self {
        let used_by = view.code.used_by.map(|id| RedeemerResponse {
            id: id.to_hex(),
            display_name: view.redeemer.as_ref().map(|u| u.display_name.clone()),
            email: view.redeemer.as_ref().map(|u| u.email.clone()),
        });

        Self {
            code: view.code.into(),
            course_title: view.course_title,
            used_by,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CodeList<T> {
    pub codes: Vec<T>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantResponse {
    pub id: String,
    pub course_id: String,
    pub access_start_at: DateTime<Utc>,
    pub access_end_at: DateTime<Utc>,
    pub source: GrantSource,
}

impl From<AccessGrant> for GrantResponse {
    fn from(grant: AccessGrant) -> Self {
        Self {
            id: hex(grant.id),
            course_id: grant.course_id.to_hex(),
            access_start_at: grant.access_start_at.to_chrono(),
            access_end_at: grant.access_end_at.to_chrono(),
            source: grant.source,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GrantEnvelope {
    pub access: GrantResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCheckResponse {
    pub has_access: bool,
    pub access_end_at: Option<DateTime<Utc>>,
}

impl From<AccessStatus> for AccessCheckResponse {
    fn from(status: AccessStatus) -> Self {
        Self {
            has_access: status.has_access,
            access_end_at: status.access_end_at.map(|d| d.to_chrono()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyGrantResponse {
    #[serde(flatten)]
    pub grant: GrantResponse,
    pub course_title: Option<String>,
    pub is_active: bool,
}

impl From<AccessGrantView> for MyGrantResponse {
    fn from(view: AccessGrantView) -> Self {
        Self {
            grant: view.grant.into(),
            course_title: view.course_title,
            is_active: view.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MyGrants {
    pub grants: Vec<MyGrantResponse>,
}

fn hex(id: Option<ObjectId>) -> String {
    id.map(|id| id.to_hex()).unwrap_or_default()
}

// -- Handlers --

pub async fn generate_codes(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ValidatedJson(body): ValidatedJson<GenerateCodesRequest>,
) -> Result<ApiResponse<CodeList<AccessCodeResponse>>, ApiError> {
    let course_id = parse_object_id(&body.course_id, "courseId")?;
    let quantity = body
        .quantity
        .unwrap_or(state.access.settings().default_quantity);

    let codes = state
        .access
        .generate_codes(GenerateCodes {
            course_id,
            access_start_at: bson::DateTime::from_chrono(body.access_start_at),
            access_end_at: bson::DateTime::from_chrono(body.access_end_at),
            quantity,
            code_expires_at: body.code_expires_at.map(bson::DateTime::from_chrono),
            created_by: admin.user_id,
        })
        .await?;

    Ok(ApiResponse::created(
        CodeList {
            codes: codes.into_iter().map(Into::into).collect(),
        },
        "Access codes generated",
    ))
}

pub async fn list_codes(
    State(state): State<AppState>,
    _admin: AdminUser,
    query: Result<Query<ListCodesQuery>, QueryRejection>,
) -> Result<ApiResponse<CodeList<AccessCodeListItem>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let course_id = query
        .course_id
        .as_deref()
        .map(|raw| parse_object_id(raw, "courseId"))
        .transpose()?;

    let views = state
        .access
        .list_codes(&CodeFilter {
            course_id,
            is_used: query.is_used,
        })
        .await?;

    Ok(ApiResponse::ok(
        CodeList {
            codes: views.into_iter().map(Into::into).collect(),
        },
        "Access codes",
    ))
}

pub async fn redeem(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<RedeemRequest>,
) -> Result<ApiResponse<GrantEnvelope>, ApiError> {
    let course_id = parse_object_id(&body.course_id, "courseId")?;

    let grant = state
        .access
        .redeem(&body.code, course_id, auth.user_id)
        .await?;

    Ok(ApiResponse::ok(
        GrantEnvelope {
            access: grant.into(),
        },
        "Access code redeemed",
    ))
}

pub async fn check(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(course_id): Path<String>,
) -> Result<ApiResponse<AccessCheckResponse>, ApiError> {
    let course_id = parse_object_id(&course_id, "courseId")?;
    let status = state.access.has_access(auth.user_id, course_id).await?;
    Ok(ApiResponse::ok(status.into(), "Access status"))
}

pub async fn grant(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ValidatedJson(body): ValidatedJson<GrantAccessRequest>,
) -> Result<ApiResponse<GrantEnvelope>, ApiError> {
    let user_id = parse_object_id(&body.user_id, "userId")?;
    let course_id = parse_object_id(&body.course_id, "courseId")?;

    let grant = state
        .access
        .grant_access(
            user_id,
            course_id,
            bson::DateTime::from_chrono(body.access_start_at),
            bson::DateTime::from_chrono(body.access_end_at),
            admin.user_id,
        )
        .await?;

    Ok(ApiResponse::created(
        GrantEnvelope {
            access: grant.into(),
        },
        "Access granted",
    ))
}

pub async fn my_grants(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<ApiResponse<MyGrants>, ApiError> {
    let grants = state.access.list_user_grants(auth.user_id).await?;
    Ok(ApiResponse::ok(
        MyGrants {
            grants: grants.into_iter().map(Into::into).collect(),
        },
        "Access grants",
    ))
}
