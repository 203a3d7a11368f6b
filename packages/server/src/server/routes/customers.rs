use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{AppError, AuthUser, CompanyId};
use crate::domains::customers::models::{
    Customer, CustomerLocation, Equipment, EquipmentCondition, GeocodingStatus,
};
use crate::server::app::AppState;
use crate::server::routes::jobs::ScopeQuery;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDto {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geocoding_status: GeocodingStatus,
    pub no_show_count: i32,
    pub is_active: bool,
}

impl From<Customer> for CustomerDto {
    fn from(c: Customer) -> Self {
        Self {
            id: c.id,
            name: c.name,
            phone: c.phone,
            email: c.email,
            address: c.address,
            city: c.city,
            state: c.state,
            zip: c.zip,
            latitude: c.latitude,
            longitude: c.longitude,
            geocoding_status: c.geocoding_status,
            no_show_count: c.no_show_count,
            is_active: c.is_active,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerInput {
    pub company_id: Option<CompanyId>,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

pub async fn create_customer(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateCustomerInput>,
) -> Result<(StatusCode, Json<CustomerDto>), AppError> {
    let company = user.effective_company(input.company_id)?.into_uuid();

    if input.name.trim().is_empty() {
        return Err(AppError::validation_field("name", "must not be empty"));
    }

    let customer = Customer {
        id: Uuid::now_v7(),
        company_id: company,
        name: input.name,
        phone: input.phone,
        email: input.email,
        address: input.address,
        city: input.city,
        state: input.state,
        zip: input.zip,
        latitude: None,
        longitude: None,
        geocoding_status: GeocodingStatus::Pending,
        geocoding_attempts: 0,
        no_show_count: 0,
        is_active: true,
        created_at: Utc::now(),
    };
    let created = customer.insert(&state.deps.db_pool).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn list_customers(
    State(state): State<AppState>,
    user: AuthUser,
    Query(scope): Query<ScopeQuery>,
) -> Result<Json<Vec<CustomerDto>>, AppError> {
    let company = user.effective_company(scope.company_id)?.into_uuid();
    let customers = Customer::list(company, &state.deps.db_pool).await?;
    Ok(Json(customers.into_iter().map(Into::into).collect()))
}

pub async fn get_customer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(customer_id): Path<Uuid>,
    Query(scope): Query<ScopeQuery>,
) -> Result<Json<CustomerDto>, AppError> {
    let company = user.effective_company(scope.company_id)?.into_uuid();
    let customer = Customer::find_by_id(customer_id, company, &state.deps.db_pool)
        .await?
        .ok_or(AppError::NotFound("Customer"))?;
    Ok(Json(customer.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchCustomerInput {
    pub company_id: Option<CompanyId>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

/// Partial update. An address change atomically clears coordinates and
/// resets geocoding.
pub async fn patch_customer(
    State(state): State<AppState>,
    user: AuthUser,
    Path(customer_id): Path<Uuid>,
    Json(input): Json<PatchCustomerInput>,
) -> Result<Json<CustomerDto>, AppError> {
    let company = user.effective_company(input.company_id)?.into_uuid();
    let pool = &state.deps.db_pool;

    let mut customer = Customer::update_contact(
        customer_id,
        company,
        input.name.as_deref(),
        input.phone.as_deref(),
        input.email.as_deref(),
        pool,
    )
    .await?
    .ok_or(AppError::NotFound("Customer"))?;

    if let Some(address) = &input.address {
        customer = Customer::update_address(
            customer_id,
            company,
            address,
            input.city.as_deref(),
            input.state.as_deref(),
            input.zip.as_deref(),
            pool,
        )
        .await?
        .ok_or(AppError::NotFound("Customer"))?;
    }

    Ok(Json(customer.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLocationInput {
    pub company_id: Option<CompanyId>,
    pub label: Option<String>,
    pub address: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub is_primary: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationDto {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub label: Option<String>,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub geocoding_status: GeocodingStatus,
    pub is_primary: bool,
}

impl From<CustomerLocation> for LocationDto {
    fn from(l: CustomerLocation) -> Self {
        Self {
            id: l.id,
            customer_id: l.customer_id,
            label: l.label,
            address: l.address,
            latitude: l.latitude,
            longitude: l.longitude,
            geocoding_status: l.geocoding_status,
            is_primary: l.is_primary,
        }
    }
}

pub async fn create_location(
    State(state): State<AppState>,
    user: AuthUser,
    Path(customer_id): Path<Uuid>,
    Json(input): Json<CreateLocationInput>,
) -> Result<(StatusCode, Json<LocationDto>), AppError> {
    let company = user.effective_company(input.company_id)?.into_uuid();

    // Scope through the parent customer.
    Customer::find_by_id(customer_id, company, &state.deps.db_pool)
        .await?
        .ok_or(AppError::NotFound("Customer"))?;

    let location = CustomerLocation {
        id: Uuid::now_v7(),
        company_id: company,
        customer_id,
        label: input.label,
        address: input.address,
        city: input.city,
        state: input.state,
        zip: input.zip,
        latitude: None,
        longitude: None,
        geocoding_status: GeocodingStatus::Pending,
        geocoding_attempts: 0,
        is_primary: input.is_primary.unwrap_or(false),
        created_at: Utc::now(),
    };
    let created = location.insert(&state.deps.db_pool).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn list_locations(
    State(state): State<AppState>,
    user: AuthUser,
    Path(customer_id): Path<Uuid>,
    Query(scope): Query<ScopeQuery>,
) -> Result<Json<Vec<LocationDto>>, AppError> {
    let company = user.effective_company(scope.company_id)?.into_uuid();
    Customer::find_by_id(customer_id, company, &state.deps.db_pool)
        .await?
        .ok_or(AppError::NotFound("Customer"))?;

    let locations = CustomerLocation::list_for_customer(customer_id, &state.deps.db_pool).await?;
    Ok(Json(locations.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPrimaryInput {
    pub company_id: Option<CompanyId>,
}

pub async fn set_primary_location(
    State(state): State<AppState>,
    user: AuthUser,
    Path((customer_id, location_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<SetPrimaryInput>,
) -> Result<Json<LocationDto>, AppError> {
    let company = user.effective_company(input.company_id)?.into_uuid();
    Customer::find_by_id(customer_id, company, &state.deps.db_pool)
        .await?
        .ok_or(AppError::NotFound("Customer"))?;

    let location = CustomerLocation::set_primary(location_id, customer_id, &state.deps.db_pool)
        .await?
        .ok_or(AppError::NotFound("Location"))?;
    Ok(Json(location.into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEquipmentInput {
    pub company_id: Option<CompanyId>,
    pub location_id: Option<Uuid>,
    pub name: String,
    pub equipment_type: Option<String>,
    pub install_date: Option<NaiveDate>,
    pub condition: Option<EquipmentCondition>,
    pub refrigerant_type: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentDto {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub location_id: Option<Uuid>,
    pub name: String,
    pub equipment_type: Option<String>,
    pub install_date: Option<NaiveDate>,
    pub condition: EquipmentCondition,
    pub refrigerant_type: Option<String>,
}

impl From<Equipment> for EquipmentDto {
    fn from(e: Equipment) -> Self {
        Self {
            id: e.id,
            customer_id: e.customer_id,
            location_id: e.location_id,
            name: e.name,
            equipment_type: e.equipment_type,
            install_date: e.install_date,
            condition: e.condition,
            refrigerant_type: e.refrigerant_type,
        }
    }
}

pub async fn create_equipment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(customer_id): Path<Uuid>,
    Json(input): Json<CreateEquipmentInput>,
) -> Result<(StatusCode, Json<EquipmentDto>), AppError> {
    let company = user.effective_company(input.company_id)?.into_uuid();
    Customer::find_by_id(customer_id, company, &state.deps.db_pool)
        .await?
        .ok_or(AppError::NotFound("Customer"))?;

    let equipment = Equipment {
        id: Uuid::now_v7(),
        company_id: company,
        customer_id,
        location_id: input.location_id,
        name: input.name,
        equipment_type: input.equipment_type,
        install_date: input.install_date,
        condition: input.condition.unwrap_or(EquipmentCondition::Unknown),
        refrigerant_type: input.refrigerant_type,
        is_active: true,
        created_at: Utc::now(),
    };
    let created = equipment.insert(&state.deps.db_pool).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

pub async fn list_equipment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(customer_id): Path<Uuid>,
    Query(scope): Query<ScopeQuery>,
) -> Result<Json<Vec<EquipmentDto>>, AppError> {
    let company = user.effective_company(scope.company_id)?.into_uuid();
    Customer::find_by_id(customer_id, company, &state.deps.db_pool)
        .await?
        .ok_or(AppError::NotFound("Customer"))?;

    let equipment = Equipment::list_for_customer(customer_id, &state.deps.db_pool).await?;
    Ok(Json(equipment.into_iter().map(Into::into).collect()))
}
