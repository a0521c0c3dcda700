//! services/api/src/web/facilities.rs
//!
//! Nearby hospitals, response officials and medical camps for a location.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use incident_core::facilities::{
    NearbyFacilities, NearbyHospital, NearbyMedicalCamp, NearbyOfficial,
};
use incident_core::Principal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::error::{ApiError, ErrorBody};
use crate::web::state::AppState;

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FacilitiesQuery {
    /// Free-text location, e.g. an incident address.
    pub location: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HospitalResponse {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub ownership: String,
    pub contact: String,
    pub location: String,
    pub area: String,
    pub emergency_services: bool,
    pub ambulance_number: String,
    pub estimated_distance: String,
}

impl From<NearbyHospital> for HospitalResponse {
    fn from(nearby: NearbyHospital) -> Self {
        let h = nearby.hospital;
        Self {
            id: h.id.to_string(),
            name: h.name.to_string(),
            ownership: h.ownership.to_string(),
            contact: h.contact.to_string(),
            location: h.location.to_string(),
            area: h.area.label().to_string(),
            emergency_services: h.emergency_services,
            ambulance_number: h.ambulance_number.to_string(),
            estimated_distance: nearby.estimated_distance.to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OfficialResponse {
    pub id: String,
    pub name: String,
    pub designation: String,
    pub contact: String,
    pub jurisdiction: String,
    pub area: String,
    pub response_time: String,
}

impl From<NearbyOfficial> for OfficialResponse {
    fn from(nearby: NearbyOfficial) -> Self {
        let o = nearby.official;
        Self {
            id: o.id.to_string(),
            name: o.name.to_string(),
            designation: o.designation.to_string(),
            contact: o.contact.to_string(),
            jurisdiction: o.jurisdiction.to_string(),
            area: o.area.label().to_string(),
            response_time: nearby.response_time.to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MedicalCampResponse {
    pub id: String,
    pub name: String,
    pub location: String,
    pub area: String,
    pub capacity: u32,
    pub services: Vec<String>,
    pub contact: String,
    pub estimated_distance: String,
}

impl From<NearbyMedicalCamp> for MedicalCampResponse {
    fn from(nearby: NearbyMedicalCamp) -> Self {
        let c = nearby.camp;
        Self {
            id: c.id.to_string(),
            name: c.name.to_string(),
            location: c.location.to_string(),
            area: c.area.label().to_string(),
            capacity: c.capacity,
            services: c.services.iter().map(|s| s.to_string()).collect(),
            contact: c.contact.to_string(),
            estimated_distance: nearby.estimated_distance.to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FacilitiesResponse {
    pub area: String,
    pub hospitals: Vec<HospitalResponse>,
    pub officials: Vec<OfficialResponse>,
    pub medical_camps: Vec<MedicalCampResponse>,
}

impl From<NearbyFacilities> for FacilitiesResponse {
    fn from(found: NearbyFacilities) -> Self {
        Self {
            area: found.area.label().to_string(),
            hospitals: found.hospitals.into_iter().map(HospitalResponse::from).collect(),
            officials: found.officials.into_iter().map(OfficialResponse::from).collect(),
            medical_camps: found
                .medical_camps
                .into_iter()
                .map(MedicalCampResponse::from)
                .collect(),
        }
    }
}

/// Find help near a location.
#[utoipa::path(
    get,
    path = "/facilities",
    params(FacilitiesQuery),
    responses(
        (status = 200, description = "Facilities for the matched area", body = FacilitiesResponse),
        (status = 400, description = "Missing location", body = ErrorBody),
        (status = 401, description = "Not signed in", body = ErrorBody)
    )
)]
pub async fn facilities_handler(
    State(state): State<Arc<AppState>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<FacilitiesQuery>,
) -> Result<Json<FacilitiesResponse>, ApiError> {
    let found = state
        .service
        .lookup_facilities(&principal, query.location.as_deref().unwrap_or_default())?;
    Ok(Json(found.into()))
}
