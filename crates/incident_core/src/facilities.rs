//! crates/incident_core/src/facilities.rs
//!
//! Facility locator: classifies a free-text location into a coarse area by
//! keyword and returns the hospitals, officials and medical camps tagged with
//! that area. When no area matches, everything is returned.
//!
//! The catalog is static reference data. Distances and response times are
//! fixed estimates, not computed.

use crate::error::IncidentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area {
    CityCenter,
    Downtown,
    Suburb,
    Unknown,
}

impl Area {
    pub fn label(&self) -> &'static str {
        match self {
            Area::CityCenter => "city center",
            Area::Downtown => "downtown",
            Area::Suburb => "suburb",
            Area::Unknown => "unknown",
        }
    }
}

/// Areas in the order they are tested. The first area with a matching
/// keyword wins, so "park road" resolves to downtown before suburb's "park".
const AREA_KEYWORDS: &[(Area, &[&str])] = &[
    (Area::CityCenter, &["central", "city", "main street", "center"]),
    (Area::Downtown, &["downtown", "park road", "business"]),
    (Area::Suburb, &["suburb", "lake view", "residential", "park"]),
];

pub const HOSPITAL_DISTANCE: &str = "< 5 km";
pub const MEDICAL_CAMP_DISTANCE: &str = "< 3 km";
pub const OFFICIAL_RESPONSE_TIME: &str = "10-15 minutes";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hospital {
    pub id: &'static str,
    pub name: &'static str,
    pub ownership: &'static str,
    pub contact: &'static str,
    pub location: &'static str,
    pub area: Area,
    pub emergency_services: bool,
    pub ambulance_number: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseOfficial {
    pub id: &'static str,
    pub name: &'static str,
    pub designation: &'static str,
    pub contact: &'static str,
    pub jurisdiction: &'static str,
    pub area: Area,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicalCamp {
    pub id: &'static str,
    pub name: &'static str,
    pub location: &'static str,
    pub area: Area,
    pub capacity: u32,
    pub services: &'static [&'static str],
    pub contact: &'static str,
}

pub static HOSPITALS: &[Hospital] = &[
    Hospital {
        id: "1",
        name: "City General Hospital",
        ownership: "Government",
        contact: "1234567890",
        location: "Main Street, City Center",
        area: Area::CityCenter,
        emergency_services: true,
        ambulance_number: "102",
    },
    Hospital {
        id: "2",
        name: "St. Johns Medical Center",
        ownership: "Private",
        contact: "9876543210",
        location: "Park Road, Downtown",
        area: Area::Downtown,
        emergency_services: true,
        ambulance_number: "104",
    },
    Hospital {
        id: "3",
        name: "Metro Hospital",
        ownership: "Private",
        contact: "5555666677",
        location: "Lake View Road, Suburb",
        area: Area::Suburb,
        emergency_services: true,
        ambulance_number: "105",
    },
];

pub static OFFICIALS: &[ResponseOfficial] = &[
    ResponseOfficial {
        id: "1",
        name: "Dr. Sarah Johnson",
        designation: "Chief Medical Officer",
        contact: "5555555555",
        jurisdiction: "City Central",
        area: Area::CityCenter,
    },
    ResponseOfficial {
        id: "2",
        name: "Mr. Robert Smith",
        designation: "Emergency Response Director",
        contact: "6666666666",
        jurisdiction: "Metropolitan Area",
        area: Area::Downtown,
    },
    ResponseOfficial {
        id: "3",
        name: "Ms. Emily Brown",
        designation: "Public Health Director",
        contact: "7777888899",
        jurisdiction: "Suburban District",
        area: Area::Suburb,
    },
];

pub static MEDICAL_CAMPS: &[MedicalCamp] = &[
    MedicalCamp {
        id: "1",
        name: "Central Emergency Camp",
        location: "City Stadium",
        area: Area::CityCenter,
        capacity: 200,
        services: &["First Aid", "Emergency Care", "Vaccination"],
        contact: "7777777777",
    },
    MedicalCamp {
        id: "2",
        name: "Downtown Medical Unit",
        location: "Community Center",
        area: Area::Downtown,
        capacity: 150,
        services: &["Basic Medical Care", "Testing", "Pharmacy"],
        contact: "8888888888",
    },
    MedicalCamp {
        id: "3",
        name: "Suburban Relief Camp",
        location: "Public Park",
        area: Area::Suburb,
        capacity: 100,
        services: &["First Aid", "Basic Care"],
        contact: "9999900000",
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NearbyHospital {
    pub hospital: &'static Hospital,
    pub estimated_distance: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NearbyOfficial {
    pub official: &'static ResponseOfficial,
    pub response_time: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NearbyMedicalCamp {
    pub camp: &'static MedicalCamp,
    pub estimated_distance: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NearbyFacilities {
    pub area: Area,
    pub hospitals: Vec<NearbyHospital>,
    pub officials: Vec<NearbyOfficial>,
    pub medical_camps: Vec<NearbyMedicalCamp>,
}

fn normalize(location: &str) -> String {
    location.trim().to_lowercase()
}

/// Classifies a location into the first area whose keywords it contains.
pub fn classify(location: &str) -> Area {
    let normalized = normalize(location);
    AREA_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| normalized.contains(kw)))
        .map(|(area, _)| *area)
        .unwrap_or(Area::Unknown)
}

/// Returns the facilities near `location`, or the full catalog when the area
/// cannot be determined.
pub fn lookup(location: &str) -> Result<NearbyFacilities, IncidentError> {
    if location.trim().is_empty() {
        return Err(IncidentError::invalid("location is required"));
    }

    let area = classify(location);
    let in_area = |tagged: Area| area == Area::Unknown || tagged == area;

    Ok(NearbyFacilities {
        area,
        hospitals: HOSPITALS
            .iter()
            .filter(|h| in_area(h.area))
            .map(|hospital| NearbyHospital {
                hospital,
                estimated_distance: HOSPITAL_DISTANCE,
            })
            .collect(),
        officials: OFFICIALS
            .iter()
            .filter(|o| in_area(o.area))
            .map(|official| NearbyOfficial {
                official,
                response_time: OFFICIAL_RESPONSE_TIME,
            })
            .collect(),
        medical_camps: MEDICAL_CAMPS
            .iter()
            .filter(|c| in_area(c.area))
            .map(|camp| NearbyMedicalCamp {
                camp,
                estimated_distance: MEDICAL_CAMP_DISTANCE,
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_center_address_returns_only_city_center_entries() {
        let found = lookup("123 Main Street, City Center").unwrap();
        assert_eq!(found.area, Area::CityCenter);
        assert_eq!(found.hospitals.len(), 1);
        assert!(found.hospitals.iter().all(|h| h.hospital.area == Area::CityCenter));
        assert!(found.officials.iter().all(|o| o.official.area == Area::CityCenter));
        assert!(found.medical_camps.iter().all(|c| c.camp.area == Area::CityCenter));
        assert_eq!(found.hospitals[0].estimated_distance, "< 5 km");
        assert_eq!(found.officials[0].response_time, "10-15 minutes");
        assert_eq!(found.medical_camps[0].estimated_distance, "< 3 km");
    }

    #[test]
    fn unknown_location_fails_open_to_the_full_catalog() {
        let found = lookup("7 Random Alley").unwrap();
        assert_eq!(found.area, Area::Unknown);
        assert_eq!(found.hospitals.len(), HOSPITALS.len());
        assert_eq!(found.officials.len(), OFFICIALS.len());
        assert_eq!(found.medical_camps.len(), MEDICAL_CAMPS.len());
    }

    #[test]
    fn areas_are_tested_in_fixed_order() {
        // "park road" is a downtown keyword and is checked before suburb's "park".
        assert_eq!(classify("  14 PARK ROAD "), Area::Downtown);
        assert_eq!(classify("Near the park"), Area::Suburb);
        // "central" wins even though "residential" also appears.
        assert_eq!(classify("Central residential block"), Area::CityCenter);
    }

    #[test]
    fn blank_location_is_rejected() {
        assert_eq!(lookup("   ").unwrap_err().kind(), "invalid_argument");
    }
}
