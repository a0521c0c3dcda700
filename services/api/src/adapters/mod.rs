pub mod db;
pub mod geocode;
pub mod photos;

pub use db::DbAdapter;
pub use geocode::NominatimGeocoder;
pub use photos::LocalPhotoStorage;
