//! Great-circle distance helpers for the nearby-competitors view.

use serde::Serialize;

use crate::models::Station;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two coordinates, in kilometres
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

#[derive(Debug, Clone, Serialize)]
pub struct NearbyStation {
    #[serde(flatten)]
    pub station: Station,
    pub distance_km: f64,
}

/// Competitors within `radius_km` of the origin, closest first
pub fn nearby_competitors(
    origin: &Station,
    others: Vec<Station>,
    radius_km: f64,
) -> Vec<NearbyStation> {
    let mut result: Vec<NearbyStation> = others
        .into_iter()
        .map(|s| {
            let distance_km =
                haversine_km(origin.latitude, origin.longitude, s.latitude, s.longitude);
            NearbyStation {
                station: s,
                distance_km,
            }
        })
        .filter(|n| n.distance_km <= radius_km)
        .collect();

    result.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn station(lat: f64, lon: f64) -> Station {
        Station {
            id: Uuid::new_v4(),
            name: "Station".to_string(),
            brand: "Brand".to_string(),
            latitude: lat,
            longitude: lon,
            pms_price: None,
            ago_price: None,
            dpk_price: None,
            out_of_stock: false,
            verified: false,
            max_daily_capacity: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn zero_distance_for_identical_points() {
        assert_eq!(haversine_km(6.5244, 3.3792, 6.5244, 3.3792), 0.0);
    }

    #[test]
    fn one_degree_of_longitude_at_the_equator() {
        // One degree of arc on a 6371 km sphere is about 111.19 km
        let d = haversine_km(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111.19).abs() < 0.1, "got {}", d);
    }

    #[test]
    fn lagos_to_ibadan_is_roughly_120_km() {
        let d = haversine_km(6.5244, 3.3792, 7.3775, 3.9470);
        assert!((110.0..135.0).contains(&d), "got {}", d);
    }

    #[test]
    fn nearby_filters_by_radius_and_sorts_ascending() {
        let origin = station(6.5244, 3.3792);
        let close = station(6.5300, 3.3800); // well under a kilometre
        let mid = station(6.5600, 3.4200); // a few kilometres
        let far = station(7.3775, 3.9470); // over 100 km

        let result = nearby_competitors(&origin, vec![far, mid.clone(), close.clone()], 10.0);

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].station.id, close.id);
        assert_eq!(result[1].station.id, mid.id);
        assert!(result[0].distance_km <= result[1].distance_km);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let origin = station(6.5244, 3.3792);
        assert!(nearby_competitors(&origin, vec![], 5.0).is_empty());
    }
}
