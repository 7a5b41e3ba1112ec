//! Rental villas

use crate::impl_entity;
use chrono::{DateTime, Utc};

impl_entity!(
    Villa,
    "villas",
    {
        name: String,
        #[serde(default)]
        details: String,
        rate: f64,
        sqft: i64,
        occupancy: i64,
        #[serde(default)]
        image_url: String,
        #[serde(default)]
        amenity: String,
        created_date: DateTime<Utc>,
        updated_date: DateTime<Utc>,
    }
);

/// The demo catalogue inserted when `seed_demo_data` is enabled
pub fn seed_villas(now: DateTime<Utc>) -> Vec<Villa> {
    let villa = |name: &str, details: &str, rate: f64, sqft: i64, occupancy: i64| Villa {
        name: name.to_string(),
        details: details.to_string(),
        rate,
        sqft,
        occupancy,
        image_url: format!(
            "https://images.example.com/villas/{}.jpg",
            name.to_lowercase().replace(' ', "-")
        ),
        amenity: String::new(),
        created_date: now,
        updated_date: now,
        ..Default::default()
    };

    vec![
        villa("Royal Villa", "Sea-facing villa with a private garden.", 200.0, 550, 4),
        villa("Premium Pool Villa", "Villa with a heated infinity pool.", 300.0, 550, 4),
        villa("Luxury Pool Villa", "Two-storey villa with a lap pool.", 400.0, 750, 4),
        villa("Diamond Villa", "Hillside villa with panoramic views.", 550.0, 900, 4),
        villa("Diamond Pool Villa", "Hillside villa with a private pool.", 600.0, 1100, 4),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::entity::Entity;

    #[test]
    fn test_schema() {
        let schema = Villa::schema();
        assert_eq!(schema.table, "villas");
        assert!(schema.has_field("id"));
        assert!(schema.has_field("occupancy"));
        assert!(schema.navigations.is_empty());
        assert!(schema.unique.is_empty());
    }

    #[test]
    fn test_seed_villas_are_unsaved_and_distinct() {
        let villas = seed_villas(Utc::now());
        assert_eq!(villas.len(), 5);
        assert!(villas.iter().all(|v| v.id == 0));

        let mut names: Vec<_> = villas.iter().map(|v| v.name.to_lowercase()).collect();
        names.dedup();
        assert_eq!(names.len(), 5);
    }
}
