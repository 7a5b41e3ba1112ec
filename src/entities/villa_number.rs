//! Numbered units belonging to a villa

use crate::entities::Villa;
use crate::impl_entity;
use chrono::{DateTime, Utc};

impl_entity!(
    VillaNumber,
    "villa_numbers",
    {
        villa_no: i64,
        villa_id: i64,
        #[serde(default)]
        special_details: String,
        created_date: DateTime<Utc>,
        updated_date: DateTime<Utc>,
    },
    unique [villa_no],
    navigations {
        villa: Villa => villa_id,
    }
);
