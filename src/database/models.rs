use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row of the trip listing join. A trip with N countries produces N rows
/// (or one row with a NULL country when it has none); handlers regroup them.
#[derive(Debug, Clone, FromRow)]
pub struct TripCountryRow {
    pub id_trip: i32,
    pub name: String,
    pub description: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub max_people: i32,
    pub country_name: Option<String>,
}

/// A trip as seen from a client's registration list.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ClientTripRow {
    pub id_trip: i32,
    pub name: String,
    pub description: String,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub max_people: i32,
    pub registered_at: i32,
    pub payment_date: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewClient {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub telephone: String,
    pub pesel: String,
}
