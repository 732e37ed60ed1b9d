use chrono::{DateTime, NaiveTime, Utc, Weekday};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ProviderCategory {
    #[sea_orm(string_value = "installation")]
    Installation,
    #[sea_orm(string_value = "delivery")]
    Delivery,
    #[sea_orm(string_value = "maintenance")]
    Maintenance,
    #[sea_orm(string_value = "support")]
    Support,
}

#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "busy")]
    Busy,
    #[sea_orm(string_value = "offline")]
    Offline,
}

/// One weekday's working window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub available: bool,
}

impl DayHours {
    pub fn closed() -> Self {
        Self {
            start: NaiveTime::MIN,
            end: NaiveTime::MIN,
            available: false,
        }
    }

    pub fn open(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            start,
            end,
            available: true,
        }
    }
}

/// Weekly working hours, Monday-first. A fixed-size array indexed by
/// `chrono::Weekday` so every weekday is always configured.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct WeeklyHours(pub [DayHours; 7]);

impl WeeklyHours {
    pub fn for_weekday(&self, weekday: Weekday) -> &DayHours {
        &self.0[weekday.num_days_from_monday() as usize]
    }

    pub fn set(&mut self, weekday: Weekday, hours: DayHours) {
        self.0[weekday.num_days_from_monday() as usize] = hours;
    }
}

impl Default for WeeklyHours {
    /// Monday to Friday 09:00-18:00, weekend closed.
    fn default() -> Self {
        let weekday = DayHours::open(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        );
        Self([
            weekday,
            weekday,
            weekday,
            weekday,
            weekday,
            DayHours::closed(),
            DayHours::closed(),
        ])
    }
}

/// Installer/delivery/support agent assignable to an order's services.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service_providers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub category: ProviderCategory,
    pub city: String,
    pub area: String,
    pub availability_status: AvailabilityStatus,
    pub is_active: bool,
    pub is_verified: bool,
    pub rating: Decimal,
    pub total_jobs_completed: i32,
    pub max_daily_orders: i32,
    pub current_daily_orders: i32,
    #[sea_orm(column_type = "Json")]
    pub working_hours: WeeklyHours,
    pub avg_service_duration_minutes: i32,
    pub min_advance_booking_hours: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::provider_service::Entity")]
    ProviderServices,
    #[sea_orm(has_many = "super::provider_schedule::Entity")]
    ProviderSchedules,
}

impl Related<super::provider_service::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProviderServices.def()
    }
}

impl Related<super::provider_schedule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProviderSchedules.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weekly_hours_indexes_by_weekday() {
        let mut hours = WeeklyHours::default();
        assert!(hours.for_weekday(Weekday::Mon).available);
        assert!(!hours.for_weekday(Weekday::Sun).available);

        hours.set(
            Weekday::Sun,
            DayHours::open(
                NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
            ),
        );
        assert!(hours.for_weekday(Weekday::Sun).available);
    }

    #[test]
    fn weekly_hours_roundtrips_through_json() {
        let hours = WeeklyHours::default();
        let raw = serde_json::to_string(&hours).unwrap();
        let parsed: WeeklyHours = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, hours);
    }
}
