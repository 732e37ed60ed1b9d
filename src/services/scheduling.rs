use crate::{
    entities::{
        provider_schedule::{
            self, Column as ScheduleColumn, Entity as ProviderSchedule,
            Model as ProviderScheduleModel, ScheduleStatus,
        },
        provider_service::{Column as LinkColumn, Entity as ProviderService},
        service_provider::{
            AvailabilityStatus, Column as ProviderColumn, DayHours, Entity as ServiceProvider,
            Model as ServiceProviderModel, ProviderCategory,
        },
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument};

/// A bookable interval, half-open: `[start, end)`. A slot ending exactly
/// when a booking starts does not overlap it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Search filters for provider assignment.
#[derive(Debug, Clone)]
pub struct ProviderSearchQuery {
    pub city: String,
    pub area: String,
    pub category: ProviderCategory,
    pub service_ids: Vec<i64>,
    pub preferred: Option<(NaiveDate, NaiveTime)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookSlotInput {
    pub provider_id: i64,
    pub order_id: Option<i64>,
    pub service_date: NaiveDate,
    pub start_time: NaiveTime,
}

/// Candidate slots for one working day.
///
/// Walks from the day's start in fixed `duration_minutes` increments; a
/// candidate survives when it fits before closing time, does not start
/// before `earliest_start` (the same-day lead-time cutoff) and does not
/// overlap any booked interval.
pub fn compute_available_slots(
    hours: &DayHours,
    duration_minutes: i64,
    earliest_start: Option<NaiveTime>,
    booked: &[(NaiveTime, NaiveTime)],
) -> Vec<TimeSlot> {
    if !hours.available || duration_minutes <= 0 || hours.end <= hours.start {
        return Vec::new();
    }

    let step = Duration::minutes(duration_minutes);
    let mut slots = Vec::new();
    let mut cursor = hours.start;

    loop {
        let (end, wrapped) = cursor.overflowing_add_signed(step);
        if wrapped != 0 || end > hours.end {
            break;
        }

        let after_cutoff = earliest_start.map_or(true, |earliest| cursor >= earliest);
        let overlaps_booking = booked
            .iter()
            .any(|&(busy_start, busy_end)| cursor < busy_end && end > busy_start);

        if after_cutoff && !overlaps_booking {
            slots.push(TimeSlot { start: cursor, end });
        }

        cursor = end;
    }

    slots
}

/// Service assignment engine: matches a location and requested services to
/// eligible providers and computes their free slots. Availability reads are
/// advisory; the unique schedule index settles races at write time.
#[derive(Clone)]
pub struct SchedulingService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl SchedulingService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    pub async fn get_provider(&self, provider_id: i64) -> Result<ServiceProviderModel, ServiceError> {
        ServiceProvider::find_by_id(provider_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Service provider {} not found", provider_id))
            })
    }

    /// Providers in the requested city/area/category that are active,
    /// verified, marked available, below their daily cap and linked to
    /// every requested service. Ordered best-first: rating, then completed
    /// jobs.
    #[instrument(skip(self, query), fields(city = %query.city, area = %query.area))]
    pub async fn available_providers(
        &self,
        query: ProviderSearchQuery,
    ) -> Result<Vec<ServiceProviderModel>, ServiceError> {
        if query.service_ids.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = ServiceProvider::find()
            .filter(ProviderColumn::City.eq(query.city.as_str()))
            .filter(ProviderColumn::Area.eq(query.area.as_str()))
            .filter(ProviderColumn::Category.eq(query.category.clone()))
            .filter(ProviderColumn::IsActive.eq(true))
            .filter(ProviderColumn::IsVerified.eq(true))
            .filter(ProviderColumn::AvailabilityStatus.eq(AvailabilityStatus::Available))
            .filter(
                Expr::col(ProviderColumn::CurrentDailyOrders)
                    .lt(Expr::col(ProviderColumn::MaxDailyOrders)),
            )
            .order_by_desc(ProviderColumn::Rating)
            .order_by_desc(ProviderColumn::TotalJobsCompleted)
            .all(&*self.db)
            .await?;

        if candidates.is_empty() {
            return Ok(candidates);
        }

        // Set containment: a provider missing even one requested service is out
        let requested: HashSet<i64> = query.service_ids.iter().copied().collect();
        let candidate_ids: Vec<i64> = candidates.iter().map(|p| p.id).collect();

        let links = ProviderService::find()
            .filter(LinkColumn::ProviderId.is_in(candidate_ids.clone()))
            .filter(LinkColumn::ServiceId.is_in(query.service_ids.clone()))
            .filter(LinkColumn::IsActive.eq(true))
            .all(&*self.db)
            .await?;

        let mut offered: HashMap<i64, HashSet<i64>> = HashMap::new();
        for link in links {
            offered
                .entry(link.provider_id)
                .or_default()
                .insert(link.service_id);
        }

        let mut providers: Vec<ServiceProviderModel> = candidates
            .into_iter()
            .filter(|p| {
                offered
                    .get(&p.id)
                    .map_or(false, |services| requested.is_subset(services))
            })
            .collect();

        if let Some((date, start_time)) = query.preferred {
            let weekday = date.weekday();

            // Working hours must cover the requested window
            providers.retain(|p| {
                let hours = p.working_hours.for_weekday(weekday);
                if !hours.available {
                    return false;
                }
                let (end, wrapped) = start_time
                    .overflowing_add_signed(Duration::minutes(p.avg_service_duration_minutes as i64));
                wrapped == 0 && start_time >= hours.start && end <= hours.end
            });

            if !providers.is_empty() {
                let remaining_ids: Vec<i64> = providers.iter().map(|p| p.id).collect();
                let schedules = ProviderSchedule::find()
                    .filter(ScheduleColumn::ProviderId.is_in(remaining_ids))
                    .filter(ScheduleColumn::ServiceDate.eq(date))
                    .filter(ScheduleColumn::Status.ne(ScheduleStatus::Cancelled))
                    .all(&*self.db)
                    .await?;

                let mut busy: HashMap<i64, Vec<(NaiveTime, NaiveTime)>> = HashMap::new();
                for schedule in schedules {
                    busy.entry(schedule.provider_id)
                        .or_default()
                        .push((schedule.start_time, schedule.end_time));
                }

                providers.retain(|p| {
                    let (end, _) = start_time.overflowing_add_signed(Duration::minutes(
                        p.avg_service_duration_minutes as i64,
                    ));
                    busy.get(&p.id).map_or(true, |intervals| {
                        !intervals
                            .iter()
                            .any(|&(busy_start, busy_end)| start_time < busy_end && end > busy_start)
                    })
                });
            }
        }

        Ok(providers)
    }

    /// Free slots for one provider on one date, in chronological order.
    ///
    /// A weekday with no working-hours window and a fully booked day both
    /// yield an empty list, not an error. Rejecting past dates is the
    /// responsibility of the request validation layer.
    #[instrument(skip(self))]
    pub async fn available_time_slots(
        &self,
        provider_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<TimeSlot>, ServiceError> {
        let provider = self.get_provider(provider_id).await?;

        let hours = *provider.working_hours.for_weekday(date.weekday());
        if !hours.available {
            return Ok(Vec::new());
        }

        // Same-day requests cannot book inside the provider's lead-time
        // window; future dates are unaffected.
        let now = Utc::now();
        let earliest_start = if date == now.date_naive() {
            let cutoff = now + Duration::hours(provider.min_advance_booking_hours as i64);
            if cutoff.date_naive() > date {
                return Ok(Vec::new());
            }
            Some(cutoff.time())
        } else {
            None
        };

        let booked: Vec<(NaiveTime, NaiveTime)> = ProviderSchedule::find()
            .filter(ScheduleColumn::ProviderId.eq(provider_id))
            .filter(ScheduleColumn::ServiceDate.eq(date))
            .filter(ScheduleColumn::Status.ne(ScheduleStatus::Cancelled))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|s| (s.start_time, s.end_time))
            .collect();

        Ok(compute_available_slots(
            &hours,
            provider.avg_service_duration_minutes as i64,
            earliest_start,
            &booked,
        ))
    }

    /// Book a slot. The read-side checks are advisory; the daily-cap
    /// increment is a conditional UPDATE and the schedule insert relies on
    /// the unique (provider, date, start) index, so a lost race surfaces as
    /// Conflict and the caller can offer another slot.
    #[instrument(skip(self, input), fields(provider_id = input.provider_id))]
    pub async fn book_slot(
        &self,
        input: BookSlotInput,
    ) -> Result<ProviderScheduleModel, ServiceError> {
        let txn = self.db.begin().await?;

        let provider = ServiceProvider::find_by_id(input.provider_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Service provider {} not found",
                    input.provider_id
                ))
            })?;

        if !provider.is_active
            || !provider.is_verified
            || provider.availability_status != AvailabilityStatus::Available
        {
            return Err(ServiceError::InvalidOperation(
                "Provider is not accepting bookings".to_string(),
            ));
        }

        let duration = Duration::minutes(provider.avg_service_duration_minutes as i64);
        let (end_time, wrapped) = input.start_time.overflowing_add_signed(duration);
        if wrapped != 0 {
            return Err(ServiceError::InvalidInput(
                "Requested slot extends past midnight".to_string(),
            ));
        }

        let hours = provider.working_hours.for_weekday(input.service_date.weekday());
        if !hours.available || input.start_time < hours.start || end_time > hours.end {
            return Err(ServiceError::InvalidOperation(
                "Requested slot is outside the provider's working hours".to_string(),
            ));
        }

        let now = Utc::now();
        if input.service_date == now.date_naive() {
            let cutoff = now + Duration::hours(provider.min_advance_booking_hours as i64);
            if cutoff.date_naive() > input.service_date || input.start_time < cutoff.time() {
                return Err(ServiceError::InvalidOperation(
                    "Requested slot is inside the provider's lead-time window".to_string(),
                ));
            }
        }

        // Advisory overlap check; the unique index is the final arbiter.
        // A cancelled row at the exact start is remembered for revival so it
        // cannot collide with the fresh insert below.
        let same_day = ProviderSchedule::find()
            .filter(ScheduleColumn::ProviderId.eq(input.provider_id))
            .filter(ScheduleColumn::ServiceDate.eq(input.service_date))
            .all(&txn)
            .await?;

        let conflicting = same_day.iter().any(|s| {
            s.status.occupies_slot() && input.start_time < s.end_time && end_time > s.start_time
        });
        if conflicting {
            return Err(ServiceError::Conflict(
                "Requested slot is no longer available".to_string(),
            ));
        }

        let revivable = same_day
            .iter()
            .find(|s| !s.status.occupies_slot() && s.start_time == input.start_time)
            .map(|s| s.id);

        // current_daily_orders < max_daily_orders, atomically
        let capacity = ServiceProvider::update_many()
            .col_expr(
                ProviderColumn::CurrentDailyOrders,
                Expr::col(ProviderColumn::CurrentDailyOrders).add(1),
            )
            .col_expr(ProviderColumn::UpdatedAt, Expr::value(now))
            .filter(ProviderColumn::Id.eq(input.provider_id))
            .filter(
                Expr::col(ProviderColumn::CurrentDailyOrders)
                    .lt(Expr::col(ProviderColumn::MaxDailyOrders)),
            )
            .exec(&txn)
            .await?;
        if capacity.rows_affected == 0 {
            return Err(ServiceError::Conflict(
                "Provider has reached its daily booking capacity".to_string(),
            ));
        }

        let schedule = match revivable {
            // Rebooking a cancelled slot: take over the existing row. The
            // status guard makes two racing revivals resolve to one winner.
            Some(schedule_id) => {
                let revived = ProviderSchedule::update_many()
                    .col_expr(ScheduleColumn::OrderId, Expr::value(input.order_id))
                    .col_expr(ScheduleColumn::EndTime, Expr::value(end_time))
                    .col_expr(
                        ScheduleColumn::Status,
                        Expr::value(ScheduleStatus::Scheduled),
                    )
                    .col_expr(ScheduleColumn::UpdatedAt, Expr::value(now))
                    .filter(ScheduleColumn::Id.eq(schedule_id))
                    .filter(ScheduleColumn::Status.eq(ScheduleStatus::Cancelled))
                    .exec(&txn)
                    .await?;
                if revived.rows_affected == 0 {
                    return Err(ServiceError::Conflict(
                        "Requested slot is no longer available".to_string(),
                    ));
                }
                ProviderSchedule::find_by_id(schedule_id)
                    .one(&txn)
                    .await?
                    .ok_or(ServiceError::InternalServerError)?
            }
            None => {
                let schedule = provider_schedule::ActiveModel {
                    provider_id: Set(input.provider_id),
                    order_id: Set(input.order_id),
                    service_date: Set(input.service_date),
                    start_time: Set(input.start_time),
                    end_time: Set(end_time),
                    status: Set(ScheduleStatus::Scheduled),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                };

                match schedule.insert(&txn).await {
                    Ok(schedule) => schedule,
                    Err(e) => {
                        if matches!(
                            e.sql_err(),
                            Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
                        ) {
                            return Err(ServiceError::Conflict(
                                "Requested slot is no longer available".to_string(),
                            ));
                        }
                        return Err(e.into());
                    }
                }
            }
        };

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::BookingCreated {
                booking_id: schedule.id,
                provider_id: schedule.provider_id,
            })
            .await;

        info!(
            "Booked provider {} on {} at {}",
            schedule.provider_id, schedule.service_date, schedule.start_time
        );
        Ok(schedule)
    }

    pub async fn get_booking(&self, booking_id: i64) -> Result<ProviderScheduleModel, ServiceError> {
        ProviderSchedule::find_by_id(booking_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Booking {} not found", booking_id)))
    }

    /// Cancel a booking, freeing its interval and one unit of the
    /// provider's daily capacity.
    #[instrument(skip(self))]
    pub async fn cancel_booking(
        &self,
        booking_id: i64,
    ) -> Result<ProviderScheduleModel, ServiceError> {
        let txn = self.db.begin().await?;

        let schedule = ProviderSchedule::find_by_id(booking_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Booking {} not found", booking_id)))?;

        if schedule.status == ScheduleStatus::Cancelled {
            return Err(ServiceError::InvalidOperation(
                "Booking is already cancelled".to_string(),
            ));
        }

        let provider_id = schedule.provider_id;
        let mut schedule: provider_schedule::ActiveModel = schedule.into();
        schedule.status = Set(ScheduleStatus::Cancelled);
        schedule.updated_at = Set(Utc::now());
        let schedule = schedule.update(&txn).await?;

        ServiceProvider::update_many()
            .col_expr(
                ProviderColumn::CurrentDailyOrders,
                Expr::col(ProviderColumn::CurrentDailyOrders).sub(1),
            )
            .filter(ProviderColumn::Id.eq(provider_id))
            .filter(ProviderColumn::CurrentDailyOrders.gt(0))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::BookingCancelled(booking_id))
            .await;

        Ok(schedule)
    }
}
