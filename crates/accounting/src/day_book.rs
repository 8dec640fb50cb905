//! Day-book: the per-tenant, per-business-date open/close state.
//!
//! Lifecycle: `OPEN -> EOD_IN_PROGRESS -> CLOSED`. Only an `OPEN` day accepts postings,
//! and every posting is stamped inside that day's window regardless of the wall clock's
//! calendar date.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use coopbooks_core::{DomainError, DomainResult, TenantId, UserId};
use coopbooks_events::{EntityType, HookEntity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayBookStatus {
    Open,
    EodInProgress,
    Closed,
}

impl DayBookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayBookStatus::Open => "OPEN",
            DayBookStatus::EodInProgress => "EOD_IN_PROGRESS",
            DayBookStatus::Closed => "CLOSED",
        }
    }

    /// Open or running end-of-day; at most one such day-book exists per tenant.
    pub fn is_current(&self) -> bool {
        !matches!(self, DayBookStatus::Closed)
    }
}

impl core::fmt::Display for DayBookStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive `[start, end]` range a posting timestamp must fall in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl PostingWindow {
    /// Start of the business date through its last millisecond.
    pub fn for_date(date: NaiveDate) -> Self {
        let start = date.and_time(NaiveTime::MIN).and_utc();
        let end = start + Duration::days(1) - Duration::milliseconds(1);
        Self { start, end }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayBook {
    pub tenant_id: TenantId,
    pub date: NaiveDate,
    pub status: DayBookStatus,
    pub opened_by: UserId,
    pub opened_at: DateTime<Utc>,
    pub eod_started_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl DayBook {
    pub fn open(tenant_id: TenantId, date: NaiveDate, opened_by: UserId, at: DateTime<Utc>) -> Self {
        Self {
            tenant_id,
            date,
            status: DayBookStatus::Open,
            opened_by,
            opened_at: at,
            eod_started_at: None,
            closed_at: None,
        }
    }

    pub fn start_end_of_day(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.transition(DayBookStatus::Open, DayBookStatus::EodInProgress)?;
        self.eod_started_at = Some(at);
        Ok(())
    }

    pub fn close(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        self.transition(DayBookStatus::EodInProgress, DayBookStatus::Closed)?;
        self.closed_at = Some(at);
        Ok(())
    }

    fn transition(&mut self, expected: DayBookStatus, next: DayBookStatus) -> DomainResult<()> {
        if self.status != expected {
            return Err(DomainError::InvalidTransition {
                from: self.status.as_str(),
                to: next.as_str(),
            });
        }
        self.status = next;
        Ok(())
    }

    /// Refuse postings unless the day is `OPEN`.
    pub fn ensure_accepts_postings(&self) -> DomainResult<()> {
        match self.status {
            DayBookStatus::Open => Ok(()),
            DayBookStatus::EodInProgress => Err(DomainError::EndOfDayInProgress),
            DayBookStatus::Closed => Err(DomainError::DayNotOpen),
        }
    }

    pub fn posting_window(&self) -> PostingWindow {
        PostingWindow::for_date(self.date)
    }

    /// Business date combined with the wall-clock time of day, truncated to
    /// milliseconds. Fails with `DateOutOfWindow` if the result leaves the window
    /// (only possible for a leap second).
    pub fn posting_timestamp(&self, now: DateTime<Utc>) -> DomainResult<DateTime<Utc>> {
        let time_of_day = NaiveTime::from_hms_milli_opt(
            now.hour(),
            now.minute(),
            now.second(),
            now.timestamp_subsec_millis(),
        )
        .ok_or_else(|| DomainError::invariant("clock produced an invalid time of day"))?;

        let posted_at = self.date.and_time(time_of_day).and_utc();
        if !self.posting_window().contains(posted_at) {
            return Err(DomainError::DateOutOfWindow {
                posted_at,
                business_date: self.date,
            });
        }
        Ok(posted_at)
    }
}

impl HookEntity for DayBook {
    const ENTITY_TYPE: EntityType = EntityType::DayBook;

    fn entity_key(&self) -> String {
        format!("{}:{}", self.tenant_id, self.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn business_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    fn open_day() -> DayBook {
        DayBook::open(TenantId::new(), business_date(), UserId::new(), Utc::now())
    }

    #[test]
    fn posting_uses_business_date_with_wall_clock_time() {
        let day = open_day();
        // Wall clock already rolled into the next calendar day.
        let now = NaiveDate::from_ymd_opt(2025, 1, 16)
            .unwrap()
            .and_hms_milli_opt(14, 32, 7, 123)
            .unwrap()
            .and_utc();

        let ts = day.posting_timestamp(now).unwrap();
        let expected = business_date().and_hms_milli_opt(14, 32, 7, 123).unwrap().and_utc();
        assert_eq!(ts, expected);
    }

    #[test]
    fn sub_millisecond_precision_is_truncated() {
        let day = open_day();
        let now = business_date().and_hms_nano_opt(9, 0, 0, 456_789_999).unwrap().and_utc();

        let ts = day.posting_timestamp(now).unwrap();
        assert_eq!(ts.timestamp_subsec_nanos(), 456_000_000);
    }

    #[test]
    fn leap_second_falls_outside_the_window() {
        let day = open_day();
        let now = NaiveDate::from_ymd_opt(2016, 12, 31)
            .unwrap()
            .and_hms_milli_opt(23, 59, 59, 1_500)
            .unwrap()
            .and_utc();

        let err = day.posting_timestamp(now).unwrap_err();
        assert!(matches!(err, DomainError::DateOutOfWindow { business_date, .. } if business_date == day.date));
    }

    #[test]
    fn lifecycle_is_open_then_eod_then_closed() {
        let mut day = open_day();
        assert!(day.ensure_accepts_postings().is_ok());

        day.start_end_of_day(Utc::now()).unwrap();
        assert_eq!(day.ensure_accepts_postings(), Err(DomainError::EndOfDayInProgress));

        day.close(Utc::now()).unwrap();
        assert_eq!(day.ensure_accepts_postings(), Err(DomainError::DayNotOpen));
        assert!(!day.status.is_current());
    }

    #[test]
    fn transitions_cannot_skip_end_of_day() {
        let mut day = open_day();
        let err = day.close(Utc::now()).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: "OPEN",
                to: "CLOSED"
            }
        );
        assert_eq!(day.status, DayBookStatus::Open);
    }

    #[test]
    fn status_serializes_in_screaming_snake_case() {
        let json = serde_json::to_string(&DayBookStatus::EodInProgress).unwrap();
        assert_eq!(json, "\"EOD_IN_PROGRESS\"");
        assert_eq!(DayBookStatus::EodInProgress.to_string(), "EOD_IN_PROGRESS");
    }

    proptest! {
        /// Property: any ordinary wall-clock instant maps into the day's window.
        #[test]
        fn ordinary_instants_land_in_window(
            days in 0i64..3650,
            millis_of_day in 0u32..86_400_000,
        ) {
            let day = open_day();
            let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(days);
            let now = date.and_time(NaiveTime::MIN).and_utc()
                + Duration::milliseconds(millis_of_day as i64);

            let ts = day.posting_timestamp(now).unwrap();
            prop_assert!(day.posting_window().contains(ts));
            prop_assert_eq!(ts.date_naive(), day.date);
        }
    }
}
