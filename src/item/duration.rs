//! Duration items: year-month, day-time, and the combined family.
//!
//! Per §3: durations compare by total milliseconds (day-time) or total
//! months (year-month); mixing incompatible duration families is an error.

use std::cmp::Ordering;

use crate::error::{JResult, JsoniqError};

/// Which duration family a value belongs to, for the comparison rules in §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationFamily {
    YearMonth,
    DayTime,
    /// Carries both a month and a millisecond component; only ever
    /// comparable to another `Combined` duration.
    Combined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DurationValue {
    pub months: i64,
    pub millis: i64,
    pub family: DurationFamily,
}

impl DurationValue {
    pub fn year_month(months: i64) -> Self {
        DurationValue { months, millis: 0, family: DurationFamily::YearMonth }
    }

    pub fn day_time(millis: i64) -> Self {
        DurationValue { months: 0, millis, family: DurationFamily::DayTime }
    }

    pub fn combined(months: i64, millis: i64) -> Self {
        DurationValue { months, millis, family: DurationFamily::Combined }
    }

    /// Compares two durations per §3 rule 5. Errors when the families
    /// differ, since there is no common total to compare.
    pub fn compare(&self, other: &DurationValue) -> JResult<Ordering> {
        if self.family != other.family {
            return Err(JsoniqError::type_error(format!(
                "cannot compare incompatible durations: {:?} vs {:?}",
                self.family, other.family
            )));
        }
        match self.family {
            DurationFamily::YearMonth => Ok(self.months.cmp(&other.months)),
            DurationFamily::DayTime => Ok(self.millis.cmp(&other.millis)),
            DurationFamily::Combined => {
                Ok((self.months, self.millis).cmp(&(other.months, other.millis)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compares_within_family() {
        let a = DurationValue::day_time(1000);
        let b = DurationValue::day_time(2000);
        assert_eq!(a.compare(&b).unwrap(), Ordering::Less);
    }

    #[test]
    fn rejects_cross_family_comparison() {
        let a = DurationValue::year_month(3);
        let b = DurationValue::day_time(1000);
        assert!(a.compare(&b).is_err());
    }
}
