use anyhow::Context;
use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};

const EAT_OFFSET_SECS: i32 = 3 * 3600;

// NSE continuous trading runs 09:00-15:00 EAT.
const MARKET_OPEN_MINUTE: u32 = 9 * 60;
const MARKET_CLOSE_MINUTE: u32 = 15 * 60;
const MINUTES_PER_DAY: u32 = 24 * 60;

// Intraday entries go stale quickly while the exchange is trading.
const INTRADAY_TTL_SECS: u64 = 900;

fn nairobi_offset() -> anyhow::Result<FixedOffset> {
    FixedOffset::east_opt(EAT_OFFSET_SECS).context("invalid EAT offset")
}

/// Current trading-calendar date in Nairobi. Cache keys are scoped to this
/// date, not the UTC date.
pub fn today(now_utc: DateTime<Utc>) -> anyhow::Result<NaiveDate> {
    let eat = nairobi_offset()?;
    Ok(now_utc.with_timezone(&eat).date_naive())
}

/// TTL for a cache entry written at `now_utc`, in seconds.
///
/// During market hours an entry lives 15 minutes. Outside market hours it
/// lives until the next open, so one entry covers the whole idle window.
pub fn dynamic_ttl_secs(now_utc: DateTime<Utc>) -> anyhow::Result<u64> {
    let eat = nairobi_offset()?;
    let local = now_utc.with_timezone(&eat);
    let minute = local.hour() * 60 + local.minute();

    let ttl = if (MARKET_OPEN_MINUTE..MARKET_CLOSE_MINUTE).contains(&minute) {
        INTRADAY_TTL_SECS
    } else if minute >= MARKET_CLOSE_MINUTE {
        // After close: next open is tomorrow morning.
        u64::from(MINUTES_PER_DAY - minute + MARKET_OPEN_MINUTE) * 60
    } else {
        // Pre-open: today's open is still ahead.
        u64::from(MARKET_OPEN_MINUTE - minute) * 60
    };

    Ok(ttl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // Nairobi is UTC+3, so local HH:MM maps to (HH-3):MM UTC.
    fn at_nairobi(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, hour - 3, minute, 0).unwrap()
    }

    #[test]
    fn intraday_entries_live_fifteen_minutes() {
        assert_eq!(dynamic_ttl_secs(at_nairobi(9, 30)).unwrap(), 900);
        assert_eq!(dynamic_ttl_secs(at_nairobi(14, 59)).unwrap(), 900);
    }

    #[test]
    fn after_close_entries_live_until_next_open() {
        // 15:01 -> 17h59m until 09:00 tomorrow.
        assert_eq!(
            dynamic_ttl_secs(at_nairobi(15, 1)).unwrap(),
            (24 * 60 - (15 * 60 + 1) + 9 * 60) * 60
        );
    }

    #[test]
    fn pre_open_entries_live_until_todays_open() {
        // 07:00 -> two hours until open.
        assert_eq!(dynamic_ttl_secs(at_nairobi(7, 0)).unwrap(), 2 * 60 * 60);
    }

    #[test]
    fn open_boundary_is_intraday_and_close_boundary_is_after_hours() {
        assert_eq!(dynamic_ttl_secs(at_nairobi(9, 0)).unwrap(), 900);
        assert_eq!(
            dynamic_ttl_secs(at_nairobi(15, 0)).unwrap(),
            (24 * 60 - 15 * 60 + 9 * 60) * 60
        );
    }

    #[test]
    fn trading_date_follows_nairobi_not_utc() {
        // 22:30 UTC is already 01:30 next day in Nairobi.
        let late = Utc.with_ymd_and_hms(2026, 8, 7, 22, 30, 0).unwrap();
        assert_eq!(
            today(late).unwrap(),
            NaiveDate::from_ymd_opt(2026, 8, 8).unwrap()
        );
    }
}
