//! Dispatch calendar.
//!
//! Parcels leave the atelier Monday through Thursday only, so nothing sits in
//! a depot over the weekend. Weekdays are always read in the time zone of the
//! `DateTime` passed in; build dates in the shop's zone to avoid off-by-one
//! weekdays around midnight.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Offset, TimeZone, Weekday};
use serde::Serialize;

pub const SHIPPING_WINDOW: &str = "Pazartesi-Perşembe";
const POSTPONED_SUFFIX: &str = "(Ertelendi)";

/// Europe/Istanbul has been fixed at UTC+3 since 2016.
pub fn istanbul() -> FixedOffset {
    FixedOffset::east_opt(3 * 3600).unwrap_or_else(|| Offset::fix(&chrono::Utc))
}

pub fn is_blackout_day<Tz: TimeZone>(date: &DateTime<Tz>) -> bool {
    matches!(date.weekday(), Weekday::Fri | Weekday::Sat | Weekday::Sun)
}

/// `date` itself when it is a dispatch day, otherwise the next Monday at the same time of day.
pub fn next_shipping_date<Tz: TimeZone>(date: &DateTime<Tz>) -> DateTime<Tz> {
    let mut next = date.clone();
    // Three blackout days in a row at most.
    for _ in 0..6 {
        if !is_blackout_day(&next) {
            break;
        }
        next = next + Duration::days(1);
    }
    next
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BlackoutDelay {
    pub is_blackout_day: bool,
    pub original_date: DateTime<FixedOffset>,
    pub scheduled_ship_date: DateTime<FixedOffset>,
    pub delay_days: i64,
    pub reason: Option<String>,
}

pub fn calculate_blackout_delay<Tz: TimeZone>(date: &DateTime<Tz>) -> BlackoutDelay {
    let blackout = is_blackout_day(date);
    let scheduled = next_shipping_date(date);
    let seconds = (scheduled.clone() - date.clone()).num_seconds();
    let delay_days = (seconds as f64 / 86_400.0).ceil() as i64;
    let reason = blackout.then(|| {
        format!(
            "{} sevkiyat yapılmayan bir gün. Gönderi {} gününe planlandı.",
            weekday_name(date.weekday()),
            weekday_name(scheduled.weekday())
        )
    });
    BlackoutDelay {
        is_blackout_day: blackout,
        original_date: to_fixed(date),
        scheduled_ship_date: to_fixed(&scheduled),
        delay_days,
        reason,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ShippingWindowInfo {
    pub can_ship_today: bool,
    pub next_available_date: DateTime<FixedOffset>,
    pub shipping_window: String,
    pub message: String,
}

pub fn shipping_window_info<Tz: TimeZone>(now: &DateTime<Tz>) -> ShippingWindowInfo {
    let can_ship_today = !is_blackout_day(now);
    let next = next_shipping_date(now);
    let (shipping_window, message) = if can_ship_today {
        (SHIPPING_WINDOW.to_string(), "Siparişiniz bugün kargoya verilebilir.".to_string())
    } else {
        (
            format!("{} {}", SHIPPING_WINDOW, POSTPONED_SUFFIX),
            format!(
                "Hafta sonu sevkiyatı yapılmamaktadır. Siparişiniz {} {} tarihinde kargoya verilecek.",
                weekday_name(next.weekday()),
                to_fixed(&next).format("%d.%m.%Y")
            ),
        )
    };
    ShippingWindowInfo { can_ship_today, next_available_date: to_fixed(&next), shipping_window, message }
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Pazartesi",
        Weekday::Tue => "Salı",
        Weekday::Wed => "Çarşamba",
        Weekday::Thu => "Perşembe",
        Weekday::Fri => "Cuma",
        Weekday::Sat => "Cumartesi",
        Weekday::Sun => "Pazar",
    }
}

fn to_fixed<Tz: TimeZone>(date: &DateTime<Tz>) -> DateTime<FixedOffset> {
    date.with_timezone(&date.offset().fix())
}
