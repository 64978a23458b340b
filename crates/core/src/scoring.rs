use crate::domain::insights::Pick;
use crate::market::types::{DividendAnnouncement, Instrument};
use chrono::NaiveDate;

/// Counters with an established dividend track record get a bonus on top of a
/// fresh announcement.
pub const BLUE_CHIP_TICKERS: [&str; 5] = ["SCOM", "EABL", "IMHC", "KCB", "EQTY"];

const RECENT_ANNOUNCEMENT_DAYS: i64 = 30;
const MIN_QUALIFYING_VOLUME_SPIKE: f64 = 10.0;
const MIN_MARKET_CAP: f64 = 5_000_000_000.0;

/// Percent change of `current` against `base`; a non-positive base carries no
/// signal and scores as flat.
fn pct_change(current: f64, base: f64) -> f64 {
    if base > 0.0 {
        (current - base) / base * 100.0
    } else {
        0.0
    }
}

pub fn volume_spike_percent(stock: &Instrument) -> f64 {
    pct_change(stock.volume as f64, stock.average_volume as f64)
}

/// Momentum score, 0-100. A volume spike under 10% disqualifies the
/// instrument outright; above the gate, volume weighs 40, price momentum 30
/// and trend confirmation 30, each capped independently.
pub fn momentum_score(stock: &Instrument) -> u32 {
    let volume_spike = volume_spike_percent(stock);
    if volume_spike < MIN_QUALIFYING_VOLUME_SPIKE {
        return 0;
    }

    let price_change = pct_change(stock.current_price, stock.previous_close);
    let trend_strength = pct_change(stock.current_price, stock.moving_average_20_day);

    // 50% spike, 5% gain and 10% above the MA each max out their component.
    let mut score = (volume_spike / 50.0 * 40.0).min(40.0);
    score += (price_change.max(0.0) / 5.0 * 30.0).min(30.0);
    score += (trend_strength.max(0.0) / 10.0 * 30.0).min(30.0);

    (score.round() as u32).min(100)
}

fn recent_announcement<'a>(
    dividends: &'a [DividendAnnouncement],
    ticker: &str,
    today: NaiveDate,
) -> Option<&'a DividendAnnouncement> {
    dividends.iter().find(|d| {
        d.ticker == ticker
            && (today - d.announcement_date).num_days() <= RECENT_ANNOUNCEMENT_DAYS
    })
}

/// Dividend score, 0-100: 50 for an announcement within the last 30 days,
/// 20 more when that announcement is from a blue chip, and up to 30 from the
/// instrument's own yield when it is known.
pub fn dividend_score(
    stock: &Instrument,
    dividends: &[DividendAnnouncement],
    today: NaiveDate,
) -> u32 {
    let mut score: f64 = 0.0;

    if recent_announcement(dividends, &stock.ticker, today).is_some() {
        score += 50.0;
        if BLUE_CHIP_TICKERS.contains(&stock.ticker.as_str()) {
            score += 20.0;
        }
    }

    match stock.dividend_yield {
        Some(yield_percent) => {
            // 10% yield maxes the component; negative yields carry no signal.
            score += (yield_percent / 10.0 * 30.0).clamp(0.0, 30.0);
        }
        None => {}
    }

    (score.round() as u32).min(100)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Entry at the 20-day MA plus a 2% buffer.
pub fn entry_point(stock: &Instrument) -> f64 {
    round2(stock.moving_average_20_day * 1.02)
}

/// Stop 5% under the 20-day MA.
pub fn stop_loss(stock: &Instrument) -> f64 {
    round2(stock.moving_average_20_day * 0.95)
}

/// Conservative 10% gain target off the current price.
pub fn target_price(stock: &Instrument) -> f64 {
    round2(stock.current_price * 1.10)
}

fn qualifies(stock: &Instrument) -> bool {
    stock.current_price >= stock.moving_average_20_day && stock.market_cap >= MIN_MARKET_CAP
}

fn reasoning(
    stock: &Instrument,
    momentum: u32,
    dividend: u32,
    volume_spike: f64,
    recent: Option<&DividendAnnouncement>,
) -> String {
    if momentum > dividend {
        return format!("{volume_spike:.1}% volume spike with strong uptrend");
    }
    if let Some(announcement) = recent {
        return format!(
            "Recent dividend announcement ({:.2}% yield)",
            announcement.yield_percent
        );
    }
    match stock.dividend_yield {
        Some(yield_percent) => format!("High dividend yield ({yield_percent:.2}%)"),
        None => "Trading above 20-day average".to_string(),
    }
}

fn build_pick(
    stock: &Instrument,
    dividends: &[DividendAnnouncement],
    today: NaiveDate,
) -> Pick {
    let volume_spike = volume_spike_percent(stock);
    let momentum = momentum_score(stock);
    let dividend = dividend_score(stock, dividends, today);
    let recent = recent_announcement(dividends, &stock.ticker, today);

    Pick {
        ticker: stock.ticker.clone(),
        name: stock.name.clone(),
        current_price: stock.current_price,
        entry_point: entry_point(stock),
        stop_loss: stop_loss(stock),
        target_price: target_price(stock),
        reasoning: reasoning(stock, momentum, dividend, volume_spike, recent),
        momentum_score: momentum,
        dividend_score: dividend,
        // Momentum 60%, dividend 40%.
        total_score: f64::from(momentum) * 0.6 + f64::from(dividend) * 0.4,
        volume_spike_percent: volume_spike,
    }
}

/// Score, filter and rank the session's instruments into at most `top_n`
/// picks. Pure over its inputs: same instruments, dividends and date always
/// produce the same ordering, with score ties kept in original fetch order.
pub fn rank(
    instruments: &[Instrument],
    dividends: &[DividendAnnouncement],
    top_n: usize,
    today: NaiveDate,
) -> Vec<Pick> {
    let mut picks: Vec<Pick> = instruments
        .iter()
        .filter(|stock| qualifies(stock))
        .map(|stock| build_pick(stock, dividends, today))
        .collect();

    // sort_by is stable, so equal scores keep their fetch order.
    picks.sort_by(|a, b| {
        b.total_score
            .partial_cmp(&a.total_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    picks.truncate(top_n);
    picks
}
