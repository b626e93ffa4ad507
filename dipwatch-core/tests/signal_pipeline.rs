//! End-to-end scenarios for the signal pipeline: raw table → signal table
//! → notification decision.

use chrono::NaiveDate;
use dipwatch_core::data::{normalize, SyntheticProvider, DataProvider, FetchPeriod, Interval};
use dipwatch_core::signal::evaluate;
use dipwatch_core::{
    decide, IndicatorRow, NotifyMode, Recipients, SignalError, SignalPipeline, StrategyParams,
};
use polars::prelude::*;

fn dates(n: usize) -> Vec<String> {
    let base = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    (0..n)
        .map(|i| (base + chrono::Duration::days(i as i64)).to_string())
        .collect()
}

fn frame(closes: &[f64]) -> DataFrame {
    df!("Date" => dates(closes.len()), "Close" => closes.to_vec()).unwrap()
}

/// 40 quiet days around 100, nine -2% days, then a -20% day.
fn crash_closes() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..40)
        .map(|i| if i % 2 == 1 { 100.5 } else { 99.5 })
        .collect();
    let mut price = *closes.last().unwrap();
    for _ in 0..9 {
        price *= 0.98;
        closes.push(price);
    }
    closes.push(price * 0.80);
    closes
}

fn pipeline() -> SignalPipeline {
    SignalPipeline::new("VWRL.AS", StrategyParams::default())
}

#[test]
fn crash_fires_on_last_day_only() {
    let table = pipeline().run(&frame(&crash_closes())).unwrap();

    assert_eq!(table.len(), 50);
    assert_eq!(table.buy_count(), 1);
    let last = table.latest().unwrap();
    assert!(last.buy_signal);
    assert!(last.rsi14.unwrap() < 30.0);
    assert!(last.close < last.bb_lower.unwrap());
    assert!(last.drawdown_pct.unwrap() < -20.0);
}

#[test]
fn crash_notifies_in_live_mode() {
    let table = pipeline().run(&frame(&crash_closes())).unwrap();
    let recipients = Recipients::parse("ops@example.com, pm@example.com");

    let event = decide(&table, NotifyMode::Live, &recipients).unwrap();
    let last = table.latest().unwrap();
    assert_eq!(event.date, last.date);
    assert_eq!(event.price, last.close);
    assert_eq!(event.recipients.as_slice(), ["ops@example.com", "pm@example.com"]);
    assert!(event.body().contains(&format!("{:.2}", last.close)));
}

#[test]
fn day_before_crash_does_not_notify() {
    let mut closes = crash_closes();
    closes.pop();
    let table = pipeline().run(&frame(&closes)).unwrap();

    assert!(!table.latest().unwrap().buy_signal);
    assert!(decide(&table, NotifyMode::Live, &Recipients::default()).is_none());
    assert!(decide(&table, NotifyMode::Test, &Recipients::default()).is_some());
}

#[test]
fn ten_points_are_all_warmup() {
    let closes: Vec<f64> = (0..10).map(|i| 100.0 - i as f64 * 5.0).collect();
    let table = pipeline().run(&frame(&closes)).unwrap();

    assert_eq!(table.len(), 10);
    for row in table.rows() {
        assert!(row.rsi14.is_none());
        assert!(row.bb_lower.is_none());
        assert!(row.bb_mid.is_none());
        assert!(row.bb_upper.is_none());
        assert!(!row.buy_signal);
    }
}

#[test]
fn repeated_runs_are_identical() {
    let raw = frame(&crash_closes());
    let first = pipeline().run(&raw).unwrap();
    let second = pipeline().run(&raw).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.fingerprint(), second.fingerprint());
    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
}

#[test]
fn unsorted_duplicated_input_matches_clean_input() {
    let closes = crash_closes();
    let clean = pipeline().run(&frame(&closes)).unwrap();

    let mut ds = dates(closes.len());
    let mut cs = closes.clone();
    ds.reverse();
    cs.reverse();
    // A stale duplicate of the last day listed first; the later entry wins.
    ds.insert(0, ds[0].clone());
    cs.insert(0, 1.0);
    let messy = df!("date" => ds, "close" => cs).unwrap();

    let table = pipeline().run(&messy).unwrap();
    assert_eq!(table.fingerprint(), clean.fingerprint());
}

#[test]
fn empty_table_is_data_unavailable() {
    let raw = df!("Date" => Vec::<String>::new(), "Close" => Vec::<f64>::new()).unwrap();
    let err = pipeline().run(&raw).unwrap_err();
    assert!(matches!(err, SignalError::DataUnavailable { .. }));
}

#[test]
fn all_null_closes_never_reach_indicators() {
    let raw = df!(
        "Date" => dates(30),
        "Close" => vec![None::<f64>; 30],
    )
    .unwrap();
    match normalize(&raw) {
        Err(SignalError::DataUnavailable { reason, rows, .. }) => {
            assert!(reason.contains("null"));
            assert_eq!(rows, 30);
        }
        other => panic!("expected DataUnavailable, got {other:?}"),
    }
    assert!(pipeline().run(&raw).is_err());
}

fn forced_row(day: u32) -> IndicatorRow {
    IndicatorRow {
        date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
        close: 100.0,
        rsi14: None,
        bb_lower: None,
        bb_mid: None,
        bb_upper: None,
        all_time_high: 100.0,
        drawdown_pct: Some(0.0),
    }
}

/// 25 rows; row 24 has RSI 25, close 5% below the lower band, drawdown -25%.
fn forced_rows() -> Vec<IndicatorRow> {
    let mut rows: Vec<IndicatorRow> = (1..=25).map(forced_row).collect();
    let lower = 80.0;
    let last = &mut rows[24];
    last.rsi14 = Some(25.0);
    last.bb_lower = Some(lower);
    last.bb_mid = Some(90.0);
    last.bb_upper = Some(100.0);
    last.close = lower * 0.95;
    last.all_time_high = last.close / 0.75;
    last.drawdown_pct = Some(-25.0);
    rows
}

#[test]
fn conjunction_fires_when_all_three_hold() {
    let signals = evaluate(forced_rows(), &StrategyParams::default());
    assert!(signals[24].buy_signal);
    assert!(signals[..24].iter().all(|r| !r.buy_signal));
}

#[test]
fn conjunction_fails_when_any_one_flips() {
    let params = StrategyParams::default();

    let mut rows = forced_rows();
    rows[24].rsi14 = Some(35.0);
    assert!(!evaluate(rows, &params)[24].buy_signal);

    let mut rows = forced_rows();
    rows[24].close = rows[24].bb_lower.unwrap() * 1.05;
    assert!(!evaluate(rows, &params)[24].buy_signal);

    let mut rows = forced_rows();
    rows[24].drawdown_pct = Some(-15.0);
    assert!(!evaluate(rows, &params)[24].buy_signal);
}

#[test]
fn synthetic_history_runs_through_pipeline() {
    let end = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
    let fetched = SyntheticProvider::new(end)
        .fetch("VWRL.AS", FetchPeriod::Years(2), Interval::Daily)
        .unwrap();
    let table = pipeline().run(&fetched.frame).unwrap();

    assert_eq!(table.latest().unwrap().date, end);
    assert!(table.rows()[..19].iter().all(|r| !r.buy_signal));
}
