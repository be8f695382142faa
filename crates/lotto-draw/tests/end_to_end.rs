//! Fetch an official draw over HTTP and score a stored recommendation.

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::post, Router};
use chrono::{FixedOffset, TimeZone};
use lotto_core::config::LotteryTypeSeed;
use lotto_core::{NewRecommendation, PrizeTier};
use lotto_draw::{JisuResultSource, ResultFetcher, WinAnalyzer};
use lotto_store::LotteryStore;

const BODY: &str = r#"{
    "status": 0,
    "msg": "ok",
    "result": {
        "caipiaoid": 14,
        "issueno": "24099",
        "number": "03 05 18 27 40",
        "refernumber": "08 12",
        "opendate": "2024-08-28",
        "saleamount": "300000000",
        "totalmoney": "800000000.00",
        "prize": [
            {"prizename": "一等奖", "require": "5+2", "num": 1, "singlebonus": 10000000},
            {"prizename": "五等奖", "require": "4+1", "num": 900, "singlebonus": 300}
        ]
    }
}"#;

#[tokio::test]
async fn fetched_draw_settles_matching_recommendation() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let router = Router::new().route("/caipiao/query", post(|| async { BODY }));
        axum::serve(listener, router).await.unwrap();
    });

    let store = Arc::new(LotteryStore::open_in_memory().unwrap());
    let dlt = store
        .upsert_lottery_type(&LotteryTypeSeed {
            code: "tc_dlt".to_string(),
            name: "Super Lotto".to_string(),
            schedule_cron: "0 0 10 * * 1,3,6".to_string(),
            model_name: "gpt-test".to_string(),
            is_active: true,
            results_api_id: Some(14),
            draw_info_endpoint: None,
        })
        .unwrap();

    let rec = store
        .create_recommendation(&NewRecommendation {
            lottery_type_id: dlt.id,
            numbers: "03,05,18,27,34+08,11".to_string(),
            model_name: "gpt-test".to_string(),
            target_period: "24099".to_string(),
            expected_draw_time: FixedOffset::east_opt(8 * 3600)
                .unwrap()
                .with_ymd_and_hms(2024, 8, 28, 20, 0, 0)
                .unwrap(),
        })
        .unwrap();
    assert_eq!(rec.win_tier, None);

    let source = Arc::new(JisuResultSource::new(
        format!("http://{addr}/caipiao/query"),
        "test-key",
        Duration::from_secs(5),
    ));
    let analyzer = Arc::new(WinAnalyzer::new(store.clone()));
    let fetcher = ResultFetcher::new(store.clone(), source, analyzer.clone());

    let draw = fetcher.fetch_one(dlt.id).await.unwrap();
    assert_eq!(draw.period, "24099");
    let tier5 = draw.breakdown.iter().find(|p| p.level == 5 && !p.add_on);
    assert_eq!(tier5.map(|p| p.winners), Some(900));

    let rec = store.get_recommendation(rec.id).unwrap().unwrap();
    assert_eq!(rec.win_tier, Some(PrizeTier::Tier5));
    assert_eq!(rec.win_amount, 300.0);
    assert_eq!(rec.official_result.as_deref(), Some("03 05 18 27 40+08 12"));

    // A second fetch of the same period neither duplicates the draw nor
    // disturbs the settled outcome.
    let summary = fetcher.fetch_all_active().await.unwrap();
    assert_eq!(summary.fetched, 1);
    assert_eq!(store.count_draw_results(dlt.id, "24099").unwrap(), 1);
    assert_eq!(analyzer.reanalyze_stored(dlt.id, "24099").unwrap().analyzed, 0);
}
