use metrica::{AttributionModel, JobPhase};
use metrica_mock::JobScript;
use serde_json::json;

use crate::helpers::{ACME, clock, january, key, metrica, obj, scripted};

#[tokio::test(start_paused = true)]
async fn malformed_numbers_coerce_to_zero_through_the_cycle() {
    let (backend, ctl) = scripted();
    let raw = vec![obj(json!({
        "platform": "meta",
        "campaign_name": "Retargeting",
        "date": "2024-01-08",
        "cost": "40",
        "impressions": "NaN",
        "clicks": null,
        "transactions": "3",
        "revenue": "12.5x",
        "revenue_origin_stack": "75.5"
    }))];
    ctl.set_job_script(key(ACME), JobScript::completing_after(0, raw))
        .await;
    let metrica = metrica(backend, &clock());

    let loaded = metrica.load(ACME, january()).await.unwrap();
    let record = &loaded.view.records()[0];

    let lnd = record.metrics(AttributionModel::LastNonDirect);
    assert!(lnd.revenue == 0.0 && !lnd.revenue.is_nan());
    assert_eq!(lnd.transactions, 3);
    assert!((record.metrics(AttributionModel::OriginStack).revenue - 75.5).abs() < 1e-9);
    assert!((record.cost - 40.0).abs() < 1e-9);
    assert_eq!(record.impressions, 0);
    assert_eq!(record.clicks, 0);
    assert_eq!(record.ctr, None);

    let ratios = loaded.view.ratios(AttributionModel::LastNonDirect);
    assert_eq!(ratios.roas, Some(0.0));
    // Baseline revenue is zero, so the ROAS delta is undefined rather than 0.
    assert_eq!(record.delta.roas_pct, None);
}

#[tokio::test(start_paused = true)]
async fn oversized_counts_saturate_through_the_cycle() {
    let (backend, ctl) = scripted();
    let raw = vec![
        obj(json!({
            "platform": "google",
            "campaign_name": "Brand",
            "date": "2024-01-05",
            "cost": 10,
            "impressions": "1e20",
            "clicks": 4,
            "transactions": 1e20,
        })),
        obj(json!({
            "platform": "google",
            "campaign_name": "Brand",
            "date": "2024-01-06",
            "cost": 10,
            "impressions": 1e20,
            "clicks": 6,
            "transactions": "2",
        })),
    ];
    ctl.set_job_script(key(ACME), JobScript::completing_after(0, raw))
        .await;
    let metrica = metrica(backend, &clock());

    let loaded = metrica.load(ACME, january()).await.unwrap();
    assert_eq!(loaded.view.len(), 2);
    let totals = &loaded.view.summary().totals;
    assert_eq!(totals.impressions, u64::MAX);
    assert_eq!(totals.clicks, 10);
    assert_eq!(
        loaded
            .view
            .metrics(AttributionModel::LastNonDirect)
            .transactions,
        u64::MAX
    );

    let snap = metrica.snapshot();
    assert_eq!(snap.phase, JobPhase::Completed);
    assert!(snap.error.is_none());
}
