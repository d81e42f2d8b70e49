mod common;

use std::time::Duration;

use metrica::{AttributionModel, DateRange, Metrica, PollConfig, RecordFilter};

fn fmt_opt(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    common::init_tracing();

    // 1. Build the controller around the backend.
    let metrica = Metrica::builder()
        .with_backend(common::get_backend())
        .poll(PollConfig {
            interval: Duration::from_millis(200),
            max_wait: Some(Duration::from_secs(600)),
        })
        .build()?;

    // 2. Print progress as snapshots are published.
    let mut updates = metrica.subscribe();
    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snap = updates.borrow_and_update().clone();
            if snap.is_loading() {
                println!("[{}] {}", snap.generation, snap.progress_text);
            }
        }
    });

    // 3. Select a resource and a range; the first load runs a job.
    let january = DateRange::parse("2024-01-01", "2024-01-31")?;
    let loaded = metrica.load("globex", january).await?;
    println!("source: {:?}, records: {}", loaded.source, loaded.view.len());

    // 4. A narrower range is served from the cache entry.
    let first_week = DateRange::parse("2024-01-01", "2024-01-07")?;
    let week = metrica.load("globex", first_week).await?;
    println!("source: {:?}, records: {}", week.source, week.view.len());

    // 5. Read totals and ratios under both attribution models.
    let view = week.view.filtered(RecordFilter::default().platform("google"));
    let totals = &view.summary().totals;
    println!("cost {:.2} over {} records", totals.cost, totals.records);
    for model in [AttributionModel::LastNonDirect, AttributionModel::OriginStack] {
        let ratios = view.ratios(model);
        println!(
            "{model:?}: revenue {:.2} roas {} cpa {}",
            ratios.display_revenue,
            fmt_opt(ratios.roas),
            fmt_opt(ratios.cpa)
        );
    }
    for row in view.rollup() {
        println!("{} / {}: cost {:.2}", row.platform, row.campaign_name, row.summary.totals.cost);
    }

    metrica.shutdown();
    printer.abort();
    Ok(())
}
