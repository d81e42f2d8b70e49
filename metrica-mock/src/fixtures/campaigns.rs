use metrica_core::RawRecord;
use serde_json::{Value, json};

fn obj(v: Value) -> RawRecord {
    match v {
        Value::Object(map) => map,
        _ => RawRecord::new(),
    }
}

/// Raw records for a fixture resource, or `None` for unknown resources.
pub fn by_resource(resource: &str) -> Option<Vec<RawRecord>> {
    match resource {
        "acme_store" | "outage_store" => Some(acme_store()),
        "globex" => Some(globex()),
        "empty_store" => Some(Vec::new()),
        _ => None,
    }
}

fn acme_store() -> Vec<RawRecord> {
    vec![
        obj(json!({
            "platform": "google",
            "campaign_name": "Brand Search",
            "date": "2024-01-05",
            "cost": 120.5,
            "impressions": 5400,
            "clicks": 310,
            "leads": 12,
            "transactions": 9,
            "revenue": 1890.0,
            "transactions_first": 4,
            "revenue_first": 760.0,
            "transactions_origin_stack": 7,
            "revenue_origin_stack": 1450.0,
            "transactions_first_origin_stack": 5,
            "revenue_first_origin_stack": 910.0,
            "pixel_transactions": 8,
            "pixel_revenue": 1700.0,
            "recurring_montly_revenue": 90.0,
            "recurring_montly_subscriptions": 3,
            "recurring_annual_revenue": 0,
            "recurring_annual_subscriptions": 0,
            "first_montly_revenue": 60.0,
            "first_montly_subscriptions": 2,
            "first_annual_revenue": 0,
            "first_annual_subscriptions": 0
        })),
        obj(json!({
            "platform": "meta",
            "campaign_name": "Prospecting - Lookalike",
            "date": "2024-01-12",
            "cost": "310.75",
            "impressions": "48210",
            "clicks": "902",
            "leads": "40",
            "transactions": 6,
            "revenue": 980.4,
            "transactions_first": 6,
            "revenue_first": 980.4,
            "transactions_origin_stack": 11,
            "revenue_origin_stack": 1712.9,
            "transactions_first_origin_stack": 9,
            "revenue_first_origin_stack": 1402.0,
            "pixel_transactions": 14,
            "pixel_revenue": 2200.0
        })),
        obj(json!({
            "platform": "google",
            "campaign_name": "Performance Max",
            "date": "2024-01-20",
            "cost": 95.0,
            "impressions": 12000,
            "clicks": 240,
            "leads": null,
            "transactions": 0,
            "revenue": 0,
            "transactions_first": 0,
            "revenue_first": 0,
            "transactions_origin_stack": 2,
            "revenue_origin_stack": 310.0,
            "transactions_first_origin_stack": 1,
            "revenue_first_origin_stack": 150.0
        })),
    ]
}

fn globex() -> Vec<RawRecord> {
    (1..=31)
        .map(|d| {
            let day = format!("2024-01-{d:02}");
            let cost = 50.0 + f64::from(d);
            obj(json!({
                "platform": if d % 2 == 0 { "google" } else { "meta" },
                "campaign_name": format!("Always On {}", d % 3),
                "date": day,
                "cost": cost,
                "impressions": 1000 * d,
                "clicks": 20 * d,
                "leads": d % 5,
                "transactions": d % 4,
                "revenue": cost * 2.5,
                "transactions_first": d % 2,
                "revenue_first": cost,
                "transactions_origin_stack": d % 4 + 1,
                "revenue_origin_stack": cost * 3.0,
                "transactions_first_origin_stack": d % 2 + 1,
                "revenue_first_origin_stack": cost * 1.5
            }))
        })
        .collect()
}
