/// Cache Probe - warms a cache from a seeded in-memory catalog and prints the
/// admin report.
///
/// Usage: cargo run --bin cache_probe [concurrent-requests]
///
/// Reads VITRINE_CACHE_* and VITRINE_LOG* from the environment.
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use vitrine_core::{CacheSettings, LogSettings, Product, ProductId, Theme, VitrineResult};
use vitrine_storage::{
    init_tracing, CachedCatalog, CatalogOp, InstrumentedSource, MemoCache, MockCatalog,
};

fn seed(catalog: &MockCatalog) {
    for (name, price_cents) in [("Espresso Cup", 900), ("Pour-over Kettle", 4_900), ("Grinder", 12_900)] {
        catalog.insert_product(Product {
            product_id: ProductId::now_v7(),
            name: name.to_string(),
            slug: name.to_lowercase().replace(' ', "-"),
            description: None,
            price_cents,
            currency: "EUR".to_string(),
            stock: 10,
            active: true,
            updated_at: Utc::now(),
        });
    }
    catalog.insert_theme(Theme {
        name: "default".to_string(),
        primary_color: "#1a1a1a".to_string(),
        accent_color: "#c8553d".to_string(),
        logo_url: None,
    });
}

async fn run(requests: usize) -> VitrineResult<()> {
    init_tracing(&LogSettings::from_env())?;

    let settings = CacheSettings::from_env();
    settings.validate()?;

    let mock = MockCatalog::new().with_latency(Duration::from_millis(50));
    seed(&mock);
    let source = Arc::new(InstrumentedSource::new(mock, settings.slow_call_threshold)?);
    let cache = Arc::new(MemoCache::with_settings(settings));
    let catalog = CachedCatalog::new(Arc::clone(&source), Arc::clone(&cache));

    let mut handles = Vec::with_capacity(requests);
    for _ in 0..requests {
        let catalog = catalog.clone();
        handles.push(tokio::spawn(async move {
            let products = catalog.all_products().await?;
            catalog.theme("default").await?;
            Ok::<_, vitrine_core::VitrineError>(products.len())
        }));
    }
    for handle in handles {
        match handle.await {
            Ok(result) => {
                result?;
            }
            Err(e) => eprintln!("❌ request task failed: {}", e),
        }
    }

    println!("╔═══════════════════════════════════════════════════════════════");
    println!("║ CACHE PROBE: {} concurrent requests", requests);
    println!("╚═══════════════════════════════════════════════════════════════\n");

    for op in [CatalogOp::ListProducts, CatalogOp::Theme] {
        let metrics = source.metrics_for(op);
        println!(
            "  {:<14} upstream calls: {:>3}  mean: {:?}",
            op.as_str(),
            metrics.calls,
            metrics.mean()
        );
    }
    println!();
    println!("{}", source.encode_text()?);

    match cache.report().to_json_pretty() {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("❌ Failed to render report: {}", e),
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let requests = match std::env::args().nth(1) {
        Some(arg) => match arg.parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                eprintln!("Usage: cargo run --bin cache_probe [concurrent-requests]");
                std::process::exit(1);
            }
        },
        None => 32,
    };

    if let Err(e) = run(requests).await {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}
