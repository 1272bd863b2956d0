//! Server-side grid request example.
//!
//! Run with: cargo run --example grid_request
//!
//! Requires .env file with:
//! - SUPABASE_URL
//! - SUPABASE_ANON_KEY
//!
//! or `EPD_FIXTURE` pointing at a JSON array of rows.

use epd_grid_lib::config::GridConfig;
use epd_grid_lib::grid::{GridRequest, RowGroupColumn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    let config = GridConfig::from_env()?;
    let datasource = config.datasource(config.backend()?);

    println!("Material categories:");
    let mut request = GridRequest::rows(0, 100);
    request.row_group_cols = vec![RowGroupColumn::new("Material Category")];
    let groups = datasource.get_rows(&request).await?;
    for row in &groups.row_data {
        println!("  {}", row.get_str("Material Category")?.unwrap_or("-"));
    }

    let Some(first) = groups.row_data.first() else {
        return Ok(());
    };
    let category = first.get_str("Material Category")?.unwrap_or_default().to_string();

    println!("\nFirst 10 products in {}:", category);
    request.group_keys = vec![category];
    request.end_row = Some(10);
    request.filter_model = serde_json::from_str(
        r#"{ "GWP per Default Unit": { "filterType": "number", "type": "greaterThan", "filter": 0 } }"#,
    )?;
    let page = datasource.get_rows(&request).await?;
    for row in &page.row_data {
        println!(
            "  {} ({} kgCO2e)",
            row.get_str("Product Name")?.unwrap_or("-"),
            row.get_f64("GWP per Default Unit")?.unwrap_or_default()
        );
    }
    println!("Row count hint: {}", page.row_count);

    Ok(())
}
