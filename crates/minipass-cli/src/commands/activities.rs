//! Activity commands

use anyhow::Result;

use minipass_core::Database;

use super::truncate;

pub fn cmd_activities_list(db: &Database) -> Result<()> {
    let summaries = db.activity_summaries()?;

    if summaries.is_empty() {
        println!("No activities yet.");
        return Ok(());
    }

    println!();
    println!(
        "  {:<5} {:<30} {:<10} {:>7} {:>7} {:>12}",
        "ID", "NAME", "STATUS", "PASSES", "UNPAID", "REVENUE"
    );
    for summary in summaries {
        println!(
            "  {:<5} {:<30} {:<10} {:>7} {:>7} {:>12}",
            summary.activity.id,
            truncate(&summary.activity.name, 30),
            summary.activity.status,
            summary.passport_count,
            summary.unpaid_count,
            format!("${:.2}", summary.revenue)
        );
    }
    println!();
    Ok(())
}
