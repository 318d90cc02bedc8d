//! Report commands

use anyhow::Result;

use minipass_core::Database;

use super::truncate;

pub fn cmd_report_summary(
    db: &Database,
    activity_id: Option<i64>,
    fiscal_year: Option<i32>,
) -> Result<()> {
    let rows = db.financial_summary(activity_id, fiscal_year)?;

    if rows.is_empty() {
        println!("No financial data yet.");
        return Ok(());
    }

    println!();
    println!(
        "  {:<8} {:<22} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "MONTH", "ACTIVITY", "CASH IN", "CASH OUT", "NET CASH", "AR", "AP", "NET INC"
    );
    for row in &rows {
        println!(
            "  {:<8} {:<22} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
            row.month,
            truncate(&row.activity_name, 22),
            format!("{:.2}", row.cash_received),
            format!("{:.2}", row.cash_paid),
            format!("{:.2}", row.net_cash_flow),
            format!("{:.2}", row.accounts_receivable),
            format!("{:.2}", row.accounts_payable),
            format!("{:.2}", row.net_income),
        );
    }

    let total_net: f64 = rows.iter().map(|r| r.net_income).sum();
    println!();
    println!("  Net income across {} row(s): ${:.2}", rows.len(), total_net);
    Ok(())
}

pub fn cmd_report_kpis(db: &Database, activity_id: i64, period_days: i64) -> Result<()> {
    let kpis = db.activity_kpis(activity_id, period_days)?;
    let activity = db.get_activity(activity_id)?;

    println!();
    println!(
        "📈 {} - last {} day(s)",
        activity.name, kpis.period_days
    );
    println!(
        "   Revenue: ${:.2} total, ${:.2} this period ({:+.1}%)",
        kpis.revenue.total, kpis.revenue.period_value, kpis.revenue.percentage
    );
    println!(
        "   Active passes: {} total, {} new this period ({:+.1}%)",
        kpis.active_passports.total,
        kpis.active_passports.period_value,
        kpis.active_passports.percentage
    );
    println!(
        "   Unpaid passes: {} ({} overdue)",
        kpis.unpaid_passports.total, kpis.unpaid_passports.overdue
    );
    println!(
        "   Profit: ${:.2} (margin {:.1}%)",
        kpis.profit.total, kpis.profit.margin
    );
    println!();
    Ok(())
}
