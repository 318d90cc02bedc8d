//! Activity and global dashboard KPIs
//!
//! Revenue bucketing uses the effective payment date,
//! COALESCE(paid_date, created_at), so passes marked paid later land in the
//! day the payment actually arrived.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate, Utc};
use rusqlite::params;

use super::{format_datetime, Database};
use crate::error::Result;
use crate::models::{
    ActivityKpis, ActivitySummary, CountKpiCard, GlobalKpis, KpiCard, ProfitKpiCard,
    TrendDirection, UnpaidKpiCard,
};

/// Unpaid passes older than this many days count as overdue
const OVERDUE_THRESHOLD_DAYS: i64 = 3;

/// Period-over-period percentage change, one decimal
///
/// 100% when the previous window was empty and the current one is not;
/// 0 when both are empty.
fn percent_change(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        ((current - previous) / previous * 1000.0).round() / 10.0
    } else if current > 0.0 {
        100.0
    } else {
        0.0
    }
}

fn trend_for(change: f64) -> TrendDirection {
    if change > 0.0 {
        TrendDirection::Up
    } else if change < 0.0 {
        TrendDirection::Down
    } else {
        TrendDirection::Stable
    }
}

/// Densify a day->value map into exactly `days` chronological points ending today
fn densify<T: Copy + Default>(by_day: &HashMap<String, T>, days: i64, today: NaiveDate) -> Vec<T> {
    (0..days)
        .map(|offset| {
            let day = today - Duration::days(days - 1 - offset);
            by_day.get(&day.to_string()).copied().unwrap_or_default()
        })
        .collect()
}

impl Database {
    /// KPI dashboard payload for one activity
    ///
    /// `period_days` is clamped to the supported presets (7, 30, 90).
    /// Every trend series has exactly `period_days` points, oldest first.
    pub fn activity_kpis(&self, activity_id: i64, period_days: i64) -> Result<ActivityKpis> {
        let period_days = if [7, 30, 90].contains(&period_days) {
            period_days
        } else {
            7
        };

        // Activity must exist before any aggregation
        self.get_activity(activity_id)?;

        let now = Utc::now();
        let today = now.date_naive();
        let cutoff = format_datetime(now - Duration::days(period_days));
        let prev_cutoff = format_datetime(now - Duration::days(period_days * 2));
        let overdue_cutoff = format_datetime(now - Duration::days(OVERDUE_THRESHOLD_DAYS));

        let conn = self.conn()?;

        // Revenue: total, current window, previous window (effective date)
        let total_revenue: f64 = conn.query_row(
            "SELECT COALESCE(SUM(sold_amt), 0) FROM passports
             WHERE activity_id = ?1 AND paid = 1",
            params![activity_id],
            |row| row.get(0),
        )?;
        let period_revenue: f64 = conn.query_row(
            "SELECT COALESCE(SUM(sold_amt), 0) FROM passports
             WHERE activity_id = ?1 AND paid = 1
               AND COALESCE(paid_date, created_at) >= ?2",
            params![activity_id, cutoff],
            |row| row.get(0),
        )?;
        let previous_revenue: f64 = conn.query_row(
            "SELECT COALESCE(SUM(sold_amt), 0) FROM passports
             WHERE activity_id = ?1 AND paid = 1
               AND COALESCE(paid_date, created_at) >= ?2
               AND COALESCE(paid_date, created_at) < ?3",
            params![activity_id, prev_cutoff, cutoff],
            |row| row.get(0),
        )?;
        let revenue_change = percent_change(period_revenue, previous_revenue);

        // Active passports: paid with sessions left
        let active_total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM passports
             WHERE activity_id = ?1 AND paid = 1 AND uses_remaining > 0",
            params![activity_id],
            |row| row.get(0),
        )?;
        let active_period: i64 = conn.query_row(
            "SELECT COUNT(*) FROM passports
             WHERE activity_id = ?1 AND created_at >= ?2",
            params![activity_id, cutoff],
            |row| row.get(0),
        )?;
        let active_previous: i64 = conn.query_row(
            "SELECT COUNT(*) FROM passports
             WHERE activity_id = ?1 AND created_at >= ?2 AND created_at < ?3",
            params![activity_id, prev_cutoff, cutoff],
            |row| row.get(0),
        )?;
        let active_change = percent_change(active_period as f64, active_previous as f64);

        // Unpaid passports
        let unpaid_total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM passports WHERE activity_id = ?1 AND paid = 0",
            params![activity_id],
            |row| row.get(0),
        )?;
        let overdue: i64 = conn.query_row(
            "SELECT COUNT(*) FROM passports
             WHERE activity_id = ?1 AND paid = 0 AND created_at < ?2",
            params![activity_id, overdue_cutoff],
            |row| row.get(0),
        )?;

        // Profit: passport revenue + other income - expenses
        let other_income: f64 = conn.query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM incomes WHERE activity_id = ?1",
            params![activity_id],
            |row| row.get(0),
        )?;
        let expenses: f64 = conn.query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM expenses WHERE activity_id = ?1",
            params![activity_id],
            |row| row.get(0),
        )?;
        let total_income = total_revenue + other_income;
        let profit = total_income - expenses;
        let margin = if total_income > 0.0 {
            (profit / total_income * 1000.0).round() / 10.0
        } else {
            0.0
        };

        // Daily trend series: one grouped query per KPI, densified to exactly
        // period_days calendar days ending today
        let trend_start = (today - Duration::days(period_days - 1)).to_string();

        let mut stmt = conn.prepare(
            "SELECT date(COALESCE(paid_date, created_at)) as day, SUM(sold_amt)
             FROM passports
             WHERE activity_id = ?1 AND paid = 1
               AND date(COALESCE(paid_date, created_at)) >= ?2
             GROUP BY day",
        )?;
        let revenue_by_day: HashMap<String, f64> = stmt
            .query_map(params![activity_id, trend_start], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT date(created_at) as day, COUNT(*)
             FROM passports
             WHERE activity_id = ?1 AND paid = 1 AND uses_remaining > 0
               AND date(created_at) >= ?2
             GROUP BY day",
        )?;
        let active_by_day: HashMap<String, i64> = stmt
            .query_map(params![activity_id, trend_start], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT date(created_at) as day, COUNT(*)
             FROM passports
             WHERE activity_id = ?1 AND paid = 0
               AND date(created_at) >= ?2
             GROUP BY day",
        )?;
        let unpaid_by_day: HashMap<String, i64> = stmt
            .query_map(params![activity_id, trend_start], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;

        let revenue_trend = densify(&revenue_by_day, period_days, today);
        let active_trend = densify(&active_by_day, period_days, today);
        let unpaid_trend = densify(&unpaid_by_day, period_days, today);

        debug_assert_eq!(revenue_trend.len() as i64, period_days);
        debug_assert_eq!(active_trend.len() as i64, period_days);
        debug_assert_eq!(unpaid_trend.len() as i64, period_days);

        Ok(ActivityKpis {
            activity_id,
            period_days,
            revenue: KpiCard {
                total: total_revenue,
                period_value: period_revenue,
                trend: trend_for(revenue_change),
                percentage: revenue_change,
                trend_data: revenue_trend.clone(),
            },
            active_passports: CountKpiCard {
                total: active_total,
                period_value: active_period,
                trend: trend_for(active_change),
                percentage: active_change,
                trend_data: active_trend,
            },
            unpaid_passports: UnpaidKpiCard {
                total: unpaid_total,
                overdue,
                trend: if overdue == 0 {
                    TrendDirection::Down
                } else {
                    TrendDirection::Up
                },
                percentage: overdue as f64,
                trend_data: unpaid_trend,
            },
            profit: ProfitKpiCard {
                total: profit,
                margin,
                trend: if profit > 0.0 {
                    TrendDirection::Up
                } else {
                    TrendDirection::Stable
                },
                percentage: margin,
                // Revenue trend doubles as the profit proxy on the dashboard
                trend_data: revenue_trend,
            },
        })
    }

    /// Global dashboard totals across all activities
    pub fn global_kpis(&self) -> Result<GlobalKpis> {
        let conn = self.conn()?;

        let total_revenue: f64 = conn.query_row(
            "SELECT COALESCE(SUM(sold_amt), 0) FROM passports WHERE paid = 1",
            [],
            |row| row.get(0),
        )?;
        let active_passport_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM passports WHERE paid = 1 AND uses_remaining > 0",
            [],
            |row| row.get(0),
        )?;
        let (unpaid_count, unpaid_amount): (i64, f64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(sold_amt), 0) FROM passports WHERE paid = 0",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let member_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM members", [], |row| row.get(0))?;
        let activity_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM activities WHERE status = 'active'",
            [],
            |row| row.get(0),
        )?;

        Ok(GlobalKpis {
            total_revenue,
            active_passport_count,
            unpaid_count,
            unpaid_amount,
            member_count,
            activity_count,
        })
    }

    /// Per-activity lines for the global dashboard
    pub fn activity_summaries(&self) -> Result<Vec<ActivitySummary>> {
        let activities = self.list_activities(None)?;
        let conn = self.conn()?;

        let mut summaries = Vec::with_capacity(activities.len());
        for activity in activities {
            let (passport_count, unpaid_count, revenue): (i64, i64, f64) = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(CASE WHEN paid = 0 THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(CASE WHEN paid = 1 THEN sold_amt ELSE 0 END), 0)
                 FROM passports WHERE activity_id = ?1",
                params![activity.id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;
            summaries.push(ActivitySummary {
                activity,
                passport_count,
                unpaid_count,
                revenue,
            });
        }
        Ok(summaries)
    }
}
