//! Income/expense CRUD and the monthly financial summary

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Expense, FinancialSummaryRow, Income, NewExpense, NewIncome};

fn row_to_income(row: &rusqlite::Row<'_>) -> rusqlite::Result<Income> {
    let date: String = row.get(2)?;
    let status: String = row.get(6)?;
    let created_at: String = row.get(7)?;
    Ok(Income {
        id: row.get(0)?,
        activity_id: row.get(1)?,
        date: date.parse().unwrap_or_default(),
        amount: row.get(3)?,
        description: row.get(4)?,
        category: row.get(5)?,
        payment_status: status.parse().unwrap_or_default(),
        created_at: parse_datetime(&created_at),
    })
}

fn row_to_expense(row: &rusqlite::Row<'_>) -> rusqlite::Result<Expense> {
    let date: String = row.get(2)?;
    let status: String = row.get(6)?;
    let created_at: String = row.get(9)?;
    Ok(Expense {
        id: row.get(0)?,
        activity_id: row.get(1)?,
        date: date.parse().unwrap_or_default(),
        amount: row.get(3)?,
        description: row.get(4)?,
        category: row.get(5)?,
        payment_status: status.parse().unwrap_or_default(),
        due_date: row
            .get::<_, Option<String>>(7)?
            .and_then(|s| s.parse().ok()),
        payment_date: row
            .get::<_, Option<String>>(8)?
            .and_then(|s| s.parse().ok()),
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Record income for an activity
    pub fn create_income(&self, activity_id: i64, new: &NewIncome) -> Result<i64> {
        self.get_activity(activity_id)?;
        if new.amount < 0.0 {
            return Err(Error::InvalidData(
                "Income amount cannot be negative".to_string(),
            ));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO incomes (activity_id, date, amount, description, category, payment_status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                activity_id,
                new.date.to_string(),
                new.amount,
                new.description,
                new.category,
                new.payment_status.as_str(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Update an income record
    pub fn update_income(&self, id: i64, new: &NewIncome) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE incomes SET date = ?2, amount = ?3, description = ?4, category = ?5,
             payment_status = ?6 WHERE id = ?1",
            params![
                id,
                new.date.to_string(),
                new.amount,
                new.description,
                new.category,
                new.payment_status.as_str(),
            ],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Income not found: {}", id)));
        }
        Ok(())
    }

    /// Delete an income record
    pub fn delete_income(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM incomes WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Income not found: {}", id)));
        }
        Ok(())
    }

    /// List income records for an activity, newest first
    pub fn list_incomes(&self, activity_id: i64) -> Result<Vec<Income>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, activity_id, date, amount, description, category, payment_status, created_at
             FROM incomes WHERE activity_id = ?1 ORDER BY date DESC, id DESC",
        )?;
        let incomes = stmt
            .query_map(params![activity_id], row_to_income)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(incomes)
    }

    /// Record an expense for an activity
    pub fn create_expense(&self, activity_id: i64, new: &NewExpense) -> Result<i64> {
        self.get_activity(activity_id)?;
        if new.amount < 0.0 {
            return Err(Error::InvalidData(
                "Expense amount cannot be negative".to_string(),
            ));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO expenses
             (activity_id, date, amount, description, category, payment_status, due_date, payment_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                activity_id,
                new.date.to_string(),
                new.amount,
                new.description,
                new.category,
                new.payment_status.as_str(),
                new.due_date.map(|d| d.to_string()),
                new.payment_date.map(|d| d.to_string()),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Update an expense record
    pub fn update_expense(&self, id: i64, new: &NewExpense) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE expenses SET date = ?2, amount = ?3, description = ?4, category = ?5,
             payment_status = ?6, due_date = ?7, payment_date = ?8 WHERE id = ?1",
            params![
                id,
                new.date.to_string(),
                new.amount,
                new.description,
                new.category,
                new.payment_status.as_str(),
                new.due_date.map(|d| d.to_string()),
                new.payment_date.map(|d| d.to_string()),
            ],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Expense not found: {}", id)));
        }
        Ok(())
    }

    /// Delete an expense record
    pub fn delete_expense(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM expenses WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Expense not found: {}", id)));
        }
        Ok(())
    }

    /// List expense records for an activity, newest first
    pub fn list_expenses(&self, activity_id: i64) -> Result<Vec<Expense>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, activity_id, date, amount, description, category, payment_status,
                    due_date, payment_date, created_at
             FROM expenses WHERE activity_id = ?1 ORDER BY date DESC, id DESC",
        )?;
        let expenses = stmt
            .query_map(params![activity_id], row_to_expense)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(expenses)
    }

    /// Query the monthly financial summary view
    ///
    /// `activity_id` narrows to one activity; `fiscal_year` narrows to the
    /// twelve months of that calendar year.
    pub fn financial_summary(
        &self,
        activity_id: Option<i64>,
        fiscal_year: Option<i32>,
    ) -> Result<Vec<FinancialSummaryRow>> {
        let conn = self.conn()?;

        let mut conditions: Vec<String> = Vec::new();
        let mut query_params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(activity_id) = activity_id {
            query_params.push(Box::new(activity_id));
            conditions.push(format!("activity_id = ?{}", query_params.len()));
        }
        if let Some(year) = fiscal_year {
            query_params.push(Box::new(format!("{:04}-", year)));
            conditions.push(format!("month LIKE ?{} || '%'", query_params.len()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT month, activity_id, activity_name,
                    passport_sales, other_income, cash_received, cash_paid, net_cash_flow,
                    passport_ar, other_income_ar, accounts_receivable, accounts_payable,
                    total_revenue, total_expenses, net_income
             FROM monthly_financial_summary {}
             ORDER BY month DESC, activity_name",
            where_clause
        );

        let mut stmt = conn.prepare(&sql)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> =
            query_params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                Ok(FinancialSummaryRow {
                    month: row.get(0)?,
                    activity_id: row.get(1)?,
                    activity_name: row.get(2)?,
                    passport_sales: row.get(3)?,
                    other_income: row.get(4)?,
                    cash_received: row.get(5)?,
                    cash_paid: row.get(6)?,
                    net_cash_flow: row.get(7)?,
                    passport_ar: row.get(8)?,
                    other_income_ar: row.get(9)?,
                    accounts_receivable: row.get(10)?,
                    accounts_payable: row.get(11)?,
                    total_revenue: row.get(12)?,
                    total_expenses: row.get(13)?,
                    net_income: row.get(14)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
