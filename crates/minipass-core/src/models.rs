//! Domain models for Minipass

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An administrator account
///
/// The password hash never leaves the database layer; this struct is safe
/// to serialize into API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A pass holder (the person who signed up or bought a passport)
///
/// Every signup and every admin-created passport inserts a fresh member row,
/// even when the email repeats. Contact history stays attached to the pass
/// it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Activity lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    #[default]
    Active,
    Archived,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }
}

impl std::str::FromStr for ActivityStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            _ => Err(format!("Unknown activity status: {}", s)),
        }
    }
}

impl std::fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recurring activity (league season, class series, drop-in program)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub name: String,
    pub activity_type: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: ActivityStatus,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating or updating an activity
#[derive(Debug, Clone, Deserialize)]
pub struct NewActivity {
    pub name: String,
    pub activity_type: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<ActivityStatus>,
}

/// Passport type kind: permanent offerings vs seasonal ones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PassportTypeKind {
    #[default]
    Permanent,
    Seasonal,
}

impl PassportTypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permanent => "permanent",
            Self::Seasonal => "seasonal",
        }
    }
}

impl std::str::FromStr for PassportTypeKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "permanent" => Ok(Self::Permanent),
            "seasonal" => Ok(Self::Seasonal),
            _ => Err(format!("Unknown passport type kind: {}", s)),
        }
    }
}

impl std::fmt::Display for PassportTypeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A purchasable pass offering for an activity (e.g. "4-session punch card")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassportType {
    pub id: i64,
    pub activity_id: i64,
    pub name: String,
    pub kind: PassportTypeKind,
    pub price_per_user: f64,
    pub sessions_included: i64,
    pub target_revenue: f64,
    pub payment_instructions: Option<String>,
    pub status: ActivityStatus,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating or updating a passport type
#[derive(Debug, Clone, Deserialize)]
pub struct NewPassportType {
    pub name: String,
    #[serde(default)]
    pub kind: PassportTypeKind,
    pub price_per_user: f64,
    pub sessions_included: i64,
    #[serde(default)]
    pub target_revenue: f64,
    pub payment_instructions: Option<String>,
}

/// Records referencing a passport type, checked before archive/delete
#[derive(Debug, Clone, Serialize)]
pub struct PassportTypeDependencies {
    pub passport_count: i64,
    pub signup_count: i64,
}

/// A sold (or pending-payment) pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passport {
    pub id: i64,
    pub pass_code: String,
    pub member_id: i64,
    pub activity_id: i64,
    /// NULL after the referenced passport type is deleted (ON DELETE SET NULL)
    pub passport_type_id: Option<i64>,
    /// Snapshot of the type name at creation time; survives type deletion
    pub passport_type_name: Option<String>,
    pub sold_amt: f64,
    pub uses_remaining: i64,
    pub paid: bool,
    pub paid_date: Option<DateTime<Utc>>,
    pub marked_paid_by: Option<String>,
    pub created_by: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A passport joined with its holder, as listed in the admin UI
#[derive(Debug, Clone, Serialize)]
pub struct PassportWithMember {
    #[serde(flatten)]
    pub passport: Passport,
    pub member_name: String,
    pub member_email: String,
    pub member_phone: Option<String>,
    pub activity_name: String,
}

/// Fields for creating a passport
#[derive(Debug, Clone, Deserialize)]
pub struct NewPassport {
    pub member_name: String,
    pub member_email: String,
    pub member_phone: Option<String>,
    pub activity_id: i64,
    pub passport_type_id: Option<i64>,
    pub sold_amt: f64,
    pub uses_remaining: i64,
    #[serde(default)]
    pub paid: bool,
    pub notes: Option<String>,
}

/// A single use of a passport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Redemption {
    pub id: i64,
    pub passport_id: i64,
    pub redeemed_at: DateTime<Utc>,
    pub redeemed_by: Option<String>,
}

/// Signup lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SignupStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl SignupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for SignupStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Unknown signup status: {}", s)),
        }
    }
}

impl std::fmt::Display for SignupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registration submitted through the public signup form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signup {
    pub id: i64,
    pub member_id: i64,
    pub activity_id: i64,
    pub passport_type_id: Option<i64>,
    pub subject: String,
    pub notes: Option<String>,
    pub status: SignupStatus,
    pub paid: bool,
    /// Set once a passport has been issued from this signup
    pub passport_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// A signup joined with its member and activity, as listed in the admin UI
#[derive(Debug, Clone, Serialize)]
pub struct SignupWithMember {
    #[serde(flatten)]
    pub signup: Signup,
    pub member_name: String,
    pub member_email: String,
    pub member_phone: Option<String>,
    pub activity_name: String,
}

/// Fields submitted on the public signup form
#[derive(Debug, Clone, Deserialize)]
pub struct NewSignup {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub passport_type_id: Option<i64>,
    pub notes: Option<String>,
}

/// Payment status for income records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IncomeStatus {
    #[default]
    Received,
    Pending,
}

impl IncomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Pending => "pending",
        }
    }
}

impl std::str::FromStr for IncomeStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "received" => Ok(Self::Received),
            "pending" => Ok(Self::Pending),
            _ => Err(format!("Unknown income status: {}", s)),
        }
    }
}

impl std::fmt::Display for IncomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment status for expense records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    #[default]
    Paid,
    Unpaid,
}

impl ExpenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Unpaid => "unpaid",
        }
    }
}

impl std::str::FromStr for ExpenseStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "paid" => Ok(Self::Paid),
            "unpaid" => Ok(Self::Unpaid),
            _ => Err(format!("Unknown expense status: {}", s)),
        }
    }
}

impl std::fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Income not tied to passport sales (sponsorships, bar revenue, grants)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Income {
    pub id: i64,
    pub activity_id: i64,
    pub date: NaiveDate,
    pub amount: f64,
    pub description: Option<String>,
    pub category: Option<String>,
    pub payment_status: IncomeStatus,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating or updating an income record
#[derive(Debug, Clone, Deserialize)]
pub struct NewIncome {
    pub date: NaiveDate,
    pub amount: f64,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub payment_status: IncomeStatus,
}

/// An activity expense (ice rental, referees, equipment)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub activity_id: i64,
    /// Bill date
    pub date: NaiveDate,
    pub amount: f64,
    pub description: Option<String>,
    pub category: Option<String>,
    pub payment_status: ExpenseStatus,
    /// When payment is due (used for AP fiscal bucketing of unpaid bills)
    pub due_date: Option<NaiveDate>,
    /// When payment was made or is scheduled
    pub payment_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating or updating an expense record
#[derive(Debug, Clone, Deserialize)]
pub struct NewExpense {
    pub date: NaiveDate,
    pub amount: f64,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub payment_status: ExpenseStatus,
    pub due_date: Option<NaiveDate>,
    pub payment_date: Option<NaiveDate>,
}

/// Outcome of matching one bank notification against unpaid passports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchResult {
    Matched,
    NoMatch,
}

impl MatchResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matched => "MATCHED",
            Self::NoMatch => "NO_MATCH",
        }
    }
}

impl std::str::FromStr for MatchResult {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "MATCHED" => Ok(Self::Matched),
            "NO_MATCH" => Ok(Self::NoMatch),
            _ => Err(format!("Unknown match result: {}", s)),
        }
    }
}

/// A processed e-transfer notification, matched or not
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EbankPayment {
    pub id: i64,
    pub received_at: DateTime<Utc>,
    pub from_email: Option<String>,
    pub subject: Option<String>,
    pub bank_name: Option<String>,
    pub bank_amount: Option<f64>,
    pub matched_passport_id: Option<i64>,
    pub matched_name: Option<String>,
    pub matched_amount: Option<f64>,
    pub name_score: i64,
    pub result: MatchResult,
    pub marked_paid: bool,
    pub note: Option<String>,
}

/// Result of an email delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmailResult {
    Sent,
    Failed,
}

impl EmailResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "SENT",
            Self::Failed => "FAILED",
        }
    }
}

impl std::str::FromStr for EmailResult {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "SENT" => Ok(Self::Sent),
            "FAILED" => Ok(Self::Failed),
            _ => Err(format!("Unknown email result: {}", s)),
        }
    }
}

/// A logged email delivery attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailLogEntry {
    pub id: i64,
    pub sent_at: DateTime<Utc>,
    pub to_email: String,
    pub subject: String,
    pub pass_code: Option<String>,
    pub template: Option<String>,
    pub context_json: Option<String>,
    pub result: EmailResult,
    pub error_message: Option<String>,
}

/// Full history of a pass: lifecycle events, uses, reminders, emails
#[derive(Debug, Clone, Serialize)]
pub struct PassHistory {
    pub passport: Passport,
    pub member: Member,
    pub activity_name: String,
    pub redemptions: Vec<Redemption>,
    pub reminders_sent: i64,
    pub emails: Vec<EmailLogEntry>,
}

/// One row of the monthly financial summary view
///
/// Cash columns reflect settled transactions; AR/AP columns reflect pending
/// obligations bucketed by their effective date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialSummaryRow {
    /// Fiscal month, "YYYY-MM"
    pub month: String,
    pub activity_id: i64,
    pub activity_name: String,
    pub passport_sales: f64,
    pub other_income: f64,
    pub cash_received: f64,
    pub cash_paid: f64,
    pub net_cash_flow: f64,
    pub passport_ar: f64,
    pub other_income_ar: f64,
    pub accounts_receivable: f64,
    pub accounts_payable: f64,
    pub total_revenue: f64,
    pub total_expenses: f64,
    pub net_income: f64,
}

/// Trend direction for a KPI card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

/// A monetary KPI card with a daily trend series
#[derive(Debug, Clone, Serialize)]
pub struct KpiCard {
    pub total: f64,
    pub period_value: f64,
    pub trend: TrendDirection,
    /// Period-over-period change, percent, one decimal
    pub percentage: f64,
    /// Exactly `period_days` points, oldest first
    pub trend_data: Vec<f64>,
}

/// A count KPI card with a daily trend series
#[derive(Debug, Clone, Serialize)]
pub struct CountKpiCard {
    pub total: i64,
    pub period_value: i64,
    pub trend: TrendDirection,
    pub percentage: f64,
    pub trend_data: Vec<i64>,
}

/// Unpaid passport KPI card
#[derive(Debug, Clone, Serialize)]
pub struct UnpaidKpiCard {
    pub total: i64,
    /// Unpaid passes older than the overdue threshold
    pub overdue: i64,
    pub trend: TrendDirection,
    pub percentage: f64,
    pub trend_data: Vec<i64>,
}

/// Profit KPI card
#[derive(Debug, Clone, Serialize)]
pub struct ProfitKpiCard {
    pub total: f64,
    pub margin: f64,
    pub trend: TrendDirection,
    pub percentage: f64,
    pub trend_data: Vec<f64>,
}

/// KPI dashboard payload for one activity
#[derive(Debug, Clone, Serialize)]
pub struct ActivityKpis {
    pub activity_id: i64,
    pub period_days: i64,
    pub revenue: KpiCard,
    pub active_passports: CountKpiCard,
    pub unpaid_passports: UnpaidKpiCard,
    pub profit: ProfitKpiCard,
}

/// Global dashboard totals across all activities
#[derive(Debug, Clone, Serialize)]
pub struct GlobalKpis {
    pub total_revenue: f64,
    pub active_passport_count: i64,
    pub unpaid_count: i64,
    pub unpaid_amount: f64,
    pub member_count: i64,
    pub activity_count: i64,
}

/// One activity's line on the global dashboard
#[derive(Debug, Clone, Serialize)]
pub struct ActivitySummary {
    pub activity: Activity,
    pub passport_count: i64,
    pub unpaid_count: i64,
    pub revenue: f64,
}

/// Survey lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SurveyStatus {
    #[default]
    Open,
    Closed,
}

impl SurveyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl std::str::FromStr for SurveyStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("Unknown survey status: {}", s)),
        }
    }
}

impl std::fmt::Display for SurveyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A survey question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyQuestion {
    pub id: String,
    pub text: String,
    /// "text", "rating" (1-5) or "choice"
    pub kind: String,
    #[serde(default)]
    pub options: Vec<String>,
}

/// A reusable set of survey questions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyTemplate {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub questions: Vec<SurveyQuestion>,
    pub created_at: DateTime<Utc>,
}

/// A survey instance sent to an activity's pass holders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Survey {
    pub id: i64,
    pub survey_token: String,
    pub activity_id: i64,
    pub template_id: i64,
    pub name: String,
    pub status: SurveyStatus,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// A submitted survey response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub id: i64,
    pub survey_id: i64,
    pub response_token: String,
    pub passport_id: Option<i64>,
    /// question id -> answer
    pub answers: serde_json::Map<String, serde_json::Value>,
    pub submitted_at: DateTime<Utc>,
}

/// Aggregated survey results
#[derive(Debug, Clone, Serialize)]
pub struct SurveyResults {
    pub survey: Survey,
    pub template: SurveyTemplate,
    pub response_count: i64,
    pub responses: Vec<SurveyResponse>,
}

/// A logged chatbot query
#[derive(Debug, Clone, Serialize)]
pub struct ChatQueryLogEntry {
    pub id: i64,
    pub asked_at: DateTime<Utc>,
    pub question: String,
    pub language: String,
    pub generated_sql: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
    pub row_count: i64,
    pub duration_ms: i64,
}
