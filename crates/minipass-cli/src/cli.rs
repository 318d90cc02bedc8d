//! CLI argument definitions

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "minipass",
    about = "Minipass - activity pass manager",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Path to the database file
    #[arg(long, global = true, default_value = "minipass.db")]
    pub db: String,

    /// Open/create the database without encryption (not recommended for production)
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (local development only)
        #[arg(long)]
        no_auth: bool,

        /// Directory of static frontend files to serve
        #[arg(long)]
        static_dir: Option<String>,
    },

    /// Show database status and record counts
    Status,

    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },

    /// List activities
    Activities,

    /// Manage passports
    Passports {
        #[command(subcommand)]
        action: Option<PassportsAction>,
    },

    /// Manage signups
    Signups {
        #[command(subcommand)]
        action: Option<SignupsAction>,
    },

    /// Poll the inbox and match e-transfer payments once
    MatchPayments,

    /// Send unpaid-pass payment reminders
    Remind,

    /// Reports
    Report {
        #[command(subcommand)]
        report_type: ReportType,
    },

    /// Ask the analytics chatbot a question
    Chat {
        /// The question, in English or French
        question: String,
    },

    /// Export data
    Export {
        #[command(subcommand)]
        export_type: ExportType,
    },

    /// Restore a full backup
    Restore {
        /// Path to a .json.gz backup file
        file: String,

        /// Erase existing data before restoring
        #[arg(long)]
        clear: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum AdminAction {
    /// Create an admin account
    Add {
        email: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Password (falls back to MINIPASS_ADMIN_PASSWORD, then a prompt)
        #[arg(long)]
        password: Option<String>,
    },
    /// List admin accounts
    List,
}

#[derive(Subcommand)]
pub enum PassportsAction {
    /// List passports (default)
    List {
        /// Only unpaid passes
        #[arg(long)]
        unpaid: bool,

        /// Filter by activity id
        #[arg(long)]
        activity: Option<i64>,

        #[arg(long, default_value = "50")]
        limit: i64,
    },
    /// Create a passport
    Create {
        /// Holder name
        #[arg(long)]
        name: String,

        /// Holder email
        #[arg(long)]
        email: String,

        /// Activity id
        #[arg(long)]
        activity: i64,

        /// Sale amount
        #[arg(long, default_value = "50")]
        amount: f64,

        /// Sessions included
        #[arg(long, default_value = "4")]
        sessions: i64,

        /// Mark paid immediately
        #[arg(long)]
        paid: bool,
    },
    /// Show a pass and its history
    Show { pass_code: String },
    /// Mark a passport paid
    MarkPaid { id: i64 },
    /// Redeem one session of a pass
    Redeem { pass_code: String },
}

#[derive(Subcommand)]
pub enum SignupsAction {
    /// List signups (default)
    List {
        /// Filter by status (pending, approved, rejected)
        #[arg(long)]
        status: Option<String>,

        #[arg(long, default_value = "50")]
        limit: i64,
    },
    /// Approve a signup and issue its passport
    Approve { id: i64 },
}

#[derive(Subcommand)]
pub enum ReportType {
    /// Monthly financial summary (cash, AR/AP, net income)
    Summary {
        /// Narrow to one activity id
        #[arg(long)]
        activity: Option<i64>,

        /// Narrow to one calendar year
        #[arg(long)]
        year: Option<i32>,
    },
    /// Activity dashboard KPIs
    Kpis {
        /// Activity id
        activity: i64,

        /// Time window in days (7, 30, or 90)
        #[arg(long, default_value = "7")]
        period: i64,
    },
}

#[derive(Subcommand)]
pub enum ExportType {
    /// Export passports as CSV
    Passports {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Export signups as CSV
    Signups {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Write a gzipped full backup
    Full {
        /// Output file path
        #[arg(short, long)]
        output: String,
    },
}
