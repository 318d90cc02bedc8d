//! Semantic glossary: business terms to schema context hints
//!
//! The SQL model doesn't know that "revenue" means paid passport sales plus
//! received income, or that "inscriptions" is the signups table. Matching
//! terms contribute context hints that are prepended to the generation
//! prompt; the question itself is never rewritten.

/// A glossary entry: matching terms and the hint they contribute
struct GlossaryEntry {
    terms: &'static [&'static str],
    hint: &'static str,
}

const GLOSSARY: &[GlossaryEntry] = &[
    // Financial formulas. These must use all the right sources: revenue is
    // passport sales plus other income, never passport_types.price_per_user.
    GlossaryEntry {
        terms: &["cash flow", "flux de trésorerie", "flux de tresorerie"],
        hint: "Net cash flow = SUM(passports.sold_amt WHERE paid=1) + \
               SUM(incomes.amount WHERE payment_status='received') - \
               SUM(expenses.amount WHERE payment_status='paid'). \
               The monthly_financial_summary view has this precomputed per month.",
    },
    GlossaryEntry {
        terms: &["revenue", "revenu", "revenus", "income", "sales", "ventes"],
        hint: "Total revenue = SUM(passports.sold_amt WHERE paid=1) + \
               SUM(incomes.amount WHERE payment_status='received'). \
               Use passports.sold_amt for actual revenue, not passport_types.price_per_user.",
    },
    GlossaryEntry {
        terms: &["profit", "net income", "bénéfice", "benefice"],
        hint: "Net income = total revenue - total expenses; the \
               monthly_financial_summary view exposes net_income per month and activity.",
    },
    // French table names
    GlossaryEntry {
        terms: &[
            "utilisateurs",
            "utilisateur",
            "clients",
            "client",
            "customers",
            "participants",
            "membres",
            "members",
        ],
        hint: "People are rows in the members table (name, email, phone); \
               join through passports.member_id or signups.member_id.",
    },
    GlossaryEntry {
        terms: &["activités", "activité", "activite", "activites", "events"],
        hint: "Activities live in the activities table; passports.activity_id joins to it.",
    },
    GlossaryEntry {
        terms: &["passeports", "passeport", "passes", "pass"],
        hint: "Passes are rows in the passports table; sold_amt is the sale price, \
               uses_remaining the sessions left, paid the payment flag.",
    },
    GlossaryEntry {
        terms: &["inscriptions", "inscription", "signups", "signup"],
        hint: "Registrations are rows in the signups table (status: pending/approved/rejected).",
    },
    GlossaryEntry {
        terms: &["sondages", "sondage", "surveys", "survey"],
        hint: "Surveys are in the surveys table; responses in survey_responses.",
    },
    // Payment status phrasing
    GlossaryEntry {
        terms: &[
            "unpaid",
            "non payé",
            "non paye",
            "not paid",
            "impayé",
            "impaye",
            "owing",
        ],
        hint: "Unpaid passes: passports.paid = 0. Unpaid bills: \
               expenses.payment_status = 'unpaid'.",
    },
];

/// Time-period phrases and their SQLite date filters
const TIME_HINTS: &[(&[&str], &str)] = &[
    (
        &["this month", "ce mois"],
        "Filter by: DATE(created_at) >= DATE('now', 'start of month')",
    ),
    (
        &["last month", "mois dernier", "le mois dernier"],
        "Filter by: DATE(created_at) >= DATE('now', 'start of month', '-1 month') \
         AND DATE(created_at) < DATE('now', 'start of month')",
    ),
    (
        &["this week", "cette semaine"],
        "Filter by: DATE(created_at) >= DATE('now', 'start of day', '-' || \
         CAST(strftime('%w', 'now') AS INTEGER) || ' days')",
    ),
    (
        &["this year", "cette année", "cette annee"],
        "Filter by: DATE(created_at) >= DATE('now', 'start of year')",
    ),
    (
        &["today", "aujourd'hui", "aujourdhui"],
        "Filter by: DATE(created_at) = DATE('now')",
    ),
];

/// Collect context hints for a question
///
/// Hints are deduplicated and ordered glossary-first, time-period last.
pub fn context_hints(question: &str) -> Vec<String> {
    let lowered = question.to_lowercase();
    let mut hints: Vec<String> = Vec::new();

    for entry in GLOSSARY {
        if entry.terms.iter().any(|term| lowered.contains(term)) {
            let hint = entry.hint.to_string();
            if !hints.contains(&hint) {
                hints.push(hint);
            }
        }
    }

    for (terms, hint) in TIME_HINTS {
        if terms.iter().any(|term| lowered.contains(term)) {
            hints.push(hint.to_string());
            break;
        }
    }

    hints
}
