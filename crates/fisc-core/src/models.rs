//! Domain models for fisc
//!
//! The hierarchy is Budget -> Department -> Project -> Vendor -> Transaction.
//! Every node below a budget carries exactly one parent id; the budget at the
//! root of the chain carries the owning user id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user. Root of ownership for budgets.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    /// Argon2 hash, never serialized to API responses.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A budget, owned exclusively by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub name: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A department within a budget. (name, budget_id) is a natural key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub budget_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A project within a department. (name, department_id) is a natural key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub department_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A vendor within a project. (name, project_id) is a natural key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vendor {
    pub id: i64,
    pub name: String,
    pub project_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A transaction, the leaf of the hierarchy.
///
/// Amount sign is meaningful (negative amounts are refunds). AI-derived
/// anomaly annotations are never stored here; they are attached to the
/// create-transaction response envelope only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub amount: f64,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub vendor_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Free-text feedback attached to a budget. Not part of the ownership
/// chain used for authorization.
#[derive(Debug, Clone, Serialize)]
pub struct Feedback {
    pub id: i64,
    pub message: String,
    pub user_id: Option<i64>,
    pub budget_id: i64,
    pub created_at: DateTime<Utc>,
}

/// The kind of hierarchy node being authorized or mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Budget,
    Department,
    Project,
    Vendor,
    Transaction,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Budget => "budget",
            Self::Department => "department",
            Self::Project => "project",
            Self::Vendor => "vendor",
            Self::Transaction => "transaction",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A budget with its nested hierarchy, as returned by `GET /budgets/:id`.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetTree {
    #[serde(flatten)]
    pub budget: Budget,
    pub departments: Vec<DepartmentTree>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepartmentTree {
    #[serde(flatten)]
    pub department: Department,
    pub projects: Vec<ProjectTree>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectTree {
    #[serde(flatten)]
    pub project: Project,
    pub vendors: Vec<Vendor>,
}

/// Per-budget spending total, summed over all descendant transactions.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BudgetTotal {
    pub budget_id: i64,
    pub name: String,
    pub user_id: i64,
    pub total_amount: f64,
    pub transaction_count: i64,
}
