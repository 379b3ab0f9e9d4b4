//! Database layer tests

use std::time::Duration;

use super::*;
use crate::error::Error;
use crate::import::RawRow;
use crate::models::NodeKind;

fn test_user(db: &Database, email: &str) -> i64 {
    db.create_user(email, "$argon2id$stub").unwrap()
}

/// Build budget -> department -> project -> vendor and return all four ids.
fn seed_chain(db: &Database, user_id: i64) -> (i64, i64, i64, i64) {
    let budget = db.create_budget("City 2026", user_id).unwrap();
    let dept = db.create_department("Parks", budget.id).unwrap();
    let project = db.create_project("Playgrounds", dept.id).unwrap();
    let vendor = db.create_vendor("Acme Turf", project.id).unwrap();
    (budget.id, dept.id, project.id, vendor.id)
}

fn row(budget: &str, dept: &str, project: &str, vendor: &str, amount: f64) -> RawRow {
    RawRow {
        budget_name: budget.to_string(),
        department_name: dept.to_string(),
        project_name: project.to_string(),
        vendor_name: vendor.to_string(),
        amount,
        description: None,
    }
}

#[test]
fn test_throwaway_database_removes_its_file_on_drop() {
    let db = Database::in_memory().unwrap();
    let path = std::path::PathBuf::from(db.path());
    assert!(path.exists());

    drop(db);
    assert!(!path.exists());
}

// ========== Users ==========

#[test]
fn test_create_user_and_lookup() {
    let db = Database::in_memory().unwrap();

    let id = test_user(&db, "alice@example.com");
    let user = db.get_user(id).unwrap().unwrap();
    assert_eq!(user.email, "alice@example.com");

    let by_email = db.get_user_by_email("alice@example.com").unwrap().unwrap();
    assert_eq!(by_email.id, id);

    assert!(db.get_user_by_email("nobody@example.com").unwrap().is_none());
}

#[test]
fn test_duplicate_email_rejected() {
    let db = Database::in_memory().unwrap();

    test_user(&db, "alice@example.com");
    let err = db.create_user("alice@example.com", "hash").unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

// ========== Budgets and hierarchy CRUD ==========

#[test]
fn test_budget_crud() {
    let db = Database::in_memory().unwrap();
    let user = test_user(&db, "alice@example.com");

    let budget = db.create_budget("Operations", user).unwrap();
    assert_eq!(budget.name, "Operations");
    assert_eq!(budget.user_id, user);

    let renamed = db.update_budget(budget.id, "Ops 2026").unwrap();
    assert_eq!(renamed.name, "Ops 2026");

    assert_eq!(db.list_budgets(user).unwrap().len(), 1);

    db.delete_budget(budget.id).unwrap();
    assert!(db.get_budget(budget.id).unwrap().is_none());
}

#[test]
fn test_duplicate_budget_name_per_user_rejected() {
    let db = Database::in_memory().unwrap();
    let alice = test_user(&db, "alice@example.com");
    let bob = test_user(&db, "bob@example.com");

    db.create_budget("City 2026", alice).unwrap();
    assert!(db.create_budget("City 2026", alice).is_err());
    // Same name under a different owner is fine.
    db.create_budget("City 2026", bob).unwrap();
}

#[test]
fn test_rename_to_sibling_name_rejected_as_validation() {
    let db = Database::in_memory().unwrap();
    let alice = test_user(&db, "alice@example.com");

    let (_, dept, project, _) = seed_chain(&db, alice);
    let roads = db.create_budget("Roads", alice).unwrap();
    let err = db.update_budget(roads.id, "City 2026").unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let trails = db.create_project("Trails", dept).unwrap();
    let err = db.update_project(trails.id, "Playgrounds").unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    // The same name under a different parent is not a collision.
    let other_dept = db.create_department("Roads", roads.id).unwrap();
    let moved = db.create_project("Resurfacing", other_dept.id).unwrap();
    db.update_project(moved.id, "Playgrounds").unwrap();

    // Nothing was renamed by the rejected updates.
    assert_eq!(db.get_project(project).unwrap().unwrap().name, "Playgrounds");
    assert_eq!(db.get_budget(roads.id).unwrap().unwrap().name, "Roads");
}

#[test]
fn test_hierarchy_crud_and_owner_scoped_lists() {
    let db = Database::in_memory().unwrap();
    let alice = test_user(&db, "alice@example.com");
    let bob = test_user(&db, "bob@example.com");

    let (_, dept, project, vendor) = seed_chain(&db, alice);
    seed_chain(&db, bob);

    // Owner-scoped lists exclude the other user's identical tree.
    assert_eq!(db.list_departments(alice, None).unwrap().len(), 1);
    assert_eq!(db.list_projects(alice, Some(dept)).unwrap().len(), 1);
    assert_eq!(db.list_vendors(alice, Some(project)).unwrap().len(), 1);
    assert_eq!(db.list_vendors(alice, None).unwrap().len(), 1);

    let renamed = db.update_vendor(vendor, "Acme Surfaces").unwrap();
    assert_eq!(renamed.name, "Acme Surfaces");

    db.delete_vendor(vendor).unwrap();
    assert!(db.get_vendor(vendor).unwrap().is_none());
}

#[test]
fn test_budget_tree_nesting() {
    let db = Database::in_memory().unwrap();
    let user = test_user(&db, "alice@example.com");
    let (budget, dept, _, _) = seed_chain(&db, user);
    db.create_project("Trails", dept).unwrap();

    let tree = db.get_budget_tree(budget).unwrap().unwrap();
    assert_eq!(tree.departments.len(), 1);
    assert_eq!(tree.departments[0].projects.len(), 2);
    assert_eq!(tree.departments[0].projects[0].vendors.len(), 1);
}

// ========== Cascade deletion ==========

#[test]
fn test_budget_delete_cascades_through_subtree() {
    let db = Database::in_memory().unwrap();
    let user = test_user(&db, "alice@example.com");
    let (budget, dept, project, vendor) = seed_chain(&db, user);

    let tx = db
        .create_transaction(&NewTransaction {
            amount: 99.0,
            description: None,
            date: None,
            vendor_id: vendor,
        })
        .unwrap();
    db.create_feedback(budget, "looks good", Some(user)).unwrap();

    db.delete_budget(budget).unwrap();

    assert!(db.get_department(dept).unwrap().is_none());
    assert!(db.get_project(project).unwrap().is_none());
    assert!(db.get_vendor(vendor).unwrap().is_none());
    assert!(db.get_transaction(tx.id).unwrap().is_none());
    assert!(db.list_feedback(budget).unwrap().is_empty());
}

// ========== Transactions ==========

#[test]
fn test_transaction_crud() {
    let db = Database::in_memory().unwrap();
    let user = test_user(&db, "alice@example.com");
    let (_, _, _, vendor) = seed_chain(&db, user);

    let tx = db
        .create_transaction(&NewTransaction {
            amount: 150.0,
            description: Some("mulch".to_string()),
            date: None,
            vendor_id: vendor,
        })
        .unwrap();
    assert_eq!(tx.amount, 150.0);

    let updated = db.update_transaction(tx.id, 175.0, Some("mulch + delivery")).unwrap();
    assert_eq!(updated.amount, 175.0);

    assert_eq!(db.list_transactions(user, Some(vendor)).unwrap().len(), 1);

    db.delete_transaction(tx.id).unwrap();
    assert!(db.get_transaction(tx.id).unwrap().is_none());
}

#[test]
fn test_non_finite_amount_rejected() {
    let db = Database::in_memory().unwrap();
    let user = test_user(&db, "alice@example.com");
    let (_, _, _, vendor) = seed_chain(&db, user);

    let err = db
        .create_transaction(&NewTransaction {
            amount: f64::NAN,
            description: None,
            date: None,
            vendor_id: vendor,
        })
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

// ========== Ownership resolution ==========

#[test]
fn test_authorize_owner_allowed_at_every_level() {
    let db = Database::in_memory().unwrap();
    let alice = test_user(&db, "alice@example.com");
    let (budget, dept, project, vendor) = seed_chain(&db, alice);
    let tx = db
        .create_transaction(&NewTransaction {
            amount: 5.0,
            description: None,
            date: None,
            vendor_id: vendor,
        })
        .unwrap();

    for (kind, id) in [
        (NodeKind::Budget, budget),
        (NodeKind::Department, dept),
        (NodeKind::Project, project),
        (NodeKind::Vendor, vendor),
        (NodeKind::Transaction, tx.id),
    ] {
        let root = db.authorize(alice, kind, id).unwrap();
        assert_eq!(root.budget_id, budget);
        assert_eq!(root.user_id, alice);
    }
}

#[test]
fn test_authorize_non_owner_forbidden() {
    let db = Database::in_memory().unwrap();
    let alice = test_user(&db, "alice@example.com");
    let bob = test_user(&db, "bob@example.com");
    let (budget, _, _, vendor) = seed_chain(&db, alice);

    let err = db.authorize(bob, NodeKind::Budget, budget).unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    let err = db.authorize(bob, NodeKind::Vendor, vendor).unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
}

#[test]
fn test_authorize_missing_node_not_found() {
    let db = Database::in_memory().unwrap();
    let alice = test_user(&db, "alice@example.com");

    let err = db.authorize(alice, NodeKind::Transaction, 9999).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn test_broken_chain_resolves_to_not_found() {
    let db = Database::in_memory().unwrap();
    let alice = test_user(&db, "alice@example.com");

    // Force an orphan by suspending FK enforcement on this one connection.
    {
        let conn = db.conn().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = OFF;").unwrap();
        conn.execute(
            "INSERT INTO departments (id, name, budget_id) VALUES (777, 'Ghost', 424242)",
            [],
        )
        .unwrap();
    }

    assert!(db.budget_owner(NodeKind::Department, 777).unwrap().is_none());
    let err = db.authorize(alice, NodeKind::Department, 777).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

// ========== Bulk import reconciliation ==========

#[test]
fn test_import_builds_hierarchy_in_order() {
    let db = Database::in_memory().unwrap();
    let user = test_user(&db, "alice@example.com");

    let rows = vec![
        row("City 2026", "Parks", "Playgrounds", "Acme Turf", 100.0),
        // Same chain again: a later row must observe the earlier row's nodes.
        row("City 2026", "Parks", "Playgrounds", "Acme Turf", 50.0),
        row("City 2026", "Parks", "Trails", "Gravel Co", 75.0),
    ];

    let imported = db.import_rows(&rows, user, Duration::from_secs(30)).unwrap();
    assert_eq!(imported, 3);

    assert_eq!(db.list_budgets(user).unwrap().len(), 1);
    assert_eq!(db.list_departments(user, None).unwrap().len(), 1);
    assert_eq!(db.list_projects(user, None).unwrap().len(), 2);
    assert_eq!(db.list_vendors(user, None).unwrap().len(), 2);
    assert_eq!(db.list_transactions(user, None).unwrap().len(), 3);
}

#[test]
fn test_import_twice_dedupes_nodes_but_not_transactions() {
    let db = Database::in_memory().unwrap();
    let user = test_user(&db, "alice@example.com");

    let rows = vec![
        row("City 2026", "Parks", "Playgrounds", "Acme Turf", 100.0),
        row("City 2026", "Roads", "Paving", "Asphalt Inc", 500.0),
    ];

    db.import_rows(&rows, user, Duration::from_secs(30)).unwrap();
    db.import_rows(&rows, user, Duration::from_secs(30)).unwrap();

    // Internal nodes are idempotent; leaves always append.
    assert_eq!(db.list_budgets(user).unwrap().len(), 1);
    assert_eq!(db.list_departments(user, None).unwrap().len(), 2);
    assert_eq!(db.list_projects(user, None).unwrap().len(), 2);
    assert_eq!(db.list_vendors(user, None).unwrap().len(), 2);
    assert_eq!(db.list_transactions(user, None).unwrap().len(), 4);
}

#[test]
fn test_import_reuses_existing_nodes_created_via_api() {
    let db = Database::in_memory().unwrap();
    let user = test_user(&db, "alice@example.com");
    seed_chain(&db, user);

    let rows = vec![row("City 2026", "Parks", "Playgrounds", "Acme Turf", 25.0)];
    db.import_rows(&rows, user, Duration::from_secs(30)).unwrap();

    assert_eq!(db.list_vendors(user, None).unwrap().len(), 1);
    assert_eq!(db.list_transactions(user, None).unwrap().len(), 1);
}

#[test]
fn test_import_scopes_budgets_per_user() {
    let db = Database::in_memory().unwrap();
    let alice = test_user(&db, "alice@example.com");
    let bob = test_user(&db, "bob@example.com");

    let rows = vec![row("City 2026", "Parks", "Playgrounds", "Acme Turf", 10.0)];
    db.import_rows(&rows, alice, Duration::from_secs(30)).unwrap();
    db.import_rows(&rows, bob, Duration::from_secs(30)).unwrap();

    assert_eq!(db.list_budgets(alice).unwrap().len(), 1);
    assert_eq!(db.list_budgets(bob).unwrap().len(), 1);
    assert_eq!(db.list_transactions(alice, None).unwrap().len(), 1);
}

#[test]
fn test_import_deadline_rolls_back_everything() {
    let db = Database::in_memory().unwrap();
    let user = test_user(&db, "alice@example.com");

    let rows = vec![
        row("City 2026", "Parks", "Playgrounds", "Acme Turf", 100.0),
        row("City 2026", "Roads", "Paving", "Asphalt Inc", 500.0),
    ];

    // An already-expired budget aborts before the first row commits.
    let err = db.import_rows(&rows, user, Duration::ZERO).unwrap_err();
    assert!(matches!(err, Error::Import(_)));

    assert!(db.list_budgets(user).unwrap().is_empty());
    assert!(db.list_transactions(user, None).unwrap().is_empty());
}

// ========== Totals and feedback ==========

#[test]
fn test_budget_totals_sum_descendants() {
    let db = Database::in_memory().unwrap();
    let user = test_user(&db, "alice@example.com");
    let (budget, _, _, vendor) = seed_chain(&db, user);

    for amount in [100.0, 50.0, -20.0] {
        db.create_transaction(&NewTransaction {
            amount,
            description: None,
            date: None,
            vendor_id: vendor,
        })
        .unwrap();
    }

    // An empty budget still shows up with a zero total.
    db.create_budget("Empty", user).unwrap();

    let totals = db.budget_totals().unwrap();
    assert_eq!(totals.len(), 2);

    let main = totals.iter().find(|t| t.budget_id == budget).unwrap();
    assert!((main.total_amount - 130.0).abs() < 1e-9);
    assert_eq!(main.transaction_count, 3);

    let empty = totals.iter().find(|t| t.budget_id != budget).unwrap();
    assert_eq!(empty.total_amount, 0.0);
    assert_eq!(empty.transaction_count, 0);
}

#[test]
fn test_feedback_create_and_list() {
    let db = Database::in_memory().unwrap();
    let user = test_user(&db, "alice@example.com");
    let (budget, _, _, _) = seed_chain(&db, user);

    db.create_feedback(budget, "Great transparency", Some(user)).unwrap();
    db.create_feedback(budget, "Anonymous note", None).unwrap();

    let feedback = db.list_feedback(budget).unwrap();
    assert_eq!(feedback.len(), 2);
    assert!(feedback.iter().any(|f| f.user_id.is_none()));
}
