//! Keyword matching for user listings.
//!
use crate::directory::UserRecord;

/// Case-insensitive substring match of `keyword` against the visible user fields.
/// An empty keyword matches everything.
pub fn user_matches(user: &UserRecord, keyword: &str) -> bool {
    let q = keyword.trim().to_lowercase();
    if q.is_empty() {
        return true;
    }
    user.first_name.to_lowercase().contains(&q)
        || user.last_name.to_lowercase().contains(&q)
        || user.full_name().to_lowercase().contains(&q)
        || user.user_type.to_lowercase().contains(&q)
        || user.department.to_lowercase().contains(&q)
        || user.email_address.to_lowercase().contains(&q)
        || user.role_names.iter().any(|r| r.to_lowercase().contains(&q))
        || user.id.to_string().contains(&q)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_user(id: i64, first: &str, last: &str, dept: &str, email: &str, roles: &[&str]) -> UserRecord {
        UserRecord {
            id,
            first_name: first.to_string(),
            last_name: last.to_string(),
            user_type: "Staff".to_string(),
            department: dept.to_string(),
            email_address: email.to_string(),
            is_active: true,
            role_names: roles.iter().map(|s| s.to_string()).collect(),
            group_path: None,
        }
    }

    #[test]
    fn keyword_filters_by_multiple_fields() {
        let users = vec![
            mk_user(1, "Alice", "Archer", "Pharmacy", "alice@example.com", &["Admin"]),
            mk_user(2, "Bob", "Tables", "Billing", "bobby@example.com", &["Auditor"]),
        ];
        let hits = |q: &str| users.iter().filter(|u| user_matches(u, q)).map(|u| u.id).collect::<Vec<_>>();
        assert_eq!(hits("bOb"), vec![2]);
        assert_eq!(hits("pharm"), vec![1]);
        assert_eq!(hits("auditor"), vec![2]);
        assert_eq!(hits("alice archer"), vec![1]);
    }

    #[test]
    fn empty_keyword_keeps_everyone() {
        let users = vec![
            mk_user(1, "Alice", "Archer", "Pharmacy", "alice@example.com", &[]),
            mk_user(2, "Bob", "Tables", "Billing", "bob@example.com", &[]),
        ];
        assert!(users.iter().all(|u| user_matches(u, "")));
        assert!(users.iter().all(|u| user_matches(u, "   ")));
        assert!(!users.iter().any(|u| user_matches(u, "zzz")));
    }
}
