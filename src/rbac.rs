//! Role grants for reference tables.
//!
//! A grant row says `user` may do `permission` on the resource
//! `(resource_type, resource_id)`. Both `resource_id` and `permission` accept
//! the `*` wildcard.

use rusqlite::Connection;
use serde::Serialize;

use crate::store::StoreResult;

pub const RESOURCE_TYPE_REFERENCE: &str = "REFERENCE";
pub const PERMISSION_CREATE: &str = "CREATE";
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceType {
    pub resource_type: &'static str,
    pub label_key: &'static str,
    pub permissions: &'static [PermissionDef],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionDef {
    pub key: &'static str,
    pub label_key: &'static str,
}

static REFERENCE_PERMISSIONS: [PermissionDef; 1] = [PermissionDef {
    key: PERMISSION_CREATE,
    label_key: "referencelist.permission.label.create",
}];

/// Every resource type the sidecar knows how to protect.
pub fn resource_types() -> Vec<ResourceType> {
    vec![ResourceType {
        resource_type: RESOURCE_TYPE_REFERENCE,
        label_key: "referencelist.rbac.resourceType.label",
        permissions: &REFERENCE_PERMISSIONS,
    }]
}

pub fn is_known_permission(resource_type: &str, permission: &str) -> bool {
    permission == WILDCARD
        || resource_types()
            .iter()
            .filter(|t| t.resource_type == resource_type)
            .any(|t| t.permissions.iter().any(|p| p.key == permission))
}

pub trait Authorizer {
    fn is_authorized(
        &self,
        resource_type: &str,
        resource_id: &str,
        permission: &str,
        user: Option<&str>,
    ) -> StoreResult<bool>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    pub user: String,
    pub resource_type: String,
    pub resource_id: String,
    pub permission: String,
}

pub struct GrantTable<'a> {
    conn: &'a Connection,
}

impl<'a> GrantTable<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Returns false when the grant already existed.
    pub fn grant(&self, g: &Grant) -> StoreResult<bool> {
        let n = self.conn.execute(
            "INSERT OR IGNORE INTO rbac_grants(user_login, resource_type, resource_id, permission)
             VALUES(?, ?, ?, ?)",
            (&g.user, &g.resource_type, &g.resource_id, &g.permission),
        )?;
        Ok(n > 0)
    }

    /// Returns false when there was nothing to revoke.
    pub fn revoke(&self, g: &Grant) -> StoreResult<bool> {
        let n = self.conn.execute(
            "DELETE FROM rbac_grants
             WHERE user_login = ? AND resource_type = ? AND resource_id = ? AND permission = ?",
            (&g.user, &g.resource_type, &g.resource_id, &g.permission),
        )?;
        Ok(n > 0)
    }

    pub fn list(&self, user: Option<&str>) -> StoreResult<Vec<Grant>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_login, resource_type, resource_id, permission
             FROM rbac_grants
             WHERE ?1 IS NULL OR user_login = ?1
             ORDER BY user_login, resource_type, resource_id, permission",
        )?;
        let rows = stmt
            .query_map([user], |r| {
                Ok(Grant {
                    user: r.get(0)?,
                    resource_type: r.get(1)?,
                    resource_id: r.get(2)?,
                    permission: r.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl Authorizer for GrantTable<'_> {
    fn is_authorized(
        &self,
        resource_type: &str,
        resource_id: &str,
        permission: &str,
        user: Option<&str>,
    ) -> StoreResult<bool> {
        let Some(user) = user else {
            return Ok(false);
        };
        let hits: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM rbac_grants
             WHERE user_login = ?1 AND resource_type = ?2
               AND resource_id IN (?3, '*')
               AND permission IN (?4, '*')",
            (user, resource_type, resource_id, permission),
            |r| r.get(0),
        )?;
        tracing::debug!(user, resource_type, resource_id, permission, granted = hits > 0, "rbac check");
        Ok(hits > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn grant(user: &str, id: &str, permission: &str) -> Grant {
        Grant {
            user: user.into(),
            resource_type: RESOURCE_TYPE_REFERENCE.into(),
            resource_id: id.into(),
            permission: permission.into(),
        }
    }

    #[test]
    fn no_user_is_never_authorized() {
        let conn = db::open_in_memory().expect("db");
        let rbac = GrantTable::new(&conn);
        rbac.grant(&grant("admin", WILDCARD, WILDCARD)).expect("grant");
        assert!(!rbac
            .is_authorized(RESOURCE_TYPE_REFERENCE, "1", PERMISSION_CREATE, None)
            .expect("check"));
    }

    #[test]
    fn exact_and_wildcard_grants() {
        let conn = db::open_in_memory().expect("db");
        let rbac = GrantTable::new(&conn);
        rbac.grant(&grant("ann", "1", PERMISSION_CREATE)).expect("grant");
        rbac.grant(&grant("bob", WILDCARD, PERMISSION_CREATE)).expect("grant");

        let check = |user: &str, id: &str| {
            rbac.is_authorized(RESOURCE_TYPE_REFERENCE, id, PERMISSION_CREATE, Some(user))
                .expect("check")
        };
        assert!(check("ann", "1"));
        assert!(!check("ann", "2"));
        assert!(check("bob", "2"));
        assert!(!check("carl", "1"));
    }

    #[test]
    fn revoke_removes_access_and_reports_noop() {
        let conn = db::open_in_memory().expect("db");
        let rbac = GrantTable::new(&conn);
        let g = grant("ann", "1", WILDCARD);
        assert!(rbac.grant(&g).expect("grant"));
        assert!(!rbac.grant(&g).expect("grant twice"));
        assert_eq!(rbac.list(Some("ann")).expect("list"), vec![g.clone()]);
        assert!(rbac.revoke(&g).expect("revoke"));
        assert!(!rbac.revoke(&g).expect("revoke twice"));
        assert!(!rbac
            .is_authorized(RESOURCE_TYPE_REFERENCE, "1", PERMISSION_CREATE, Some("ann"))
            .expect("check"));
    }

    #[test]
    fn registry_knows_reference_create() {
        assert!(is_known_permission(RESOURCE_TYPE_REFERENCE, PERMISSION_CREATE));
        assert!(is_known_permission(RESOURCE_TYPE_REFERENCE, WILDCARD));
        assert!(!is_known_permission(RESOURCE_TYPE_REFERENCE, "DELETE"));
        assert!(!is_known_permission("PAGE", PERMISSION_CREATE));
    }
}
