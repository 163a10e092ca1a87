//! Idempotent role and permission seeding, run at startup.

use tracing::info;

use warden_auth::{Permission, Role, RoleClaim, RoleRecord, RoleStore, StoreError};

/// What a seeding pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub roles_created: usize,
    pub claims_added: usize,
}

/// `Admin` holds every permission; `User` can view users, feature X and report B.
pub fn default_role_grants() -> Vec<(Role, Vec<Permission>)> {
    vec![
        (Role::ADMIN, Permission::ALL.to_vec()),
        (
            Role::USER,
            vec![
                Permission::ViewUsers,
                Permission::ViewFeatureX,
                Permission::ViewReportB,
            ],
        ),
    ]
}

async fn ensure_role(store: &dyn RoleStore, name: &Role) -> Result<(RoleRecord, bool), StoreError> {
    if let Some(existing) = store.find_role_by_name(name).await? {
        return Ok((existing, false));
    }
    match store.create_role(name).await {
        Ok(record) => Ok((record, true)),
        // Another instance created it first.
        Err(StoreError::Conflict(_)) => store
            .find_role_by_name(name)
            .await?
            .map(|r| (r, false))
            .ok_or_else(|| StoreError::NotFound(format!("role '{name}'"))),
        Err(e) => Err(e),
    }
}

/// Create missing roles and grant missing permissions. Never duplicates a claim.
pub async fn seed_roles(
    store: &dyn RoleStore,
    grants: &[(Role, Vec<Permission>)],
) -> Result<SeedReport, StoreError> {
    let mut report = SeedReport::default();

    for (name, permissions) in grants {
        let (role, created) = ensure_role(store, name).await?;
        if created {
            report.roles_created += 1;
            info!(role = %name, "created role");
        }

        let existing = store.role_claims(role.id).await?;
        for permission in permissions {
            let claim = RoleClaim::permission(*permission);
            if existing.contains(&claim) {
                continue;
            }
            store.add_role_claim(role.id, claim).await?;
            report.claims_added += 1;
            info!(role = %name, permission = %permission, "granted permission to role");
        }
    }

    info!(
        roles_created = report.roles_created,
        claims_added = report.claims_added,
        "role seeding complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryIdentityStore;
    use std::sync::Arc;
    use warden_auth::ClaimsAggregator;

    #[tokio::test]
    async fn seeds_admin_and_user_once() {
        let store = InMemoryIdentityStore::new();

        let first = seed_roles(&store, &default_role_grants()).await.unwrap();
        assert_eq!(first, SeedReport { roles_created: 2, claims_added: 11 });

        let second = seed_roles(&store, &default_role_grants()).await.unwrap();
        assert_eq!(second, SeedReport::default());

        let admin = store.find_role_by_name(&Role::ADMIN).await.unwrap().unwrap();
        assert_eq!(store.role_claims(admin.id).await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn seeded_roles_drive_the_aggregator() {
        let store = Arc::new(InMemoryIdentityStore::new());
        seed_roles(store.as_ref(), &default_role_grants()).await.unwrap();

        let aggregator = ClaimsAggregator::new(store);
        let user = aggregator.resolve_permissions(&[Role::USER]).await.unwrap();
        assert_eq!(
            user.into_iter().collect::<Vec<_>>(),
            vec![Permission::ViewUsers, Permission::ViewFeatureX, Permission::ViewReportB]
        );
    }

    #[tokio::test]
    async fn tops_up_a_partially_seeded_role() {
        let store = InMemoryIdentityStore::new();
        let user = store.create_role(&Role::USER).await.unwrap();
        store
            .add_role_claim(user.id, RoleClaim::permission(Permission::ViewUsers))
            .await
            .unwrap();

        let report = seed_roles(&store, &default_role_grants()).await.unwrap();
        assert_eq!(report, SeedReport { roles_created: 1, claims_added: 10 });
        assert_eq!(store.role_claims(user.id).await.unwrap().len(), 3);
    }
}
