//! Claims aggregation: role names → effective permission set.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::permissions::Permission;
use crate::roles::Role;
use crate::store::{RoleStore, StoreError};

/// Resolves the deduplicated permission set granted by a group of roles.
///
/// Read-only; safe to share across concurrent requests.
#[derive(Clone)]
pub struct ClaimsAggregator {
    roles: Arc<dyn RoleStore>,
}

impl ClaimsAggregator {
    pub fn new(roles: Arc<dyn RoleStore>) -> Self {
        Self { roles }
    }

    /// Union of the permission claims attached to each named role.
    ///
    /// Unknown role names contribute nothing. Non-permission claims are
    /// ignored. Storage failures propagate.
    pub async fn resolve_permissions<'a, I>(
        &self,
        role_names: I,
    ) -> Result<BTreeSet<Permission>, StoreError>
    where
        I: IntoIterator<Item = &'a Role>,
    {
        let unique: BTreeSet<&Role> = role_names.into_iter().collect();
        let mut permissions = BTreeSet::new();

        for name in unique {
            let Some(role) = self.roles.find_role_by_name(name).await? else {
                debug!(role = %name, "role not found; contributes no permissions");
                continue;
            };

            for claim in self.roles.role_claims(role.id).await? {
                if let Some(permission) = claim.as_permission() {
                    permissions.insert(permission);
                }
            }
        }

        Ok(permissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryRoles, seeded_roles};
    use proptest::prelude::*;

    #[tokio::test]
    async fn admin_and_user_resolve_to_six_distinct_permissions() {
        let aggregator = ClaimsAggregator::new(seeded_roles().await);

        let resolved = aggregator
            .resolve_permissions(&[Role::ADMIN, Role::USER])
            .await
            .unwrap();

        let expected: BTreeSet<Permission> = [
            Permission::ViewUsers,
            Permission::CreateUsers,
            Permission::EditUsers,
            Permission::DeleteUsers,
            Permission::ViewFeatureX,
            Permission::ViewReportB,
        ]
        .into_iter()
        .collect();
        assert_eq!(resolved, expected);
    }

    #[tokio::test]
    async fn unknown_role_yields_empty_set() {
        let aggregator = ClaimsAggregator::new(seeded_roles().await);

        let resolved = aggregator
            .resolve_permissions(&[Role::new("Ghost")])
            .await
            .unwrap();
        assert!(resolved.is_empty());
    }

    #[tokio::test]
    async fn unknown_role_does_not_hide_known_roles() {
        let aggregator = ClaimsAggregator::new(seeded_roles().await);

        let resolved = aggregator
            .resolve_permissions(&[Role::new("Ghost"), Role::USER])
            .await
            .unwrap();
        assert_eq!(resolved.len(), 3);
        assert!(resolved.contains(&Permission::ViewReportB));
    }

    #[tokio::test]
    async fn non_permission_claims_are_ignored() {
        let store = MemoryRoles::default();
        let role = store.create_role(&Role::new("Ops")).await.unwrap();
        store
            .add_role_claim(role.id, crate::RoleClaim::new("department", "ops").unwrap())
            .await
            .unwrap();
        store
            .add_role_claim(role.id, crate::RoleClaim::permission(Permission::ManageFeatureX))
            .await
            .unwrap();

        let aggregator = ClaimsAggregator::new(Arc::new(store));
        let resolved = aggregator
            .resolve_permissions(&[Role::new("Ops")])
            .await
            .unwrap();
        assert_eq!(resolved.into_iter().collect::<Vec<_>>(), vec![Permission::ManageFeatureX]);
    }

    #[tokio::test]
    async fn storage_failure_propagates() {
        let store = MemoryRoles::default();
        store.fail_lookups();
        let aggregator = ClaimsAggregator::new(Arc::new(store));

        let err = aggregator.resolve_permissions(&[Role::ADMIN]).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    fn role_name() -> impl Strategy<Value = Role> {
        prop_oneof![
            Just(Role::ADMIN),
            Just(Role::USER),
            Just(Role::new("Ghost")),
            Just(Role::new("Auditor")),
        ]
    }

    proptest! {
        #[test]
        fn resolution_ignores_order_and_duplicates(
            names in proptest::collection::vec(role_name(), 0..8),
            seed in any::<u64>(),
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let aggregator = ClaimsAggregator::new(seeded_roles().await);

                let mut shuffled = names.clone();
                let len = shuffled.len().max(1);
                shuffled.rotate_left((seed as usize) % len);
                shuffled.extend(names.iter().cloned());

                let a = aggregator.resolve_permissions(&names).await.unwrap();
                let b = aggregator.resolve_permissions(&shuffled).await.unwrap();
                prop_assert_eq!(&a, &b);

                // Never more than the union of what the named roles carry.
                let mut union = BTreeSet::new();
                for name in &names {
                    union.extend(aggregator.resolve_permissions([name]).await.unwrap());
                }
                prop_assert_eq!(a, union);
                Ok(())
            })?;
        }
    }
}
