/// Case store
///
/// Cases are listed newest first with the client and the responsible
/// lawyer's profile embedded.

use super::{Collection, TenantResource};
use lexdesk_shared::backend::{Order, Query};
use lexdesk_shared::models::{Case, CasePatch, Client, NewCase, Profile};
use uuid::Uuid;

impl TenantResource for Case {
    type New = NewCase;
    type Patch = CasePatch;

    const TABLE: &'static str = Case::TABLE;

    fn list_query(organization_id: Uuid) -> Query {
        Query::table(Case::TABLE)
            .embed("client", Client::TABLE, "client_id")
            .embed("responsible_lawyer", Profile::TABLE, "responsible_lawyer_id")
            .eq("organization_id", organization_id)
            .order("created_at", Order::Desc)
    }

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Cases of the active organization
pub type CaseStore = Collection<Case>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query() {
        let org = Uuid::new_v4();
        let query = <Case as TenantResource>::list_query(org);

        assert_eq!(
            query.select_clause(),
            "*,client:clients(*),responsible_lawyer:profiles(*)"
        );
        assert_eq!(query.order, Some(("created_at".to_string(), Order::Desc)));
        assert_eq!(query.filters.len(), 1);
        assert_eq!(query.filters[0].value, org.to_string());
    }
}
