/// Client store

use super::{Collection, TenantResource};
use lexdesk_shared::backend::{Order, Query};
use lexdesk_shared::models::{Client, ClientPatch, NewClient};
use uuid::Uuid;

impl TenantResource for Client {
    type New = NewClient;
    type Patch = ClientPatch;

    const TABLE: &'static str = Client::TABLE;

    fn list_query(organization_id: Uuid) -> Query {
        Query::table(Client::TABLE)
            .eq("organization_id", organization_id)
            .order("created_at", Order::Desc)
    }

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Clients of the active organization, newest first
pub type ClientStore = Collection<Client>;
