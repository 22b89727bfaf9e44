/// Table query description
///
/// A [`Query`] names one table plus equality filters, an optional column
/// projection, embedded relations and an ordering. The REST backend renders
/// it to PostgREST query parameters; the in-memory backend evaluates it
/// directly.
///
/// # Example
///
/// ```
/// use lexdesk_shared::backend::query::{Order, Query};
///
/// let query = Query::table("cases")
///     .embed("client", "clients", "client_id")
///     .eq("organization_id", "7b0c...")
///     .order("created_at", Order::Desc);
///
/// assert_eq!(query.select_clause(), "*,client:clients(*)");
/// ```

use serde::{Deserialize, Serialize};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    pub fn as_str(&self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }
}

/// Equality filter `column = value`
///
/// Values are kept as their text form, which is how PostgREST receives them
/// and how the in-memory backend compares them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub value: String,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Filter {
            column: column.into(),
            value: value.to_string(),
        }
    }

    /// PostgREST parameter pair, e.g. `("organization_id", "eq.<uuid>")`
    pub fn to_param(&self) -> (String, String) {
        (self.column.clone(), format!("eq.{}", self.value))
    }
}

/// Relation embedded into each returned row under `alias`
///
/// The embedded row is the one in `table` whose `id` equals the value of
/// `foreign_key` in the parent row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub alias: String,
    pub table: String,
    pub foreign_key: String,
}

/// Read query against one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub table: String,

    /// Projected columns; `None` selects every column
    pub columns: Option<Vec<String>>,

    pub embeds: Vec<Embed>,

    pub filters: Vec<Filter>,

    pub order: Option<(String, Order)>,
}

impl Query {
    /// Starts a query selecting every column of `table`
    pub fn table(table: impl Into<String>) -> Self {
        Query {
            table: table.into(),
            columns: None,
            embeds: Vec::new(),
            filters: Vec::new(),
            order: None,
        }
    }

    /// Restricts the returned columns
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Embeds a related row
    pub fn embed(
        mut self,
        alias: impl Into<String>,
        table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.embeds.push(Embed {
            alias: alias.into(),
            table: table.into(),
            foreign_key: foreign_key.into(),
        });
        self
    }

    /// Adds an equality filter
    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push(Filter::eq(column, value));
        self
    }

    /// Sets the ordering
    pub fn order(mut self, column: impl Into<String>, direction: Order) -> Self {
        self.order = Some((column.into(), direction));
        self
    }

    /// PostgREST `select` clause: `*` or the column list, followed by
    /// `alias:table(*)` for every embed
    pub fn select_clause(&self) -> String {
        let mut parts: Vec<String> = match &self.columns {
            Some(columns) => columns.clone(),
            None => vec!["*".to_string()],
        };

        for embed in &self.embeds {
            parts.push(format!("{}:{}(*)", embed.alias, embed.table));
        }

        parts.join(",")
    }

    /// Full PostgREST parameter list for this query
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.select_clause())];
        params.extend(self.filters.iter().map(Filter::to_param));

        if let Some((column, direction)) = &self.order {
            params.push(("order".to_string(), format!("{}.{}", column, direction.as_str())));
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_all_by_default() {
        let query = Query::table("clients");
        assert_eq!(query.select_clause(), "*");
        assert_eq!(query.to_params(), vec![("select".to_string(), "*".to_string())]);
    }

    #[test]
    fn test_columns_and_embeds() {
        let query = Query::table("organization_members")
            .columns(&["id", "role"])
            .embed("organization", "organizations", "organization_id");
        assert_eq!(query.select_clause(), "id,role,organization:organizations(*)");
    }

    #[test]
    fn test_params_include_filters_and_order() {
        let query = Query::table("cases")
            .embed("client", "clients", "client_id")
            .embed("responsible_lawyer", "profiles", "responsible_lawyer_id")
            .eq("organization_id", "org-1")
            .order("created_at", Order::Desc);

        assert_eq!(
            query.to_params(),
            vec![
                (
                    "select".to_string(),
                    "*,client:clients(*),responsible_lawyer:profiles(*)".to_string()
                ),
                ("organization_id".to_string(), "eq.org-1".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
            ]
        );
    }
}
