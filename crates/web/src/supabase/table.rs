//! Table API queries (PostgREST-style REST over the project's tables).
//!
//! Filters are encoded as `column=op.value` query parameters; relationship
//! embeds ride along in the `select` clause. Reads run as the client's key
//! unless a per-request bearer token is set, in which case row policies are
//! enforced against that user.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use super::{SupabaseClient, SupabaseError, check_status, read_json};

/// A builder for one request against one table.
#[must_use]
pub struct TableQuery {
    client: SupabaseClient,
    table: String,
    select: Option<String>,
    filters: Vec<(String, String)>,
    orders: Vec<String>,
    limit: Option<u32>,
    bearer: Option<String>,
}

impl TableQuery {
    pub(super) fn new(client: SupabaseClient, table: &str) -> Self {
        Self {
            client,
            table: table.to_string(),
            select: None,
            filters: Vec::new(),
            orders: Vec::new(),
            limit: None,
            bearer: None,
        }
    }

    /// Columns (and relationship embeds) to return.
    pub fn select(mut self, columns: &str) -> Self {
        self.select = Some(columns.to_string());
        self
    }

    /// Equality filter: `column = value`.
    pub fn eq(mut self, column: &str, value: impl std::fmt::Display) -> Self {
        self.filters.push((column.to_string(), format!("eq.{value}")));
        self
    }

    /// Case-insensitive substring match on `column`.
    pub fn ilike(mut self, column: &str, needle: &str) -> Self {
        self.filters
            .push((column.to_string(), format!("ilike.*{needle}*")));
        self
    }

    /// Membership filter: `column` in `values`. An empty list matches no rows.
    pub fn in_list<T: std::fmt::Display>(mut self, column: &str, values: &[T]) -> Self {
        let list = values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.filters
            .push((column.to_string(), format!("in.({list})")));
        self
    }

    /// Sort descending by `column`.
    pub fn order_desc(mut self, column: &str) -> Self {
        self.orders.push(format!("{column}.desc"));
        self
    }

    /// Sort ascending by `column`.
    pub fn order_asc(mut self, column: &str) -> Self {
        self.orders.push(format!("{column}.asc"));
        self
    }

    /// Cap the number of returned rows.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Run this request as the given user's access token so the platform
    /// enforces row policies against them.
    pub fn bearer(mut self, access_token: &str) -> Self {
        self.bearer = Some(access_token.to_string());
        self
    }

    fn url(&self) -> Result<Url, SupabaseError> {
        let mut url = self.client.endpoint(&format!("rest/v1/{}", self.table))?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(select) = &self.select {
                pairs.append_pair("select", select);
            }
            for (column, predicate) in &self.filters {
                pairs.append_pair(column, predicate);
            }
            if !self.orders.is_empty() {
                pairs.append_pair("order", &self.orders.join(","));
            }
            if let Some(limit) = self.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
        }
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let token = self
            .bearer
            .as_deref()
            .unwrap_or_else(|| self.client.api_key());
        self.client
            .http()
            .request(method, url)
            .header("apikey", self.client.api_key())
            .bearer_auth(token)
    }

    /// Fetch all matching rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the rows do not deserialize.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn fetch<T: DeserializeOwned>(self) -> Result<Vec<T>, SupabaseError> {
        let url = self.url()?;
        let response = self.request(reqwest::Method::GET, url).send().await?;
        read_json(response, "table fetch").await
    }

    /// Fetch the first matching row, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the row does not deserialize.
    pub async fn fetch_optional<T: DeserializeOwned>(self) -> Result<Option<T>, SupabaseError> {
        let rows: Vec<T> = self.limit(1).fetch().await?;
        Ok(rows.into_iter().next())
    }

    /// Fetch exactly one row.
    ///
    /// # Errors
    ///
    /// Returns `SupabaseError::NotFound` if no row matches.
    pub async fn fetch_one<T: DeserializeOwned>(self) -> Result<T, SupabaseError> {
        let table = self.table.clone();
        self.fetch_optional()
            .await?
            .ok_or_else(|| SupabaseError::NotFound(format!("{table} row")))
    }

    /// Insert one row (or several), discarding the representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform rejects the write.
    #[instrument(skip(self, body), fields(table = %self.table))]
    pub async fn insert<B: Serialize + Sync>(self, body: &B) -> Result<(), SupabaseError> {
        let url = self.url()?;
        let response = self
            .request(reqwest::Method::POST, url)
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        check_status(response, "table insert").await
    }

    /// Insert one row and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform rejects the write or returns no row.
    #[instrument(skip(self, body), fields(table = %self.table))]
    pub async fn insert_returning<T: DeserializeOwned, B: Serialize + Sync>(
        self,
        body: &B,
    ) -> Result<T, SupabaseError> {
        let url = self.url()?;
        let response = self
            .request(reqwest::Method::POST, url)
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let mut rows: Vec<T> = read_json(response, "table insert").await?;
        rows.pop()
            .ok_or_else(|| SupabaseError::Invalid("insert returned no rows".to_string()))
    }

    /// Insert-or-update keyed on the table's unique constraints.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform rejects the write.
    #[instrument(skip(self, body), fields(table = %self.table))]
    pub async fn upsert<B: Serialize + Sync>(self, body: &B) -> Result<(), SupabaseError> {
        let url = self.url()?;
        let response = self
            .request(reqwest::Method::POST, url)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(body)
            .send()
            .await?;
        check_status(response, "table upsert").await
    }

    /// Update all matching rows.
    ///
    /// # Errors
    ///
    /// Refuses to run without at least one filter; otherwise errors if the
    /// platform rejects the write.
    #[instrument(skip(self, body), fields(table = %self.table))]
    pub async fn update<B: Serialize + Sync>(self, body: &B) -> Result<(), SupabaseError> {
        if self.filters.is_empty() {
            return Err(SupabaseError::Invalid(format!(
                "refusing unfiltered update of {}",
                self.table
            )));
        }
        let url = self.url()?;
        let response = self
            .request(reqwest::Method::PATCH, url)
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        check_status(response, "table update").await
    }

    /// Delete all matching rows.
    ///
    /// # Errors
    ///
    /// Refuses to run without at least one filter; otherwise errors if the
    /// platform rejects the write.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn delete(self) -> Result<(), SupabaseError> {
        if self.filters.is_empty() {
            return Err(SupabaseError::Invalid(format!(
                "refusing unfiltered delete of {}",
                self.table
            )));
        }
        let url = self.url()?;
        let response = self.request(reqwest::Method::DELETE, url).send().await?;
        check_status(response, "table delete").await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::config::SupabaseConfig;

    fn client() -> SupabaseClient {
        SupabaseClient::new(&SupabaseConfig {
            url: "https://demo.supabase.co".parse().unwrap(),
            anon_key: "anon".to_string(),
            service_role_key: SecretString::from("service"),
        })
    }

    fn pairs(url: &Url) -> Vec<(String, String)> {
        url.query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn builds_select_with_filters_and_order() {
        let query = client()
            .table("posts")
            .select("*,likes(count)")
            .eq("user_id", "abc")
            .order_desc("created_at")
            .limit(20);
        let url = query.url().unwrap();

        assert_eq!(url.path(), "/rest/v1/posts");
        assert_eq!(
            pairs(&url),
            vec![
                ("select".to_string(), "*,likes(count)".to_string()),
                ("user_id".to_string(), "eq.abc".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
                ("limit".to_string(), "20".to_string()),
            ]
        );
    }

    #[test]
    fn in_list_joins_values() {
        let query = client().table("posts").in_list("user_id", &["a", "b"]);
        let url = query.url().unwrap();
        assert!(
            pairs(&url).contains(&("user_id".to_string(), "in.(a,b)".to_string())),
            "got {:?}",
            pairs(&url)
        );
    }

    #[test]
    fn in_list_empty_matches_nothing() {
        let query = client().table("posts").in_list::<&str>("user_id", &[]);
        let url = query.url().unwrap();
        assert!(pairs(&url).contains(&("user_id".to_string(), "in.()".to_string())));
    }

    #[test]
    fn ilike_wraps_needle_in_wildcards() {
        let query = client().table("restaurants").ilike("name", "pizza");
        let url = query.url().unwrap();
        assert!(pairs(&url).contains(&("name".to_string(), "ilike.*pizza*".to_string())));
    }

    #[tokio::test]
    async fn update_without_filters_is_refused() {
        let result = client()
            .table("posts")
            .update(&serde_json::json!({"content": "x"}))
            .await;
        assert!(matches!(result, Err(SupabaseError::Invalid(_))));
    }

    #[tokio::test]
    async fn delete_without_filters_is_refused() {
        let result = client().table("posts").delete().await;
        assert!(matches!(result, Err(SupabaseError::Invalid(_))));
    }
}
