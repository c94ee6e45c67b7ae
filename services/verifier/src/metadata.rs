use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;
use world_id_proof_verify::{ActionResolver, AppRecord, ResolverError};

/// Fetches an active, non-archived app together with the named action and the usage of a
/// nullifier hash for it.
const FETCH_APP_ACTION: &str = r#"
query FetchAppAction($app_id: String!, $action: String!, $nullifier_hash: String!) {
  app(
    where: {
      id: { _eq: $app_id }
      status: { _eq: "active" }
      is_archived: { _eq: false }
    }
  ) {
    id
    is_staging
    engine
    actions(where: { action: { _eq: $action } }) {
      id
      action
      max_verifications
      external_nullifier
      status
      nullifiers(where: { nullifier_hash: { _eq: $nullifier_hash } }) {
        uses
        created_at
        nullifier_hash
      }
    }
  }
}
"#;

#[derive(Debug, Serialize)]
struct GraphqlRequest<'a, V> {
    query: &'a str,
    variables: V,
}

#[derive(Debug, Serialize)]
struct FetchAppActionVariables<'a> {
    app_id: &'a str,
    action: &'a str,
    nullifier_hash: &'a str,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct FetchAppActionData {
    app: Vec<AppRecord>,
}

/// [`ActionResolver`] backed by the metadata store's GraphQL API.
#[derive(Debug, Clone)]
pub struct GraphqlActionResolver {
    http: reqwest::Client,
    url: Url,
    token: Option<String>,
}

impl GraphqlActionResolver {
    pub fn new(url: Url, token: Option<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, url, token })
    }
}

#[async_trait]
impl ActionResolver for GraphqlActionResolver {
    async fn resolve(
        &self,
        app_id: &str,
        action: &str,
        nullifier_hash: &str,
    ) -> Result<Option<AppRecord>, ResolverError> {
        let mut request = self.http.post(self.url.clone()).json(&GraphqlRequest {
            query: FETCH_APP_ACTION,
            variables: FetchAppActionVariables {
                app_id,
                action,
                nullifier_hash,
            },
        });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(error) => format!("<failed to read response body: {error}>"),
            };
            return Err(ResolverError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body: GraphqlResponse<FetchAppActionData> = response.json().await?;
        if !body.errors.is_empty() {
            let messages: Vec<_> = body.errors.into_iter().map(|e| e.message).collect();
            return Err(ResolverError::Query(messages.join("; ")));
        }
        let data = body
            .data
            .ok_or_else(|| ResolverError::Query("response carries no data".to_string()))?;

        Ok(data.app.into_iter().next())
    }
}
