//! REST client for the Mem0 memory service.
//!
//! Every operation goes through [`MemoryClient::fetch`], which owns the
//! response contract: non-success statuses become [`Mem0Error::Api`] with the
//! body verbatim, an empty success body becomes `{}`, and a body that is not
//! JSON is returned as a JSON string.
//!
//! Ids, entity names and project ids always travel as single percent-encoded
//! path segments.

use crate::config::{DEFAULT_BASE_URL, Mem0Config};
use crate::error::{Mem0Error, Result};
use crate::identity::{Identity, IdentityState};
use crate::scope::ProjectScope;
use crate::telemetry::{NoopTelemetry, Telemetry, TelemetryEvent};
use crate::types::{
    ApiVersion, BatchMemoryUpdate, DeleteUserRequest, DeleteUsersRequest, Entity,
    FeedbackRequest, MemoryExportQuery, MemoryExportRequest, MemoryOptions, MemoryUpdateRequest,
    Message, ProjectUpdate, WebhookCreate, WebhookUpdate,
};
use crate::utils::{non_blank, query_value, sha256};
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Map, Value, json};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

#[derive(Clone, Default)]
pub struct ClientOptions {
    pub api_key: Option<String>,
    pub host: Option<String>,
    pub organization_name: Option<String>,
    pub project_name: Option<String>,
    pub organization_id: Option<String>,
    pub project_id: Option<String>,
    pub telemetry: Option<Arc<dyn Telemetry>>,
}

impl ClientOptions {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn with_project_ids(mut self, org_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        self.organization_id = Some(org_id.into());
        self.project_id = Some(project_id.into());
        self
    }

    #[must_use]
    pub fn with_project_names(
        mut self,
        org_name: impl Into<String>,
        project_name: impl Into<String>,
    ) -> Self {
        self.organization_name = Some(org_name.into());
        self.project_name = Some(project_name.into());
        self
    }

    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    #[must_use]
    pub fn from_config(config: &Mem0Config) -> Self {
        Self {
            api_key: config.api_key.clone(),
            host: Some(config.base_url.clone()),
            organization_name: config.organization_name.clone(),
            project_name: config.project_name.clone(),
            organization_id: config.organization_id.clone(),
            project_id: config.project_id.clone(),
            telemetry: None,
        }
    }
}

pub struct MemoryClient {
    http: reqwest::Client,
    api_key: String,
    host: String,
    base: Url,
    headers: HeaderMap,
    scope: ProjectScope,
    telemetry: Arc<dyn Telemetry>,
    telemetry_id: String,
    identity: IdentityState,
}

impl Debug for MemoryClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryClient")
            .field("host", &self.host)
            .field("scope", &self.scope)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

fn auth_header(api_key: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(&format!("Token {api_key}"))
        .map_err(|_| Mem0Error::validation("Mem0 API key contains characters not allowed in a header"))
}

fn parse_body(text: &str) -> Value {
    if text.is_empty() {
        return Value::Object(Map::new());
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn encode_query(params: &Map<String, Value>) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        if let Some(value) = query_value(value) {
            serializer.append_pair(key, &value);
        }
    }
    serializer.finish()
}

fn join_query(parts: &[Option<String>]) -> String {
    parts
        .iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("&")
}

fn entities_from_response(response: &Value) -> Result<Vec<Entity>> {
    let results = response
        .get("results")
        .ok_or_else(|| Mem0Error::InvalidResponse("entities response has no results list".to_string()))?;
    serde_json::from_value(results.clone())
        .map_err(|error| Mem0Error::InvalidResponse(format!("malformed entity list: {error}")))
}

fn is_missing(value: Option<&Value>) -> bool {
    value.is_none_or(Value::is_null)
}

impl MemoryClient {
    pub fn new(options: ClientOptions) -> Result<Self> {
        let api_key = non_blank(options.api_key).ok_or(Mem0Error::MissingApiKey)?;
        let host = non_blank(options.host)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let base = Url::parse(&host).map_err(|_| Mem0Error::InvalidHost(host.clone()))?;
        if base.cannot_be_a_base() {
            return Err(Mem0Error::InvalidHost(host));
        }

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth_header(&api_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let scope = ProjectScope {
            organization_name: non_blank(options.organization_name),
            project_name: non_blank(options.project_name),
            organization_id: non_blank(options.organization_id),
            project_id: non_blank(options.project_id),
        };
        scope.validate();

        Ok(Self {
            http: reqwest::Client::new(),
            telemetry_id: sha256(&api_key),
            api_key,
            host,
            base,
            headers,
            scope,
            telemetry: options
                .telemetry
                .unwrap_or_else(|| Arc::new(NoopTelemetry)),
            identity: IdentityState::Uninitialized,
        })
    }

    pub fn from_config(config: &Mem0Config, telemetry: Arc<dyn Telemetry>) -> Result<Self> {
        Self::new(ClientOptions::from_config(config).with_telemetry(telemetry))
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn scope(&self) -> &ProjectScope {
        &self.scope
    }

    #[must_use]
    pub fn identity(&self) -> &IdentityState {
        &self.identity
    }

    /// `<host>/<segment>/.../` with each segment percent-encoded, plus the
    /// already-encoded `query` when it is not empty.
    fn endpoint(&self, segments: &[&str], query: &str) -> Result<String> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| Mem0Error::InvalidHost(self.host.clone()))?
            .pop_if_empty()
            .extend(segments.iter().copied())
            .push("");
        if !query.is_empty() {
            url.set_query(Some(query));
        }
        Ok(url.into())
    }

    fn url(&self, segments: &[&str]) -> Result<String> {
        self.endpoint(segments, "")
    }

    fn track(&self, method: &str, payload: Option<&Map<String, Value>>) {
        let keys = payload
            .map(|map| map.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        self.telemetry.capture(TelemetryEvent {
            name: format!("client.{method}"),
            distinct_id: self.telemetry_id.clone(),
            properties: json!({
                "api_host": self.host,
                "client_source": "rust",
                "client_version": env!("CARGO_PKG_VERSION"),
                "keys": keys,
            }),
        });
    }

    /// Sends one request and normalizes the response.
    ///
    /// The Authorization header is always rebuilt from the client's current
    /// key, whatever the default header set holds.
    async fn fetch(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Value> {
        debug!(%method, url, "mem0 request");

        let mut headers = self.headers.clone();
        headers.insert(AUTHORIZATION, auth_header(&self.api_key)?);

        let mut request = self.http.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request.body(serde_json::to_vec(body)?);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            debug!(%status, "mem0 request failed");
            return Err(Mem0Error::Api { status, body: text });
        }

        Ok(parse_body(&text))
    }

    /// Checks the key against the service and adopts the org/project ids it
    /// reports, unless they were configured explicitly.
    pub async fn ping(&mut self) -> Result<Value> {
        let response = self.fetch(Method::GET, &self.url(&["v1", "ping"])?, None).await?;
        if !response.is_object() {
            return Err(Mem0Error::InvalidResponse(
                "Invalid response format from ping endpoint".to_string(),
            ));
        }

        let identity = Identity::from_ping(&response);
        if self.scope.organization_id.is_none() {
            self.scope.organization_id.clone_from(&identity.org_id);
        }
        if self.scope.project_id.is_none() {
            self.scope.project_id.clone_from(&identity.project_id);
        }
        if let Some(email) = identity.user_email.as_deref() {
            self.telemetry_id = sha256(email);
        }

        Ok(response)
    }

    /// Runs identity discovery once. A failed ping leaves the client usable
    /// in the degraded state.
    pub async fn initialize(&mut self) -> &IdentityState {
        if self.identity.is_settled() {
            return &self.identity;
        }

        self.identity = IdentityState::Pinging;
        self.identity = match self.ping().await {
            Ok(response) => IdentityState::Ready(Identity::from_ping(&response)),
            Err(error) => {
                warn!(%error, "mem0 ping failed; continuing without identity");
                IdentityState::Degraded {
                    reason: error.to_string(),
                }
            }
        };
        &self.identity
    }

    pub async fn search(&self, query: &str, options: MemoryOptions) -> Result<Value> {
        let mut payload = Map::new();
        payload.insert("query".to_string(), Value::from(query));
        payload.extend(options.to_payload()?);
        self.scope.apply(&mut payload);

        let version = match options.api_version {
            Some(ApiVersion::V2) => "v2",
            _ => "v1",
        };
        let url = self.url(&[version, "memories", "search"])?;

        self.track("search", Some(&payload));
        self.fetch(Method::POST, &url, Some(&Value::Object(payload)))
            .await
    }

    pub async fn add(&self, messages: &[Message], options: MemoryOptions) -> Result<Value> {
        let mut extra = options.to_payload()?;
        self.scope.apply(&mut extra);
        if let Some(version) = options.api_version {
            extra.insert("version".to_string(), Value::from(version.as_str()));
        }

        let mut payload = Map::new();
        payload.insert("messages".to_string(), serde_json::to_value(messages)?);
        payload.extend(extra);

        self.track("add", Some(&payload));
        self.fetch(
            Method::POST,
            &self.url(&["v1", "memories"])?,
            Some(&Value::Object(payload)),
        )
        .await
    }

    pub async fn update(&self, memory_id: &str, update: &MemoryUpdateRequest) -> Result<Value> {
        if update.text.is_none() && update.metadata.is_none() {
            return Err(Mem0Error::validation(
                "Either text or metadata must be provided for update.",
            ));
        }
        self.scope.validate();

        self.track("update", None);
        self.fetch(
            Method::PUT,
            &self.url(&["v1", "memories", memory_id])?,
            Some(&serde_json::to_value(update)?),
        )
        .await
    }

    pub async fn get(&self, memory_id: &str) -> Result<Value> {
        self.track("get", None);
        self.fetch(Method::GET, &self.url(&["v1", "memories", memory_id])?, None)
            .await
    }

    pub async fn delete(&self, memory_id: &str) -> Result<Value> {
        self.track("delete", None);
        self.fetch(
            Method::DELETE,
            &self.url(&["v1", "memories", memory_id])?,
            None,
        )
        .await
    }

    /// Lists memories. v2 posts the filters as a body; v1 sends them as
    /// query parameters. Pagination is only sent when both page and
    /// page size are given.
    pub async fn get_all(&self, options: MemoryOptions) -> Result<Value> {
        let mut filters = options.to_payload()?;
        self.scope.apply(&mut filters);
        let pagination = options.pagination();

        self.track("get_all", Some(&filters));
        if options.api_version == Some(ApiVersion::V2) {
            let url = self.endpoint(&["v2", "memories"], &join_query(&[pagination]))?;
            self.fetch(Method::POST, &url, Some(&Value::Object(filters)))
                .await
        } else {
            let query = join_query(&[Some(encode_query(&filters)), pagination]);
            self.fetch(Method::GET, &self.endpoint(&["v1", "memories"], &query)?, None)
                .await
        }
    }

    pub async fn delete_all(&self, options: MemoryOptions) -> Result<Value> {
        let mut params = options.to_payload()?;
        self.scope.apply(&mut params);

        self.track("delete_all", Some(&params));
        self.fetch(
            Method::DELETE,
            &self.endpoint(&["v1", "memories"], &encode_query(&params))?,
            None,
        )
        .await
    }

    pub async fn history(&self, memory_id: &str) -> Result<Value> {
        self.track("history", None);
        self.fetch(
            Method::GET,
            &self.url(&["v1", "memories", memory_id, "history"])?,
            None,
        )
        .await
    }

    pub async fn users(&self) -> Result<Value> {
        let params = self.scope.to_map();
        self.track("users", None);
        self.fetch(
            Method::GET,
            &self.endpoint(&["v1", "entities"], &encode_query(&params))?,
            None,
        )
        .await
    }

    pub async fn delete_user(&self, request: &DeleteUserRequest) -> Result<Value> {
        let entity_type = request.entity_type.unwrap_or_default();
        self.track("delete_user", None);
        self.fetch(
            Method::DELETE,
            &self.url(&["v1", "entities", entity_type.as_str(), request.entity_id.as_str()])?,
            None,
        )
        .await
    }

    /// Deletes the entity named in `request`, or every entity the service
    /// lists when none is named. Deletions run one after another and stop
    /// at the first failure.
    pub async fn delete_users(&self, request: &DeleteUsersRequest) -> Result<Value> {
        let target = request.target();
        let to_delete = match target {
            Some((entity_type, name)) => vec![Entity {
                entity_type: entity_type.as_str().to_string(),
                name: name.to_string(),
            }],
            None => entities_from_response(&self.users().await?)?,
        };

        if to_delete.is_empty() {
            return Err(Mem0Error::validation("No entities to delete"));
        }

        let query = encode_query(&self.scope.to_map());
        self.track("delete_users", None);
        for entity in &to_delete {
            let url = self.endpoint(
                &["v2", "entities", entity.entity_type.as_str(), entity.name.as_str()],
                &query,
            )?;
            self.fetch(Method::DELETE, &url, None)
                .await
                .map_err(|source| Mem0Error::EntityDelete {
                    entity_type: entity.entity_type.clone(),
                    name: entity.name.clone(),
                    source: Box::new(source),
                })?;
        }

        let message = if target.is_some() {
            "Entity deleted successfully."
        } else {
            "All users, agents, apps and runs deleted."
        };
        Ok(json!({ "message": message }))
    }

    pub async fn batch_update(&self, memories: &[BatchMemoryUpdate]) -> Result<Value> {
        let body = json!({ "memories": memories });
        self.track("batch_update", None);
        self.fetch(Method::PUT, &self.url(&["v1", "batch"])?, Some(&body))
            .await
    }

    pub async fn batch_delete(&self, memory_ids: &[String]) -> Result<Value> {
        let memories = memory_ids
            .iter()
            .map(|id| json!({ "memory_id": id }))
            .collect::<Vec<_>>();
        let body = json!({ "memories": memories });
        self.track("batch_delete", None);
        self.fetch(Method::DELETE, &self.url(&["v1", "batch"])?, Some(&body))
            .await
    }

    fn project_url(&self, query: &str) -> Result<String> {
        self.scope.validate();
        let (org_id, project_id) = self.scope.ids().ok_or_else(|| {
            Mem0Error::validation(
                "organizationId and projectId must be set to access instructions or categories",
            )
        })?;
        self.endpoint(
            &["api", "v1", "orgs", "organizations", org_id, "projects", project_id],
            query,
        )
    }

    pub async fn get_project(&self, fields: &[&str]) -> Result<Value> {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for field in fields {
            serializer.append_pair("fields", field);
        }
        let url = self.project_url(&serializer.finish())?;
        self.track("get_project", None);
        self.fetch(Method::GET, &url, None).await
    }

    pub async fn update_project(&self, update: &ProjectUpdate) -> Result<Value> {
        let url = self.project_url("")?;
        if update.custom_instructions.is_none() && update.custom_categories.is_none() {
            return Err(Mem0Error::validation(
                "Only custom_instructions or custom_categories can be updated",
            ));
        }
        self.track("update_project", None);
        self.fetch(Method::PATCH, &url, Some(&serde_json::to_value(update)?))
            .await
    }

    fn webhook_project<'a>(&'a self, project_id: Option<&'a str>) -> Result<&'a str> {
        project_id
            .filter(|x| !x.trim().is_empty())
            .or(self.scope.project_id.as_deref())
            .ok_or_else(|| Mem0Error::validation("projectId is required for webhook operations"))
    }

    pub async fn get_webhooks(&self, project_id: Option<&str>) -> Result<Value> {
        let project_id = self.webhook_project(project_id)?;
        self.track("get_webhooks", None);
        self.fetch(
            Method::GET,
            &self.url(&["api", "v1", "webhooks", "projects", project_id])?,
            None,
        )
        .await
    }

    pub async fn create_webhook(&self, webhook: &WebhookCreate) -> Result<Value> {
        let project_id = self.webhook_project(webhook.project_id.as_deref())?;
        self.track("create_webhook", None);
        self.fetch(
            Method::POST,
            &self.url(&["api", "v1", "webhooks", "projects", project_id])?,
            Some(&serde_json::to_value(webhook)?),
        )
        .await
    }

    pub async fn update_webhook(&self, webhook: &WebhookUpdate) -> Result<Value> {
        let mut body = webhook.clone();
        body.project_id = Some(self.webhook_project(webhook.project_id.as_deref())?.to_string());
        self.track("update_webhook", None);
        self.fetch(
            Method::PUT,
            &self.url(&["api", "v1", "webhooks", webhook.webhook_id.as_str()])?,
            Some(&serde_json::to_value(&body)?),
        )
        .await
    }

    pub async fn delete_webhook(&self, webhook_id: &str) -> Result<Value> {
        self.track("delete_webhook", None);
        self.fetch(
            Method::DELETE,
            &self.url(&["api", "v1", "webhooks", webhook_id])?,
            None,
        )
        .await
    }

    pub async fn feedback(&self, feedback: &FeedbackRequest) -> Result<Value> {
        self.track("feedback", None);
        self.fetch(
            Method::POST,
            &self.url(&["v1", "feedback"])?,
            Some(&serde_json::to_value(feedback)?),
        )
        .await
    }

    pub async fn create_memory_export(&self, request: &MemoryExportRequest) -> Result<Value> {
        if is_missing(request.filters.as_ref()) || is_missing(request.schema.as_ref()) {
            return Err(Mem0Error::validation("Missing filters or schema"));
        }
        let body = json!({
            "schema": request.schema,
            "filters": request.filters,
            "org_id": self.scope.organization_id,
            "project_id": self.scope.project_id,
        });
        self.track("create_memory_export", None);
        self.fetch(Method::POST, &self.url(&["v1", "exports"])?, Some(&body))
            .await
    }

    pub async fn get_memory_export(&self, query: &MemoryExportQuery) -> Result<Value> {
        let export_id = query.memory_export_id.as_deref().filter(|x| !x.is_empty());
        if export_id.is_none() && is_missing(query.filters.as_ref()) {
            return Err(Mem0Error::validation("Missing memory_export_id or filters"));
        }

        let mut body = Map::new();
        if let Some(export_id) = export_id {
            body.insert("memory_export_id".to_string(), Value::from(export_id));
        }
        if let Some(filters) = query.filters.as_ref().filter(|x| !x.is_null()) {
            body.insert("filters".to_string(), filters.clone());
        }
        body.insert(
            "org_id".to_string(),
            Value::from(self.scope.organization_id.clone().unwrap_or_default()),
        );
        body.insert(
            "project_id".to_string(),
            Value::from(self.scope.project_id.clone().unwrap_or_default()),
        );

        self.track("get_memory_export", None);
        self.fetch(
            Method::POST,
            &self.url(&["v1", "exports", "get"])?,
            Some(&Value::Object(body)),
        )
        .await
    }
}
