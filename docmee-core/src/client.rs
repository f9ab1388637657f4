//! # DocmeeClient: HTTP implementation of [`DocmeeApi`]
//!
//! One `reqwest::Client` bound to a base URL. Every operation follows the same
//! path: shape the request (JSON or multipart, `Api-Key`/`token` header), send
//! it, gate on the HTTP status, then decode the envelope, the template page or
//! the outline stream.
//!
//! The client keeps no per-call state and is cheap to clone; concurrent calls
//! share only the connection pool. It never retries and imposes no timeout:
//! both are left to the caller.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::config::ClientConfig;
use crate::contract::DocmeeApi;
use crate::error::{ClientError, ClientResult, TransportError};
use crate::model::{
    ArtifactInfo, CreateTokenRequest, Envelope, GenerateOutlineRequest, GeneratePptxRequest,
    TaskFile, TemplatePage, TemplateQuery, UpdateOutlineRequest,
};
use crate::stream::{decode_body, OutlineStream, RequestContext};

pub const BASE_URL: &str = "https://docmee.cn";

const CREATE_TOKEN_PATH: &str = "/api/user/createApiToken";
const CREATE_TASK_PATH: &str = "/api/ppt/v2/createTask";
const OPTIONS_PATH: &str = "/api/ppt/v2/options";
const GENERATE_CONTENT_PATH: &str = "/api/ppt/v2/generateContent";
const UPDATE_CONTENT_PATH: &str = "/api/ppt/v2/updateContent";
const TEMPLATES_PATH: &str = "/api/ppt/templates";
const GENERATE_PPTX_PATH: &str = "/api/ppt/v2/generatePptx";

const API_KEY_HEADER: &str = "Api-Key";
const TOKEN_HEADER: &str = "token";

#[derive(Debug, Clone)]
pub struct DocmeeClient {
    client: Client,
    base_url: String,
}

impl DocmeeClient {
    /// Builds a client for `base_url`. A trailing `/` is ignored.
    ///
    /// # Errors
    ///
    /// [`ClientError::Config`] if the URL is not an absolute http(s) URL or the
    /// HTTP client cannot be constructed.
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let base_url = base_url.trim_end_matches('/');
        let parsed = reqwest::Url::parse(base_url).map_err(|e| {
            error!(error = %e, base_url, "Invalid docmee base URL");
            ClientError::config(format!("invalid base URL {base_url:?}: {e}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::config(format!(
                "base URL {base_url:?} must use http or https"
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::config(format!("failed to build HTTP client: {e}")))?;

        debug!(base_url, "Created docmee client");
        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        Self::new(&config.base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn context(&self, method: Method, path: &str, summary: String) -> RequestContext {
        RequestContext::new(&method, format!("{}{}", self.base_url, path), summary)
    }

    async fn send(
        &self,
        request: RequestBuilder,
        context: &RequestContext,
    ) -> ClientResult<Response> {
        info!(method = %context.method, url = %context.url, "Calling docmee API");
        let response = request.send().await.map_err(|e| {
            error!(
                method = %context.method,
                url = %context.url,
                request = %context.summary,
                error = %e,
                "docmee API request failed"
            );
            context.connection_error(e)
        })?;
        check_status(response, context).await
    }

    async fn post_json<T, R>(
        &self,
        path: &str,
        token: &str,
        body: &T,
        decode_as: &str,
    ) -> ClientResult<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let context = self.context(Method::POST, path, summarize(body));
        let request = self
            .client
            .post(&context.url)
            .header(TOKEN_HEADER, token)
            .json(body);
        let response = self.send(request, &context).await?;
        read_json(response, &context, decode_as).await
    }

    async fn open_stream<T>(&self, path: &str, token: &str, body: &T) -> ClientResult<OutlineStream>
    where
        T: Serialize + ?Sized,
    {
        let context = self.context(Method::POST, path, summarize(body));
        let request = self
            .client
            .post(&context.url)
            .header(TOKEN_HEADER, token)
            .json(body);
        let response = self.send(request, &context).await?;
        debug!(url = %context.url, "Outline stream opened");
        Ok(decode_body(response.bytes_stream(), context))
    }
}

/// Fails with a [`TransportError`] carrying the response body when the status
/// is outside 2xx.
async fn check_status(response: Response, context: &RequestContext) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.ok();
    error!(
        method = %context.method,
        url = %context.url,
        request = %context.summary,
        status = status.as_u16(),
        response = body.as_deref().unwrap_or("<unreadable>"),
        "docmee API returned an error status"
    );
    Err(TransportError::status(
        context.method.clone(),
        context.url.clone(),
        context.summary.clone(),
        status.as_u16(),
        body,
    )
    .into())
}

async fn read_json<R: DeserializeOwned>(
    response: Response,
    context: &RequestContext,
    decode_as: &str,
) -> ClientResult<R> {
    let bytes = response.bytes().await.map_err(|e| {
        error!(url = %context.url, error = %e, "Failed to read docmee response body");
        context.connection_error(e)
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        error!(
            url = %context.url,
            error = %e,
            body = %String::from_utf8_lossy(&bytes),
            "Failed to decode docmee response"
        );
        ClientError::decode(decode_as, e)
    })
}

fn summarize<T: Serialize + ?Sized>(body: &T) -> String {
    serde_json::to_string(body).unwrap_or_else(|e| format!("<unserializable request: {e}>"))
}

/// The token as a string. Numbers and booleans are accepted in their textual
/// form; anything else counts as missing.
fn token_from(data: &Map<String, Value>) -> ClientResult<String> {
    match data.get("token") {
        Some(Value::String(token)) => Ok(token.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        _ => Err(ClientError::missing_field("token")),
    }
}

/// Builds the multipart body of a task. Absent or empty `content` is left out
/// entirely, as are files when there are none.
fn task_form(
    task_type: i32,
    content: Option<String>,
    files: Vec<TaskFile>,
) -> ClientResult<(Form, String)> {
    let mut summary = format!("type={task_type}");
    let mut form = Form::new().text("type", task_type.to_string());

    if let Some(content) = content.filter(|c| !c.is_empty()) {
        summary.push_str(&format!(", content=<{} chars>", content.chars().count()));
        form = form.text("content", content);
    }

    for file in files {
        summary.push_str(&format!(", file={} ({} bytes)", file.file_name, file.bytes.len()));
        let mut part = Part::bytes(file.bytes).file_name(file.file_name);
        if let Some(content_type) = file.content_type {
            part = part.mime_str(&content_type).map_err(|e| {
                ClientError::invalid_input(format!("invalid content type {content_type:?}: {e}"))
            })?;
        }
        form = form.part("file", part);
    }

    Ok((form, summary))
}

fn options_path(lang: Option<&str>) -> String {
    match lang {
        Some(lang) => format!("{OPTIONS_PATH}?lang={lang}"),
        None => OPTIONS_PATH.to_string(),
    }
}

#[async_trait]
impl DocmeeApi for DocmeeClient {
    async fn create_token(
        &self,
        api_key: &str,
        uid: Option<String>,
        limit: Option<u32>,
    ) -> ClientResult<String> {
        let body = CreateTokenRequest {
            api_key: api_key.to_string(),
            uid,
            limit,
        };
        let context = self.context(Method::POST, CREATE_TOKEN_PATH, summarize(&body.redacted()));
        let request = self
            .client
            .post(&context.url)
            .header(API_KEY_HEADER, api_key)
            .json(&body);
        let response = self.send(request, &context).await?;
        let envelope: Envelope = read_json(response, &context, "token envelope").await?;

        let data = envelope.into_data().map_err(|e| {
            error!(error = %e, "docmee refused to create a token");
            e
        })?;
        let token = token_from(&data)?;
        info!(uid = body.uid.as_deref().unwrap_or("-"), "Created docmee API token");
        Ok(token)
    }

    async fn create_task(
        &self,
        token: &str,
        task_type: i32,
        content: Option<String>,
        files: Vec<TaskFile>,
    ) -> ClientResult<Envelope> {
        let (form, summary) = task_form(task_type, content, files)?;
        let context = self.context(Method::POST, CREATE_TASK_PATH, summary);
        let request = self
            .client
            .post(&context.url)
            .header(TOKEN_HEADER, token)
            .multipart(form);
        let response = self.send(request, &context).await?;
        let envelope: Envelope = read_json(response, &context, "task envelope").await?;
        info!(task_type, code = envelope.code, "Created docmee task");
        Ok(envelope)
    }

    async fn get_options(&self, lang: Option<String>) -> ClientResult<Map<String, Value>> {
        let context = self.context(Method::GET, &options_path(lang.as_deref()), "-".to_string());
        let request = self.client.get(&context.url);
        let response = self.send(request, &context).await?;
        let envelope: Envelope = read_json(response, &context, "options envelope").await?;
        let options = envelope.into_required_data()?;
        debug!(keys = options.len(), "Fetched generation options");
        Ok(options)
    }

    async fn generate_outline(
        &self,
        token: &str,
        request: &GenerateOutlineRequest,
    ) -> ClientResult<OutlineStream> {
        self.open_stream(GENERATE_CONTENT_PATH, token, request).await
    }

    async fn update_outline(
        &self,
        token: &str,
        id: &str,
        markdown: &str,
        question: &str,
    ) -> ClientResult<OutlineStream> {
        let request = UpdateOutlineRequest::new(id, markdown, question);
        self.open_stream(UPDATE_CONTENT_PATH, token, &request).await
    }

    async fn get_template_page(
        &self,
        token: &str,
        query: &TemplateQuery,
    ) -> ClientResult<TemplatePage> {
        let page: TemplatePage = self
            .post_json(TEMPLATES_PATH, token, query, "template page")
            .await?;
        debug!(count = page.data.len(), total = %page.total, "Fetched template page");
        Ok(page)
    }

    async fn generate_artifact(
        &self,
        token: &str,
        request: &GeneratePptxRequest,
    ) -> ClientResult<ArtifactInfo> {
        let envelope: Envelope = self
            .post_json(GENERATE_PPTX_PATH, token, request, "pptx envelope")
            .await?;
        let mut data = envelope.into_data().map_err(|e| {
            error!(error = %e, "docmee refused to generate the presentation");
            e
        })?;
        let raw = data.remove("pptInfo").unwrap_or(Value::Null);
        let artifact: ArtifactInfo = serde_json::from_value(raw).map_err(|e| {
            error!(error = %e, "pptInfo missing or malformed in docmee response");
            ClientError::decode("pptInfo", e)
        })?;
        info!(
            artifact_id = artifact.id.as_deref().unwrap_or("-"),
            "Generated presentation"
        );
        Ok(artifact)
    }
}
