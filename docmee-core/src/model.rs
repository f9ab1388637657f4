//! Wire types for the docmee API.
//!
//! Request types skip unset fields when serialized so the service never sees
//! explicit `null`s. Response types are lenient: optional fields default to
//! `None`, numeric fields to `0` and lists to empty.

use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{ClientError, ClientResult};

/// The `{code, message, data}` wrapper returned by most endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }

    /// Returns the payload of a successful envelope.
    ///
    /// A non-zero `code` becomes [`ClientError::Service`]. A successful envelope
    /// without `data` yields an empty map; callers that need a specific field
    /// check for it themselves.
    pub fn into_data(self) -> ClientResult<Map<String, Value>> {
        if !self.is_success() {
            return Err(ClientError::service(self.code, self.message));
        }
        Ok(self.data.unwrap_or_default())
    }

    /// Like [`Envelope::into_data`], but a successful envelope must carry `data`.
    pub fn into_required_data(self) -> ClientResult<Map<String, Value>> {
        if !self.is_success() {
            return Err(ClientError::service(self.code, self.message));
        }
        self.data.ok_or_else(|| ClientError::missing_field("data"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokenRequest {
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl CreateTokenRequest {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            uid: None,
            limit: None,
        }
    }

    /// Copy of the request that is safe to log.
    pub(crate) fn redacted(&self) -> Self {
        Self {
            api_key: "***".to_string(),
            ..self.clone()
        }
    }
}

/// One file attached to a task. The bytes are owned by the request and moved
/// into the multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl TaskFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Reads a file from disk, naming the part after the file's own name.
    pub async fn from_path(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            tracing::error!(error = ?e, path = %path.display(), "Failed to read task file");
            e
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ClientError::invalid_input(format!("{} has no file name", path.display()))
            })?;
        Ok(Self::new(file_name, bytes))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateOutlineRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOutlineRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
}

impl UpdateOutlineRequest {
    pub fn new(id: &str, markdown: &str, question: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            markdown: Some(markdown.to_string()),
            question: Some(question.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePptxRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateQuery {
    pub page: u32,
    pub size: u32,
    pub filters: TemplateFilter,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateFilter {
    #[serde(rename = "type")]
    pub template_type: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_color: Option<String>,
}

/// Template page container. This endpoint is not wrapped in an [`Envelope`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplatePage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<TemplateInfo>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateInfo {
    pub id: Option<String>,
    #[serde(rename = "type", deserialize_with = "null_as_default")]
    pub template_type: i32,
    pub sub_type: Option<i32>,
    pub layout: Option<String>,
    pub category: Option<String>,
    pub style: Option<String>,
    pub theme_color: Option<String>,
    pub lang: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub animation: bool,
    pub subject: Option<String>,
    pub cover_url: Option<String>,
    pub file_url: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub page_cover_urls: Vec<String>,
    pub pptx_property: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub sort: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub num: i32,
    pub img_num: Option<i32>,
    #[serde(deserialize_with = "null_as_default")]
    pub is_deleted: i32,
    pub user_id: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub company_id: i64,
    #[serde(with = "timestamp")]
    pub update_time: Option<NaiveDateTime>,
    #[serde(with = "timestamp")]
    pub create_time: Option<NaiveDateTime>,
    pub create_user: Option<String>,
    pub update_user: Option<String>,
}

/// Metadata of a generated presentation (`pptInfo`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArtifactInfo {
    pub id: Option<String>,
    pub name: Option<String>,
    pub subject: Option<String>,
    pub cover_url: Option<String>,
    pub file_url: Option<String>,
    pub template_id: Option<String>,
    pub pptx_property: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub company_id: i64,
    #[serde(with = "timestamp")]
    pub update_time: Option<NaiveDateTime>,
    #[serde(with = "timestamp")]
    pub create_time: Option<NaiveDateTime>,
    pub create_user: Option<String>,
    pub update_user: Option<String>,
}

/// Reads `null` as the field's default (`0`, `false`, empty).
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `yyyy-MM-dd HH:mm:ss` timestamps, nullable.
pub mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => NaiveDateTime::parse_from_str(&raw, FORMAT)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
