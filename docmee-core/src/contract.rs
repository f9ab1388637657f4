//! # contract: the docmee API as a trait
//!
//! [`DocmeeApi`] lists the seven operations of the presentation service. The
//! HTTP implementation is [`crate::client::DocmeeClient`]; callers that only
//! orchestrate calls (the CLI, higher level workflows) depend on the trait so
//! they can be exercised with [`MockDocmeeApi`] instead of a live service.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`; the generated `MockDocmeeApi` is
//!   exported under the default `test-export-mocks` feature.

use async_trait::async_trait;
use mockall::automock;
use serde_json::{Map, Value};

use crate::error::ClientResult;
use crate::model::{
    ArtifactInfo, Envelope, GenerateOutlineRequest, GeneratePptxRequest, TaskFile, TemplatePage,
    TemplateQuery,
};
use crate::stream::OutlineStream;

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DocmeeApi: Send + Sync {
    /// Exchange an API key for a token. `uid` scopes the token to one end user,
    /// `limit` caps how many generations it allows.
    async fn create_token(
        &self,
        api_key: &str,
        uid: Option<String>,
        limit: Option<u32>,
    ) -> ClientResult<String>;

    /// Create a generation task from text and/or files.
    ///
    /// Returns the raw envelope: its payload depends on the task type, so the
    /// `code` is left for the caller to inspect.
    async fn create_task(
        &self,
        token: &str,
        task_type: i32,
        content: Option<String>,
        files: Vec<TaskFile>,
    ) -> ClientResult<Envelope>;

    /// Generation options (lengths, scenes, audiences...), optionally localised.
    async fn get_options(&self, lang: Option<String>) -> ClientResult<Map<String, Value>>;

    /// Start streaming the outline of a task.
    async fn generate_outline(
        &self,
        token: &str,
        request: &GenerateOutlineRequest,
    ) -> ClientResult<OutlineStream>;

    /// Stream a revised outline for `markdown` according to `question`.
    async fn update_outline(
        &self,
        token: &str,
        id: &str,
        markdown: &str,
        question: &str,
    ) -> ClientResult<OutlineStream>;

    async fn get_template_page(
        &self,
        token: &str,
        query: &TemplateQuery,
    ) -> ClientResult<TemplatePage>;

    /// Render the final presentation.
    async fn generate_artifact(
        &self,
        token: &str,
        request: &GeneratePptxRequest,
    ) -> ClientResult<ArtifactInfo>;
}
