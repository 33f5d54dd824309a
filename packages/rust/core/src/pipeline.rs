//! Request-level surface: validated search and export over one configuration.

use std::time::Duration;

use reqwest::Client;
use tracing::{error, info, instrument};

use nobestudy_export::{ExportedFile, Exporter};
use nobestudy_shared::{
    AppConfig, ExportConfig, ExportRequest, FailurePolicy, FileType, HttpConfig, NobestudyError,
    QueryType, Result, ScrapeResult,
};
use nobestudy_sources::SourceResolver;

use crate::orchestrator::{self, ProgressReporter, SilentProgress};

/// Build the HTTP client shared by source probing and image loading.
pub fn build_client(http: &HttpConfig) -> Result<Client> {
    Client::builder()
        .user_agent(http.user_agent.as_str())
        .redirect(reqwest::redirect::Policy::limited(http.max_redirects))
        .timeout(Duration::from_secs(http.timeout_secs))
        .build()
        .map_err(|e| NobestudyError::Network(format!("failed to build HTTP client: {e}")))
}

/// Raw export input as it arrives from a caller. Every text field is
/// optional here; [`ExportForm::validate`] decides what is missing.
#[derive(Debug, Clone)]
pub struct ExportForm {
    pub query: Option<String>,
    pub query_type: Option<String>,
    pub content: Option<String>,
    pub file_type: FileType,
    pub images: Vec<String>,
}

impl ExportForm {
    /// Reject the form if `query`, `query_type` or `content` is absent or blank.
    pub fn validate(self) -> Result<ExportRequest> {
        let mut missing = Vec::new();
        for (name, value) in [
            ("query", &self.query),
            ("query_type", &self.query_type),
            ("content", &self.content),
        ] {
            if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
                missing.push(name);
            }
        }
        if !missing.is_empty() {
            return Err(NobestudyError::validation(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )));
        }

        Ok(ExportRequest {
            query: self.query.unwrap_or_default(),
            query_type: QueryType::parse(self.query_type.as_deref().unwrap_or_default()),
            content: self.content.unwrap_or_default(),
            images: self.images,
        })
    }
}

/// Result of an export under the configured failure policy.
#[derive(Debug)]
pub enum ExportOutcome {
    /// The artifact was written and is ready for delivery.
    Delivered(ExportedFile),
    /// The renderer failed under a `degrade` policy; no file exists.
    Degraded { file_type: FileType, reason: String },
}

/// The search and export service.
pub struct Nobestudy {
    resolver: SourceResolver,
    exporter: Exporter,
    export_config: ExportConfig,
}

impl Nobestudy {
    /// Build the service, its HTTP client and compiled sources from `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = build_client(&config.http)?;
        Self::with_client(client, config)
    }

    /// Same as [`from_config`](Self::from_config) with a caller-supplied client.
    pub fn with_client(client: Client, config: &AppConfig) -> Result<Self> {
        let resolver = SourceResolver::new(client.clone(), &config.sources)?;
        let exporter = Exporter::new(client, config.defaults.output_root());
        Ok(Self {
            resolver,
            exporter,
            export_config: config.export.clone(),
        })
    }

    /// Policy applied when rendering `file_type` fails.
    pub fn failure_policy(&self, file_type: FileType) -> FailurePolicy {
        match file_type {
            FileType::Pdf => self.export_config.pdf_failure,
            FileType::Ppt | FileType::Docx => self.export_config.document_failure,
        }
    }

    pub async fn search(&self, query: &str, query_type: &str) -> Result<ScrapeResult> {
        self.search_with_progress(query, query_type, &SilentProgress)
            .await
    }

    /// Retrieve and summarize `query`. Only a blank query is rejected; an
    /// unknown query type still retrieves and yields the invalid-type sentinel.
    #[instrument(skip_all, fields(query = %query, query_type = %query_type))]
    pub async fn search_with_progress(
        &self,
        query: &str,
        query_type: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<ScrapeResult> {
        let query = query.trim();
        if query.is_empty() {
            return Err(NobestudyError::validation("missing required field(s): query"));
        }

        let query_type = QueryType::parse(query_type);
        let result = orchestrator::run(&self.resolver, query, &query_type, progress).await;

        info!(
            not_found = result.is_not_found(),
            images = result.images.len(),
            "search complete"
        );
        Ok(result)
    }

    /// Validate the form, then render and persist the requested format.
    #[instrument(skip_all, fields(file_type = %form.file_type))]
    pub async fn export(&self, form: ExportForm) -> Result<ExportOutcome> {
        let file_type = form.file_type;
        let request = form.validate()?;

        match self.exporter.export(file_type, &request).await {
            Ok(file) => Ok(ExportOutcome::Delivered(file)),
            Err(e) => match self.failure_policy(file_type) {
                FailurePolicy::Degrade => {
                    error!(%file_type, error = %e, "export failed, continuing without a file");
                    Ok(ExportOutcome::Degraded {
                        file_type,
                        reason: e.to_string(),
                    })
                }
                FailurePolicy::Propagate => Err(e),
            },
        }
    }
}
