//! Hand-off of collected scripts to a chat-completions model.

use std::{collections::HashMap, sync::LazyLock, time::Duration};

use log::{debug, info};
use regex::{Captures, Regex};

use crate::{
    archetypes::ArchetypeCatalogue,
    error::{PlotlineError, Result},
    provider::Provider,
    types::VideoRecord,
};

pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are an expert YouTube content creator and analyst. \
You analyze scripts, comments, and channel data to provide actionable insights. \
Please respond in Korean.";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder pattern is valid"));

/// Replaces `{name}` placeholders with the matching value. Unknown
/// placeholders are left untouched.
pub fn fill_template(template: &str, values: &HashMap<&str, &str>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match values.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Fills a single-video template: `{title}`, `{script}`, `{description}`,
/// `{comments}`, `{channel_name}` and `{archetypes_table}`.
pub fn video_prompt(
    template: &str,
    record: &VideoRecord,
    archetypes: &ArchetypeCatalogue,
) -> String {
    let script = record.transcript.render();
    let comments = record.comments.render();
    let table = archetypes.to_markdown_table();
    let values = HashMap::from([
        ("title", record.title.as_str()),
        ("script", script.as_str()),
        ("description", record.description.as_str()),
        ("comments", comments.as_str()),
        ("channel_name", record.channel_name.as_str()),
        ("archetypes_table", table.as_str()),
    ]);
    fill_template(template, &values)
}

/// Concatenates the usable transcripts of one channel's records.
pub fn channel_scripts<'a>(
    records: impl IntoIterator<Item = &'a VideoRecord>,
    channel_name: &str,
) -> String {
    records
        .into_iter()
        .filter(|record| record.channel_name == channel_name)
        .filter_map(|record| {
            record
                .transcript
                .text()
                .map(|script| format!("Title: {}\nScript: {script}\n\n", record.title))
        })
        .collect()
}

/// Fills a channel template: `{channel_name}`, `{all_scripts}` and
/// `{archetypes_table}`.
pub fn channel_prompt(
    template: &str,
    channel_name: &str,
    all_scripts: &str,
    archetypes: &ArchetypeCatalogue,
) -> String {
    let table = archetypes.to_markdown_table();
    let values = HashMap::from([
        ("channel_name", channel_name),
        ("all_scripts", all_scripts),
        ("archetypes_table", table.as_str()),
    ]);
    fill_template(template, &values)
}

/// Fills a comparison template: the original script as `{foreign_script}`,
/// the adapted one as `{korean_script}`, plus `{archetypes_table}`.
pub fn compare_prompt(
    template: &str,
    original: &str,
    adapted: &str,
    archetypes: &ArchetypeCatalogue,
) -> String {
    let table = archetypes.to_markdown_table();
    let values = HashMap::from([
        ("foreign_script", original),
        ("korean_script", adapted),
        ("archetypes_table", table.as_str()),
    ]);
    fill_template(template, &values)
}

pub struct Analyst {
    http: reqwest::Client,
    provider: Provider,
    api_key: String,
    api_url: String,
}

impl Analyst {
    pub fn new(provider: Provider, timeout: Duration) -> Result<Self> {
        let api_key = provider.api_key()?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            provider,
            api_key,
            api_url: provider.config().api_url.to_string(),
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Sends one prompt and returns the model's full reply.
    pub async fn analyze(&self, system: Option<&str>, prompt: &str) -> Result<String> {
        let config = self.provider.config();
        info!(
            "Requesting analysis from {} ({} chars)",
            self.provider.name(),
            prompt.len()
        );

        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(serde_json::json!({ "role": "system", "content": system }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": prompt }));

        let response = self
            .http
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "model": config.model,
                "messages": messages,
            }))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(PlotlineError::Analysis {
                reason: format!(
                    "{} returned {status}: {}",
                    self.provider.name(),
                    error_detail(&text)
                ),
            });
        }

        let body: serde_json::Value = serde_json::from_str(&text)?;
        let content = reply_content(&body)?;
        debug!("Analysis reply is {} chars", content.len());
        Ok(content)
    }
}

/// The provider's error object when the body is JSON, otherwise the raw body.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) if !value["error"].is_null() => value["error"].to_string(),
        _ => body.trim().to_string(),
    }
}

fn reply_content(response: &serde_json::Value) -> Result<String> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| PlotlineError::Analysis {
            reason: format!("Invalid API response: {response}"),
        })
}
