use anyhow::{Context, Result};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::{info, warn};

use crate::config::CloudflareConfig;

const API_BASE: &str = "https://api.cloudflare.com/client/v4";
const MAX_SUBDOMAIN_CHARS: usize = 63;
const FALLBACK_ACCOUNT: &str = "user";

static ACCOUNT_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)'s?\s*account").unwrap());
static NON_SUBDOMAIN_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9-]").unwrap());
static HYPHEN_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").unwrap());

#[derive(Debug, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct AccountsResponse {
    #[serde(default)]
    result: Vec<Account>,
}

/// A verified account plus the worker it will publish to
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub account_id: String,
    pub account_name: String,
    pub worker_name: String,
    pub worker_host: String,
}

impl Connection {
    pub fn new(account_id: &str, account_name: &str, worker_name: &str) -> Self {
        let worker_host = format!(
            "{}.{}.workers.dev",
            worker_name,
            format_account_name(account_name)
        );
        Self {
            account_id: account_id.to_string(),
            account_name: account_name.to_string(),
            worker_name: worker_name.to_string(),
            worker_host,
        }
    }

    pub fn worker_url(&self) -> String {
        format!("https://{}", self.worker_host)
    }
}

pub struct CloudflareClient {
    client: Client,
    api_token: String,
}

impl CloudflareClient {
    pub fn new(api_token: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, api_token })
    }

    /// True when the token can read the account
    pub async fn verify_account(&self, account_id: &str) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/accounts/{}", API_BASE, account_id))
            .bearer_auth(&self.api_token)
            .send()
            .await
            .context("Failed to reach the Cloudflare API")?;

        Ok(response.status().is_success())
    }

    pub async fn account_name(&self, account_id: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(format!("{}/accounts", API_BASE))
            .bearer_auth(&self.api_token)
            .send()
            .await
            .context("Failed to list Cloudflare accounts")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("Cloudflare API returned error: {} - {}", status, error_text);
        }

        let accounts = response
            .json::<AccountsResponse>()
            .await
            .context("Failed to parse Cloudflare accounts response")?;

        Ok(accounts
            .result
            .into_iter()
            .find(|account| account.id == account_id)
            .map(|account| account.name))
    }

    pub async fn connect(&self, config: &CloudflareConfig) -> Result<Connection> {
        if !self.verify_account(&config.account_id).await? {
            anyhow::bail!(
                "Could not access Cloudflare account {}. Check CLOUDFLARE_ACCOUNT_ID and CLOUDFLARE_API_TOKEN.",
                config.account_id
            );
        }

        let account_name = self
            .account_name(&config.account_id)
            .await?
            .with_context(|| {
                format!(
                    "Account {} is not visible to this API token",
                    config.account_id
                )
            })?;

        let connection = Connection::new(&config.account_id, &account_name, &config.worker_name);
        info!(host = %connection.worker_host, "connected to Cloudflare");
        Ok(connection)
    }

    /// Upload the script and enable its workers.dev route
    pub async fn deploy(&self, connection: &Connection, script: &str) -> Result<()> {
        let script_url = format!(
            "{}/accounts/{}/workers/scripts/{}",
            API_BASE, connection.account_id, connection.worker_name
        );

        let response = self
            .client
            .put(&script_url)
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/javascript")
            .body(script.to_string())
            .send()
            .await
            .context("Failed to upload worker script")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("Worker upload failed: {} - {}", status, error_text);
        }

        let response = self
            .client
            .post(format!("{}/subdomain", script_url))
            .bearer_auth(&self.api_token)
            .json(&serde_json::json!({ "enabled": true }))
            .send()
            .await
            .context("Failed to enable workers.dev subdomain")?;

        // The script is live either way; the route may already be enabled
        if !response.status().is_success() {
            warn!(status = %response.status(), "enabling workers.dev subdomain failed");
        }

        Ok(())
    }
}

/// Account display name as a workers.dev subdomain label
pub fn format_account_name(name: &str) -> String {
    let local = name.split('@').next().unwrap_or(name);
    let without_suffix = ACCOUNT_SUFFIX.replace_all(local, "");
    let kept = NON_SUBDOMAIN_CHARS.replace_all(&without_suffix, "");
    let collapsed = HYPHEN_RUNS.replace_all(&kept, "-");
    let label = collapsed.trim_matches('-').to_lowercase();

    if label.is_empty() {
        FALLBACK_ACCOUNT.to_string()
    } else {
        label.chars().take(MAX_SUBDOMAIN_CHARS).collect()
    }
}
