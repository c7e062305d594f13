use std::net::SocketAddr;
use std::time::Duration;

use reqwest::{header::LOCATION, redirect::Policy, Response, Url};
use tracing::{debug, info, instrument, warn};

use super::dto::{check_public_url, is_public_ip};
use crate::acquisition::capture::{find_schema_recipe, from_capture, json_ld_blocks, page_text};
use crate::acquisition::prompt::{format_text, MAX_FORMAT_INPUT_CHARS};
use crate::acquisition::RecipePreview;
use crate::config::ModelConfig;
use crate::error::{AppError, AppResult};
use crate::llm::LanguageModel;

const MAX_PAGE_BYTES: usize = 5 * 1024 * 1024;
const MAX_REDIRECTS: usize = 5;
const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Downloads a recipe page. Every hop is resolved and checked against local
/// address ranges, and the connection is pinned to the checked address.
#[instrument(skip_all, fields(url = %url))]
pub async fn fetch(url: &Url) -> AppResult<String> {
    let mut current = url.clone();
    for _ in 0..=MAX_REDIRECTS {
        check_public_url(&current)?;
        let response = get_pinned(&current).await?;
        let status = response.status();

        if status.is_redirection() {
            let next = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|loc| current.join(loc).ok())
                .filter(|u| u.scheme() == "http" || u.scheme() == "https")
                .ok_or_else(|| AppError::validation("page redirect has no usable target"))?;
            debug!(to = %next, "following redirect");
            current = next;
            continue;
        }
        if !status.is_success() {
            warn!(status = %status, "page fetch returned an error");
            return Err(AppError::validation(format!(
                "page returned status {}",
                status.as_u16()
            )));
        }
        return read_capped(response).await;
    }
    Err(AppError::validation("page redirected too many times"))
}

async fn get_pinned(url: &Url) -> AppResult<Response> {
    let host = url
        .host_str()
        .ok_or_else(|| AppError::validation("url has no host"))?;
    let port = url.port_or_known_default().unwrap_or(80);
    let addr = resolve_public(host, port).await?;

    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .redirect(Policy::none())
        .resolve(host, addr)
        .build()
        .map_err(|e| AppError::Internal(e.into()))?;
    client.get(url.clone()).send().await.map_err(|e| {
        warn!(error = %e, "page fetch failed");
        AppError::validation("page could not be fetched")
    })
}

/// Resolves `host` and returns its first address, provided none of its
/// addresses is local.
async fn resolve_public(host: &str, port: u16) -> AppResult<SocketAddr> {
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((bare, port))
        .await
        .map_err(|e| {
            warn!(error = %e, host, "page host lookup failed");
            AppError::validation("page host could not be resolved")
        })?
        .collect();
    match addrs.first() {
        None => Err(AppError::validation("page host could not be resolved")),
        Some(_) if addrs.iter().any(|a| !is_public_ip(a.ip())) => {
            warn!(host, "page host resolves to a local address");
            Err(AppError::validation("url must point to a public host"))
        }
        Some(first) => Ok(*first),
    }
}

async fn read_capped(mut response: Response) -> AppResult<String> {
    if response
        .content_length()
        .is_some_and(|n| n > MAX_PAGE_BYTES as u64)
    {
        return Err(AppError::validation("page is too large"));
    }
    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|_| AppError::validation("page could not be read"))?
    {
        append_capped(&mut body, &chunk, MAX_PAGE_BYTES)?;
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

fn append_capped(body: &mut Vec<u8>, chunk: &[u8], cap: usize) -> AppResult<()> {
    if body.len() + chunk.len() > cap {
        return Err(AppError::validation("page is too large"));
    }
    body.extend_from_slice(chunk);
    Ok(())
}

/// Reads a schema.org Recipe from the page's JSON-LD, falling back to the
/// formatting model over the visible text.
pub async fn extract(
    models: &dyn LanguageModel,
    cfg: &ModelConfig,
    url: Option<&str>,
    html: &str,
) -> AppResult<RecipePreview> {
    let source = url.unwrap_or_default();
    if let Some(block) = json_ld_blocks(html)
        .into_iter()
        .find(|b| find_schema_recipe(b).is_some())
    {
        info!(source, "recipe read from structured data");
        return from_capture(source, block);
    }

    let text = page_text(html, MAX_FORMAT_INPUT_CHARS);
    if text.is_empty() {
        return Err(AppError::validation("page has no readable text"));
    }
    info!(source, chars = text.len(), "no structured recipe, formatting page text");
    let mut preview = format_text(models, cfg, &text).await?;
    if !source.is_empty() {
        preview.sources.get_or_insert_with(Vec::new).insert(0, source.to_string());
    }
    Ok(preview)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::fakes::{test_config, ScriptedModel};

    #[tokio::test]
    async fn fallback_records_the_page_as_source() {
        let model = ScriptedModel::new(vec![Ok(
            r#"{"title":"Flatbread","ingredients":[{"name":"flour","quantity":250,"unit":"g"}],"instructions":["Knead.","Bake."]}"#.into(),
        )]);
        let cfg = test_config(5).models;
        let html = "<html><body><h1>Flatbread</h1><p>250 g flour. Knead, bake.</p></body></html>";
        let p = extract(&model, &cfg, Some("https://example.com/bread"), html).await.unwrap();
        assert_eq!(p.title, "Flatbread");
        assert_eq!(p.sources, Some(vec!["https://example.com/bread".to_string()]));

        let seen = model.seen.lock().unwrap();
        assert!(seen[0].user.contains("250 g flour"));
        assert!(!seen[0].user.contains("<p>"));
    }

    #[tokio::test]
    async fn empty_page_is_rejected_without_a_model_call() {
        let model = ScriptedModel::default();
        let cfg = test_config(5).models;
        let err = extract(&model, &cfg, None, "<html><script>x()</script></html>").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(model.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn loopback_pages_are_never_requested() {
        let url = Url::parse("http://127.0.0.1:9/recipe").unwrap();
        assert!(matches!(fetch(&url).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn names_resolving_to_loopback_are_refused() {
        let err = resolve_public("localhost", 80).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn body_reading_stops_at_the_cap() {
        let mut body = Vec::new();
        append_capped(&mut body, b"12345", 8).unwrap();
        assert!(append_capped(&mut body, b"6789", 8).is_err());
        assert_eq!(body, b"12345");
    }
}
