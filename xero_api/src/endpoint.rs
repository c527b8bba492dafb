//! Resolution of a request path into a full URL and its resource name.

use url::Url;

use crate::config::ClientConfig;
use crate::types::{Params, PAGE_PARAM};
use crate::Error;

const SUMMARIZE_ERRORS_PARAM: &str = "summarizeErrors";

/// A request path resolved against the configured API root.
#[derive(Debug, Clone)]
pub(crate) struct Endpoint {
    url: Url,
    resource: String,
    summarize_errors: bool,
}

impl Endpoint {
    pub(crate) fn new(config: &ClientConfig, path: &str) -> Result<Self, Error> {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        let resource = resource_name(&path)
            .ok_or_else(|| Error::InvalidPath(path.clone()))?
            .to_string();
        let url = Url::parse(&format!(
            "{}{}{}",
            config.base_url.trim_end_matches('/'),
            config.api_path,
            path
        ))
        .map_err(|e| {
            tracing::error!("Invalid URL constructed: {}", e);
            Error::InvalidUrl(e)
        })?;
        Ok(Self {
            url,
            resource,
            summarize_errors: config.summarize_errors,
        })
    }

    /// Leading path segment: the wire root element and the result key.
    pub(crate) fn resource(&self) -> &str {
        &self.resource
    }

    /// Whether the caller already picked a page, via `params` or the path's
    /// own query string.
    pub(crate) fn has_explicit_page(&self, params: Option<&Params>) -> bool {
        params.is_some_and(|p| p.contains_key(PAGE_PARAM))
            || self.url.query_pairs().any(|(k, _)| k == PAGE_PARAM)
    }

    /// Full URL for one request, with `params`, the optional `page` and the
    /// error-summary switch appended.
    pub(crate) fn url(&self, params: Option<&Params>, page: Option<u32>) -> Url {
        let mut pairs: Vec<(String, String)> = params
            .map(|p| p.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        if let Some(page) = page {
            pairs.retain(|(k, _)| k != PAGE_PARAM);
            pairs.push((PAGE_PARAM.to_string(), page.to_string()));
        }
        let caller_set_summary = pairs.iter().any(|(k, _)| k == SUMMARIZE_ERRORS_PARAM)
            || self
                .url
                .query_pairs()
                .any(|(k, _)| k == SUMMARIZE_ERRORS_PARAM);
        if !self.summarize_errors && !caller_set_summary {
            pairs.push((SUMMARIZE_ERRORS_PARAM.to_string(), "false".to_string()));
        }

        let mut url = self.url.clone();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        url
    }
}

/// First non-empty segment of `path`, ignoring any query string.
pub(crate) fn resource_name(path: &str) -> Option<&str> {
    path.split(['/', '?'])
        .find(|segment| !segment.is_empty())
        .filter(|_| !path.trim_start_matches('/').starts_with('?'))
}

/// Path plus query of `url`, as logged for each request.
pub(crate) fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}
