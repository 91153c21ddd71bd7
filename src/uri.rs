use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

use crate::domain::{ObjectKind, ObjectRef};
use crate::error::BrowseError;

static SHOW_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]show=([A-Za-z]+)-(\d+)").unwrap());

pub fn parse_server_uri(value: &str) -> Result<String, BrowseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BrowseError::InvalidUri(value.to_string()));
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let url = Url::parse(&with_scheme).map_err(|_| BrowseError::InvalidUri(value.to_string()))?;
    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| BrowseError::InvalidUri(value.to_string()))?;
    Ok(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

pub fn object_uri(server: &str, object: ObjectRef) -> Result<String, BrowseError> {
    if !object.kind.is_container() && object.kind != ObjectKind::Image {
        return Err(BrowseError::UnknownObjectType(object.kind.to_string()));
    }
    let base = parse_server_uri(server)?;
    Ok(format!("{base}/webclient/?show={}-{}", object.kind, object.id))
}

pub fn parse_object_uri(value: &str) -> Result<ObjectRef, BrowseError> {
    let captures = SHOW_PARAM
        .captures(value)
        .ok_or_else(|| BrowseError::InvalidUri(value.to_string()))?;
    let kind: ObjectKind = captures[1].parse()?;
    let id = captures[2]
        .parse::<i64>()
        .map_err(|_| BrowseError::InvalidUri(value.to_string()))?;
    Ok(ObjectRef::new(kind, id))
}
