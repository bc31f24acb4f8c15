//! Byte transport for locators: local paths and `gs://bucket/object`.
//!
//! Cloud Storage goes through the JSON API with a bearer token from
//! `GOOGLE_OAUTH_ACCESS_TOKEN`. `STORAGE_EMULATOR_HOST` points the client at
//! an emulator instead of the public endpoint.

use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::error::IoError;

const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("tally/", env!("CARGO_PKG_VERSION"));

pub const TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
pub const EMULATOR_ENV: &str = "STORAGE_EMULATOR_HOST";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    Gcs { bucket: String, object: String },
}

impl Location {
    pub fn parse(locator: &str) -> Result<Self, IoError> {
        let Some(rest) = locator.strip_prefix("gs://") else {
            return Ok(Self::Local(PathBuf::from(locator)));
        };
        match rest.split_once('/') {
            Some((bucket, object)) if !bucket.is_empty() && !object.is_empty() => Ok(Self::Gcs {
                bucket: bucket.to_string(),
                object: object.to_string(),
            }),
            _ => Err(IoError::InvalidLocator(format!(
                "{locator}: expected gs://bucket/object"
            ))),
        }
    }
}

pub fn is_remote(locator: &str) -> bool {
    locator.starts_with("gs://")
}

/// Join a file name onto a directory locator without touching the scheme.
pub fn join(dir: &str, name: &str) -> String {
    if is_remote(dir) {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    } else {
        Path::new(dir).join(name).to_string_lossy().into_owned()
    }
}

/// Final path component of a locator.
pub fn file_name(locator: &str) -> &str {
    locator.rsplit('/').next().unwrap_or(locator)
}

pub fn read_bytes(locator: &str) -> Result<Vec<u8>, IoError> {
    match Location::parse(locator)? {
        Location::Local(path) => std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => IoError::NotFound(locator.to_string()),
            _ => IoError::Read {
                locator: locator.to_string(),
                message: e.to_string(),
            },
        }),
        Location::Gcs { bucket, object } => GcsClient::from_env()?.download(&bucket, &object),
    }
}

pub fn read_text(locator: &str) -> Result<String, IoError> {
    let bytes = read_bytes(locator)?;
    Ok(crate::csv::decode_text(bytes))
}

/// Local writes create missing parent directories.
pub fn write_bytes(locator: &str, bytes: &[u8]) -> Result<(), IoError> {
    let write_err = |e: std::io::Error| IoError::Write {
        locator: locator.to_string(),
        message: e.to_string(),
    };
    match Location::parse(locator)? {
        Location::Local(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
            std::fs::write(&path, bytes).map_err(write_err)
        }
        Location::Gcs { bucket, object } => {
            GcsClient::from_env()?.upload(&bucket, &object, bytes)
        }
    }
}

// ---------------------------------------------------------------------------
// Cloud Storage client
// ---------------------------------------------------------------------------

pub struct GcsClient {
    http: reqwest::blocking::Client,
    base_url: String,
    token: Option<String>,
}

impl GcsClient {
    pub fn from_env() -> Result<Self, IoError> {
        let base_url = match std::env::var(EMULATOR_ENV) {
            Ok(host) if !host.trim().is_empty() => {
                let host = host.trim();
                if host.contains("://") {
                    host.to_string()
                } else {
                    format!("http://{host}")
                }
            }
            _ => DEFAULT_ENDPOINT.to_string(),
        };
        let token = std::env::var(TOKEN_ENV).ok().filter(|t| !t.trim().is_empty());
        Self::with_base_url(base_url, token)
    }

    pub fn with_base_url(base_url: String, token: Option<String>) -> Result<Self, IoError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| IoError::InvalidLocator(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, IoError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| IoError::InvalidLocator(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| IoError::InvalidLocator(format!("{}: not a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(
        &self,
        req: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    pub fn download(&self, bucket: &str, object: &str) -> Result<Vec<u8>, IoError> {
        let locator = format!("gs://{bucket}/{object}");
        let mut url = self.endpoint(&["storage", "v1", "b", bucket, "o", object])?;
        url.query_pairs_mut().append_pair("alt", "media");

        let read_err = |message: String| IoError::Read {
            locator: locator.clone(),
            message,
        };
        let resp = self
            .authorize(self.http.get(url))
            .send()
            .map_err(|e| read_err(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(IoError::NotFound(locator.clone()));
        }
        if !status.is_success() {
            return Err(read_err(format!("HTTP {}", status.as_u16())));
        }
        resp.bytes()
            .map(|b| b.to_vec())
            .map_err(|e| read_err(e.to_string()))
    }

    pub fn upload(&self, bucket: &str, object: &str, bytes: &[u8]) -> Result<(), IoError> {
        let locator = format!("gs://{bucket}/{object}");
        let mut url = self.endpoint(&["upload", "storage", "v1", "b", bucket, "o"])?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", object);

        let write_err = |message: String| IoError::Write {
            locator: locator.clone(),
            message,
        };
        let resp = self
            .authorize(self.http.post(url))
            .header(reqwest::header::CONTENT_TYPE, content_type(object))
            .body(bytes.to_vec())
            .send()
            .map_err(|e| write_err(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(write_err(format!("HTTP {}", resp.status().as_u16())));
        }
        Ok(())
    }
}

fn content_type(object: &str) -> &'static str {
    match object.rsplit('.').next().map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn parse_locations() {
        assert_eq!(
            Location::parse("gs://bucket/a/b.csv").unwrap(),
            Location::Gcs {
                bucket: "bucket".into(),
                object: "a/b.csv".into()
            }
        );
        assert_eq!(
            Location::parse("./data/p.csv").unwrap(),
            Location::Local(PathBuf::from("./data/p.csv"))
        );
        assert!(Location::parse("gs://bucket").is_err());
        assert!(Location::parse("gs:///x").is_err());
    }

    #[test]
    fn join_keeps_scheme() {
        assert_eq!(join("gs://b/out/", "r.xlsx"), "gs://b/out/r.xlsx");
        assert_eq!(join("out", "r.xlsx"), Path::new("out").join("r.xlsx").to_string_lossy());
        assert_eq!(file_name("gs://b/out/r.xlsx"), "r.xlsx");
    }

    #[test]
    fn local_roundtrip_creates_parents() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nested/deeper/out.csv");
        let locator = target.to_string_lossy().into_owned();
        write_bytes(&locator, b"a,b\n").unwrap();
        assert_eq!(read_bytes(&locator).unwrap(), b"a,b\n");
    }

    #[test]
    fn local_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let locator = dir.path().join("nope.csv").to_string_lossy().into_owned();
        assert!(matches!(read_bytes(&locator), Err(IoError::NotFound(_))));
    }

    #[test]
    fn gcs_download_sends_bearer_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path_includes("/storage/v1/b/bucket/o/")
                .query_param("alt", "media")
                .header("Authorization", "Bearer tok");
            then.status(200).body("Invoice No.\nINV1\n");
        });

        let client = GcsClient::with_base_url(server.base_url(), Some("tok".into())).unwrap();
        let bytes = client.download("bucket", "reports/p.csv").unwrap();

        mock.assert();
        assert_eq!(bytes, b"Invoice No.\nINV1\n");
    }

    #[test]
    fn gcs_404_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path_includes("/storage/v1/b/bucket/o/");
            then.status(404);
        });

        let client = GcsClient::with_base_url(server.base_url(), None).unwrap();
        let err = client.download("bucket", "missing.csv").unwrap_err();
        assert!(matches!(err, IoError::NotFound(ref l) if l == "gs://bucket/missing.csv"));
    }

    #[test]
    fn gcs_upload_uses_media_upload() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/upload/storage/v1/b/bucket/o")
                .query_param("uploadType", "media")
                .query_param("name", "out/consolidated_report.csv")
                .header("content-type", "text/csv");
            then.status(200).json_body(serde_json::json!({"name": "out/consolidated_report.csv"}));
        });

        let client = GcsClient::with_base_url(server.base_url(), Some("tok".into())).unwrap();
        client
            .upload("bucket", "out/consolidated_report.csv", b"a\n")
            .unwrap();
        mock.assert();
    }

    #[test]
    fn gcs_server_error_is_read_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path_includes("/storage/v1/b/");
            then.status(500);
        });
        let client = GcsClient::with_base_url(server.base_url(), None).unwrap();
        let err = client.download("bucket", "x.csv").unwrap_err();
        assert!(err.to_string().contains("HTTP 500"));
    }
}
