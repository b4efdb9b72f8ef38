use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_aux::prelude::*;
use tokio::process::Command;
use tracing::debug;
use url::Url;

use crate::error::ExtractError;
use crate::{guess_ext, MediaCandidate};

/// Options for a single resolver invocation.
#[derive(SmartDefault, Clone, Debug)]
pub struct ResolveOptions {
    /// yt-dlp format selector
    pub format: Option<String>,
    /// extra request headers, `(name, value)`
    pub headers: Vec<(String, String)>,
    /// browser to borrow a session from
    pub identity: Option<String>,
    pub user_agent: Option<String>,
    #[default(Duration::from_secs(45))]
    pub timeout: Duration,
}

/// What the resolver knows about a URL.
#[derive(Default, PartialEq, Clone, Debug)]
pub struct ResolvedMedia {
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub duration: Option<f64>,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
    pub webpage_url: Option<String>,
    pub view_count: Option<u64>,
    /// url of the format the selector picked, if any
    pub url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub formats: Vec<MediaCandidate>,
}

impl ResolvedMedia {
    /// The single format the selector picked, if it picked one.
    pub fn picked(&self) -> Option<MediaCandidate> {
        let url = self.url.as_ref()?;
        Some(
            self.formats
                .iter()
                .find(|f| &f.url == url)
                .cloned()
                .unwrap_or_else(|| MediaCandidate {
                    width: self.width,
                    height: self.height,
                    ..MediaCandidate::from_url(url)
                }),
        )
    }

    /// The candidate the format selector picked, else every format.
    pub fn selected(&self) -> Vec<MediaCandidate> {
        match self.picked() {
            Some(picked) => vec![picked],
            None => self.formats.clone(),
        }
    }
}

/// The General Media Resolver seam.
#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn resolve(&self, url: &Url, options: &ResolveOptions) -> Result<ResolvedMedia, ExtractError>;
}

pub mod dump {
    //! Shape of `yt-dlp --dump-json`.
    use super::*;

    #[derive(Deserialize, Clone, Debug)]
    pub struct Thumbnail {
        pub url: String,
    }

    #[derive(Deserialize, Default, Clone, Debug)]
    #[serde(default)]
    pub struct Format {
        pub format_id: Option<String>,
        pub url: Option<String>,
        pub ext: Option<String>,
        pub protocol: Option<String>,
        pub width: Option<u32>,
        pub height: Option<u32>,
        /// total bitrate, kbps
        pub tbr: Option<f64>,
        pub vcodec: Option<String>,
        pub acodec: Option<String>,
        #[serde(deserialize_with = "deserialize_option_number_from_string")]
        pub filesize: Option<u64>,
        pub filesize_approx: Option<f64>,
    }

    #[derive(Deserialize, Default, Clone, Debug)]
    #[serde(default)]
    pub struct Info {
        pub title: Option<String>,
        pub uploader: Option<String>,
        pub duration: Option<f64>,
        pub thumbnail: Option<String>,
        pub thumbnails: Vec<Thumbnail>,
        pub description: Option<String>,
        pub webpage_url: Option<String>,
        #[serde(deserialize_with = "deserialize_option_number_from_string")]
        pub view_count: Option<u64>,
        #[serde(flatten)]
        pub selected: Format,
        #[serde(deserialize_with = "deserialize_default_from_null")]
        pub formats: Vec<Format>,
    }

    fn codec(raw: Option<String>) -> Option<String> {
        raw.filter(|c| c != "none" && !c.is_empty())
    }

    impl Format {
        pub fn into_candidate(self) -> Option<MediaCandidate> {
            let url = self.url?;
            // no codec info at all: assume a video track, never an audio one
            let unprobed = self.vcodec.is_none() && self.acodec.is_none();
            let (codec_video, codec_audio) = if unprobed {
                (Some("unknown".to_string()), None)
            } else {
                (codec(self.vcodec), codec(self.acodec))
            };
            Some(MediaCandidate {
                container_ext: self.ext.unwrap_or_else(|| guess_ext(&url)),
                protocol: self.protocol.unwrap_or_default(),
                width: self.width,
                height: self.height,
                bitrate: self.tbr,
                codec_video,
                codec_audio,
                filesize_bytes: self.filesize.or(self.filesize_approx.map(|f| f as u64)),
                url,
            })
        }
    }

    impl From<Info> for ResolvedMedia {
        fn from(info: Info) -> Self {
            let thumbnail = info
                .thumbnail
                .or_else(|| info.thumbnails.last().map(|t| t.url.clone()));
            ResolvedMedia {
                title: info.title,
                uploader: info.uploader,
                duration: info.duration,
                thumbnail,
                description: info.description,
                webpage_url: info.webpage_url,
                view_count: info.view_count,
                url: info.selected.url.clone(),
                width: info.selected.width,
                height: info.selected.height,
                formats: info
                    .formats
                    .into_iter()
                    .filter_map(Format::into_candidate)
                    .collect(),
            }
        }
    }
}

const LOCKED_IDENTITY_MARKERS: &[&str] = &["could not copy", "permission denied", "database is locked"];

/// Runs a yt-dlp executable per request.
pub struct YtDlpResolver {
    program: String,
    proxy: Option<String>,
}

impl YtDlpResolver {
    pub fn new(program: &str, proxy: Option<String>) -> Self {
        YtDlpResolver {
            program: program.to_string(),
            proxy,
        }
    }

    pub fn build_args(&self, url: &Url, options: &ResolveOptions) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "--dump-json".into(),
            "--no-playlist".into(),
            "--no-warnings".into(),
            "--socket-timeout".into(),
            options.timeout.as_secs().max(1).to_string(),
        ];
        if let Some(format) = &options.format {
            args.push("--format".into());
            args.push(format.clone());
        }
        if let Some(ua) = &options.user_agent {
            args.push("--user-agent".into());
            args.push(ua.clone());
        }
        for (name, value) in &options.headers {
            args.push("--add-header".into());
            args.push(format!("{name}:{value}"));
        }
        if let Some(browser) = &options.identity {
            args.push("--cookies-from-browser".into());
            args.push(browser.clone());
        }
        if let Some(proxy) = &self.proxy {
            args.push("--proxy".into());
            args.push(proxy.clone());
        }
        args.push("--".into());
        args.push(url.to_string());
        args
    }
}

/// The most telling line of yt-dlp's stderr.
pub fn error_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .map(|l| l.trim_start_matches("ERROR:").trim().to_string())
        .unwrap_or_else(|| stderr.trim().to_string())
}

#[async_trait]
impl MediaResolver for YtDlpResolver {
    async fn resolve(&self, url: &Url, options: &ResolveOptions) -> Result<ResolvedMedia, ExtractError> {
        let args = self.build_args(url, options);
        debug!(program = %self.program, ?args, "running resolver");
        // the caller bounds the wait; dropping the future kills the child
        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ExtractError::ResolverUnavailable(format!("{}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if let Some(source_name) = &options.identity {
                let lowered = stderr.to_lowercase();
                if LOCKED_IDENTITY_MARKERS.iter().any(|m| lowered.contains(m)) {
                    return Err(ExtractError::IdentityLocked {
                        source_name: source_name.clone(),
                        detail: error_line(&stderr),
                    });
                }
            }
            return Err(ExtractError::Resolver(error_line(&stderr)));
        }

        parse_dump(&output.stdout)
    }
}

/// Parses the first JSON document yt-dlp printed, skipping any chatter before it.
pub fn parse_dump(stdout: &[u8]) -> Result<ResolvedMedia, ExtractError> {
    let text = String::from_utf8_lossy(stdout);
    let no_metadata = || ExtractError::Resolver("resolver printed no metadata".to_string());
    let start = text.find('{').ok_or_else(no_metadata)?;
    let info = serde_json::Deserializer::from_str(&text[start..])
        .into_iter::<dump::Info>()
        .next()
        .ok_or_else(no_metadata)??;
    Ok(info.into())
}
