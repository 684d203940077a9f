//! In-memory stand-ins for the YouTube API and the subtitle downloader.

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};

use crate::{
    error::{PlotlineError, Result},
    transcript::CaptionDownloader,
    youtube::{
        ChannelHit, ChannelInfo, PlaylistEntry, PlaylistPage, VIDEO_KIND, VideoItem, YoutubeApi,
    },
};

pub fn quota_error() -> PlotlineError {
    PlotlineError::Remote {
        status: 403,
        message: "The request cannot be completed because you have exceeded your quota."
            .to_string(),
        reasons: vec!["quotaExceeded".to_string()],
    }
}

fn backend_error() -> PlotlineError {
    PlotlineError::Remote {
        status: 500,
        message: "Backend Error".to_string(),
        reasons: vec!["backendError".to_string()],
    }
}

#[derive(Default)]
pub struct FakeYoutube {
    searches: HashMap<String, Vec<String>>,
    channels: HashMap<String, ChannelInfo>,
    uploads: HashMap<String, Vec<Vec<String>>>,
    videos: HashMap<String, VideoItem>,
    comments: HashMap<String, Vec<String>>,
    exhausted_keys: HashSet<String>,
    failing_page: Option<usize>,
    failing_stats: bool,
    failing_comments: bool,
    calls: Cell<usize>,
    stats_requests: RefCell<Vec<String>>,
    keys_used: RefCell<Vec<String>>,
}

impl FakeYoutube {
    pub fn with_search(mut self, query: &str, channel_ids: &[&str]) -> Self {
        self.searches.insert(
            query.to_string(),
            channel_ids.iter().map(|id| id.to_string()).collect(),
        );
        self
    }

    pub fn with_channel(
        mut self,
        id: &str,
        title: &str,
        custom_url: Option<&str>,
        uploads: Option<&str>,
    ) -> Self {
        self.channels.insert(
            id.to_string(),
            ChannelInfo {
                id: id.to_string(),
                title: title.to_string(),
                custom_url: custom_url.map(str::to_string),
                uploads_playlist_id: uploads.map(str::to_string),
            },
        );
        self
    }

    /// Upload listing split into pages of video ids.
    pub fn with_uploads(mut self, playlist_id: &str, pages: &[&[&str]]) -> Self {
        self.uploads.insert(
            playlist_id.to_string(),
            pages
                .iter()
                .map(|page| page.iter().map(|id| id.to_string()).collect())
                .collect(),
        );
        self
    }

    pub fn with_video(mut self, id: &str, channel: &str, views: u64) -> Self {
        self.videos.insert(
            id.to_string(),
            VideoItem {
                id: id.to_string(),
                title: Some(format!("Video {id}")),
                channel_title: Some(channel.to_string()),
                description: Some(format!("About {id}")),
                published_at: DateTime::<Utc>::from_timestamp(1_700_000_000, 0),
                view_count: Some(views),
            },
        );
        self
    }

    pub fn with_video_item(mut self, item: VideoItem) -> Self {
        self.videos.insert(item.id.clone(), item);
        self
    }

    pub fn with_comments(mut self, video_id: &str, comments: &[&str]) -> Self {
        self.comments.insert(
            video_id.to_string(),
            comments.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    pub fn with_exhausted_key(mut self, key: &str) -> Self {
        self.exhausted_keys.insert(key.to_string());
        self
    }

    pub fn with_failing_page(mut self, page: usize) -> Self {
        self.failing_page = Some(page);
        self
    }

    pub fn with_failing_stats(mut self) -> Self {
        self.failing_stats = true;
        self
    }

    pub fn with_failing_comments(mut self) -> Self {
        self.failing_comments = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Every id passed to `videos`, in request order.
    pub fn stats_requests(&self) -> Vec<String> {
        self.stats_requests.borrow().clone()
    }

    pub fn keys_used(&self) -> Vec<String> {
        self.keys_used.borrow().clone()
    }

    fn enter(&self, key: &str) -> Result<()> {
        self.calls.set(self.calls.get() + 1);
        self.keys_used.borrow_mut().push(key.to_string());
        if self.exhausted_keys.contains(key) {
            return Err(quota_error());
        }
        Ok(())
    }
}

impl YoutubeApi for FakeYoutube {
    async fn search_channels(
        &self,
        key: &str,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<ChannelHit>> {
        self.enter(key)?;
        Ok(self
            .searches
            .get(query)
            .into_iter()
            .flatten()
            .take(max_results as usize)
            .map(|id| ChannelHit {
                channel_id: id.clone(),
                title: self
                    .channels
                    .get(id)
                    .map(|c| c.title.clone())
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn channel(&self, key: &str, channel_id: &str) -> Result<Option<ChannelInfo>> {
        self.enter(key)?;
        Ok(self.channels.get(channel_id).cloned())
    }

    async fn playlist_page(
        &self,
        key: &str,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistPage> {
        self.enter(key)?;
        let index = page_token
            .and_then(|t| t.strip_prefix('p'))
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(0);
        if self.failing_page == Some(index) {
            return Err(backend_error());
        }

        let pages = self.uploads.get(playlist_id).cloned().unwrap_or_default();
        let items = pages
            .get(index)
            .into_iter()
            .flatten()
            .map(|id| PlaylistEntry {
                video_id: Some(id.clone()),
                kind: Some(VIDEO_KIND.to_string()),
                title: format!("Video {id}"),
                published_at: self.videos.get(id).and_then(|v| v.published_at),
            })
            .collect();
        let next_page_token = (index + 1 < pages.len()).then(|| format!("p{}", index + 1));

        Ok(PlaylistPage {
            items,
            next_page_token,
        })
    }

    async fn videos(&self, key: &str, ids: &[String]) -> Result<Vec<VideoItem>> {
        self.enter(key)?;
        self.stats_requests.borrow_mut().extend(ids.iter().cloned());
        if self.failing_stats {
            return Err(backend_error());
        }
        Ok(ids
            .iter()
            .filter_map(|id| self.videos.get(id).cloned())
            .collect())
    }

    async fn top_comments(
        &self,
        key: &str,
        video_id: &str,
        max_results: u32,
    ) -> Result<Vec<String>> {
        self.enter(key)?;
        if self.failing_comments {
            return Err(PlotlineError::Remote {
                status: 403,
                message: "The video has disabled comments.".to_string(),
                reasons: vec!["commentsDisabled".to_string()],
            });
        }
        Ok(self
            .comments
            .get(video_id)
            .into_iter()
            .flatten()
            .take(max_results as usize)
            .cloned()
            .collect())
    }
}

/// What the fake downloader does when invoked.
#[derive(Clone)]
pub enum Download {
    /// Writes this VTT body to `<base>.<lang>.vtt`.
    Lang(String),
    /// Writes this VTT body to `<base>.vtt`.
    Generic(String),
    /// Produces nothing, as when a video has no captions.
    Nothing,
    /// Writes the body, then fails as if the process crashed.
    WriteThenFail(String),
}

pub struct FakeDownloader {
    pub behaviour: Download,
    pub written: RefCell<Vec<PathBuf>>,
}

impl FakeDownloader {
    pub fn new(behaviour: Download) -> Self {
        Self {
            behaviour,
            written: RefCell::new(Vec::new()),
        }
    }

    fn write(&self, output_template: &Path, suffix: &str, body: &str) -> Result<()> {
        let template = output_template.to_string_lossy();
        let path = PathBuf::from(template.replace(".%(ext)s", suffix));
        std::fs::write(&path, body)?;
        self.written.borrow_mut().push(path);
        Ok(())
    }
}

impl CaptionDownloader for FakeDownloader {
    async fn download(&self, video_url: &str, lang: &str, output_template: &Path) -> Result<()> {
        match &self.behaviour {
            Download::Lang(body) => self.write(output_template, &format!(".{lang}.vtt"), body),
            Download::Generic(body) => self.write(output_template, ".vtt", body),
            Download::Nothing => Ok(()),
            Download::WriteThenFail(body) => {
                self.write(output_template, &format!(".{lang}.vtt"), body)?;
                Err(PlotlineError::SubtitleFailed {
                    url: video_url.to_string(),
                    reason: "killed".to_string(),
                })
            }
        }
    }
}

/// Answers one HTTP request on a local port with a canned response.
///
/// Returns the base URL to point a client at and a handle resolving to the
/// raw request (head and body) that arrived.
pub async fn serve_once(status: u16, body: &str) -> (String, tokio::task::JoinHandle<String>) {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {status} Canned\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request_complete(&request) {
                break;
            }
        }
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&request).into_owned()
    });

    (format!("http://{addr}"), handle)
}

fn request_complete(request: &[u8]) -> bool {
    let Some(head_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let head = String::from_utf8_lossy(&request[..head_end]).to_lowercase();
    let body_len = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|len| len.trim().parse::<usize>().ok())
        .unwrap_or(0);
    request.len() >= head_end + 4 + body_len
}

/// An HTTP client that ignores proxy settings, for talking to [`serve_once`].
pub fn local_http() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
