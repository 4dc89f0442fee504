/// Background mesh fetching
///
/// Fetch and parse run on a worker thread; results come back over a channel
/// tagged with the generation of the session that requested them, so the
/// main loop can drop results that outlived their scene.
use std::io::Read;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread;

use tracing::debug;

use mv3d_core::{stl, Mesh};

pub struct FetchResult {
    pub generation: u64,
    pub url: String,
    pub outcome: Result<Mesh, String>,
}

pub struct MeshFetcher {
    tx: Sender<FetchResult>,
    rx: Receiver<FetchResult>,
}

impl MeshFetcher {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self { tx, rx }
    }

    /// Start fetching `url` on a worker thread
    pub fn spawn(&self, url: String, generation: u64) {
        let tx = self.tx.clone();
        thread::spawn(move || {
            let outcome = fetch_and_parse(&url);
            // The receiver may already be gone on shutdown
            let _ = tx.send(FetchResult {
                generation,
                url,
                outcome,
            });
        });
    }

    /// Non-blocking poll for a completed fetch
    pub fn try_recv(&self) -> Option<FetchResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

impl Default for MeshFetcher {
    fn default() -> Self {
        Self::new()
    }
}

fn fetch_and_parse(url: &str) -> Result<Mesh, String> {
    let bytes = if url.starts_with("http://") || url.starts_with("https://") {
        fetch_remote(url)?
    } else {
        // Local paths are read directly so the viewer works without a server
        std::fs::read(url).map_err(|e| format!("failed to read {url}: {e}"))?
    };

    debug!("fetched {} bytes from {url}", bytes.len());
    stl::parse_stl(&bytes)
}

fn fetch_remote(url: &str) -> Result<Vec<u8>, String> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| format!("failed to fetch {url}: {e}"))?;

    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|e| format!("failed to read response from {url}: {e}"))?;
    Ok(bytes)
}
