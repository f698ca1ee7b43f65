//! Raster tile source and in-memory tile texture cache

use super::projection::TileId;
use crate::constants::*;
use eframe::egui;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

#[derive(Debug, Error)]
pub enum TileError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

/// Templated tile endpoint with its required attribution
#[derive(Debug, Clone)]
pub struct TileSource {
    pub url_template: String,
    pub attribution: String,
    pub attribution_url: String,
}

impl TileSource {
    pub fn new(
        url_template: impl Into<String>,
        attribution: impl Into<String>,
        attribution_url: impl Into<String>,
    ) -> Self {
        Self {
            url_template: url_template.into(),
            attribution: attribution.into(),
            attribution_url: attribution_url.into(),
        }
    }

    pub fn tile_url(&self, tile: TileId) -> String {
        let subdomain = TILE_SUBDOMAINS[(tile.x + tile.y) as usize % TILE_SUBDOMAINS.len()];
        self.url_template
            .replace("{s}", subdomain)
            .replace("{z}", &tile.zoom.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
    }
}

enum TileSlot {
    Pending,
    Ready(egui::TextureHandle),
}

struct CachedTile {
    slot: TileSlot,
    last_used: u64,
}

type Inbox = Arc<Mutex<Vec<(TileId, Result<egui::ColorImage, TileError>)>>>;

/// Fetches tiles on the runtime and keeps decoded textures in an LRU cache.
/// Tiles are never written to disk.
pub struct TileCache {
    source: TileSource,
    client: reqwest::Client,
    runtime: tokio::runtime::Handle,
    semaphore: Arc<tokio::sync::Semaphore>,
    cancel: CancellationToken,
    inbox: Inbox,
    tiles: HashMap<TileId, CachedTile>,
    // Never evicted, so a failed tile is not fetched again this session
    failed: HashSet<TileId>,
    capacity: usize,
    frame: u64,
}

impl TileCache {
    pub fn new(source: TileSource, runtime: tokio::runtime::Handle) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            source,
            client,
            runtime,
            semaphore: Arc::new(tokio::sync::Semaphore::new(TILE_FETCH_CONCURRENCY)),
            cancel: CancellationToken::new(),
            inbox: Arc::new(Mutex::new(Vec::new())),
            tiles: HashMap::new(),
            failed: HashSet::new(),
            capacity: TILE_CACHE_CAPACITY,
            frame: 0,
        })
    }

    pub fn source(&self) -> &TileSource {
        &self.source
    }

    /// Move finished downloads into textures. Call once per frame before drawing.
    pub fn poll(&mut self, ctx: &egui::Context) {
        self.frame += 1;
        let delivered = std::mem::take(&mut *self.inbox.lock());
        for (tile, result) in delivered {
            match result {
                Ok(image) => {
                    let Some(entry) = self.tiles.get_mut(&tile) else {
                        continue;
                    };
                    let name = format!("tile-{}-{}-{}", tile.zoom, tile.x, tile.y);
                    entry.slot = TileSlot::Ready(ctx.load_texture(name, image, egui::TextureOptions::LINEAR));
                }
                Err(e) => {
                    debug!(zoom = tile.zoom, x = tile.x, y = tile.y, error = %e, "Tile failed");
                    self.tiles.remove(&tile);
                    self.failed.insert(tile);
                }
            }
        }
        self.evict();
    }

    /// Texture for a tile, starting a download the first time it is asked for
    pub fn get(&mut self, ctx: &egui::Context, tile: TileId) -> Option<egui::TextureHandle> {
        if self.failed.contains(&tile) {
            return None;
        }
        let frame = self.frame;
        if let Some(entry) = self.tiles.get_mut(&tile) {
            entry.last_used = frame;
            return match &entry.slot {
                TileSlot::Ready(tex) => Some(tex.clone()),
                TileSlot::Pending => None,
            };
        }

        self.tiles.insert(
            tile,
            CachedTile {
                slot: TileSlot::Pending,
                last_used: frame,
            },
        );
        self.spawn_fetch(ctx, tile);
        None
    }

    fn spawn_fetch(&self, ctx: &egui::Context, tile: TileId) {
        let url = self.source.tile_url(tile);
        let client = self.client.clone();
        let sem = self.semaphore.clone();
        let inbox = self.inbox.clone();
        let token = self.cancel.clone();
        let ctx = ctx.clone();

        trace!(%url, "Fetching tile");
        self.runtime.spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => return,
                result = async {
                    let _permit = sem.acquire().await.ok();
                    fetch_tile(&client, &url).await
                } => result,
            };
            inbox.lock().push((tile, result));
            ctx.request_repaint();
        });
    }

    /// Drop least recently used tiles beyond capacity. Pending tiles stay so their
    /// deliveries still land.
    fn evict(&mut self) {
        if self.tiles.len() <= self.capacity {
            return;
        }
        let mut candidates: Vec<(TileId, u64)> = self
            .tiles
            .iter()
            .filter(|(_, t)| matches!(t.slot, TileSlot::Ready(_)))
            .map(|(id, t)| (*id, t.last_used))
            .collect();
        candidates.sort_by_key(|(_, used)| *used);
        let excess = self.tiles.len() - self.capacity;
        for (id, _) in candidates.into_iter().take(excess) {
            self.tiles.remove(&id);
        }
    }

    /// Cancel all in-flight downloads
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

async fn fetch_tile(client: &reqwest::Client, url: &str) -> Result<egui::ColorImage, TileError> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(TileError::Status(response.status()));
    }
    let bytes = response.bytes().await?;
    let rgba = image::load_from_memory(&bytes)?.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_url_template() {
        let source = TileSource::new(TILE_URL, TILE_ATTRIBUTION, TILE_ATTRIBUTION_URL);
        let url = source.tile_url(TileId { zoom: 13, x: 4093, y: 2724 });
        assert_eq!(url, "https://tile.openstreetmap.org/13/4093/2724.png");
    }

    #[test]
    fn test_tile_url_subdomains_rotate() {
        let source = TileSource::new("https://{s}.tile.example.org/{z}/{x}/{y}.png", "", "");
        let a = source.tile_url(TileId { zoom: 1, x: 0, y: 0 });
        let b = source.tile_url(TileId { zoom: 1, x: 1, y: 0 });
        assert_eq!(a, "https://a.tile.example.org/1/0/0.png");
        assert_eq!(b, "https://b.tile.example.org/1/1/0.png");
    }

    fn offline_cache(runtime: &tokio::runtime::Runtime) -> TileCache {
        let source = TileSource::new("http://127.0.0.1:9/{z}/{x}/{y}.png", "", "");
        let cache = TileCache::new(source, runtime.handle().clone()).unwrap();
        cache.shutdown();
        cache
    }

    #[test]
    fn test_cache_evicts_least_recently_used() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut cache = offline_cache(&runtime);
        cache.capacity = 2;

        let ctx = egui::Context::default();
        for x in 0..3 {
            let texture = ctx.load_texture(
                format!("tile-{x}"),
                egui::ColorImage::new([1, 1], egui::Color32::WHITE),
                egui::TextureOptions::LINEAR,
            );
            cache.tiles.insert(
                TileId { zoom: 2, x, y: 0 },
                CachedTile {
                    slot: TileSlot::Ready(texture),
                    last_used: x as u64,
                },
            );
        }
        cache.evict();
        assert_eq!(cache.tiles.len(), 2);
        assert!(!cache.tiles.contains_key(&TileId { zoom: 2, x: 0, y: 0 }));
    }

    #[test]
    fn test_failed_tiles_not_fetched_again() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut cache = offline_cache(&runtime);
        cache.capacity = 1;

        let ctx = egui::Context::default();
        let first = TileId { zoom: 3, x: 1, y: 1 };
        let second = TileId { zoom: 3, x: 2, y: 1 };
        for tile in [first, second] {
            cache.tiles.insert(
                tile,
                CachedTile {
                    slot: TileSlot::Pending,
                    last_used: 0,
                },
            );
            cache
                .inbox
                .lock()
                .push((tile, Err(TileError::Status(reqwest::StatusCode::NOT_FOUND))));
        }
        cache.poll(&ctx);
        assert!(cache.tiles.is_empty());

        // Asking again must neither hand out a texture nor start a new fetch
        assert!(cache.get(&ctx, first).is_none());
        assert!(cache.get(&ctx, second).is_none());
        assert!(cache.tiles.is_empty());
        assert!(cache.failed.contains(&first) && cache.failed.contains(&second));
    }
}
