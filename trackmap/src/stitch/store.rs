//! Storage for composited tiles between compositing and stitching.
//!
//! Tiles are kept already compressed (PNG), keyed by their row-major index.
//! [`MemoryTileStore`] holds the bytes in memory; [`DiskTileStore`] spills
//! them to a private temporary directory that disappears with the store.
//! [`SpillingTileStore`] starts in memory and moves to disk once the tiles
//! outgrow a byte threshold.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::DEFAULT_SPILL_THRESHOLD_MB;

/// Errors raised by tile stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Tile {0} was never stored")]
    Missing(usize),

    #[error("Tile store I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Where composited tiles are kept.
///
/// The default keeps tiles in memory up to
/// [`DEFAULT_SPILL_THRESHOLD_MB`] and on disk beyond.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Disk,
    /// Memory until the stored tiles exceed `threshold_bytes`, disk after.
    Spill { threshold_bytes: u64 },
}

impl Default for StoreKind {
    fn default() -> Self {
        StoreKind::spill_above_mb(DEFAULT_SPILL_THRESHOLD_MB)
    }
}

impl StoreKind {
    /// Spilling store with a threshold in mebibytes.
    pub fn spill_above_mb(megabytes: u64) -> Self {
        StoreKind::Spill {
            threshold_bytes: megabytes.saturating_mul(1024 * 1024),
        }
    }

    /// Creates an empty store of this kind.
    pub fn create(&self) -> Result<Box<dyn TileStore>, StoreError> {
        Ok(match self {
            StoreKind::Memory => Box::new(MemoryTileStore::new()),
            StoreKind::Disk => Box::new(DiskTileStore::new()?),
            StoreKind::Spill { threshold_bytes } => {
                Box::new(SpillingTileStore::new(*threshold_bytes))
            }
        })
    }
}

/// Keyed storage of encoded tiles.
///
/// Readers returned by [`TileStore::open`] are independent, so several
/// tiles can be streamed interleaved.
pub trait TileStore: Send {
    /// Stores the encoded tile for `index`, replacing any previous one.
    fn put(&mut self, index: usize, encoded: Vec<u8>) -> Result<(), StoreError>;

    /// Opens the encoded tile for `index`.
    fn open(&self, index: usize) -> Result<Box<dyn Read + '_>, StoreError>;

    /// Number of stored tiles.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total encoded size of all stored tiles.
    fn stored_bytes(&self) -> u64;

    /// Removes every tile.
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// Tiles kept in memory.
#[derive(Debug, Default)]
pub struct MemoryTileStore {
    tiles: BTreeMap<usize, Vec<u8>>,
}

impl MemoryTileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TileStore for MemoryTileStore {
    fn put(&mut self, index: usize, encoded: Vec<u8>) -> Result<(), StoreError> {
        debug!(index, bytes = encoded.len(), "Storing tile in memory");
        self.tiles.insert(index, encoded);
        Ok(())
    }

    fn open(&self, index: usize) -> Result<Box<dyn Read + '_>, StoreError> {
        let bytes = self.tiles.get(&index).ok_or(StoreError::Missing(index))?;
        Ok(Box::new(Cursor::new(bytes.as_slice())))
    }

    fn len(&self) -> usize {
        self.tiles.len()
    }

    fn stored_bytes(&self) -> u64 {
        self.tiles.values().map(|t| t.len() as u64).sum()
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.tiles.clear();
        Ok(())
    }
}

/// Tiles spilled to files in a temporary directory.
#[derive(Debug)]
pub struct DiskTileStore {
    dir: TempDir,
    tiles: BTreeMap<usize, u64>,
}

impl DiskTileStore {
    /// Creates a store in the system temporary directory.
    pub fn new() -> Result<Self, StoreError> {
        let dir = tempfile::Builder::new().prefix("trackmap-tiles-").tempdir()?;
        Ok(Self::with_dir(dir))
    }

    /// Creates a store below `parent`.
    pub fn new_in(parent: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = tempfile::Builder::new()
            .prefix("trackmap-tiles-")
            .tempdir_in(parent)?;
        Ok(Self::with_dir(dir))
    }

    fn with_dir(dir: TempDir) -> Self {
        debug!(path = %dir.path().display(), "Created disk tile store");
        Self {
            dir,
            tiles: BTreeMap::new(),
        }
    }

    /// Directory holding the spill files.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn tile_path(&self, index: usize) -> PathBuf {
        self.dir.path().join(format!("tile-{:06}.png", index))
    }

    fn write(&mut self, index: usize, encoded: &[u8]) -> Result<(), StoreError> {
        let path = self.tile_path(index);
        fs::write(&path, encoded)?;
        debug!(index, bytes = encoded.len(), path = %path.display(), "Spilled tile to disk");
        self.tiles.insert(index, encoded.len() as u64);
        Ok(())
    }
}

impl TileStore for DiskTileStore {
    fn put(&mut self, index: usize, encoded: Vec<u8>) -> Result<(), StoreError> {
        self.write(index, &encoded)
    }

    fn open(&self, index: usize) -> Result<Box<dyn Read + '_>, StoreError> {
        if !self.tiles.contains_key(&index) {
            return Err(StoreError::Missing(index));
        }
        let file = File::open(self.tile_path(index))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn len(&self) -> usize {
        self.tiles.len()
    }

    fn stored_bytes(&self) -> u64 {
        self.tiles.values().sum()
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        for index in self.tiles.keys() {
            fs::remove_file(self.tile_path(*index))?;
        }
        self.tiles.clear();
        Ok(())
    }
}

/// Tiles kept in memory until their encoded size passes a threshold.
///
/// The first tile that takes the total past the threshold moves every
/// stored tile to a [`DiskTileStore`]; later tiles go straight to disk.
#[derive(Debug)]
pub struct SpillingTileStore {
    threshold_bytes: u64,
    spill_parent: Option<PathBuf>,
    backing: Backing,
}

#[derive(Debug)]
enum Backing {
    Memory(MemoryTileStore),
    Disk(DiskTileStore),
}

impl SpillingTileStore {
    /// Spills to the system temporary directory.
    pub fn new(threshold_bytes: u64) -> Self {
        Self {
            threshold_bytes,
            spill_parent: None,
            backing: Backing::Memory(MemoryTileStore::new()),
        }
    }

    /// Spills below `parent` instead of the system temporary directory.
    pub fn spilling_into(mut self, parent: impl Into<PathBuf>) -> Self {
        self.spill_parent = Some(parent.into());
        self
    }

    pub fn threshold_bytes(&self) -> u64 {
        self.threshold_bytes
    }

    /// Whether tiles have moved to disk.
    pub fn is_spilled(&self) -> bool {
        matches!(self.backing, Backing::Disk(_))
    }

    fn store(&self) -> &dyn TileStore {
        match &self.backing {
            Backing::Memory(memory) => memory,
            Backing::Disk(disk) => disk,
        }
    }

    fn spill(&mut self) -> Result<(), StoreError> {
        let Backing::Memory(memory) = &self.backing else {
            return Ok(());
        };
        let mut disk = match &self.spill_parent {
            Some(parent) => DiskTileStore::new_in(parent)?,
            None => DiskTileStore::new()?,
        };
        for (index, encoded) in &memory.tiles {
            disk.write(*index, encoded)?;
        }
        info!(
            tiles = disk.len(),
            bytes = disk.stored_bytes(),
            threshold = self.threshold_bytes,
            path = %disk.path().display(),
            "Tile store outgrew memory; moved tiles to disk"
        );
        self.backing = Backing::Disk(disk);
        Ok(())
    }
}

impl TileStore for SpillingTileStore {
    fn put(&mut self, index: usize, encoded: Vec<u8>) -> Result<(), StoreError> {
        match &mut self.backing {
            Backing::Memory(memory) => {
                memory.put(index, encoded)?;
                if memory.stored_bytes() > self.threshold_bytes {
                    self.spill()?;
                }
                Ok(())
            }
            Backing::Disk(disk) => disk.put(index, encoded),
        }
    }

    fn open(&self, index: usize) -> Result<Box<dyn Read + '_>, StoreError> {
        self.store().open(index)
    }

    fn len(&self) -> usize {
        self.store().len()
    }

    fn stored_bytes(&self) -> u64 {
        self.store().stored_bytes()
    }

    /// Empties the store and returns it to memory.
    fn clear(&mut self) -> Result<(), StoreError> {
        match &mut self.backing {
            Backing::Memory(memory) => memory.clear(),
            Backing::Disk(disk) => {
                disk.clear()?;
                self.backing = Backing::Memory(MemoryTileStore::new());
                Ok(())
            }
        }
    }
}
