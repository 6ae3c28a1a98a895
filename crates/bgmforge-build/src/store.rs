//! Checksum and loop sidecar store.
//!
//! Each source file gets two sidecars in the profile's cache directory, named
//! after the source file name (extension included):
//!
//! - `<file_name>.sum`: 16 raw bytes of BLAKE3 output over the file contents
//! - `<file_name>.loop`: the last applied loop points as `start\nend`
//!
//! The two are tracked independently so a loop edit never forces a re-encode
//! for codecs that keep loops outside the stream.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{ItemError, ItemResult};
use crate::music_data::LoopPoints;
use crate::profile::CodecKind;

/// Extension of checksum sidecars.
pub const CHECKSUM_EXTENSION: &str = "sum";
/// Extension of loop sidecars.
pub const LOOP_EXTENSION: &str = "loop";
/// Bytes of hash output stored per file.
pub const CHECKSUM_LEN: usize = 16;

/// Content checksum of one file.
pub type Checksum = [u8; CHECKSUM_LEN];

/// What the cache pass must do for one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// Run the encoder.
    Encode,
    /// Rewrite the loop lines of the cached TXTH only.
    RefreshLoop,
    /// Nothing to do.
    UpToDate,
}

/// Computes the content checksum of `path`.
pub fn checksum(path: &Path) -> io::Result<Checksum> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)?;
    let mut out = [0u8; CHECKSUM_LEN];
    hasher.finalize_xof().fill(&mut out);
    Ok(out)
}

/// `path` with `.ext` appended after any existing extension.
pub fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Sidecar records for one cache directory.
#[derive(Debug, Clone)]
pub struct SidecarStore {
    dir: PathBuf,
}

impl SidecarStore {
    /// Opens the store at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Cache directory backing this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn sidecar_path(&self, source: &Path, ext: &str) -> PathBuf {
        let file_name = source.file_name().unwrap_or(source.as_os_str());
        append_extension(&self.dir.join(file_name), ext)
    }

    /// Path of the checksum sidecar for `source`.
    pub fn checksum_path(&self, source: &Path) -> PathBuf {
        self.sidecar_path(source, CHECKSUM_EXTENSION)
    }

    /// Path of the loop sidecar for `source`.
    pub fn loop_path(&self, source: &Path) -> PathBuf {
        self.sidecar_path(source, LOOP_EXTENSION)
    }

    /// Whether `source` changed since its checksum was last recorded.
    ///
    /// A missing or stale record is replaced with the current checksum.
    pub fn needs_encode(&self, source: &Path) -> ItemResult<bool> {
        let current = checksum(source).map_err(|e| ItemError::io(source, e))?;
        let sum_path = self.checksum_path(source);

        let stored = match fs::read(&sum_path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(ItemError::io(&sum_path, e)),
        };

        let changed = match stored {
            None => {
                log::debug!("{}: new file, encoding required", source.display());
                true
            }
            Some(bytes) if bytes.as_slice() == current.as_slice() => {
                log::debug!("{}: checksum matches, encoding not required", source.display());
                false
            }
            Some(_) => {
                log::debug!("{}: checksum changed, re-encoding required", source.display());
                true
            }
        };

        if changed {
            fs::write(&sum_path, current).map_err(|e| ItemError::io(&sum_path, e))?;
        }
        Ok(changed)
    }

    /// Whether `points` differ from the last recorded loop for `source`.
    ///
    /// A missing, unreadable or stale record is replaced with `points`.
    pub fn loop_changed(&self, source: &Path, points: LoopPoints) -> ItemResult<bool> {
        let loop_path = self.loop_path(source);

        let stored = match fs::read_to_string(&loop_path) {
            Ok(text) => parse_loop_record(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(ItemError::io(&loop_path, e)),
        };

        if stored == Some(points) {
            log::debug!("{}: loop points have not changed", source.display());
            return Ok(false);
        }

        log::debug!(
            "{}: loop points changed to {}..{}",
            source.display(),
            points.start,
            points.end
        );
        fs::write(&loop_path, format!("{}\n{}", points.start, points.end))
            .map_err(|e| ItemError::io(&loop_path, e))?;
        Ok(true)
    }

    /// Forgets the checksum of `source` so the next build encodes it again.
    pub fn invalidate(&self, source: &Path) -> ItemResult<()> {
        let sum_path = self.checksum_path(source);
        match fs::remove_file(&sum_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ItemError::io(&sum_path, e)),
        }
    }

    /// Decides what the cache pass must do for `source`.
    ///
    /// `cached_outputs` lists every file the encode step leaves in the cache;
    /// any of them missing forces an encode. Both the checksum and the loop
    /// check always run, so both records are current afterwards whichever way
    /// the decision goes.
    pub fn decide(
        &self,
        source: &Path,
        cached_outputs: &[PathBuf],
        points: LoopPoints,
        codec: CodecKind,
    ) -> ItemResult<CacheDecision> {
        let content_changed = self.needs_encode(source)?;
        let loop_changed = self.loop_changed(source, points)?;
        let missing = cached_outputs.iter().find(|path| !path.exists());
        if let Some(path) = missing {
            log::debug!(
                "{}: cached output {} missing, encoding required",
                source.display(),
                path.display()
            );
        }
        let output_missing = missing.is_some();

        let decision = if content_changed || output_missing {
            CacheDecision::Encode
        } else if loop_changed && codec.embeds_loop() {
            CacheDecision::Encode
        } else if loop_changed {
            CacheDecision::RefreshLoop
        } else {
            CacheDecision::UpToDate
        };
        Ok(decision)
    }
}

fn parse_loop_record(text: &str) -> Option<LoopPoints> {
    let mut lines = text.lines().map(str::trim);
    let start = lines.next()?.parse().ok()?;
    let end = lines.next()?.parse().ok()?;
    Some(LoopPoints::new(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, SidecarStore, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let store = SidecarStore::open(dir.path().join("cache")).unwrap();
        let source = dir.path().join("song.wav");
        fs::write(&source, b"first version").unwrap();
        (dir, store, source)
    }

    #[test]
    fn test_checksum_is_sixteen_bytes_of_blake3() {
        let (_dir, _store, source) = setup();
        let sum = checksum(&source).unwrap();
        let full = blake3::hash(b"first version");
        assert_eq!(&sum[..], &full.as_bytes()[..CHECKSUM_LEN]);
    }

    #[test]
    fn test_needs_encode_tracks_content() {
        let (_dir, store, source) = setup();
        assert!(store.needs_encode(&source).unwrap());
        assert!(store.checksum_path(&source).ends_with("song.wav.sum"));
        assert!(!store.needs_encode(&source).unwrap());

        fs::write(&source, b"second version").unwrap();
        assert!(store.needs_encode(&source).unwrap());
        assert!(!store.needs_encode(&source).unwrap());
    }

    #[test]
    fn test_loop_changed_tracks_points() {
        let (_dir, store, source) = setup();
        let points = LoopPoints::new(10, 500);
        assert!(store.loop_changed(&source, points).unwrap());
        assert_eq!(
            fs::read_to_string(store.loop_path(&source)).unwrap(),
            "10\n500"
        );
        assert!(!store.loop_changed(&source, points).unwrap());
        assert!(store.loop_changed(&source, LoopPoints::new(0, 0)).unwrap());
    }

    #[test]
    fn test_garbled_loop_record_counts_as_changed() {
        let (_dir, store, source) = setup();
        fs::write(store.loop_path(&source), "not a number").unwrap();
        assert!(store.loop_changed(&source, LoopPoints::default()).unwrap());
        assert!(!store.loop_changed(&source, LoopPoints::default()).unwrap());
    }

    #[test]
    fn test_invalidate_forces_encode() {
        let (_dir, store, source) = setup();
        store.needs_encode(&source).unwrap();
        store.invalidate(&source).unwrap();
        assert!(store.needs_encode(&source).unwrap());
        store.invalidate(&source).unwrap();
        store.invalidate(&source).unwrap();
    }

    #[test]
    fn test_decide() {
        let (dir, store, source) = setup();
        let cached = dir.path().join("cache").join("song.raw");
        let outputs = [cached.clone()];
        let points = LoopPoints::new(0, 0);

        // First sight: encode, even though output exists.
        fs::write(&cached, b"raw").unwrap();
        assert_eq!(
            store.decide(&source, &outputs, points, CodecKind::Adpcm).unwrap(),
            CacheDecision::Encode
        );
        assert_eq!(
            store.decide(&source, &outputs, points, CodecKind::Adpcm).unwrap(),
            CacheDecision::UpToDate
        );

        let moved = LoopPoints::new(128, 256);
        assert_eq!(
            store.decide(&source, &outputs, moved, CodecKind::Adpcm).unwrap(),
            CacheDecision::RefreshLoop
        );
        assert_eq!(
            store.decide(&source, &outputs, points, CodecKind::Adx).unwrap(),
            CacheDecision::Encode
        );

        fs::remove_file(&cached).unwrap();
        assert_eq!(
            store.decide(&source, &outputs, points, CodecKind::Adpcm).unwrap(),
            CacheDecision::Encode
        );
    }

    #[test]
    fn test_decide_requires_every_cached_output() {
        let (dir, store, source) = setup();
        let cached = dir.path().join("cache").join("song.raw");
        let txth = append_extension(&cached, "txth");
        let outputs = [cached.clone(), txth.clone()];
        let points = LoopPoints::default();

        fs::write(&cached, b"raw").unwrap();
        fs::write(&txth, b"num_samples = 128").unwrap();
        store.decide(&source, &outputs, points, CodecKind::Adpcm).unwrap();
        assert_eq!(
            store.decide(&source, &outputs, points, CodecKind::Adpcm).unwrap(),
            CacheDecision::UpToDate
        );

        fs::remove_file(&txth).unwrap();
        assert_eq!(
            store.decide(&source, &outputs, points, CodecKind::Adpcm).unwrap(),
            CacheDecision::Encode
        );
    }

    #[test]
    fn test_append_extension() {
        assert_eq!(
            append_extension(Path::new("cache/song.raw"), "txth"),
            PathBuf::from("cache/song.raw.txth")
        );
    }
}
