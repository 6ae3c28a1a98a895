//! Build orchestrator.
//!
//! A build runs in two passes. The cache pass brings every unique source up
//! to date in the profile's cache directory, in parallel. The output pass
//! then copies cached results to wherever each song wants them.
//!
//! Sources are deduplicated by their path string before the cache pass, which
//! is what makes the unlocked cache directory safe: no two workers ever touch
//! the same sidecars. Two different strings naming the same file defeat this.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use bgmforge_formats::WaveProps;
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::config::{BuildConfig, Parallelism};
use crate::encoder::{EncodeRequest, Encoder};
use crate::error::{BuildError, BuildResult, ItemError, ItemResult};
use crate::music_data::{LoopPoints, MusicData, Song};
use crate::profile::{CodecKind, GameProfile};
use crate::store::{append_extension, CacheDecision, SidecarStore};
use crate::txth;

/// Output directories holding more files than this are never cleared.
pub const MAX_OUTPUT_FILES: usize = 100;

/// Directory below a batch input directory that receives encoded files.
pub const BATCH_OUTPUT_DIR: &str = "encoded";

const TEMP_EXTENSION: &str = "temp";
const TXTH_EXTENSION: &str = "txth";

/// What the cache pass did for one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOutcome {
    Encoded,
    LoopRefreshed,
    UpToDate,
}

/// A source that failed, and why.
#[derive(Debug)]
pub struct ItemFailure {
    pub source: PathBuf,
    pub error: ItemError,
}

/// Counts from one build, export or batch run.
#[derive(Debug, Default)]
pub struct BuildSummary {
    /// Unique sources seen by the cache pass.
    pub unique_sources: usize,
    /// Sources run through the encoder.
    pub encoded: usize,
    /// Sources whose TXTH loop lines were rewritten.
    pub loop_refreshed: usize,
    /// Sources served from cache untouched.
    pub cache_hits: usize,
    /// Files placed in the output directory.
    pub outputs_copied: usize,
    pub failures: Vec<ItemFailure>,
}

impl BuildSummary {
    /// Whether every source succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn record_failure(&mut self, source: &Path, error: ItemError) {
        log::error!("{}: {}", source.display(), error);
        self.failures.push(ItemFailure {
            source: source.to_path_buf(),
            error,
        });
    }
}

/// One unique source for the cache pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceJob {
    pub path: PathBuf,
    pub loop_points: LoopPoints,
}

/// Builds music for one game profile.
pub struct MusicBuilder<E> {
    profile: &'static GameProfile,
    config: BuildConfig,
    store: SidecarStore,
    encoder: E,
}

impl<E: Encoder> MusicBuilder<E> {
    /// Creates a builder, creating the profile's cache directory if needed.
    pub fn new(
        profile: &'static GameProfile,
        config: BuildConfig,
        encoder: E,
    ) -> BuildResult<Self> {
        let cache_dir = config.cache_root.join(profile.cache_subdir);
        let store = SidecarStore::open(&cache_dir).map_err(|e| BuildError::io(&cache_dir, e))?;
        log::info!("Using {} music builder", profile.display_name);
        Ok(Self {
            profile,
            config,
            store,
            encoder,
        })
    }

    pub fn profile(&self) -> &'static GameProfile {
        self.profile
    }

    /// Cache directory of this builder's profile.
    pub fn cache_dir(&self) -> &Path {
        self.store.dir()
    }

    /// Where the encoded form of `source` lives in the cache.
    pub fn cached_path(&self, source: &Path) -> PathBuf {
        self.cache_dir()
            .join(encoded_file_name(source, self.profile.encoded_extension))
    }

    /// Unique encodable sources among `songs`, first occurrence winning.
    pub fn unique_sources<'a>(&self, songs: impl IntoIterator<Item = &'a Song>) -> Vec<SourceJob> {
        unique_replacements(songs)
            .into_iter()
            .filter_map(|song| {
                let path = PathBuf::from(song.replacement_file_path.as_deref()?);
                self.profile.is_supported(&path).then(|| SourceJob {
                    path,
                    loop_points: song.loop_points(),
                })
            })
            .collect()
    }

    /// Brings the cached output for one source up to date.
    ///
    /// On failure the source's checksum is forgotten so the next run retries.
    pub fn cache_source(&self, job: &SourceJob) -> ItemResult<SourceOutcome> {
        let result = self.refresh_cache(job);
        if result.is_err() {
            if let Err(e) = self.store.invalidate(&job.path) {
                log::warn!("{}: failed to invalidate checksum: {}", job.path.display(), e);
            }
        }
        result
    }

    fn refresh_cache(&self, job: &SourceJob) -> ItemResult<SourceOutcome> {
        let cached = self.cached_path(&job.path);
        let decision = self.store.decide(
            &job.path,
            &self.cached_outputs(&cached),
            job.loop_points,
            self.profile.codec,
        )?;

        match decision {
            CacheDecision::Encode => {
                self.encode_into_cache(&job.path, &cached, job.loop_points)?;
                log::info!("{}: Encoded", file_label(&job.path));
                Ok(SourceOutcome::Encoded)
            }
            CacheDecision::RefreshLoop => {
                txth::update_txth(&append_extension(&cached, TXTH_EXTENSION), job.loop_points)?;
                log::info!("{}: Updated loop points", file_label(&job.path));
                Ok(SourceOutcome::LoopRefreshed)
            }
            CacheDecision::UpToDate => {
                log::info!("{}: Using cached encoded file", file_label(&job.path));
                Ok(SourceOutcome::UpToDate)
            }
        }
    }

    /// Files the encode step leaves in the cache for `cached`.
    fn cached_outputs(&self, cached: &Path) -> Vec<PathBuf> {
        match self.profile.codec {
            CodecKind::Adpcm => vec![
                cached.to_path_buf(),
                append_extension(cached, TXTH_EXTENSION),
            ],
            CodecKind::Adx => vec![cached.to_path_buf()],
        }
    }

    fn encode_into_cache(
        &self,
        source: &Path,
        cached: &Path,
        points: LoopPoints,
    ) -> ItemResult<()> {
        match self.profile.codec {
            CodecKind::Adx => {
                self.encoder.encode(&EncodeRequest {
                    input: source,
                    output: cached,
                    loop_points: points,
                })?;
                Ok(())
            }
            CodecKind::Adpcm => {
                // The encoder writes a full WAV; only its payload is kept.
                let temp = append_extension(cached, TEMP_EXTENSION);
                let result = self
                    .encoder
                    .encode(&EncodeRequest {
                        input: source,
                        output: &temp,
                        loop_points: points,
                    })
                    .map_err(ItemError::from)
                    .and_then(|()| self.store_adpcm_payload(source, &temp, cached, points));

                if temp.exists() {
                    if let Err(e) = fs::remove_file(&temp) {
                        log::warn!("Failed to remove {}: {}", temp.display(), e);
                    }
                }
                result
            }
        }
    }

    fn store_adpcm_payload(
        &self,
        source: &Path,
        temp: &Path,
        cached: &Path,
        points: LoopPoints,
    ) -> ItemResult<()> {
        let total_samples = WaveProps::read(source)?
            .total_samples()
            .ok_or_else(|| ItemError::InvalidSampleCount {
                path: source.to_path_buf(),
            })?;

        let encoded = WaveProps::read(temp)?;
        let payload = encoded.read_payload(temp)?;
        fs::write(cached, payload).map_err(|e| ItemError::io(cached, e))?;
        txth::write_txth(
            &append_extension(cached, TXTH_EXTENSION),
            &encoded,
            total_samples,
            points,
        )
    }

    /// Runs the cache pass over `jobs`, returning the sources that failed.
    fn run_cache_pass(
        &self,
        jobs: &[SourceJob],
        summary: &mut BuildSummary,
    ) -> BuildResult<HashSet<PathBuf>> {
        log::info!("Building cache");
        log::debug!("Processing {} songs", jobs.len());

        let mut failed = HashSet::new();
        let runnable = self.claim_cache_names(jobs, &mut failed, summary);
        let results = self.map_sources(&runnable, |job| self.cache_source(job))?;

        for (job, result) in runnable.iter().zip(results) {
            match result {
                Ok(SourceOutcome::Encoded) => summary.encoded += 1,
                Ok(SourceOutcome::LoopRefreshed) => summary.loop_refreshed += 1,
                Ok(SourceOutcome::UpToDate) => summary.cache_hits += 1,
                Err(error) => {
                    failed.insert(job.path.clone());
                    summary.record_failure(&job.path, error);
                }
            }
        }
        summary.unique_sources += jobs.len();

        log::info!("Processed {} songs", jobs.len());
        Ok(failed)
    }

    /// Jobs whose cache file names are free, in order.
    ///
    /// Sidecars and cached outputs are named from the source file name alone,
    /// so a later source sharing that name with an earlier one would overwrite
    /// its cache entry. Such sources are failed instead of run.
    fn claim_cache_names<'a>(
        &self,
        jobs: &'a [SourceJob],
        failed: &mut HashSet<PathBuf>,
        summary: &mut BuildSummary,
    ) -> Vec<&'a SourceJob> {
        let mut owners: HashMap<String, &Path> = HashMap::new();
        let mut runnable = Vec::with_capacity(jobs.len());
        for job in jobs {
            let key = self
                .cached_path(&job.path)
                .to_string_lossy()
                .to_lowercase();
            match owners.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(&job.path);
                    runnable.push(job);
                }
                Entry::Occupied(owner) => {
                    let error = ItemError::CacheNameCollision {
                        path: job.path.clone(),
                        other: owner.get().to_path_buf(),
                    };
                    failed.insert(job.path.clone());
                    summary.record_failure(&job.path, error);
                }
            }
        }
        runnable
    }

    fn map_sources<T, R, F>(&self, items: &[T], f: F) -> BuildResult<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        match self.config.parallelism {
            Parallelism::Low => {
                log::info!("Low performance mode enabled");
                Ok(items.iter().map(f).collect())
            }
            Parallelism::Full => {
                let pool = rayon::ThreadPoolBuilder::new().build()?;
                Ok(pool.install(|| items.par_iter().map(f).collect()))
            }
        }
    }

    /// Copies the build result for `source` to `target`.
    fn copy_to_output(&self, source: &Path, target: &Path, points: LoopPoints) -> ItemResult<()> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| ItemError::io(parent, e))?;
        }

        // Sidecars go first so a failed copy never leaves a lone payload.
        if self.profile.is_encoded(source) {
            log::info!("{}: Using already encoded file", file_label(source));
            if self.profile.codec == CodecKind::Adpcm {
                let source_txth = append_extension(source, TXTH_EXTENSION);
                let target_txth = append_extension(target, TXTH_EXTENSION);
                if !source_txth.exists() {
                    return Err(ItemError::MissingSidecar { path: source_txth });
                }
                copy_file(&source_txth, &target_txth)?;
                let source_extra = txth::extra_path(&source_txth);
                if source_extra.exists() {
                    copy_file(&source_extra, &txth::extra_path(&target_txth))?;
                }
                txth::update_txth(&target_txth, points)?;
            }
            copy_file(source, target)
        } else if self.profile.is_supported(source) {
            let cached = self.cached_path(source);
            if self.profile.codec == CodecKind::Adpcm {
                let cached_txth = append_extension(&cached, TXTH_EXTENSION);
                if !cached_txth.exists() {
                    return Err(ItemError::MissingSidecar { path: cached_txth });
                }
                copy_file(&cached_txth, &append_extension(target, TXTH_EXTENSION))?;
            }
            copy_file(&cached, target)
        } else {
            Err(ItemError::UnsupportedInput {
                path: source.to_path_buf(),
            })
        }
    }

    /// Generates a full music build in `output_dir`.
    ///
    /// The output directory is created if missing and emptied otherwise,
    /// unless it holds more than [`MAX_OUTPUT_FILES`] files.
    pub fn build(&self, music: &MusicData, output_dir: &Path) -> BuildResult<BuildSummary> {
        prepare_output_dir(output_dir)?;

        let mut summary = BuildSummary::default();
        let jobs = self.unique_sources(&music.songs);
        let failed = self.run_cache_pass(&jobs, &mut summary)?;

        for song in music.songs.iter().filter(|s| s.is_enabled) {
            let Some(source) = song.replacement_file_path.as_deref() else {
                continue;
            };
            let source = Path::new(source);
            if failed.contains(source) {
                log::debug!("{}: skipped, encoding failed", song.display_name());
                continue;
            }

            let result = song
                .output_file_path
                .as_deref()
                .map(normalize_output_path)
                .filter(|p| !p.as_os_str().is_empty())
                .ok_or_else(|| ItemError::MissingOutputPath {
                    song: song.display_name().to_string(),
                })
                .and_then(|relative| {
                    self.copy_to_output(source, &output_dir.join(relative), song.loop_points())
                });

            match result {
                Ok(()) => summary.outputs_copied += 1,
                Err(error) => summary.record_failure(source, error),
            }
        }

        log::info!(
            "Music Build generated with {} total songs",
            summary.outputs_copied
        );
        Ok(summary)
    }

    /// Encodes the unique enabled sources of `music` into the flat
    /// directory `output_dir`, named `<stem><encoded extension>`.
    pub fn export(&self, music: &MusicData, output_dir: &Path) -> BuildResult<BuildSummary> {
        log::info!("Exporting Music Build to {}", output_dir.display());
        fs::create_dir_all(output_dir).map_err(|e| BuildError::io(output_dir, e))?;

        let enabled: Vec<&Song> = music.songs.iter().filter(|s| s.is_enabled).collect();
        let mut summary = BuildSummary::default();
        let jobs = self.unique_sources(enabled.iter().copied());
        let failed = self.run_cache_pass(&jobs, &mut summary)?;

        for song in unique_replacements(enabled) {
            let Some(source) = song.replacement_file_path.as_deref() else {
                continue;
            };
            let source = Path::new(source);
            if failed.contains(source) {
                continue;
            }
            let target = output_dir.join(encoded_file_name(source, self.profile.encoded_extension));
            match self.copy_to_output(source, &target, song.loop_points()) {
                Ok(()) => summary.outputs_copied += 1,
                Err(error) => summary.record_failure(source, error),
            }
        }

        log::info!("Exported {} files to {}", summary.outputs_copied, output_dir.display());
        Ok(summary)
    }

    /// Encodes every supported file directly inside `input_dir` into
    /// `input_dir/encoded`, looping each whole track.
    pub fn batch(&self, input_dir: &Path) -> BuildResult<BuildSummary> {
        log::info!("Batch encoding {}", input_dir.display());

        let output_dir = input_dir.join(BATCH_OUTPUT_DIR);
        fs::create_dir_all(&output_dir).map_err(|e| BuildError::io(&output_dir, e))?;
        for path in top_level_files(&output_dir)? {
            fs::remove_file(&path).map_err(|e| BuildError::io(&path, e))?;
        }

        let jobs: Vec<SourceJob> = top_level_files(input_dir)?
            .into_iter()
            .filter(|p| self.profile.is_supported(p))
            .map(|path| SourceJob {
                path,
                loop_points: LoopPoints::default(),
            })
            .collect();

        let mut summary = BuildSummary::default();
        let failed = self.run_cache_pass(&jobs, &mut summary)?;

        for job in jobs.iter().filter(|j| !failed.contains(&j.path)) {
            let target =
                output_dir.join(encoded_file_name(&job.path, self.profile.encoded_extension));
            match self.copy_to_output(&job.path, &target, job.loop_points) {
                Ok(()) => summary.outputs_copied += 1,
                Err(error) => summary.record_failure(&job.path, error),
            }
        }

        log::info!("Output: {}", output_dir.display());
        Ok(summary)
    }
}

/// Songs with a replacement, deduplicated by path string, first occurrence
/// winning.
fn unique_replacements<'a>(songs: impl IntoIterator<Item = &'a Song>) -> Vec<&'a Song> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for song in songs {
        if let Some(path) = song.replacement_file_path.as_deref() {
            if seen.insert(path) {
                unique.push(song);
            }
        }
    }
    unique
}

/// Relative output path from a song's `outputFilePath`.
///
/// Both `/` and `\` separate components; empty, `.` and `..` components are
/// dropped so the result always stays inside the output directory.
pub fn normalize_output_path(raw: &str) -> PathBuf {
    raw.split(['/', '\\'])
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .collect()
}

fn encoded_file_name(source: &Path, encoded_extension: &str) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    format!("{}{}", stem, encoded_extension)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn copy_file(from: &Path, to: &Path) -> ItemResult<()> {
    fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| ItemError::io(from, e))
}

fn prepare_output_dir(dir: &Path) -> BuildResult<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| BuildError::io(dir, e))?;
        log::debug!("Created output directory: {}", dir.display());
        return Ok(());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| BuildError::io(dir, e.into()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }

    if files.len() > MAX_OUTPUT_FILES {
        return Err(BuildError::SuspiciousOutputDir {
            path: dir.to_path_buf(),
            count: files.len(),
        });
    }

    for file in &files {
        fs::remove_file(file).map_err(|e| BuildError::io(file, e))?;
    }
    log::debug!("Cleared {} files from {}", files.len(), dir.display());
    Ok(())
}

fn top_level_files(dir: &Path) -> BuildResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| BuildError::io(dir, e.into()))?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::EncodeError;
    use pretty_assertions::assert_eq;

    struct NeverEncode;

    impl Encoder for NeverEncode {
        fn encode(&self, request: &EncodeRequest<'_>) -> Result<(), EncodeError> {
            Err(EncodeError::OutputNotFound {
                path: request.output.to_path_buf(),
            })
        }
    }

    fn song(path: Option<&str>, start: u32, end: u32) -> Song {
        Song {
            replacement_file_path: path.map(String::from),
            loop_start_sample: start,
            loop_end_sample: end,
            is_enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_output_path() {
        assert_eq!(normalize_output_path("12.raw"), PathBuf::from("12.raw"));
        assert_eq!(
            normalize_output_path("\\sound\\bgm\\12.raw"),
            PathBuf::from("sound/bgm/12.raw")
        );
        assert_eq!(
            normalize_output_path("/../escape/./x.adx"),
            PathBuf::from("escape/x.adx")
        );
        assert_eq!(normalize_output_path("//"), PathBuf::new());
    }

    #[test]
    fn test_unique_sources_first_wins_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        let config = BuildConfig::default().cache_root(dir.path());
        let builder = MusicBuilder::new(&GameProfile::P4G, config, NeverEncode).unwrap();

        let songs = vec![
            song(Some("a.wav"), 10, 20),
            song(None, 0, 0),
            song(Some("a.wav"), 30, 40),
            song(Some("b.raw"), 0, 0),
            song(Some("c.WAV"), 0, 0),
            song(Some("d.mp3"), 0, 0),
        ];
        let jobs = builder.unique_sources(&songs);
        assert_eq!(
            jobs,
            vec![
                SourceJob {
                    path: PathBuf::from("a.wav"),
                    loop_points: LoopPoints::new(10, 20),
                },
                SourceJob {
                    path: PathBuf::from("c.WAV"),
                    loop_points: LoopPoints::default(),
                },
            ]
        );
    }

    #[test]
    fn test_cached_path_uses_encoded_extension() {
        let dir = tempfile::tempdir().unwrap();
        let config = BuildConfig::default().cache_root(dir.path());
        let builder = MusicBuilder::new(&GameProfile::P3F, config, NeverEncode).unwrap();
        assert_eq!(
            builder.cached_path(Path::new("music/Track 1.wav")),
            dir.path().join("adx").join("Track 1.adx")
        );
    }

    #[test]
    fn test_failed_encode_invalidates_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("song.wav");
        fs::write(&source, b"not really audio").unwrap();
        let config = BuildConfig::default().cache_root(dir.path().join("cache"));
        let builder = MusicBuilder::new(&GameProfile::P4G, config, NeverEncode).unwrap();

        let job = SourceJob {
            path: source.clone(),
            loop_points: LoopPoints::default(),
        };
        let err = builder.cache_source(&job).unwrap_err();
        assert!(matches!(err, ItemError::Encoder(_)));
        assert!(!builder.store.checksum_path(&source).exists());
        assert!(!append_extension(&builder.cached_path(&source), TEMP_EXTENSION).exists());
    }

    #[test]
    fn test_prepare_output_dir_refuses_crowded_dir() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..=MAX_OUTPUT_FILES {
            fs::write(dir.path().join(format!("{i}.bin")), b"x").unwrap();
        }
        let err = prepare_output_dir(dir.path()).unwrap_err();
        assert!(matches!(err, BuildError::SuspiciousOutputDir { count: 101, .. }));
        assert!(dir.path().join("0.bin").exists());
    }

    #[test]
    fn test_prepare_output_dir_clears_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("old.raw"), b"x").unwrap();
        fs::write(dir.path().join("old.raw"), b"x").unwrap();

        prepare_output_dir(dir.path()).unwrap();
        assert!(!dir.path().join("old.raw").exists());
        assert!(!dir.path().join("sub").join("old.raw").exists());
        assert!(dir.path().join("sub").is_dir());
    }
}
