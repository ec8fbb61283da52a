//! Clip catalog
//!
//! Immutable clips grouped into a music list and an effect list. Clips are
//! preloaded into memory so starting a sound never touches the filesystem.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::AudioError;

const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "mp3", "ogg", "flac", "m4a", "aac"];

struct ClipData {
    name: String,
    duration: Duration,
    bytes: Arc<[u8]>,
}

/// Cheaply clonable handle to decoded-on-demand audio content
#[derive(Clone)]
pub struct Clip(Arc<ClipData>);

impl Clip {
    pub fn new(name: impl Into<String>, duration: Duration, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(Arc::new(ClipData {
            name: name.into(),
            duration,
            bytes: bytes.into(),
        }))
    }

    /// A clip with no audio data, for headless playback
    pub fn silent(name: impl Into<String>, duration: Duration) -> Self {
        Self::new(name, duration, Vec::new())
    }

    /// Load and probe a clip from disk. The clip name is the file stem.
    pub fn load(path: &Path) -> Result<Self, AudioError> {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| AudioError::InvalidFormat(format!("bad file name: {}", path.display())))?
            .to_string();

        let duration = probe_duration(path)?;

        let bytes = std::fs::read(path).map_err(|e| AudioError::LoadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        tracing::debug!(
            "Loaded clip '{}' ({:.2}s, {} bytes)",
            name,
            duration.as_secs_f32(),
            bytes.len()
        );

        Ok(Self::new(name, duration, bytes))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn duration(&self) -> Duration {
        self.0.duration
    }

    pub fn bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.0.bytes)
    }

    pub fn is_silent(&self) -> bool {
        self.0.bytes.is_empty()
    }
}

impl fmt::Debug for Clip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clip")
            .field("name", &self.0.name)
            .field("duration", &self.0.duration)
            .field("bytes", &self.0.bytes.len())
            .finish()
    }
}

impl PartialEq for Clip {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Catalog lookup key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipRef {
    Name(String),
    Index(usize),
}

impl fmt::Display for ClipRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipRef::Name(name) => write!(f, "'{}'", name),
            ClipRef::Index(index) => write!(f, "#{}", index),
        }
    }
}

impl From<&str> for ClipRef {
    fn from(name: &str) -> Self {
        ClipRef::Name(name.to_string())
    }
}

impl From<String> for ClipRef {
    fn from(name: String) -> Self {
        ClipRef::Name(name)
    }
}

impl From<usize> for ClipRef {
    fn from(index: usize) -> Self {
        ClipRef::Index(index)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClipCatalog {
    music: Vec<Clip>,
    effects: Vec<Clip>,
}

impl ClipCatalog {
    pub fn new(music: Vec<Clip>, effects: Vec<Clip>) -> Self {
        Self { music, effects }
    }

    /// Load every supported file under `dir/music` and `dir/effects`.
    ///
    /// Files are sorted by name so music indices are stable between runs.
    /// Unreadable files are skipped with a warning.
    pub fn load_dir(dir: &Path) -> Result<Self, AudioError> {
        if !dir.is_dir() {
            return Err(AudioError::LoadFailed {
                path: dir.display().to_string(),
                source: "clip directory not found".into(),
            });
        }

        let music = load_clips_in(&dir.join("music"))?;
        let effects = load_clips_in(&dir.join("effects"))?;

        tracing::info!(
            "Loaded clip catalog from {}: {} music tracks, {} effects",
            dir.display(),
            music.len(),
            effects.len()
        );

        Ok(Self { music, effects })
    }

    pub fn music(&self) -> &[Clip] {
        &self.music
    }

    pub fn effects(&self) -> &[Clip] {
        &self.effects
    }

    pub fn music_track(&self, index: usize) -> Option<&Clip> {
        self.music.get(index)
    }

    pub fn find_effect(&self, clip: &ClipRef) -> Option<&Clip> {
        match clip {
            ClipRef::Name(name) => self.effects.iter().find(|c| c.name() == name),
            ClipRef::Index(index) => self.effects.get(*index),
        }
    }
}

fn load_clips_in(dir: &Path) -> Result<Vec<Clip>, AudioError> {
    if !dir.is_dir() {
        tracing::warn!("Clip directory missing: {}", dir.display());
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(dir).map_err(|e| AudioError::LoadFailed {
        path: dir.display().to_string(),
        source: Box::new(e),
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_supported(path))
        .collect();
    paths.sort();

    let mut clips = Vec::with_capacity(paths.len());
    for path in paths {
        match Clip::load(&path) {
            Ok(clip) => clips.push(clip),
            Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
        }
    }

    Ok(clips)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.iter().any(|s| ext.eq_ignore_ascii_case(s)))
        .unwrap_or(false)
}

/// Determine the playback length of an encoded file
pub fn probe_duration(path: &Path) -> Result<Duration, AudioError> {
    // WAV headers carry an exact frame count
    if let Some(ext) = path.extension() {
        if ext.eq_ignore_ascii_case("wav") {
            if let Ok(reader) = hound::WavReader::open(path) {
                let spec = reader.spec();
                if spec.sample_rate > 0 {
                    let frames = reader.duration() as f64;
                    return Ok(Duration::from_secs_f64(frames / spec.sample_rate as f64));
                }
            }
        }
    }

    let src = File::open(path).map_err(|e| AudioError::LoadFailed {
        path: path.display().to_string(),
        source: Box::new(e),
    })?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    // Create a probe hint using the file extension
    let mut hint = Hint::new();
    if let Some(ext_str) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext_str);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &fmt_opts, &meta_opts)
        .map_err(|e| AudioError::DecodeFailed(Box::new(e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::InvalidFormat("no supported audio tracks found".to_string()))?;

    let track_id = track.id;
    let params = track.codec_params.clone();

    if let (Some(frames), Some(rate)) = (params.n_frames, params.sample_rate) {
        if rate > 0 {
            return Ok(Duration::from_secs_f64(frames as f64 / rate as f64));
        }
    }

    // No frame count in the container: walk packets and sum their durations
    let time_base = params.time_base.ok_or_else(|| {
        AudioError::InvalidFormat(format!("unknown time base for {}", path.display()))
    })?;

    let mut total_ts: u64 = 0;
    loop {
        match format.next_packet() {
            Ok(packet) => {
                if packet.track_id() == track_id {
                    total_ts += packet.dur();
                }
            }
            Err(symphonia::core::errors::Error::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(AudioError::DecodeFailed(Box::new(err))),
        }
    }

    let time = time_base.calc_time(total_ts);
    Ok(Duration::from_secs(time.seconds) + Duration::from_secs_f64(time.frac))
}
