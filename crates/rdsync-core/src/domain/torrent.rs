//! Torrent entities as reported by the remote service
//!
//! [`Torrent`] is the partial record returned by the paginated listing,
//! [`TorrentInfo`] the full record (including the file list) returned by the
//! detail endpoint. Both are immutable once fetched: a pass never mutates them
//! locally, it only re-fetches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// TorrentStatus
// ============================================================================

/// Processing status of a torrent on the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentStatus {
    MagnetError,
    MagnetConversion,
    WaitingFilesSelection,
    Queued,
    Downloading,
    Downloaded,
    Error,
    Virus,
    Compressing,
    Uploading,
    Dead,
    /// A status this build does not know about yet
    #[default]
    #[serde(other)]
    Unknown,
}

impl TorrentStatus {
    /// Returns the wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MagnetError => "magnet_error",
            Self::MagnetConversion => "magnet_conversion",
            Self::WaitingFilesSelection => "waiting_files_selection",
            Self::Queued => "queued",
            Self::Downloading => "downloading",
            Self::Downloaded => "downloaded",
            Self::Error => "error",
            Self::Virus => "virus",
            Self::Compressing => "compressing",
            Self::Uploading => "uploading",
            Self::Dead => "dead",
            Self::Unknown => "unknown",
        }
    }

    /// The torrent finished and its content is available
    pub fn is_terminal_success(&self) -> bool {
        matches!(self, Self::Downloaded)
    }

    /// The torrent will never reach `downloaded`
    pub fn is_terminal_failure(&self) -> bool {
        matches!(
            self,
            Self::MagnetError | Self::Error | Self::Virus | Self::Dead
        )
    }

    /// Neither terminal success nor terminal failure
    pub fn is_pending(&self) -> bool {
        !self.is_terminal_success() && !self.is_terminal_failure()
    }
}

impl std::fmt::Display for TorrentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TorrentFile
// ============================================================================

/// A single file inside a torrent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentFile {
    /// File identifier, unique within its torrent
    pub id: u32,
    /// Path of the file inside the torrent
    pub path: String,
    /// File size in bytes
    pub bytes: u64,
    /// Whether the file is selected for download (0/1 on the wire)
    #[serde(deserialize_with = "deserialize_flag")]
    pub selected: bool,
}

/// Accepts `0`/`1` integers as well as JSON booleans
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
    })
}

// ============================================================================
// Torrent (listing entry)
// ============================================================================

/// A torrent as returned by the listing endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Torrent {
    /// Service-side identifier, only meaningful within one account
    pub id: String,
    #[serde(default)]
    pub filename: String,
    /// SHA1 info-hash, the cross-account identity of the content
    pub hash: String,
    /// Size of the selected files only
    #[serde(default)]
    pub bytes: u64,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub split: u32,
    /// Progress from 0 to 100
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub status: TorrentStatus,
    #[serde(default)]
    pub added: Option<DateTime<Utc>>,
    #[serde(default)]
    pub links: Option<Vec<String>>,
    #[serde(default)]
    pub ended: Option<DateTime<Utc>>,
    #[serde(default)]
    pub speed: Option<u64>,
    #[serde(default)]
    pub seeders: Option<u32>,
}

impl Torrent {
    /// True when the torrent is fully downloaded and has hoster links
    pub fn is_ready_for_sync(&self) -> bool {
        self.progress >= 100.0 && self.links.as_ref().is_some_and(|l| !l.is_empty())
    }
}

// ============================================================================
// TorrentInfo (detail)
// ============================================================================

/// Detailed torrent information including the file list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentInfo {
    pub id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub original_filename: String,
    pub hash: String,
    /// Size of the selected files only
    #[serde(default)]
    pub bytes: u64,
    /// Total size of the torrent
    #[serde(default)]
    pub original_bytes: u64,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub split: u32,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub status: TorrentStatus,
    #[serde(default)]
    pub added: Option<DateTime<Utc>>,
    #[serde(default)]
    pub files: Vec<TorrentFile>,
    #[serde(default)]
    pub links: Option<Vec<String>>,
    #[serde(default)]
    pub ended: Option<DateTime<Utc>>,
    #[serde(default)]
    pub speed: Option<u64>,
    #[serde(default)]
    pub seeders: Option<u32>,
}

impl TorrentInfo {
    /// IDs of the files marked as selected, in file-list order
    pub fn selected_file_ids(&self) -> Vec<u32> {
        self.files
            .iter()
            .filter(|f| f.selected)
            .map(|f| f.id)
            .collect()
    }
}

// ============================================================================
// Size formatting
// ============================================================================

/// Formats a byte count with a binary unit, e.g. `1.50 KB`
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if size < 1024.0 {
            return format!("{size:.2} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2} PB")
}
