//! Read-only views over the local library
//!
//! Nothing here owns state. A view is recomputed from a session snapshot
//! (or any slice of recordings) each time it is needed.

use crate::device::{Folder, Recording};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Secondary sort key applied after pinned-first ordering
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    /// Newest first
    #[default]
    Date,
    /// Largest first
    Size,
    /// Longest first
    Duration,
}

/// Library ordering: pinned recordings first, then descending by `sort`
pub fn compare(a: &Recording, b: &Recording, sort: SortOption) -> Ordering {
    b.is_pinned.cmp(&a.is_pinned).then_with(|| match sort {
        SortOption::Date => b.timestamp.cmp(&a.timestamp),
        SortOption::Size => b.size_bytes.cmp(&a.size_bytes),
        SortOption::Duration => b.duration_sec.cmp(&a.duration_sec),
    })
}

/// Stable in-place sort by the library ordering
pub fn sort_recordings(recordings: &mut [Recording], sort: SortOption) {
    recordings.sort_by(|a, b| compare(a, b, sort));
}

/// What the recordings screen is currently looking at
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LibraryQuery {
    /// Folder being browsed; `None` is the root
    pub folder_id: Option<String>,
    /// Case-insensitive filename filter; searches across all folders
    pub search: Option<String>,
    pub sort: SortOption,
}

impl LibraryQuery {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn in_folder(folder_id: impl Into<String>) -> Self {
        Self {
            folder_id: Some(folder_id.into()),
            ..Self::default()
        }
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.search = if text.trim().is_empty() {
            None
        } else {
            Some(text)
        };
        self
    }

    pub fn sorted_by(mut self, sort: SortOption) -> Self {
        self.sort = sort;
        self
    }

    fn matches(&self, recording: &Recording) -> bool {
        if let Some(needle) = &self.search {
            return recording
                .filename
                .to_lowercase()
                .contains(&needle.to_lowercase());
        }
        match &self.folder_id {
            Some(folder_id) => recording.is_in_folder(folder_id),
            None => recording.is_in_root(),
        }
    }

    /// Folders are only listed at the root and only when not searching
    fn shows_folders(&self) -> bool {
        self.search.is_none() && self.folder_id.is_none()
    }

    pub fn apply(&self, recordings: &[Recording], folders: &[Folder]) -> LibraryView {
        let mut matched: Vec<Recording> = recordings
            .iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect();
        sort_recordings(&mut matched, self.sort);

        let folders = if self.shows_folders() {
            folders.to_vec()
        } else {
            Vec::new()
        };

        LibraryView {
            recordings: matched,
            folders,
        }
    }
}

/// Result of applying a `LibraryQuery`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LibraryView {
    pub recordings: Vec<Recording>,
    pub folders: Vec<Folder>,
}

impl LibraryView {
    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty() && self.folders.is_empty()
    }
}

/// Number of recordings that reference `folder_id`
pub fn folder_item_count(recordings: &[Recording], folder_id: &str) -> usize {
    recordings.iter().filter(|r| r.is_in_folder(folder_id)).count()
}

/// Aggregate figures for the profile/storage screen
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StorageSummary {
    pub count: usize,
    pub total_bytes: u64,
    pub total_duration_sec: u64,
}

impl StorageSummary {
    pub fn of(recordings: &[Recording]) -> Self {
        recordings.iter().fold(Self::default(), |acc, r| Self {
            count: acc.count + 1,
            total_bytes: acc.total_bytes + r.size_bytes,
            total_duration_sec: acc.total_duration_sec + u64::from(r.duration_sec),
        })
    }
}
