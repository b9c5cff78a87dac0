//! Shot records, session clock and the shot list

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::surface::{Point, RegionId};
use crate::vision::LaserColor;

/// Columns every shot list starts with
pub const DEFAULT_SHOT_LIST_COLUMNS: [&str; 2] = ["Time", "Laser"];

/// Handle to a shot list row; the opaque display handle given to protocols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShotEntryId(pub u64);

/// A detected shot
#[derive(Debug, Clone, PartialEq)]
pub struct Shot {
    pub point: Point,
    pub color: LaserColor,
    /// Time since the first shot of the session
    pub timestamp: Duration,
    pub selected: bool,
    /// Marker drawn on the surface for this shot
    pub marker: Option<RegionId>,
    /// Row in the shot list
    pub entry: ShotEntryId,
}

/// One row of the shot list
#[derive(Debug, Clone, PartialEq)]
pub struct ShotRow {
    pub id: ShotEntryId,
    pub values: Vec<String>,
}

/// Tabular shot list shown next to the feed.
///
/// Training protocols may add their own columns and fill them per shot.
#[derive(Debug, Clone)]
pub struct ShotList {
    columns: Vec<String>,
    rows: Vec<ShotRow>,
}

impl Default for ShotList {
    fn default() -> Self {
        Self {
            columns: DEFAULT_SHOT_LIST_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }
}

impl ShotList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[ShotRow] {
        &self.rows
    }

    pub fn row(&self, id: ShotEntryId) -> Option<&ShotRow> {
        self.rows.iter().find(|row| row.id == id)
    }

    pub fn push_row(&mut self, id: ShotEntryId, values: Vec<String>) {
        self.rows.push(ShotRow { id, values });
    }

    /// Add columns after the existing ones, skipping names already present
    pub fn add_columns<S: AsRef<str>>(&mut self, names: &[S]) {
        for name in names {
            let name = name.as_ref();
            if !self.columns.iter().any(|c| c == name) {
                self.columns.push(name.to_string());
            }
        }
    }

    /// Append values to the end of a row
    pub fn append_row_data<S: AsRef<str>>(&mut self, id: ShotEntryId, values: &[S]) -> bool {
        match self.rows.iter_mut().find(|row| row.id == id) {
            Some(row) => {
                row.values
                    .extend(values.iter().map(|v| v.as_ref().to_string()));
                true
            }
            None => false,
        }
    }

    /// Drop every column past the defaults and truncate rows to match
    pub fn revert_columns(&mut self) {
        let keep = DEFAULT_SHOT_LIST_COLUMNS.len();
        self.columns.truncate(keep);
        for row in &mut self.rows {
            row.values.truncate(keep);
        }
    }

    pub fn clear_rows(&mut self) {
        self.rows.clear();
    }
}

/// Shot list shared with protocol operations
pub type SharedShotList = Arc<Mutex<ShotList>>;

/// Stores shots in arrival order and times them against the session clock
pub struct ShotRegistry {
    shots: Vec<Shot>,
    shot_list: SharedShotList,
    /// Set by the first shot after start or clear
    clock_start: Option<Instant>,
    next_entry: u64,
    /// Index of the currently selected shot
    selected: Option<usize>,
}

impl Default for ShotRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ShotRegistry {
    pub fn new() -> Self {
        Self {
            shots: Vec::new(),
            shot_list: Arc::new(Mutex::new(ShotList::new())),
            clock_start: None,
            next_entry: 1,
            selected: None,
        }
    }

    /// Record a shot observed at `now`
    pub fn record_at(&mut self, point: Point, color: LaserColor, now: Instant) -> Shot {
        let timestamp = match self.clock_start {
            None => {
                self.clock_start = Some(now);
                Duration::ZERO
            }
            Some(start) => now.saturating_duration_since(start),
        };

        let entry = ShotEntryId(self.next_entry);
        self.next_entry += 1;

        self.shot_list.lock().push_row(
            entry,
            vec![format!("{:.2}", timestamp.as_secs_f64()), color.to_string()],
        );

        let shot = Shot {
            point,
            color,
            timestamp,
            selected: false,
            marker: None,
            entry,
        };
        self.shots.push(shot.clone());
        shot
    }

    /// Record a shot observed now
    pub fn record(&mut self, point: Point, color: LaserColor) -> Shot {
        self.record_at(point, color, Instant::now())
    }

    /// Attach the drawn marker to a recorded shot
    pub fn set_marker(&mut self, entry: ShotEntryId, marker: RegionId) {
        if let Some(shot) = self.shots.iter_mut().find(|s| s.entry == entry) {
            shot.marker = Some(marker);
        }
    }

    /// Forget every shot, the clock anchor and the selection
    pub fn clear(&mut self) {
        self.shots.clear();
        self.shot_list.lock().clear_rows();
        self.clock_start = None;
        self.selected = None;
    }

    /// Toggle selection of a shot, unselecting the previously selected one.
    /// Returns the indices whose selection changed.
    pub fn toggle_selection(&mut self, index: usize) -> Vec<usize> {
        if index >= self.shots.len() {
            return Vec::new();
        }

        let mut changed = vec![index];
        self.shots[index].selected = !self.shots[index].selected;

        match self.selected {
            Some(previous) if previous == index => {
                self.selected = None;
            }
            Some(previous) => {
                if let Some(shot) = self.shots.get_mut(previous) {
                    shot.selected = false;
                    changed.push(previous);
                }
                self.selected = Some(index);
            }
            None => self.selected = Some(index),
        }

        changed
    }

    pub fn selected(&self) -> Option<&Shot> {
        self.selected.and_then(|i| self.shots.get(i))
    }

    pub fn shots(&self) -> &[Shot] {
        &self.shots
    }

    pub fn get(&self, entry: ShotEntryId) -> Option<&Shot> {
        self.shots.iter().find(|s| s.entry == entry)
    }

    pub fn shot_list(&self) -> SharedShotList {
        self.shot_list.clone()
    }

    pub fn len(&self) -> usize {
        self.shots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shots.is_empty()
    }

    /// Whether the session clock is running
    pub fn is_timing(&self) -> bool {
        self.clock_start.is_some()
    }
}
