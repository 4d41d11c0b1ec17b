//! Saved filter views: a handful of system presets plus user-created ones.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::filters::{DueBucket, TaskFilters};
use crate::{Error, Result};

/// Maximum number of user-created views.
pub const MAX_USER_VIEWS: usize = 10;

/// Maximum length of a view name after trimming.
pub const MAX_VIEW_NAME_LEN: usize = 30;

/// A named snapshot of filter selections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedView {
    /// Unique identifier; system views use stable well-known ids
    pub id: String,

    /// Display name
    pub name: String,

    /// The filter selections this view restores
    pub filters: TaskFilters,

    /// True for the built-in presets, which cannot be deleted
    #[serde(default)]
    pub is_system: bool,
}

impl SavedView {
    /// Returns true when the given selections equal this view's filters.
    pub fn matches(&self, filters: &TaskFilters) -> bool {
        self.filters == *filters
    }
}

/// The built-in presets, in display order. Always listed ahead of user
/// views.
pub fn system_views() -> Vec<SavedView> {
    let today = TaskFilters {
        due: Some(DueBucket::Today),
        ..Default::default()
    };
    let overdue = TaskFilters {
        due: Some(DueBucket::Overdue),
        ..Default::default()
    };
    vec![
        SavedView {
            id: "view-all".to_string(),
            name: "All".to_string(),
            filters: TaskFilters::default(),
            is_system: true,
        },
        SavedView {
            id: "view-today".to_string(),
            name: "Today".to_string(),
            filters: today,
            is_system: true,
        },
        SavedView {
            id: "view-overdue".to_string(),
            name: "Overdue".to_string(),
            filters: overdue,
            is_system: true,
        },
    ]
}

/// The user's saved views, capped at [`MAX_USER_VIEWS`]. System presets
/// live outside this collection and are prepended by [`SavedViews::all`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedViews {
    views: Vec<SavedView>,
}

impl SavedViews {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from previously persisted user views, dropping any that are
    /// marked system or that overflow the cap. Tolerates whatever a stale
    /// or hand-edited prefs file may contain.
    pub fn from_views(views: Vec<SavedView>) -> Self {
        let views = views
            .into_iter()
            .filter(|v| !v.is_system)
            .take(MAX_USER_VIEWS)
            .collect();
        Self { views }
    }

    /// User views in insertion order.
    pub fn user_views(&self) -> &[SavedView] {
        &self.views
    }

    /// System presets followed by user views.
    pub fn all(&self) -> Vec<SavedView> {
        let mut all = system_views();
        all.extend(self.views.iter().cloned());
        all
    }

    /// Look up a view by id, searching presets first.
    pub fn get(&self, id: &str) -> Option<SavedView> {
        self.all().into_iter().find(|v| v.id == id)
    }

    /// Save the current filter selections under a name. The name is
    /// trimmed and must be 1..=30 characters; the collection holds at most
    /// [`MAX_USER_VIEWS`] user views.
    pub fn add(&mut self, name: &str, filters: TaskFilters) -> Result<SavedView> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("View name cannot be empty".to_string()));
        }
        if name.chars().count() > MAX_VIEW_NAME_LEN {
            return Err(Error::InvalidInput(format!(
                "View name cannot exceed {} characters",
                MAX_VIEW_NAME_LEN
            )));
        }
        if self.views.len() >= MAX_USER_VIEWS {
            return Err(Error::ViewLimit(MAX_USER_VIEWS));
        }
        let view = SavedView {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            filters,
            is_system: false,
        };
        self.views.push(view.clone());
        Ok(view)
    }

    /// Delete a user view by id. Returns true if something was removed;
    /// system ids and unknown ids are a no-op.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.views.len();
        self.views.retain(|v| v.id != id);
        self.views.len() != before
    }

    /// The first view (system or user) whose filters equal the given
    /// selections, used to highlight the active view in listings.
    pub fn find_matching(&self, filters: &TaskFilters) -> Option<SavedView> {
        self.all().into_iter().find(|v| v.matches(filters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn due_filters(bucket: DueBucket) -> TaskFilters {
        TaskFilters {
            due: Some(bucket),
            ..Default::default()
        }
    }

    #[test]
    fn test_system_views_fixed_order() {
        let views = system_views();
        let names: Vec<&str> = views.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["All", "Today", "Overdue"]);
        assert!(views.iter().all(|v| v.is_system));
    }

    #[test]
    fn test_system_views_precede_user_views() {
        let mut saved = SavedViews::new();
        saved.add("Deep work", due_filters(DueBucket::ThisWeek)).unwrap();
        let all = saved.all();
        assert_eq!(all.len(), 4);
        assert!(all[0].is_system);
        assert!(all[1].is_system);
        assert!(all[2].is_system);
        assert_eq!(all[3].name, "Deep work");
    }

    #[test]
    fn test_add_trims_and_validates_name() {
        let mut saved = SavedViews::new();
        let view = saved.add("  Errands  ", TaskFilters::default()).unwrap();
        assert_eq!(view.name, "Errands");

        assert!(matches!(
            saved.add("   ", TaskFilters::default()),
            Err(Error::InvalidInput(_))
        ));
        let long = "x".repeat(MAX_VIEW_NAME_LEN + 1);
        assert!(matches!(
            saved.add(&long, TaskFilters::default()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_eleventh_view_is_rejected() {
        let mut saved = SavedViews::new();
        for i in 0..MAX_USER_VIEWS {
            saved
                .add(&format!("View {}", i), TaskFilters::default())
                .unwrap();
        }
        assert_eq!(saved.user_views().len(), MAX_USER_VIEWS);
        let err = saved.add("One too many", TaskFilters::default());
        assert!(matches!(err, Err(Error::ViewLimit(MAX_USER_VIEWS))));
        // The failed add must not grow the list
        assert_eq!(saved.user_views().len(), MAX_USER_VIEWS);
    }

    #[test]
    fn test_remove_user_view() {
        let mut saved = SavedViews::new();
        let view = saved.add("Errands", TaskFilters::default()).unwrap();
        assert!(saved.remove(&view.id));
        assert!(saved.user_views().is_empty());
    }

    #[test]
    fn test_remove_system_or_unknown_is_noop() {
        let mut saved = SavedViews::new();
        saved.add("Errands", TaskFilters::default()).unwrap();
        assert!(!saved.remove("view-all"));
        assert!(!saved.remove("view-does-not-exist"));
        assert_eq!(saved.user_views().len(), 1);
        assert_eq!(saved.all().len(), 4);
    }

    #[test]
    fn test_fresh_ids_per_view() {
        let mut saved = SavedViews::new();
        let a = saved.add("A", TaskFilters::default()).unwrap();
        let b = saved.add("B", TaskFilters::default()).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_find_matching_prefers_system_presets() {
        let mut saved = SavedViews::new();
        saved.add("My today", due_filters(DueBucket::Today)).unwrap();
        let hit = saved.find_matching(&due_filters(DueBucket::Today)).unwrap();
        assert_eq!(hit.id, "view-today");

        assert!(saved.find_matching(&due_filters(DueBucket::NextWeek)).is_none());
    }

    #[test]
    fn test_from_views_discards_system_and_overflow() {
        let mut persisted: Vec<SavedView> = (0..12)
            .map(|i| SavedView {
                id: format!("u-{}", i),
                name: format!("View {}", i),
                filters: TaskFilters::default(),
                is_system: false,
            })
            .collect();
        persisted.insert(
            0,
            SavedView {
                id: "view-all".to_string(),
                name: "All".to_string(),
                filters: TaskFilters::default(),
                is_system: true,
            },
        );
        let saved = SavedViews::from_views(persisted);
        assert_eq!(saved.user_views().len(), MAX_USER_VIEWS);
        assert!(saved.user_views().iter().all(|v| !v.is_system));
    }
}
