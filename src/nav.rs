use crate::manifest::{build_folder_index, ManifestEntry};

/// Which folder is active, its records in manifest order, and the record on screen.
///
/// The index here is the only source of truth for prev/next; the record list
/// cursor in the UI is just a view of it.
#[derive(Debug, Clone, Default)]
pub struct NavigationState {
    entries: Vec<ManifestEntry>,
    folders: Vec<String>,
    folder: Option<String>,
    active: Vec<usize>,
    index: usize,
}

impl NavigationState {
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        let folders = build_folder_index(&entries);
        Self {
            entries,
            folders,
            ..Self::default()
        }
    }

    pub fn folders(&self) -> &[String] {
        &self.folders
    }

    pub fn folder(&self) -> Option<&str> {
        self.folder.as_deref()
    }

    pub fn active_entries(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.active.iter().map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Position of the current record in the active folder, if any.
    pub fn position(&self) -> Option<usize> {
        (!self.active.is_empty()).then_some(self.index)
    }

    pub fn current(&self) -> Option<&ManifestEntry> {
        self.active.get(self.index).map(|&i| &self.entries[i])
    }

    /// Rebuild the active sequence for `folder` and point at its first record.
    pub fn select_folder(&mut self, folder: &str) -> Option<&ManifestEntry> {
        self.folder = Some(folder.to_string());
        self.active = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.folder == folder)
            .map(|(i, _)| i)
            .collect();
        self.index = 0;
        self.current()
    }

    /// Jump to `path` within the active folder. Unknown paths leave the state alone.
    pub fn select_record(&mut self, path: &str) -> Option<&ManifestEntry> {
        let pos = self
            .active
            .iter()
            .position(|&i| self.entries[i].json_path == path)?;
        self.index = pos;
        self.current()
    }

    /// Move by `offset`, wrapping at both ends.
    pub fn step(&mut self, offset: isize) -> Option<&ManifestEntry> {
        if self.active.is_empty() {
            return None;
        }
        let len = self.active.len() as isize;
        self.index = (self.index as isize + offset).rem_euclid(len) as usize;
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> Vec<ManifestEntry> {
        [("b", "1"), ("a", "1"), ("b", "2"), ("b", "3"), ("a", "2")]
            .iter()
            .map(|(folder, n)| ManifestEntry {
                folder: folder.to_string(),
                name: format!("{}.json", n),
                json_path: format!("annotation_data/{}/{}.json", folder, n),
                game: None,
            })
            .collect()
    }

    fn paths(nav: &NavigationState) -> Vec<String> {
        nav.active_entries().map(|e| e.json_path.clone()).collect()
    }

    #[test]
    fn folders_are_sorted() {
        let nav = NavigationState::new(manifest());
        assert_eq!(nav.folders(), &["a".to_string(), "b".to_string()]);
        assert!(nav.current().is_none());
        assert_eq!(nav.position(), None);
    }

    #[test]
    fn select_folder_filters_in_manifest_order() {
        let mut nav = NavigationState::new(manifest());
        let first = nav.select_folder("b").map(|e| e.json_path.clone());
        assert_eq!(first.as_deref(), Some("annotation_data/b/1.json"));
        assert_eq!(
            paths(&nav),
            vec![
                "annotation_data/b/1.json",
                "annotation_data/b/2.json",
                "annotation_data/b/3.json"
            ]
        );
        assert_eq!(nav.position(), Some(0));
    }

    #[test]
    fn empty_folder_selects_nothing() {
        let mut nav = NavigationState::new(manifest());
        assert!(nav.select_folder("missing").is_none());
        assert!(nav.is_empty());
        assert!(nav.step(1).is_none());
        assert!(nav.step(-1).is_none());
        assert_eq!(nav.position(), None);
    }

    #[test]
    fn step_wraps_both_ways() {
        let mut nav = NavigationState::new(manifest());
        nav.select_folder("b");
        let n = nav.len();
        assert_eq!(n, 3);
        nav.select_record("annotation_data/b/3.json");
        assert_eq!(nav.position(), Some(n - 1));
        nav.step(1);
        assert_eq!(nav.position(), Some(0));
        nav.step(-1);
        assert_eq!(nav.position(), Some(n - 1));
        nav.step(-1);
        assert_eq!(nav.position(), Some(n - 2));
    }

    #[test]
    fn select_record_outside_folder_is_ignored() {
        let mut nav = NavigationState::new(manifest());
        nav.select_folder("b");
        nav.step(1);
        assert!(nav.select_record("annotation_data/a/1.json").is_none());
        assert_eq!(nav.position(), Some(1));
        let got = nav.select_record("annotation_data/b/3.json").map(|e| e.name.clone());
        assert_eq!(got.as_deref(), Some("3.json"));
    }

    #[test]
    fn two_entry_folder_alternates() {
        let mut nav = NavigationState::new(manifest());
        nav.select_folder("a");
        nav.select_record("annotation_data/a/2.json");
        assert_eq!(nav.step(1).map(|e| e.name.as_str()), Some("1.json"));
        assert_eq!(nav.step(1).map(|e| e.name.as_str()), Some("2.json"));
    }
}
