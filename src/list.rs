//! Property and enumeration entry store
//!
//! An insertion-ordered list of name/value entries, used both for a device's
//! property list and for enumeration results. Names and values are bounded:
//! anything longer than [`NAME_CAPACITY`] bytes is silently truncated at a
//! character boundary, matching the fixed-size buffers of the emulated API.

/// Usable capacity of entry names and values, in bytes.
pub const NAME_CAPACITY: usize = 31;

fn clamp(s: &str) -> String {
    if s.len() <= NAME_CAPACITY {
        return s.to_string();
    }
    let mut end = NAME_CAPACITY;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

/// One name/value entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    name: String,
    value: Option<String>,
}

impl Entry {
    fn new(name: &str, value: Option<&str>) -> Self {
        Self {
            name: clamp(name),
            value: value.map(clamp),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

/// Insertion-ordered entry list. Single-owner; a fresh [`EntryList::iter`]
/// always restarts from the head.
#[derive(Debug, Clone, Default)]
pub struct EntryList {
    entries: Vec<Entry>,
}

impl EntryList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, preserving insertion order.
    pub fn push(&mut self, name: &str, value: Option<&str>) {
        self.entries.push(Entry::new(name, value));
    }

    /// Append a value-less entry.
    pub fn push_name(&mut self, name: &str) {
        self.push(name, None);
    }

    /// Value of the first entry whose name matches exactly.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .and_then(|entry| entry.value())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a EntryList {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_preserved() {
        let mut list = EntryList::new();
        list.push("ID_INPUT", Some("1"));
        list.push("ID_INPUT_MOUSE", Some("1"));
        list.push_name("/dev/input/event0");

        let names: Vec<&str> = list.iter().map(Entry::name).collect();
        assert_eq!(names, ["ID_INPUT", "ID_INPUT_MOUSE", "/dev/input/event0"]);
    }

    #[test]
    fn test_get_exact_match() {
        let mut list = EntryList::new();
        list.push("ID_INPUT", Some("1"));
        list.push("ID_INPUT_KEYBOARD", Some("1"));

        assert_eq!(list.get("ID_INPUT"), Some("1"));
        assert_eq!(list.get("ID_INPUT_KEYBOARD"), Some("1"));
        assert_eq!(list.get("ID_INPUT_KEY"), None);
        assert_eq!(list.get("ID_INPUT_JOYSTICK"), None);
    }

    #[test]
    fn test_name_truncated_at_capacity() {
        let long = "x".repeat(NAME_CAPACITY + 9);
        let mut list = EntryList::new();
        list.push(&long, Some(&long));

        let entry = list.iter().next().unwrap();
        assert_eq!(entry.name().len(), NAME_CAPACITY);
        assert_eq!(entry.value().unwrap().len(), NAME_CAPACITY);
    }

    #[test]
    fn test_truncation_respects_char_boundary() {
        // 16 two-byte characters: 32 bytes, one past capacity.
        let name = "é".repeat(16);
        let mut list = EntryList::new();
        list.push_name(&name);

        let entry = list.iter().next().unwrap();
        assert_eq!(entry.name().len(), 30);
        assert_eq!(entry.name().chars().count(), 15);
    }

    #[test]
    fn test_short_names_survive_round_trip() {
        let mut list = EntryList::new();
        list.push("NAME", Some("Sony PLAYSTATION(R)3 Controller"));
        assert_eq!(list.get("NAME"), Some("Sony PLAYSTATION(R)3 Controller"));
    }

    #[test]
    fn test_iter_restartable_from_head() {
        let mut list = EntryList::new();
        list.push_name("a");
        list.push_name("b");

        assert_eq!(list.iter().count(), 2);
        // A fresh traversal starts over after an earlier one was exhausted.
        assert_eq!(list.iter().count(), 2);
    }

    #[test]
    fn test_clear_releases_all_entries() {
        let mut list = EntryList::new();
        list.push_name("a");
        list.push_name("b");
        list.clear();
        assert!(list.is_empty());
        assert_eq!(list.iter().count(), 0);
    }
}
