//! Bucket builder: flattens a page of timeline instructions into items and
//! walk cursors.

use std::collections::HashSet;

use serde_json::Value;

use super::item::{Cursor, CursorDirection, Item, WalkDirection};

/// Working set for one reconstruction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bucket {
    /// Items eligible as thread continuation (author-scoped after the first page).
    pub known_items: Vec<Item>,
    /// Every item seen on any page, unfiltered.
    pub all_items: Vec<Item>,
    /// At most one cursor per direction.
    pub cursors: Vec<Cursor>,
}

/// Result of looking up the parent of an item.
#[derive(Debug, Clone, PartialEq)]
pub enum ParentLookup {
    Found(Item),
    /// Item has no parent, or is its own parent.
    Root,
    /// Item is known but its parent has not been seen yet.
    Missing { parent_id: String },
    /// The item itself is not in the bucket.
    Unknown,
}

impl Bucket {
    pub fn from_items(items: Vec<Item>, cursors: Vec<Cursor>) -> Self {
        Self {
            known_items: items.clone(),
            all_items: items,
            cursors,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.all_items.is_empty()
    }

    /// Look up an item by id among everything seen.
    pub fn find(&self, id: &str) -> Option<&Item> {
        self.all_items.iter().find(|item| item.id == id)
    }

    /// Restrict `known_items` to one author; `all_items` is untouched.
    pub fn scope_to_author(&mut self, author_key: Option<&str>) {
        self.known_items
            .retain(|item| item.author_key.as_deref() == author_key);
    }

    /// First known item replying to `id`.
    pub fn find_child(&self, id: &str) -> Option<&Item> {
        self.known_items
            .iter()
            .find(|item| item.id != id && item.parent_id.as_deref() == Some(id))
    }

    /// Parent of `id`, searched among all items regardless of author.
    pub fn find_parent(&self, id: &str) -> ParentLookup {
        let Some(item) = self.find(id) else {
            return ParentLookup::Unknown;
        };
        if item.is_root() {
            return ParentLookup::Root;
        }
        let parent_id = item.parent_id.clone().unwrap_or_default();
        match self.find(&parent_id) {
            Some(parent) => ParentLookup::Found(parent.clone()),
            None => ParentLookup::Missing { parent_id },
        }
    }

    /// First cursor usable for `direction` whose value has not been consumed.
    pub fn cursor_for(&self, direction: WalkDirection, consumed: &HashSet<String>) -> Option<&Cursor> {
        self.cursors
            .iter()
            .find(|c| direction.accepts(c.direction) && !consumed.contains(&c.value))
    }

    /// Append a forward page: continuation candidates are scoped to
    /// `author_key`, the unfiltered items go to `all_items`.
    pub fn merge_forward(&mut self, page: Bucket, author_key: Option<&str>) {
        let Bucket {
            all_items, cursors, ..
        } = page;
        let mut known_ids: HashSet<String> =
            self.known_items.iter().map(|i| i.id.clone()).collect();
        let mut all_ids: HashSet<String> = self.all_items.iter().map(|i| i.id.clone()).collect();

        for item in all_items {
            if item.author_key.as_deref() == author_key && known_ids.insert(item.id.clone()) {
                self.known_items.push(item.clone());
            }
            if all_ids.insert(item.id.clone()) {
                self.all_items.push(item);
            }
        }
        self.cursors = consolidate_cursors(&self.cursors, &cursors);
    }

    /// Prepend a backward page: ancestors come before what we already have.
    pub fn merge_backward(&mut self, page: Bucket, author_key: Option<&str>) {
        let Bucket {
            all_items, cursors, ..
        } = page;
        let known_ids: HashSet<&str> = self.known_items.iter().map(|i| i.id.as_str()).collect();
        let all_ids: HashSet<&str> = self.all_items.iter().map(|i| i.id.as_str()).collect();

        let fresh_known: Vec<Item> = all_items
            .iter()
            .filter(|i| i.author_key.as_deref() == author_key && !known_ids.contains(i.id.as_str()))
            .cloned()
            .collect();
        let fresh_all: Vec<Item> = all_items
            .into_iter()
            .filter(|i| !all_ids.contains(i.id.as_str()))
            .collect();

        self.known_items.splice(0..0, fresh_known);
        self.all_items.splice(0..0, fresh_all);
        self.cursors = consolidate_cursors(&self.cursors, &cursors);
    }
}

/// Replace each old cursor with the newer cursor of the same direction.
///
/// Directions that appear only in `new` are appended rather than dropped.
pub fn consolidate_cursors(old: &[Cursor], new: &[Cursor]) -> Vec<Cursor> {
    let mut merged: Vec<Cursor> = old
        .iter()
        .map(|cursor| {
            new.iter()
                .find(|c| c.direction == cursor.direction)
                .unwrap_or(cursor)
                .clone()
        })
        .collect();

    for cursor in new {
        if !merged.iter().any(|c| c.direction == cursor.direction) {
            merged.push(cursor.clone());
        }
    }
    merged
}

// =============================================================================
// BUILDER
// =============================================================================

/// Unwrap a `tweet_results.result` node into the status object it carries.
///
/// Visibility-wrapped statuses hold the real status under `tweet`.
pub fn status_from_result(result: &Value) -> Option<&Value> {
    match result.get("__typename").and_then(Value::as_str) {
        Some("Tweet") => Some(result),
        Some("TweetWithVisibilityResults") => result.get("tweet"),
        _ => None,
    }
}

/// Flatten one page of timeline instructions.
///
/// Entries may be plain timeline items or modules wrapping several items;
/// both collapse into one ordered list. `known_items` starts unfiltered; author
/// scoping happens once the focal item is known.
pub fn build_bucket(instructions: &Value) -> Bucket {
    let mut items = Vec::new();
    let mut cursors = Vec::new();

    for instruction in instructions.as_array().into_iter().flatten() {
        let kind = instruction.get("type").and_then(Value::as_str);
        if !matches!(kind, Some("TimelineAddEntries" | "TimelineAddToModule")) {
            continue;
        }
        let entries = instruction
            .get("entries")
            .or_else(|| instruction.get("moduleItems"))
            .and_then(Value::as_array);

        for entry in entries.into_iter().flatten() {
            let Some(content) = entry.get("item").or_else(|| entry.get("content")) else {
                continue;
            };
            if let Some(modules) = content.get("items").and_then(Value::as_array) {
                for module_item in modules {
                    if let Some(item_content) = module_item.pointer("/item/itemContent") {
                        collect_item_content(item_content, &mut items, &mut cursors);
                    }
                }
            } else if let Some(item_content) = content.get("itemContent") {
                collect_item_content(item_content, &mut items, &mut cursors);
            } else if content.get("__typename").and_then(Value::as_str)
                == Some("TimelineTimelineCursor")
            {
                collect_cursor(content, &mut cursors);
            }
        }
    }

    let mut seen = HashSet::new();
    items.retain(|item: &Item| seen.insert(item.id.clone()));

    Bucket::from_items(items, cursors)
}

fn collect_item_content(content: &Value, items: &mut Vec<Item>, cursors: &mut Vec<Cursor>) {
    match content.get("__typename").and_then(Value::as_str) {
        Some("TimelineTweet") => {
            if let Some(item) = content
                .pointer("/tweet_results/result")
                .and_then(status_from_result)
                .and_then(Item::from_status)
            {
                items.push(item);
            }
        }
        Some("TimelineTimelineCursor") => collect_cursor(content, cursors),
        _ => {}
    }
}

fn collect_cursor(content: &Value, cursors: &mut Vec<Cursor>) {
    let direction = content
        .get("cursorType")
        .and_then(Value::as_str)
        .and_then(CursorDirection::from_tag);
    let value = content.get("value").and_then(Value::as_str);
    if let (Some(direction), Some(value)) = (direction, value) {
        let cursor = Cursor::new(direction, value);
        // Newer cursor for the same direction supersedes.
        cursors.retain(|c| c.direction != direction);
        cursors.push(cursor);
    }
}
