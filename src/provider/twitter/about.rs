//! Account-origin enrichment for the authors of a built thread.
//!
//! One optional lookup per distinct screen name; whatever comes back is
//! merged into every matching [`Author`]. Missing answers change nothing.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, SecondsFormat};
use serde_json::Value;

use crate::thread::{AboutAccount, Author, Thread, UsernameChanges};

/// Distinct screen names in `thread`, keyed by their lowercase form.
///
/// The first spelling seen wins.
pub fn screen_names(thread: &Thread) -> BTreeMap<String, String> {
    let statuses = thread.status.iter().chain(thread.thread.iter().flatten());
    let authors = thread
        .author
        .iter()
        .chain(statuses.filter_map(|s| s.author.as_ref()));

    let mut names = BTreeMap::new();
    for name in authors.filter_map(|a| a.screen_name.as_deref()) {
        names
            .entry(name.to_lowercase())
            .or_insert_with(|| name.to_string());
    }
    names
}

/// Reads the `about_profile` of an account lookup, if it has one.
pub fn parse_about_account(response: &Value) -> Option<AboutAccount> {
    let about = response.pointer("/data/user_result_by_screen_name/result/about_profile")?;
    if !about.is_object() {
        return None;
    }
    let text = |field: &str| about.get(field).and_then(Value::as_str).map(str::to_string);
    let flag = |field: &str| about.get(field).and_then(Value::as_bool);

    Some(AboutAccount {
        based_in: text("account_based_in"),
        location_accurate: flag("location_accurate"),
        created_country_accurate: flag("created_country_accurate"),
        source: text("source"),
        username_changes: about.get("username_changes").map(username_changes),
    })
}

fn username_changes(changes: &Value) -> UsernameChanges {
    // Upstream sends both numbers as decimal strings.
    let number = |field: &str| match changes.get(field) {
        Some(Value::String(s)) => s.parse::<u64>().ok(),
        Some(v) => v.as_u64(),
        None => None,
    };
    let last_changed_at = number("last_changed_at_msec")
        .and_then(|ms| i64::try_from(ms).ok())
        .and_then(DateTime::from_timestamp_millis)
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true));

    UsernameChanges {
        count: number("count").unwrap_or(0),
        last_changed_at,
    }
}

/// Merge lookups (keyed by lowercase screen name) into every author of
/// `thread`. Returns how many authors changed.
pub fn apply_about_accounts(thread: &mut Thread, found: &HashMap<String, AboutAccount>) -> usize {
    let mut merged = 0;
    for author in authors_mut(thread) {
        let Some(key) = author.screen_name.as_deref().map(str::to_lowercase) else {
            continue;
        };
        if let Some(about) = found.get(&key) {
            merge_into(author.about_account.get_or_insert_with(AboutAccount::default), about);
            merged += 1;
        }
    }
    merged
}

fn authors_mut(thread: &mut Thread) -> impl Iterator<Item = &mut Author> + '_ {
    let statuses = thread
        .status
        .iter_mut()
        .chain(thread.thread.iter_mut().flatten());
    thread
        .author
        .iter_mut()
        .chain(statuses.filter_map(|s| s.author.as_mut()))
}

fn merge_into(target: &mut AboutAccount, from: &AboutAccount) {
    if from.based_in.is_some() {
        target.based_in.clone_from(&from.based_in);
    }
    if from.location_accurate.is_some() {
        target.location_accurate = from.location_accurate;
    }
    if from.created_country_accurate.is_some() {
        target.created_country_accurate = from.created_country_accurate;
    }
    if from.source.is_some() {
        target.source.clone_from(&from.source);
    }
    if from.username_changes.is_some() {
        target.username_changes.clone_from(&from.username_changes);
    }
}
