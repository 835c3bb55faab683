//! Symbol-group visibility.

use crate::engine::EngineContext;
use crate::substrate::Substrate;
use crate::table::MarkerRecord;
use std::collections::BTreeSet;

/// Tracks hidden symbol groups and toggles their markers on the substrate.
///
/// Hidden markers keep their record and shape set; only their primitives
/// and labels leave the substrate.
#[derive(Debug, Clone, Default)]
pub struct VisibilityController {
    hidden: BTreeSet<String>,
}

impl VisibilityController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hidden_groups(&self) -> &BTreeSet<String> {
        &self.hidden
    }

    pub fn is_group_hidden(&self, tag: &str) -> bool {
        self.hidden.contains(tag)
    }

    /// Whether a marker belongs on the substrate.
    pub fn is_visible(&self, record: &MarkerRecord) -> bool {
        record.group_tag().is_none_or(|tag| !self.is_group_hidden(tag))
    }

    /// Hide a group. Returns false if it was already hidden.
    pub(crate) fn hide<S: Substrate>(&mut self, ctx: &mut EngineContext, substrate: &mut S, tag: &str) -> bool {
        if !self.hidden.insert(tag.to_string()) {
            return false;
        }
        let members = ctx.table.ids_in_group(tag);
        log::debug!("Hiding symbol group {} ({} markers)", tag, members.len());
        for id in members {
            ctx.hide_marker(substrate, id);
        }
        true
    }

    /// Show a group. Returns false if it was not hidden.
    pub(crate) fn show<S: Substrate>(&mut self, ctx: &mut EngineContext, substrate: &mut S, tag: &str) -> bool {
        if !self.hidden.remove(tag) {
            return false;
        }
        let members = ctx.table.ids_in_group(tag);
        log::debug!("Showing symbol group {} ({} markers)", tag, members.len());
        for id in members {
            ctx.show_marker(substrate, id);
        }
        true
    }

    /// Groups to show and groups to hide to reach `desired`.
    pub fn diff(&self, desired: &BTreeSet<String>) -> (Vec<String>, Vec<String>) {
        let to_show = self.hidden.difference(desired).cloned().collect();
        let to_hide = desired.difference(&self.hidden).cloned().collect();
        (to_show, to_hide)
    }

    pub(crate) fn clear(&mut self) {
        self.hidden.clear();
    }
}
