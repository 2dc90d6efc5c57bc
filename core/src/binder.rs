use serde::{Deserialize, Serialize};

use crate::models::{SlotAssignment, TemplateBinding};

/// Canonical owner of every (rotation-day, slot) → template binding.
///
/// Operations never mutate in place: each returns the next binding set so the
/// caller can persist it verbatim. Per-day views are derived from the single
/// list on read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotTemplateBinder {
    bindings: Vec<TemplateBinding>,
}

impl SlotTemplateBinder {
    /// Build from a stored list. Duplicate (day, slot) pairs collapse to the
    /// last occurrence.
    #[must_use]
    pub fn new(bindings: Vec<TemplateBinding>) -> Self {
        bindings.into_iter().fold(Self::default(), |acc, b| {
            let mut next = acc;
            next.upsert(b);
            next
        })
    }

    #[must_use]
    pub fn bindings(&self) -> &[TemplateBinding] {
        &self.bindings
    }

    #[must_use]
    pub fn into_bindings(self) -> Vec<TemplateBinding> {
        self.bindings
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn upsert(&mut self, binding: TemplateBinding) {
        match self.bindings.iter_mut().find(|b| {
            b.rotation_day_id == binding.rotation_day_id && b.slot_number == binding.slot_number
        }) {
            Some(existing) => *existing = binding,
            None => self.bindings.push(binding),
        }
    }

    fn has_day(&self, rotation_day_id: &str) -> bool {
        self.bindings.iter().any(|b| b.rotation_day_id == rotation_day_id)
    }

    #[must_use]
    pub fn set_mapping(
        &self,
        rotation_day_id: &str,
        rotation_day_name: &str,
        slot_number: i64,
        template_id: &str,
        template_name: &str,
    ) -> Self {
        let mut next = self.clone();
        next.upsert(TemplateBinding {
            rotation_day_id: rotation_day_id.to_string(),
            rotation_day_name: rotation_day_name.to_string(),
            slot_number,
            template_id: template_id.to_string(),
            template_name: template_name.to_string(),
        });
        next
    }

    #[must_use]
    pub fn remove_mapping(&self, rotation_day_id: &str, slot_number: i64) -> Self {
        let mut next = self.clone();
        next.bindings
            .retain(|b| !(b.rotation_day_id == rotation_day_id && b.slot_number == slot_number));
        next
    }

    /// Drop every binding for one rotation day.
    #[must_use]
    pub fn remove_day(&self, rotation_day_id: &str) -> Self {
        let mut next = self.clone();
        next.bindings.retain(|b| b.rotation_day_id != rotation_day_id);
        next
    }

    /// Bindings for one day, ordered by slot number (workout first).
    #[must_use]
    pub fn mappings_for(&self, rotation_day_id: &str) -> Vec<&TemplateBinding> {
        let mut day: Vec<&TemplateBinding> = self
            .bindings
            .iter()
            .filter(|b| b.rotation_day_id == rotation_day_id)
            .collect();
        day.sort_by_key(|b| b.slot_number);
        day
    }

    #[must_use]
    pub fn mapping(&self, rotation_day_id: &str, slot_number: i64) -> Option<&TemplateBinding> {
        self.bindings
            .iter()
            .find(|b| b.rotation_day_id == rotation_day_id && b.slot_number == slot_number)
    }

    /// Replace `target_id`'s bindings with a copy of `source_id`'s.
    ///
    /// Overwrites rather than merges. A source with no bindings, or copying a
    /// day onto itself, returns the set unchanged.
    #[must_use]
    pub fn copy_day(&self, source_id: &str, target_id: &str, target_name: &str) -> Self {
        if source_id == target_id || !self.has_day(source_id) {
            return self.clone();
        }
        let copies: Vec<TemplateBinding> = self
            .mappings_for(source_id)
            .into_iter()
            .map(|b| TemplateBinding {
                rotation_day_id: target_id.to_string(),
                rotation_day_name: target_name.to_string(),
                ..b.clone()
            })
            .collect();
        let mut next = self.remove_day(target_id);
        next.bindings.extend(copies);
        next
    }

    /// What a slot resolves to right now.
    ///
    /// `current_name` looks up a template id and returns its current name, or
    /// `None` if the template is gone; a dangling binding is `Unassigned`.
    pub fn resolve<F>(&self, rotation_day_id: &str, slot_number: i64, current_name: F) -> SlotAssignment
    where
        F: Fn(&str) -> Option<String>,
    {
        self.mapping(rotation_day_id, slot_number)
            .and_then(|b| {
                current_name(&b.template_id).map(|template_name| SlotAssignment::Assigned {
                    template_id: b.template_id.clone(),
                    template_name,
                })
            })
            .unwrap_or(SlotAssignment::Unassigned)
    }
}
