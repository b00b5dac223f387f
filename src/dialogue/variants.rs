//! Variant selection: which phrasing of a step's message to show next.

use super::table::DialogueTable;
use super::types::{Personality, Step};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Picks step variants without repeating a phrase until the step's pool has
/// been cycled through.
#[derive(Debug, Default)]
pub struct VariantSelector {
    used: HashMap<Step, HashSet<usize>>,
}

impl VariantSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a variant for `step`.
    ///
    /// With a `personality` that has tagged variants in the pool, one of those
    /// is picked uniformly and the used-set is left alone. Otherwise an unused
    /// index is picked and recorded, clearing the set first if every index has
    /// already been served. A missing step or empty pool logs and yields `""`.
    pub fn select<R: Rng + ?Sized>(
        &mut self,
        table: &DialogueTable,
        step: Step,
        personality: Option<Personality>,
        rng: &mut R,
    ) -> String {
        let variants = match table.get(step) {
            Some(d) if !d.variants.is_empty() => &d.variants,
            _ => {
                tracing::warn!("[Variants] No dialogue found for step: {}", step);
                return String::new();
            }
        };

        if let Some(personality) = personality {
            let tagged: Vec<&str> = variants
                .iter()
                .filter(|v| v.mood == Some(personality))
                .map(|v| v.text.as_str())
                .collect();
            if let Some(text) = tagged.choose(rng) {
                return text.to_string();
            }
        }

        let used = self.used.entry(step).or_default();
        if used.len() >= variants.len() {
            used.clear();
        }
        let free: Vec<usize> = (0..variants.len()).filter(|i| !used.contains(i)).collect();
        // `free` is non-empty: the set was cleared if it covered every index
        let index = free[rng.gen_range(0..free.len())];
        used.insert(index);
        variants[index].text.clone()
    }

    /// Indices already served for `step`.
    pub fn used(&self, step: Step) -> Option<&HashSet<usize>> {
        self.used.get(&step)
    }
}

/// Reaction phrase shown right after the user answers a question.
///
/// While grumpy, a step's dedicated grumpy line for the choice wins outright.
/// Otherwise one of the step's reactions for the choice is picked at random.
pub fn select_reaction<R: Rng + ?Sized>(
    table: &DialogueTable,
    step: Step,
    choice_key: &str,
    personality: Option<Personality>,
    rng: &mut R,
) -> String {
    let Some(dialogue) = table.get(step) else {
        tracing::warn!("[Variants] No dialogue found for step: {}", step);
        return String::new();
    };

    if personality == Some(Personality::Grumpy) {
        if let Some(text) = dialogue.grumpy_reactions.get(choice_key) {
            return text.clone();
        }
    }

    dialogue
        .reactions
        .get(choice_key)
        .and_then(|list| list.choose(rng))
        .cloned()
        .unwrap_or_default()
}
