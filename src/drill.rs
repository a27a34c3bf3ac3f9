use crate::resolver::{CodePair, PhoneticResolver};
use log::warn;
use serde::{Deserialize, Serialize};

/// One practice character with its expected two-key code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrillItem {
    pub character: char,
    pub initial_code: String,
    pub final_code: String,
}

impl DrillItem {
    pub fn new(character: char, codes: CodePair) -> Self {
        Self {
            character,
            initial_code: codes.initial_code,
            final_code: codes.final_code,
        }
    }

    /// An item with an empty code can never be completed
    pub fn is_reachable(&self) -> bool {
        !self.initial_code.is_empty() && !self.final_code.is_empty()
    }
}

/// Resolve practice characters into drill items, keeping length and order.
///
/// Characters the resolver cannot map are kept with empty codes.
pub fn prepare_items(characters: &[char], resolver: &dyn PhoneticResolver) -> Vec<DrillItem> {
    let items: Vec<DrillItem> = characters
        .iter()
        .map(|&c| DrillItem::new(c, resolver.resolve(c)))
        .collect();

    for (idx, item) in items.iter().enumerate().filter(|(_, i)| !i.is_reachable()) {
        warn!(
            "no shuangpin code for '{}' at position {}; it cannot be completed",
            item.character, idx
        );
    }

    items
}

/// Build items from already resolved `(character, initial, final)` triples
pub fn from_resolved<'a, I>(resolved: I) -> Vec<DrillItem>
where
    I: IntoIterator<Item = (char, &'a str, &'a str)>,
{
    resolved
        .into_iter()
        .map(|(c, initial, fin)| DrillItem::new(c, CodePair::new(initial, fin)))
        .collect()
}
