//! Structured attribute classification (spec §4.3).
//!
//! The dictionaries themselves (`spells_attributes`, `paints_attributes`,
//! etc.) are out of this pipeline's scope (spec §1) — they belong to the
//! game's static data. This module owns the defindex-dispatch *logic*,
//! parameterized over an injected [`AttributeDictionary`].

use std::collections::HashMap;

use crate::types::{AttributeValue, Killstreaker, Paint, Sheen, Spell, StrangePart};

/// One parsed attribute off a snapshot/stream item payload, prior to
/// dictionary lookup.
#[derive(Debug, Clone, Copy)]
pub struct RawAttribute {
    pub defindex: i64,
    pub float_value: Option<f64>,
}

/// The result of classifying one attribute against the dictionary.
#[derive(Clone)]
pub enum Classified {
    Spell(Spell),
    Paint(Paint),
    StrangePart(StrangePart),
    Killstreaker(Killstreaker),
    Sheen(Sheen),
    /// Defindex not one this pipeline cares about.
    Unrecognized,
}

/// Lookup contract for the five static attribute dictionaries spec §1
/// excludes from scope.
pub trait AttributeDictionary: Send + Sync {
    fn spell_name(&self, defindex: i64, id: i64) -> Option<String>;
    fn paint_name(&self, id: AttributeValue) -> Option<String>;
    fn strange_part_name(&self, id: AttributeValue) -> Option<String>;
    fn killstreaker_name(&self, id: AttributeValue) -> Option<String>;
    fn sheen_name(&self, id: AttributeValue) -> Option<String>;

    /// Reverse lookup used by the stream dispatcher, which only ever sees a
    /// spell's display name on the wire (spec §4.2): case-insensitive match
    /// against the spell table, returning `(defindex, id)`.
    fn spell_id_from_name(&self, name: &str) -> Option<(i64, i64)>;
}

/// Classify one raw attribute per the defindex dispatch table in spec §4.3.
///
/// `float_value` coercion (int when whole, else float, else null) is the
/// caller's responsibility via [`AttributeValue::from_raw`]; spells default
/// a missing `float_value` to id `1` as specified.
pub fn classify(dict: &dyn AttributeDictionary, attr: RawAttribute) -> Classified {
    match attr.defindex {
        1004..=1009 => {
            let id = attr.float_value.map(|v| v as i64).unwrap_or(1);
            match dict.spell_name(attr.defindex, id) {
                Some(name) => Classified::Spell(Spell { defindex: attr.defindex, id, name }),
                None => Classified::Unrecognized,
            }
        }
        142 => match attr.float_value {
            Some(raw) => {
                let id = AttributeValue::from_raw(raw);
                match dict.paint_name(id) {
                    Some(name) => Classified::Paint(Paint { id, name }),
                    None => Classified::Unrecognized,
                }
            }
            None => Classified::Unrecognized,
        },
        380 | 382 | 384 => match attr.float_value {
            Some(raw) => {
                let id = AttributeValue::from_raw(raw);
                match dict.strange_part_name(id) {
                    Some(name) => Classified::StrangePart(StrangePart { id, name }),
                    None => Classified::Unrecognized,
                }
            }
            None => Classified::Unrecognized,
        },
        2013 => match attr.float_value {
            Some(raw) => {
                let id = AttributeValue::from_raw(raw);
                match dict.killstreaker_name(id) {
                    Some(name) => Classified::Killstreaker(Killstreaker { id, name }),
                    None => Classified::Unrecognized,
                }
            }
            None => Classified::Unrecognized,
        },
        2014 => match attr.float_value {
            Some(raw) => {
                let id = AttributeValue::from_raw(raw);
                match dict.sheen_name(id) {
                    Some(name) => Classified::Sheen(Sheen { id, name }),
                    None => Classified::Unrecognized,
                }
            }
            None => Classified::Unrecognized,
        },
        _ => Classified::Unrecognized,
    }
}

/// Default dictionary: the spell table is the one dictionary the original
/// Python source (`apps/listings-manager/src/utils/utils.py`) carries in
/// full; the other four are injectable and ship empty.
pub struct StaticAttributeDictionary {
    spells: HashMap<(i64, i64), String>,
    paints: HashMap<String, String>,
    strange_parts: HashMap<String, String>,
    killstreakers: HashMap<String, String>,
    sheens: HashMap<String, String>,
}

impl StaticAttributeDictionary {
    pub fn new() -> Self {
        Self {
            spells: default_spells_table(),
            paints: HashMap::new(),
            strange_parts: HashMap::new(),
            killstreakers: HashMap::new(),
            sheens: HashMap::new(),
        }
    }

    /// Replace one of the four injectable tables (paint/strange
    /// part/killstreaker/sheen), keyed by the attribute's stringified id.
    pub fn with_table(mut self, table: AttributeTable, entries: HashMap<String, String>) -> Self {
        match table {
            AttributeTable::Paint => self.paints = entries,
            AttributeTable::StrangePart => self.strange_parts = entries,
            AttributeTable::Killstreaker => self.killstreakers = entries,
            AttributeTable::Sheen => self.sheens = entries,
        }
        self
    }
}

impl Default for StaticAttributeDictionary {
    fn default() -> Self {
        Self::new()
    }
}

/// One of the four dictionaries that are injected rather than built in.
pub enum AttributeTable {
    Paint,
    StrangePart,
    Killstreaker,
    Sheen,
}

impl AttributeDictionary for StaticAttributeDictionary {
    fn spell_name(&self, defindex: i64, id: i64) -> Option<String> {
        self.spells.get(&(defindex, id)).cloned()
    }

    fn paint_name(&self, id: AttributeValue) -> Option<String> {
        self.paints.get(&id.to_string()).cloned()
    }

    fn strange_part_name(&self, id: AttributeValue) -> Option<String> {
        self.strange_parts.get(&id.to_string()).cloned()
    }

    fn killstreaker_name(&self, id: AttributeValue) -> Option<String> {
        self.killstreakers.get(&id.to_string()).cloned()
    }

    fn sheen_name(&self, id: AttributeValue) -> Option<String> {
        self.sheens.get(&id.to_string()).cloned()
    }

    fn spell_id_from_name(&self, name: &str) -> Option<(i64, i64)> {
        self.spells
            .iter()
            .find(|(_, spell_name)| spell_name.eq_ignore_ascii_case(name))
            .map(|((defindex, id), _)| (*defindex, *id))
    }
}

/// The spell defindex/id -> name table, ported in full from
/// `examples/original_source/apps/listings-manager/src/utils/utils.py`.
fn default_spells_table() -> HashMap<(i64, i64), String> {
    let mut m = HashMap::new();
    for (id, name) in [
        (0, "Die Job"),
        (1, "Chromatic Corruption"),
        (2, "Putrescent Pigmentation"),
        (3, "Spectral Spectrum"),
        (4, "Sinister Staining"),
    ] {
        m.insert((1004, id), name.to_string());
    }
    for (id, name) in [
        (1, "Team Spirit Footprints"),
        (2, "Headless Horseshoes"),
        (3100495, "Corpse Gray Footprints"),
        (5322826, "Violent Violet Footprints"),
        (8208497, "Bruised Purple Footprints"),
        (8421376, "Gangreen Footprints"),
        (13595446, "Rotten Orange Footprints"),
    ] {
        m.insert((1005, id), name.to_string());
    }
    m.insert((1006, 1), "Voices From Below".to_string());
    m.insert((1007, 1), "Pumpkin Bombs".to_string());
    m.insert((1008, 1), "Halloween Fire".to_string());
    m.insert((1009, 1), "Exorcism".to_string());
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spell_defindex_missing_float_value_defaults_to_id_one() {
        let dict = StaticAttributeDictionary::new();
        let classified = classify(&dict, RawAttribute { defindex: 1008, float_value: None });
        match classified {
            Classified::Spell(s) => {
                assert_eq!(s.id, 1);
                assert_eq!(s.name, "Halloween Fire");
            }
            other => panic!("expected spell, got {other:?}"),
        }
    }

    #[test]
    fn paint_defindex_looks_up_injected_table() {
        let dict = StaticAttributeDictionary::new().with_table(
            AttributeTable::Paint,
            HashMap::from([("5801378".to_string(), "Indubitably Green".to_string())]),
        );
        let classified =
            classify(&dict, RawAttribute { defindex: 142, float_value: Some(5801378.0) });
        match classified {
            Classified::Paint(p) => {
                assert_eq!(p.id, AttributeValue::Int(5801378));
                assert_eq!(p.name, "Indubitably Green");
            }
            other => panic!("expected paint, got {other:?}"),
        }
    }

    #[test]
    fn unknown_defindex_is_unrecognized() {
        let dict = StaticAttributeDictionary::new();
        let classified = classify(&dict, RawAttribute { defindex: 9999, float_value: Some(1.0) });
        assert!(matches!(classified, Classified::Unrecognized));
    }

    #[test]
    fn spell_id_from_name_is_case_insensitive() {
        let dict = StaticAttributeDictionary::new();
        assert_eq!(dict.spell_id_from_name("halloween fire"), Some((1008, 1)));
        assert_eq!(dict.spell_id_from_name("Exorcism"), Some((1009, 1)));
        assert_eq!(dict.spell_id_from_name("not a spell"), None);
    }

    #[test]
    fn strange_part_without_dictionary_entry_is_unrecognized() {
        let dict = StaticAttributeDictionary::new();
        let classified =
            classify(&dict, RawAttribute { defindex: 380, float_value: Some(27.0) });
        assert!(matches!(classified, Classified::Unrecognized));
    }
}

impl std::fmt::Debug for Classified {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classified::Spell(s) => write!(f, "Spell({s:?})"),
            Classified::Paint(p) => write!(f, "Paint({p:?})"),
            Classified::StrangePart(p) => write!(f, "StrangePart({p:?})"),
            Classified::Killstreaker(k) => write!(f, "Killstreaker({k:?})"),
            Classified::Sheen(s) => write!(f, "Sheen({s:?})"),
            Classified::Unrecognized => write!(f, "Unrecognized"),
        }
    }
}
