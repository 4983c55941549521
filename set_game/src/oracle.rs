//! Set validity checking.
//!
//! The engine only needs two answers from the rules of the game: whether a
//! group of cards is a legal set, and whether any legal set hides in a pile
//! of cards. `FeatureOracle` answers both for the standard game, where every
//! card id encodes `feature_count` features with `feature_size` values each.

use std::collections::{HashMap, HashSet};

use crate::{CardId, config::GameConfig};

/// Decides set legality. Implementations must be pure.
///
/// Only `set_size` and `is_valid_set` are required; the search methods fall
/// back to trying every combination.
pub trait SetOracle: Send + Sync {
    /// Number of cards in a set
    fn set_size(&self) -> usize;

    /// True iff `cards` form a legal set
    fn is_valid_set(&self, cards: &[CardId]) -> bool;

    /// Up to `limit` legal sets drawn from `cards`, each in input order
    fn find_sets(&self, cards: &[CardId], limit: usize) -> Vec<Vec<CardId>> {
        let mut found = Vec::new();
        let mut chosen = Vec::with_capacity(self.set_size());
        combinations(self, cards, 0, &mut chosen, limit, &mut found);
        found
    }

    /// True iff at least one legal set can be drawn from `cards`
    fn exists_set(&self, cards: &[CardId]) -> bool {
        !self.find_sets(cards, 1).is_empty()
    }
}

fn combinations<O: SetOracle + ?Sized>(
    oracle: &O,
    cards: &[CardId],
    start: usize,
    chosen: &mut Vec<CardId>,
    limit: usize,
    found: &mut Vec<Vec<CardId>>,
) {
    if found.len() >= limit {
        return;
    }
    if chosen.len() == oracle.set_size() {
        if oracle.is_valid_set(chosen) {
            found.push(chosen.clone());
        }
        return;
    }
    for i in start..cards.len() {
        if cards.len() - i < oracle.set_size() - chosen.len() || found.len() >= limit {
            break;
        }
        chosen.push(cards[i]);
        combinations(oracle, cards, i + 1, chosen, limit, found);
        chosen.pop();
    }
}

/// Standard Set rules: for every feature, the cards of a set show either the
/// same value or pairwise different values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureOracle {
    feature_size: usize,
    feature_count: usize,
}

impl FeatureOracle {
    pub fn new(feature_size: usize, feature_count: usize) -> Self {
        Self {
            feature_size,
            feature_count,
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(config.feature_size, config.feature_count)
    }

    /// Decode a card id into its feature values, least significant first
    pub fn card_to_features(&self, card: CardId) -> Vec<usize> {
        let mut rest = card;
        (0..self.feature_count)
            .map(|_| {
                let value = rest % self.feature_size;
                rest /= self.feature_size;
                value
            })
            .collect()
    }

    fn features_to_card(&self, features: &[usize]) -> CardId {
        features
            .iter()
            .rev()
            .fold(0, |card, value| card * self.feature_size + value)
    }

    fn search(
        &self,
        cards: &[CardId],
        position: &HashMap<CardId, usize>,
        start: usize,
        chosen: &mut Vec<usize>,
        limit: usize,
        found: &mut Vec<Vec<CardId>>,
    ) {
        // The last card of a set is fully determined by the others.
        if chosen.len() + 1 == self.feature_size {
            let partial: Vec<CardId> = chosen.iter().map(|&i| cards[i]).collect();
            let Some(last) = self.completing_card(&partial) else {
                return;
            };
            let after_chosen = chosen.last().copied().unwrap_or(0);
            if let Some(&idx) = position.get(&last)
                && idx > after_chosen
            {
                let mut set = partial;
                set.push(last);
                found.push(set);
            }
            return;
        }

        for i in start..cards.len() {
            if found.len() >= limit {
                return;
            }
            if cards.len() - i < self.feature_size - chosen.len() {
                break;
            }
            chosen.push(i);
            self.search(cards, position, i + 1, chosen, limit, found);
            chosen.pop();
        }
    }

    /// The only card that turns `partial` (one card short of a set) into a set
    fn completing_card(&self, partial: &[CardId]) -> Option<CardId> {
        let decoded: Vec<Vec<usize>> = partial.iter().map(|&c| self.card_to_features(c)).collect();
        let mut features = Vec::with_capacity(self.feature_count);

        for f in 0..self.feature_count {
            let values: Vec<usize> = decoded.iter().map(|d| d[f]).collect();
            let distinct: HashSet<usize> = values.iter().copied().collect();
            if distinct.len() == 1 {
                features.push(values[0]);
            } else if distinct.len() == values.len() {
                let missing = (0..self.feature_size).find(|v| !distinct.contains(v))?;
                features.push(missing);
            } else {
                return None;
            }
        }

        Some(self.features_to_card(&features))
    }
}

impl SetOracle for FeatureOracle {
    fn set_size(&self) -> usize {
        self.feature_size
    }

    /// Picks all but the last card and looks the completing card up directly.
    fn find_sets(&self, cards: &[CardId], limit: usize) -> Vec<Vec<CardId>> {
        let mut found = Vec::new();
        if limit == 0 || cards.len() < self.feature_size {
            return found;
        }

        let position: HashMap<CardId, usize> =
            cards.iter().enumerate().map(|(i, &c)| (c, i)).collect();
        let mut chosen = Vec::with_capacity(self.feature_size);
        self.search(cards, &position, 0, &mut chosen, limit, &mut found);
        found
    }

    fn is_valid_set(&self, cards: &[CardId]) -> bool {
        if cards.len() != self.feature_size {
            return false;
        }
        let unique: HashSet<CardId> = cards.iter().copied().collect();
        if unique.len() != cards.len() {
            return false;
        }

        let decoded: Vec<Vec<usize>> = cards.iter().map(|&c| self.card_to_features(c)).collect();
        (0..self.feature_count).all(|f| {
            let values: HashSet<usize> = decoded.iter().map(|d| d[f]).collect();
            values.len() == 1 || values.len() == self.feature_size
        })
    }
}
