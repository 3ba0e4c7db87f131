//! Layered stat accumulation: every stat is `base × (1 + modifier) + flat`.
//!
//! Troops and level land in the base layer, star/skill/rarity progression in the modifier layer,
//! and a secondary commander's share in the flat layer, so support never gets multiplied by the
//! primary's progression.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatKind {
    Attack,
    Defense,
    Health,
    Speed,
}

impl StatKind {
    pub const ALL: [StatKind; 4] = [Self::Attack, Self::Defense, Self::Health, Self::Speed];

    const fn index(self) -> usize {
        match self {
            Self::Attack => 0,
            Self::Defense => 1,
            Self::Health => 2,
            Self::Speed => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Base,
    Modifier,
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution {
    pub stat: StatKind,
    pub layer: Layer,
    pub value: f64,
}

impl Contribution {
    pub fn base(stat: StatKind, value: f64) -> Self {
        Self { stat, layer: Layer::Base, value }
    }

    pub fn modifier(stat: StatKind, value: f64) -> Self {
        Self { stat, layer: Layer::Modifier, value }
    }

    pub fn flat(stat: StatKind, value: f64) -> Self {
        Self { stat, layer: Layer::Flat, value }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayerTotals {
    pub base: f64,
    pub modifier: f64,
    pub flat: f64,
}

impl LayerTotals {
    fn apply(&mut self, layer: Layer, value: f64) {
        match layer {
            Layer::Base => self.base += value,
            Layer::Modifier => self.modifier += value,
            Layer::Flat => self.flat += value,
        }
    }

    pub fn compose(self) -> f64 {
        self.base * (1.0 + self.modifier) + self.flat
    }
}

/// Per-stat layer totals for one army.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatStack {
    totals: [LayerTotals; 4],
}

impl StatStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, contribution: Contribution) {
        self.totals[contribution.stat.index()].apply(contribution.layer, contribution.value);
    }

    pub fn extend<I>(&mut self, contributions: I)
    where
        I: IntoIterator<Item = Contribution>,
    {
        for contribution in contributions {
            self.add(contribution);
        }
    }

    pub fn totals(&self, stat: StatKind) -> LayerTotals {
        self.totals[stat.index()]
    }

    pub fn value(&self, stat: StatKind) -> f64 {
        self.totals(stat).compose()
    }
}
