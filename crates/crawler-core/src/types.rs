use serde::{Deserialize, Serialize};

/// Number of bosses listed on the Boostable Bosses library page.
///
/// Used as a capacity hint when extracting; a page listing a different number
/// of bosses is still accepted.
pub const AMOUNT_OF_BOOSTABLE_BOSSES: usize = 91;

/// A boss listed on the tibia.com Boostable Bosses library page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoostableBoss {
    /// Name of the boss
    pub name: String,
    /// URL of the boss image
    pub image_url: String,
    /// Whether the boss is boosted today
    #[serde(rename = "featured")]
    pub is_boosted: bool,
}

/// Today's boosted boss together with every boostable boss.
///
/// `boosted` also appears in `bosses`, and it is the only entry there with
/// `is_boosted` set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoostableBosses {
    /// Today's boosted boss
    pub boosted: BoostableBoss,
    /// All boostable bosses, in page order
    #[serde(rename = "boostable_boss_list")]
    pub bosses: Vec<BoostableBoss>,
}

impl BoostableBosses {
    /// Whether this value was produced by a successful extraction.
    ///
    /// The default value, held by the cache before any fetch, is empty.
    pub fn is_empty(&self) -> bool {
        self.boosted.name.is_empty() && self.bosses.is_empty()
    }

    /// Bosses flagged as boosted.
    pub fn featured(&self) -> impl Iterator<Item = &BoostableBoss> {
        self.bosses.iter().filter(|boss| boss.is_boosted)
    }
}
