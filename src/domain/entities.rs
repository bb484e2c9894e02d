use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier of an item in the game-data API.
pub type ItemId = u32;
/// Recipe identifier. Synthesized disenchant recipes use negative ids.
pub type RecipeId = i64;
pub type ProfessionId = u32;
pub type TierId = u32;
pub type Expansion = u32;
/// Legendary rank (tier level) of a multi-rank recipe.
pub type Rank = u8;

/// Item quality, ordered from worst to best.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemQuality {
    Poor,
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    Artifact,
    Heirloom,
}

impl ItemQuality {
    pub fn name(&self) -> &'static str {
        match self {
            ItemQuality::Poor => "POOR",
            ItemQuality::Common => "COMMON",
            ItemQuality::Uncommon => "UNCOMMON",
            ItemQuality::Rare => "RARE",
            ItemQuality::Epic => "EPIC",
            ItemQuality::Legendary => "LEGENDARY",
            ItemQuality::Artifact => "ARTIFACT",
            ItemQuality::Heirloom => "HEIRLOOM",
        }
    }

    /// Numeric code used to derive stable synthetic recipe ids.
    pub fn code(&self) -> i64 {
        match self {
            ItemQuality::Poor => 0,
            ItemQuality::Common => 1,
            ItemQuality::Uncommon => 2,
            ItemQuality::Rare => 3,
            ItemQuality::Epic => 4,
            ItemQuality::Legendary => 5,
            ItemQuality::Artifact => 6,
            ItemQuality::Heirloom => 7,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "POOR" => Some(ItemQuality::Poor),
            "COMMON" => Some(ItemQuality::Common),
            "UNCOMMON" => Some(ItemQuality::Uncommon),
            "RARE" => Some(ItemQuality::Rare),
            "EPIC" => Some(ItemQuality::Epic),
            "LEGENDARY" => Some(ItemQuality::Legendary),
            "ARTIFACT" => Some(ItemQuality::Artifact),
            "HEIRLOOM" => Some(ItemQuality::Heirloom),
            _ => None,
        }
    }

    /// Qualities that can be salvaged by disenchanting.
    pub fn is_disenchantable(&self) -> bool {
        matches!(
            self,
            ItemQuality::Uncommon | ItemQuality::Rare | ItemQuality::Epic
        )
    }
}

impl fmt::Display for ItemQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Realm {
    pub id: u32,
    pub name: String,
    pub slug: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedRealm {
    pub id: u32,
    pub realms: Vec<Realm>,
}

/// Item metadata from the game-data API. Immutable once fetched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    /// Fixed NPC buy price in copper, absent if vendors don't sell it.
    #[serde(default)]
    pub vendor_price: Option<u64>,
    pub quality: ItemQuality,
    #[serde(rename = "class")]
    pub item_class: u32,
    #[serde(rename = "subclass")]
    pub item_subclass: u32,
    pub expansion: Expansion,
}

/// A quantity of one item. Quantities are decimals because craft yields
/// are averaged and disenchant yields are expected values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub count: Decimal,
    pub item_id: ItemId,
}

impl ItemStack {
    pub fn new(count: Decimal, item_id: ItemId) -> Self {
        Self { count, item_id }
    }
}

/// Fields shared by every recipe kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeInfo {
    pub id: RecipeId,
    pub category: String,
    pub name: String,
    pub profession_id: ProfessionId,
    pub tier_id: TierId,
    pub expansion: Expansion,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalRecipe {
    pub info: RecipeInfo,
    pub crafted_item: ItemStack,
    pub reagents: Vec<ItemStack>,
}

/// One rank of a multi-rank recipe. All ranks share `item_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendaryRecipe {
    pub info: RecipeInfo,
    pub item_id: ItemId,
    pub reagents: Vec<ItemStack>,
    pub rank: Rank,
}

/// Synthesized salvage recipe: destroys one item of `reagent_quality` and
/// yields the expected amount of each material in `crafted_items`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisenchantRecipe {
    pub info: RecipeInfo,
    pub reagent_quality: ItemQuality,
    pub crafted_items: Vec<ItemStack>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecipeKind {
    Normal,
    Legendary,
    Disenchant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Recipe {
    Normal(NormalRecipe),
    Legendary(LegendaryRecipe),
    Disenchant(DisenchantRecipe),
}

impl Recipe {
    pub fn info(&self) -> &RecipeInfo {
        match self {
            Recipe::Normal(recipe) => &recipe.info,
            Recipe::Legendary(recipe) => &recipe.info,
            Recipe::Disenchant(recipe) => &recipe.info,
        }
    }

    pub fn id(&self) -> RecipeId {
        self.info().id
    }

    pub fn name(&self) -> &str {
        &self.info().name
    }

    pub fn kind(&self) -> RecipeKind {
        match self {
            Recipe::Normal(_) => RecipeKind::Normal,
            Recipe::Legendary(_) => RecipeKind::Legendary,
            Recipe::Disenchant(_) => RecipeKind::Disenchant,
        }
    }

    /// Every stack this recipe produces.
    pub fn outputs(&self) -> Vec<ItemStack> {
        match self {
            Recipe::Normal(recipe) => vec![recipe.crafted_item],
            Recipe::Legendary(recipe) => vec![ItemStack::new(Decimal::ONE, recipe.item_id)],
            Recipe::Disenchant(recipe) => recipe.crafted_items.clone(),
        }
    }

    /// Explicit reagents. Disenchant recipes have none; their input is
    /// chosen from the disenchantable pool at resolution time.
    pub fn reagents(&self) -> &[ItemStack] {
        match self {
            Recipe::Normal(recipe) => &recipe.reagents,
            Recipe::Legendary(recipe) => &recipe.reagents,
            Recipe::Disenchant(_) => &[],
        }
    }

    pub fn rank(&self) -> Option<Rank> {
        match self {
            Recipe::Legendary(recipe) => Some(recipe.rank),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfessionTier {
    pub id: TierId,
    pub name: String,
    pub expansion: Expansion,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profession {
    pub id: ProfessionId,
    pub name: String,
    pub tiers: Vec<ProfessionTier>,
}

impl Profession {
    pub fn tier(&self, tier_id: TierId) -> Option<&ProfessionTier> {
        self.tiers.iter().find(|tier| tier.id == tier_id)
    }

    /// Latest tier of an expansion; later entries in the tier list win.
    pub fn tier_for_expansion(&self, expansion: Expansion) -> Option<&ProfessionTier> {
        self.tiers.iter().rev().find(|tier| tier.expansion == expansion)
    }
}

/// A (profession, tier) id pair; the unit of profession selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TierRef {
    pub profession: ProfessionId,
    pub tier: TierId,
}

impl TierRef {
    pub fn new(profession: ProfessionId, tier: TierId) -> Self {
        Self { profession, tier }
    }
}

impl fmt::Display for TierRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.profession, self.tier)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemModifier {
    #[serde(rename = "type")]
    pub modifier_type: u32,
    pub value: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PetInfo {
    #[serde(rename = "breed")]
    pub breed_id: u32,
    pub level: u32,
    #[serde(rename = "quality")]
    pub quality_id: u32,
    #[serde(rename = "species")]
    pub species_id: u32,
}

/// The item part of an auction listing, including the variant-defining
/// bonus lists and modifiers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuctionHouseItem {
    pub id: ItemId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bonus_lists: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modifiers: Vec<ItemModifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pet_info: Option<PetInfo>,
}

impl AuctionHouseItem {
    pub fn new(id: ItemId) -> Self {
        Self {
            id,
            bonus_lists: Vec::new(),
            modifiers: Vec::new(),
            pet_info: None,
        }
    }

    pub fn with_bonus_lists(mut self, bonus_lists: Vec<u32>) -> Self {
        self.bonus_lists = bonus_lists;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeLeft {
    Short,
    Medium,
    Long,
    VeryLong,
}

/// A raw auction listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    pub id: u64,
    /// Unit price in copper.
    pub price: u64,
    pub quantity: u64,
    pub time_left: TimeLeft,
    pub item: AuctionHouseItem,
}
