//! Recipe graph construction: craft-type classification, reverse indices and
//! the synthesized disenchant recipes.

use std::collections::{BTreeMap, HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::entities::{
    DisenchantRecipe, Expansion, Item, ItemId, ItemQuality, ItemStack, LegendaryRecipe,
    NormalRecipe, Profession, Rank, Recipe, RecipeId, RecipeInfo,
};

/// Salvage probabilities: reagent quality -> material quality -> expected yield.
pub type DisenchantTable = BTreeMap<ItemQuality, BTreeMap<ItemQuality, Decimal>>;

/// Enchanting materials per expansion, keyed by their quality.
pub type EnchantingMaterials = BTreeMap<Expansion, BTreeMap<ItemQuality, ItemId>>;

/// Item class codes of the game-data API that matter for salvaging.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemClassCodes {
    pub weapon: u32,
    pub armor: u32,
    pub crafting_material: u32,
    pub enchanting_subclass: u32,
}

impl Default for ItemClassCodes {
    fn default() -> Self {
        Self {
            weapon: 2,
            armor: 4,
            crafting_material: 7,
            enchanting_subclass: 12,
        }
    }
}

/// Indices over the loaded recipe set.
#[derive(Clone, Debug, Default)]
pub struct RecipeGraph {
    recipes: HashMap<RecipeId, Recipe>,
    craftable: HashMap<ItemId, Vec<RecipeId>>,
    considerable: HashSet<ItemId>,
    legendary: HashMap<ItemId, BTreeMap<Rank, RecipeId>>,
}

impl RecipeGraph {
    /// Classifies recipes by craft type and builds the item -> recipe
    /// index and the considerable item set.
    pub fn classify(recipes: impl IntoIterator<Item = Recipe>) -> Self {
        let mut graph = Self::default();
        for recipe in recipes {
            let id = recipe.id();
            match &recipe {
                Recipe::Normal(normal) => {
                    graph.index_output(normal.crafted_item.item_id, id);
                    graph.add_reagents(&normal.reagents);
                }
                Recipe::Legendary(legendary) => {
                    graph.index_output(legendary.item_id, id);
                    graph
                        .legendary
                        .entry(legendary.item_id)
                        .or_default()
                        .insert(legendary.rank, id);
                    graph.add_reagents(&legendary.reagents);
                }
                Recipe::Disenchant(disenchant) => {
                    for stack in &disenchant.crafted_items {
                        graph.index_output(stack.item_id, id);
                    }
                }
            }
            graph.recipes.insert(id, recipe);
        }
        debug!(
            recipes = graph.recipes.len(),
            considerable = graph.considerable.len(),
            "classified recipe graph"
        );
        graph
    }

    /// Adds the items that disenchant recipes may consume to the
    /// considerable set so they receive a purchase price.
    pub fn include_disenchant_pool(&mut self, index: &DisenchantableIndex) {
        self.considerable.extend(index.item_ids());
    }

    fn index_output(&mut self, item_id: ItemId, recipe_id: RecipeId) {
        let producers = self.craftable.entry(item_id).or_default();
        if !producers.contains(&recipe_id) {
            producers.push(recipe_id);
        }
        self.considerable.insert(item_id);
    }

    fn add_reagents(&mut self, reagents: &[ItemStack]) {
        self.considerable
            .extend(reagents.iter().map(|reagent| reagent.item_id));
    }

    pub fn recipe(&self, id: RecipeId) -> Option<&Recipe> {
        self.recipes.get(&id)
    }

    pub fn recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }

    /// Recipe ids in ascending order.
    pub fn recipe_ids(&self) -> Vec<RecipeId> {
        let mut ids: Vec<RecipeId> = self.recipes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Recipes producing the item.
    pub fn producers(&self, item_id: ItemId) -> &[RecipeId] {
        self.craftable
            .get(&item_id)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_craftable(&self, item_id: ItemId) -> bool {
        self.craftable.contains_key(&item_id)
    }

    pub fn considerable(&self) -> &HashSet<ItemId> {
        &self.considerable
    }

    pub fn is_legendary(&self, item_id: ItemId) -> bool {
        self.legendary.contains_key(&item_id)
    }

    pub fn legendary_ranks(&self, item_id: ItemId) -> Option<&BTreeMap<Rank, RecipeId>> {
        self.legendary.get(&item_id)
    }

    pub fn legendary_items(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.legendary.keys().copied()
    }
}

/// Disenchantable items per expansion and quality; the reagent pool of the
/// synthesized disenchant recipes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisenchantableIndex {
    pools: BTreeMap<Expansion, BTreeMap<ItemQuality, Vec<ItemId>>>,
}

impl DisenchantableIndex {
    /// Keeps armor and weapons of uncommon, rare or epic quality whose
    /// expansion is one of the given enchanting expansions.
    pub fn build<'a>(
        items: impl IntoIterator<Item = &'a Item>,
        expansions: &HashSet<Expansion>,
        classes: &ItemClassCodes,
    ) -> Self {
        let mut pools: BTreeMap<Expansion, BTreeMap<ItemQuality, Vec<ItemId>>> = BTreeMap::new();
        for item in items {
            let gear = item.item_class == classes.armor || item.item_class == classes.weapon;
            if !gear || !item.quality.is_disenchantable() || !expansions.contains(&item.expansion)
            {
                continue;
            }
            let pool = pools
                .entry(item.expansion)
                .or_default()
                .entry(item.quality)
                .or_default();
            if !pool.contains(&item.id) {
                pool.push(item.id);
            }
        }
        for qualities in pools.values_mut() {
            for pool in qualities.values_mut() {
                pool.sort_unstable();
            }
        }
        Self { pools }
    }

    pub fn pool(&self, expansion: Expansion, quality: ItemQuality) -> &[ItemId] {
        self.pools
            .get(&expansion)
            .and_then(|qualities| qualities.get(&quality))
            .map(|pool| pool.as_slice())
            .unwrap_or(&[])
    }

    /// Every (expansion, quality) pair with at least one item.
    pub fn pairs(&self) -> impl Iterator<Item = (Expansion, ItemQuality)> + '_ {
        self.pools.iter().flat_map(|(expansion, qualities)| {
            qualities
                .iter()
                .filter(|(_, pool)| !pool.is_empty())
                .map(move |(quality, _)| (*expansion, *quality))
        })
    }

    pub fn item_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.pools
            .values()
            .flat_map(|qualities| qualities.values())
            .flatten()
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

/// Stable id of a synthesized disenchant recipe. Always negative, so it
/// never collides with a fetched recipe id.
pub fn disenchant_recipe_id(expansion: Expansion, quality: ItemQuality) -> RecipeId {
    -(i64::from(expansion) * 10 + quality.code())
}

/// Finds the enchanting materials of every expansion by scanning the
/// reagents of enchanting recipes for items of the enchanting material
/// class.
pub fn find_enchanting_materials<'a>(
    recipes: impl IntoIterator<Item = &'a Recipe>,
    items: &HashMap<ItemId, Item>,
    enchanting: &Profession,
    classes: &ItemClassCodes,
) -> EnchantingMaterials {
    let tier_expansions: HashMap<_, _> = enchanting
        .tiers
        .iter()
        .map(|tier| (tier.id, tier.expansion))
        .collect();

    let mut materials = EnchantingMaterials::new();
    for recipe in recipes {
        let Recipe::Normal(normal) = recipe else {
            continue;
        };
        if normal.info.profession_id != enchanting.id {
            continue;
        }
        let Some(expansion) = tier_expansions.get(&normal.info.tier_id) else {
            continue;
        };
        for reagent in &normal.reagents {
            let Some(item) = items.get(&reagent.item_id) else {
                continue;
            };
            if item.item_class == classes.crafting_material
                && item.item_subclass == classes.enchanting_subclass
            {
                materials
                    .entry(*expansion)
                    .or_default()
                    .insert(item.quality, item.id);
            }
        }
    }
    materials
}

/// Creates one disenchant recipe per (expansion, quality) pair of the
/// index. Outputs are the expansion's enchanting materials weighted by the
/// configured probability of the reagent quality.
pub fn synthesize_disenchant_recipes(
    index: &DisenchantableIndex,
    table: &DisenchantTable,
    materials: &EnchantingMaterials,
    enchanting: &Profession,
) -> Vec<DisenchantRecipe> {
    let mut recipes = Vec::new();
    for (expansion, quality) in index.pairs() {
        let Some(mats) = materials.get(&expansion) else {
            warn!(expansion, %quality, "no enchanting materials known, skipping disenchant recipe");
            continue;
        };
        let Some(probabilities) = table.get(&quality) else {
            warn!(expansion, %quality, "no disenchant probabilities configured");
            continue;
        };

        let crafted_items: Vec<ItemStack> = probabilities
            .iter()
            .filter_map(|(material_quality, probability)| {
                mats.get(material_quality)
                    .map(|item_id| ItemStack::new(*probability, *item_id))
            })
            .collect();
        if crafted_items.is_empty() {
            warn!(expansion, %quality, "disenchant table yields no known material");
            continue;
        }

        let tier = enchanting.tier_for_expansion(expansion);
        let name = match tier {
            Some(tier) => format!("{}: Disenchanting {}", tier.name, quality),
            None => format!("Expansion {expansion}: Disenchanting {quality}"),
        };
        recipes.push(DisenchantRecipe {
            info: RecipeInfo {
                id: disenchant_recipe_id(expansion, quality),
                category: "disenchant".to_string(),
                name,
                profession_id: enchanting.id,
                tier_id: tier.map(|tier| tier.id).unwrap_or_default(),
                expansion,
            },
            reagent_quality: quality,
            crafted_items,
        });
    }
    recipes
}

/// Turns groups of normal recipes that craft the same item into ranked
/// legendary recipes.
///
/// The rank is derived from ascending recipe id inside a group. The data
/// provider gives no structural guarantee for this ordering; it holds for
/// the legendary bases known so far and is the only rank signal available.
pub fn make_legendary_recipes(recipes: Vec<Recipe>) -> Vec<Recipe> {
    let mut by_item: BTreeMap<ItemId, Vec<NormalRecipe>> = BTreeMap::new();
    let mut result = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        match recipe {
            Recipe::Normal(normal) => by_item
                .entry(normal.crafted_item.item_id)
                .or_default()
                .push(normal),
            other => result.push(other),
        }
    }

    for (item_id, mut group) in by_item {
        if group.len() == 1 {
            result.extend(group.into_iter().map(Recipe::Normal));
            continue;
        }
        group.sort_by_key(|recipe| recipe.info.id);
        debug!(item_id, ranks = group.len(), "deriving legendary ranks");
        for (idx, normal) in group.into_iter().enumerate() {
            let rank = Rank::try_from(idx + 1).unwrap_or(Rank::MAX);
            let mut info = normal.info;
            info.name = format!("{} (Rank {rank})", info.name);
            result.push(Recipe::Legendary(LegendaryRecipe {
                info,
                item_id,
                reagents: normal.reagents,
                rank,
            }));
        }
    }
    result
}
