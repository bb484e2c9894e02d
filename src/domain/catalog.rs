//! In-memory view over the stored catalogs with the name and id lookups
//! used by the update, profit and config commands.

use std::collections::{HashMap, HashSet};

use crate::error::LookupError;

use super::entities::{
    ConnectedRealm, Expansion, Item, ItemId, Profession, ProfessionId, ProfessionTier, Recipe,
    TierId, TierRef,
};

pub type ProfessionTierPair<'a> = (&'a Profession, &'a ProfessionTier);

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub realms: Vec<ConnectedRealm>,
    pub professions: Vec<Profession>,
    pub recipes: Vec<Recipe>,
    pub items: HashMap<ItemId, Item>,
}

impl Catalog {
    pub fn new(
        realms: Vec<ConnectedRealm>,
        professions: Vec<Profession>,
        recipes: Vec<Recipe>,
        items: Vec<Item>,
    ) -> Self {
        Self {
            realms,
            professions,
            recipes,
            items: items.into_iter().map(|item| (item.id, item)).collect(),
        }
    }

    /// The latest tier of every profession that has one in `expansion`.
    pub fn professions_by_expansion(&self, expansion: Expansion) -> Vec<ProfessionTierPair<'_>> {
        self.professions
            .iter()
            .filter_map(|profession| {
                profession
                    .tier_for_expansion(expansion)
                    .map(|tier| (profession, tier))
            })
            .collect()
    }

    pub fn latest_professions(&self, current_expansion: Expansion) -> Vec<ProfessionTierPair<'_>> {
        self.professions_by_expansion(current_expansion)
    }

    pub fn all_professions(&self) -> Vec<ProfessionTierPair<'_>> {
        self.professions
            .iter()
            .flat_map(|profession| profession.tiers.iter().map(move |tier| (profession, tier)))
            .collect()
    }

    /// Resolves configured (profession, tier) pairs. The first unknown pair
    /// fails the whole selection.
    pub fn configured_professions(
        &self,
        selection: &[TierRef],
    ) -> Result<Vec<ProfessionTierPair<'_>>, LookupError> {
        selection
            .iter()
            .map(|pair| self.profession_tier(pair.profession, pair.tier))
            .collect()
    }

    pub fn profession(&self, id: ProfessionId) -> Result<&Profession, LookupError> {
        self.professions
            .iter()
            .find(|profession| profession.id == id)
            .ok_or(LookupError::Profession(id))
    }

    pub fn profession_tier(
        &self,
        profession_id: ProfessionId,
        tier_id: TierId,
    ) -> Result<ProfessionTierPair<'_>, LookupError> {
        self.professions
            .iter()
            .find(|profession| profession.id == profession_id)
            .and_then(|profession| profession.tier(tier_id).map(|tier| (profession, tier)))
            .ok_or(LookupError::ProfessionTierId {
                profession: profession_id,
                tier: tier_id,
            })
    }

    /// Looks a tier up by its display name, e.g. "Shadowlands Blacksmithing".
    pub fn find_profession_tier(&self, name: &str) -> Result<TierRef, LookupError> {
        self.professions
            .iter()
            .find_map(|profession| {
                profession
                    .tiers
                    .iter()
                    .find(|tier| tier.name == name)
                    .map(|tier| TierRef::new(profession.id, tier.id))
            })
            .ok_or_else(|| LookupError::ProfessionTier(name.to_string()))
    }

    /// Exact name match. Several items may share a name; the lowest id wins.
    pub fn find_item(&self, name: &str) -> Result<ItemId, LookupError> {
        self.items
            .values()
            .filter(|item| item.name == name)
            .map(|item| item.id)
            .min()
            .ok_or_else(|| LookupError::Item(name.to_string()))
    }

    /// Returns the connected realm id and the realm id for a realm slug.
    pub fn find_realm(&self, slug: &str) -> Result<(u32, u32), LookupError> {
        self.realms
            .iter()
            .find_map(|connected| {
                connected
                    .realms
                    .iter()
                    .find(|realm| realm.slug == slug)
                    .map(|realm| (connected.id, realm.id))
            })
            .ok_or_else(|| LookupError::Realm(slug.to_string()))
    }

    pub fn profession_recipes(&self, selection: &HashSet<TierRef>) -> Vec<&Recipe> {
        self.recipes
            .iter()
            .filter(|recipe| {
                let info = recipe.info();
                selection.contains(&TierRef::new(info.profession_id, info.tier_id))
            })
            .collect()
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn item_name(&self, id: ItemId) -> String {
        self.item(id)
            .map(|item| item.name.clone())
            .unwrap_or_else(|| format!("item {id}"))
    }
}
