//! Cost resolution: for every considerable item, the cheapest way to obtain
//! one unit of it (market, vendor, or crafting), and for every recipe its
//! production cost and selling price.
//!
//! The engine is stateless; all results live in a caller-owned
//! [`WorkingSet`]. Changing any input (profession selection, vendor or
//! buy-always lists) requires [`WorkingSet::invalidate`] before the next run;
//! [`CostEngine::resolve`] does this itself.

use std::collections::{HashMap, HashSet};
use std::fmt;

use rust_decimal::Decimal;
use tracing::{debug, trace, warn};

use super::auctions::{AuctionIndex, CombinedAuction, RankClassifier};
use super::entities::{Item, ItemId, ItemQuality, Rank, Recipe, RecipeId};
use super::recipe_graph::{DisenchantableIndex, RecipeGraph};

/// How one unit of an item is acquired at the cheapest known price.
#[derive(Clone, Debug, PartialEq)]
pub enum PriceSource {
    /// Fixed NPC price in copper.
    Vendor { price: u64 },
    /// Cheapest auction listing.
    Market { auction: CombinedAuction },
    /// Crafted by a recipe; `rank` is set for multi-rank recipes.
    Crafted {
        recipe_id: RecipeId,
        rank: Option<Rank>,
        unit_cost: Decimal,
    },
}

impl PriceSource {
    pub fn unit_price(&self) -> Decimal {
        match self {
            PriceSource::Vendor { price } => Decimal::from(*price),
            PriceSource::Market { auction } => auction.unit_price(),
            PriceSource::Crafted { unit_cost, .. } => *unit_cost,
        }
    }

    pub fn is_crafted(&self) -> bool {
        matches!(self, PriceSource::Crafted { .. })
    }
}

/// The item picked as the implicit reagent of a disenchant recipe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisenchantChoice {
    pub item_id: ItemId,
    pub unit_cost: Decimal,
}

/// Why a recipe could not be priced. Failures are local to their recipe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolutionFailure {
    /// A reagent has no vendor price, no listing and no working recipe.
    UnobtainableReagent { recipe_id: RecipeId, item_id: ItemId },
    /// No disenchantable item of the required quality is known.
    EmptyDisenchantPool {
        recipe_id: RecipeId,
        quality: ItemQuality,
    },
    /// Disenchantable items exist but none of them can be bought or crafted.
    UnpricedDisenchantPool { recipe_id: RecipeId },
}

impl ResolutionFailure {
    pub fn recipe_id(&self) -> RecipeId {
        match self {
            ResolutionFailure::UnobtainableReagent { recipe_id, .. }
            | ResolutionFailure::EmptyDisenchantPool { recipe_id, .. }
            | ResolutionFailure::UnpricedDisenchantPool { recipe_id } => *recipe_id,
        }
    }
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionFailure::UnobtainableReagent { recipe_id, item_id } => {
                write!(f, "recipe {recipe_id}: reagent {item_id} is unobtainable")
            }
            ResolutionFailure::EmptyDisenchantPool { recipe_id, quality } => {
                write!(f, "recipe {recipe_id}: no {quality} item to disenchant")
            }
            ResolutionFailure::UnpricedDisenchantPool { recipe_id } => {
                write!(f, "recipe {recipe_id}: no disenchantable item has a price")
            }
        }
    }
}

/// Caller-owned state of one resolution run.
#[derive(Clone, Debug, Default)]
pub struct WorkingSet {
    min_price: HashMap<ItemId, PriceSource>,
    ranked_price: HashMap<(ItemId, Rank), PriceSource>,
    selling_price: HashMap<RecipeId, Decimal>,
    production_cost: HashMap<RecipeId, Decimal>,
    computed: HashSet<RecipeId>,
    disenchant_choice: HashMap<RecipeId, DisenchantChoice>,
    failures: Vec<ResolutionFailure>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every computed price and cost.
    pub fn invalidate(&mut self) {
        self.min_price.clear();
        self.ranked_price.clear();
        self.selling_price.clear();
        self.production_cost.clear();
        self.computed.clear();
        self.disenchant_choice.clear();
        self.failures.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.min_price.is_empty() && self.computed.is_empty()
    }

    pub fn min_price(&self, item_id: ItemId) -> Option<&PriceSource> {
        self.min_price.get(&item_id)
    }

    pub fn ranked_price(&self, item_id: ItemId, rank: Rank) -> Option<&PriceSource> {
        self.ranked_price.get(&(item_id, rank))
    }

    pub fn selling_price(&self, recipe_id: RecipeId) -> Option<Decimal> {
        self.selling_price.get(&recipe_id).copied()
    }

    pub fn production_cost(&self, recipe_id: RecipeId) -> Option<Decimal> {
        self.production_cost.get(&recipe_id).copied()
    }

    pub fn is_computed(&self, recipe_id: RecipeId) -> bool {
        self.computed.contains(&recipe_id)
    }

    pub fn disenchant_choice(&self, recipe_id: RecipeId) -> Option<&DisenchantChoice> {
        self.disenchant_choice.get(&recipe_id)
    }

    pub fn failures(&self) -> &[ResolutionFailure] {
        &self.failures
    }

    pub fn failure(&self, recipe_id: RecipeId) -> Option<&ResolutionFailure> {
        self.failures
            .iter()
            .find(|failure| failure.recipe_id() == recipe_id)
    }

    /// Installs `candidate` unless an existing source is at least as cheap.
    fn offer(&mut self, item_id: ItemId, candidate: PriceSource) -> bool {
        let cheaper = self
            .min_price
            .get(&item_id)
            .map_or(true, |current| candidate.unit_price() < current.unit_price());
        if cheaper {
            self.min_price.insert(item_id, candidate);
        }
        cheaper
    }

    fn offer_ranked(&mut self, item_id: ItemId, rank: Rank, candidate: PriceSource) {
        let key = (item_id, rank);
        let cheaper = self
            .ranked_price
            .get(&key)
            .map_or(true, |current| candidate.unit_price() < current.unit_price());
        if cheaper {
            self.ranked_price.insert(key, candidate);
        }
    }
}

/// Purchase overrides that shape a resolution run.
#[derive(Clone, Debug, Default)]
pub struct ResolutionSettings {
    /// Items whose vendor price may be used.
    pub vendor_items: HashSet<ItemId>,
    /// Items that are always bought, never crafted.
    pub buy_always: HashSet<ItemId>,
    /// Bonus-list code to legendary rank mapping.
    pub ranks: RankClassifier,
}

/// Read-only inputs of a resolution run.
pub struct CostEngine<'a> {
    pub items: &'a HashMap<ItemId, Item>,
    pub auctions: &'a AuctionIndex,
    pub graph: &'a RecipeGraph,
    pub disenchantable: &'a DisenchantableIndex,
    pub settings: &'a ResolutionSettings,
}

type Trace = HashSet<RecipeId>;

impl<'a> CostEngine<'a> {
    /// Clears the working set and runs both phases.
    pub fn resolve(&self, state: &mut WorkingSet) {
        state.invalidate();
        self.compute_baseline_prices(state);
        self.compute_production_costs(state);
        debug!(
            priced_items = state.min_price.len(),
            costed_recipes = state.production_cost.len(),
            failures = state.failures.len(),
            "resolution finished"
        );
    }

    /// Direct purchase prices of every considerable item, the per-rank
    /// market table of legendary items, and the selling price of every
    /// recipe.
    pub fn compute_baseline_prices(&self, state: &mut WorkingSet) {
        let mut considerable: Vec<ItemId> = self.graph.considerable().iter().copied().collect();
        considerable.sort_unstable();

        for item_id in considerable {
            if let Some(source) = self.purchase_price(item_id) {
                state.min_price.insert(item_id, source);
            }
        }

        for item_id in self.graph.legendary_items() {
            for (rank, auction) in self
                .auctions
                .cheapest_per_rank(item_id, &self.settings.ranks)
            {
                state.ranked_price.insert(
                    (item_id, rank),
                    PriceSource::Market {
                        auction: auction.clone(),
                    },
                );
            }
        }

        for recipe in self.graph.recipes() {
            if let Some(price) = self.revenue(recipe, state) {
                state.selling_price.insert(recipe.id(), price);
            }
        }
    }

    /// Cheaper of the eligible vendor price and the market minimum. Ties go
    /// to the market.
    fn purchase_price(&self, item_id: ItemId) -> Option<PriceSource> {
        let vendor = if self.settings.vendor_items.contains(&item_id) {
            self.items.get(&item_id).and_then(|item| item.vendor_price)
        } else {
            None
        };
        let market = self.auctions.minimum_price(item_id);

        match (vendor, market) {
            (Some(price), Some(auction)) if price < auction.price => {
                Some(PriceSource::Vendor { price })
            }
            (_, Some(auction)) => Some(PriceSource::Market {
                auction: auction.clone(),
            }),
            (Some(price), None) => Some(PriceSource::Vendor { price }),
            (None, None) => None,
        }
    }

    fn revenue(&self, recipe: &Recipe, state: &WorkingSet) -> Option<Decimal> {
        if let Recipe::Legendary(legendary) = recipe {
            return state
                .ranked_price(legendary.item_id, legendary.rank)
                .map(PriceSource::unit_price);
        }
        recipe.outputs().iter().try_fold(Decimal::ZERO, |sum, stack| {
            state
                .min_price(stack.item_id)
                .map(|source| sum + source.unit_price() * stack.count)
        })
    }

    /// Dependency-ordered evaluation of every recipe.
    ///
    /// Work items are processed LIFO. A recipe with unresolved craftable
    /// inputs is pushed back below its prerequisites. The trace holds the
    /// recipes being resolved on the current chain; a prerequisite already
    /// on it is skipped, which breaks cycles.
    pub fn compute_production_costs(&self, state: &mut WorkingSet) {
        let mut stack: Vec<(RecipeId, Trace)> = self
            .graph
            .recipe_ids()
            .into_iter()
            .rev()
            .map(|id| (id, Trace::new()))
            .collect();

        while let Some((recipe_id, trace)) = stack.pop() {
            if state.computed.contains(&recipe_id) {
                continue;
            }
            let Some(recipe) = self.graph.recipe(recipe_id) else {
                continue;
            };

            let requirements = self.requirements(recipe, &trace, state);
            if !requirements.is_empty() {
                trace!(recipe_id, ?requirements, "deferring until requirements resolve");
                let mut child_trace = trace.clone();
                child_trace.insert(recipe_id);
                stack.push((recipe_id, trace));
                for required in requirements {
                    stack.push((required, child_trace.clone()));
                }
                continue;
            }

            state.computed.insert(recipe_id);
            match self.production_cost(recipe, state) {
                Ok(cost) => self.record_cost(recipe, cost, state),
                Err(failure) => {
                    self.log_failure(recipe, &failure);
                    state.failures.push(failure);
                }
            }
        }
    }

    /// Inputs of a recipe: its reagents, or the disenchantable pool.
    fn inputs(&self, recipe: &Recipe) -> Vec<ItemId> {
        match recipe {
            Recipe::Disenchant(disenchant) => self
                .disenchantable
                .pool(disenchant.info.expansion, disenchant.reagent_quality)
                .to_vec(),
            _ => recipe.reagents().iter().map(|stack| stack.item_id).collect(),
        }
    }

    /// Recipes that must be finalized before `recipe` can be costed.
    fn requirements(&self, recipe: &Recipe, trace: &Trace, state: &WorkingSet) -> Vec<RecipeId> {
        let own_id = recipe.id();
        let mut required = Vec::new();
        for item_id in self.inputs(recipe) {
            if self.settings.buy_always.contains(&item_id) {
                continue;
            }
            for &producer in self.graph.producers(item_id) {
                if producer == own_id
                    || trace.contains(&producer)
                    || state.computed.contains(&producer)
                    || required.contains(&producer)
                {
                    continue;
                }
                required.push(producer);
            }
        }
        required
    }

    fn production_cost(
        &self,
        recipe: &Recipe,
        state: &mut WorkingSet,
    ) -> Result<Decimal, ResolutionFailure> {
        match recipe {
            Recipe::Normal(_) | Recipe::Legendary(_) => {
                let mut cost = Decimal::ZERO;
                for reagent in recipe.reagents() {
                    let Some(source) = state.min_price(reagent.item_id) else {
                        return Err(ResolutionFailure::UnobtainableReagent {
                            recipe_id: recipe.id(),
                            item_id: reagent.item_id,
                        });
                    };
                    cost += source.unit_price() * reagent.count;
                }
                Ok(cost)
            }
            Recipe::Disenchant(disenchant) => {
                let pool = self
                    .disenchantable
                    .pool(disenchant.info.expansion, disenchant.reagent_quality);
                if pool.is_empty() {
                    return Err(ResolutionFailure::EmptyDisenchantPool {
                        recipe_id: recipe.id(),
                        quality: disenchant.reagent_quality,
                    });
                }
                let choice = pool
                    .iter()
                    .filter_map(|&item_id| {
                        state.min_price(item_id).map(|source| DisenchantChoice {
                            item_id,
                            unit_cost: source.unit_price(),
                        })
                    })
                    .min_by_key(|choice| choice.unit_cost)
                    .ok_or(ResolutionFailure::UnpricedDisenchantPool {
                        recipe_id: recipe.id(),
                    })?;
                state.disenchant_choice.insert(recipe.id(), choice);
                Ok(choice.unit_cost)
            }
        }
    }

    /// Stores the cost and offers the crafted price to every output.
    fn record_cost(&self, recipe: &Recipe, cost: Decimal, state: &mut WorkingSet) {
        let recipe_id = recipe.id();
        state.production_cost.insert(recipe_id, cost);

        for stack in recipe.outputs() {
            if self.settings.buy_always.contains(&stack.item_id) || stack.count <= Decimal::ZERO {
                continue;
            }
            let unit_cost = cost / stack.count;
            let crafted = PriceSource::Crafted {
                recipe_id,
                rank: recipe.rank(),
                unit_cost,
            };
            if let Some(rank) = recipe.rank() {
                state.offer_ranked(stack.item_id, rank, crafted.clone());
            }
            if state.offer(stack.item_id, crafted) {
                trace!(recipe_id, item_id = stack.item_id, %unit_cost, "crafting is cheapest");
            }
        }
    }

    fn item_name(&self, item_id: ItemId) -> String {
        self.items
            .get(&item_id)
            .map(|item| item.name.clone())
            .unwrap_or_else(|| format!("item {item_id}"))
    }

    fn log_failure(&self, recipe: &Recipe, failure: &ResolutionFailure) {
        match failure {
            ResolutionFailure::UnobtainableReagent { item_id, .. } => warn!(
                recipe = recipe.name(),
                reagent = %self.item_name(*item_id),
                "cannot compute production cost, reagent is unobtainable"
            ),
            ResolutionFailure::EmptyDisenchantPool { quality, .. } => warn!(
                recipe = recipe.name(),
                %quality,
                "cannot compute production cost, nothing to disenchant"
            ),
            ResolutionFailure::UnpricedDisenchantPool { .. } => warn!(
                recipe = recipe.name(),
                "cannot compute production cost, no disenchantable item is obtainable"
            ),
        }
    }
}
