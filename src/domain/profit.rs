//! Per-recipe profit breakdown built from a resolved working set.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use super::entities::{Item, ItemId, ProfessionId, Rank, Recipe, RecipeId, RecipeKind, TierId};
use super::recipe_graph::RecipeGraph;
use super::resolution::{PriceSource, ResolutionFailure, WorkingSet};

/// How a reagent is acquired in the cheapest plan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum AcquisitionTag {
    Market,
    Vendor,
    Crafted {
        recipe_id: RecipeId,
        recipe_name: String,
        rank: Option<Rank>,
    },
    Unavailable,
}

impl fmt::Display for AcquisitionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionTag::Market => f.write_str("market"),
            AcquisitionTag::Vendor => f.write_str("vendor"),
            AcquisitionTag::Crafted { recipe_name, .. } => write!(f, "crafted: {recipe_name}"),
            AcquisitionTag::Unavailable => f.write_str("unavailable"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReagentLine {
    pub item_id: ItemId,
    pub item_name: String,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
    pub tag: AcquisitionTag,
}

impl ReagentLine {
    pub fn total(&self) -> Option<Decimal> {
        self.unit_price.map(|price| price * self.quantity)
    }
}

/// The item a disenchant recipe consumes.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DisenchantReport {
    pub item_id: ItemId,
    pub item_name: String,
    pub unit_cost: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecipeReport {
    pub recipe_id: RecipeId,
    pub name: String,
    #[serde(skip)]
    pub kind: RecipeKind,
    pub profession_id: ProfessionId,
    pub tier_id: TierId,
    pub selling_price: Option<Decimal>,
    pub production_cost: Option<Decimal>,
    pub profit: Option<Decimal>,
    pub reagents: Vec<ReagentLine>,
    pub disenchant: Option<DisenchantReport>,
    #[serde(skip)]
    pub failure: Option<ResolutionFailure>,
}

/// Which recipes end up in the report.
#[derive(Clone, Debug, Default)]
pub struct ReportFilter {
    /// Recipes whose outputs are all ignored are left out.
    pub ignore: HashSet<ItemId>,
    /// Case-insensitive substring of the recipe name.
    pub search: Option<String>,
}

impl ReportFilter {
    pub fn accepts(&self, recipe: &Recipe) -> bool {
        let outputs = recipe.outputs();
        if !outputs.is_empty()
            && outputs
                .iter()
                .all(|stack| self.ignore.contains(&stack.item_id))
        {
            return false;
        }
        match &self.search {
            Some(text) if !text.is_empty() => recipe
                .name()
                .to_lowercase()
                .contains(&text.to_lowercase()),
            _ => true,
        }
    }
}

/// Builds one report per accepted recipe, most profitable first.
pub fn build_reports(
    graph: &RecipeGraph,
    items: &HashMap<ItemId, Item>,
    state: &WorkingSet,
    filter: &ReportFilter,
) -> Vec<RecipeReport> {
    let mut reports: Vec<RecipeReport> = graph
        .recipes()
        .filter(|recipe| filter.accepts(recipe))
        .map(|recipe| recipe_report(recipe, graph, items, state))
        .collect();
    sort_by_profit(&mut reports);
    reports
}

pub fn recipe_report(
    recipe: &Recipe,
    graph: &RecipeGraph,
    items: &HashMap<ItemId, Item>,
    state: &WorkingSet,
) -> RecipeReport {
    let recipe_id = recipe.id();
    let info = recipe.info();
    let selling_price = state.selling_price(recipe_id);
    let production_cost = state.production_cost(recipe_id);
    let profit = match (selling_price, production_cost) {
        (Some(selling), Some(cost)) => Some(selling - cost),
        _ => None,
    };

    let reagents = recipe
        .reagents()
        .iter()
        .map(|stack| {
            let source = state.min_price(stack.item_id);
            ReagentLine {
                item_id: stack.item_id,
                item_name: item_name(items, stack.item_id),
                quantity: stack.count,
                unit_price: source.map(PriceSource::unit_price),
                tag: acquisition_tag(source, graph),
            }
        })
        .collect();

    let disenchant = state
        .disenchant_choice(recipe_id)
        .map(|choice| DisenchantReport {
            item_id: choice.item_id,
            item_name: item_name(items, choice.item_id),
            unit_cost: choice.unit_cost,
        });

    RecipeReport {
        recipe_id,
        name: info.name.clone(),
        kind: recipe.kind(),
        profession_id: info.profession_id,
        tier_id: info.tier_id,
        selling_price,
        production_cost,
        profit,
        reagents,
        disenchant,
        failure: state.failure(recipe_id).cloned(),
    }
}

fn acquisition_tag(source: Option<&PriceSource>, graph: &RecipeGraph) -> AcquisitionTag {
    match source {
        None => AcquisitionTag::Unavailable,
        Some(PriceSource::Market { .. }) => AcquisitionTag::Market,
        Some(PriceSource::Vendor { .. }) => AcquisitionTag::Vendor,
        Some(PriceSource::Crafted {
            recipe_id, rank, ..
        }) => AcquisitionTag::Crafted {
            recipe_id: *recipe_id,
            recipe_name: graph
                .recipe(*recipe_id)
                .map(|recipe| recipe.name().to_string())
                .unwrap_or_else(|| format!("recipe {recipe_id}")),
            rank: *rank,
        },
    }
}

fn item_name(items: &HashMap<ItemId, Item>, item_id: ItemId) -> String {
    items
        .get(&item_id)
        .map(|item| item.name.clone())
        .unwrap_or_else(|| format!("item {item_id}"))
}

/// Profit descending; recipes without a profit go last, ordered by name.
pub fn sort_by_profit(reports: &mut [RecipeReport]) {
    reports.sort_by(|a, b| match (a.profit, b.profit) {
        (Some(pa), Some(pb)) => pb.cmp(&pa).then_with(|| a.name.cmp(&b.name)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    });
}

/// An amount of copper rendered as gold, silver and copper.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Money(pub Decimal);

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let copper = self.0.round().to_i128().unwrap_or_default();
        let sign = if copper < 0 { "-" } else { "" };
        let copper = copper.unsigned_abs();
        let gold = copper / 10_000;
        let silver = (copper / 100) % 100;
        let rest = copper % 100;
        if gold > 0 {
            write!(f, "{sign}{gold}g {silver:02}s {rest:02}c")
        } else if silver > 0 {
            write!(f, "{sign}{silver}s {rest:02}c")
        } else {
            write!(f, "{sign}{rest}c")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::auctions::{AuctionIndex, RankClassifier};
    use crate::domain::entities::{
        Auction, AuctionHouseItem, ItemQuality, ItemStack, NormalRecipe, RecipeInfo, TimeLeft,
    };
    use crate::domain::recipe_graph::DisenchantableIndex;
    use crate::domain::resolution::{CostEngine, ResolutionSettings};
    use rust_decimal_macros::dec;

    fn normal(id: RecipeId, name: &str, output: ItemId, reagents: &[(Decimal, ItemId)]) -> Recipe {
        Recipe::Normal(NormalRecipe {
            info: RecipeInfo {
                id,
                category: "Consumables".to_string(),
                name: name.to_string(),
                profession_id: 171,
                tier_id: 2750,
                expansion: 8,
            },
            crafted_item: ItemStack::new(Decimal::ONE, output),
            reagents: reagents
                .iter()
                .map(|(count, item)| ItemStack::new(*count, *item))
                .collect(),
        })
    }

    fn material(id: ItemId, name: &str, vendor_price: Option<u64>) -> Item {
        Item {
            id,
            name: name.to_string(),
            vendor_price,
            quality: ItemQuality::Common,
            item_class: 7,
            item_subclass: 9,
            expansion: 8,
        }
    }

    fn listing(item_id: ItemId, price: u64) -> Auction {
        Auction {
            id: u64::from(item_id),
            price,
            quantity: 1,
            time_left: TimeLeft::Long,
            item: AuctionHouseItem::new(item_id),
        }
    }

    struct Resolved {
        graph: RecipeGraph,
        items: HashMap<ItemId, Item>,
        state: WorkingSet,
    }

    fn resolve(recipes: Vec<Recipe>, items: Vec<Item>, listings: Vec<Auction>) -> Resolved {
        let items: HashMap<ItemId, Item> = items.into_iter().map(|item| (item.id, item)).collect();
        let graph = RecipeGraph::classify(recipes);
        let auctions = AuctionIndex::aggregate(&listings);
        let disenchantable = DisenchantableIndex::default();
        let settings = ResolutionSettings {
            vendor_items: HashSet::from([3]),
            buy_always: HashSet::new(),
            ranks: RankClassifier::default(),
        };
        let mut state = WorkingSet::new();
        CostEngine {
            items: &items,
            auctions: &auctions,
            graph: &graph,
            disenchantable: &disenchantable,
            settings: &settings,
        }
        .resolve(&mut state);
        Resolved {
            graph,
            items,
            state,
        }
    }

    fn fixture() -> Resolved {
        resolve(
            vec![
                normal(10, "Potion of Spectral Agility", 100, &[(dec!(3), 1), (dec!(1), 3)]),
                normal(11, "Spectral Flask of Power", 101, &[(dec!(1), 1), (dec!(2), 2)]),
                normal(12, "Shadowcore Oil", 102, &[(dec!(1), 4)]),
                normal(13, "Herb Bundle", 2, &[(dec!(1), 1)]),
            ],
            vec![
                material(1, "Rising Glory", None),
                material(2, "Herb Bundle", None),
                material(3, "Crystal Vial", Some(5)),
                material(4, "Unknown Sap", None),
            ],
            vec![
                listing(1, 100),
                listing(2, 1_000),
                listing(100, 2_000),
                listing(101, 900),
                listing(102, 5_000),
            ],
        )
    }

    fn report_for(reports: &[RecipeReport], id: RecipeId) -> &RecipeReport {
        reports
            .iter()
            .find(|report| report.recipe_id == id)
            .expect("report present")
    }

    #[test]
    fn reports_break_down_reagents() {
        let r = fixture();

        let reports = build_reports(&r.graph, &r.items, &r.state, &ReportFilter::default());
        let potion = report_for(&reports, 10);

        assert_eq!(potion.selling_price, Some(dec!(2000)));
        assert_eq!(potion.production_cost, Some(dec!(305)));
        assert_eq!(potion.profit, Some(dec!(1695)));
        assert_eq!(potion.reagents.len(), 2);
        assert_eq!(potion.reagents[0].tag, AcquisitionTag::Market);
        assert_eq!(potion.reagents[0].total(), Some(dec!(300)));
        assert_eq!(potion.reagents[1].tag, AcquisitionTag::Vendor);
        assert_eq!(potion.reagents[1].item_name, "Crystal Vial");
    }

    #[test]
    fn crafted_reagent_names_its_recipe() {
        let r = fixture();

        let reports = build_reports(&r.graph, &r.items, &r.state, &ReportFilter::default());
        let flask = report_for(&reports, 11);

        assert_eq!(
            flask.reagents[1].tag,
            AcquisitionTag::Crafted {
                recipe_id: 13,
                recipe_name: "Herb Bundle".to_string(),
                rank: None
            }
        );
        assert_eq!(flask.production_cost, Some(dec!(300)));
    }

    #[test]
    fn unpriceable_recipes_sort_last() {
        let r = fixture();

        let reports = build_reports(&r.graph, &r.items, &r.state, &ReportFilter::default());

        let last = reports.last().expect("reports");
        assert_eq!(last.recipe_id, 12);
        assert!(last.profit.is_none());
        assert!(last.failure.is_some());
        assert_eq!(last.reagents[0].tag, AcquisitionTag::Unavailable);
        assert_eq!(reports[0].recipe_id, 10);
        let profits: Vec<_> = reports.iter().filter_map(|report| report.profit).collect();
        assert!(profits.windows(2).all(|pair| pair[0] >= pair[1]));
    }

    #[test]
    fn filter_drops_ignored_outputs_and_applies_search() {
        let r = fixture();
        let filter = ReportFilter {
            ignore: HashSet::from([101]),
            search: Some("POTION".to_string()),
        };

        let reports = build_reports(&r.graph, &r.items, &r.state, &filter);

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].recipe_id, 10);
    }

    #[test]
    fn money_renders_gold_silver_copper() {
        assert_eq!(Money(dec!(1234567)).to_string(), "123g 45s 67c");
        assert_eq!(Money(dec!(10005)).to_string(), "1g 00s 05c");
        assert_eq!(Money(dec!(1250)).to_string(), "12s 50c");
        assert_eq!(Money(dec!(7.6)).to_string(), "8c");
        assert_eq!(Money(dec!(-20000)).to_string(), "-2g 00s 00c");
    }
}
