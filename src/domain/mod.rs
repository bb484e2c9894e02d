//! Crafting economy logic: entities, auction aggregation, the recipe graph,
//! cost resolution and profit reports.

pub mod auctions;
pub mod catalog;
pub mod entities;
pub mod profit;
pub mod recipe_graph;
pub mod resolution;

pub use auctions::{AuctionIndex, CombinedAuction, RankClassifier};
pub use catalog::Catalog;
pub use entities::{
    Auction, AuctionHouseItem, ConnectedRealm, Item, ItemId, ItemQuality, ItemStack, Profession,
    ProfessionTier, Recipe, RecipeId, TierRef,
};
pub use profit::{build_reports, Money, RecipeReport, ReportFilter};
pub use recipe_graph::{DisenchantableIndex, ItemClassCodes, RecipeGraph};
pub use resolution::{CostEngine, PriceSource, ResolutionFailure, ResolutionSettings, WorkingSet};
