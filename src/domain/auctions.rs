//! Auction aggregation: raw listings collapsed into per-item price points.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::entities::{Auction, AuctionHouseItem, ItemId, Rank};

/// All listings sharing one (price, item structure) fingerprint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedAuction {
    pub price: u64,
    pub quantity: u64,
    pub item: AuctionHouseItem,
}

impl CombinedAuction {
    pub fn from_auction(auction: &Auction) -> Self {
        Self {
            price: auction.price,
            quantity: auction.quantity,
            item: auction.item.clone(),
        }
    }

    /// Deterministic identity of a listing. Covers the price and the whole
    /// item structure, so variants of one item id never merge.
    pub fn fingerprint(price: u64, item: &AuctionHouseItem) -> String {
        let mut key = format!("price={price};item={}", item.id);
        key.push_str(";bonus=[");
        for (idx, bonus) in item.bonus_lists.iter().enumerate() {
            if idx > 0 {
                key.push(',');
            }
            let _ = write!(key, "{bonus}");
        }
        key.push_str("];mods=[");
        for (idx, modifier) in item.modifiers.iter().enumerate() {
            if idx > 0 {
                key.push(',');
            }
            let _ = write!(key, "{}:{}", modifier.modifier_type, modifier.value);
        }
        key.push(']');
        if let Some(pet) = &item.pet_info {
            let _ = write!(
                key,
                ";pet=breed:{},level:{},quality:{},species:{}",
                pet.breed_id, pet.level, pet.quality_id, pet.species_id
            );
        }
        key
    }

    pub fn id(&self) -> String {
        Self::fingerprint(self.price, &self.item)
    }

    pub fn unit_price(&self) -> Decimal {
        Decimal::from(self.price)
    }
}

/// Maps a legendary listing to its rank through a bonus-list code.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RankClassifier {
    ranks: HashMap<u32, Rank>,
}

impl RankClassifier {
    pub fn new(ranks: impl IntoIterator<Item = (u32, Rank)>) -> Self {
        Self {
            ranks: ranks.into_iter().collect(),
        }
    }

    /// Rank of the first recognized bonus-list code on the item.
    pub fn classify(&self, item: &AuctionHouseItem) -> Option<Rank> {
        item.bonus_lists
            .iter()
            .find_map(|bonus| self.ranks.get(bonus).copied())
    }
}

/// Aggregated auction snapshot for one realm.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AuctionIndex {
    by_item: HashMap<ItemId, Vec<CombinedAuction>>,
}

impl AuctionIndex {
    /// Groups listings by item id, then merges listings with an identical
    /// fingerprint by summing their quantities.
    pub fn aggregate<'a>(listings: impl IntoIterator<Item = &'a Auction>) -> Self {
        let mut grouped: HashMap<ItemId, HashMap<String, CombinedAuction>> = HashMap::new();
        for auction in listings {
            let key = CombinedAuction::fingerprint(auction.price, &auction.item);
            grouped
                .entry(auction.item.id)
                .or_default()
                .entry(key)
                .and_modify(|combined| combined.quantity += auction.quantity)
                .or_insert_with(|| CombinedAuction::from_auction(auction));
        }

        let by_item = grouped
            .into_iter()
            .map(|(item_id, combined)| (item_id, combined.into_values().collect()))
            .collect();
        Self { by_item }
    }

    /// Rebuilds the index from previously aggregated records, e.g. a stored
    /// snapshot.
    pub fn from_combined(records: impl IntoIterator<Item = CombinedAuction>) -> Self {
        let mut by_item: HashMap<ItemId, Vec<CombinedAuction>> = HashMap::new();
        for record in records {
            by_item.entry(record.item.id).or_default().push(record);
        }
        Self { by_item }
    }

    pub fn get(&self, item_id: ItemId) -> &[CombinedAuction] {
        self.by_item
            .get(&item_id)
            .map(|records| records.as_slice())
            .unwrap_or(&[])
    }

    pub fn records(&self) -> impl Iterator<Item = &CombinedAuction> {
        self.by_item.values().flatten()
    }

    pub fn item_count(&self) -> usize {
        self.by_item.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_item.is_empty()
    }

    /// Cheapest combined listing for the item. Ties may return any of the
    /// tied records.
    pub fn minimum_price(&self, item_id: ItemId) -> Option<&CombinedAuction> {
        self.get(item_id).iter().min_by_key(|record| record.price)
    }

    /// Cheapest listing per rank for a multi-rank item. Listings without a
    /// recognized rank code are dropped with a warning.
    pub fn cheapest_per_rank(
        &self,
        item_id: ItemId,
        classifier: &RankClassifier,
    ) -> BTreeMap<Rank, &CombinedAuction> {
        let mut result: BTreeMap<Rank, &CombinedAuction> = BTreeMap::new();
        for record in self.get(item_id) {
            let Some(rank) = classifier.classify(&record.item) else {
                warn!(
                    item_id,
                    bonus_lists = ?record.item.bonus_lists,
                    "dropping listing with unrecognized rank bonus"
                );
                continue;
            };
            result
                .entry(rank)
                .and_modify(|cheapest| {
                    if record.price < cheapest.price {
                        *cheapest = record;
                    }
                })
                .or_insert(record);
        }
        result
    }

    /// Cheapest price per rank, see [`AuctionIndex::cheapest_per_rank`].
    pub fn minimum_tiered_price(
        &self,
        item_id: ItemId,
        classifier: &RankClassifier,
    ) -> BTreeMap<Rank, u64> {
        self.cheapest_per_rank(item_id, classifier)
            .into_iter()
            .map(|(rank, record)| (rank, record.price))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{ItemModifier, PetInfo, TimeLeft};

    fn listing(id: u64, price: u64, quantity: u64, item: AuctionHouseItem) -> Auction {
        Auction {
            id,
            price,
            quantity,
            time_left: TimeLeft::Long,
            item,
        }
    }

    fn legendary_classifier() -> RankClassifier {
        RankClassifier::new([(1487, 1), (1507, 2), (1522, 3), (1532, 4)])
    }

    #[test]
    fn aggregate_merges_identical_listings() {
        let first = listing(1, 100, 3, AuctionHouseItem::new(42));
        let second = listing(2, 100, 4, AuctionHouseItem::new(42));

        let index = AuctionIndex::aggregate([&first, &second]);

        let records = index.get(42);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].quantity, 7);
    }

    #[test]
    fn aggregate_same_listing_twice_sums_quantity() {
        let auction = listing(1, 250, 5, AuctionHouseItem::new(7));

        let index = AuctionIndex::aggregate([&auction, &auction]);

        assert_eq!(index.get(7).len(), 1);
        assert_eq!(index.get(7)[0].quantity, 10);
    }

    #[test]
    fn aggregate_keeps_variants_apart() {
        let rank1 = listing(1, 100, 1, AuctionHouseItem::new(9).with_bonus_lists(vec![1487]));
        let rank2 = listing(2, 100, 1, AuctionHouseItem::new(9).with_bonus_lists(vec![1507]));
        let other_price = listing(3, 120, 1, AuctionHouseItem::new(9).with_bonus_lists(vec![1487]));

        let index = AuctionIndex::aggregate([&rank1, &rank2, &other_price]);

        assert_eq!(index.get(9).len(), 3);
    }

    #[test]
    fn fingerprint_is_stable_for_equal_structure() {
        let mut item = AuctionHouseItem::new(5).with_bonus_lists(vec![1, 2]);
        item.modifiers.push(ItemModifier {
            modifier_type: 9,
            value: 60,
        });

        assert_eq!(
            CombinedAuction::fingerprint(10, &item),
            CombinedAuction::fingerprint(10, &item.clone())
        );
    }

    #[test]
    fn fingerprint_differs_on_bonus_lists() {
        let a = AuctionHouseItem::new(5).with_bonus_lists(vec![1, 2]);
        let b = AuctionHouseItem::new(5).with_bonus_lists(vec![1, 3]);

        assert_ne!(
            CombinedAuction::fingerprint(10, &a),
            CombinedAuction::fingerprint(10, &b)
        );
    }

    #[test]
    fn fingerprint_includes_pet_info() {
        let plain = AuctionHouseItem::new(82800);
        let mut pet = plain.clone();
        pet.pet_info = Some(PetInfo {
            breed_id: 4,
            level: 1,
            quality_id: 3,
            species_id: 2475,
        });

        assert_ne!(
            CombinedAuction::fingerprint(500, &plain),
            CombinedAuction::fingerprint(500, &pet)
        );
    }

    #[test]
    fn minimum_price_picks_cheapest_record() {
        let cheap = listing(1, 90, 1, AuctionHouseItem::new(3));
        let pricey = listing(2, 150, 20, AuctionHouseItem::new(3));

        let index = AuctionIndex::aggregate([&cheap, &pricey]);

        assert_eq!(index.minimum_price(3).map(|r| r.price), Some(90));
        assert!(index.minimum_price(4).is_none());
    }

    #[test]
    fn minimum_tiered_price_groups_by_rank() {
        let r1 = listing(1, 200, 1, AuctionHouseItem::new(171).with_bonus_lists(vec![6716, 1487]));
        let r1_pricey = listing(2, 260, 1, AuctionHouseItem::new(171).with_bonus_lists(vec![1487]));
        let r2 = listing(3, 400, 1, AuctionHouseItem::new(171).with_bonus_lists(vec![1507]));

        let index = AuctionIndex::aggregate([&r1, &r1_pricey, &r2]);
        let tiers = index.minimum_tiered_price(171, &legendary_classifier());

        assert_eq!(tiers, BTreeMap::from([(1, 200), (2, 400)]));
    }

    #[test]
    fn minimum_tiered_price_drops_unknown_codes() {
        let r1 = listing(1, 200, 1, AuctionHouseItem::new(171).with_bonus_lists(vec![1487]));
        let r2 = listing(2, 400, 1, AuctionHouseItem::new(171).with_bonus_lists(vec![1507]));
        let unknown = listing(3, 50, 1, AuctionHouseItem::new(171).with_bonus_lists(vec![9999]));

        let index = AuctionIndex::aggregate([&r1, &r2, &unknown]);
        let tiers = index.minimum_tiered_price(171, &legendary_classifier());

        assert_eq!(tiers.len(), 2);
        assert_eq!(tiers.get(&1), Some(&200));
        assert_eq!(tiers.get(&2), Some(&400));
    }

    #[test]
    fn from_combined_restores_index() {
        let auction = listing(1, 77, 2, AuctionHouseItem::new(11));
        let index = AuctionIndex::aggregate([&auction]);

        let restored = AuctionIndex::from_combined(index.records().cloned());

        assert_eq!(restored, index);
    }
}
