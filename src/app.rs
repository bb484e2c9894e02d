//! Command handlers wiring the game-data client, the snapshot store, the
//! cost engine and the report renderer.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::cli::output;
use crate::cli::{
    AuctionsCommand, ClearTarget, Commands, ConfigCommand, EditAction, EditArgs, InitArgs,
    ProfessionScope, ProfitArgs, ReportFormat, UpdateCommand,
};
use crate::config::settings::DataConfig;
use crate::config::{Region, Settings};
use crate::domain::auctions::{AuctionIndex, CombinedAuction};
use crate::domain::catalog::{Catalog, ProfessionTierPair};
use crate::domain::entities::{
    ConnectedRealm, Expansion, Item, ItemId, Profession, ProfessionId, Recipe, TierRef,
};
use crate::domain::profit::{build_reports, ReportFilter};
use crate::domain::recipe_graph::{
    find_enchanting_materials, make_legendary_recipes, synthesize_disenchant_recipes,
    DisenchantableIndex, RecipeGraph,
};
use crate::domain::resolution::{CostEngine, WorkingSet};
use crate::error::{ConfigError, Result};
use crate::infra::{BlizzardClient, Collection, SnapshotStore};

pub struct App {
    settings: Settings,
    config_path: PathBuf,
    store: SnapshotStore,
}

impl App {
    pub fn new(settings: Settings, config_path: PathBuf, data_dir: PathBuf) -> Self {
        let store = snapshot_store(&settings, data_dir);
        Self {
            settings,
            config_path,
            store,
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Update(command) => self.update(command).await,
            Commands::Auctions(AuctionsCommand::Update) => {
                let client = self.client().await?;
                self.update_auctions(&client).await
            }
            Commands::Auctions(AuctionsCommand::Clear) => {
                self.store.clear(Collection::Auctions)?;
                output::ok("Cleared auction snapshot");
                Ok(())
            }
            Commands::Clear(args) => self.clear(args.target),
            Commands::Profit(args) => self.profit(args).await,
            Commands::Config(command) => self.config(command),
        }
    }

    /// Realms, professions, recipes and items as currently stored.
    pub fn load_catalog(&self) -> Result<Catalog> {
        let realms: Vec<ConnectedRealm> = self.store.load(Collection::Realms)?;
        let professions: Vec<Profession> = self.store.load(Collection::Professions)?;
        let recipes: Vec<Recipe> = self.store.load(Collection::Recipes)?;
        let items: Vec<Item> = self.store.load(Collection::Items)?;
        debug!(
            realms = realms.len(),
            professions = professions.len(),
            recipes = recipes.len(),
            items = items.len(),
            "loaded catalog"
        );
        Ok(Catalog::new(realms, professions, recipes, items))
    }

    pub fn load_auctions(&self) -> Result<AuctionIndex> {
        let records: Vec<CombinedAuction> = self.store.load(Collection::Auctions)?;
        Ok(AuctionIndex::from_combined(records))
    }

    async fn client(&self) -> Result<BlizzardClient> {
        let mut client = BlizzardClient::new(&self.settings)?;
        client.generate_token().await?;
        Ok(client)
    }

    async fn update(&self, command: UpdateCommand) -> Result<()> {
        let client = self.client().await?;
        match command {
            UpdateCommand::Realms => self.update_realms(&client).await,
            UpdateCommand::Professions => self.update_professions(&client).await,
            UpdateCommand::Recipes(scope) => self.update_recipes(&client, scope.professions).await,
            UpdateCommand::Items => self.update_items(&client).await,
            UpdateCommand::All(scope) => {
                self.update_realms(&client).await?;
                self.update_professions(&client).await?;
                self.update_recipes(&client, scope.professions).await?;
                self.update_items(&client).await
            }
        }
    }

    async fn update_realms(&self, client: &BlizzardClient) -> Result<()> {
        output::progress("Fetching realms");
        let realms = client.fetch_realms().await;
        output::progress_done(realms.is_ok());
        let realms = realms?;
        self.store.store(Collection::Realms, &realms)?;
        output::ok(&format!("Stored {} connected realms", realms.len()));
        Ok(())
    }

    async fn update_professions(&self, client: &BlizzardClient) -> Result<()> {
        output::progress("Fetching professions");
        let professions = client.fetch_professions().await;
        output::progress_done(professions.is_ok());
        let professions = professions?;
        self.store.store(Collection::Professions, &professions)?;
        output::ok(&format!("Stored {} professions", professions.len()));
        Ok(())
    }

    async fn update_recipes(&self, client: &BlizzardClient, scope: ProfessionScope) -> Result<()> {
        let catalog = self.load_catalog()?;
        let tiers = select_tiers(&catalog, scope, &self.settings)?;
        if tiers.is_empty() {
            output::warn("No profession tiers selected; run `update professions` first");
            return Ok(());
        }

        let data = &self.settings.data;
        let mut fetched = Vec::new();
        for (profession, tier) in &tiers {
            output::progress(&format!("Fetching {}", tier.name));
            let recipes = client.fetch_recipes(profession, tier).await;
            output::progress_done(recipes.is_ok());
            let mut recipes = recipes?;
            if data.profession_ids.legendary.contains(&profession.id)
                && tier.expansion == data.legendary_expansion
            {
                recipes = make_legendary_recipes(recipes);
            }
            fetched.extend(recipes);
        }

        let refreshed: HashSet<TierRef> = tiers
            .iter()
            .map(|(profession, tier)| TierRef::new(profession.id, tier.id))
            .collect();
        let recipes = merge_recipes(catalog.recipes.clone(), fetched, &refreshed);
        let recipes = self.with_disenchant_recipes(recipes, &catalog)?;
        self.store.store(Collection::Recipes, &recipes)?;
        output::ok(&format!(
            "Stored {} recipes from {} profession tiers",
            recipes.len(),
            refreshed.len()
        ));
        Ok(())
    }

    /// Fetches every recipe item not stored yet, then rebuilds the
    /// disenchant recipes against the complete item set.
    async fn update_items(&self, client: &BlizzardClient) -> Result<()> {
        let catalog = self.load_catalog()?;
        let missing = missing_items(&catalog.recipes, &catalog.items);
        if missing.is_empty() {
            output::ok("All recipe items are stored");
        } else {
            output::progress(&format!("Fetching {} items", missing.len()));
            let mut items: Vec<Item> = catalog.items.values().cloned().collect();
            for (item_id, expansion) in &missing {
                match client.fetch_item(*item_id, *expansion).await {
                    Ok(item) => items.push(item),
                    Err(err) => {
                        output::progress_done(false);
                        return Err(err.into());
                    }
                }
            }
            output::progress_done(true);
            items.sort_by_key(|item| item.id);
            self.store.store(Collection::Items, &items)?;
            output::ok(&format!("Stored {} items", items.len()));
        }

        let catalog = self.load_catalog()?;
        let recipes = self.with_disenchant_recipes(catalog.recipes.clone(), &catalog)?;
        self.store.store(Collection::Recipes, &recipes)?;
        Ok(())
    }

    fn with_disenchant_recipes(&self, recipes: Vec<Recipe>, catalog: &Catalog) -> Result<Vec<Recipe>> {
        match catalog.profession(self.settings.data.profession_ids.enchanting) {
            Ok(enchanting) => {
                attach_disenchant_recipes(recipes, &catalog.items, enchanting, &self.settings)
            }
            Err(err) => {
                warn!(error = %err, "skipping disenchant recipes");
                Ok(recipes)
            }
        }
    }

    async fn update_auctions(&self, client: &BlizzardClient) -> Result<()> {
        let catalog = self.load_catalog()?;
        let realm = &self.settings.server.realm;
        let (connected_realm_id, realm_id) = catalog.find_realm(realm)?;
        debug!(connected_realm_id, realm_id, "resolved realm");

        output::progress(&format!("Fetching auctions of {realm}"));
        let listings = client.fetch_auctions(connected_realm_id).await;
        output::progress_done(listings.is_ok());
        let listings = listings?;

        let index = AuctionIndex::aggregate(&listings);
        let records: Vec<&CombinedAuction> = index.records().collect();
        self.store.store(Collection::Auctions, &records)?;
        output::ok(&format!(
            "Stored {} price points for {} items from {} listings",
            records.len(),
            index.item_count(),
            listings.len()
        ));
        Ok(())
    }

    fn clear(&self, target: ClearTarget) -> Result<()> {
        let collections: &[Collection] = match target {
            ClearTarget::Realms => &[Collection::Realms],
            ClearTarget::Professions => &[Collection::Professions],
            ClearTarget::Recipes => &[Collection::Recipes],
            ClearTarget::Items => &[Collection::Items],
            ClearTarget::All => &[
                Collection::Realms,
                Collection::Professions,
                Collection::Recipes,
                Collection::Items,
            ],
        };
        for collection in collections {
            self.store.clear(*collection)?;
            output::ok(&format!("Cleared {}", collection.name()));
        }
        Ok(())
    }

    async fn profit(&self, args: ProfitArgs) -> Result<()> {
        if args.update {
            let client = self.client().await?;
            self.update_auctions(&client).await?;
        }

        let catalog = self.load_catalog()?;
        let selection = self.profit_selection(&catalog, &args.professions)?;
        if selection.is_empty() {
            output::warn("No profession tiers selected; pass --professions or run `config professions add`");
            return Ok(());
        }

        let recipes = profit_recipes(
            &catalog,
            &selection,
            self.settings.data.profession_ids.enchanting,
        );
        if recipes.is_empty() {
            output::warn("No recipes stored for the selected tiers; run `update recipes`");
            return Ok(());
        }

        let disenchant_expansions: HashSet<Expansion> = recipes
            .iter()
            .filter(|recipe| matches!(recipe, Recipe::Disenchant(_)))
            .map(|recipe| recipe.info().expansion)
            .collect();
        let mut graph = RecipeGraph::classify(recipes);
        let disenchantable = DisenchantableIndex::build(
            catalog.items.values(),
            &disenchant_expansions,
            &self.settings.data.item_classes,
        );
        graph.include_disenchant_pool(&disenchantable);

        let auctions = self.load_auctions()?;
        if auctions.is_empty() {
            output::warn("No auction snapshot; run `auctions update` or pass --update");
        }

        let resolution = self
            .settings
            .resolution_settings(&args.vendor_items, &args.buy_always);
        let engine = CostEngine {
            items: &catalog.items,
            auctions: &auctions,
            graph: &graph,
            disenchantable: &disenchantable,
            settings: &resolution,
        };
        let mut state = WorkingSet::new();
        engine.resolve(&mut state);

        let filter = ReportFilter {
            ignore: self.settings.data.ignore.iter().copied().collect(),
            search: args.search,
        };
        let reports = build_reports(&graph, &catalog.items, &state, &filter);
        info!(
            recipes = graph.len(),
            reports = reports.len(),
            failures = state.failures().len(),
            "profit report ready"
        );

        match args.format {
            ReportFormat::Table => output::profit_table(&reports, args.details),
            ReportFormat::Json => output::profit_json(&reports),
        }
        Ok(())
    }

    /// Tier names from the command line, or the configured tiers when none
    /// are given or the single name is `config`.
    fn profit_selection(&self, catalog: &Catalog, names: &[String]) -> Result<HashSet<TierRef>> {
        let use_config = names.is_empty() || (names.len() == 1 && names[0] == "config");
        if use_config {
            catalog.configured_professions(&self.settings.data.professions)?;
            return Ok(self.settings.data.professions.iter().copied().collect());
        }
        let selection = names
            .iter()
            .map(|name| catalog.find_profession_tier(name))
            .collect::<std::result::Result<HashSet<_>, _>>()?;
        Ok(selection)
    }

    fn config(&self, command: ConfigCommand) -> Result<()> {
        match command {
            ConfigCommand::Init(args) => init_config(&self.config_path, &args),
            ConfigCommand::Show => self.show_config(),
            ConfigCommand::Professions(edit) => self.edit_professions(&edit),
            ConfigCommand::VendorItems(edit) => self.edit_items(&edit, ItemList::VendorItems),
            ConfigCommand::BuyAlways(edit) => self.edit_items(&edit, ItemList::BuyAlways),
            ConfigCommand::Ignore(edit) => self.edit_items(&edit, ItemList::Ignore),
        }
    }

    fn show_config(&self) -> Result<()> {
        let mut settings = Settings::load_file(&self.config_path)?;
        if !settings.client.secret.is_empty() {
            settings.client.secret = "********".to_string();
        }

        output::section("Configuration");
        output::key_value("Config file", self.config_path.display());
        output::key_value("Data dir", self.store.root().display());

        let catalog = self.load_catalog()?;
        for pair in &settings.data.professions {
            let name = catalog
                .profession_tier(pair.profession, pair.tier)
                .map(|(_, tier)| tier.name.clone())
                .unwrap_or_else(|_| "unknown tier".to_string());
            output::key_value("Profession", format!("{name} ({pair})"));
        }

        println!();
        print!("{}", settings.to_toml()?);
        Ok(())
    }

    fn edit_professions(&self, edit: &EditArgs) -> Result<()> {
        let mut settings = Settings::load_file(&self.config_path)?;
        let catalog = self.load_catalog()?;
        let mut changed = false;
        for name in &edit.names {
            match catalog.find_profession_tier(name) {
                Ok(pair) => {
                    if apply_edit(&mut settings.data.professions, pair, edit.action) {
                        changed = true;
                        output::ok(&format!("{} {name} ({pair})", action_label(edit.action)));
                    } else {
                        output::note(&format!("{name} unchanged"));
                    }
                }
                Err(err) => {
                    warn!(error = %err, "skipping unknown name");
                    output::warn(&err.to_string());
                }
            }
        }
        if changed {
            settings.save(&self.config_path)?;
        }
        Ok(())
    }

    fn edit_items(&self, edit: &EditArgs, list: ItemList) -> Result<()> {
        let mut settings = Settings::load_file(&self.config_path)?;
        let catalog = self.load_catalog()?;
        let mut changed = false;
        for name in &edit.names {
            match catalog.find_item(name) {
                Ok(item_id) => {
                    if apply_edit(list.entries(&mut settings.data), item_id, edit.action) {
                        changed = true;
                        output::ok(&format!(
                            "{} {name} ({item_id}) in {}",
                            action_label(edit.action),
                            list.label()
                        ));
                    } else {
                        output::note(&format!("{name} unchanged"));
                    }
                }
                Err(err) => {
                    warn!(error = %err, "skipping unknown name");
                    output::warn(&err.to_string());
                }
            }
        }
        if changed {
            settings.save(&self.config_path)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
enum ItemList {
    VendorItems,
    BuyAlways,
    Ignore,
}

impl ItemList {
    fn label(self) -> &'static str {
        match self {
            ItemList::VendorItems => "vendor_items",
            ItemList::BuyAlways => "buy_always",
            ItemList::Ignore => "ignore",
        }
    }

    fn entries(self, data: &mut DataConfig) -> &mut Vec<ItemId> {
        match self {
            ItemList::VendorItems => &mut data.vendor_items,
            ItemList::BuyAlways => &mut data.buy_always,
            ItemList::Ignore => &mut data.ignore,
        }
    }
}

fn action_label(action: EditAction) -> &'static str {
    match action {
        EditAction::Add => "Added",
        EditAction::Delete => "Removed",
    }
}

pub fn snapshot_store(settings: &Settings, root: PathBuf) -> SnapshotStore {
    SnapshotStore::new(
        root,
        &settings.server.region,
        &settings.data.language,
        &settings.server.realm,
    )
}

/// Writes a fresh configuration file.
pub fn init_config(path: &Path, args: &InitArgs) -> Result<()> {
    if path.exists() && !args.force {
        return Err(ConfigError::InvalidValue {
            field: "config",
            reason: format!("{} already exists, pass --force to overwrite", path.display()),
        }
        .into());
    }
    let region = Region::parse(&args.region.to_ascii_lowercase()).ok_or_else(|| {
        ConfigError::InvalidValue {
            field: "server.region",
            reason: format!("'{}' is not one of us, eu, kr, tw, cn", args.region),
        }
    })?;

    let mut settings = Settings::new(region, &args.realm, &args.language);
    settings.client.id = args.client_id.clone().unwrap_or_default();
    settings.client.secret = args.client_secret.clone().unwrap_or_default();
    Settings::parse_toml(&settings.to_toml()?)?;
    settings.save(path)?;

    output::ok(&format!("Wrote {}", path.display()));
    if settings.client.id.is_empty() || settings.client.secret.is_empty() {
        output::note(
            "Set client.id and client.secret, or CVS_CLIENT_ID and CVS_CLIENT_SECRET, before fetching data",
        );
    }
    Ok(())
}

pub fn select_tiers<'a>(
    catalog: &'a Catalog,
    scope: ProfessionScope,
    settings: &Settings,
) -> Result<Vec<ProfessionTierPair<'a>>> {
    Ok(match scope {
        ProfessionScope::Latest => catalog.latest_professions(settings.data.current_expansion),
        ProfessionScope::All => catalog.all_professions(),
        ProfessionScope::Config => catalog.configured_professions(&settings.data.professions)?,
    })
}

/// Replaces the recipes of the refreshed tiers. Disenchant recipes are
/// dropped; they are rebuilt from the merged set.
pub fn merge_recipes(
    existing: Vec<Recipe>,
    fetched: Vec<Recipe>,
    refreshed: &HashSet<TierRef>,
) -> Vec<Recipe> {
    let mut merged: Vec<Recipe> = existing
        .into_iter()
        .filter(|recipe| {
            let info = recipe.info();
            !matches!(recipe, Recipe::Disenchant(_))
                && !refreshed.contains(&TierRef::new(info.profession_id, info.tier_id))
        })
        .collect();
    merged.extend(fetched);
    merged.sort_by_key(Recipe::id);
    merged
}

/// Item ids used by the recipes that are not stored yet, with the earliest
/// expansion of a recipe that uses them.
pub fn missing_items(
    recipes: &[Recipe],
    known: &HashMap<ItemId, Item>,
) -> BTreeMap<ItemId, Expansion> {
    let mut missing = BTreeMap::new();
    for recipe in recipes {
        if matches!(recipe, Recipe::Disenchant(_)) {
            continue;
        }
        let expansion = recipe.info().expansion;
        let outputs = recipe.outputs();
        for stack in outputs.iter().chain(recipe.reagents()) {
            if known.contains_key(&stack.item_id) {
                continue;
            }
            missing
                .entry(stack.item_id)
                .and_modify(|current: &mut Expansion| *current = (*current).min(expansion))
                .or_insert(expansion);
        }
    }
    missing
}

/// Replaces the disenchant recipes with ones synthesized for every
/// expansion that has enchanting recipes.
pub fn attach_disenchant_recipes(
    recipes: Vec<Recipe>,
    items: &HashMap<ItemId, Item>,
    enchanting: &Profession,
    settings: &Settings,
) -> Result<Vec<Recipe>> {
    let mut recipes: Vec<Recipe> = recipes
        .into_iter()
        .filter(|recipe| !matches!(recipe, Recipe::Disenchant(_)))
        .collect();
    let expansions: HashSet<Expansion> = recipes
        .iter()
        .filter(|recipe| recipe.info().profession_id == enchanting.id)
        .map(|recipe| recipe.info().expansion)
        .collect();
    if expansions.is_empty() || items.is_empty() {
        debug!("no enchanting recipes or items, skipping disenchant recipes");
        return Ok(recipes);
    }

    let classes = &settings.data.item_classes;
    let table = settings.disenchant_table()?;
    let index = DisenchantableIndex::build(items.values(), &expansions, classes);
    let materials = find_enchanting_materials(recipes.iter(), items, enchanting, classes);
    let synthesized = synthesize_disenchant_recipes(&index, &table, &materials, enchanting);
    info!(recipes = synthesized.len(), "synthesized disenchant recipes");

    recipes.extend(synthesized.into_iter().map(Recipe::Disenchant));
    Ok(recipes)
}

/// Recipes of the selected tiers plus the disenchant recipes of every
/// selected enchanting tier's expansion.
pub fn profit_recipes(
    catalog: &Catalog,
    selection: &HashSet<TierRef>,
    enchanting: ProfessionId,
) -> Vec<Recipe> {
    let enchanting_expansions: HashSet<Expansion> = selection
        .iter()
        .filter(|pair| pair.profession == enchanting)
        .filter_map(|pair| catalog.profession_tier(pair.profession, pair.tier).ok())
        .map(|(_, tier)| tier.expansion)
        .collect();

    let mut recipes: Vec<Recipe> = catalog
        .profession_recipes(selection)
        .into_iter()
        .cloned()
        .collect();
    let included: HashSet<_> = recipes.iter().map(Recipe::id).collect();
    recipes.extend(
        catalog
            .recipes
            .iter()
            .filter(|recipe| {
                matches!(recipe, Recipe::Disenchant(_))
                    && enchanting_expansions.contains(&recipe.info().expansion)
                    && !included.contains(&recipe.id())
            })
            .cloned(),
    );
    recipes
}

/// Returns whether the list changed.
pub fn apply_edit<T: PartialEq>(list: &mut Vec<T>, value: T, action: EditAction) -> bool {
    match action {
        EditAction::Add => {
            if list.contains(&value) {
                false
            } else {
                list.push(value);
                true
            }
        }
        EditAction::Delete => {
            let before = list.len();
            list.retain(|entry| *entry != value);
            list.len() != before
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{
        DisenchantRecipe, ItemQuality, ItemStack, NormalRecipe, ProfessionTier, RecipeInfo,
    };
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn info(id: i64, profession_id: u32, tier_id: u32, expansion: Expansion) -> RecipeInfo {
        RecipeInfo {
            id,
            category: "test".to_string(),
            name: format!("recipe {id}"),
            profession_id,
            tier_id,
            expansion,
        }
    }

    fn normal(info: RecipeInfo, output: ItemId, reagents: &[ItemId]) -> Recipe {
        Recipe::Normal(NormalRecipe {
            info,
            crafted_item: ItemStack::new(Decimal::ONE, output),
            reagents: reagents
                .iter()
                .map(|item_id| ItemStack::new(dec!(2), *item_id))
                .collect(),
        })
    }

    fn disenchant(info: RecipeInfo) -> Recipe {
        Recipe::Disenchant(DisenchantRecipe {
            info,
            reagent_quality: ItemQuality::Rare,
            crafted_items: vec![ItemStack::new(Decimal::ONE, 172231)],
        })
    }

    fn item(id: ItemId, quality: ItemQuality, class: u32, subclass: u32) -> Item {
        Item {
            id,
            name: format!("item {id}"),
            vendor_price: None,
            quality,
            item_class: class,
            item_subclass: subclass,
            expansion: 8,
        }
    }

    fn enchanting() -> Profession {
        Profession {
            id: 333,
            name: "Enchanting".to_string(),
            tiers: vec![
                ProfessionTier {
                    id: 2494,
                    name: "Kul Tiran Enchanting".to_string(),
                    expansion: 7,
                },
                ProfessionTier {
                    id: 2753,
                    name: "Shadowlands Enchanting".to_string(),
                    expansion: 8,
                },
            ],
        }
    }

    fn settings() -> Settings {
        Settings::new(Region::Eu, "blackhand", "en_US")
    }

    #[test]
    fn merge_replaces_refreshed_tiers_only() {
        let existing = vec![
            normal(info(3, 171, 2750, 8), 1, &[]),
            normal(info(1, 164, 2751, 8), 2, &[]),
            disenchant(info(-83, 333, 2753, 8)),
        ];
        let fetched = vec![normal(info(2, 171, 2750, 8), 3, &[])];

        let merged = merge_recipes(existing, fetched, &HashSet::from([TierRef::new(171, 2750)]));

        let ids: Vec<_> = merged.iter().map(Recipe::id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn missing_items_prefers_earliest_expansion() {
        let recipes = vec![
            normal(info(1, 171, 2750, 8), 100, &[200, 300]),
            normal(info(2, 171, 2749, 7), 101, &[200]),
            disenchant(info(-83, 333, 2753, 8)),
        ];
        let known = HashMap::from([(300, item(300, ItemQuality::Common, 7, 9))]);

        let missing = missing_items(&recipes, &known);

        assert_eq!(
            missing,
            BTreeMap::from([(100, 8), (101, 7), (200, 7)])
        );
    }

    #[test]
    fn disenchant_recipes_are_rebuilt_from_items() {
        let recipes = vec![
            normal(info(10, 333, 2753, 8), 172406, &[172230, 172231]),
            disenchant(info(-99, 333, 2753, 8)),
        ];
        let items: HashMap<_, _> = [
            item(172230, ItemQuality::Uncommon, 7, 12),
            item(172231, ItemQuality::Rare, 7, 12),
            item(178926, ItemQuality::Rare, 4, 1),
        ]
        .into_iter()
        .map(|item| (item.id, item))
        .collect();

        let recipes = attach_disenchant_recipes(recipes, &items, &enchanting(), &settings())
            .expect("default table is valid");

        assert_eq!(recipes.len(), 2);
        let Some(Recipe::Disenchant(synthesized)) = recipes.iter().find(|r| r.id() < 0) else {
            panic!("expected a disenchant recipe");
        };
        assert_eq!(synthesized.info.id, -83);
        assert_eq!(synthesized.info.tier_id, 2753);
        assert_eq!(synthesized.reagent_quality, ItemQuality::Rare);
        assert_eq!(
            synthesized.crafted_items,
            vec![
                ItemStack::new(dec!(0.25), 172230),
                ItemStack::new(Decimal::ONE, 172231)
            ]
        );
    }

    #[test]
    fn disenchant_recipes_need_items() {
        let recipes = vec![normal(info(10, 333, 2753, 8), 172406, &[172230])];

        let recipes =
            attach_disenchant_recipes(recipes, &HashMap::new(), &enchanting(), &settings())
                .expect("nothing to validate");

        assert_eq!(recipes.len(), 1);
    }

    #[test]
    fn profit_recipes_include_disenchant_of_selected_enchanting_tier() {
        let catalog = Catalog::new(
            Vec::new(),
            vec![enchanting()],
            vec![
                normal(info(1, 171, 2750, 8), 1, &[]),
                normal(info(2, 333, 2753, 8), 2, &[]),
                disenchant(info(-83, 333, 0, 8)),
                disenchant(info(-73, 333, 2494, 7)),
            ],
            Vec::new(),
        );

        let alchemy = profit_recipes(&catalog, &HashSet::from([TierRef::new(171, 2750)]), 333);
        assert_eq!(alchemy.len(), 1);

        let mut ids: Vec<_> = profit_recipes(&catalog, &HashSet::from([TierRef::new(333, 2753)]), 333)
            .iter()
            .map(Recipe::id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![-83, 2]);
    }

    #[test]
    fn apply_edit_reports_changes() {
        let mut list = vec![1, 2];

        assert!(apply_edit(&mut list, 3, EditAction::Add));
        assert!(!apply_edit(&mut list, 3, EditAction::Add));
        assert!(apply_edit(&mut list, 1, EditAction::Delete));
        assert!(!apply_edit(&mut list, 1, EditAction::Delete));
        assert_eq!(list, vec![2, 3]);
    }

    #[test]
    fn init_config_refuses_to_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let args = InitArgs {
            region: "EU".to_string(),
            realm: "blackhand".to_string(),
            language: "de_DE".to_string(),
            client_id: Some("id".to_string()),
            client_secret: None,
            force: false,
        };

        init_config(&path, &args).expect("first write");
        let settings = Settings::load_file(&path).expect("written config loads");
        assert_eq!(settings.server.region, "eu");
        assert_eq!(settings.data.language, "de_DE");
        assert_eq!(settings.client.id, "id");

        assert!(init_config(&path, &args).is_err());
        assert!(init_config(&path, &InitArgs { force: true, ..args }).is_ok());
    }
}
