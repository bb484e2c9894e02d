//! Asynchronous client for the Battle.net World of Warcraft game-data API.
//!
//! - Client-credentials OAuth; the token is sent as a bearer header.
//! - Every request carries `namespace` (`static-<region>` or
//!   `dynamic-<region>`) and `locale` query parameters.
//! - Any non-success status aborts the call with [`ProviderError::Status`].

use std::time::Duration;

use reqwest::{Client, Url};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, info, warn};

use crate::config::{Region, Settings};
use crate::domain::entities::{
    Auction, AuctionHouseItem, ConnectedRealm, Expansion, Item, ItemId, ItemModifier,
    ItemQuality, ItemStack, NormalRecipe, PetInfo, Profession, ProfessionTier, Realm, Recipe,
    RecipeId, RecipeInfo, TimeLeft,
};
use crate::error::{ProviderError, Result};
use crate::util::version::user_agent;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Namespace {
    Static,
    Dynamic,
}

impl Namespace {
    fn prefix(&self) -> &'static str {
        match self {
            Namespace::Static => "static",
            Namespace::Dynamic => "dynamic",
        }
    }
}

pub struct BlizzardClient {
    http: Client,
    api_base: Url,
    token_url: Url,
    region: Region,
    locale: String,
    client_id: String,
    client_secret: String,
    token: Option<String>,
}

impl BlizzardClient {
    /// Client for the configured region, locale and credentials.
    pub fn new(settings: &Settings) -> Result<Self> {
        let region = settings.region()?;
        let (id, secret) = settings.credentials()?;
        Ok(Self::with_endpoints(
            &region.api_base(),
            &region.token_url(),
            region,
            &settings.data.language,
            id,
            secret,
        )?)
    }

    pub fn with_endpoints(
        api_base: &str,
        token_url: &str,
        region: Region,
        locale: &str,
        client_id: &str,
        client_secret: &str,
    ) -> std::result::Result<Self, ProviderError> {
        let http = Client::builder()
            .user_agent(user_agent())
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            api_base: Url::parse(api_base)?,
            token_url: Url::parse(token_url)?,
            region,
            locale: locale.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token: None,
        })
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Requests a client-credentials access token.
    pub async fn generate_token(&mut self) -> std::result::Result<(), ProviderError> {
        let response = self
            .http
            .post(self.token_url.clone())
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                url: self.token_url.to_string(),
            });
        }
        let token: TokenDto = response.json().await?;
        if token.access_token.is_empty() {
            return Err(ProviderError::Api("token response without access_token".into()));
        }
        debug!(region = %self.region, "obtained access token");
        self.token = Some(token.access_token);
        Ok(())
    }

    /// Every connected realm with its member realms.
    pub async fn fetch_realms(&self) -> std::result::Result<Vec<ConnectedRealm>, ProviderError> {
        let index: ConnectedRealmIndexDto = self
            .get("data/wow/connected-realm/index", Namespace::Dynamic)
            .await?;
        let mut realms = Vec::with_capacity(index.connected_realms.len());
        for link in index.connected_realms {
            let id = connected_realm_id(&link.href)?;
            let dto: ConnectedRealmDto = self
                .get(&format!("data/wow/connected-realm/{id}"), Namespace::Dynamic)
                .await?;
            realms.push(ConnectedRealm::from(dto));
        }
        info!(connected_realms = realms.len(), "fetched realms");
        Ok(realms)
    }

    /// Every profession with its skill tiers.
    pub async fn fetch_professions(&self) -> std::result::Result<Vec<Profession>, ProviderError> {
        let index: ProfessionIndexDto = self
            .get("data/wow/profession/index", Namespace::Static)
            .await?;
        let mut professions = Vec::with_capacity(index.professions.len());
        for entry in index.professions {
            let dto: ProfessionDto = self
                .get(&format!("data/wow/profession/{}", entry.id), Namespace::Static)
                .await?;
            professions.push(Profession::from(dto));
        }
        info!(professions = professions.len(), "fetched professions");
        Ok(professions)
    }

    /// Recipes of one skill tier. Recipes that craft no item are skipped.
    pub async fn fetch_recipes(
        &self,
        profession: &Profession,
        tier: &ProfessionTier,
    ) -> std::result::Result<Vec<Recipe>, ProviderError> {
        let skill_tier: SkillTierDto = self
            .get(
                &format!("data/wow/profession/{}/skill-tier/{}", profession.id, tier.id),
                Namespace::Static,
            )
            .await?;

        let mut recipes = Vec::new();
        for category in skill_tier.categories {
            for entry in category.recipes {
                let dto: RecipeDto = self
                    .get(&format!("data/wow/recipe/{}", entry.id), Namespace::Static)
                    .await?;
                match recipe_from_dto(dto, &category.name, profession, tier) {
                    Some(recipe) => recipes.push(recipe),
                    None => debug!(recipe = %entry.name, "skipping recipe without crafted item"),
                }
            }
        }
        info!(
            profession = %profession.name,
            tier = %tier.name,
            recipes = recipes.len(),
            "fetched recipes"
        );
        Ok(recipes)
    }

    pub async fn fetch_item(
        &self,
        item_id: ItemId,
        expansion: Expansion,
    ) -> std::result::Result<Item, ProviderError> {
        let dto: ItemDto = self
            .get(&format!("data/wow/item/{item_id}"), Namespace::Static)
            .await?;
        item_from_dto(dto, expansion)
    }

    /// Current listings of a connected realm. Bid-only listings are dropped.
    pub async fn fetch_auctions(
        &self,
        connected_realm_id: u32,
    ) -> std::result::Result<Vec<Auction>, ProviderError> {
        let dto: AuctionsDto = self
            .get(
                &format!("data/wow/connected-realm/{connected_realm_id}/auctions"),
                Namespace::Dynamic,
            )
            .await?;
        let total = dto.auctions.len();
        let auctions: Vec<Auction> = dto.auctions.into_iter().filter_map(auction_from_dto).collect();
        if auctions.len() < total {
            debug!(dropped = total - auctions.len(), "dropped listings without a buyout price");
        }
        info!(connected_realm_id, listings = auctions.len(), "fetched auctions");
        Ok(auctions)
    }

    fn url(&self, path: &str, namespace: Namespace) -> std::result::Result<Url, ProviderError> {
        let mut url = self.api_base.join(path)?;
        url.query_pairs_mut()
            .append_pair("namespace", &format!("{}-{}", namespace.prefix(), self.region))
            .append_pair("locale", &self.locale);
        Ok(url)
    }

    async fn get<T>(&self, path: &str, namespace: Namespace) -> std::result::Result<T, ProviderError>
    where
        T: DeserializeOwned,
    {
        let token = self.token.as_deref().ok_or(ProviderError::MissingToken)?;
        let url = self.url(path, namespace)?;
        let response = self.http.get(url.clone()).bearer_auth(token).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), %url, "request failed");
            return Err(ProviderError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.json().await?)
    }
}

#[derive(Debug, Deserialize)]
struct TokenDto {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
}

#[derive(Debug, Deserialize)]
struct ConnectedRealmIndexDto {
    #[serde(default)]
    connected_realms: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct RealmDto {
    id: u32,
    name: String,
    slug: String,
}

#[derive(Debug, Deserialize)]
struct ConnectedRealmDto {
    id: u32,
    #[serde(default)]
    realms: Vec<RealmDto>,
}

impl From<ConnectedRealmDto> for ConnectedRealm {
    fn from(value: ConnectedRealmDto) -> Self {
        Self {
            id: value.id,
            realms: value
                .realms
                .into_iter()
                .map(|realm| Realm {
                    id: realm.id,
                    name: realm.name,
                    slug: realm.slug,
                })
                .collect(),
        }
    }
}

/// Connected realm id from an index link such as
/// `https://eu.api.blizzard.com/data/wow/connected-realm/1305?namespace=dynamic-eu`.
fn connected_realm_id(href: &str) -> std::result::Result<u32, ProviderError> {
    let url = Url::parse(href)?;
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|segment| !segment.is_empty()))
        .and_then(|segment| segment.parse().ok())
        .ok_or_else(|| ProviderError::Api(format!("unexpected connected realm link {href}")))
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    id: u32,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ProfessionIndexDto {
    #[serde(default)]
    professions: Vec<NamedRef>,
}

#[derive(Debug, Deserialize)]
struct ProfessionDto {
    id: u32,
    name: String,
    #[serde(default)]
    skill_tiers: Vec<NamedRef>,
}

impl From<ProfessionDto> for Profession {
    /// A tier's expansion is its position in the chronologically ordered
    /// tier list.
    fn from(value: ProfessionDto) -> Self {
        Self {
            id: value.id,
            name: value.name,
            tiers: value
                .skill_tiers
                .into_iter()
                .enumerate()
                .map(|(position, tier)| ProfessionTier {
                    id: tier.id,
                    name: tier.name,
                    expansion: Expansion::try_from(position).unwrap_or(Expansion::MAX),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RecipeRef {
    id: RecipeId,
    name: String,
}

#[derive(Debug, Deserialize)]
struct CategoryDto {
    name: String,
    #[serde(default)]
    recipes: Vec<RecipeRef>,
}

#[derive(Debug, Deserialize)]
struct SkillTierDto {
    #[serde(default)]
    categories: Vec<CategoryDto>,
}

#[derive(Debug, Deserialize)]
struct IdRef {
    id: u32,
}

#[derive(Debug, Default, Deserialize)]
struct QuantityDto {
    value: Option<Decimal>,
    minimum: Option<Decimal>,
    maximum: Option<Decimal>,
}

impl QuantityDto {
    /// Fixed yield, or the average of the min/max range.
    fn average(&self) -> Decimal {
        match (self.value, self.minimum, self.maximum) {
            (Some(value), _, _) => value,
            (None, Some(min), Some(max)) => (min + max) / Decimal::TWO,
            (None, Some(single), None) | (None, None, Some(single)) => single,
            (None, None, None) => Decimal::ONE,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReagentDto {
    reagent: IdRef,
    quantity: u32,
}

#[derive(Debug, Deserialize)]
struct RecipeDto {
    id: RecipeId,
    name: String,
    crafted_item: Option<IdRef>,
    crafted_quantity: Option<QuantityDto>,
    #[serde(default)]
    reagents: Vec<ReagentDto>,
}

fn recipe_from_dto(
    dto: RecipeDto,
    category: &str,
    profession: &Profession,
    tier: &ProfessionTier,
) -> Option<Recipe> {
    let crafted = dto.crafted_item?;
    let count = dto
        .crafted_quantity
        .map(|quantity| quantity.average())
        .unwrap_or(Decimal::ONE);
    Some(Recipe::Normal(NormalRecipe {
        info: RecipeInfo {
            id: dto.id,
            category: category.to_string(),
            name: dto.name,
            profession_id: profession.id,
            tier_id: tier.id,
            expansion: tier.expansion,
        },
        crafted_item: ItemStack::new(count, crafted.id),
        reagents: dto
            .reagents
            .into_iter()
            .map(|reagent| ItemStack::new(Decimal::from(reagent.quantity), reagent.reagent.id))
            .collect(),
    }))
}

#[derive(Debug, Deserialize)]
struct QualityDto {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ItemDto {
    id: ItemId,
    name: String,
    quality: QualityDto,
    item_class: IdRef,
    item_subclass: IdRef,
    #[serde(default)]
    purchase_price: u64,
}

fn item_from_dto(dto: ItemDto, expansion: Expansion) -> std::result::Result<Item, ProviderError> {
    let quality = ItemQuality::parse(&dto.quality.kind).ok_or_else(|| {
        ProviderError::Api(format!("item {} has unknown quality {}", dto.id, dto.quality.kind))
    })?;
    Ok(Item {
        id: dto.id,
        name: dto.name,
        vendor_price: (dto.purchase_price > 0).then_some(dto.purchase_price),
        quality,
        item_class: dto.item_class.id,
        item_subclass: dto.item_subclass.id,
        expansion,
    })
}

#[derive(Debug, Deserialize)]
struct AuctionItemDto {
    id: ItemId,
    #[serde(default)]
    bonus_lists: Vec<u32>,
    #[serde(default)]
    modifiers: Vec<ItemModifier>,
    pet_breed_id: Option<u32>,
    pet_level: Option<u32>,
    pet_quality_id: Option<u32>,
    pet_species_id: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct AuctionDto {
    id: u64,
    item: AuctionItemDto,
    quantity: u64,
    unit_price: Option<u64>,
    buyout: Option<u64>,
    time_left: TimeLeft,
}

#[derive(Debug, Deserialize)]
struct AuctionsDto {
    #[serde(default)]
    auctions: Vec<AuctionDto>,
}

/// Commodities carry `unit_price`, other listings `buyout`.
fn auction_from_dto(dto: AuctionDto) -> Option<Auction> {
    let price = dto.unit_price.or(dto.buyout)?;
    let item = dto.item;
    let pet_info = match (
        item.pet_breed_id,
        item.pet_level,
        item.pet_quality_id,
        item.pet_species_id,
    ) {
        (Some(breed_id), Some(level), Some(quality_id), Some(species_id)) => Some(PetInfo {
            breed_id,
            level,
            quality_id,
            species_id,
        }),
        _ => None,
    };
    Some(Auction {
        id: dto.id,
        price,
        quantity: dto.quantity,
        time_left: dto.time_left,
        item: AuctionHouseItem {
            id: item.id,
            bonus_lists: item.bonus_lists,
            modifiers: item.modifiers,
            pet_info,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn blacksmithing() -> (Profession, ProfessionTier) {
        let tier = ProfessionTier {
            id: 2751,
            name: "Shadowlands Blacksmithing".to_string(),
            expansion: 8,
        };
        let profession = Profession {
            id: 164,
            name: "Blacksmithing".to_string(),
            tiers: vec![tier.clone()],
        };
        (profession, tier)
    }

    #[test]
    fn realm_id_from_index_link() {
        let id = connected_realm_id(
            "https://eu.api.blizzard.com/data/wow/connected-realm/1305?namespace=dynamic-eu",
        );

        assert_eq!(id.ok(), Some(1305));
        assert!(connected_realm_id("https://eu.api.blizzard.com/data/wow/").is_err());
    }

    #[test]
    fn profession_tier_expansion_is_list_position() {
        let dto: ProfessionDto = serde_json::from_str(
            r#"{"id": 164, "name": "Blacksmithing", "skill_tiers": [
                {"id": 2477, "name": "Blacksmithing"},
                {"id": 2476, "name": "Outland Blacksmithing"},
                {"id": 2751, "name": "Shadowlands Blacksmithing"}
            ]}"#,
        )
        .expect("valid json");

        let profession = Profession::from(dto);

        let expansions: Vec<_> = profession.tiers.iter().map(|tier| tier.expansion).collect();
        assert_eq!(expansions, vec![0, 1, 2]);
    }

    #[test]
    fn profession_without_tiers() {
        let dto: ProfessionDto =
            serde_json::from_str(r#"{"id": 794, "name": "Archaeology"}"#).expect("valid json");

        assert!(Profession::from(dto).tiers.is_empty());
    }

    #[test]
    fn recipe_yield_is_average_of_range() {
        let (profession, tier) = blacksmithing();
        let dto: RecipeDto = serde_json::from_str(
            r#"{"id": 42, "name": "Shadowghast Ingot",
                "crafted_item": {"id": 171428},
                "crafted_quantity": {"minimum": 1, "maximum": 2},
                "reagents": [{"reagent": {"id": 171828}, "quantity": 5}]}"#,
        )
        .expect("valid json");

        let recipe = recipe_from_dto(dto, "Reagents", &profession, &tier).expect("crafts an item");

        let Recipe::Normal(normal) = recipe else {
            panic!("expected a normal recipe");
        };
        assert_eq!(normal.crafted_item, ItemStack::new(dec!(1.5), 171428));
        assert_eq!(normal.reagents, vec![ItemStack::new(dec!(5), 171828)]);
        assert_eq!(normal.info.category, "Reagents");
        assert_eq!(normal.info.expansion, 8);
    }

    #[test]
    fn recipe_with_fixed_yield_and_none_without_output() {
        let (profession, tier) = blacksmithing();
        let fixed: RecipeDto = serde_json::from_str(
            r#"{"id": 1, "name": "x", "crafted_item": {"id": 7}, "crafted_quantity": {"value": 3}}"#,
        )
        .expect("valid json");
        let enchant: RecipeDto =
            serde_json::from_str(r#"{"id": 2, "name": "Enchant Ring"}"#).expect("valid json");

        let recipe = recipe_from_dto(fixed, "c", &profession, &tier).expect("crafts an item");
        assert_eq!(recipe.outputs(), vec![ItemStack::new(dec!(3), 7)]);
        assert!(recipe_from_dto(enchant, "c", &profession, &tier).is_none());
    }

    #[test]
    fn item_conversion() {
        let dto: ItemDto = serde_json::from_str(
            r#"{"id": 180732, "name": "Rune Etched Vial", "quality": {"type": "COMMON"},
                "item_class": {"id": 7}, "item_subclass": {"id": 11}, "purchase_price": 2500}"#,
        )
        .expect("valid json");

        let item = item_from_dto(dto, 8).expect("known quality");

        assert_eq!(item.vendor_price, Some(2500));
        assert_eq!(item.quality, ItemQuality::Common);
        assert_eq!((item.item_class, item.item_subclass, item.expansion), (7, 11, 8));
    }

    #[test]
    fn item_without_vendor_price() {
        let dto: ItemDto = serde_json::from_str(
            r#"{"id": 1, "name": "Ore", "quality": {"type": "COMMON"},
                "item_class": {"id": 7}, "item_subclass": {"id": 7}, "purchase_price": 0}"#,
        )
        .expect("valid json");

        assert_eq!(item_from_dto(dto, 8).expect("known quality").vendor_price, None);
    }

    #[test]
    fn auction_conversion_keeps_item_identity() {
        let dtos: AuctionsDto = serde_json::from_str(
            r#"{"auctions": [
                {"id": 1, "item": {"id": 171419, "bonus_lists": [6716, 1487],
                  "modifiers": [{"type": 28, "value": 1}]},
                 "buyout": 250000000, "quantity": 1, "time_left": "VERY_LONG"},
                {"id": 2, "item": {"id": 171828}, "unit_price": 1500, "quantity": 200,
                 "time_left": "SHORT"},
                {"id": 3, "item": {"id": 82800, "pet_breed_id": 4, "pet_level": 1,
                  "pet_quality_id": 3, "pet_species_id": 2475},
                 "buyout": 990000, "quantity": 1, "time_left": "LONG"},
                {"id": 4, "item": {"id": 5}, "bid": 10, "quantity": 1, "time_left": "LONG"}
            ]}"#,
        )
        .expect("valid json");

        let auctions: Vec<Auction> = dtos.auctions.into_iter().filter_map(auction_from_dto).collect();

        assert_eq!(auctions.len(), 3);
        assert_eq!(auctions[0].price, 250_000_000);
        assert_eq!(auctions[0].item.bonus_lists, vec![6716, 1487]);
        assert_eq!(auctions[0].item.modifiers[0].modifier_type, 28);
        assert_eq!(auctions[1].price, 1500);
        assert_eq!(auctions[1].time_left, TimeLeft::Short);
        assert_eq!(auctions[2].item.pet_info.map(|pet| pet.species_id), Some(2475));
    }

    #[test]
    fn urls_carry_namespace_and_locale() {
        let client = BlizzardClient::with_endpoints(
            "https://eu.api.blizzard.com/",
            "https://eu.battle.net/oauth/token",
            Region::Eu,
            "en_GB",
            "id",
            "secret",
        )
        .expect("valid endpoints");

        let url = client
            .url("data/wow/item/19019", Namespace::Static)
            .expect("valid path");
        assert_eq!(
            url.as_str(),
            "https://eu.api.blizzard.com/data/wow/item/19019?namespace=static-eu&locale=en_GB"
        );
        assert!(!client.has_token());
    }
}
