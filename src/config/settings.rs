//! Application configuration loading and validation.
//!
//! Configuration is a TOML file. API credentials may be supplied through the
//! `CVS_CLIENT_ID` and `CVS_CLIENT_SECRET` environment variables instead.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use crate::domain::auctions::RankClassifier;
use crate::domain::entities::{Expansion, ItemId, ItemQuality, ProfessionId, Rank, TierRef};
use crate::domain::recipe_graph::{DisenchantTable, ItemClassCodes};
use crate::domain::resolution::ResolutionSettings;
use crate::error::{ConfigError, Result};
use crate::util::persistence;

pub const CLIENT_ID_ENV: &str = "CVS_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "CVS_CLIENT_SECRET";

/// Battle.net API region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Region {
    Us,
    Eu,
    Kr,
    Tw,
    Cn,
}

impl Region {
    pub const ALL: [Region; 5] = [Region::Us, Region::Eu, Region::Kr, Region::Tw, Region::Cn];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Us => "us",
            Region::Eu => "eu",
            Region::Kr => "kr",
            Region::Tw => "tw",
            Region::Cn => "cn",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|region| region.as_str() == raw)
    }

    /// Game-data API host.
    pub fn api_base(&self) -> String {
        match self {
            Region::Cn => "https://gateway.battlenet.com.cn/".to_string(),
            other => format!("https://{}.api.blizzard.com/", other.as_str()),
        }
    }

    /// OAuth token endpoint.
    pub fn token_url(&self) -> String {
        match self {
            Region::Cn => "https://www.battlenet.com.cn/oauth/token".to_string(),
            other => format!("https://{}.battle.net/oauth/token", other.as_str()),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub region: String,
    /// Realm slug, e.g. `blackhand`.
    pub realm: String,
}

impl ServerConfig {
    pub fn region(&self) -> std::result::Result<Region, ConfigError> {
        Region::parse(&self.region).ok_or_else(|| ConfigError::InvalidValue {
            field: "server.region",
            reason: format!("'{}' is not one of us, eu, kr, tw, cn", self.region),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfessionIds {
    pub enchanting: ProfessionId,
    /// Professions whose same-item recipe groups are legendary ranks.
    pub legendary: Vec<ProfessionId>,
}

impl Default for ProfessionIds {
    fn default() -> Self {
        Self {
            enchanting: 333,
            // Blacksmithing, Leatherworking, Tailoring, Jewelcrafting
            legendary: vec![164, 165, 197, 755],
        }
    }
}

/// One bonus-list code that marks a legendary rank on auction listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendaryRank {
    pub bonus_id: u32,
    pub rank: Rank,
}

fn default_legendary_ranks() -> Vec<LegendaryRank> {
    [(1487, 1), (1507, 2), (1522, 3), (1532, 4)]
        .into_iter()
        .map(|(bonus_id, rank)| LegendaryRank { bonus_id, rank })
        .collect()
}

fn default_disenchantment() -> BTreeMap<String, BTreeMap<String, Decimal>> {
    let table = |entries: &[(&str, Decimal)]| {
        entries
            .iter()
            .map(|(quality, probability)| (quality.to_string(), *probability))
            .collect::<BTreeMap<_, _>>()
    };
    BTreeMap::from([
        ("UNCOMMON".to_string(), table(&[("UNCOMMON", Decimal::ONE)])),
        (
            "RARE".to_string(),
            table(&[("UNCOMMON", Decimal::new(25, 2)), ("RARE", Decimal::ONE)]),
        ),
        ("EPIC".to_string(), table(&[("EPIC", Decimal::ONE)])),
    ])
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Locale of item and recipe names, `xx_XX`.
    pub language: String,
    pub current_expansion: Expansion,
    /// Expansion whose legendary professions craft multi-rank items.
    pub legendary_expansion: Expansion,
    pub professions: Vec<TierRef>,
    pub vendor_items: Vec<ItemId>,
    pub buy_always: Vec<ItemId>,
    pub ignore: Vec<ItemId>,
    pub profession_ids: ProfessionIds,
    pub item_classes: ItemClassCodes,
    pub legendary_ranks: Vec<LegendaryRank>,
    /// Reagent quality -> material quality -> expected yield.
    pub disenchantment: BTreeMap<String, BTreeMap<String, Decimal>>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            language: "en_US".to_string(),
            current_expansion: 8,
            legendary_expansion: 8,
            professions: Vec::new(),
            vendor_items: Vec::new(),
            buy_always: Vec::new(),
            ignore: Vec::new(),
            profession_ids: ProfessionIds::default(),
            item_classes: ItemClassCodes::default(),
            legendary_ranks: default_legendary_ranks(),
            disenchantment: default_disenchantment(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Settings {
    pub fn new(region: Region, realm: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            server: ServerConfig {
                region: region.as_str().to_string(),
                realm: realm.into(),
            },
            client: ClientConfig::default(),
            data: DataConfig {
                language: language.into(),
                ..DataConfig::default()
            },
            logging: LoggingConfig::default(),
        }
    }

    /// `config.toml` in the platform config directory.
    pub fn default_path() -> Result<PathBuf> {
        persistence::config_file().ok_or_else(|| {
            ConfigError::InvalidValue {
                field: "config",
                reason: "no configuration directory on this platform".to_string(),
            }
            .into()
        })
    }

    /// Parses and validates TOML content without environment overrides.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads the file as written, for commands that edit and save it.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Reads the file and applies environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut settings = Self::load_file(path)?;
        settings.apply_env_overrides();
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(id) = std::env::var(CLIENT_ID_ENV).ok().filter(|v| !v.is_empty()) {
            self.client.id = id;
        }
        if let Some(secret) = std::env::var(CLIENT_SECRET_ENV)
            .ok()
            .filter(|v| !v.is_empty())
        {
            self.client.secret = secret;
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|err| ConfigError::Write(err.to_string()).into())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = self.to_toml()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| ConfigError::Write(err.to_string()))?;
        }
        fs::write(path, content).map_err(|err| ConfigError::Write(err.to_string()))?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.server.region()?;
        if self.server.realm.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "server.realm",
            }
            .into());
        }
        if !is_locale(&self.data.language) {
            return Err(ConfigError::InvalidValue {
                field: "data.language",
                reason: format!("'{}' does not look like en_US", self.data.language),
            }
            .into());
        }

        let mut seen = HashSet::new();
        for entry in &self.data.legendary_ranks {
            if entry.rank == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "data.legendary_ranks",
                    reason: format!("bonus {} maps to rank 0", entry.bonus_id),
                }
                .into());
            }
            if !seen.insert(entry.bonus_id) {
                return Err(ConfigError::InvalidValue {
                    field: "data.legendary_ranks",
                    reason: format!("bonus {} is listed twice", entry.bonus_id),
                }
                .into());
            }
        }

        self.disenchant_table()?;

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::InvalidValue {
                field: "logging.format",
                reason: "must be 'pretty' or 'json'".to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub fn region(&self) -> Result<Region> {
        Ok(self.server.region()?)
    }

    /// API credentials; both must be present for network commands.
    pub fn credentials(&self) -> Result<(&str, &str)> {
        if self.client.id.is_empty() {
            return Err(ConfigError::MissingField { field: "client.id" }.into());
        }
        if self.client.secret.is_empty() {
            return Err(ConfigError::MissingField {
                field: "client.secret",
            }
            .into());
        }
        Ok((&self.client.id, &self.client.secret))
    }

    /// The salvage table with typed quality keys.
    pub fn disenchant_table(&self) -> Result<DisenchantTable> {
        let mut table = DisenchantTable::new();
        for (reagent, outputs) in &self.data.disenchantment {
            let reagent_quality = parse_quality(reagent)?;
            let mut row = BTreeMap::new();
            for (material, probability) in outputs {
                let material_quality = parse_quality(material)?;
                if *probability <= Decimal::ZERO || *probability > Decimal::ONE {
                    return Err(ConfigError::InvalidValue {
                        field: "data.disenchantment",
                        reason: format!(
                            "{reagent} -> {material}: probability {probability} is outside (0, 1]"
                        ),
                    }
                    .into());
                }
                row.insert(material_quality, *probability);
            }
            table.insert(reagent_quality, row);
        }
        Ok(table)
    }

    pub fn rank_classifier(&self) -> RankClassifier {
        RankClassifier::new(
            self.data
                .legendary_ranks
                .iter()
                .map(|entry| (entry.bonus_id, entry.rank)),
        )
    }

    /// Purchase overrides for a resolution run; `extra_*` come from the
    /// command line and add to the configured lists.
    pub fn resolution_settings(
        &self,
        extra_vendor_items: &[ItemId],
        extra_buy_always: &[ItemId],
    ) -> ResolutionSettings {
        ResolutionSettings {
            vendor_items: self
                .data
                .vendor_items
                .iter()
                .chain(extra_vendor_items)
                .copied()
                .collect(),
            buy_always: self
                .data
                .buy_always
                .iter()
                .chain(extra_buy_always)
                .copied()
                .collect(),
            ranks: self.rank_classifier(),
        }
    }
}

fn parse_quality(raw: &str) -> std::result::Result<ItemQuality, ConfigError> {
    ItemQuality::parse(raw).ok_or_else(|| ConfigError::InvalidValue {
        field: "data.disenchantment",
        reason: format!("unknown quality '{raw}'"),
    })
}

/// `xx_XX`, e.g. `en_US`.
pub fn is_locale(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() == 5
        && bytes[0].is_ascii_lowercase()
        && bytes[1].is_ascii_lowercase()
        && bytes[2] == b'_'
        && bytes[3].is_ascii_uppercase()
        && bytes[4].is_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rust_decimal_macros::dec;

    const MINIMAL: &str = r#"
[server]
region = "eu"
realm = "blackhand"
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let settings = Settings::parse_toml(MINIMAL).expect("valid config");

        assert_eq!(settings.region().ok(), Some(Region::Eu));
        assert_eq!(settings.data.language, "en_US");
        assert_eq!(settings.data.profession_ids.enchanting, 333);
        assert_eq!(settings.data.item_classes, ItemClassCodes::default());
        assert_eq!(settings.data.legendary_ranks.len(), 4);
        assert_eq!(settings.logging, LoggingConfig::default());
    }

    #[test]
    fn default_rank_codes() {
        let settings = Settings::parse_toml(MINIMAL).expect("valid config");
        let classifier = settings.rank_classifier();

        let item = crate::domain::entities::AuctionHouseItem::new(1).with_bonus_lists(vec![1522]);
        assert_eq!(classifier.classify(&item), Some(3));
    }

    #[test]
    fn rejects_unknown_region() {
        let result = Settings::parse_toml("[server]\nregion = \"mars\"\nrealm = \"x\"\n");

        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::InvalidValue {
                field: "server.region",
                ..
            }))
        ));
    }

    #[test]
    fn rejects_bad_locale() {
        let content = format!("{MINIMAL}\n[data]\nlanguage = \"english\"\n");

        assert!(matches!(
            Settings::parse_toml(&content),
            Err(Error::Config(ConfigError::InvalidValue {
                field: "data.language",
                ..
            }))
        ));
    }

    #[test]
    fn rejects_probability_above_one() {
        let content = format!("{MINIMAL}\n[data.disenchantment.EPIC]\nEPIC = 1.5\n");

        assert!(matches!(
            Settings::parse_toml(&content),
            Err(Error::Config(ConfigError::InvalidValue {
                field: "data.disenchantment",
                ..
            }))
        ));
    }

    #[test]
    fn disenchant_table_is_typed() {
        let content = format!(
            "{MINIMAL}\n[data.disenchantment.EPIC]\nEPIC = 1\nRARE = 0.1\n"
        );
        let settings = Settings::parse_toml(&content).expect("valid config");

        let table = settings.disenchant_table().expect("valid table");

        let epic = table.get(&ItemQuality::Epic).expect("epic row");
        assert_eq!(epic.get(&ItemQuality::Rare), Some(&dec!(0.1)));
        assert_eq!(epic.get(&ItemQuality::Epic), Some(&dec!(1)));
    }

    #[test]
    fn resolution_settings_merge_command_line_lists() {
        let content = format!("{MINIMAL}\n[data]\nvendor_items = [1, 2]\nbuy_always = [3]\n");
        let settings = Settings::parse_toml(&content).expect("valid config");

        let resolution = settings.resolution_settings(&[4], &[5]);

        assert_eq!(resolution.vendor_items, HashSet::from([1, 2, 4]));
        assert_eq!(resolution.buy_always, HashSet::from([3, 5]));
    }

    #[test]
    fn credentials_are_required() {
        let settings = Settings::parse_toml(MINIMAL).expect("valid config");

        assert!(matches!(
            settings.credentials(),
            Err(Error::Config(ConfigError::MissingField { field: "client.id" }))
        ));
    }

    #[test]
    fn locale_pattern() {
        assert!(is_locale("en_US"));
        assert!(is_locale("de_DE"));
        assert!(!is_locale("EN_us"));
        assert!(!is_locale("en-US"));
    }
}
