//! Validated site registry built from raw configuration records.
//!
//! Keys are interned in ascending order, so comparing two `SiteId`s is the
//! same as comparing their keys. Every deterministic tie-break in the
//! allocator relies on that.

use chrono::{Datelike, NaiveDate, Weekday};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::config::AllocatorConfig;
use crate::interner::{GroupId, KeyInterner, SiteId};
use crate::models::{PersonConfig, SiteConfig};

/// Errors raised while turning raw configuration into a registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Site key must not be empty")]
    EmptyKey,
    #[error("Duplicate site key: {0}")]
    DuplicateKey(String),
    #[error("Duplicate site name: {0}")]
    DuplicateName(String),
    #[error("Invalid weekday {weekday} for {owner} (expected 0-6)")]
    InvalidWeekday { owner: String, weekday: u8 },
    #[error("Invalid holiday {value:?} for {owner} (expected YYYY-MM-DD)")]
    InvalidHoliday { owner: String, value: String },
    #[error("Friday bounds must satisfy min <= target <= max (got {min}/{target}/{max})")]
    InvalidFridayBounds { min: u32, target: u32, max: u32 },
}

/// Map a 0-based weekday index (Monday = 0) to a chrono weekday.
pub fn weekday_from_index(index: u8) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

fn parse_weekdays(owner: &str, raw: &[u8]) -> Result<Vec<Weekday>, ConfigError> {
    raw.iter()
        .map(|&weekday| {
            weekday_from_index(weekday).ok_or_else(|| ConfigError::InvalidWeekday {
                owner: owner.to_string(),
                weekday,
            })
        })
        .collect()
}

fn parse_holidays(owner: &str, raw: &[String]) -> Result<FxHashSet<NaiveDate>, ConfigError> {
    raw.iter()
        .map(|value| {
            NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
                ConfigError::InvalidHoliday {
                    owner: owner.to_string(),
                    value: value.clone(),
                }
            })
        })
        .collect()
}

/// A radiologist of an `advanced_split` site.
#[derive(Clone, Debug)]
pub struct Person {
    pub name: String,
    /// Empty means Monday to Friday
    pub weekdays: Vec<Weekday>,
    pub holidays: FxHashSet<NaiveDate>,
}

impl Person {
    fn from_config(site_key: &str, config: &PersonConfig) -> Result<Self, ConfigError> {
        let owner = format!("{}/{}", site_key, config.name);
        Ok(Self {
            name: config.name.clone(),
            weekdays: parse_weekdays(&owner, &config.available_weekdays)?,
            holidays: parse_holidays(&owner, &config.holidays)?,
        })
    }

    pub fn is_available(&self, day: NaiveDate) -> bool {
        let weekday = day.weekday();
        let allowed = if self.weekdays.is_empty() {
            weekday.num_days_from_monday() < 5
        } else {
            self.weekdays.contains(&weekday)
        };
        allowed && !self.holidays.contains(&day)
    }
}

/// A validated site.
#[derive(Clone, Debug)]
pub struct Site {
    pub id: SiteId,
    pub key: String,
    pub name: String,
    pub weight: u64,
    /// Empty means no weekday restriction (and holidays are then ignored)
    pub weekdays: Vec<Weekday>,
    pub holidays: FxHashSet<NaiveDate>,
    pub pair_same_day: bool,
    /// Derived once from the leading characters of the key
    pub group_id: GroupId,
    pub is_majorelle: bool,
    pub advanced_split: bool,
    pub people: Vec<Person>,
}

impl Site {
    /// Whether the site can take a slot on `day`.
    pub fn is_available(&self, day: NaiveDate) -> bool {
        if self.weekdays.is_empty() {
            return true;
        }
        self.weekdays.contains(&day.weekday()) && !self.holidays.contains(&day)
    }
}

/// All sites of a configuration, indexed by `SiteId`.
#[derive(Clone, Debug)]
pub struct SiteRegistry {
    sites: Vec<Site>,
    keys: KeyInterner,
    groups: KeyInterner,
    by_name: FxHashMap<String, SiteId>,
}

impl SiteRegistry {
    /// Validate raw records and build the registry, ordered by key.
    pub fn new(
        mut configs: Vec<SiteConfig>,
        config: &AllocatorConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        configs.sort_by(|a, b| a.key.cmp(&b.key));

        let mut keys = KeyInterner::with_capacity(configs.len());
        let mut groups = KeyInterner::default();
        let mut by_name: FxHashMap<String, SiteId> = FxHashMap::default();
        let mut sites: Vec<Site> = Vec::with_capacity(configs.len());

        for raw in &configs {
            if raw.key.is_empty() {
                return Err(ConfigError::EmptyKey);
            }
            if keys.get(&raw.key).is_some() {
                return Err(ConfigError::DuplicateKey(raw.key.clone()));
            }
            let id = keys.intern(&raw.key);
            if by_name.insert(raw.name.clone(), id).is_some() {
                return Err(ConfigError::DuplicateName(raw.name.clone()));
            }

            let prefix: String = raw.key.chars().take(config.group_prefix_len).collect();
            let people = raw
                .people
                .iter()
                .map(|p| Person::from_config(&raw.key, p))
                .collect::<Result<Vec<_>, _>>()?;

            sites.push(Site {
                id,
                key: raw.key.clone(),
                name: raw.name.clone(),
                weight: raw.nb_radiologists.max(0) as u64,
                weekdays: parse_weekdays(&raw.key, &raw.available_weekdays)?,
                holidays: parse_holidays(&raw.key, &raw.holidays)?,
                pair_same_day: raw.pair_same_day,
                group_id: groups.intern(&prefix),
                is_majorelle: raw.key.starts_with(&config.majorelle_prefix),
                advanced_split: raw.advanced_split,
                people,
            });
        }

        Ok(Self {
            sites,
            keys,
            groups,
            by_name,
        })
    }

    #[inline]
    pub fn get(&self, id: SiteId) -> &Site {
        &self.sites[id as usize]
    }

    pub fn by_key(&self, key: &str) -> Option<&Site> {
        self.keys.get(key).map(|id| self.get(id))
    }

    pub fn by_name(&self, name: &str) -> Option<&Site> {
        self.by_name.get(name).map(|&id| self.get(id))
    }

    /// Sites in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Site> {
        self.sites.iter()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Number of distinct prefix groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Majorelle site ids in key order.
    pub fn majorelle_ids(&self) -> Vec<SiteId> {
        self.sites
            .iter()
            .filter(|s| s.is_majorelle)
            .map(|s| s.id)
            .collect()
    }

    pub fn total_weight(&self) -> u64 {
        self.sites.iter().map(|s| s.weight).sum()
    }
}
