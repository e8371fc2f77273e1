//! Tier catalog
//!
//! Tiers available in a location come from the public retail price list,
//! enriched with a static table of hardware characteristics. SKUs missing
//! from the table are not offered. The free tier never appears in the
//! consumption price list and is always added.

use crate::plan::{FREE_SKU, is_free_sku};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use weblodge_cloud::{CloudError, Result, RetryConfig};

pub const PRICE_API_URL: &str = "https://prices.azure.com/api/retail/prices";

const FREE_DESCRIPTION: &str = "Free tier - limited to 60 minutes per day.";
const BASIC_DESCRIPTION: &str = "Designed for apps with lower traffic requirements and not needing advanced auto scale and traffic management features.";
const STANDARD_DESCRIPTION: &str = "Designed for running production workloads.";
const PREMIUM_V3_DESCRIPTION: &str =
    "Designed to provide enhanced performance for production apps and workload.";

/// Hardware of a SKU: (name, cores, RAM in GB, disk in GB, description)
type Hardware = (&'static str, u32, f64, u32, &'static str);

const HARDWARE: &[Hardware] = &[
    (FREE_SKU, 1, 1.0, 1, FREE_DESCRIPTION),
    ("B1", 1, 1.75, 10, BASIC_DESCRIPTION),
    ("B2", 2, 3.5, 10, BASIC_DESCRIPTION),
    ("B3", 4, 7.0, 10, BASIC_DESCRIPTION),
    ("S1", 1, 1.75, 50, STANDARD_DESCRIPTION),
    ("S2", 2, 3.5, 50, STANDARD_DESCRIPTION),
    ("S3", 4, 7.0, 50, STANDARD_DESCRIPTION),
    ("P0v3", 1, 4.0, 250, PREMIUM_V3_DESCRIPTION),
    ("P1v3", 2, 8.0, 250, PREMIUM_V3_DESCRIPTION),
    ("P1mv3", 2, 16.0, 250, PREMIUM_V3_DESCRIPTION),
    ("P2v3", 4, 16.0, 250, PREMIUM_V3_DESCRIPTION),
    ("P2mv3", 4, 32.0, 250, PREMIUM_V3_DESCRIPTION),
    ("P3v3", 8, 32.0, 250, PREMIUM_V3_DESCRIPTION),
    ("P3mv3", 8, 64.0, 250, PREMIUM_V3_DESCRIPTION),
    ("P4mv3", 16, 128.0, 250, PREMIUM_V3_DESCRIPTION),
    ("P5mv3", 32, 256.0, 250, PREMIUM_V3_DESCRIPTION),
];

fn hardware(sku: &str) -> Option<&'static Hardware> {
    HARDWARE.iter().find(|(name, ..)| *name == sku)
}

/// A compute tier offered in a location
#[derive(Debug, Clone, PartialEq)]
pub struct Tier {
    pub name: String,
    pub location: String,
    pub price_per_hour: f64,
    pub description: String,
    pub cores: u32,
    /// GB
    pub ram: f64,
    /// GB
    pub disk: u32,
}

impl Tier {
    fn from_hardware(hw: &Hardware, location: &str, price_per_hour: f64) -> Self {
        let (name, cores, ram, disk, description) = *hw;
        Self {
            name: name.to_string(),
            location: location.to_string(),
            price_per_hour,
            description: description.to_string(),
            cores,
            ram,
            disk,
        }
    }

    /// The free tier, which has no price list entry
    pub fn free(location: &str) -> Self {
        Self::from_hardware(&HARDWARE[0], location, 0.0)
    }

    pub fn is_free(&self) -> bool {
        is_free_sku(&self.name)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<6} ${:.3}/h  {} core(s), {} GB RAM, {} GB disk  {}",
            self.name, self.price_per_hour, self.cores, self.ram, self.disk, self.description
        )
    }
}

/// Source of the tiers available in a location
#[async_trait]
pub trait TierCatalog: Send + Sync {
    async fn tiers(&self, location: &str) -> Result<Vec<Tier>>;
}

/// Tier matching `name`, case-insensitively
pub fn resolve_tier(tiers: &[Tier], name: &str, location: &str) -> Result<Tier> {
    tiers
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(name))
        .cloned()
        .ok_or_else(|| CloudError::InvalidTier {
            tier: name.to_string(),
            location: location.to_string(),
        })
}

#[derive(Debug, Deserialize)]
struct PricePage {
    #[serde(rename = "Items", default)]
    items: Vec<PriceItem>,

    #[serde(rename = "NextPageLink", default)]
    next_page_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PriceItem {
    #[serde(rename = "skuName")]
    sku_name: String,

    #[serde(rename = "armRegionName")]
    arm_region_name: String,

    #[serde(rename = "retailPrice")]
    retail_price: f64,
}

/// Build the catalog from raw price entries
fn build_tiers(location: &str, items: Vec<PriceItem>) -> Vec<Tier> {
    let mut seen = HashSet::new();
    let mut tiers: Vec<Tier> = items
        .into_iter()
        .filter(|item| !is_free_sku(&item.sku_name))
        .filter(|item| item.retail_price >= 0.0)
        .filter_map(|item| {
            let hw = hardware(&item.sku_name)?;
            seen.insert(item.sku_name.clone())
                .then(|| Tier::from_hardware(hw, &item.arm_region_name, item.retail_price))
        })
        .collect();

    tiers.push(Tier::free(location));
    tiers.sort_by(|a, b| {
        a.price_per_hour
            .total_cmp(&b.price_per_hour)
            .then_with(|| a.name.cmp(&b.name))
    });
    tiers
}

/// Region names are lower-case alphanumerics, e.g. `northeurope`
fn is_region_name(location: &str) -> bool {
    !location.is_empty()
        && location
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// Catalog backed by the retail price API
pub struct PriceCatalog {
    http: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

impl PriceCatalog {
    pub fn new() -> Result<Self> {
        Self::with_base_url(PRICE_API_URL)
    }

    /// Use another endpoint, e.g. a local mock
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("weblodge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CloudError::InvalidSku(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// OData filter of Linux App Service hourly consumption prices in USD
    pub fn filter(location: &str) -> String {
        format!(
            "serviceName eq 'Azure App Service' and contains(productName, 'Linux') \
             and armRegionName eq '{}' and unitOfMeasure eq '1 Hour' \
             and type eq 'Consumption' and isPrimaryMeterRegion eq true \
             and currencyCode eq 'USD'",
            location
        )
    }

    async fn fetch_page(&self, request: impl Fn() -> reqwest::RequestBuilder) -> Result<PricePage> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let response = request()
                .send()
                .await
                .map_err(|e| CloudError::InvalidSku(format!("price list unreachable: {}", e)))?;

            let status = response.status();
            if status.is_server_error() && attempt < self.retry.max_attempts {
                let delay = self.retry.delay_for(attempt);
                tracing::warn!("Price list returned {}, retrying in {:?}", status, delay);
                tokio::time::sleep(delay).await;
                continue;
            }
            if !status.is_success() {
                return Err(CloudError::InvalidSku(format!(
                    "price list request failed: {}",
                    status
                )));
            }

            return response
                .json::<PricePage>()
                .await
                .map_err(|e| CloudError::InvalidSku(format!("invalid price list: {}", e)));
        }
    }
}

#[async_trait]
impl TierCatalog for PriceCatalog {
    async fn tiers(&self, location: &str) -> Result<Vec<Tier>> {
        if !is_region_name(location) {
            return Err(CloudError::InvalidLocation(location.to_string()));
        }
        let filter = Self::filter(location);
        tracing::debug!("GET {} ($filter={})", self.base_url, filter);

        let mut page = self
            .fetch_page(|| self.http.get(&self.base_url).query(&[("$filter", filter.as_str())]))
            .await?;
        let mut items = std::mem::take(&mut page.items);

        while let Some(next) = page.next_page_link.take() {
            tracing::debug!("GET {}", next);
            page = self.fetch_page(|| self.http.get(&next)).await?;
            items.append(&mut page.items);
        }

        if items.is_empty() {
            return Err(CloudError::InvalidLocation(location.to_string()));
        }

        Ok(build_tiers(location, items))
    }
}

/// Fixed list of tiers, used offline and in tests
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    tiers: Vec<Tier>,
}

impl StaticCatalog {
    pub fn new(tiers: Vec<Tier>) -> Self {
        Self { tiers }
    }

    /// Every known SKU in `location` at the given hourly price
    pub fn uniform(location: &str, price_per_hour: f64) -> Self {
        let tiers = HARDWARE
            .iter()
            .map(|hw| {
                let price = if is_free_sku(hw.0) { 0.0 } else { price_per_hour };
                Tier::from_hardware(hw, location, price)
            })
            .collect();
        Self::new(tiers)
    }
}

#[async_trait]
impl TierCatalog for StaticCatalog {
    async fn tiers(&self, location: &str) -> Result<Vec<Tier>> {
        let wanted = weblodge_cloud::normalize_location(location);
        let tiers: Vec<Tier> = self
            .tiers
            .iter()
            .filter(|t| weblodge_cloud::normalize_location(&t.location) == wanted)
            .cloned()
            .collect();

        if tiers.is_empty() {
            return Err(CloudError::InvalidLocation(location.to_string()));
        }
        Ok(tiers)
    }
}
