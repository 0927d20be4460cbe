//! Transport emission factors from the ImpactCO2 API

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::emissions::{
    BreakdownStrategy, CatalogEntry, attach_catalog_breakdowns, consolidate_carpools,
};
use crate::models::transport::{id_as_string, number_or_string};
use crate::models::{FootprintEntry, TransportOption};
use crate::{CarbonTripError, Result};

/// Source of transport options for a distance
#[async_trait]
pub trait TransportFactorService: Send + Sync {
    /// Consolidated options with baseline emissions for `distance_km`
    async fn transport_options(&self, distance_km: f64) -> Result<Vec<TransportOption>>;
}

#[derive(Debug, Deserialize)]
pub struct TransportResponse {
    pub data: Option<Vec<RawTransport>>,
}

/// One transport row as returned by the API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransport {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "number_or_string")]
    pub value: f64,
    #[serde(default)]
    pub unit: String,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub details: Option<Vec<FootprintEntry>>,
    pub footprint_detail: Option<Vec<FootprintEntry>>,
}

impl RawTransport {
    /// Domain option carrying the inline `details` breakdown
    pub fn into_option(self) -> TransportOption {
        TransportOption {
            id: self.id,
            name: self.name,
            slug: self.slug.unwrap_or_default(),
            value: self.value,
            unit: self.unit,
            description: self.description,
            breakdown: self.details.unwrap_or_default(),
        }
    }

    /// Catalog row carrying the `footprintDetail` breakdown
    pub fn into_catalog_entry(self) -> CatalogEntry {
        CatalogEntry {
            name: self.name,
            slug: self.slug.unwrap_or_default(),
            footprint: self.footprint_detail.unwrap_or_default(),
        }
    }
}

/// Query string sent with every option request
fn option_params(distance_km: f64, language: &str) -> Vec<(&'static str, String)> {
    vec![
        ("km", distance_km.to_string()),
        ("displayAll", "0".to_string()),
        ("ignoreRadiativeForcing", "0".to_string()),
        ("occupencyRate", "1".to_string()),
        ("includeConstruction", "0".to_string()),
        ("language", language.to_string()),
    ]
}

/// Query string for the per-km footprint catalog
fn catalog_params(language: &str) -> Vec<(&'static str, String)> {
    vec![
        ("km", "1".to_string()),
        ("displayAll", "1".to_string()),
        ("includeConstruction", "1".to_string()),
        ("language", language.to_string()),
    ]
}

fn build_url(base_url: &str, params: &[(&str, String)]) -> String {
    let query = params
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{base_url}?{query}")
}

/// Attach category breakdowns to consolidated options. `None` keeps the
/// inline `details`; a failed catalog fetch leaves every breakdown empty.
fn apply_breakdowns(
    options: Vec<TransportOption>,
    catalog: Option<Result<Vec<CatalogEntry>>>,
) -> Vec<TransportOption> {
    match catalog {
        None => options,
        Some(Ok(catalog)) => attach_catalog_breakdowns(options, &catalog),
        Some(Err(e)) => {
            warn!("Footprint catalog unavailable: {}", e);
            attach_catalog_breakdowns(options, &[])
        }
    }
}

/// ImpactCO2 transport endpoint client
pub struct ImpactCo2Client {
    client: ClientWithMiddleware,
    base_url: String,
    language: String,
    strategy: BreakdownStrategy,
}

impl ImpactCo2Client {
    pub fn new(
        client: ClientWithMiddleware,
        base_url: impl Into<String>,
        language: impl Into<String>,
        strategy: BreakdownStrategy,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            language: language.into(),
            strategy,
        }
    }

    async fn fetch_rows(&self, params: &[(&str, String)]) -> Result<Vec<RawTransport>> {
        let url = build_url(&self.base_url, params);
        debug!("Transport API request URL: {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(CarbonTripError::api(format!(
                "Transport API returned {}",
                response.status()
            )));
        }

        let body: TransportResponse = response.json().await?;
        body.data
            .ok_or_else(|| CarbonTripError::api("No response from transport API"))
    }

    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>> {
        let rows = self.fetch_rows(&catalog_params(&self.language)).await?;
        Ok(rows.into_iter().map(RawTransport::into_catalog_entry).collect())
    }
}

#[async_trait]
impl TransportFactorService for ImpactCo2Client {
    #[instrument(skip(self), fields(strategy = %self.strategy))]
    async fn transport_options(&self, distance_km: f64) -> Result<Vec<TransportOption>> {
        let start_time = Instant::now();
        let rows = self
            .fetch_rows(&option_params(distance_km, &self.language))
            .await?;
        let options = consolidate_carpools(rows.into_iter().map(RawTransport::into_option).collect());

        let catalog = match self.strategy {
            BreakdownStrategy::InlineDetails => None,
            BreakdownStrategy::FootprintCatalog => Some(self.fetch_catalog().await),
        };
        let options = apply_breakdowns(options, catalog);

        info!(
            "Fetched {} transport options for {:.1} km in {:.3}s",
            options.len(),
            distance_km,
            start_time.elapsed().as_secs_f64()
        );
        Ok(options)
    }
}
