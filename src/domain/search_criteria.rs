use url::Url;

use crate::error::{PositioningError, Result};

/// Map viewport used instead of (or alongside) a place id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapBounds {
    pub ne_lat: f64,
    pub ne_lng: f64,
    pub sw_lat: f64,
    pub sw_lng: f64,
}

/// What to search for. The probe supplies the dates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchCriteria {
    pub place_id: Option<String>,
    pub query: Option<String>,
    pub bounds: Option<MapBounds>,
    pub adults: Option<u32>,
}

impl SearchCriteria {
    /// Extract criteria from an Airbnb search URL such as
    /// `https://www.airbnb.com/s/Dubai/homes?place_id=ChIJ...&query=Dubai`.
    pub fn from_search_url(raw: &str) -> Result<Self> {
        let url = Url::parse(raw.trim())?;
        let param = |name: &str| {
            url.query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let coord = |name: &str| param(name).and_then(|v| v.parse::<f64>().ok());

        let bounds = match (
            coord("ne_lat"),
            coord("ne_lng"),
            coord("sw_lat"),
            coord("sw_lng"),
        ) {
            (Some(ne_lat), Some(ne_lng), Some(sw_lat), Some(sw_lng)) => Some(MapBounds {
                ne_lat,
                ne_lng,
                sw_lat,
                sw_lng,
            }),
            _ => None,
        };

        let criteria = Self {
            place_id: param("place_id"),
            query: param("query"),
            bounds,
            adults: param("adults").and_then(|v| v.parse().ok()),
        };
        criteria.validate()?;
        Ok(criteria)
    }

    pub fn validate(&self) -> Result<()> {
        let has_place = self.place_id.as_deref().is_some_and(|p| !p.trim().is_empty());
        let has_query = self.query.as_deref().is_some_and(|q| !q.trim().is_empty());
        if !has_place && !has_query && self.bounds.is_none() {
            return Err(PositioningError::InvalidParams {
                reason: "search needs a place_id, a query or map bounds".into(),
            });
        }

        if let Some(b) = self.bounds
            && (b.ne_lat < b.sw_lat
                || !(-90.0..=90.0).contains(&b.ne_lat)
                || !(-90.0..=90.0).contains(&b.sw_lat))
        {
            return Err(PositioningError::InvalidParams {
                reason: "map bounds latitudes are out of order or out of range".into(),
            });
        }

        if self.adults == Some(0) {
            return Err(PositioningError::InvalidParams {
                reason: "adults must be at least 1".into(),
            });
        }

        Ok(())
    }
}

impl std::fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref place_id) = self.place_id {
            parts.push(format!("place_id={place_id}"));
        }
        if let Some(ref query) = self.query {
            parts.push(format!("query={query}"));
        }
        if let Some(b) = self.bounds {
            parts.push(format!(
                "bounds=[{},{} / {},{}]",
                b.sw_lat, b.sw_lng, b.ne_lat, b.ne_lng
            ));
        }
        if let Some(adults) = self.adults {
            parts.push(format!("adults={adults}"));
        }
        write!(f, "{}", parts.join(" "))
    }
}
