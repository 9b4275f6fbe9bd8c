use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
    #[error("selection not found: {0}")]
    SelectionNotFound(String),
}

/// A single searchable title (movie or series) as returned by the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(alias = "friendly_name")]
    pub name: String,
    pub is_series: bool,
    #[serde(default)]
    pub seasons: Vec<Season>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Season {
    pub number: u32,
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Episode {
    pub number: u32,
    pub id: String,
}

/// The normalized (movie, episode) identifier pair used to request a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionTarget {
    pub movie_id: String,
    pub episode_id: Option<String>,
    pub season_number: Option<u32>,
}

impl CatalogEntry {
    /// Label for pick-lists, e.g. "Alpha" or "Alpha (3 seasons)"
    pub fn display_label(&self) -> String {
        if self.is_series {
            let n = self.seasons.len();
            let word = if n == 1 { "season" } else { "seasons" };
            format!("{} ({} {})", self.name, n, word)
        } else {
            self.name.clone()
        }
    }

    /// Resolve a (season, episode) selection against this entry.
    ///
    /// Movies ignore both arguments. Series require both, and lookups key on
    /// the declared season/episode numbers, never on list position, so gaps
    /// in the numbering (seasons 1, 3, 4) behave correctly.
    pub fn resolve(
        &self,
        season_number: Option<u32>,
        episode_number: Option<u32>,
    ) -> Result<ResolutionTarget, ResolveError> {
        if !self.is_series {
            return Ok(ResolutionTarget {
                movie_id: self.id.clone(),
                episode_id: None,
                season_number: None,
            });
        }

        let season_number = season_number.ok_or_else(|| {
            ResolveError::SelectionNotFound(format!("\"{}\" is a series, season required", self.name))
        })?;
        let episode_number = episode_number.ok_or_else(|| {
            ResolveError::SelectionNotFound(format!("\"{}\" is a series, episode required", self.name))
        })?;

        let season = self
            .seasons
            .iter()
            .find(|s| s.number == season_number)
            .ok_or_else(|| {
                ResolveError::SelectionNotFound(format!(
                    "\"{}\" has no season {}",
                    self.name, season_number
                ))
            })?;

        let episode = season
            .episodes
            .iter()
            .find(|e| e.number == episode_number)
            .ok_or_else(|| {
                ResolveError::SelectionNotFound(format!(
                    "\"{}\" season {} has no episode {}",
                    self.name, season_number, episode_number
                ))
            })?;

        Ok(ResolutionTarget {
            movie_id: self.id.clone(),
            episode_id: Some(episode.id.clone()),
            season_number: Some(season_number),
        })
    }
}
