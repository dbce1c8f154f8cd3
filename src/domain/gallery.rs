// SPDX-License-Identifier: MPL-2.0
//! Gallery records and their query rules.

use crate::domain::media::EncodedImage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Prompt recorded for the "before" image saved alongside a batch.
pub const BASE_IMAGE_PROMPT: &str = "Base Image";

/// A saved image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryImage {
    pub id: String,
    pub image: EncodedImage,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub prompt: String,
}

impl GalleryImage {
    /// True when every whitespace-separated term of `query` occurs in the
    /// prompt, ignoring case. An empty query matches everything.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let prompt = self.prompt.to_lowercase();
        query
            .to_lowercase()
            .split_whitespace()
            .all(|term| prompt.contains(term))
    }
}

/// Gallery listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GallerySort {
    #[default]
    Newest,
    Oldest,
    /// Favourites first, each group newest first.
    FavoritesFirst,
}

impl GallerySort {
    /// Sorts `items` in place.
    pub fn apply(self, items: &mut [GalleryImage]) {
        match self {
            Self::Newest => items.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            Self::Oldest => items.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            Self::FavoritesFirst => items.sort_by(|a, b| {
                b.is_favorite
                    .cmp(&a.is_favorite)
                    .then_with(|| b.created_at.cmp(&a.created_at))
            }),
        }
    }
}

impl FromStr for GallerySort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "favorites" | "favorites_first" => Ok(Self::FavoritesFirst),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::media::ImageKind;
    use chrono::TimeZone;

    fn item(id: &str, secs: i64, favorite: bool, prompt: &str) -> GalleryImage {
        GalleryImage {
            id: id.to_string(),
            image: EncodedImage::new(vec![0], ImageKind::Png, 1, 1),
            created_at: Utc.timestamp_opt(secs, 0).single().expect("valid timestamp"),
            is_favorite: favorite,
            prompt: prompt.to_string(),
        }
    }

    #[test]
    fn every_term_must_match() {
        let image = item("a", 0, false, "A Red Fox in the Snow");
        assert!(image.matches("fox red"));
        assert!(image.matches(""));
        assert!(!image.matches("fox wolf"));
    }

    #[test]
    fn sort_orders() {
        let mut items = vec![
            item("old", 1, true, ""),
            item("mid", 2, false, ""),
            item("new", 3, false, ""),
        ];

        GallerySort::Newest.apply(&mut items);
        assert_eq!(ids(&items), ["new", "mid", "old"]);

        GallerySort::Oldest.apply(&mut items);
        assert_eq!(ids(&items), ["old", "mid", "new"]);

        GallerySort::FavoritesFirst.apply(&mut items);
        assert_eq!(ids(&items), ["old", "new", "mid"]);
    }

    fn ids(items: &[GalleryImage]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }
}
