use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub name: String,
    pub score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalRankings {
    pub rankings: Vec<ScoreEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryRanking {
    pub category: String,
    pub total_score: f64,
    pub avg_score: f64,
    pub max_score: f64,
    pub count: usize,
    pub engaged_count: usize,
}

/// Content type to ranked categories, serialized as a map in processing order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CategoryRankingDocument {
    pub entries: Vec<(String, Vec<CategoryRanking>)>,
}

impl CategoryRankingDocument {
    pub fn get(&self, content_type: &str) -> Option<&[CategoryRanking]> {
        self.entries
            .iter()
            .find(|(name, _)| name == content_type)
            .map(|(_, rankings)| rankings.as_slice())
    }
}

impl Serialize for CategoryRankingDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (content_type, rankings) in &self.entries {
            map.serialize_entry(content_type, rankings)?;
        }
        map.end()
    }
}
