use serde::{Deserialize, Deserializer, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the metadata document. Row order matches the vector file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub id: ItemId,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "string_or_null")]
    pub category: String,
    #[serde(default, deserialize_with = "joined_tags")]
    pub topic_tags: String,
}

impl ItemMetadata {
    /// Individual tag tokens, trimmed, empty tokens dropped.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.topic_tags.split(',').map(str::trim).filter(|tag| !tag.is_empty())
    }

    pub fn category(&self) -> Option<&str> {
        let category = self.category.trim();
        (!category.is_empty()).then_some(category)
    }
}

/// Companion document of the binary vector file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub dimensions: usize,
    pub count: usize,
    pub items: Vec<ItemMetadata>,
}

/// A metadata row paired with its vector.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddingRecord {
    pub metadata: ItemMetadata,
    pub embedding: Vec<f32>,
}

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagField {
    Joined(String),
    List(Vec<String>),
}

fn joined_tags<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<TagField>::deserialize(deserializer)? {
        None => String::new(),
        Some(TagField::Joined(joined)) => joined,
        Some(TagField::List(tags)) => tags.join(","),
    })
}
