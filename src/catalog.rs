//! # Resource catalog
//!
//! A single document holding categorized learning-resource links. The first
//! read seeds it from [`ResourceCatalog::defaults`]; the public view only
//! exposes active categories and items, each sorted by `order`.

use chrono::{DateTime, Utc};
use mongodb::Database;
use mongodb::bson::{doc, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::errors::{ApiError, ApiResult};
use crate::validation::Required;

pub const COLLECTION: &str = "resources";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ResourceCatalog {
    #[serde(rename = "_id")]
    pub oid: ObjectId,
    pub categories: Vec<ResourceCategory>,
    #[serde(with = "crate::models::millis")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceCategory {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(default)]
    pub items: Vec<ResourceItem>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceItem {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CatalogUpdate {
    pub categories: Option<Vec<ResourceCategory>>,
}

impl ResourceCatalog {
    /// Active categories sorted by `order`, each holding only its active
    /// items, also sorted by `order`. Sorting is stable, so ties keep their
    /// stored order.
    pub fn published(&self) -> Vec<ResourceCategory> {
        let mut categories: Vec<ResourceCategory> = self
            .categories
            .iter()
            .filter(|category| category.is_active)
            .map(|category| {
                let mut items: Vec<ResourceItem> = category
                    .items
                    .iter()
                    .filter(|item| item.is_active)
                    .cloned()
                    .collect();
                items.sort_by_key(|item| item.order);

                ResourceCategory {
                    items,
                    ..category.clone()
                }
            })
            .collect();

        categories.sort_by_key(|category| category.order);
        categories
    }

    pub fn defaults() -> Self {
        Self {
            oid: ObjectId::new(),
            categories: default_categories(),
            updated_at: Utc::now(),
            updated_by: None,
        }
    }
}

impl CatalogUpdate {
    pub fn into_categories(self) -> ApiResult<Vec<ResourceCategory>> {
        Required::new()
            .field("categories", &self.categories)
            .check()?;

        let categories = self.categories.unwrap_or_default();
        let mut seen = std::collections::HashSet::new();

        for category in &categories {
            if category.id.trim().is_empty() || category.title.trim().is_empty() {
                return Err(ApiError::Validation(
                    "Every category needs an id and a title".into(),
                ));
            }
            if !seen.insert(category.id.as_str()) {
                return Err(ApiError::Validation(format!(
                    "Duplicate category id: {}",
                    category.id
                )));
            }
            if category
                .items
                .iter()
                .any(|item| item.title.trim().is_empty() || item.url.trim().is_empty())
            {
                return Err(ApiError::Validation(format!(
                    "Every item in {} needs a title and a url",
                    category.id
                )));
            }
        }

        Ok(categories)
    }
}

/// Loads the catalog, inserting the defaults when none exists yet.
///
/// Two concurrent first reads can both insert; the later document is ignored
/// by `find_one` ordering and does no harm.
pub async fn load_or_seed(db: &Database) -> ApiResult<ResourceCatalog> {
    let collection = db.collection::<ResourceCatalog>(COLLECTION);

    if let Some(catalog) = collection
        .find_one(doc! {})
        .sort(doc! { "_id": 1 })
        .await?
    {
        return Ok(catalog);
    }

    let catalog = ResourceCatalog::defaults();
    collection.insert_one(&catalog).await?;
    tracing::info!(
        categories = catalog.categories.len(),
        "seeded resource catalog with defaults"
    );

    Ok(catalog)
}

pub async fn replace(
    db: &Database,
    categories: Vec<ResourceCategory>,
    admin: &str,
) -> ApiResult<ResourceCatalog> {
    let mut catalog = load_or_seed(db).await?;
    catalog.categories = categories;
    catalog.updated_at = Utc::now();
    catalog.updated_by = Some(admin.to_string());

    db.collection::<ResourceCatalog>(COLLECTION)
        .replace_one(doc! { "_id": catalog.oid }, &catalog)
        .await?;

    Ok(catalog)
}

fn item(order: i32, title: &str, url: &str, description: &str) -> ResourceItem {
    ResourceItem {
        title: title.to_string(),
        url: url.to_string(),
        description: Some(description.to_string()),
        order,
        is_active: true,
    }
}

fn category(
    order: i32,
    id: &str,
    title: &str,
    description: &str,
    items: Vec<ResourceItem>,
) -> ResourceCategory {
    ResourceCategory {
        id: id.to_string(),
        title: title.to_string(),
        description: Some(description.to_string()),
        order,
        is_active: true,
        items,
    }
}

fn default_categories() -> Vec<ResourceCategory> {
    vec![
        category(
            1,
            "web-development",
            "Web Development",
            "Front-end and back-end fundamentals",
            vec![
                item(1, "MDN Web Docs", "https://developer.mozilla.org", "Reference for HTML, CSS and JavaScript"),
                item(2, "The Odin Project", "https://www.theodinproject.com", "Full-stack curriculum"),
                item(3, "web.dev", "https://web.dev/learn", "Guided courses on modern web platform features"),
            ],
        ),
        category(
            2,
            "dsa",
            "Data Structures & Algorithms",
            "Problem solving and interview preparation",
            vec![
                item(1, "NeetCode Roadmap", "https://neetcode.io/roadmap", "Curated problem sets by topic"),
                item(2, "CP-Algorithms", "https://cp-algorithms.com", "Algorithm explanations with implementations"),
                item(3, "VisuAlgo", "https://visualgo.net", "Animated data structures"),
            ],
        ),
        category(
            3,
            "open-source",
            "Open Source",
            "Getting started with contributions",
            vec![
                item(1, "First Contributions", "https://firstcontributions.github.io", "Make a first pull request"),
                item(2, "Open Source Guides", "https://opensource.guide", "How projects are run and how to help"),
                item(3, "Good First Issue", "https://goodfirstissue.dev", "Beginner-friendly issues"),
            ],
        ),
        category(
            4,
            "machine-learning",
            "Machine Learning",
            "Foundations and practical courses",
            vec![
                item(1, "fast.ai", "https://course.fast.ai", "Practical deep learning"),
                item(2, "Kaggle Learn", "https://www.kaggle.com/learn", "Short hands-on courses"),
            ],
        ),
        category(
            5,
            "systems",
            "Systems & DevOps",
            "Linux, networking and deployment",
            vec![
                item(1, "The Rust Book", "https://doc.rust-lang.org/book", "Systems programming in Rust"),
                item(2, "Missing Semester", "https://missing.csail.mit.edu", "Shell, git and tooling"),
                item(3, "Docker Docs", "https://docs.docker.com/get-started", "Containers from scratch"),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(categories: Vec<ResourceCategory>) -> ResourceCatalog {
        ResourceCatalog {
            oid: ObjectId::new(),
            categories,
            updated_at: Utc::now(),
            updated_by: None,
        }
    }

    #[test]
    fn published_sorts_and_filters() {
        let mut hidden_item = item(0, "Hidden", "https://hidden.example", "");
        hidden_item.is_active = false;

        let mut hidden_category = category(0, "hidden", "Hidden", "", vec![]);
        hidden_category.is_active = false;

        let catalog = catalog(vec![
            category(
                3,
                "c",
                "Third",
                "",
                vec![
                    item(2, "b", "https://b.example", ""),
                    hidden_item,
                    item(1, "a", "https://a.example", ""),
                ],
            ),
            hidden_category,
            category(1, "a", "First", "", vec![]),
            category(2, "b", "Second", "", vec![]),
        ]);

        let published = catalog.published();
        let ids: Vec<_> = published.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let titles: Vec<_> = published[2].items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b"]);
    }

    #[test]
    fn published_leaves_the_stored_catalog_untouched() {
        let mut inactive = item(1, "x", "https://x.example", "");
        inactive.is_active = false;
        let catalog = catalog(vec![category(1, "a", "A", "", vec![inactive])]);

        assert!(catalog.published()[0].items.is_empty());
        assert_eq!(catalog.categories[0].items.len(), 1);
    }

    #[test]
    fn defaults_are_well_formed() {
        let defaults = ResourceCatalog::defaults();
        let update = CatalogUpdate {
            categories: Some(defaults.categories.clone()),
        };
        assert_eq!(update.into_categories().unwrap().len(), defaults.categories.len());
        assert_eq!(defaults.published().len(), defaults.categories.len());
    }

    #[test]
    fn update_rejects_duplicate_ids() {
        let update = CatalogUpdate {
            categories: Some(vec![
                category(1, "dup", "One", "", vec![]),
                category(2, "dup", "Two", "", vec![]),
            ]),
        };
        let err = update.into_categories().unwrap_err();
        assert_eq!(err.to_string(), "Duplicate category id: dup");
    }

    #[test]
    fn update_rejects_items_without_url() {
        let update = CatalogUpdate {
            categories: Some(vec![category(
                1,
                "web",
                "Web",
                "",
                vec![item(1, "No link", " ", "")],
            )]),
        };
        assert!(update.into_categories().is_err());
    }

    #[test]
    fn stored_categories_default_to_active() {
        let category: ResourceCategory = serde_json::from_value(serde_json::json!({
            "id": "web",
            "title": "Web",
            "items": [{ "title": "MDN", "url": "https://developer.mozilla.org" }]
        }))
        .unwrap();

        assert!(category.is_active);
        assert!(category.items[0].is_active);
        assert_eq!(category.order, 0);
    }
}
