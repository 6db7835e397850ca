//! Inventory manager

use quorum_repo::{Entity, KeyRange, Repository, StorageClient};
use quorum_storage::{IndexSchema, StoreSchema};
use std::collections::BTreeMap;

use crate::error::InventoryError;
use crate::item::{normalize_category, Item, BY_CATEGORY};
use crate::Result;

pub fn stores() -> Vec<StoreSchema> {
    vec![StoreSchema::new(Item::STORE, "id")
        .auto_increment()
        .index(IndexSchema::new(BY_CATEGORY, "category"))]
}

pub struct Inventory {
    items: Repository<Item>,
}

impl Inventory {
    pub fn new(client: StorageClient) -> Self {
        Self {
            items: Repository::new(client),
        }
    }

    pub fn items(&self) -> &Repository<Item> {
        &self.items
    }

    pub async fn add_item(&self, item: Item) -> Result<Item> {
        let item = self.items.create(Item { id: None, ..item }).await?;

        tracing::info!(
            item_id = item.id.unwrap_or_default(),
            name = %item.name,
            "Added item"
        );

        Ok(item)
    }

    pub async fn get_item(&self, id: i64) -> Result<Item> {
        self.items
            .get_by_id(id)
            .await?
            .ok_or(InventoryError::NotFound(id))
    }

    pub async fn update_item(&self, item: Item) -> Result<Item> {
        let id = item.id.ok_or(InventoryError::Unsaved)?;
        let item = Item {
            category: normalize_category(&item.category),
            ..item
        };
        self.items.update(item).await.map_err(|e| match e {
            quorum_repo::RepositoryError::NotFound { .. } => InventoryError::NotFound(id),
            other => other.into(),
        })
    }

    pub async fn set_quantity(&self, id: i64, quantity: u32) -> Result<Item> {
        let mut item = self.get_item(id).await?;
        item.quantity = quantity;
        Ok(self.items.update(item).await?)
    }

    pub async fn remove_item(&self, id: i64) -> Result<()> {
        self.items.delete(id).await?;
        tracing::info!(item_id = id, "Removed item");
        Ok(())
    }

    pub async fn list_items(&self) -> Result<Vec<Item>> {
        Ok(self.items.get_all().await?)
    }

    pub async fn items_in(&self, category: &str) -> Result<Vec<Item>> {
        Ok(self
            .items
            .get_by_index(BY_CATEGORY, normalize_category(category))
            .await?)
    }

    /// Items whose category starts with `prefix`, so "kitchen" also finds
    /// "kitchen/drawer".
    pub async fn items_under(&self, prefix: &str) -> Result<Vec<Item>> {
        let prefix = normalize_category(prefix);
        let upper = format!("{prefix}{}", char::MAX);
        Ok(self
            .items
            .get_by_range(BY_CATEGORY, KeyRange::bound(prefix, upper, false, true))
            .await?)
    }

    /// Total quantity per category.
    pub async fn category_totals(&self) -> Result<BTreeMap<String, u64>> {
        let mut totals = BTreeMap::new();
        for item in self.items.get_all().await? {
            *totals.entry(item.category).or_insert(0) += u64::from(item.quantity);
        }
        Ok(totals)
    }
}

impl Clone for Inventory {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorum_storage::DatabaseSchema;

    fn inventory() -> Inventory {
        let schema = DatabaseSchema::new("inventory-test", 1).stores(stores());
        Inventory::new(StorageClient::in_memory(schema))
    }

    #[tokio::test]
    async fn test_inventory_manager() {
        let inventory = inventory();

        let drill = inventory.add_item(Item::new("Drill", "Tools", 1)).await.unwrap();
        let saw = inventory.add_item(Item::new("Saw", "tools", 2)).await.unwrap();
        let rice = inventory.add_item(Item::new("Rice", "Pantry", 4)).await.unwrap();
        assert_eq!((drill.id, saw.id, rice.id), (Some(1), Some(2), Some(3)));

        let tools = inventory.items_in("TOOLS").await.unwrap();
        assert_eq!(tools.len(), 2);

        let updated = inventory.set_quantity(3, 10).await.unwrap();
        assert_eq!(updated.quantity, 10);

        let totals = inventory.category_totals().await.unwrap();
        assert_eq!(totals.get("tools"), Some(&3));
        assert_eq!(totals.get("pantry"), Some(&10));
    }

    #[tokio::test]
    async fn test_items_under_category_prefix() {
        let inventory = inventory();
        inventory.add_item(Item::new("Spoon", "Kitchen/Drawer", 6)).await.unwrap();
        inventory.add_item(Item::new("Pan", "kitchen", 1)).await.unwrap();
        inventory.add_item(Item::new("Kite", "kit", 1)).await.unwrap();
        inventory.add_item(Item::new("Hammer", "tools", 1)).await.unwrap();

        let kitchen = inventory.items_under(" KITCHEN ").await.unwrap();
        let names: Vec<_> = kitchen.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Pan", "Spoon"]);

        assert_eq!(inventory.items_under("kit").await.unwrap().len(), 3);
        assert!(inventory.items_under("garden").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_removed_keys_are_not_reused() {
        let inventory = inventory();
        let first = inventory.add_item(Item::new("Lamp", "home", 1)).await.unwrap();
        inventory.remove_item(first.id.unwrap()).await.unwrap();

        let second = inventory.add_item(Item::new("Rug", "home", 1)).await.unwrap();
        assert_eq!(second.id, Some(2));
        assert!(matches!(
            inventory.get_item(1).await,
            Err(InventoryError::NotFound(1))
        ));
    }

    #[tokio::test]
    async fn test_update_requires_saved_item() {
        let inventory = inventory();
        let err = inventory
            .update_item(Item::new("Ghost", "home", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Unsaved));

        let mut ghost = Item::new("Ghost", "home", 1);
        ghost.id = Some(99);
        let err = inventory.update_item(ghost).await.unwrap_err();
        assert!(matches!(err, InventoryError::NotFound(99)));
    }
}
