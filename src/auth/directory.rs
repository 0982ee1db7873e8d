use mongodb::Database;
use mongodb::bson::{Document, doc, oid::ObjectId};
use serde::Deserialize;

use super::Role;
use crate::errors::ApiResult;
use crate::models::timestamp;

/// The fields a login needs from any account document.
#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub id: ObjectId,
    pub name: String,
    /// `None` when the stored document carries no password.
    pub password_hash: Option<String>,
    pub is_active: bool,
}

/// Account lookup used by [`super::SessionService::issue`].
#[rocket::async_trait]
pub trait AccountDirectory: Send + Sync {
    /// `identifier` is already normalized for the role.
    async fn find_account(&self, role: Role, identifier: &str) -> ApiResult<Option<AccountRecord>>;

    async fn record_login(&self, _role: Role, _id: ObjectId) -> ApiResult<()> {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredAccount {
    #[serde(rename = "_id")]
    oid: ObjectId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default = "active_by_default")]
    is_active: bool,
}

fn active_by_default() -> bool {
    true
}

impl From<StoredAccount> for AccountRecord {
    fn from(stored: StoredAccount) -> Self {
        let name = stored
            .name
            .or(stored.username)
            .or(stored.email)
            .unwrap_or_default();

        AccountRecord {
            id: stored.oid,
            name,
            password_hash: stored.password,
            is_active: stored.is_active,
        }
    }
}

/// Looks accounts up in the role's own collection.
pub struct MongoDirectory {
    db: Database,
}

impl MongoDirectory {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }
}

#[rocket::async_trait]
impl AccountDirectory for MongoDirectory {
    async fn find_account(&self, role: Role, identifier: &str) -> ApiResult<Option<AccountRecord>> {
        let mut filter = Document::new();
        filter.insert(role.identifier_field(), identifier);

        let account = self
            .db
            .collection::<StoredAccount>(role.collection())
            .find_one(filter)
            .await?;

        Ok(account.map(AccountRecord::from))
    }

    async fn record_login(&self, role: Role, id: ObjectId) -> ApiResult<()> {
        self.db
            .collection::<Document>(role.collection())
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "lastLoginAt": timestamp() } },
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_documents_use_username_as_name() {
        let stored: StoredAccount = mongodb::bson::from_document(doc! {
            "_id": ObjectId::new(),
            "username": "root",
            "password": "$2b$12$hash",
        })
        .unwrap();

        let record = AccountRecord::from(stored);
        assert_eq!(record.name, "root");
        assert!(record.is_active);
    }

    #[test]
    fn account_without_password_still_loads() {
        let stored: StoredAccount = mongodb::bson::from_document(doc! {
            "_id": ObjectId::new(),
            "email": "legacy@example.com",
        })
        .unwrap();

        let record = AccountRecord::from(stored);
        assert_eq!(record.name, "legacy@example.com");
        assert!(record.password_hash.is_none());
    }

    #[test]
    fn deactivated_flag_is_read() {
        let stored: StoredAccount = mongodb::bson::from_document(doc! {
            "_id": ObjectId::new(),
            "name": "Ada",
            "email": "ada@example.com",
            "password": "$2b$12$hash",
            "isActive": false,
        })
        .unwrap();

        let record = AccountRecord::from(stored);
        assert_eq!(record.name, "Ada");
        assert!(!record.is_active);
    }
}
