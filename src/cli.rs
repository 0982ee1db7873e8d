use clap::{Arg, Command};
use mongodb::Database;
use mongodb::bson::doc;

use crate::auth::Role;
use crate::config::Settings;
use crate::db::{self, MongoConfig};
use crate::errors::is_duplicate_key;
use crate::models::Admin;

pub fn cli() -> Command {
    Command::new("community-hub").subcommand(
        Command::new("create-admin")
            .about("Create an admin account for the admin panel")
            .arg(
                Arg::new("username")
                    .long("username")
                    .help("Login name of the new admin")
                    .value_name("USERNAME")
                    .required(true),
            )
            .arg(
                Arg::new("password")
                    .long("password")
                    .help("Initial password, at least 8 characters")
                    .value_name("PASSWORD")
                    .required(true),
            ),
    )
}

pub async fn handle_cli(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("create-admin", sub_matches)) => {
            let username = sub_matches
                .get_one::<String>("username")
                .map(String::as_str)
                .unwrap_or_default();
            let password = sub_matches
                .get_one::<String>("password")
                .map(String::as_str)
                .unwrap_or_default();

            let db = create_db_connection(settings).await?;

            match create_admin(&db, username, password).await {
                Ok(admin) => {
                    println!("Admin created successfully!");
                    println!("Username: {}", admin.username);
                    println!("ID: {}", admin.oid);
                    println!("Created at: {}", admin.created_at);
                }
                Err(e) => {
                    eprintln!("Failed to create admin: {}", e);
                    std::process::exit(1);
                }
            }
        }
        _ => {
            cli().print_help()?;
        }
    }

    Ok(())
}

pub async fn create_admin(
    db: &Database,
    username: &str,
    password: &str,
) -> Result<Admin, Box<dyn std::error::Error>> {
    let admin = Admin::new(username, password).await?;
    let admins = db.collection::<Admin>(Role::Admin.collection());

    if admins
        .find_one(doc! { "username": admin.username.as_str() })
        .await?
        .is_some()
    {
        return Err(format!("an admin named '{}' already exists", admin.username).into());
    }

    if let Err(e) = admins.insert_one(&admin).await {
        if is_duplicate_key(&e) {
            return Err(format!("an admin named '{}' already exists", admin.username).into());
        }
        return Err(e.into());
    }
    Ok(admin)
}

async fn create_db_connection(settings: &Settings) -> Result<Database, Box<dyn std::error::Error>> {
    let url = settings
        .mongodb_uri
        .clone()
        .ok_or("MONGODB_URI or DATABASE_URL must be set")?;

    let mut config = MongoConfig::new(url);
    config.database = settings.mongodb_db.clone();

    Ok(db::connect(config).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_admin_requires_both_flags() {
        let result = cli().try_get_matches_from(["community-hub", "create-admin", "--username", "root"]);
        assert!(result.is_err());

        let matches = cli()
            .try_get_matches_from([
                "community-hub",
                "create-admin",
                "--username",
                "root",
                "--password",
                "long enough pw",
            ])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "create-admin");
        assert_eq!(sub.get_one::<String>("username").unwrap(), "root");
    }
}
