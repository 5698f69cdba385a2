use std::env;
use std::sync::Arc;

use anyhow::{bail, Context};
use db_pool::{create_pool, DbConfig};
use posts_service::db::{run_migrations, PgStore};
use posts_service::services::AccountService;

fn usage() {
    eprintln!("Usage:");
    eprintln!("  yatube-admin create-group <title> <slug> [description]");
    eprintln!("  yatube-admin create-user <username> <password>");
    eprintln!();
    eprintln!("DATABASE_URL selects the database.");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage();
        std::process::exit(1);
    }

    let config = DbConfig::from_env("yatube-admin", "postgres://localhost/yatube")
        .map_err(anyhow::Error::msg)?;
    let connect = || async {
        let pool = create_pool(&config)
            .await
            .context("failed to connect to DATABASE_URL")?;
        run_migrations(&pool).await?;
        anyhow::Ok(AccountService::new(Arc::new(PgStore::new(pool))))
    };

    match args[1].as_str() {
        "create-group" if args.len() == 4 || args.len() == 5 => {
            let description = args.get(4).map(String::as_str).unwrap_or("");
            let group = connect()
                .await?
                .create_group(&args[2], &args[3], description)
                .await?;
            println!("Created group {} ({}) with id {}", group.title, group.slug, group.id);
        }
        "create-user" if args.len() == 4 => {
            if args[3].len() < 8 {
                bail!("password must be at least 8 characters");
            }
            let user = connect().await?.create_user(&args[2], &args[3]).await?;
            println!("Created user {} with id {}", user.username, user.id);
        }
        _ => {
            eprintln!("Invalid arguments");
            usage();
            std::process::exit(1);
        }
    }

    Ok(())
}
