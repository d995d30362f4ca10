//! Basic usage example for activerow
//!
//! Run with: cargo run --example basic -p activerow
//!
//! Uses an in-memory SQLite database, so no server is needed.

use activerow::backend::sqlite::SqliteConnection;
use activerow::prelude::*;

#[derive(Debug, Clone, Default, Entity)]
#[orm(table = "users", ignore = "created_at")]
#[orm(fields(username = String, email = Option<String>, score = i64))]
struct User {
    record: Record,
}

#[derive(Debug, FromRow)]
struct DomainCount {
    domain: String,
    users: i64,
}

#[tokio::main]
async fn main() -> Result<(), OrmError> {
    let conn = SqliteConnection::open_in_memory()?;
    conn.execute_batch(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL,
            email TEXT,
            score INTEGER DEFAULT 0,
            created_at TEXT DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .await?;

    let registry = ConnectionRegistry::new();
    registry.set_connection(DEFAULT_CONNECTION, conn.clone())?;

    // ============================================
    // Insert
    // ============================================
    println!("=== Insert ===");

    for (name, email, score) in [
        ("alice", Some("alice@example.com"), 42),
        ("bob", Some("bob@example.org"), 7),
        ("carol", None, 19),
    ] {
        let mut user = User::create();
        user.set_username(name)
            .set_email(email.map(str::to_string))
            .set_score(score);
        user.save(&registry).await?;
        println!("saved {} with id {}", name, user.get("id"));
    }

    // ============================================
    // Query builder
    // ============================================
    println!("\n=== Query builder ===");

    let mut qb = User::query(&registry)?;
    qb.where_not_null("email").order_by_desc("score");
    for user in qb.find_all().await? {
        println!("{}", user.to_json());
    }
    println!("with email: {}", qb.count().await?);

    // ============================================
    // Update and delete
    // ============================================
    println!("\n=== Update / delete ===");

    if let Some(mut bob) = User::find(&registry, [2]).await? {
        bob.set_score(bob.score()?.unwrap_or_default() + 100);
        bob.save(&registry).await?;
        println!("bob now has {:?}", bob.score()?);
        println!("deleted: {}", bob.delete(&registry).await?);
    }

    // ============================================
    // Raw SQL into an ad-hoc shape
    // ============================================
    println!("\n=== Raw SQL ===");

    let mut q: Query<DomainCount> = Query::with_sql(
        Database::new(conn)?,
        "SELECT substr(email, instr(email, '@') + 1) AS domain, COUNT(*) AS users
         FROM users WHERE email IS NOT NULL GROUP BY domain",
    );
    for row in q.find_all().await? {
        println!("{}: {}", row.domain, row.users);
    }

    Ok(())
}
