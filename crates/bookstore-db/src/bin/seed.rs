//! # Seed Data Generator
//!
//! Populates the database with demo books for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p bookstore-db --bin seed
//!
//! # Limit the number of books
//! cargo run -p bookstore-db --bin seed -- --count 8
//!
//! # Specify database path
//! cargo run -p bookstore-db --bin seed -- --db ./data/bookstore.db
//! ```
//!
//! Each book gets a price between $9.99 and $49.99 and a stock of 10 to 100,
//! derived from its position so repeated runs produce the same catalog.

use bookstore_core::{Money, NewBook};
use bookstore_db::{Database, DbConfig};
use std::env;

/// (title, author) pairs for the demo catalog
const CATALOG: &[(&str, &str)] = &[
    ("Dune", "Frank Herbert"),
    ("The Left Hand of Darkness", "Ursula K. Le Guin"),
    ("Neuromancer", "William Gibson"),
    ("Foundation", "Isaac Asimov"),
    ("Hyperion", "Dan Simmons"),
    ("The Dispossessed", "Ursula K. Le Guin"),
    ("Snow Crash", "Neal Stephenson"),
    ("The Three-Body Problem", "Liu Cixin"),
    ("Solaris", "Stanislaw Lem"),
    ("A Wizard of Earthsea", "Ursula K. Le Guin"),
    ("The Name of the Rose", "Umberto Eco"),
    ("Invisible Cities", "Italo Calvino"),
    ("The Master and Margarita", "Mikhail Bulgakov"),
    ("One Hundred Years of Solitude", "Gabriel Garcia Marquez"),
    ("The Remains of the Day", "Kazuo Ishiguro"),
    ("Beloved", "Toni Morrison"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = CATALOG.len();
    let mut db_path = String::from("./bookstore.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(CATALOG.len());
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Bookstore Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!(
                    "  -c, --count <N>    Number of books to insert (default: {})",
                    CATALOG.len()
                );
                println!("  -d, --db <PATH>    Database file path (default: ./bookstore.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Bookstore Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Books:    {}", count.min(CATALOG.len()));
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.books().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} books", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    let mut inserted = 0;
    for (idx, (title, author)) in CATALOG.iter().take(count).enumerate() {
        let book = demo_book(idx, title, author);
        match db.books().insert(&book).await {
            Ok(stored) => {
                inserted += 1;
                println!(
                    "  #{:<3} {:<32} {:>8}  stock {}",
                    stored.id,
                    stored.title,
                    stored.price().to_string(),
                    stored.stock
                );
            }
            Err(e) => eprintln!("Failed to insert {}: {}", title, e),
        }
    }

    let first_page = db.books().page(1).await?;
    println!();
    println!(
        "✓ Inserted {} books ({} catalog pages)",
        inserted, first_page.total_pages
    );

    Ok(())
}

fn demo_book(idx: usize, title: &str, author: &str) -> NewBook {
    let seed = idx as i64;
    // $9.99 - $49.99 in whole-dollar steps
    let price = Money::from_major_minor(9 + (seed * 7) % 41, 99);

    NewBook {
        title: title.to_string(),
        author: author.to_string(),
        price_cents: price.cents(),
        stock: 10 + (seed * 13) % 91,
        sales: 0,
        image_path: format!("/static/img/book-{:02}.jpg", idx + 1),
    }
}
