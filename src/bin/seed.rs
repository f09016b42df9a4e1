//! Wipes and repopulates the catalog tables with the static demo data set.

use time::OffsetDateTime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use fakestore_api::domain::category::slugify;
use fakestore_api::domain::product::Rating;
use fakestore_api::infra::db;

struct SeedCategory {
    name: &'static str,
    description: &'static str,
}

struct SeedProduct {
    title: &'static str,
    price: f64,
    description: &'static str,
    category: &'static str,
    image: &'static str,
    rating_total: i64,
    rating_sum: f64,
}

const CATEGORIES: &[SeedCategory] = &[
    SeedCategory {
        name: "Computer Accessories",
        description: "Peripherals and computer accessories",
    },
    SeedCategory {
        name: "Clothing",
        description: "Clothes and apparel",
    },
    SeedCategory {
        name: "Books",
        description: "Books across genres",
    },
    SeedCategory {
        name: "Comics",
        description: "Comics and graphic novels",
    },
    SeedCategory {
        name: "Collectibles",
        description: "Collectible items and action figures",
    },
    SeedCategory {
        name: "Sports",
        description: "Sports gear and accessories",
    },
];

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        title: "Gamer Headset",
        price: 299.9,
        description: "Gaming headset with 7.1 surround sound and a noise-cancelling microphone.",
        category: "Computer Accessories",
        image: "https://images.fakestore.dev/products/headset.jpg",
        rating_total: 89,
        rating_sum: 400.5,
    },
    SeedProduct {
        title: "Blue T-Shirt",
        price: 39.99,
        description: "Basic blue t-shirt, 100% cotton, comfortable and versatile.",
        category: "Clothing",
        image: "https://images.fakestore.dev/products/blue-tshirt.jpg",
        rating_total: 156,
        rating_sum: 655.2,
    },
    SeedProduct {
        title: "The Lord of the Rings Box Trilogy",
        price: 119.5,
        description: "Complete box set of J.R.R. Tolkien's The Lord of the Rings trilogy.",
        category: "Books",
        image: "https://images.fakestore.dev/products/lotr-box.jpg",
        rating_total: 342,
        rating_sum: 1710.0,
    },
    SeedProduct {
        title: "The Hobbit",
        price: 49.9,
        description: "Bilbo Baggins' epic adventure, J.R.R. Tolkien's classic.",
        category: "Books",
        image: "https://images.fakestore.dev/products/hobbit.jpg",
        rating_total: 567,
        rating_sum: 2778.3,
    },
    SeedProduct {
        title: "Batman: Year One",
        price: 69.9,
        description: "Batman's origin story by Frank Miller and David Mazzucchelli.",
        category: "Comics",
        image: "https://images.fakestore.dev/products/batman-year-one.jpg",
        rating_total: 234,
        rating_sum: 1123.2,
    },
    SeedProduct {
        title: "Batman: The Long Halloween - Definitive Edition",
        price: 129.9,
        description: "DC Comics classic by Jeph Loeb and Tim Sale.",
        category: "Comics",
        image: "https://images.fakestore.dev/products/long-halloween.jpg",
        rating_total: 189,
        rating_sum: 926.1,
    },
    SeedProduct {
        title: "Sandman Vol. 1: Preludes and Nocturnes",
        price: 199.9,
        description: "The first graphic novel in Neil Gaiman's Sandman series.",
        category: "Comics",
        image: "https://images.fakestore.dev/products/sandman-1.jpg",
        rating_total: 456,
        rating_sum: 2280.0,
    },
    SeedProduct {
        title: "Spider-Man: Blue",
        price: 99.9,
        description: "Limited mini-series about Spider-Man's early days.",
        category: "Comics",
        image: "https://images.fakestore.dev/products/spiderman-blue.jpg",
        rating_total: 123,
        rating_sum: 578.1,
    },
    SeedProduct {
        title: "Strange Case of Dr Jekyll and Mr Hyde",
        price: 12.9,
        description: "Robert Louis Stevenson's horror classic.",
        category: "Books",
        image: "https://images.fakestore.dev/products/jekyll-hyde.jpg",
        rating_total: 678,
        rating_sum: 3119.0,
    },
    SeedProduct {
        title: "X-Men: The Executioner's Song",
        price: 129.9,
        description: "Classic X-Men saga by Chris Claremont.",
        category: "Comics",
        image: "https://images.fakestore.dev/products/xmen-song.jpg",
        rating_total: 201,
        rating_sum: 964.8,
    },
    SeedProduct {
        title: "RGB Mechanical Gaming Keyboard",
        price: 459.0,
        description: "Mechanical keyboard with mechanical switches and customizable RGB lighting.",
        category: "Computer Accessories",
        image: "https://images.fakestore.dev/products/keyboard.jpg",
        rating_total: 312,
        rating_sum: 1435.2,
    },
    SeedProduct {
        title: "Gaming Mouse",
        price: 199.9,
        description: "High-precision gaming mouse with an optical sensor and RGB lighting.",
        category: "Computer Accessories",
        image: "https://images.fakestore.dev/products/mouse.jpg",
        rating_total: 267,
        rating_sum: 1174.8,
    },
    SeedProduct {
        title: "The Batman Action Figure",
        price: 249.9,
        description: "Collectible Batman action figure with articulation and accessories.",
        category: "Collectibles",
        image: "https://images.fakestore.dev/products/batman-figure.jpg",
        rating_total: 145,
        rating_sum: 681.5,
    },
    SeedProduct {
        title: "Ergonomic Gaming Chair",
        price: 599.0,
        description: "Gaming chair with an ergonomic design, height and tilt adjustment.",
        category: "Computer Accessories",
        image: "https://images.fakestore.dev/products/chair.jpg",
        rating_total: 198,
        rating_sum: 891.0,
    },
    SeedProduct {
        title: "Football Boots",
        price: 140.0,
        description: "Field boots with an ergonomic design and durable materials.",
        category: "Sports",
        image: "https://images.fakestore.dev/products/boots.jpg",
        rating_total: 89,
        rating_sum: 400.5,
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = db::connect().await?;
    db::run_migrations(&pool).await?;

    sqlx::query("DELETE FROM products").execute(&pool).await?;
    sqlx::query("DELETE FROM categories").execute(&pool).await?;
    tracing::info!("catalog tables cleared");

    let now = OffsetDateTime::now_utc();
    for category in CATEGORIES {
        sqlx::query(
            "INSERT INTO categories (id, name, slug, description, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $5)",
        )
        .bind(Uuid::new_v4())
        .bind(category.name)
        .bind(slugify(category.name))
        .bind(category.description)
        .bind(now)
        .execute(&pool)
        .await?;
    }
    tracing::info!(count = CATEGORIES.len(), "categories seeded");

    for product in PRODUCTS {
        let avg = Rating::average(product.rating_total, product.rating_sum);
        sqlx::query(
            "INSERT INTO products (id, title, price, description, image, category,
                                   rating_total, rating_sum, rating_avg, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)",
        )
        .bind(Uuid::new_v4())
        .bind(product.title)
        .bind(product.price)
        .bind(product.description)
        .bind(product.image)
        .bind(product.category)
        .bind(product.rating_total)
        .bind(product.rating_sum)
        .bind(avg)
        .bind(now)
        .execute(&pool)
        .await?;
    }
    tracing::info!(count = PRODUCTS.len(), "products seeded");

    Ok(())
}
