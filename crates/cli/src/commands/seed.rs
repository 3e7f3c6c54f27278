//! Demo data for local development.
//!
//! Seeds subscription plans, one author with two published books, a hero
//! banner, a job posting and a news post. Refuses to run when any plan
//! already exists so it can't duplicate data on a live database.

use quillhouse_commerce::db::{
    AuthorRepository, BannerRepository, BookRepository, JobRepository, SubscriptionRepository,
    UpdateRepository, UserRepository,
};
use quillhouse_commerce::models::{
    BannerInput, BookDraft, JobInput, NewUser, PlanInput, UpdateInput,
};
use quillhouse_commerce::password::hash_password;
use quillhouse_core::{BookStatus, Email, UserRole};
use rust_decimal::Decimal;

use super::{CommandError, connect};

const AUTHOR_EMAIL: &str = "author@quillhouse.test";

fn plans() -> [PlanInput; 2] {
    [
        PlanInput {
            name: "Reader Monthly".to_owned(),
            description: "Every e-book in the catalog, billed monthly".to_owned(),
            price: Decimal::from(199),
            duration_days: 30,
            active: true,
        },
        PlanInput {
            name: "Reader Annual".to_owned(),
            description: "Every e-book in the catalog for a year".to_owned(),
            price: Decimal::from(1_999),
            duration_days: 365,
            active: true,
        },
    ]
}

fn book(title: &str, category: &str, print_price: i64, ebook_price: i64) -> BookDraft {
    BookDraft {
        title: title.to_owned(),
        subtitle: None,
        description: format!("{title} is a demo title seeded for local development."),
        isbn: None,
        language: Some("English".to_owned()),
        category: Some(category.to_owned()),
        print_price: Decimal::from(print_price),
        ebook_price: Some(Decimal::from(ebook_price)),
        pages: Some(240),
        weight_grams: Some(350),
        cover_url: None,
        ebook_url: None,
    }
}

/// Seed an empty database.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    let subscriptions = SubscriptionRepository::new(&pool);
    if !subscriptions.list_plans(false).await?.is_empty() {
        tracing::warn!("Plans already exist; skipping seed");
        return Ok(());
    }

    for plan in plans() {
        let plan = subscriptions.create_plan(&plan).await?;
        tracing::info!(plan_id = %plan.id, name = %plan.name, "Seeded plan");
    }

    // Demo login; printed once below.
    let password = uuid::Uuid::new_v4().simple().to_string();
    let email = Email::parse(AUTHOR_EMAIL)?;
    let user = UserRepository::new(&pool)
        .create(&NewUser {
            email: &email,
            display_name: Some("Meera Iyer"),
            phone: None,
            role: UserRole::Author,
            password_hash: &hash_password(&password)?,
        })
        .await?;
    let author = AuthorRepository::new(&pool)
        .upsert_profile(user.id, "Meera Iyer", "Writes about rivers and the people on them.", None)
        .await?;
    tracing::info!(email = AUTHOR_EMAIL, password = %password, "Seeded author account");

    let books = BookRepository::new(&pool);
    for draft in [
        book("The Kaveri Letters", "Fiction", 399, 149),
        book("Monsoon Ledger", "Non-fiction", 449, 199),
    ] {
        let created = books.create(author.id, &draft).await?;
        books.update_inventory(created.id, 50, None, None).await?;
        let published = books.set_status(created.id, BookStatus::Published, None).await?;
        tracing::info!(book_id = %published.id, slug = %published.slug, "Seeded book");
    }

    BannerRepository::new(&pool)
        .create(&BannerInput {
            title: "New this monsoon".to_owned(),
            subtitle: Some("Fresh fiction from our authors".to_owned()),
            image_url: "https://placehold.co/1600x500".to_owned(),
            link_url: Some("/books".to_owned()),
            position: 0,
            active: true,
            starts_at: None,
            ends_at: None,
        })
        .await?;

    JobRepository::new(&pool)
        .create(&JobInput {
            title: "Copy Editor".to_owned(),
            department: "Editorial".to_owned(),
            location: "Bengaluru".to_owned(),
            employment_type: "full_time".to_owned(),
            description: "Edit manuscripts for house style and consistency.".to_owned(),
            open: true,
        })
        .await?;

    UpdateRepository::new(&pool)
        .create(&UpdateInput {
            title: "Quillhouse is open".to_owned(),
            body: "Our storefront now ships print books across India.".to_owned(),
            published: true,
        })
        .await?;

    tracing::info!("Seed complete");
    Ok(())
}
