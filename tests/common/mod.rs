//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which wires an in-memory DB, in-memory media
//! storage and a recording mailer into the account and catalog services.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, RgbImage};
use readcomics::accounts::{AccountService, MemoryMailer, SignupForm};
use readcomics::catalog::CatalogService;
use readcomics::config::Config;
use readcomics::images::MemoryStorage;
use readcomics::instrument::Instrumentation;
use readcomics_db::models::User;
use readcomics_db::pool::{init_memory_pool, DbPool, PooledConnection};

pub const PASSWORD: &str = "correct-horse-battery";

/// Default configuration with a cheap password hash cost.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.accounts.password_hash_cost = 4;
    config
}

/// Encode a generated RGB image.
pub fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 200])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, format)
        .expect("encode test image");
    buf.into_inner()
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Png)
}

/// Services backed by an in-memory database and media storage.
pub struct TestHarness {
    pub db: DbPool,
    pub config: Config,
    pub storage: Arc<MemoryStorage>,
    pub mailer: Arc<MemoryMailer>,
    pub accounts: AccountService,
    pub catalog: CatalogService,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let db = init_memory_pool().expect("failed to create in-memory pool");
        let storage = Arc::new(MemoryStorage::new());
        let mailer = Arc::new(MemoryMailer::new());
        let accounts = AccountService::from_config(&config, db.clone(), storage.clone(), mailer.clone())
            .expect("valid avatar declaration");
        let catalog = CatalogService::new(db.clone(), Instrumentation::from_config(&config.logging));

        Self {
            db,
            config,
            storage,
            mailer,
            accounts,
            catalog,
        }
    }

    /// Borrow the single pooled connection. Drop it before calling a service.
    pub fn conn(&self) -> PooledConnection {
        self.db.get().expect("failed to get connection")
    }

    /// Register a user with [`PASSWORD`].
    pub fn register(&self, username: &str, email: &str) -> User {
        self.accounts
            .register(&SignupForm {
                username: username.to_string(),
                email: email.to_string(),
                password: PASSWORD.to_string(),
            })
            .expect("register user")
    }

    /// Reload a user from the database.
    pub fn reload(&self, user: &User) -> User {
        self.accounts.get_user(&user.username).expect("reload user")
    }
}
