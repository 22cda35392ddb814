//! App Context

use std::sync::Arc;

use thiserror::Error;

use crate::{
    config::{CheckoutConfig, DatabaseConfig},
    database::{self, Db},
    domain::{
        carts::{CartsService, PgCartsService},
        catalog::{CatalogService, PgCatalogService},
        checkout::{OrderFinalizer, PgOrderFinalizer},
        discounts::{DiscountsService, PgDiscountsService},
        library::{LibraryService, PgLibraryService},
        orders::{OrdersService, PgOrdersService},
        payments::{
            PaymentInstrumentsService, PaymentProcessor, PgPaymentInstrumentsService,
            PgPaymentProcessor,
        },
        taxes::{PgTaxService, TaxService},
        users::{PgUsersService, UsersService},
    },
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),
}

#[derive(Clone)]
pub struct AppContext {
    pub users: Arc<dyn UsersService>,
    pub catalog: Arc<dyn CatalogService>,
    pub carts: Arc<dyn CartsService>,
    pub discounts: Arc<dyn DiscountsService>,
    pub taxes: Arc<dyn TaxService>,
    pub instruments: Arc<dyn PaymentInstrumentsService>,
    pub payments: Arc<dyn PaymentProcessor>,
    pub orders: Arc<dyn OrdersService>,
    pub library: Arc<dyn LibraryService>,
    pub checkout: Arc<dyn OrderFinalizer>,
}

impl AppContext {
    /// Build application context from configuration.
    ///
    /// The payment ledger is connected through a pool of its own: a checkout
    /// holds a connection for its whole transaction while the capture runs.
    ///
    /// # Errors
    ///
    /// Returns an error when establishing a database connection fails.
    pub async fn from_config(
        database: &DatabaseConfig,
        checkout: &CheckoutConfig,
    ) -> Result<Self, AppInitError> {
        let pool = database::connect(&database.database_url)
            .await
            .map_err(AppInitError::Database)?;

        let ledger = database::connect(&database.database_url)
            .await
            .map_err(AppInitError::Database)?;

        Ok(Self::from_db(&Db::new(pool), &Db::new(ledger), checkout))
    }

    /// Wire every service over existing database handles. `ledger` backs the
    /// payment processor and must not share a pool with `db`.
    #[must_use]
    pub fn from_db(db: &Db, ledger: &Db, checkout: &CheckoutConfig) -> Self {
        let settings = checkout.settings();
        let payments: Arc<dyn PaymentProcessor> =
            Arc::new(PgPaymentProcessor::new(ledger.clone()));

        Self {
            users: Arc::new(PgUsersService::new(db.clone())),
            catalog: Arc::new(PgCatalogService::new(db.clone())),
            carts: Arc::new(PgCartsService::new(db.clone())),
            discounts: Arc::new(PgDiscountsService::new(db.clone())),
            taxes: Arc::new(PgTaxService::new(db.clone(), settings.fallback_tax_rate)),
            instruments: Arc::new(PgPaymentInstrumentsService::new(db.clone())),
            orders: Arc::new(PgOrdersService::new(db.clone())),
            library: Arc::new(PgLibraryService::new(db.clone())),
            checkout: Arc::new(PgOrderFinalizer::new(db.clone(), Arc::clone(&payments), settings)),
            payments,
        }
    }
}
