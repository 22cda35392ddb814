//! Order Records

use jiff::Timestamp;
use jiff_sqlx::{Date as SqlxDate, Timestamp as SqlxTimestamp};
use mival::{
    carts::CartUuid,
    catalog::CatalogItemUuid,
    orders::{Order, OrderId, OrderLine, OrderParts, OrderStatus, PurchaseRecord},
    payments::{IdempotencyKey, PaymentInstrumentUuid},
    taxes::TaxRate,
    users::UserUuid,
};
use rust_decimal::Decimal;
use sqlx::{FromRow, Row, postgres::PgRow};

fn decode_error(index: &str, error: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: index.to_string(),
        source: Box::new(error),
    }
}

/// Order header row.
#[derive(Debug, Clone)]
pub(crate) struct OrderRecord {
    pub(crate) id: OrderId,
    pub(crate) user_uuid: UserUuid,
    pub(crate) cart_uuid: CartUuid,
    pub(crate) payment_instrument_uuid: PaymentInstrumentUuid,
    pub(crate) idempotency_key: IdempotencyKey,
    pub(crate) discount_code: Option<String>,
    pub(crate) discount: Decimal,
    pub(crate) tax_rate: TaxRate,
    pub(crate) status: OrderStatus,
    pub(crate) created_at: Timestamp,
}

impl OrderRecord {
    /// Rebuilds the domain order. Stored rows went through the same
    /// validation on the way in, so a failure here means the row was edited
    /// out of band.
    pub(crate) fn into_order(self, lines: Vec<OrderLine>) -> Result<Order, sqlx::Error> {
        Order::new(OrderParts {
            id: self.id,
            user_id: self.user_uuid,
            created_at: self.created_at,
            payment_instrument_id: self.payment_instrument_uuid,
            discount_code: self.discount_code,
            discount: self.discount,
            tax_rate: self.tax_rate,
            status: self.status,
            lines,
        })
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
    }
}

impl<'r> FromRow<'r, PgRow> for OrderRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let id = OrderId::parse(row.try_get::<&str, _>("id")?).map_err(|e| decode_error("id", e))?;

        let idempotency_key = IdempotencyKey::new(row.try_get::<String, _>("idempotency_key")?)
            .map_err(|e| decode_error("idempotency_key", e))?;

        let tax_rate = TaxRate::new(row.try_get::<Decimal, _>("tax_rate")?)
            .map_err(|e| decode_error("tax_rate", e))?;

        let status = row
            .try_get::<String, _>("status")?
            .parse::<OrderStatus>()
            .map_err(|e| decode_error("status", e))?;

        Ok(Self {
            id,
            user_uuid: UserUuid::from_uuid(row.try_get("user_uuid")?),
            cart_uuid: CartUuid::from_uuid(row.try_get("cart_uuid")?),
            payment_instrument_uuid: PaymentInstrumentUuid::from_uuid(
                row.try_get("payment_instrument_uuid")?,
            ),
            idempotency_key,
            discount_code: row.try_get("discount_code")?,
            discount: row.try_get("discount")?,
            tax_rate,
            status,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct OrderLineRecord(pub(crate) OrderLine);

impl<'r> FromRow<'r, PgRow> for OrderLineRecord {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let quantity = u32::try_from(row.try_get::<i32, _>("quantity")?)
            .map_err(|e| decode_error("quantity", e))?;

        Ok(Self(OrderLine {
            item_id: CatalogItemUuid::from_uuid(row.try_get("catalog_item_uuid")?),
            title: row.try_get("title")?,
            unit_price: row.try_get("unit_price")?,
            quantity,
        }))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PurchaseRecordRow(pub(crate) PurchaseRecord);

impl<'r> FromRow<'r, PgRow> for PurchaseRecordRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let order_id = OrderId::parse(row.try_get::<&str, _>("order_id")?)
            .map_err(|e| decode_error("order_id", e))?;

        Ok(Self(PurchaseRecord {
            user_id: UserUuid::from_uuid(row.try_get("user_uuid")?),
            order_id,
            purchased_on: row.try_get::<SqlxDate, _>("purchased_on")?.to_jiff(),
            total: row.try_get("total")?,
        }))
    }
}
