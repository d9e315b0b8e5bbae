use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{
    AddressId, DistributionCenterId, Money, ReservationId, ShippingId, ShippingStatus,
    TransportMethodId, TravelId, UserId, Version,
};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};

use crate::{
    Address, AddressRepository, DistributionCenter, DistributionCenterRepository, Locality,
    LocalityQuery, LocalityRepository, NewAddress, NewShipment, ProductLine, ReferenceData, Result,
    ShipmentQuery, ShipmentRepository, ShippingDetail, ShippingLog, StatusChange, StoreError,
    Travel, TravelRepository,
};

const SHIPMENT_COLUMNS: &str = "id, order_id, user_id, travel_id, delivery_address_id, products, status, \
     total_cost_cents, currency, tracking_number, carrier_name, created_at, updated_at, \
     estimated_delivery_at, version";

/// PostgreSQL-backed logistics store.
#[derive(Clone)]
pub struct PostgresLogisticsStore {
    pool: PgPool,
}

impl PostgresLogisticsStore {
    /// Creates a new PostgreSQL logistics store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Inserts localities and distribution centers that are not present yet.
    #[tracing::instrument(skip_all, fields(localities = data.localities.len()))]
    pub async fn seed_reference_data(&self, data: &ReferenceData) -> Result<()> {
        for locality in &data.localities {
            sqlx::query(
                r#"
                INSERT INTO localities (postal_code, locality_name, lat, lon, state, country)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (postal_code, locality_name) DO NOTHING
                "#,
            )
            .bind(&locality.postal_code)
            .bind(&locality.locality_name)
            .bind(locality.lat)
            .bind(locality.lon)
            .bind(&locality.state)
            .bind(&locality.country)
            .execute(&self.pool)
            .await?;
        }

        for center in &data.distribution_centers {
            let address_id = match &center.address {
                Some(fields) => Some(self.find_or_create_address(fields).await?.id.as_i64()),
                None => None,
            };
            sqlx::query(
                r#"
                INSERT INTO distribution_centers (id, name, address_id)
                VALUES ($1, $2, $3)
                ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, address_id = EXCLUDED.address_id
                "#,
            )
            .bind(center.id.as_i64())
            .bind(&center.name)
            .bind(address_id)
            .execute(&self.pool)
            .await?;
        }

        tracing::info!(
            centers = data.distribution_centers.len(),
            "reference data seeded"
        );
        Ok(())
    }

    fn row_to_locality(row: PgRow) -> Result<Locality> {
        Ok(Locality {
            postal_code: row.try_get("postal_code")?,
            locality_name: row.try_get("locality_name")?,
            lat: row.try_get("lat")?,
            lon: row.try_get("lon")?,
            state: row.try_get("state")?,
            country: row.try_get("country")?,
        })
    }

    fn row_to_address(row: &PgRow) -> Result<Address> {
        Ok(Address {
            id: AddressId::new(row.try_get("id")?),
            street: row.try_get("street")?,
            number: row.try_get("number")?,
            postal_code: row.try_get("postal_code")?,
            locality_name: row.try_get("locality_name")?,
        })
    }

    fn row_to_travel(row: PgRow) -> Result<Travel> {
        Ok(Travel {
            id: TravelId::new(row.try_get("id")?),
            distribution_center_id: DistributionCenterId::new(
                row.try_get("distribution_center_id")?,
            ),
            transport_method_id: TransportMethodId::new(row.try_get("transport_method_id")?),
            created_at: row.try_get("created_at")?,
        })
    }

    fn parse_status(raw: String) -> Result<ShippingStatus> {
        Ok(serde_json::from_value(serde_json::Value::String(raw))?)
    }

    fn row_to_shipment(row: PgRow, logs: Vec<ShippingLog>) -> Result<ShippingDetail> {
        let products: Vec<ProductLine> =
            serde_json::from_value(row.try_get::<serde_json::Value, _>("products")?)?;

        Ok(ShippingDetail {
            id: ShippingId::new(row.try_get("id")?),
            order_id: ReservationId::new(row.try_get("order_id")?),
            user_id: UserId::new(row.try_get("user_id")?),
            travel_id: TravelId::new(row.try_get("travel_id")?),
            delivery_address_id: AddressId::new(row.try_get("delivery_address_id")?),
            products,
            status: Self::parse_status(row.try_get("status")?)?,
            total_cost: Money::from_cents(row.try_get("total_cost_cents")?),
            currency: row.try_get("currency")?,
            tracking_number: row.try_get("tracking_number")?,
            carrier_name: row.try_get("carrier_name")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            estimated_delivery_at: row.try_get("estimated_delivery_at")?,
            logs,
            version: Version::new(row.try_get("version")?),
        })
    }

    async fn logs_for(&self, ids: &[i64]) -> Result<HashMap<i64, Vec<ShippingLog>>> {
        let rows = sqlx::query(
            r#"
            SELECT shipping_id, timestamp, status, message
            FROM shipping_logs
            WHERE shipping_id = ANY($1)
            ORDER BY id ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut logs: HashMap<i64, Vec<ShippingLog>> = HashMap::new();
        for row in rows {
            let shipping_id: i64 = row.try_get("shipping_id")?;
            logs.entry(shipping_id).or_default().push(ShippingLog {
                timestamp: row.try_get("timestamp")?,
                status: Self::parse_status(row.try_get("status")?)?,
                message: row.try_get("message")?,
            });
        }
        Ok(logs)
    }

    fn filter_clause(query: &ShipmentQuery) -> (String, usize) {
        let mut sql = String::from(" WHERE 1=1");
        let mut param_count = 0;

        if query.user_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND user_id = ${param_count}"));
        }
        if query.status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ${param_count}"));
        }
        if query.created_from.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at >= ${param_count}"));
        }
        if query.created_to.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at <= ${param_count}"));
        }

        (sql, param_count)
    }

    fn bind_filters<'q>(
        mut q: Query<'q, Postgres, PgArguments>,
        query: &ShipmentQuery,
    ) -> Query<'q, Postgres, PgArguments> {
        if let Some(user_id) = query.user_id {
            q = q.bind(user_id.as_i64());
        }
        if let Some(status) = query.status {
            q = q.bind(status.as_str());
        }
        if let Some(from) = query.created_from {
            q = q.bind(from);
        }
        if let Some(to) = query.created_to {
            q = q.bind(to);
        }
        q
    }
}

#[async_trait]
impl LocalityRepository for PostgresLogisticsStore {
    async fn localities_by_postal_code(&self, postal_code: &str) -> Result<Vec<Locality>> {
        let rows = sqlx::query(
            r#"
            SELECT postal_code, locality_name, lat, lon, state, country
            FROM localities
            WHERE postal_code = $1
            ORDER BY locality_name ASC
            "#,
        )
        .bind(postal_code)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_locality).collect()
    }

    async fn locality(&self, postal_code: &str, locality_name: &str) -> Result<Option<Locality>> {
        let row = sqlx::query(
            r#"
            SELECT postal_code, locality_name, lat, lon, state, country
            FROM localities
            WHERE postal_code = $1 AND LOWER(locality_name) = LOWER($2)
            LIMIT 1
            "#,
        )
        .bind(postal_code)
        .bind(locality_name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_locality).transpose()
    }

    async fn search_localities(&self, query: &LocalityQuery) -> Result<(Vec<Locality>, u64)> {
        let mut filter = String::from(" WHERE 1=1");
        let mut binds: Vec<&str> = Vec::new();
        if let Some(state) = &query.state {
            binds.push(state);
            filter.push_str(&format!(" AND UPPER(state) = UPPER(${})", binds.len()));
        }
        if let Some(name) = &query.locality_name {
            binds.push(name);
            filter.push_str(&format!(
                " AND POSITION(LOWER(${}) IN LOWER(locality_name)) > 0",
                binds.len()
            ));
        }
        if let Some(postal_code) = &query.postal_code {
            binds.push(postal_code);
            filter.push_str(&format!(" AND postal_code = ${}", binds.len()));
        }

        let count_sql = format!("SELECT COUNT(*) AS total FROM localities{filter}");
        let mut count = sqlx::query(&count_sql);
        for value in &binds {
            count = count.bind(*value);
        }
        let total: i64 = count.fetch_one(&self.pool).await?.try_get("total")?;

        let page_sql = format!(
            "SELECT postal_code, locality_name, lat, lon, state, country FROM localities{filter} \
             ORDER BY UPPER(state), locality_name, postal_code LIMIT ${} OFFSET ${}",
            binds.len() + 1,
            binds.len() + 2,
        );
        let mut page = sqlx::query(&page_sql);
        for value in &binds {
            page = page.bind(*value);
        }
        let rows = page
            .bind(i64::from(query.page.limit()))
            .bind(query.page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(Self::row_to_locality)
            .collect::<Result<Vec<_>>>()?;
        Ok((items, total.max(0) as u64))
    }
}

#[async_trait]
impl AddressRepository for PostgresLogisticsStore {
    async fn find_or_create_address(&self, fields: &NewAddress) -> Result<Address> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query(
            r#"
            INSERT INTO addresses (street, number, postal_code, locality_name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ON CONSTRAINT unique_address DO UPDATE SET street = EXCLUDED.street
            RETURNING id, street, number, postal_code, locality_name
            "#,
        )
        .bind(&fields.street)
        .bind(fields.number)
        .bind(&fields.postal_code)
        .bind(&fields.locality_name)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_address(&row)
    }

    async fn address(&self, id: AddressId) -> Result<Option<Address>> {
        let row = sqlx::query(
            "SELECT id, street, number, postal_code, locality_name FROM addresses WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_address).transpose()
    }
}

#[async_trait]
impl DistributionCenterRepository for PostgresLogisticsStore {
    async fn distribution_centers(&self) -> Result<Vec<DistributionCenter>> {
        let rows = sqlx::query(
            r#"
            SELECT dc.id AS center_id, dc.name, a.id, a.street, a.number, a.postal_code, a.locality_name
            FROM distribution_centers dc
            LEFT JOIN addresses a ON a.id = dc.address_id
            ORDER BY dc.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_center).collect()
    }

    async fn distribution_center(
        &self,
        id: DistributionCenterId,
    ) -> Result<Option<DistributionCenter>> {
        let row = sqlx::query(
            r#"
            SELECT dc.id AS center_id, dc.name, a.id, a.street, a.number, a.postal_code, a.locality_name
            FROM distribution_centers dc
            LEFT JOIN addresses a ON a.id = dc.address_id
            WHERE dc.id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_center).transpose()
    }
}

fn row_to_center(row: &PgRow) -> Result<DistributionCenter> {
    let address_id: Option<i64> = row.try_get("id")?;
    let address = match address_id {
        Some(_) => Some(PostgresLogisticsStore::row_to_address(row)?),
        None => None,
    };
    Ok(DistributionCenter {
        id: DistributionCenterId::new(row.try_get("center_id")?),
        name: row.try_get("name")?,
        address,
    })
}

#[async_trait]
impl TravelRepository for PostgresLogisticsStore {
    async fn find_or_create_travel(
        &self,
        center: DistributionCenterId,
        method: TransportMethodId,
    ) -> Result<Travel> {
        let row = sqlx::query(
            r#"
            INSERT INTO travels (distribution_center_id, transport_method_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT ON CONSTRAINT unique_travel
                DO UPDATE SET transport_method_id = EXCLUDED.transport_method_id
            RETURNING id, distribution_center_id, transport_method_id, created_at
            "#,
        )
        .bind(center.as_i64())
        .bind(method.as_i64())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_travel(row)
    }

    async fn travel(&self, id: TravelId) -> Result<Option<Travel>> {
        let row = sqlx::query(
            "SELECT id, distribution_center_id, transport_method_id, created_at FROM travels WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_travel).transpose()
    }
}

#[async_trait]
impl ShipmentRepository for PostgresLogisticsStore {
    async fn insert_shipment(&self, shipment: NewShipment) -> Result<ShippingDetail> {
        let products = serde_json::to_value(&shipment.products)?;
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO shipments (
                order_id, user_id, travel_id, delivery_address_id, products, status,
                total_cost_cents, currency, tracking_number, carrier_name,
                created_at, updated_at, estimated_delivery_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11, $12, $13)
            RETURNING id
            "#,
        )
        .bind(shipment.order_id.as_i64())
        .bind(shipment.user_id.as_i64())
        .bind(shipment.travel_id.as_i64())
        .bind(shipment.delivery_address_id.as_i64())
        .bind(products)
        .bind(ShippingStatus::Created.as_str())
        .bind(shipment.total_cost.cents())
        .bind(&shipment.currency)
        .bind(shipment.tracking_number)
        .bind(&shipment.carrier_name)
        .bind(shipment.created_at)
        .bind(shipment.estimated_delivery_at)
        .bind(Version::first().as_i64())
        .fetch_one(&mut *tx)
        .await?;

        insert_log(
            &mut tx,
            id,
            shipment.created_at,
            ShippingStatus::Created,
            &shipment.initial_log,
        )
        .await?;

        tx.commit().await?;
        Ok(ShippingDetail::from_new(ShippingId::new(id), shipment))
    }

    async fn shipment(&self, id: ShippingId) -> Result<Option<ShippingDetail>> {
        let sql = format!("SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE id = $1");
        let Some(row) = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let mut logs = self.logs_for(&[id.as_i64()]).await?;
        let detail = Self::row_to_shipment(row, logs.remove(&id.as_i64()).unwrap_or_default())?;
        Ok(Some(detail))
    }

    async fn apply_status_change(
        &self,
        id: ShippingId,
        expected: Version,
        change: StatusChange,
    ) -> Result<ShippingDetail> {
        let mut tx = self.pool.begin().await?;

        let current: Option<i64> =
            sqlx::query_scalar("SELECT version FROM shipments WHERE id = $1 FOR UPDATE")
                .bind(id.as_i64())
                .fetch_optional(&mut *tx)
                .await?;

        let actual = Version::new(current.ok_or_else(|| StoreError::NotFound {
            entity: "shipment",
            id: id.to_string(),
        })?);

        if actual != expected {
            return Err(StoreError::ConcurrencyConflict {
                entity: "shipment",
                id: id.to_string(),
                expected,
                actual,
            });
        }

        sqlx::query(
            r#"
            UPDATE shipments
            SET status = $1, updated_at = $2, version = $3
            WHERE id = $4 AND version = $5
            "#,
        )
        .bind(change.status.as_str())
        .bind(change.at)
        .bind(expected.next().as_i64())
        .bind(id.as_i64())
        .bind(expected.as_i64())
        .execute(&mut *tx)
        .await?;

        insert_log(&mut tx, id.as_i64(), change.at, change.status, &change.message).await?;
        tx.commit().await?;

        self.shipment(id).await?.ok_or_else(|| StoreError::NotFound {
            entity: "shipment",
            id: id.to_string(),
        })
    }

    async fn list_shipments(&self, query: &ShipmentQuery) -> Result<(Vec<ShippingDetail>, u64)> {
        let (filter, param_count) = Self::filter_clause(query);

        let count_sql = format!("SELECT COUNT(*) AS total FROM shipments{filter}");
        let count_row = Self::bind_filters(sqlx::query(&count_sql), query)
            .fetch_one(&self.pool)
            .await?;
        let total: i64 = count_row.try_get("total")?;

        let page_sql = format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments{filter} ORDER BY created_at DESC, id DESC LIMIT ${} OFFSET ${}",
            param_count + 1,
            param_count + 2,
        );
        let rows = Self::bind_filters(sqlx::query(&page_sql), query)
            .bind(i64::from(query.page.limit()))
            .bind(query.page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<i64> = rows
            .iter()
            .map(|r| r.try_get::<i64, _>("id"))
            .collect::<std::result::Result<_, _>>()?;
        let mut logs = self.logs_for(&ids).await?;

        let items = rows
            .into_iter()
            .zip(ids)
            .map(|(row, id)| Self::row_to_shipment(row, logs.remove(&id).unwrap_or_default()))
            .collect::<Result<Vec<_>>>()?;

        Ok((items, total.max(0) as u64))
    }
}

async fn insert_log(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    shipping_id: i64,
    at: DateTime<Utc>,
    status: ShippingStatus,
    message: &str,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO shipping_logs (shipping_id, timestamp, status, message) VALUES ($1, $2, $3, $4)",
    )
    .bind(shipping_id)
    .bind(at)
    .bind(status.as_str())
    .bind(message)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
