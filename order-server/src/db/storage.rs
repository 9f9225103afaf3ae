//! redb-based storage layer
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `menu_items` | menu item id | `MenuItem` | Menu + inventory ledger |
//! | `customers` | customer id | `Customer` | Customer mirror records |
//! | `carts` | cart id | `Cart` | Active carts |
//! | `cart_by_customer` | customer id | cart id | 1:1 cart index |
//! | `cart_items` | cart item id | `CartItem` | Cart contents |
//! | `orders` | order id | `Order` | Orders |
//! | `order_items` | order item id | `OrderItem` | Frozen order lines |
//! | `tickets` | ticket id | `Ticket` | Kitchen tickets |
//! | `ticket_by_order` | order id | ticket id | 1:1 ticket index |
//!
//! All values are JSON-serialized. Keys are UUID strings.
//!
//! # Transactions
//!
//! redb allows a single write transaction at a time, so every multi-entity
//! write sequence (cart→order conversion, status change + ticket effect) is
//! serialized and commits atomically. Dropping a [`WriteTransaction`]
//! without committing aborts it — early returns roll back automatically.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use shared::models::{Cart, CartItem, Customer, MenuItem, Order, OrderItem, Ticket};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

const MENU_ITEMS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("menu_items");
const CUSTOMERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("customers");
const CARTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("carts");
const CART_BY_CUSTOMER_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("cart_by_customer");
const CART_ITEMS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("cart_items");
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");
const ORDER_ITEMS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("order_items");
const TICKETS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("tickets");
const TICKET_BY_ORDER_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("ticket_by_order");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Entity store backed by redb
#[derive(Clone)]
pub struct OrderStore {
    db: Arc<Database>,
}

impl OrderStore {
    /// Open or create the database at the given path
    ///
    /// redb commits are durable as soon as `commit()` returns and the file
    /// is always left in a consistent state, so an unexpected shutdown never
    /// leaves a half-applied order.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        Ok(store)
    }

    /// Create all tables so later read transactions never hit a missing table
    fn init_tables(&self) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let _ = txn.open_table(MENU_ITEMS_TABLE)?;
            let _ = txn.open_table(CUSTOMERS_TABLE)?;
            let _ = txn.open_table(CARTS_TABLE)?;
            let _ = txn.open_table(CART_BY_CUSTOMER_TABLE)?;
            let _ = txn.open_table(CART_ITEMS_TABLE)?;
            let _ = txn.open_table(ORDERS_TABLE)?;
            let _ = txn.open_table(ORDER_ITEMS_TABLE)?;
            let _ = txn.open_table(TICKETS_TABLE)?;
            let _ = txn.open_table(TICKET_BY_ORDER_TABLE)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Menu Items ==========

    /// Insert or overwrite a menu item (within transaction)
    pub fn store_menu_item(&self, txn: &WriteTransaction, item: &MenuItem) -> StorageResult<()> {
        let mut table = txn.open_table(MENU_ITEMS_TABLE)?;
        let value = serde_json::to_vec(item)?;
        table.insert(item.id.to_string().as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn menu_item(&self, id: Uuid) -> StorageResult<Option<MenuItem>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MENU_ITEMS_TABLE)?;
        match table.get(id.to_string().as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get a menu item (within transaction)
    pub fn menu_item_txn(
        &self,
        txn: &WriteTransaction,
        id: Uuid,
    ) -> StorageResult<Option<MenuItem>> {
        let table = txn.open_table(MENU_ITEMS_TABLE)?;
        match table.get(id.to_string().as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn list_menu_items(&self) -> StorageResult<Vec<MenuItem>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MENU_ITEMS_TABLE)?;

        let mut items = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            items.push(serde_json::from_slice(value.value())?);
        }
        Ok(items)
    }

    // ========== Customers ==========

    pub fn store_customer(&self, txn: &WriteTransaction, customer: &Customer) -> StorageResult<()> {
        let mut table = txn.open_table(CUSTOMERS_TABLE)?;
        let value = serde_json::to_vec(customer)?;
        table.insert(customer.id.to_string().as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn customer_txn(
        &self,
        txn: &WriteTransaction,
        id: Uuid,
    ) -> StorageResult<Option<Customer>> {
        let table = txn.open_table(CUSTOMERS_TABLE)?;
        match table.get(id.to_string().as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    // ========== Carts ==========

    /// Insert or overwrite a cart and its customer index (within transaction)
    pub fn store_cart(&self, txn: &WriteTransaction, cart: &Cart) -> StorageResult<()> {
        {
            let mut table = txn.open_table(CARTS_TABLE)?;
            let value = serde_json::to_vec(cart)?;
            table.insert(cart.id.to_string().as_str(), value.as_slice())?;
        }
        let mut index = txn.open_table(CART_BY_CUSTOMER_TABLE)?;
        index.insert(
            cart.customer_id.to_string().as_str(),
            cart.id.to_string().as_str(),
        )?;
        Ok(())
    }

    /// Remove a cart and its customer index (within transaction)
    ///
    /// Cart items are removed separately by the caller.
    pub fn remove_cart(&self, txn: &WriteTransaction, cart: &Cart) -> StorageResult<()> {
        {
            let mut table = txn.open_table(CARTS_TABLE)?;
            table.remove(cart.id.to_string().as_str())?;
        }
        let mut index = txn.open_table(CART_BY_CUSTOMER_TABLE)?;
        index.remove(cart.customer_id.to_string().as_str())?;
        Ok(())
    }

    pub fn cart_by_customer(&self, customer_id: Uuid) -> StorageResult<Option<Cart>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(CART_BY_CUSTOMER_TABLE)?;
        let cart_id = match index.get(customer_id.to_string().as_str())? {
            Some(guard) => guard.value().to_string(),
            None => return Ok(None),
        };
        let table = read_txn.open_table(CARTS_TABLE)?;
        match table.get(cart_id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Cart lookup by customer (within transaction)
    pub fn cart_by_customer_txn(
        &self,
        txn: &WriteTransaction,
        customer_id: Uuid,
    ) -> StorageResult<Option<Cart>> {
        let cart_id = {
            let index = txn.open_table(CART_BY_CUSTOMER_TABLE)?;
            match index.get(customer_id.to_string().as_str())? {
                Some(guard) => guard.value().to_string(),
                None => return Ok(None),
            }
        };
        let table = txn.open_table(CARTS_TABLE)?;
        match table.get(cart_id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn list_carts(&self) -> StorageResult<Vec<Cart>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CARTS_TABLE)?;

        let mut carts = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            carts.push(serde_json::from_slice(value.value())?);
        }
        Ok(carts)
    }

    // ========== Cart Items ==========

    pub fn store_cart_item(&self, txn: &WriteTransaction, item: &CartItem) -> StorageResult<()> {
        let mut table = txn.open_table(CART_ITEMS_TABLE)?;
        let value = serde_json::to_vec(item)?;
        table.insert(item.id.to_string().as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn cart_item(&self, id: Uuid) -> StorageResult<Option<CartItem>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CART_ITEMS_TABLE)?;
        match table.get(id.to_string().as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn cart_item_txn(
        &self,
        txn: &WriteTransaction,
        id: Uuid,
    ) -> StorageResult<Option<CartItem>> {
        let table = txn.open_table(CART_ITEMS_TABLE)?;
        match table.get(id.to_string().as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn remove_cart_item(&self, txn: &WriteTransaction, id: Uuid) -> StorageResult<()> {
        let mut table = txn.open_table(CART_ITEMS_TABLE)?;
        table.remove(id.to_string().as_str())?;
        Ok(())
    }

    pub fn cart_items(&self, cart_id: Uuid) -> StorageResult<Vec<CartItem>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CART_ITEMS_TABLE)?;

        let mut items: Vec<CartItem> = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let item: CartItem = serde_json::from_slice(value.value())?;
            if item.cart_id == cart_id {
                items.push(item);
            }
        }
        Ok(items)
    }

    /// All items of a cart (within transaction)
    pub fn cart_items_txn(
        &self,
        txn: &WriteTransaction,
        cart_id: Uuid,
    ) -> StorageResult<Vec<CartItem>> {
        let table = txn.open_table(CART_ITEMS_TABLE)?;

        let mut items: Vec<CartItem> = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let item: CartItem = serde_json::from_slice(value.value())?;
            if item.cart_id == cart_id {
                items.push(item);
            }
        }
        Ok(items)
    }

    /// Find the cart item reserving a given menu item (within transaction)
    ///
    /// Backs the at-most-one-per-(cart, menu) invariant.
    pub fn cart_item_for_menu_txn(
        &self,
        txn: &WriteTransaction,
        cart_id: Uuid,
        menu_item_id: Uuid,
    ) -> StorageResult<Option<CartItem>> {
        let table = txn.open_table(CART_ITEMS_TABLE)?;
        for result in table.iter()? {
            let (_key, value) = result?;
            let item: CartItem = serde_json::from_slice(value.value())?;
            if item.cart_id == cart_id && item.menu_item_id == menu_item_id {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    // ========== Orders ==========

    pub fn store_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = serde_json::to_vec(order)?;
        table.insert(order.id.to_string().as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn order(&self, id: Uuid) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(id.to_string().as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn order_txn(&self, txn: &WriteTransaction, id: Uuid) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        match table.get(id.to_string().as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn remove_order(&self, txn: &WriteTransaction, id: Uuid) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        table.remove(id.to_string().as_str())?;
        Ok(())
    }

    pub fn list_orders(&self) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders: Vec<Order> = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            orders.push(serde_json::from_slice(value.value())?);
        }
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }

    /// Latest order of a customer, regardless of status
    pub fn order_for_customer(&self, customer_id: Uuid) -> StorageResult<Option<Order>> {
        let orders = self.list_orders()?;
        Ok(orders
            .into_iter()
            .filter(|o| o.customer_id == customer_id)
            .max_by_key(|o| o.created_at))
    }

    /// Latest non-terminal order of a customer
    pub fn active_order_for_customer(&self, customer_id: Uuid) -> StorageResult<Option<Order>> {
        let orders = self.list_orders()?;
        Ok(orders
            .into_iter()
            .filter(|o| o.customer_id == customer_id && !o.status.is_terminal())
            .max_by_key(|o| o.created_at))
    }

    /// Non-terminal order lookup (within transaction)
    ///
    /// Runs inside the single write transaction, so concurrent order
    /// creations for the same customer cannot both pass the check.
    pub fn active_order_for_customer_txn(
        &self,
        txn: &WriteTransaction,
        customer_id: Uuid,
    ) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        let mut latest: Option<Order> = None;
        for result in table.iter()? {
            let (_key, value) = result?;
            let order: Order = serde_json::from_slice(value.value())?;
            if order.customer_id == customer_id
                && !order.status.is_terminal()
                && latest.as_ref().is_none_or(|o| order.created_at > o.created_at)
            {
                latest = Some(order);
            }
        }
        Ok(latest)
    }

    /// All orders that currently have a ticket
    pub fn orders_with_tickets(&self) -> StorageResult<Vec<(Order, Ticket)>> {
        let read_txn = self.db.begin_read()?;
        let orders_table = read_txn.open_table(ORDERS_TABLE)?;
        let index = read_txn.open_table(TICKET_BY_ORDER_TABLE)?;
        let tickets_table = read_txn.open_table(TICKETS_TABLE)?;

        let mut pairs = Vec::new();
        for result in index.iter()? {
            let (order_id, ticket_id) = result?;
            let order: Order = match orders_table.get(order_id.value())? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => continue,
            };
            let ticket: Ticket = match tickets_table.get(ticket_id.value())? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => continue,
            };
            pairs.push((order, ticket));
        }
        pairs.sort_by_key(|(o, _)| o.created_at);
        Ok(pairs)
    }

    // ========== Order Items ==========

    pub fn store_order_item(&self, txn: &WriteTransaction, item: &OrderItem) -> StorageResult<()> {
        let mut table = txn.open_table(ORDER_ITEMS_TABLE)?;
        let value = serde_json::to_vec(item)?;
        table.insert(item.id.to_string().as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn order_items(&self, order_id: Uuid) -> StorageResult<Vec<OrderItem>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDER_ITEMS_TABLE)?;

        let mut items: Vec<OrderItem> = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let item: OrderItem = serde_json::from_slice(value.value())?;
            if item.order_id == order_id {
                items.push(item);
            }
        }
        Ok(items)
    }

    /// Find the order item for a given menu item (within transaction)
    ///
    /// Backs the at-most-one-per-(order, menu) invariant.
    pub fn order_item_for_menu_txn(
        &self,
        txn: &WriteTransaction,
        order_id: Uuid,
        menu_item_id: Uuid,
    ) -> StorageResult<Option<OrderItem>> {
        let table = txn.open_table(ORDER_ITEMS_TABLE)?;
        for result in table.iter()? {
            let (_key, value) = result?;
            let item: OrderItem = serde_json::from_slice(value.value())?;
            if item.order_id == order_id && item.menu_item_id == menu_item_id {
                return Ok(Some(item));
            }
        }
        Ok(None)
    }

    /// Remove all items of an order (within transaction)
    pub fn remove_order_items(&self, txn: &WriteTransaction, order_id: Uuid) -> StorageResult<()> {
        let mut table = txn.open_table(ORDER_ITEMS_TABLE)?;

        let mut keys_to_remove: Vec<String> = Vec::new();
        for result in table.iter()? {
            let (key, value) = result?;
            let item: OrderItem = serde_json::from_slice(value.value())?;
            if item.order_id == order_id {
                keys_to_remove.push(key.value().to_string());
            }
        }
        for key in &keys_to_remove {
            table.remove(key.as_str())?;
        }
        Ok(())
    }

    // ========== Tickets ==========

    /// Insert or overwrite a ticket and its order index (within transaction)
    pub fn store_ticket(&self, txn: &WriteTransaction, ticket: &Ticket) -> StorageResult<()> {
        {
            let mut table = txn.open_table(TICKETS_TABLE)?;
            let value = serde_json::to_vec(ticket)?;
            table.insert(ticket.id.to_string().as_str(), value.as_slice())?;
        }
        let mut index = txn.open_table(TICKET_BY_ORDER_TABLE)?;
        index.insert(
            ticket.order_id.to_string().as_str(),
            ticket.id.to_string().as_str(),
        )?;
        Ok(())
    }

    /// Remove a ticket and its order index (within transaction)
    pub fn remove_ticket(&self, txn: &WriteTransaction, ticket: &Ticket) -> StorageResult<()> {
        {
            let mut table = txn.open_table(TICKETS_TABLE)?;
            table.remove(ticket.id.to_string().as_str())?;
        }
        let mut index = txn.open_table(TICKET_BY_ORDER_TABLE)?;
        index.remove(ticket.order_id.to_string().as_str())?;
        Ok(())
    }

    pub fn ticket(&self, id: Uuid) -> StorageResult<Option<Ticket>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TICKETS_TABLE)?;
        match table.get(id.to_string().as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn ticket_by_order(&self, order_id: Uuid) -> StorageResult<Option<Ticket>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(TICKET_BY_ORDER_TABLE)?;
        let ticket_id = match index.get(order_id.to_string().as_str())? {
            Some(guard) => guard.value().to_string(),
            None => return Ok(None),
        };
        let table = read_txn.open_table(TICKETS_TABLE)?;
        match table.get(ticket_id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Ticket lookup by order (within transaction)
    pub fn ticket_by_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: Uuid,
    ) -> StorageResult<Option<Ticket>> {
        let ticket_id = {
            let index = txn.open_table(TICKET_BY_ORDER_TABLE)?;
            match index.get(order_id.to_string().as_str())? {
                Some(guard) => guard.value().to_string(),
                None => return Ok(None),
            }
        };
        let table = txn.open_table(TICKETS_TABLE)?;
        match table.get(ticket_id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }
}
