//! Domain model: tenant-partitioned catalog, customers and orders.

pub mod customer;
pub mod order;
pub mod product;
pub mod tenant;
pub mod value_objects;

pub use customer::{Customer, CustomerAddress};
pub use order::{Order, OrderItem, OrderStatus};
pub use product::Product;
pub use tenant::{Role, Tenant};
pub use value_objects::OrderNumber;
