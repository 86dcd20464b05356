//! Order Repositories

mod orders;
mod sub_orders;

pub(crate) use orders::PgOrdersRepository;
pub(crate) use sub_orders::PgSubOrdersRepository;
