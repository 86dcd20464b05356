//! Orders

pub mod address;
pub mod assembler;
pub mod lifecycle;
pub mod model;
pub mod policies;
pub mod splitter;
pub mod status;

pub use address::{AddressError, ItemAddress, ShippingAddress};
pub use assembler::{AssemblyError, OrderAssembler, OrderDraft, tracking_number};
pub use lifecycle::{LifecycleError, RefundOutcome, StockRestore, rollup_status};
pub use model::{
    AppliedCoupon, LineAmounts, Order, OrderItem, OrderItemUuid, OrderUuid, Totals,
};
pub use policies::{
    CommissionPolicy, FlatCommission, FlatPerItemShipping, FlatRateTax, FreeShipping, NoTax,
    ShippingPolicy, TaxPolicy,
};
pub use splitter::{SubOrder, SubOrderItem, SubOrderUuid, split_by_seller};
pub use status::{
    EscrowStatus, ItemStatus, OrderStatus, PaymentCollectionStatus, PaymentMethod, PaymentStatus,
    PayoutStatus,
};
