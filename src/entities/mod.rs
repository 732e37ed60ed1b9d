pub mod brand;
pub mod cart;
pub mod cart_item;
pub mod category;
pub mod coupon;
pub mod product;
pub mod product_service;
pub mod product_service_assignment;
pub mod provider_schedule;
pub mod provider_service;
pub mod service_provider;

// Re-export entities
pub use brand::{Entity as Brand, Model as BrandModel};
pub use cart::{CartStatus, Entity as Cart, Model as CartModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use category::{Entity as Category, Model as CategoryModel};
pub use coupon::{DiscountType, Entity as Coupon, Model as CouponModel};
pub use product::{Entity as Product, Model as ProductModel};
pub use product_service::{Entity as ProductService, Model as ProductServiceModel, ServiceType};
pub use product_service_assignment::{
    Entity as ProductServiceAssignment, Model as ProductServiceAssignmentModel,
};
pub use provider_schedule::{
    Entity as ProviderSchedule, Model as ProviderScheduleModel, ScheduleStatus,
};
pub use provider_service::{Entity as ProviderService, Model as ProviderServiceModel};
pub use service_provider::{
    AvailabilityStatus, DayHours, Entity as ServiceProvider, Model as ServiceProviderModel,
    ProviderCategory, WeeklyHours,
};
