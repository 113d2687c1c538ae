pub mod ai;
pub mod authors;
pub mod books;
pub mod contact;
pub mod digital_books;
pub mod events;
pub mod libraries;
pub mod loyalty;
pub mod orders;
pub mod promotions;
pub mod redemptions;
pub mod system;
pub mod users;

use alicia_kernel::ModuleRegistry;

/// Register all project-specific modules with the registry
pub fn register_all(registry: &mut ModuleRegistry) {
    registry.register_custom(users::create_module());
    registry.register_custom(libraries::create_module());
    registry.register_custom(books::create_module());
    registry.register_custom(authors::create_module());
    registry.register_custom(digital_books::create_module());
    registry.register_custom(events::create_module());
    registry.register_custom(promotions::create_module());
    registry.register_custom(orders::create_module());
    registry.register_custom(loyalty::create_module());
    registry.register_custom(redemptions::create_module());
    registry.register_custom(contact::create_module());
    registry.register_custom(ai::create_module());
}
