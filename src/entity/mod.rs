pub mod documents;
pub mod identities;

pub use documents::Entity as Documents;
pub use identities::Entity as Identities;
